//Command line interface
// runtime configuration (listen address, advertised parameters, misbehaviour knobs)
use anyhow::Result;
use clap::Parser;
use link_protocol::{DEFAULT_VEHICLE_PORT, MessageType, ParameterId};
use std::collections::HashSet;
use std::time::Duration;

use crate::errors::SimError;

#[derive(Debug, Clone)]
pub struct VehicleConfig {
    pub bind_addr: String,
    /// Advertised parameters with their defaults, in advertised order.
    pub parameters: Vec<(ParameterId, f32)>,
    pub telemetry_interval: Duration,
    /// Request types the vehicle never answers.
    pub silent: HashSet<MessageType>,
    /// Parameters that refuse writes; the ack carries the unchanged value.
    pub locked: HashSet<ParameterId>,
    /// Number of leading requests to ignore, as if lost on the air.
    pub drop_first: u32,
    pub seed: u64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_VEHICLE_PORT}"),
            parameters: default_parameters(),
            telemetry_interval: Duration::from_millis(20),
            silent: HashSet::new(),
            locked: HashSet::new(),
            drop_first: 0,
            seed: 7,
        }
    }
}

impl VehicleConfig {
    /// Loopback listener on an ephemeral port.
    pub fn loopback() -> Self {
        Self { bind_addr: "127.0.0.1:0".to_string(), ..Default::default() }
    }
}

fn default_parameters() -> Vec<(ParameterId, f32)> {
    [(1, 0.0), (2, 10.0), (11, 1.0), (12, 0.6), (13, 0.8), (31, 1.2), (32, 0.02), (33, 0.25)]
        .into_iter()
        .filter_map(|(raw, v)| ParameterId::new(raw).map(|id| (id, v)))
        .collect()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "vehicle_sim", about = "Simulated flight controller for link testing")]
pub struct Cli {
    #[arg(long, default_value = "0.0.0.0:4321")] pub bind_addr: String,
    #[arg(long, default_value_t = 20)]           pub telemetry_ms: u64,
    /// Advertised parameter as `id=value`; replaces the built-in set
    #[arg(long = "param")]                       pub params: Vec<String>,
    /// Request type (1-4) to never answer
    #[arg(long)]                                 pub silent: Vec<u8>,
    /// Parameter id whose writes are refused
    #[arg(long)]                                 pub locked: Vec<u8>,
    #[arg(long, default_value_t = 0)]            pub drop_first: u32,
    #[arg(long, default_value_t = 7)]            pub seed: u64,
}

impl Cli {
    pub fn parse_and_build_config() -> Result<VehicleConfig> {
        let c = <Cli as Parser>::parse();
        Ok(c.build()?)
    }

    pub fn build(&self) -> Result<VehicleConfig, SimError> {
        let mut cfg = VehicleConfig {
            bind_addr: self.bind_addr.clone(),
            telemetry_interval: Duration::from_millis(self.telemetry_ms.max(1)),
            drop_first: self.drop_first,
            seed: self.seed,
            ..Default::default()
        };
        if !self.params.is_empty() {
            cfg.parameters = self.params.iter().map(|s| parse_param(s)).collect::<Result<_, _>>()?;
        }
        for &tag in &self.silent {
            let kind = MessageType::try_from(tag)
                .map_err(|e| SimError::Parameter(format!("--silent {tag}: {e}")))?;
            cfg.silent.insert(kind);
        }
        for &raw in &self.locked {
            cfg.locked.insert(id_from(raw)?);
        }
        Ok(cfg)
    }
}

fn id_from(raw: u8) -> Result<ParameterId, SimError> {
    ParameterId::new(raw).ok_or_else(|| SimError::Parameter(format!("id {raw} out of range")))
}

fn parse_param(s: &str) -> Result<(ParameterId, f32), SimError> {
    let bad = || SimError::Parameter(format!("expected id=value, got {s:?}"));
    let (id, value) = s.split_once('=').ok_or_else(bad)?;
    let raw: u8 = id.trim().parse().map_err(|_| bad())?;
    let value: f32 = value.trim().parse().map_err(|_| bad())?;
    Ok((id_from(raw)?, value))
}
