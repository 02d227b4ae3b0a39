//Command line interface
// runtime configuration (vehicle address, retry policy, loop rates)
use anyhow::{Context, Result, bail};
use clap::Parser;
use link_protocol::{DEFAULT_VEHICLE_ADDR, DEFAULT_VEHICLE_PORT, ParameterId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::liveness::DEFAULT_BUDGET;
use crate::recorder::DEFAULT_CAPACITY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub target: String,
    pub port: u16,
    pub bind_addr: String,
    /// Total attempts per request before an exchange gives up.
    pub number_of_tries: u32,
    pub reply_timeout_s: f64,
    pub write_timeout_s: f64,
    /// How long one receive-loop iteration waits for telemetry.
    pub receive_poll_s: f64,
    pub liveness_budget: u32,
    /// Control transmit period (0.02s ≈ 50Hz).
    pub signal_interval_s: f64,
    pub recorder_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_VEHICLE_ADDR.to_string(),
            port: DEFAULT_VEHICLE_PORT,
            bind_addr: "0.0.0.0:0".to_string(),
            number_of_tries: 4,
            reply_timeout_s: 1.0,
            write_timeout_s: 2.0,
            receive_poll_s: 1.0,
            liveness_budget: DEFAULT_BUDGET,
            signal_interval_s: 0.02,
            recorder_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl LinkConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.reply_timeout_s)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.write_timeout_s)
    }

    pub fn receive_poll(&self) -> Duration {
        Duration::from_secs_f64(self.receive_poll_s)
    }

    pub fn signal_interval(&self) -> Duration {
        Duration::from_secs_f64(self.signal_interval_s)
    }

    pub fn validate(&self) -> Result<()> {
        if self.number_of_tries == 0 {
            bail!("number_of_tries must be at least 1");
        }
        if self.liveness_budget == 0 {
            bail!("liveness_budget must be at least 1");
        }
        if self.recorder_capacity == 0 {
            bail!("recorder_capacity must be at least 1");
        }
        for (name, secs) in [
            ("reply_timeout_s", self.reply_timeout_s),
            ("write_timeout_s", self.write_timeout_s),
            ("receive_poll_s", self.receive_poll_s),
            ("signal_interval_s", self.signal_interval_s),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                bail!("{name} must be a positive number of seconds, got {secs}");
            }
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "ground_station", about = "Ground-station link to a remote flight controller")]
pub struct Cli {
    /// TOML file layered under the flags below
    #[arg(long)] pub config: Option<PathBuf>,
    #[arg(long)] pub target: Option<String>,
    #[arg(long)] pub port: Option<u16>,
    #[arg(long)] pub bind_addr: Option<String>,
    #[arg(long)] pub tries: Option<u32>,
    #[arg(long)] pub signal_interval_s: Option<f64>,
    /// Record telemetry and write it to this CSV file on exit
    #[arg(long)] pub record: Option<PathBuf>,
    /// Parameter edit to apply after connecting, as `id=value`
    #[arg(long = "apply", value_parser = parse_edit)]
    pub apply: Vec<(ParameterId, f32)>,
    /// Print events and telemetry as JSON lines
    #[arg(long)] pub json: bool,
    #[arg(long, default_value_t = 1000)] pub report_ms: u64,
    #[arg(long, default_value = "logs")] pub log_dir: PathBuf,
    /// Print the effective configuration as TOML and exit
    #[arg(long)] pub dump_config: bool,
}

impl Cli {
    /// Defaults, then the optional file, then `GROUND_STATION_*` env, then flags.
    pub fn build_config(&self) -> Result<LinkConfig> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&LinkConfig::default())?);
        if let Some(path) = &self.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }
        builder = builder.add_source(config::Environment::with_prefix("GROUND_STATION"));

        let mut cfg: LinkConfig = builder
            .build()
            .context("loading configuration")?
            .try_deserialize()
            .context("parsing configuration")?;

        if let Some(t) = &self.target { cfg.target = t.clone(); }
        if let Some(p) = self.port { cfg.port = p; }
        if let Some(b) = &self.bind_addr { cfg.bind_addr = b.clone(); }
        if let Some(n) = self.tries { cfg.number_of_tries = n; }
        if let Some(s) = self.signal_interval_s { cfg.signal_interval_s = s; }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_edit(s: &str) -> Result<(ParameterId, f32), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected id=value, got {s:?}"))?;
    let raw: u8 = id.trim().parse().map_err(|e| format!("bad parameter id {id:?}: {e}"))?;
    let id = ParameterId::new(raw).ok_or_else(|| format!("parameter id {raw} out of range"))?;
    let value: f32 = value.trim().parse().map_err(|e| format!("bad value {value:?}: {e}"))?;
    Ok((id, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_vehicle_firmware() {
        let cfg = LinkConfig::default();
        assert_eq!(cfg.target, "192.168.4.1");
        assert_eq!(cfg.port, 4321);
        assert_eq!(cfg.number_of_tries, 4);
        assert_eq!(cfg.reply_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.write_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.signal_interval(), Duration::from_millis(20));
        assert_eq!(cfg.liveness_budget, 4);
        assert_eq!(cfg.recorder_capacity, 10_000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_tries_and_bad_timeouts() {
        let cfg = LinkConfig { number_of_tries: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = LinkConfig { reply_timeout_s: -1.0, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = LinkConfig { signal_interval_s: f64::NAN, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn edits_parse_from_cli() {
        assert_eq!(parse_edit("21=0.5"), Ok((ParameterId::new(21).unwrap(), 0.5)));
        assert!(parse_edit("21").is_err());
        assert!(parse_edit("255=1").is_err());
        assert!(parse_edit("x=1").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["ground_station", "--target", "127.0.0.1", "--tries", "2"]);
        let cfg = cli.build_config().unwrap();
        assert_eq!(cfg.target, "127.0.0.1");
        assert_eq!(cfg.number_of_tries, 2);
        assert_eq!(cfg.port, 4321);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let cfg = LinkConfig { port: 5000, ..Default::default() };
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: LinkConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
