// params.rs — parameter identifiers and their human-readable group/name tables

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::WireError;

/// Identifier of one tunable float parameter on the flight controller.
///
/// Valid ids live in `0..255`; the byte value 255 is never advertised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ParameterId(u8);

impl ParameterId {
    pub const LIMIT: u8 = 255;

    pub const fn new(raw: u8) -> Option<Self> {
        if raw < Self::LIMIT { Some(Self(raw)) } else { None }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Group key used by the group table: `id / 10 + 1`.
    #[inline]
    pub const fn group_key(self) -> u8 {
        self.0 / 10 + 1
    }

    pub fn group(self) -> &'static str {
        group_name(self.group_key())
    }

    pub fn name(self) -> &'static str {
        parameter_name(self.0)
    }
}

impl TryFrom<u8> for ParameterId {
    type Error = WireError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(WireError::InvalidParameterId(raw))
    }
}

impl From<ParameterId> for u8 {
    fn from(id: ParameterId) -> u8 {
        id.0
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const UNKNOWN: &str = "Unknown";

/// Group table, keyed by `id / 10 + 1`.
pub fn group_name(key: u8) -> &'static str {
    match key {
        1 => "System",
        2 => "User",
        3 => "Yaw PID",
        4 => "RollPitch PID",
        5 => "Altitude PID",
        _ => UNKNOWN,
    }
}

/// Name table, keyed by raw parameter id.
pub fn parameter_name(id: u8) -> &'static str {
    match id {
        1 => "Flight mode",
        2 => "Telemetry FPC",
        3 => "Altitude Filter",
        4 => "Voltage Filter",
        11 => "Thrust Sens",
        12 => "Pitch & Roll Sens",
        13 => "Yaw Sens",
        21 => "Yaw P",
        22 => "Yaw I",
        23 => "Yaw D",
        24 => "Yaw A",
        25 => "YawDt P",
        26 => "YawDt I",
        27 => "YawDt D",
        28 => "YawDt A",
        31 => "PR P",
        32 => "PR I",
        33 => "PR D",
        34 => "PR A",
        35 => "PRdt P",
        36 => "PRdt I",
        37 => "PRdt D",
        38 => "PRdt A",
        41 => "Alt P",
        42 => "Alt I",
        43 => "Alt D",
        44 => "Alt A",
        _ => UNKNOWN,
    }
}

/// One discovered parameter as shown to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub id: ParameterId,
    pub group: String,
    pub name: String,
    pub value: f32,
}

impl ParameterInfo {
    pub fn describe(id: ParameterId, value: f32) -> Self {
        Self {
            id,
            group: id.group().to_string(),
            name: id.name().to_string(),
            value,
        }
    }
}
