// lib.rs — Shared link protocol between the ground station and the flight controller
//
// Fixed-size, type-tagged binary datagrams. There is no length prefix: the
// first byte names the message and every message type has one legal size
// (the capability list is the only variable-size reply and carries its own
// count byte). All multi-byte fields are little-endian, which is what the
// deployed firmware puts on the wire.

pub mod params;

pub use params::{ParameterId, ParameterInfo, group_name, parameter_name};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================== Common =====================================

pub const DEFAULT_VEHICLE_ADDR: &str = "192.168.4.1";
pub const DEFAULT_VEHICLE_PORT: u16 = 4321;
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Attitude fields are sent as degrees × 160.
pub const ATTITUDE_SCALE: f64 = 160.0;
/// Raw engine value that corresponds to zero thrust; also the scale divisor.
pub const ENGINE_BASELINE: u16 = 3277;
pub const VOLTAGE_DIVISOR: u16 = 3;
/// Control axes are sent as value × 32000.
pub const AXIS_SCALE: f32 = 32000.0;
/// Throttle position above which the operator intends the vehicle armed.
pub const ARM_THRESHOLD: f32 = 0.8;
/// Stream selector sent with the begin-telemetry request.
pub const TELEMETRY_STREAM: u8 = 1;

pub const TELEMETRY_LEN: usize = 21;
pub const CONTROL_LEN: usize = 10;
const PARAMETER_LEN: usize = 6;

// =============================== Errors =====================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("empty datagram")]
    Empty,
    #[error("unknown message type {0}")]
    UnknownType(u8),
    #[error("unexpected message type {found}, expected {expected}")]
    WrongType { expected: u8, found: u8 },
    #[error("message type {kind} must be {expected} bytes, got {found}")]
    WrongLength { kind: u8, expected: usize, found: usize },
    #[error("capability list declares {declared} ids but carries {carried}")]
    CountMismatch { declared: usize, carried: usize },
    #[error("parameter id {0} is out of range")]
    InvalidParameterId(u8),
    #[error("reply to message type {kind} does not echo the request")]
    EchoMismatch { kind: u8 },
}

// =============================== Enums ======================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    ReadParameter = 2,
    WriteParameter = 3,
    BeginStream = 4,
    Telemetry = 10,
    Control = 20,
}

impl MessageType {
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = WireError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            1 => Self::Discover,
            2 => Self::ReadParameter,
            3 => Self::WriteParameter,
            4 => Self::BeginStream,
            10 => Self::Telemetry,
            20 => Self::Control,
            other => return Err(WireError::UnknownType(other)),
        })
    }
}

/// Correlates a reply datagram with the request waiting for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKey {
    Discover,
    Read(u8),
    Write(u8),
    Stream(u8),
}

impl ReplyKey {
    /// Classify an inbound datagram. Telemetry, control and unknown tags have
    /// no key.
    pub fn of(datagram: &[u8]) -> Option<Self> {
        let (&tag, rest) = datagram.split_first()?;
        let id = rest.first().copied();
        match MessageType::try_from(tag).ok()? {
            MessageType::Discover => Some(Self::Discover),
            MessageType::ReadParameter => id.map(Self::Read),
            MessageType::WriteParameter => id.map(Self::Write),
            MessageType::BeginStream => id.map(Self::Stream),
            MessageType::Telemetry | MessageType::Control => None,
        }
    }
}

fn expect_type(buf: &[u8], expected: MessageType) -> Result<(), WireError> {
    match buf.first() {
        None => Err(WireError::Empty),
        Some(&found) if found != expected.tag() => Err(WireError::WrongType {
            expected: expected.tag(),
            found,
        }),
        Some(_) => Ok(()),
    }
}

fn expect_len(buf: &[u8], kind: MessageType, expected: usize) -> Result<(), WireError> {
    if buf.len() != expected {
        return Err(WireError::WrongLength {
            kind: kind.tag(),
            expected,
            found: buf.len(),
        });
    }
    Ok(())
}

fn f32_at(buf: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn i16_at(buf: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([buf[at], buf[at + 1]])
}

fn u16_at(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

// ========================= Request / Reply messages ==========================

/// Ground → vehicle requests of the handshake and config-write exchanges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    Discover,
    ReadParameter(ParameterId),
    WriteParameter(ParameterId, f32),
    BeginStream,
}

impl Request {
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::Discover => MessageType::Discover,
            Request::ReadParameter(_) => MessageType::ReadParameter,
            Request::WriteParameter(..) => MessageType::WriteParameter,
            Request::BeginStream => MessageType::BeginStream,
        }
    }

    /// Key under which the matching reply will arrive.
    pub fn reply_key(&self) -> ReplyKey {
        match self {
            Request::Discover => ReplyKey::Discover,
            Request::ReadParameter(id) => ReplyKey::Read(id.get()),
            Request::WriteParameter(id, _) => ReplyKey::Write(id.get()),
            Request::BeginStream => ReplyKey::Stream(TELEMETRY_STREAM),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.message_type().tag()];
        match self {
            Request::Discover => {}
            Request::ReadParameter(id) => out.push(id.get()),
            Request::WriteParameter(id, value) => {
                out.push(id.get());
                out.extend_from_slice(&value.to_le_bytes());
            }
            Request::BeginStream => out.push(TELEMETRY_STREAM),
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let &tag = buf.first().ok_or(WireError::Empty)?;
        let kind = MessageType::try_from(tag)?;
        match kind {
            MessageType::Discover => {
                expect_len(buf, kind, 1)?;
                Ok(Request::Discover)
            }
            MessageType::ReadParameter => {
                expect_len(buf, kind, 2)?;
                Ok(Request::ReadParameter(ParameterId::try_from(buf[1])?))
            }
            MessageType::WriteParameter => {
                expect_len(buf, kind, PARAMETER_LEN)?;
                Ok(Request::WriteParameter(
                    ParameterId::try_from(buf[1])?,
                    f32_at(buf, 2),
                ))
            }
            MessageType::BeginStream => {
                expect_len(buf, kind, 2)?;
                Ok(Request::BeginStream)
            }
            MessageType::Telemetry | MessageType::Control => Err(WireError::UnknownType(tag)),
        }
    }
}

/// Vehicle → ground replies.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Advertised parameter ids, in the vehicle's order.
    Capabilities(Vec<ParameterId>),
    ParameterValue(ParameterId, f32),
    /// Echo of a write; only an exact echo confirms the write.
    WriteAck(ParameterId, f32),
    StreamStarted(u8),
}

impl Reply {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Reply::Capabilities(ids) => {
                let mut out = Vec::with_capacity(ids.len() + 2);
                out.push(MessageType::Discover.tag());
                out.push(ids.len() as u8);
                out.extend(ids.iter().map(|id| id.get()));
                out
            }
            Reply::ParameterValue(id, value) => {
                let mut out = vec![MessageType::ReadParameter.tag(), id.get()];
                out.extend_from_slice(&value.to_le_bytes());
                out
            }
            Reply::WriteAck(id, value) => {
                let mut out = vec![MessageType::WriteParameter.tag(), id.get()];
                out.extend_from_slice(&value.to_le_bytes());
                out
            }
            Reply::StreamStarted(stream) => vec![MessageType::BeginStream.tag(), *stream],
        }
    }

    /// Decode a reply, requiring it to be of the `expected` type.
    pub fn decode(buf: &[u8], expected: MessageType) -> Result<Self, WireError> {
        expect_type(buf, expected)?;
        match expected {
            MessageType::Discover => {
                if buf.len() < 2 {
                    return Err(WireError::WrongLength {
                        kind: expected.tag(),
                        expected: 2,
                        found: buf.len(),
                    });
                }
                let declared = buf[1] as usize;
                let carried = buf.len() - 2;
                if declared != carried {
                    return Err(WireError::CountMismatch { declared, carried });
                }
                let ids = buf[2..]
                    .iter()
                    .map(|&raw| ParameterId::try_from(raw))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Reply::Capabilities(ids))
            }
            MessageType::ReadParameter => {
                expect_len(buf, expected, PARAMETER_LEN)?;
                Ok(Reply::ParameterValue(
                    ParameterId::try_from(buf[1])?,
                    f32_at(buf, 2),
                ))
            }
            MessageType::WriteParameter => {
                expect_len(buf, expected, PARAMETER_LEN)?;
                Ok(Reply::WriteAck(ParameterId::try_from(buf[1])?, f32_at(buf, 2)))
            }
            MessageType::BeginStream => {
                expect_len(buf, expected, 2)?;
                Ok(Reply::StreamStarted(buf[1]))
            }
            MessageType::Telemetry | MessageType::Control => {
                Err(WireError::UnknownType(expected.tag()))
            }
        }
    }
}

// ============================== Telemetry ===================================

/// Type-10 datagram exactly as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetryFrame {
    pub cycletime: u8,
    pub armed: u8,
    pub attitude: [i16; 3],
    pub engines: [u16; 4],
    pub altitude: u16,
    pub voltage: u16,
}

impl TelemetryFrame {
    pub fn encode(&self) -> [u8; TELEMETRY_LEN] {
        let mut out = [0u8; TELEMETRY_LEN];
        out[0] = MessageType::Telemetry.tag();
        out[1] = self.cycletime;
        out[2] = self.armed;
        for (i, a) in self.attitude.iter().enumerate() {
            out[3 + 2 * i..5 + 2 * i].copy_from_slice(&a.to_le_bytes());
        }
        for (i, e) in self.engines.iter().enumerate() {
            out[9 + 2 * i..11 + 2 * i].copy_from_slice(&e.to_le_bytes());
        }
        out[17..19].copy_from_slice(&self.altitude.to_le_bytes());
        out[19..21].copy_from_slice(&self.voltage.to_le_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        expect_type(buf, MessageType::Telemetry)?;
        expect_len(buf, MessageType::Telemetry, TELEMETRY_LEN)?;
        Ok(Self {
            cycletime: buf[1],
            armed: buf[2],
            attitude: [i16_at(buf, 3), i16_at(buf, 5), i16_at(buf, 7)],
            engines: [
                u16_at(buf, 9),
                u16_at(buf, 11),
                u16_at(buf, 13),
                u16_at(buf, 15),
            ],
            altitude: u16_at(buf, 17),
            voltage: u16_at(buf, 19),
        })
    }

    /// Quantize a decoded state back into wire units. Voltage loses the
    /// remainder of the division on the way in, so it only comes back to a
    /// multiple of [`VOLTAGE_DIVISOR`].
    pub fn quantize(state: &TelemetryState) -> Self {
        let attitude = state
            .attitude
            .map(|deg| (deg * ATTITUDE_SCALE).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
        let baseline = ENGINE_BASELINE as f64;
        let engines = state
            .engines
            .map(|e| (e * baseline + baseline).round().clamp(0.0, u16::MAX as f64) as u16);
        Self {
            cycletime: state.cycletime,
            armed: state.armed as u8,
            attitude,
            engines,
            altitude: state.altitude,
            voltage: state.voltage.saturating_mul(VOLTAGE_DIVISOR),
        }
    }
}

/// Last known vehicle state, in engineering units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryState {
    /// Roll, pitch, yaw in degrees.
    pub attitude: [f64; 3],
    /// Normalized thrust per engine.
    pub engines: [f64; 4],
    /// Raw altitude as received.
    pub altitude: u16,
    /// Raw voltage divided by three; units are whatever the firmware uses.
    pub voltage: u16,
    /// Last flight-loop cycle time in ms.
    pub cycletime: u8,
    pub armed: bool,
}

impl TelemetryState {
    pub const CHANNELS: usize = 11;

    /// Flatten into recorder channel order: attitude, engines, altitude,
    /// voltage, cycletime, armed.
    pub fn channels(&self) -> [f64; Self::CHANNELS] {
        [
            self.attitude[0],
            self.attitude[1],
            self.attitude[2],
            self.engines[0],
            self.engines[1],
            self.engines[2],
            self.engines[3],
            self.altitude as f64,
            self.voltage as f64,
            self.cycletime as f64,
            if self.armed { 1.0 } else { 0.0 },
        ]
    }
}

impl From<&TelemetryFrame> for TelemetryState {
    fn from(f: &TelemetryFrame) -> Self {
        let baseline = ENGINE_BASELINE as f64;
        Self {
            attitude: f.attitude.map(|a| a as f64 / ATTITUDE_SCALE),
            engines: f.engines.map(|e| (e as f64 - baseline) / baseline),
            altitude: f.altitude,
            voltage: f.voltage / VOLTAGE_DIVISOR,
            cycletime: f.cycletime,
            armed: f.armed != 0,
        }
    }
}

/// Decode a type-10 datagram straight into a state snapshot.
pub fn decode_telemetry(buf: &[u8]) -> Result<TelemetryState, WireError> {
    TelemetryFrame::decode(buf).map(|f| TelemetryState::from(&f))
}

// =============================== Control ====================================

/// Operator stick positions, each roughly in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlAxes {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub throttle: f32,
}

impl ControlAxes {
    pub const DEADZONE: f32 = 0.008;
    pub const EXPO: f32 = 1.5;

    pub fn arm_intent(&self) -> bool {
        self.throttle > ARM_THRESHOLD
    }

    /// Deadzone plus expo curve for a centered stick axis.
    pub fn shape_stick(raw: f32, deadzone: f32, expo: f32) -> f32 {
        if raw.abs() <= deadzone {
            return 0.0;
        }
        let scaled = ((raw - deadzone.copysign(raw)) / (1.0 - deadzone)).abs();
        scaled.powf(expo).copysign(raw)
    }

    /// Deadzone only, for a one-sided trigger.
    pub fn shape_trigger(raw: f32, deadzone: f32) -> f32 {
        if raw.abs() <= deadzone {
            return 0.0;
        }
        (raw - deadzone.copysign(raw)) / (1.0 - deadzone)
    }
}

fn axis_to_wire(v: f32) -> i16 {
    (v * AXIS_SCALE).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Type-20 datagram as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFrame {
    pub arm: u8,
    pub pitch: i16,
    pub roll: i16,
    pub yaw: i16,
    pub throttle: i16,
}

impl ControlFrame {
    /// Yaw and throttle are inverted on the wire.
    pub fn from_axes(axes: &ControlAxes) -> Self {
        Self {
            arm: axes.arm_intent() as u8,
            pitch: axis_to_wire(axes.pitch),
            roll: axis_to_wire(axes.roll),
            yaw: axis_to_wire(-axes.yaw),
            throttle: axis_to_wire(-axes.throttle),
        }
    }

    pub fn axes(&self) -> ControlAxes {
        ControlAxes {
            roll: self.roll as f32 / AXIS_SCALE,
            pitch: self.pitch as f32 / AXIS_SCALE,
            yaw: -(self.yaw as f32) / AXIS_SCALE,
            throttle: -(self.throttle as f32) / AXIS_SCALE,
        }
    }

    pub fn encode(&self) -> [u8; CONTROL_LEN] {
        let mut out = [0u8; CONTROL_LEN];
        out[0] = MessageType::Control.tag();
        out[1] = self.arm;
        out[2..4].copy_from_slice(&self.pitch.to_le_bytes());
        out[4..6].copy_from_slice(&self.roll.to_le_bytes());
        out[6..8].copy_from_slice(&self.yaw.to_le_bytes());
        out[8..10].copy_from_slice(&self.throttle.to_le_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        expect_type(buf, MessageType::Control)?;
        expect_len(buf, MessageType::Control, CONTROL_LEN)?;
        Ok(Self {
            arm: buf[1],
            pitch: i16_at(buf, 2),
            roll: i16_at(buf, 4),
            yaw: i16_at(buf, 6),
            throttle: i16_at(buf, 8),
        })
    }
}

// ================================ Tests =====================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(raw: u8) -> ParameterId {
        ParameterId::new(raw).unwrap()
    }

    #[test]
    fn telemetry_decode_applies_scaling() {
        let frame = TelemetryFrame {
            cycletime: 4,
            armed: 1,
            attitude: [160, -320, 16],
            engines: [3277, 6554, 0, 4915],
            altitude: 1200,
            voltage: 11100,
        };
        let bytes = frame.encode();
        assert_eq!(bytes.len(), TELEMETRY_LEN);
        assert_eq!(bytes[0], 10);

        let s = decode_telemetry(&bytes).expect("decode");
        assert_eq!(s.attitude, [1.0, -2.0, 0.1]);
        assert_eq!(s.engines[0], 0.0);
        assert_eq!(s.engines[1], 1.0);
        assert_eq!(s.engines[2], -1.0);
        assert!((s.engines[3] - 0.49985).abs() < 1e-3);
        assert_eq!(s.altitude, 1200);
        assert_eq!(s.voltage, 3700);
        assert_eq!(s.cycletime, 4);
        assert!(s.armed);
    }

    #[test]
    fn voltage_uses_integer_division() {
        let frame = TelemetryFrame { voltage: 11, ..Default::default() };
        let s = decode_telemetry(&frame.encode()).unwrap();
        assert_eq!(s.voltage, 3);
    }

    #[test]
    fn telemetry_rejects_wrong_type_and_length() {
        let mut bytes = TelemetryFrame::default().encode();
        assert_eq!(
            TelemetryFrame::decode(&bytes[..20]),
            Err(WireError::WrongLength { kind: 10, expected: 21, found: 20 })
        );
        bytes[0] = 20;
        assert_eq!(
            TelemetryFrame::decode(&bytes),
            Err(WireError::WrongType { expected: 10, found: 20 })
        );
        assert_eq!(TelemetryFrame::decode(&[]), Err(WireError::Empty));
    }

    #[test]
    fn control_encode_arms_above_threshold() {
        let axes = ControlAxes { throttle: 0.85, ..Default::default() };
        let frame = ControlFrame::from_axes(&axes);
        assert_eq!(frame, ControlFrame { arm: 1, pitch: 0, roll: 0, yaw: 0, throttle: -27200 });

        let bytes = frame.encode();
        assert_eq!(bytes[0], 20);
        assert_eq!(bytes[1], 1);
        assert_eq!(i16::from_le_bytes([bytes[8], bytes[9]]), -27200);
    }

    #[test]
    fn control_encode_field_order_and_signs() {
        let axes = ControlAxes { roll: 0.5, pitch: -0.25, yaw: 0.1, throttle: 0.8 };
        let frame = ControlFrame::from_axes(&axes);
        assert_eq!(frame.arm, 0, "0.8 is not above the threshold");
        assert_eq!(frame.pitch, -8000);
        assert_eq!(frame.roll, 16000);
        assert_eq!(frame.yaw, -3200);
        assert_eq!(frame.throttle, -25600);
        assert_eq!(ControlFrame::decode(&frame.encode()), Ok(frame));
    }

    #[test]
    fn control_axes_saturate() {
        let frame = ControlFrame::from_axes(&ControlAxes { pitch: 2.0, ..Default::default() });
        assert_eq!(frame.pitch, i16::MAX);
    }

    #[test]
    fn capability_reply_checks_count() {
        let ok = Reply::Capabilities(vec![id(1), id(11)]).encode();
        assert_eq!(ok, vec![1, 2, 1, 11]);
        assert_eq!(
            Reply::decode(&ok, MessageType::Discover),
            Ok(Reply::Capabilities(vec![id(1), id(11)]))
        );

        assert_eq!(
            Reply::decode(&[1, 3, 1, 11], MessageType::Discover),
            Err(WireError::CountMismatch { declared: 3, carried: 2 })
        );
        assert_eq!(
            Reply::decode(&[1, 1, 255], MessageType::Discover),
            Err(WireError::InvalidParameterId(255))
        );
        assert_eq!(
            Reply::decode(&[1, 0], MessageType::Discover),
            Ok(Reply::Capabilities(vec![]))
        );
    }

    #[test]
    fn parameter_replies() {
        let bytes = Reply::ParameterValue(id(12), 1.25).encode();
        assert_eq!(bytes.len(), 6);
        assert_eq!(ReplyKey::of(&bytes), Some(ReplyKey::Read(12)));
        assert_eq!(
            Reply::decode(&bytes, MessageType::ReadParameter),
            Ok(Reply::ParameterValue(id(12), 1.25))
        );
        assert!(matches!(
            Reply::decode(&bytes, MessageType::WriteParameter),
            Err(WireError::WrongType { expected: 3, found: 2 })
        ));
        assert!(matches!(
            Reply::decode(&bytes[..5], MessageType::ReadParameter),
            Err(WireError::WrongLength { .. })
        ));
    }

    #[test]
    fn write_request_is_echoed_by_ack() {
        let req = Request::WriteParameter(id(21), 0.75);
        let ack = Reply::WriteAck(id(21), 0.75);
        assert_eq!(req.encode(), ack.encode());
        assert_eq!(req.reply_key(), ReplyKey::Write(21));
        assert_eq!(Request::decode(&req.encode()), Ok(req));
    }

    #[test]
    fn requests_encode_to_fixed_sizes() {
        assert_eq!(Request::Discover.encode(), vec![1]);
        assert_eq!(Request::ReadParameter(id(3)).encode(), vec![2, 3]);
        assert_eq!(Request::BeginStream.encode(), vec![4, 1]);
        assert_eq!(Request::BeginStream.reply_key(), ReplyKey::Stream(1));
        assert_eq!(Request::decode(&[4, 1]), Ok(Request::BeginStream));
        assert_eq!(Request::decode(&[10]), Err(WireError::UnknownType(10)));
    }

    #[test]
    fn reply_keys() {
        assert_eq!(ReplyKey::of(&[1, 0]), Some(ReplyKey::Discover));
        assert_eq!(ReplyKey::of(&[4, 1]), Some(ReplyKey::Stream(1)));
        assert_eq!(ReplyKey::of(&[2]), None);
        assert_eq!(ReplyKey::of(&TelemetryFrame::default().encode()), None);
        assert_eq!(ReplyKey::of(&[99, 1]), None);
        assert_eq!(ReplyKey::of(&[]), None);
    }

    #[test]
    fn stick_shaping() {
        assert_eq!(ControlAxes::shape_stick(0.005, ControlAxes::DEADZONE, ControlAxes::EXPO), 0.0);
        assert!((ControlAxes::shape_stick(1.0, ControlAxes::DEADZONE, ControlAxes::EXPO) - 1.0).abs() < 1e-6);
        assert!((ControlAxes::shape_stick(-1.0, ControlAxes::DEADZONE, ControlAxes::EXPO) + 1.0).abs() < 1e-6);
        let half = ControlAxes::shape_stick(0.5, ControlAxes::DEADZONE, ControlAxes::EXPO);
        assert!(half > 0.0 && half < 0.5);
        assert!((ControlAxes::shape_trigger(1.0, ControlAxes::DEADZONE) - 1.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn telemetry_quantization_roundtrip(
            cycletime in any::<u8>(),
            armed in 0u8..=1,
            attitude in any::<[i16; 3]>(),
            engines in any::<[u16; 4]>(),
            altitude in any::<u16>(),
            voltage in any::<u16>(),
        ) {
            let frame = TelemetryFrame { cycletime, armed, attitude, engines, altitude, voltage };
            let state = decode_telemetry(&frame.encode()).unwrap();
            let back = TelemetryFrame::quantize(&state);

            for i in 0..3 {
                prop_assert!((back.attitude[i] as i32 - attitude[i] as i32).abs() <= 1);
            }
            for i in 0..4 {
                prop_assert!((back.engines[i] as i32 - engines[i] as i32).abs() <= 1);
            }
            prop_assert_eq!(back.altitude, altitude);
            prop_assert_eq!(back.cycletime, cycletime);
            prop_assert_eq!(back.armed, armed);
            prop_assert!((voltage as i32 - back.voltage as i32) < VOLTAGE_DIVISOR as i32);
        }
    }
}
