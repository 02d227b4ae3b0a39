// commands/handler.rs — flight-controller side of the request/reply exchanges
use crate::config::VehicleConfig;
use link_protocol::{
    ControlFrame, MessageType, ParameterId, Reply, Request, TELEMETRY_STREAM,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// What the link task should do with one inbound datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Reply(Vec<u8>),
    Control,
    Ignored,
}

#[derive(Debug)]
pub struct FlightController {
    parameters: Vec<(ParameterId, f32)>,
    silent: HashSet<MessageType>,
    locked: HashSet<ParameterId>,
    drop_remaining: u32,
    streaming: bool,
    last_control: Option<ControlFrame>,
    control_frames: u64,
    requests_seen: u64,
}

impl FlightController {
    pub fn new(cfg: &VehicleConfig) -> Self {
        Self {
            parameters: cfg.parameters.clone(),
            silent: cfg.silent.clone(),
            locked: cfg.locked.clone(),
            drop_remaining: cfg.drop_first,
            streaming: false,
            last_control: None,
            control_frames: 0,
            requests_seen: 0,
        }
    }

    pub fn parameter(&self, id: ParameterId) -> Option<f32> {
        self.parameters.iter().find(|(p, _)| *p == id).map(|&(_, v)| v)
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn set_streaming(&mut self, on: bool) {
        self.streaming = on;
    }

    pub fn last_control(&self) -> Option<ControlFrame> {
        self.last_control
    }

    pub fn control_frames(&self) -> u64 {
        self.control_frames
    }

    pub fn requests_seen(&self) -> u64 {
        self.requests_seen
    }

    pub fn handle(&mut self, datagram: &[u8]) -> Outcome {
        if datagram.first() == Some(&MessageType::Control.tag()) {
            return match ControlFrame::decode(datagram) {
                Ok(frame) => {
                    self.last_control = Some(frame);
                    self.control_frames += 1;
                    Outcome::Control
                }
                Err(e) => {
                    debug!(error = %e, "bad control frame");
                    Outcome::Ignored
                }
            };
        }

        let request = match Request::decode(datagram) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "undecodable request");
                return Outcome::Ignored;
            }
        };
        self.requests_seen += 1;

        if self.drop_remaining > 0 {
            self.drop_remaining -= 1;
            debug!(?request, left = self.drop_remaining, "dropping request");
            return Outcome::Ignored;
        }
        if self.silent.contains(&request.message_type()) {
            debug!(?request, "silent for this request type");
            return Outcome::Ignored;
        }

        let reply = match request {
            Request::Discover => {
                Reply::Capabilities(self.parameters.iter().map(|&(id, _)| id).collect())
            }
            Request::ReadParameter(id) => match self.parameter(id) {
                Some(v) => Reply::ParameterValue(id, v),
                None => return Outcome::Ignored,
            },
            Request::WriteParameter(id, value) => {
                if self.locked.contains(&id) {
                    info!(%id, value, "write refused");
                    Reply::WriteAck(id, self.parameter(id).unwrap_or_default())
                } else {
                    if let Some(slot) = self.parameters.iter_mut().find(|(p, _)| *p == id) {
                        slot.1 = value;
                    }
                    info!(%id, value, "parameter written");
                    Reply::WriteAck(id, value)
                }
            }
            Request::BeginStream => {
                if !self.streaming {
                    info!("telemetry stream requested");
                }
                self.streaming = true;
                Reply::StreamStarted(TELEMETRY_STREAM)
            }
        };
        Outcome::Reply(reply.encode())
    }
}
