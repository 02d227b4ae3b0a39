// events.rs — link state and the fire-and-forget notification channel
use link_protocol::ParameterInfo;
use serde::Serialize;

pub const SUCCESS_COLOR: &str = "#00a000";
pub const FAILURE_COLOR: &str = "#a00000";

pub const DISCONNECTED_NOTICE: &str = "Copter Disconnected!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkState {
    Disconnected,
    Handshaking,
    Connected {
        /// The receive loop lives exactly as long as the session, so this is
        /// always `true` while connected; losing telemetry ends the session.
        telemetry_active: bool,
        /// Cleared by `stop_control`, set again by `start_control`.
        control_active: bool,
    },
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum LinkEvent {
    StateChanged(LinkState),
    /// One advertised parameter, emitted after a successful handshake.
    Parameter(ParameterInfo),
    EditApplied { location: String, color: &'static str },
    EditRejected { location: String, color: &'static str },
    /// Human-readable notice: connection loss, handshake failure, fatal errors.
    Notice(String),
}

impl LinkEvent {
    pub(crate) fn applied(location: &str) -> Self {
        LinkEvent::EditApplied { location: location.to_string(), color: SUCCESS_COLOR }
    }

    pub(crate) fn rejected(location: &str) -> Self {
        LinkEvent::EditRejected { location: location.to_string(), color: FAILURE_COLOR }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_tagged() {
        let notice = serde_json::to_value(LinkEvent::Notice(DISCONNECTED_NOTICE.into())).unwrap();
        assert_eq!(notice, serde_json::json!({ "kind": "notice", "data": "Copter Disconnected!" }));

        let state = serde_json::to_value(LinkEvent::StateChanged(LinkState::Connected {
            telemetry_active: true,
            control_active: false,
        }))
        .unwrap();
        assert_eq!(
            state,
            serde_json::json!({
                "kind": "state_changed",
                "data": { "state": "connected", "telemetry_active": true, "control_active": false }
            })
        );
    }
}
