// errors.rs — link-layer failure taxonomy
use link_protocol::{ParameterId, WireError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which handshake exchange gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    Discover,
    ReadParameter(ParameterId),
    BeginStream,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeStep::Discover => f.write_str("capability discovery"),
            HandshakeStep::ReadParameter(id) => write!(f, "reading parameter {id}"),
            HandshakeStep::BeginStream => f.write_str("telemetry start"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("malformed reply: {0}")]
    Malformed(#[from] WireError),
    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),
    #[error("config changes are blocked while armed")]
    PolicyRejected,
    #[error("not connected")]
    NotConnected,
    #[error("session closed while waiting for a reply")]
    SessionClosed,
    #[error("cannot resolve vehicle address {0}")]
    Resolve(String),
    #[error("handshake aborted during {step}: {source}")]
    HandshakeAborted {
        step: HandshakeStep,
        #[source]
        source: Box<LinkError>,
    },
}

impl LinkError {
    pub(crate) fn aborted(step: HandshakeStep) -> impl FnOnce(LinkError) -> LinkError {
        move |e| LinkError::HandshakeAborted { step, source: Box::new(e) }
    }
}
