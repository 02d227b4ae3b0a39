// lib.rs — ground side of the vehicle link

// ============================== Plumbing ====================================
pub mod config;
pub mod errors;
pub mod net;

// ============================== Link state ==================================
pub mod events;
pub mod liveness;
pub mod recorder;
pub mod state;

// ============================== Session =====================================
pub mod link;

pub use config::{Cli, LinkConfig};
pub use errors::{HandshakeStep, LinkError};
pub use events::{DISCONNECTED_NOTICE, FAILURE_COLOR, LinkEvent, LinkState, SUCCESS_COLOR};
pub use link::{ConfigReport, LinkEngine, PendingEdit, PendingEdits};
pub use liveness::LivenessTimer;
pub use recorder::{CHANNEL_LABELS, SampleRecorder};
pub use state::{ParameterSet, SharedCell};
