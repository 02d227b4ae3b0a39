// net/mod.rs — session endpoint and reply routing
pub mod dispatch;
pub mod udp;

pub use dispatch::{Exchange, PauseFlag, PauseGuard, RetryPolicy};
pub use udp::Endpoint;
