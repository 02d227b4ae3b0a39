// link/handshake.rs — discover, read every advertised default, start the stream
use crate::{
    errors::{HandshakeStep, LinkError},
    net::{Exchange, RetryPolicy},
};
use link_protocol::{MessageType, ParameterId, Reply, Request, TELEMETRY_STREAM, WireError};
use tracing::{debug, info};

fn unexpected(kind: MessageType) -> LinkError {
    WireError::EchoMismatch { kind: kind.tag() }.into()
}

/// Runs the three steps in order while holding the exchange, so neither loop
/// sees the handshake traffic. Returns the defaults in advertised order.
pub(crate) async fn run(
    exchange: &Exchange,
    policy: RetryPolicy,
) -> Result<Vec<(ParameterId, f32)>, LinkError> {
    let held = exchange.hold().await;

    let ids = exchange
        .request(&held, &Request::Discover, policy, |b| {
            match Reply::decode(b, MessageType::Discover)? {
                Reply::Capabilities(ids) => Ok(ids),
                _ => Err(unexpected(MessageType::Discover)),
            }
        })
        .await
        .map_err(LinkError::aborted(HandshakeStep::Discover))?;
    info!(count = ids.len(), "vehicle advertised parameters");

    let mut params = Vec::with_capacity(ids.len());
    for id in ids {
        let value = exchange
            .request(&held, &Request::ReadParameter(id), policy, |b| {
                match Reply::decode(b, MessageType::ReadParameter)? {
                    Reply::ParameterValue(got, v) if got == id => Ok(v),
                    _ => Err(unexpected(MessageType::ReadParameter)),
                }
            })
            .await
            .map_err(LinkError::aborted(HandshakeStep::ReadParameter(id)))?;
        debug!(%id, value, "parameter default");
        params.push((id, value));
    }

    exchange
        .request(&held, &Request::BeginStream, policy, |b| {
            match Reply::decode(b, MessageType::BeginStream)? {
                Reply::StreamStarted(TELEMETRY_STREAM) => Ok(()),
                _ => Err(unexpected(MessageType::BeginStream)),
            }
        })
        .await
        .map_err(LinkError::aborted(HandshakeStep::BeginStream))?;
    info!("telemetry stream started");

    Ok(params)
}
