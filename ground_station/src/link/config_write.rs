// link/config_write.rs — push operator parameter edits, confirmed by exact echo
use crate::{
    events::LinkEvent,
    link::Shared,
    net::{Exchange, RetryPolicy},
};
use link_protocol::{MessageType, ParameterId, Request, WireError};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingEdit {
    pub id: ParameterId,
    pub value: f32,
}

/// Edits keyed by where the operator made them (an opaque UI location).
pub type PendingEdits = BTreeMap<String, PendingEdit>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigReport {
    pub applied: Vec<String>,
    pub rejected: Vec<String>,
}

pub(crate) async fn run(
    shared: &Shared,
    exchange: &Exchange,
    policy: RetryPolicy,
    edits: &mut PendingEdits,
) -> ConfigReport {
    let held = exchange.hold().await;
    let mut report = ConfigReport::default();

    for (location, edit) in edits.iter() {
        let request = Request::WriteParameter(edit.id, edit.value);
        let expected = request.encode();
        let outcome = exchange
            .request(&held, &request, policy, |b| {
                if b == expected.as_slice() {
                    Ok(())
                } else {
                    Err(WireError::EchoMismatch { kind: MessageType::WriteParameter.tag() }.into())
                }
            })
            .await;

        match outcome {
            Ok(()) => {
                info!(%location, id = %edit.id, value = edit.value, "parameter written");
                shared.parameters.update(|set| {
                    if let Some(v) = set.get_mut(&edit.id) {
                        *v = edit.value;
                    }
                });
                shared.emit(LinkEvent::applied(location));
                report.applied.push(location.clone());
            }
            Err(e) => {
                warn!(%location, id = %edit.id, error = %e, "parameter write failed");
                shared.emit(LinkEvent::rejected(location));
                report.rejected.push(location.clone());
            }
        }
    }
    drop(held);

    for location in &report.applied {
        edits.remove(location);
    }
    report
}
