// link/telemetry.rs — receive loop: decode telemetry, feed the recorder, watch liveness
use crate::{
    events::DISCONNECTED_NOTICE,
    link::Shared,
    liveness::LivenessTimer,
    net::PauseFlag,
};
use link_protocol::decode_telemetry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Runs until the session is cancelled or telemetry stays absent for the
/// whole liveness budget, in which case it reports the loss and closes the
/// session itself.
pub(crate) async fn run(
    shared: Arc<Shared>,
    paused: PauseFlag,
    mut inbound: mpsc::Receiver<Vec<u8>>,
    poll: Duration,
    budget: u32,
    session: CancellationToken,
) {
    let mut timer = LivenessTimer::new(budget);
    info!(budget, poll_ms = poll.as_millis() as u64, "telemetry loop started");

    loop {
        let next = tokio::select! {
            _ = session.cancelled() => {
                debug!("telemetry loop cancelled");
                return;
            }
            r = time::timeout(poll, inbound.recv()) => r,
        };

        match next {
            Ok(Some(datagram)) => match decode_telemetry(&datagram) {
                Ok(snapshot) => {
                    shared.telemetry.store(snapshot);
                    shared.recorder.lock().record(&snapshot);
                    timer.reset();
                    continue;
                }
                Err(e) => trace!(error = %e, "discarding inbound datagram"),
            },
            Ok(None) => {
                debug!("inbound queue closed");
                return;
            }
            Err(_elapsed) => {}
        }

        // request/reply traffic owns the endpoint; silence is expected
        if paused.is_set() {
            timer.reset();
            continue;
        }
        if !timer.tick() {
            break;
        }
        debug!(remaining = timer.remaining(), "telemetry late");
    }

    warn!(budget, "telemetry lost; closing session");
    shared.mark_disconnected(DISCONNECTED_NOTICE);
    session.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{LinkEvent, LinkState};
    use link_protocol::TelemetryFrame;

    const POLL: Duration = Duration::from_millis(100);

    fn connected() -> Arc<Shared> {
        let shared = Arc::new(Shared::new(16));
        shared.set_state(LinkState::Connected { telemetry_active: true, control_active: true });
        shared
    }

    fn frame(altitude: u16) -> Vec<u8> {
        TelemetryFrame { altitude, armed: 1, voltage: 3000, ..Default::default() }
            .encode()
            .to_vec()
    }

    #[tokio::test(start_paused = true)]
    async fn valid_telemetry_updates_snapshot_and_recorder() {
        let shared = connected();
        shared.recorder.lock().start();
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(shared.clone(), PauseFlag::default(), rx, POLL, 4, cancel.clone()));

        tx.send(frame(12)).await.unwrap();
        tx.send(frame(13)).await.unwrap();
        time::sleep(Duration::from_millis(10)).await;

        let snap = shared.telemetry.load();
        assert_eq!(snap.altitude, 13);
        assert_eq!(snap.voltage, 1000);
        assert!(snap.armed);
        assert_eq!(shared.recorder.lock().index(), 2);

        cancel.cancel();
        task.await.unwrap();
        assert!(shared.state().is_connected(), "cancel is not a loss");
    }

    #[tokio::test(start_paused = true)]
    async fn silence_exhausts_budget_and_reports_once() {
        let shared = connected();
        let mut events = shared.events.subscribe();
        let (_tx, rx) = mpsc::channel::<Vec<u8>>(8);
        let cancel = CancellationToken::new();

        run(shared.clone(), PauseFlag::default(), rx, POLL, 4, cancel.clone()).await;

        assert_eq!(shared.state(), LinkState::Disconnected);
        assert!(cancel.is_cancelled());
        assert_eq!(events.recv().await.unwrap(), LinkEvent::StateChanged(LinkState::Disconnected));
        assert_eq!(events.recv().await.unwrap(), LinkEvent::Notice(DISCONNECTED_NOTICE.into()));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_datagrams_count_against_the_budget() {
        let shared = connected();
        let (tx, rx) = mpsc::channel(8);
        for _ in 0..3 {
            tx.send(vec![10, 0, 0]).await.unwrap();
        }
        let cancel = CancellationToken::new();
        let started = time::Instant::now();

        run(shared.clone(), PauseFlag::default(), rx, POLL, 3, cancel.clone()).await;

        assert_eq!(shared.state(), LinkState::Disconnected);
        assert!(started.elapsed() < POLL, "no poll timeout needed");
    }

    #[tokio::test(start_paused = true)]
    async fn pause_keeps_the_session_alive() {
        let shared = connected();
        let paused = PauseFlag::default();
        paused.set(true);
        let (_tx, rx) = mpsc::channel::<Vec<u8>>(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(shared.clone(), paused.clone(), rx, POLL, 2, cancel.clone()));

        time::sleep(POLL * 20).await;
        assert!(shared.state().is_connected());

        paused.set(false);
        task.await.unwrap();
        assert_eq!(shared.state(), LinkState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn late_telemetry_restores_the_budget() {
        let shared = connected();
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(shared.clone(), PauseFlag::default(), rx, POLL, 3, cancel.clone()));

        // two misses, then a frame, twice over: never three misses in a row
        for alt in [1, 2] {
            time::sleep(POLL * 2 + Duration::from_millis(50)).await;
            tx.send(frame(alt)).await.unwrap();
        }
        time::sleep(Duration::from_millis(10)).await;
        assert!(shared.state().is_connected());
        assert_eq!(shared.telemetry.load().altitude, 2);

        cancel.cancel();
        task.await.unwrap();
    }
}
