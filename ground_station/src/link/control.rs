// link/control.rs — transmit loop: current stick state to the vehicle at a fixed rate
use crate::{
    link::Shared,
    net::{Endpoint, PauseFlag},
};
use link_protocol::ControlFrame;
use std::sync::Arc;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub(crate) async fn run(
    shared: Arc<Shared>,
    endpoint: Endpoint,
    paused: PauseFlag,
    every: Duration,
    stop: CancellationToken,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sent: u64 = 0;
    info!(interval_ms = every.as_millis() as u64, "control loop started");

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if paused.is_set() {
            continue;
        }

        let frame = ControlFrame::from_axes(&shared.controls.load());
        match endpoint.send(&frame.encode()).await {
            Ok(()) => sent += 1,
            Err(e) => warn!(error = %e, "control send error"),
        }
        if sent % 500 == 1 {
            debug!(sent, arm = frame.arm, throttle = frame.throttle, "control");
        }
    }

    info!(sent, "control loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_protocol::ControlAxes;
    use tokio::net::UdpSocket;

    const EVERY: Duration = Duration::from_millis(10);

    async fn rig() -> (Arc<Shared>, Endpoint, UdpSocket) {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let ep = Endpoint::open("127.0.0.1:0", peer.local_addr().unwrap()).await.unwrap();
        (Arc::new(Shared::new(4)), ep, peer)
    }

    async fn next_frame(peer: &UdpSocket) -> Option<ControlFrame> {
        let mut buf = [0u8; 64];
        let (n, _) = time::timeout(Duration::from_millis(200), peer.recv_from(&mut buf))
            .await
            .ok()?
            .ok()?;
        ControlFrame::decode(&buf[..n]).ok()
    }

    #[tokio::test]
    async fn sends_current_controls() {
        let (shared, ep, peer) = rig().await;
        shared.controls.store(ControlAxes { throttle: 0.85, pitch: 0.5, ..Default::default() });
        let stop = CancellationToken::new();
        let task = tokio::spawn(run(shared.clone(), ep, PauseFlag::default(), EVERY, stop.clone()));

        let frame = next_frame(&peer).await.expect("control frame");
        assert_eq!(frame.arm, 1);
        assert_eq!(frame.throttle, -27200);
        assert_eq!(frame.pitch, 16000);

        shared.controls.store(ControlAxes::default());
        // a frame may already be in flight with the old values
        let mut latest = next_frame(&peer).await.unwrap();
        for _ in 0..3 {
            latest = next_frame(&peer).await.unwrap();
        }
        assert_eq!(latest, ControlFrame::default());

        stop.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn paused_loop_sends_nothing() {
        let (shared, ep, peer) = rig().await;
        let paused = PauseFlag::default();
        paused.set(true);
        let stop = CancellationToken::new();
        let task = tokio::spawn(run(shared, ep, paused.clone(), EVERY, stop.clone()));

        assert!(next_frame(&peer).await.is_none());
        paused.set(false);
        assert!(next_frame(&peer).await.is_some());

        stop.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stop_ends_the_loop() {
        let (shared, ep, peer) = rig().await;
        let stop = CancellationToken::new();
        let task = tokio::spawn(run(shared, ep, PauseFlag::default(), EVERY, stop.clone()));
        assert!(next_frame(&peer).await.is_some());

        stop.cancel();
        task.await.unwrap();
        // at most what was already queued before the stop
        let mut trailing = 0;
        while next_frame(&peer).await.is_some() {
            trailing += 1;
            assert!(trailing < 5, "loop kept sending after stop");
        }
    }
}
