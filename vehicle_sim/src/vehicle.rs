// vehicle.rs — link task plus telemetry stream, with a handle for tests and main
use crate::{
    commands::{FlightController, Outcome},
    config::VehicleConfig,
    errors::SimError,
    net::udp,
    telemetry::run_stream,
};
use link_protocol::{ControlFrame, MAX_DATAGRAM_SIZE, ParameterId};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

pub struct VehicleShared {
    pub controller: Mutex<FlightController>,
    /// Where telemetry goes: the last address that sent us anything valid.
    pub ground: Mutex<Option<SocketAddr>>,
}

pub struct VehicleHandle {
    addr: SocketAddr,
    shared: Arc<VehicleShared>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl VehicleHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn parameter(&self, id: ParameterId) -> Option<f32> {
        self.shared.controller.lock().parameter(id)
    }

    /// Turn the telemetry stream on or off without any exchange with the ground.
    pub fn set_streaming(&self, on: bool) {
        self.shared.controller.lock().set_streaming(on);
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.controller.lock().is_streaming()
    }

    pub fn requests_seen(&self) -> u64 {
        self.shared.controller.lock().requests_seen()
    }

    pub fn control_frames(&self) -> u64 {
        self.shared.controller.lock().control_frames()
    }

    pub fn last_control(&self) -> Option<ControlFrame> {
        self.shared.controller.lock().last_control()
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Bind and start both vehicle tasks.
pub async fn spawn(cfg: VehicleConfig) -> Result<VehicleHandle, SimError> {
    let sock = Arc::new(udp::bind(&cfg.bind_addr).await?);
    let addr = sock.local_addr()?;
    let shared = Arc::new(VehicleShared {
        controller: Mutex::new(FlightController::new(&cfg)),
        ground: Mutex::new(None),
    });
    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();

    tracker.spawn(run_link(shared.clone(), sock.clone(), cancel.clone()));
    tracker.spawn(run_stream(
        shared.clone(),
        sock,
        cfg.telemetry_interval,
        cfg.seed,
        cancel.clone(),
    ));
    info!(%addr, parameters = cfg.parameters.len(), "vehicle up");

    Ok(VehicleHandle { addr, shared, cancel, tracker })
}

async fn run_link(shared: Arc<VehicleShared>, sock: Arc<UdpSocket>, cancel: CancellationToken) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (n, from) = tokio::select! {
            _ = cancel.cancelled() => break,
            r = sock.recv_from(&mut buf) => match r {
                Ok(v) => v,
                Err(e) => {
                    warn!("recv error: {e}");
                    continue;
                }
            },
        };

        let outcome = shared.controller.lock().handle(&buf[..n]);
        if outcome != Outcome::Ignored {
            let mut ground = shared.ground.lock();
            if *ground != Some(from) {
                debug!(%from, "ground station address");
                *ground = Some(from);
            }
        }
        if let Outcome::Reply(reply) = outcome {
            if let Err(e) = udp::send(&sock, &reply, from).await {
                warn!(error = %e, "reply send error");
            }
        }
    }
    debug!("link task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_protocol::{MessageType, Reply, TelemetryFrame};
    use std::time::Duration;
    use tokio::time;

    async fn recv(sock: &UdpSocket) -> Vec<u8> {
        let mut buf = [0u8; 512];
        let (n, _) = time::timeout(Duration::from_secs(1), sock.recv_from(&mut buf))
            .await
            .expect("reply in time")
            .unwrap();
        buf[..n].to_vec()
    }

    #[tokio::test]
    async fn answers_and_streams_after_begin() {
        let vehicle = spawn(VehicleConfig {
            telemetry_interval: Duration::from_millis(5),
            ..VehicleConfig::loopback()
        })
        .await
        .unwrap();
        let ground = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        ground.send_to(&[1], vehicle.addr()).await.unwrap();
        let caps = Reply::decode(&recv(&ground).await, MessageType::Discover).unwrap();
        assert!(matches!(caps, Reply::Capabilities(ids) if !ids.is_empty()));
        assert!(!vehicle.is_streaming());

        ground.send_to(&[4, 1], vehicle.addr()).await.unwrap();
        // a frame can overtake the reply once streaming is on
        let mut reply = recv(&ground).await;
        while reply[0] == MessageType::Telemetry.tag() {
            reply = recv(&ground).await;
        }
        assert_eq!(reply, vec![4, 1]);
        assert!(vehicle.is_streaming());

        let frame = TelemetryFrame::decode(&recv(&ground).await).unwrap();
        assert_eq!(frame.armed, 0);

        vehicle.set_streaming(false);
        vehicle.stop().await;
    }
}
