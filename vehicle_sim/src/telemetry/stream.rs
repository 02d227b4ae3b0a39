// telemetry/stream.rs — periodic type-10 frames to the ground once streaming
use crate::{net::udp, sensors::FlightModel, vehicle::VehicleShared};
use link_protocol::TelemetryFrame;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub async fn run_stream(
    shared: Arc<VehicleShared>,
    sock: Arc<UdpSocket>,
    every: Duration,
    seed: u64,
    cancel: CancellationToken,
) {
    let mut model = FlightModel::new(seed);
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;

        let (streaming, control, ground) = {
            let fc = shared.controller.lock();
            (fc.is_streaming(), fc.last_control(), *shared.ground.lock())
        };
        let state = model.step(control, dt);
        let (true, Some(to)) = (streaming, ground) else {
            continue;
        };

        let frame = TelemetryFrame::quantize(&state).encode();
        if let Err(e) = udp::send(&sock, &frame, to).await {
            warn!(error = %e, "telemetry send error");
            continue;
        }
        seq += 1;
        if seq % 250 == 1 {
            debug!(seq, altitude = state.altitude, voltage = state.voltage, armed = state.armed, "telemetry");
        }
    }

    info!(sent = seq, "telemetry stream stopped");
}
