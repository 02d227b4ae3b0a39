// sensors/mod.rs — simulated airframe behind the telemetry stream
pub mod attitude;
pub mod power;

use attitude::AttitudeModel;
use link_protocol::{ControlFrame, TelemetryState};
use power::Battery;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Altitude units per second at full throttle above hover.
const CLIMB_RATE: f64 = 40.0;
const HOVER_THROTTLE: f64 = 0.5;
const MIX: f64 = 0.1;

#[derive(Debug)]
pub struct FlightModel {
    attitude: AttitudeModel,
    battery: Battery,
    altitude: f64,
    rng: StdRng,
}

impl FlightModel {
    pub fn new(seed: u64) -> Self {
        Self {
            attitude: AttitudeModel::default(),
            battery: Battery::default(),
            altitude: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Advance by `dt` seconds under the last control frame received.
    pub fn step(&mut self, control: Option<ControlFrame>, dt: f64) -> TelemetryState {
        let armed = control.is_some_and(|f| f.arm != 0);
        let axes = control.map(|f| f.axes()).unwrap_or_default();
        let throttle = if armed { (axes.throttle as f64).clamp(0.0, 1.0) } else { 0.0 };

        let attitude = self.attitude.step(&axes, dt, &mut self.rng);
        let (roll, pitch, yaw) = (axes.roll as f64, axes.pitch as f64, axes.yaw as f64);
        let engines = if armed {
            [
                throttle + MIX * (pitch + roll - yaw),
                throttle + MIX * (pitch - roll + yaw),
                throttle + MIX * (-pitch - roll - yaw),
                throttle + MIX * (-pitch + roll + yaw),
            ]
            .map(|e| e.clamp(0.0, 1.0))
        } else {
            [0.0; 4]
        };

        if armed {
            self.altitude = (self.altitude + (throttle - HOVER_THROTTLE) * CLIMB_RATE * dt).max(0.0);
        }

        TelemetryState {
            attitude,
            engines,
            altitude: self.altitude.round().min(u16::MAX as f64) as u16,
            voltage: self.battery.step(throttle, dt),
            cycletime: self.rng.random_range(3..=5),
            armed,
        }
    }
}
