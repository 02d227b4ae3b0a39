// sensors/attitude.rs — attitude that follows the sticks with lag and jitter
use link_protocol::ControlAxes;
use rand::{Rng, rngs::StdRng};

/// Full stick deflection in degrees of roll or pitch.
const MAX_TILT_DEG: f64 = 30.0;
/// Full yaw stick in degrees per second.
const MAX_YAW_RATE_DEG: f64 = 90.0;
/// First-order response, 1/s.
const RESPONSE: f64 = 8.0;
const JITTER_DEG: f64 = 0.15;

#[derive(Debug, Default, Clone)]
pub struct AttitudeModel {
    angles: [f64; 3],
}

impl AttitudeModel {
    pub fn angles(&self) -> [f64; 3] {
        self.angles
    }

    pub fn step(&mut self, axes: &ControlAxes, dt: f64, rng: &mut StdRng) -> [f64; 3] {
        let k = (dt * RESPONSE).min(1.0);
        let targets = [axes.roll as f64 * MAX_TILT_DEG, axes.pitch as f64 * MAX_TILT_DEG];
        for (angle, target) in self.angles.iter_mut().zip(targets) {
            *angle += (target - *angle) * k;
        }

        let yaw = self.angles[2] + axes.yaw as f64 * MAX_YAW_RATE_DEG * dt;
        self.angles[2] = (yaw + 180.0).rem_euclid(360.0) - 180.0;

        self.angles.map(|a| a + rng.random_range(-JITTER_DEG..JITTER_DEG))
    }
}
