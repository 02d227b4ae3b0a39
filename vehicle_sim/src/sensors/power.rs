// sensors/power.rs — battery that sags with throttle

/// Full pack, in the firmware's voltage units.
pub const FULL_PACK: f64 = 1260.0;
pub const EMPTY_PACK: f64 = 990.0;
/// Units per second at full throttle.
const DRAIN_PER_S: f64 = 0.8;
/// Instant sag at full throttle.
const LOAD_SAG: f64 = 35.0;

#[derive(Debug, Clone)]
pub struct Battery {
    charge: f64,
}

impl Default for Battery {
    fn default() -> Self {
        Self { charge: FULL_PACK }
    }
}

impl Battery {
    /// Returns the loaded voltage for this step.
    pub fn step(&mut self, throttle: f64, dt: f64) -> u16 {
        let load = throttle.clamp(0.0, 1.0);
        self.charge = (self.charge - DRAIN_PER_S * load * dt).max(EMPTY_PACK);
        (self.charge - LOAD_SAG * load).round() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_holds_and_load_sags() {
        let mut b = Battery::default();
        assert_eq!(b.step(0.0, 1.0), FULL_PACK as u16);
        let loaded = b.step(1.0, 1.0);
        assert!(loaded < FULL_PACK as u16 - 30);
        assert!(b.step(0.0, 0.0) < FULL_PACK as u16);
    }

    #[test]
    fn never_below_empty() {
        let mut b = Battery::default();
        for _ in 0..10_000 {
            b.step(1.0, 1.0);
        }
        assert_eq!(b.step(0.0, 0.0), EMPTY_PACK as u16);
    }
}
