// liveness.rs — countdown dead-man's switch for the telemetry receive loop

pub const DEFAULT_BUDGET: u32 = 4;

#[derive(Debug, Clone)]
pub struct LivenessTimer {
    budget: u32,
    remaining: u32,
}

impl LivenessTimer {
    pub fn new(budget: u32) -> Self {
        Self { budget, remaining: budget }
    }

    /// Restore the full budget (valid telemetry, or the endpoint was paused).
    pub fn reset(&mut self) {
        self.remaining = self.budget;
    }

    /// Spend one iteration; returns whether the session is still alive.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining > 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Default for LivenessTimer {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}
