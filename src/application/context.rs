// ============================================================
// Layer 2 — Run Context
// ============================================================
// Per-process state that used to live in globals: when the run
// started and whether experiment tracking is on.

use std::time::{Duration, Instant};

use crate::infra::tracking::TrackingMode;

#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    started:  Instant,
    tracking: TrackingMode,
}

impl RunContext {
    pub fn new(testing: bool) -> Self {
        Self {
            started:  Instant::now(),
            tracking: TrackingMode::from_testing_flag(testing),
        }
    }

    pub fn tracking(&self) -> TrackingMode {
        self.tracking
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testing_flag_disables_tracking() {
        assert_eq!(RunContext::new(true).tracking(), TrackingMode::Disabled);
        assert_eq!(RunContext::new(false).tracking(), TrackingMode::Online);
    }
}
