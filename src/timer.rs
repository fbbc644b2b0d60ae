use std::time::{Duration, Instant};

/// Lap stopwatch: every [`Timer::lap`] returns the time since the previous one.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    last: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}
