// Session countdown derived from a shared start instant.

use super::ports::Clock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_ROUND_DURATION: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockReading {
    Running { remaining_secs: u64 },
    Expired,
}

/// Fixed-length countdown. Both participants build it from the same start instant
/// (epoch millis handed out at room creation) so they expire together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundClock {
    start_ms: u64,
    duration: Duration,
}

impl RoundClock {
    pub fn new(start_ms: u64, duration: Duration) -> Self {
        Self { start_ms, duration }
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Whole seconds left; elapsed time is floored and a `now` before the start clamps
    /// to the full duration.
    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        let elapsed_secs = now_ms.saturating_sub(self.start_ms) / 1000;
        self.duration.as_secs().saturating_sub(elapsed_secs)
    }

    pub fn read(&self, now_ms: u64) -> ClockReading {
        match self.remaining_secs(now_ms) {
            0 => ClockReading::Expired,
            remaining_secs => ClockReading::Running { remaining_secs },
        }
    }
}

/// Renders seconds as `MM:SS`.
pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
