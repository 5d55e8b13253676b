use std::time::{Duration, Instant};

use crate::foundation::error::{StillcutError, StillcutResult};

/// Bounded backoff used while waiting on a writer's readiness signal.
///
/// Polls a few times back to back, then yields, then sleeps with a doubling interval capped at
/// `max_sleep`, and gives up after `timeout`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadinessBackoff {
    pub spins: u32,
    pub yields: u32,
    pub initial_sleep: Duration,
    pub max_sleep: Duration,
    pub timeout: Duration,
}

impl ReadinessBackoff {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Poll `ready` until it returns `true`. Returns the number of polls that saw "not ready".
    pub fn wait(&self, mut ready: impl FnMut() -> bool) -> StillcutResult<u64> {
        let start = Instant::now();
        let mut misses = 0u64;
        let mut sleep = self.initial_sleep;
        loop {
            if ready() {
                return Ok(misses);
            }
            misses += 1;
            if start.elapsed() >= self.timeout {
                return Err(StillcutError::writer(format!(
                    "writer not ready for more media data after {:?} ({misses} polls)",
                    self.timeout
                )));
            }
            if misses <= u64::from(self.spins) {
                std::hint::spin_loop();
            } else if misses <= u64::from(self.spins) + u64::from(self.yields) {
                std::thread::yield_now();
            } else {
                let remaining = self.timeout.saturating_sub(start.elapsed());
                std::thread::sleep(sleep.min(remaining));
                sleep = (sleep * 2).min(self.max_sleep);
            }
        }
    }
}

impl Default for ReadinessBackoff {
    fn default() -> Self {
        Self {
            spins: 16,
            yields: 16,
            initial_sleep: Duration::from_micros(50),
            max_sleep: Duration::from_millis(20),
            timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/readiness.rs"]
mod tests;
