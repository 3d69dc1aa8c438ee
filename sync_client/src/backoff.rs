use std::time::Duration;

/// Capped exponential delay between reconnection attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            attempts: 0,
        }
    }

    /// Consecutive failures since the last success.
    pub fn attempts(&self) -> u32 { self.attempts }

    /// Records a failure and returns how long to wait before the next try.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2_u32.saturating_pow(self.attempts);
        self.attempts = self.attempts.saturating_add(1);

        self.initial.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&mut self) { self.attempts = 0; }
}
