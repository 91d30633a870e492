//! Poll cadence: base interval on success, exponential backoff on failure, jitter everywhere.

use std::time::Duration;

use rand::Rng;

use super::interval::PollBudget;

/// Result of one tick as far as scheduling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Success,
    Failure { retry_after: Option<Duration> },
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    base: Duration,
    budget: PollBudget,
    failures: u32,
}

impl Scheduler {
    pub fn new(base: Duration, budget: PollBudget) -> Self {
        Self {
            base,
            budget,
            failures: 0,
        }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Randomised wait before the very first fetch, so overlays opened together do not poll in lockstep.
    pub fn phase_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.budget.phase_min;
        let max = (self.base / 10).clamp(min, self.budget.phase_max.max(min));
        let ms = rng.gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        Duration::from_millis(ms)
    }

    /// Delay before the next tick given how the last one went.
    pub fn next_delay<R: Rng + ?Sized>(&mut self, outcome: TickOutcome, rng: &mut R) -> Duration {
        let nominal = match outcome {
            TickOutcome::Success => {
                self.failures = 0;
                self.base
            }
            TickOutcome::Failure { retry_after } => {
                let attempt = self.failures;
                self.failures = self.failures.saturating_add(1);
                self.backoff(attempt, retry_after, rng)
            }
        };

        jittered(nominal, rng)
    }

    fn backoff<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        rng: &mut R,
    ) -> Duration {
        if let Some(retry_after) = retry_after {
            return retry_after.clamp(Duration::from_secs(1), self.budget.retry_after_cap);
        }

        let cap = self.budget.backoff_cap.max(self.base);
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let exp = self.base.checked_mul(factor).unwrap_or(cap).min(cap);

        scaled(exp, 0.9 + 0.2 * rng.r#gen::<f64>())
    }
}

/// Scale a delay into roughly [0.95, 1.05) of its nominal value.
pub fn jittered<R: Rng + ?Sized>(delay: Duration, rng: &mut R) -> Duration {
    scaled(delay, 0.95 + 0.1 * rng.r#gen::<f64>())
}

/// `delay * factor`, saturating at `Duration::MAX` instead of panicking.
fn scaled(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}
