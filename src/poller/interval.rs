//! Rate-budget arithmetic: how often one key may poll without exceeding the provider quota.

use std::num::NonZeroU32;
use std::time::Duration;

/// API budget constants shared by every component of a polling session.
#[derive(Debug, Clone, PartialEq)]
pub struct PollBudget {
    /// Provider budget in requests per minute.
    pub budget_rpm: NonZeroU32,
    /// Fraction of the budget this overlay allows itself.
    pub headroom: f64,
    /// Extra margin on top of the headroom.
    pub safety: f64,
    /// Expected share of requests that will be retried.
    pub retry_padding: f64,
    /// Matches + rank.
    pub requests_per_poll: u32,
    pub floor: Duration,
    pub backoff_cap: Duration,
    /// Longest server retry hint honoured.
    pub retry_after_cap: Duration,
    pub phase_min: Duration,
    pub phase_max: Duration,
    pub max_cache_age: Duration,
    pub match_window: u32,
}

impl PollBudget {
    pub const DEFAULT_BUDGET_RPM: NonZeroU32 = match NonZeroU32::new(30) {
        Some(rpm) => rpm,
        None => NonZeroU32::MIN,
    };

    pub fn with_budget_rpm(mut self, budget_rpm: NonZeroU32) -> Self {
        self.budget_rpm = budget_rpm;
        self
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        Self {
            budget_rpm: Self::DEFAULT_BUDGET_RPM,
            headroom: 0.8,
            safety: 0.9,
            retry_padding: 0.1,
            requests_per_poll: 2,
            floor: Duration::from_secs(10),
            backoff_cap: Duration::from_secs(30),
            retry_after_cap: Duration::from_secs(60 * 60),
            phase_min: Duration::from_millis(250),
            phase_max: Duration::from_secs(5),
            max_cache_age: Duration::from_secs(30 * 60),
            match_window: 20,
        }
    }
}

/// Minimum delay in milliseconds between two polls so that `accounts` overlays sharing one key
/// stay under the budget. Never below the floor.
pub fn compute_safe_poll_ms(accounts: u32, budget: &PollBudget) -> u64 {
    let accounts = f64::from(accounts.max(1));
    let effective_rpm = f64::from(budget.budget_rpm.get()) * budget.headroom * budget.safety;
    let floor_ms = budget.floor.as_millis() as u64;

    if !effective_rpm.is_finite() || effective_rpm <= 0.0 {
        return floor_ms;
    }

    let adjusted_requests = f64::from(budget.requests_per_poll) * (1.0 + budget.retry_padding);
    let required_secs = (accounts * adjusted_requests * 60.0 / effective_rpm).ceil() as u64;

    (required_secs * 1000).max(floor_ms)
}

/// Human readable cadence, e.g. "every 1m 2s".
pub fn describe_cadence(interval_ms: u64) -> String {
    let secs = interval_ms.div_ceil(1000);
    match (secs / 60, secs % 60) {
        (0, s) => format!("every {s}s"),
        (m, 0) => format!("every {m}m"),
        (m, s) => format!("every {m}m {s}s"),
    }
}
