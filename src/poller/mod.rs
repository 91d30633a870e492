//! The stats-polling client: one [`session::Session`] per configured identity, restarted by the
//! [`tracker::Tracker`] whenever the configuration changes.

use std::time::Duration;

use thiserror::Error;

use crate::error::AppError;
use crate::henrik::HenrikApiError;

pub mod aggregator;
pub mod cancel;
pub mod clock;
pub mod identity;
pub mod interval;
pub mod rank;
pub mod schedule;
pub mod session;
pub mod state;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use state::{ErrorKind, OverlayState};
pub use tracker::Tracker;

#[derive(Debug, Error)]
pub enum PollError {
    /// Missing or invalid configuration. Fatal to the session, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Resolution error: {0}")]
    ResolutionFetch(#[source] HenrikApiError),

    #[error("Match fetch error: {0}")]
    MatchFetch(#[source] HenrikApiError),

    #[error("Rank fetch error: {0}")]
    RankFetch(#[source] HenrikApiError),
}

impl PollError {
    fn api_error(&self) -> Option<&HenrikApiError> {
        match self {
            Self::ResolutionFetch(e) | Self::MatchFetch(e) | Self::RankFetch(e) => Some(e),
            Self::Configuration(_) | Self::Resolution(_) => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.api_error().is_some_and(HenrikApiError::is_rate_limited)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.api_error().and_then(HenrikApiError::retry_after)
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_rate_limited() {
            return ErrorKind::RateLimited;
        }
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Resolution(_) | Self::ResolutionFetch(_) => ErrorKind::Resolution,
            Self::MatchFetch(_) => ErrorKind::MatchFetch,
            Self::RankFetch(_) => ErrorKind::RankFetch,
        }
    }
}

impl From<AppError> for PollError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Config(message) => Self::Configuration(message),
            other => Self::Configuration(other.to_string()),
        }
    }
}
