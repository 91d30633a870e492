//! State published to the display layer after every tick transition.

use super::PollError;
use crate::models::CombinedSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    MatchFetch,
    RankFetch,
    RateLimited,
}

/// Cloneable, comparable form of a [`PollError`], suitable for a `watch` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PollError> for PublishedError {
    fn from(e: &PollError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayState {
    pub snapshot: Option<CombinedSnapshot>,
    pub is_loading: bool,
    pub error: Option<PublishedError>,
    pub is_stale: bool,
    pub is_rank_stale: bool,
}

impl OverlayState {
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Default::default()
        }
    }

    /// A fatal configuration problem: no snapshot, no retry.
    pub fn misconfigured(e: &PollError) -> Self {
        Self {
            error: Some(e.into()),
            ..Default::default()
        }
    }

    /// The error is only worth a persistent display when there is nothing else to show.
    pub fn shows_error(&self) -> bool {
        self.error.is_some() && self.snapshot.is_none()
    }
}
