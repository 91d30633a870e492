//! Best-effort rank fetch. A failure never aborts the tick.

use tracing::debug;

use super::PollError;
use crate::henrik::{Region, StatsApi};
use crate::models::RankSnapshot;

#[derive(Debug)]
pub enum RankFetch {
    Fresh(RankSnapshot),
    /// The fetch failed; callers fall back to the last good rank fields for this tick only.
    Stale(PollError),
}

impl RankFetch {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    /// Rank fields to publish: the fresh ones, otherwise `fallback`.
    pub fn or_last_good(&self, fallback: Option<&RankSnapshot>) -> Option<RankSnapshot> {
        match self {
            Self::Fresh(rank) => Some(rank.clone()),
            Self::Stale(_) => fallback.cloned(),
        }
    }
}

pub async fn fetch_rank<A>(api: &A, region: Region, puuid: &str) -> RankFetch
where
    A: StatsApi + ?Sized,
{
    match api.current_rank(region, puuid).await {
        Ok(rank) => RankFetch::Fresh(rank),
        Err(e) => {
            debug!(error = %e, "🏅 Rank unavailable, keeping last known values");
            RankFetch::Stale(PollError::RankFetch(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::testing::{FakeApi, server_error};

    fn rank(points: i32) -> RankSnapshot {
        RankSnapshot {
            current_points: Some(points),
            recent_points_change: Some(20),
            image_url: Some("icon.png".into()),
        }
    }

    #[tokio::test]
    async fn fresh_rank_wins_over_fallback() {
        let api = FakeApi::default().with_rank(rank(55));

        let fetched = fetch_rank(&api, Region::Eu, "p").await;

        assert!(fetched.is_fresh());
        assert_eq!(fetched.or_last_good(Some(&rank(10))), Some(rank(55)));
    }

    #[tokio::test]
    async fn failure_falls_back_to_last_good_or_nothing() {
        let api = FakeApi::default();
        api.fail_rank_once(server_error());
        api.fail_rank_once(server_error());

        let fetched = fetch_rank(&api, Region::Eu, "p").await;
        assert!(matches!(fetched, RankFetch::Stale(PollError::RankFetch(_))));
        assert_eq!(fetched.or_last_good(Some(&rank(10))), Some(rank(10)));

        let fetched = fetch_rank(&api, Region::Eu, "p").await;
        assert_eq!(fetched.or_last_good(None), None);
        assert_eq!(api.calls().rank, 2);
    }
}
