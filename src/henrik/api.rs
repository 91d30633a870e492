use async_trait::async_trait;

use super::client::HenrikClient;
use super::endpoints::MatchWindow;
use super::region::Region;
use super::types::HenrikApiResponse;
use crate::models::{MatchRecord, RankSnapshot};

/// Remote calls the poller depends on, expressed in domain types.
#[async_trait]
pub trait StatsApi: Send + Sync {
    /// Translate a display name and tag into a player identifier, if the provider knows one.
    async fn resolve_puuid(&self, name: &str, tag: &str) -> HenrikApiResponse<Option<String>>;

    async fn recent_matches(
        &self,
        region: Region,
        puuid: &str,
        window: MatchWindow,
    ) -> HenrikApiResponse<Vec<MatchRecord>>;

    async fn current_rank(&self, region: Region, puuid: &str) -> HenrikApiResponse<RankSnapshot>;
}

#[async_trait]
impl StatsApi for HenrikClient {
    async fn resolve_puuid(&self, name: &str, tag: &str) -> HenrikApiResponse<Option<String>> {
        let account = self.get_account_by_riot_id(name, tag).await?;
        Ok(account.puuid.filter(|p| !p.is_empty()))
    }

    async fn recent_matches(
        &self,
        region: Region,
        puuid: &str,
        window: MatchWindow,
    ) -> HenrikApiResponse<Vec<MatchRecord>> {
        let matches = self.get_match_window(region, puuid, window).await?;
        Ok(matches.into_iter().map(MatchRecord::from).collect())
    }

    async fn current_rank(&self, region: Region, puuid: &str) -> HenrikApiResponse<RankSnapshot> {
        Ok(self.get_mmr(region, puuid).await?.into())
    }
}
