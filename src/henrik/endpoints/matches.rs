use tracing::warn;

use crate::henrik::client::HenrikClient;
use crate::henrik::region::Region;
use crate::henrik::types::{HenrikApiResponse, MatchDto};

/// Bounds of the recent-match window requested on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchWindow {
    pub size: u32,
    pub competitive_only: bool,
}

impl MatchWindow {
    pub const COMPETITIVE_MODE: &'static str = "competitive";

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("size", self.size.to_string())];
        if self.competitive_only {
            query.push(("mode", Self::COMPETITIVE_MODE.to_string()));
        }
        query
    }
}

impl HenrikClient {
    /// Get the most recent matches of a player, newest first. Entries that cannot be decoded
    /// are dropped so one malformed match does not hide the rest of the window.
    pub async fn get_match_window(
        &self,
        region: Region,
        puuid: &str,
        window: MatchWindow,
    ) -> HenrikApiResponse<Vec<MatchDto>> {
        let url = self.url(&format!(
            "/valorant/v3/by-puuid/matches/{}/{}",
            region.as_str(),
            urlencoding::encode(puuid)
        ));

        let entries: Vec<serde_json::Value> = self.get(url, &window.query()).await?;
        let total = entries.len();
        let matches: Vec<MatchDto> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(dto) => Some(dto),
                Err(e) => {
                    warn!(error = %e, "⚠️ Skipping undecodable match entry");
                    None
                }
            })
            .collect();

        if matches.len() < total {
            warn!(
                skipped = total - matches.len(),
                total, "⚠️ Match window was partially decoded"
            );
        }

        Ok(matches)
    }
}
