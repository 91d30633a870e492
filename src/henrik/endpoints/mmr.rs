use crate::henrik::client::HenrikClient;
use crate::henrik::region::Region;
use crate::henrik::types::{HenrikApiResponse, MmrDto};

impl HenrikClient {
    /// Get the current rank data of a player.
    pub async fn get_mmr(&self, region: Region, puuid: &str) -> HenrikApiResponse<MmrDto> {
        let url = self.url(&format!(
            "/valorant/v2/by-puuid/mmr/{}/{}",
            region.as_str(),
            urlencoding::encode(puuid)
        ));

        self.get(url, &[]).await
    }
}
