use crate::henrik::client::HenrikClient;
use crate::henrik::types::{AccountDto, HenrikApiResponse};

impl HenrikClient {
    /// Get account by Riot ID (display name + tag).
    /// Account lookups are region agnostic.
    pub async fn get_account_by_riot_id(
        &self,
        name: &str,
        tag: &str,
    ) -> HenrikApiResponse<AccountDto> {
        let url = self.url(&format!(
            "/valorant/v1/account/{}/{}",
            urlencoding::encode(name),
            urlencoding::encode(tag)
        ));

        self.get(url, &[]).await
    }
}
