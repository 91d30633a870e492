use tracing::debug;

use super::PollError;
use crate::config::AccountRef;
use crate::henrik::StatsApi;

/// Turns the configured account into a player identifier, at most one lookup per session.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    account: AccountRef,
    resolved: Option<String>,
}

impl IdentityResolver {
    pub fn new(account: AccountRef) -> Self {
        let resolved = match &account {
            AccountRef::Puuid(puuid) if !puuid.trim().is_empty() => Some(puuid.clone()),
            _ => None,
        };

        Self { account, resolved }
    }

    pub fn resolved(&self) -> Option<&str> {
        self.resolved.as_deref()
    }

    pub async fn resolve<A>(&mut self, api: &A) -> Result<String, PollError>
    where
        A: StatsApi + ?Sized,
    {
        if let Some(puuid) = &self.resolved {
            return Ok(puuid.clone());
        }

        let (name, tag) = match &self.account {
            AccountRef::RiotId { name, tag } if !name.trim().is_empty() && !tag.trim().is_empty() => {
                (name.as_str(), tag.as_str())
            }
            _ => {
                return Err(PollError::Resolution(
                    "Provide either PUUID or name+tag".into(),
                ));
            }
        };

        let puuid = api
            .resolve_puuid(name, tag)
            .await
            .map_err(PollError::ResolutionFetch)?
            .ok_or_else(|| PollError::Resolution(format!("No PUUID returned for {name}#{tag}")))?;

        debug!(riot_id = %self.account, "🪪 Account resolved");
        self.resolved = Some(puuid.clone());

        Ok(puuid)
    }
}
