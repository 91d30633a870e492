use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::models::{MatchRecord, Participant, RankSnapshot, TeamOutcome};

#[derive(Debug, Error)]
pub enum HenrikApiError {
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("HTTP status error: {status}")]
    Status {
        status: StatusCode,
        retry_after: Option<Duration>,
    },
}

impl HenrikApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Reqwest(e) => e.status(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            Self::Reqwest(_) => None,
        }
    }
}

/// A call to the HenrikDev API either succeeds or fails with a [`HenrikApiError`].
pub type HenrikApiResponse<T> = Result<T, HenrikApiError>;

/// Longest `Retry-After` hint honoured. Larger values are clamped to it.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60 * 60);

/// Parse a `Retry-After` value expressed in (possibly fractional) seconds.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let hint = Duration::try_from_secs_f64(secs).map_or(MAX_RETRY_AFTER, |d| d.min(MAX_RETRY_AFTER));
    Some(hint)
}

// ============================================================================
// Envelope
// ============================================================================

/// Every HenrikDev response wraps its payload in `{ "status": .., "data": .. }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
}

// ============================================================================
// Account-v1
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountDto {
    pub puuid: Option<String>,
}

// ============================================================================
// Matches-v3
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MatchDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: MatchMetadataDto,
    #[serde(default)]
    pub players: Option<PlayersDto>,
    #[serde(default)]
    pub teams: Option<TeamsDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchMetadataDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub matchid: String,
    #[serde(default)]
    pub mode_id: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub game_start: i64,
    #[serde(default)]
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayersDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub all_players: Vec<PlayerDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub puuid: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: PlayerStatsDto,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerStatsDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub kills: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deaths: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamsDto {
    #[serde(default)]
    pub red: Option<TeamDto>,
    #[serde(default)]
    pub blue: Option<TeamDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamDto {
    #[serde(default)]
    pub has_won: Option<bool>,
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl MatchDto {
    pub fn is_competitive(&self) -> bool {
        let by_id = self
            .metadata
            .mode_id
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("competitive"));
        let by_name = self
            .metadata
            .mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("competitive"));
        by_id || by_name
    }
}

impl From<MatchDto> for MatchRecord {
    fn from(dto: MatchDto) -> Self {
        let is_competitive = dto.is_competitive();
        let completed = dto.metadata.is_completed != Some(false);

        let participants = dto
            .players
            .unwrap_or_default()
            .all_players
            .into_iter()
            .map(|p| Participant {
                player_id: p.puuid,
                team: p.team.unwrap_or_default().to_lowercase(),
                kills: p.stats.kills,
                deaths: p.stats.deaths,
            })
            .collect();

        let teams = dto.teams.unwrap_or_default();
        let outcomes = [("red", teams.red), ("blue", teams.blue)]
            .into_iter()
            .filter_map(|(name, team)| {
                let team = team?;
                Some(TeamOutcome {
                    team: name.to_string(),
                    finished: completed && team.has_won.is_some(),
                    won: team.has_won.unwrap_or(false),
                })
            })
            .collect();

        Self {
            match_id: dto.metadata.matchid,
            is_competitive,
            started_at: dto.metadata.game_start,
            participants,
            outcomes,
        }
    }
}

// ============================================================================
// MMR-v2
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MmrDto {
    #[serde(default)]
    pub current_data: CurrentMmrDto,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentMmrDto {
    #[serde(default)]
    pub ranking_in_tier: Option<i32>,
    #[serde(default)]
    pub mmr_change_to_last_game: Option<i32>,
    #[serde(default)]
    pub images: Option<RankImagesDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankImagesDto {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

impl From<MmrDto> for RankSnapshot {
    fn from(dto: MmrDto) -> Self {
        let current = dto.current_data;
        let image_url = current.images.and_then(|i| i.large.or(i.small));

        Self {
            current_points: current.ranking_in_tier,
            recent_points_change: current.mmr_change_to_last_game,
            image_url,
        }
    }
}
