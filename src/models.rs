//! Domain types shared by the API client, the poller and the snapshot cache.

use serde::{Deserialize, Serialize};

/// A single match as seen by the poller, independent of the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub match_id: String,
    pub is_competitive: bool,
    /// Start time in epoch seconds.
    pub started_at: i64,
    pub participants: Vec<Participant>,
    pub outcomes: Vec<TeamOutcome>,
}

impl MatchRecord {
    pub fn participant(&self, player_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.player_id == player_id)
    }

    pub fn outcome_for(&self, team: &str) -> Option<&TeamOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.team.eq_ignore_ascii_case(team))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub player_id: String,
    pub team: String,
    pub kills: u32,
    pub deaths: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamOutcome {
    pub team: String,
    /// `false` while the match is still being played.
    pub finished: bool,
    pub won: bool,
}

/// Current rank data. Every field is optional since the provider omits them for unranked players.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankSnapshot {
    pub current_points: Option<i32>,
    pub recent_points_change: Option<i32>,
    pub image_url: Option<String>,
}

/// The unit published to the display layer and persisted in the snapshot cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSnapshot {
    pub wins: u32,
    pub losses: u32,
    pub kills: u32,
    pub deaths: u32,
    pub current_points: Option<i32>,
    pub recent_points_change: Option<i32>,
    pub image_url: Option<String>,
}

impl CombinedSnapshot {
    pub fn rank(&self) -> RankSnapshot {
        RankSnapshot {
            current_points: self.current_points,
            recent_points_change: self.recent_points_change,
            image_url: self.image_url.clone(),
        }
    }

    pub fn with_rank(mut self, rank: Option<&RankSnapshot>) -> Self {
        let rank = rank.cloned().unwrap_or_default();
        self.current_points = rank.current_points;
        self.recent_points_change = rank.recent_points_change;
        self.image_url = rank.image_url;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_camel_case_fields() {
        let snapshot = CombinedSnapshot {
            wins: 3,
            losses: 1,
            kills: 54,
            deaths: 40,
            current_points: Some(67),
            recent_points_change: Some(-12),
            image_url: Some("https://media.valorant-api.com/large.png".into()),
        };

        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["currentPoints"], 67);
        assert_eq!(json["recentPointsChange"], -12);
        assert_eq!(json["imageUrl"], "https://media.valorant-api.com/large.png");
    }

    #[test]
    fn with_rank_none_clears_rank_fields() {
        let snapshot = CombinedSnapshot {
            wins: 1,
            current_points: Some(10),
            image_url: Some("x".into()),
            ..Default::default()
        }
        .with_rank(None);

        assert_eq!(snapshot.wins, 1);
        assert_eq!(snapshot.rank(), RankSnapshot::default());
    }

    #[test]
    fn outcome_lookup_ignores_team_case() {
        let record = MatchRecord {
            match_id: "m".into(),
            is_competitive: true,
            started_at: 0,
            participants: vec![],
            outcomes: vec![TeamOutcome {
                team: "red".into(),
                finished: true,
                won: true,
            }],
        };

        assert!(record.outcome_for("Red").is_some());
        assert!(record.outcome_for("blue").is_none());
    }
}
