//! Scripted collaborators shared by the poller tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use tokio::sync::Notify;

use super::clock::{Clock, DayWindow};
use crate::henrik::{HenrikApiError, HenrikApiResponse, MatchWindow, Region, StatsApi};
use crate::models::{MatchRecord, Participant, RankSnapshot, TeamOutcome};

/// Player identifier used by [`ranked_match`].
pub const ME: &str = "me";

pub fn server_error() -> HenrikApiError {
    HenrikApiError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        retry_after: None,
    }
}

pub fn rate_limited(secs: u64) -> HenrikApiError {
    HenrikApiError::Status {
        status: StatusCode::TOO_MANY_REQUESTS,
        retry_after: Some(Duration::from_secs(secs)),
    }
}

/// A finished competitive match where [`ME`] plays on red against a single opponent.
pub fn ranked_match(id: &str, started_at: i64, won: bool, kills: u32, deaths: u32) -> MatchRecord {
    MatchRecord {
        match_id: id.to_string(),
        is_competitive: true,
        started_at,
        participants: vec![
            Participant {
                player_id: ME.into(),
                team: "red".into(),
                kills,
                deaths,
            },
            Participant {
                player_id: "opponent".into(),
                team: "blue".into(),
                kills: deaths,
                deaths: kills,
            },
        ],
        outcomes: vec![
            TeamOutcome {
                team: "red".into(),
                finished: true,
                won,
            },
            TeamOutcome {
                team: "blue".into(),
                finished: true,
                won: !won,
            },
        ],
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub account: usize,
    pub matches: usize,
    pub rank: usize,
}

/// Lets a test park a match fetch mid-flight.
#[derive(Debug, Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Debug, Default)]
struct Script {
    account: Option<String>,
    account_failures: VecDeque<HenrikApiError>,
    matches: Vec<MatchRecord>,
    match_failures: VecDeque<HenrikApiError>,
    rank: RankSnapshot,
    rank_failures: VecDeque<HenrikApiError>,
    gate: Option<Arc<Gate>>,
    calls: Calls,
}

/// In-memory [`StatsApi`] answering from a script. Queued failures are served first.
#[derive(Debug, Default)]
pub struct FakeApi {
    script: Mutex<Script>,
}

impl FakeApi {
    pub fn with_account(self, puuid: Option<&str>) -> Self {
        self.script.lock().unwrap().account = puuid.map(str::to_string);
        self
    }

    pub fn with_matches(self, matches: Vec<MatchRecord>) -> Self {
        self.set_matches(matches);
        self
    }

    pub fn with_rank(self, rank: RankSnapshot) -> Self {
        self.set_rank(rank);
        self
    }

    pub fn set_matches(&self, matches: Vec<MatchRecord>) {
        self.script.lock().unwrap().matches = matches;
    }

    pub fn set_rank(&self, rank: RankSnapshot) {
        self.script.lock().unwrap().rank = rank;
    }

    pub fn fail_account_once(&self, e: HenrikApiError) {
        self.script.lock().unwrap().account_failures.push_back(e);
    }

    pub fn fail_matches_once(&self, e: HenrikApiError) {
        self.script.lock().unwrap().match_failures.push_back(e);
    }

    pub fn fail_rank_once(&self, e: HenrikApiError) {
        self.script.lock().unwrap().rank_failures.push_back(e);
    }

    /// Every following match fetch waits on the returned gate before answering.
    pub fn hold_matches(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.script.lock().unwrap().gate = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Calls {
        self.script.lock().unwrap().calls
    }
}

#[async_trait]
impl StatsApi for FakeApi {
    async fn resolve_puuid(&self, _name: &str, _tag: &str) -> HenrikApiResponse<Option<String>> {
        let mut script = self.script.lock().unwrap();
        script.calls.account += 1;
        match script.account_failures.pop_front() {
            Some(e) => Err(e),
            None => Ok(script.account.clone()),
        }
    }

    async fn recent_matches(
        &self,
        _region: Region,
        _puuid: &str,
        _window: MatchWindow,
    ) -> HenrikApiResponse<Vec<MatchRecord>> {
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.calls.matches += 1;
            script.gate.clone()
        };

        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let mut script = self.script.lock().unwrap();
        match script.match_failures.pop_front() {
            Some(e) => Err(e),
            None => Ok(script.matches.clone()),
        }
    }

    async fn current_rank(&self, _region: Region, _puuid: &str) -> HenrikApiResponse<RankSnapshot> {
        let mut script = self.script.lock().unwrap();
        script.calls.rank += 1;
        match script.rank_failures.pop_front() {
            Some(e) => Err(e),
            None => Ok(script.rank.clone()),
        }
    }
}

/// A clock the test moves by hand. Days are computed in UTC.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn today(&self) -> DayWindow {
        DayWindow::containing(&self.now())
    }

    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}
