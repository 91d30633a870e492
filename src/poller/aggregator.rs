//! Daily win/loss/kill/death counters accumulated from the recent-match window.

use std::collections::HashSet;

use tracing::trace;

use super::PollError;
use super::clock::DayWindow;
use crate::henrik::{MatchWindow, Region, StatsApi};
use crate::models::MatchRecord;

/// Why a match of the window did not move the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyCounted,
    NotCompetitive,
    BeforeToday,
    NotParticipating,
    Unfinished,
}

/// Running totals for the current local day. Within a day they only ever grow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTotals {
    day: DayWindow,
    pub wins: u32,
    pub losses: u32,
    pub kills: u32,
    pub deaths: u32,
    seen: HashSet<String>,
}

impl DailyTotals {
    pub fn new(day: DayWindow) -> Self {
        Self {
            day,
            wins: 0,
            losses: 0,
            kills: 0,
            deaths: 0,
            seen: HashSet::new(),
        }
    }

    pub fn day(&self) -> DayWindow {
        self.day
    }

    pub fn counted_matches(&self) -> usize {
        self.seen.len()
    }

    /// Reset everything when the local calendar day changed. Returns whether a reset happened.
    pub fn roll_over(&mut self, today: DayWindow) -> bool {
        if today.key == self.day.key {
            return false;
        }
        *self = Self::new(today);
        true
    }

    /// Count every eligible match of the batch, oldest first. Returns how many were newly counted.
    pub fn apply_batch(&mut self, player_id: &str, batch: &[MatchRecord]) -> usize {
        let mut ordered: Vec<&MatchRecord> = batch.iter().collect();
        ordered.sort_by_key(|m| m.started_at);

        let mut counted = 0;
        for record in ordered {
            match self.count(player_id, record) {
                Ok(()) => counted += 1,
                Err(reason) => trace!(match_id = %record.match_id, ?reason, "🧮 Match skipped"),
            }
        }
        counted
    }

    fn count(&mut self, player_id: &str, record: &MatchRecord) -> Result<(), SkipReason> {
        if record.match_id.is_empty() || self.seen.contains(&record.match_id) {
            return Err(SkipReason::AlreadyCounted);
        }
        if !record.is_competitive {
            return Err(SkipReason::NotCompetitive);
        }
        if !self.day.includes_epoch_secs(record.started_at) {
            return Err(SkipReason::BeforeToday);
        }
        let participant = record
            .participant(player_id)
            .ok_or(SkipReason::NotParticipating)?;
        let outcome = record
            .outcome_for(&participant.team)
            .filter(|o| o.finished)
            .ok_or(SkipReason::Unfinished)?;

        if outcome.won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.kills += participant.kills;
        self.deaths += participant.deaths;
        self.seen.insert(record.match_id.clone());

        Ok(())
    }
}

/// Fetch the recent competitive window. A failure aborts the tick and leaves the totals untouched.
pub async fn fetch_window<A>(
    api: &A,
    region: Region,
    puuid: &str,
    size: u32,
) -> Result<Vec<MatchRecord>, PollError>
where
    A: StatsApi + ?Sized,
{
    let window = MatchWindow {
        size,
        competitive_only: true,
    };

    api.recent_matches(region, puuid, window)
        .await
        .map_err(PollError::MatchFetch)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::poller::testing::{ME, ranked_match};

    fn day(y: i32, m: u32, d: u32) -> DayWindow {
        DayWindow::containing(&Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
    }

    fn at(h: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap().timestamp()
    }

    #[test]
    fn counts_wins_losses_kills_and_deaths() {
        let mut totals = DailyTotals::new(day(2024, 5, 1));
        let batch = vec![
            ranked_match("m1", at(9), true, 20, 10),
            ranked_match("m2", at(10), false, 12, 16),
            ranked_match("m3", at(11), true, 25, 8),
        ];

        assert_eq!(totals.apply_batch(ME, &batch), 3);
        assert_eq!((totals.wins, totals.losses), (2, 1));
        assert_eq!((totals.kills, totals.deaths), (57, 34));
    }

    #[test]
    fn same_batch_twice_is_idempotent() {
        let mut totals = DailyTotals::new(day(2024, 5, 1));
        let batch = vec![
            ranked_match("m1", at(9), true, 20, 10),
            ranked_match("m2", at(10), false, 12, 16),
        ];

        totals.apply_batch(ME, &batch);
        let after_first = totals.clone();

        assert_eq!(totals.apply_batch(ME, &batch), 0);
        assert_eq!(totals, after_first);
    }

    #[test]
    fn overlapping_windows_only_count_new_matches() {
        let mut totals = DailyTotals::new(day(2024, 5, 1));
        totals.apply_batch(ME, &[ranked_match("m1", at(9), true, 10, 5)]);

        let newer = vec![
            ranked_match("m2", at(10), true, 3, 3),
            ranked_match("m1", at(9), true, 10, 5),
        ];
        assert_eq!(totals.apply_batch(ME, &newer), 1);
        assert_eq!(totals.wins, 2);
        assert_eq!(totals.kills, 13);
    }

    #[test]
    fn unfinished_match_is_never_counted() {
        let mut totals = DailyTotals::new(day(2024, 5, 1));
        let mut live = ranked_match("live", at(9), false, 4, 9);
        for outcome in &mut live.outcomes {
            outcome.finished = false;
        }

        for _ in 0..3 {
            assert_eq!(totals.apply_batch(ME, std::slice::from_ref(&live)), 0);
        }
        assert_eq!((totals.wins, totals.losses), (0, 0));
        assert_eq!(totals.counted_matches(), 0);

        // Once finished it counts exactly once.
        let finished = ranked_match("live", at(9), false, 14, 12);
        assert_eq!(totals.apply_batch(ME, &[finished]), 1);
        assert_eq!(totals.losses, 1);
    }

    #[test]
    fn skips_non_competitive_old_and_foreign_matches() {
        let mut totals = DailyTotals::new(day(2024, 5, 1));

        let mut casual = ranked_match("casual", at(9), true, 30, 1);
        casual.is_competitive = false;

        let yesterday = Utc.with_ymd_and_hms(2024, 4, 30, 23, 0, 0).unwrap().timestamp();
        let old = ranked_match("old", yesterday, true, 30, 1);

        let mut foreign = ranked_match("foreign", at(9), true, 30, 1);
        foreign.participants.retain(|p| p.player_id != ME);

        assert_eq!(totals.apply_batch(ME, &[casual, old, foreign]), 0);
        assert_eq!(totals.counted_matches(), 0);
    }

    #[test]
    fn missing_match_id_is_ignored() {
        let mut totals = DailyTotals::new(day(2024, 5, 1));
        assert_eq!(totals.apply_batch(ME, &[ranked_match("", at(9), true, 1, 1)]), 0);
    }

    #[test]
    fn roll_over_resets_on_new_day_only() {
        let mut totals = DailyTotals::new(day(2024, 5, 1));
        totals.apply_batch(ME, &[ranked_match("m1", at(9), true, 20, 10)]);

        assert!(!totals.roll_over(day(2024, 5, 1)));
        assert_eq!(totals.wins, 1);

        assert!(totals.roll_over(day(2024, 5, 2)));
        assert_eq!(totals, DailyTotals::new(day(2024, 5, 2)));
        assert_eq!(totals.counted_matches(), 0);
    }
}
