//! One polling session: a single task owning every piece of per-identity state, from the
//! resolved account to the daily totals. Torn down and rebuilt whenever the identity changes.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::PollError;
use super::aggregator::{DailyTotals, fetch_window};
use super::cancel::CancelToken;
use super::clock::Clock;
use super::identity::IdentityResolver;
use super::interval::PollBudget;
use super::rank::{RankFetch, fetch_rank};
use super::schedule::{Scheduler, TickOutcome};
use super::state::OverlayState;
use crate::cache::{SnapshotStore, StaleCache};
use crate::config::{SessionConfig, SessionIdentity};
use crate::henrik::StatsApi;
use crate::models::{CombinedSnapshot, RankSnapshot};

/// Collaborators a session borrows from its owner.
pub struct SessionContext<A: ?Sized> {
    pub api: Arc<A>,
    pub store: Option<Arc<dyn SnapshotStore>>,
    pub clock: Arc<dyn Clock>,
    pub budget: PollBudget,
    pub state: Arc<watch::Sender<OverlayState>>,
}

pub struct Session<A: ?Sized> {
    api: Arc<A>,
    clock: Arc<dyn Clock>,
    state: Arc<watch::Sender<OverlayState>>,
    cancel: CancelToken,
    rng: StdRng,
    identity: SessionIdentity,
    match_window: u32,
    scheduler: Scheduler,
    resolver: IdentityResolver,
    totals: DailyTotals,
    cache: StaleCache,
    last_rank: Option<RankSnapshot>,
    published: OverlayState,
}

impl<A> Session<A>
where
    A: StatsApi + ?Sized + 'static,
{
    pub fn new(config: &SessionConfig, ctx: SessionContext<A>, rng: StdRng) -> Self {
        let identity = config.identity.clone();
        let base = config.base_interval(&ctx.budget);
        let cache = StaleCache::new(
            ctx.store,
            StaleCache::cache_key(&identity),
            ctx.budget.max_cache_age,
        );

        Self {
            totals: DailyTotals::new(ctx.clock.today()),
            resolver: IdentityResolver::new(identity.account.clone()),
            scheduler: Scheduler::new(base, ctx.budget.clone()),
            match_window: ctx.budget.match_window,
            api: ctx.api,
            clock: ctx.clock,
            state: ctx.state,
            cancel: CancelToken::new(),
            rng,
            identity,
            cache,
            last_rank: None,
            published: OverlayState::loading(),
        }
    }

    pub fn spawn(self) -> SessionHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());

        SessionHandle { cancel, task }
    }

    async fn run(mut self) {
        info!(
            account = %self.identity.account,
            region = self.identity.region.display_name(),
            base_ms = self.scheduler.base().as_millis() as u64,
            "🔄 Session started"
        );

        if !self.restore().await {
            return;
        }

        let phase = self.scheduler.phase_delay(&mut self.rng);
        debug!(phase_ms = phase.as_millis() as u64, "🔄 Waiting before first poll");

        if self.sleep(phase).await {
            while let Some(outcome) = self.tick().await {
                let delay = self.scheduler.next_delay(outcome, &mut self.rng);
                debug!(
                    delay_ms = delay.as_millis() as u64,
                    failures = self.scheduler.consecutive_failures(),
                    "🔄 Next poll scheduled"
                );

                if !self.sleep(delay).await {
                    break;
                }
            }
        }

        info!(account = %self.identity.account, "🔄 Session stopped");
    }

    /// Publish the loading state, then the cached placeholder if one is still fresh.
    /// Returns `false` once the session has been torn down.
    async fn restore(&mut self) -> bool {
        self.publish(OverlayState::loading());

        let day_start_ms = self.totals.day().start_ms;
        let cached = self.cache.load(self.clock.now_ms(), day_start_ms).await;
        if self.cancel.is_cancelled() {
            return false;
        }

        if let Some(snapshot) = cached {
            debug!(key = %self.cache.key(), "💾 Serving cached snapshot until first poll");
            self.last_rank = Some(snapshot.rank());
            self.publish(OverlayState {
                snapshot: Some(snapshot),
                is_loading: false,
                error: None,
                is_stale: true,
                is_rank_stale: false,
            });
        }

        true
    }

    /// Waits for `delay` unless cancelled first. Returns whether the session is still running.
    async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => !self.cancel.is_cancelled(),
        }
    }

    /// One fetch cycle. `None` means the session was torn down mid-way and nothing was published.
    #[instrument(skip(self), fields(account = %self.identity.account))]
    async fn tick(&mut self) -> Option<TickOutcome> {
        self.roll_over();

        let resolved = self.resolver.resolve(&*self.api).await;
        if self.cancel.is_cancelled() {
            return None;
        }
        let puuid = match resolved {
            Ok(puuid) => puuid,
            Err(e) => return Some(self.fail(e)),
        };

        let batch = fetch_window(&*self.api, self.identity.region, &puuid, self.match_window).await;
        if self.cancel.is_cancelled() {
            return None;
        }
        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => return Some(self.fail(e)),
        };

        self.roll_over();
        let counted = self.totals.apply_batch(&puuid, &batch);
        if counted > 0 {
            info!(
                counted,
                today = self.totals.counted_matches(),
                wins = self.totals.wins,
                losses = self.totals.losses,
                "🔄 ✅ New matches counted"
            );
        }

        let rank = fetch_rank(&*self.api, self.identity.region, &puuid).await;
        if self.cancel.is_cancelled() {
            return None;
        }

        self.complete(rank).await;

        Some(TickOutcome::Success)
    }

    /// Reset the totals at local midnight. A snapshot already on screen is replaced by the
    /// empty totals of the new day so no fallback path can show yesterday's numbers.
    fn roll_over(&mut self) {
        let today = self.clock.today();
        let previous = self.totals.day();

        if !self.totals.roll_over(today) {
            return;
        }
        info!(from = %previous.key, to = %today.key, "🌙 Day rolled over, totals reset");

        self.cache.forget();
        if self.published.snapshot.is_none() {
            return;
        }

        let reset = self.totals_snapshot(self.last_rank.as_ref());
        self.cache.remember(&reset);

        let mut next = self.published.clone();
        next.snapshot = Some(reset);
        next.error = None;
        next.is_stale = false;
        self.publish(next);
    }

    fn totals_snapshot(&self, rank: Option<&RankSnapshot>) -> CombinedSnapshot {
        CombinedSnapshot {
            wins: self.totals.wins,
            losses: self.totals.losses,
            kills: self.totals.kills,
            deaths: self.totals.deaths,
            ..Default::default()
        }
        .with_rank(rank)
    }

    fn fail(&mut self, e: PollError) -> TickOutcome {
        warn!(error = %e, kind = ?e.kind(), "🔄 ⚠️ Poll failed");

        let mut next = self.published.clone();
        next.is_loading = false;
        next.error = Some((&e).into());

        match self.cache.on_rate_limited().filter(|_| e.is_rate_limited()) {
            Some(snapshot) => {
                next.snapshot = Some(snapshot);
                next.is_stale = true;
            }
            None => next.is_stale = next.snapshot.is_some(),
        }

        self.publish(next);

        TickOutcome::Failure {
            retry_after: e.retry_after(),
        }
    }

    async fn complete(&mut self, rank: RankFetch) {
        let rank_fields = rank.or_last_good(self.last_rank.as_ref());
        let snapshot = self.totals_snapshot(rank_fields.as_ref());

        self.publish(OverlayState {
            snapshot: Some(snapshot.clone()),
            is_loading: false,
            error: None,
            is_stale: false,
            is_rank_stale: !rank.is_fresh(),
        });

        match rank {
            RankFetch::Fresh(fresh) => {
                self.last_rank = Some(fresh);
                self.cache.save(&snapshot, self.clock.now_ms()).await;
            }
            RankFetch::Stale(_) => self.cache.remember(&snapshot),
        }
    }

    /// Push a state to the display layer unless it is identical to the current one or the
    /// session has been torn down. The check runs under the channel lock.
    fn publish(&mut self, next: OverlayState) -> bool {
        self.published = next.clone();

        let cancel = &self.cancel;
        self.state.send_if_modified(move |current| {
            if cancel.is_cancelled() || *current == next {
                return false;
            }
            *current = next;
            true
        })
    }
}

/// Owner side of a running session. Dropping it tears the session down.
#[derive(Debug)]
pub struct SessionHandle {
    cancel: CancelToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Stop the session. No state is published after this returns.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(mut self) {
        self.shutdown();
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "🔄 Session task ended abnormally");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
