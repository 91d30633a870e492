//! Owns the published state and the running session, restarting it on configuration changes.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;
use tracing::{error, info};

use super::PollError;
use super::clock::Clock;
use super::interval::PollBudget;
use super::session::{Session, SessionContext, SessionHandle};
use super::state::OverlayState;
use crate::cache::SnapshotStore;
use crate::config::{OverlaySettings, SessionConfig};
use crate::error::AppError;
use crate::henrik::StatsApi;

/// Builds the API client of a session, typically from its key.
pub type ApiFactory<A> = Box<dyn Fn(&SessionConfig) -> Result<Arc<A>, AppError> + Send + Sync>;

pub struct Tracker<A: ?Sized> {
    factory: ApiFactory<A>,
    store: Option<Arc<dyn SnapshotStore>>,
    clock: Arc<dyn Clock>,
    budget: PollBudget,
    state: Arc<watch::Sender<OverlayState>>,
    current: Option<(SessionConfig, SessionHandle)>,
}

impl<A> Tracker<A>
where
    A: StatsApi + ?Sized + 'static,
{
    pub fn new(
        factory: ApiFactory<A>,
        store: Option<Arc<dyn SnapshotStore>>,
        clock: Arc<dyn Clock>,
        budget: PollBudget,
    ) -> Self {
        let (state, _) = watch::channel(OverlayState::loading());

        Self {
            factory,
            store,
            clock,
            budget,
            state: Arc::new(state),
            current: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<OverlayState> {
        self.state.subscribe()
    }

    /// Base poll interval of the running session, if any.
    pub fn base_interval(&self) -> Option<Duration> {
        self.current
            .as_ref()
            .map(|(config, _)| config.base_interval(&self.budget))
    }

    /// Apply new settings. An unchanged configuration keeps the running session; anything else
    /// tears it down and starts from scratch. Returns whether a new session was started.
    pub fn reconfigure(&mut self, settings: &OverlaySettings) -> bool {
        let config = match settings.session_config() {
            Ok(config) => config,
            Err(e) => {
                self.stop();
                self.misconfigured(e);
                return false;
            }
        };

        if let Some((running, handle)) = &self.current {
            if *running == config && !handle.is_finished() {
                return false;
            }
        }

        self.stop();
        self.state.send_replace(OverlayState::loading());

        let api = match (self.factory)(&config) {
            Ok(api) => api,
            Err(e) => {
                self.misconfigured(e);
                return false;
            }
        };

        let ctx = SessionContext {
            api,
            store: self.store.clone(),
            clock: self.clock.clone(),
            budget: self.budget.clone(),
            state: self.state.clone(),
        };
        let handle = Session::new(&config, ctx, StdRng::from_entropy()).spawn();
        self.current = Some((config, handle));

        true
    }

    /// Stop the running session and wait for its task to end.
    pub async fn shutdown(&mut self) {
        if let Some((_, handle)) = self.current.take() {
            handle.join().await;
        }
    }

    fn stop(&mut self) {
        if let Some((config, handle)) = self.current.take() {
            info!(account = %config.identity.account, "🔄 Tearing down session");
            handle.shutdown();
        }
    }

    fn misconfigured(&self, e: AppError) {
        let e = PollError::from(e);
        error!(error = %e, "🔄 ❌ Overlay is misconfigured");
        self.state.send_replace(OverlayState::misconfigured(&e));
    }
}
