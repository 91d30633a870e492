use std::sync::Arc;

use cache::{MemoryStore, SnapshotStore, SqliteStore};
use config::{Config, SessionConfig};
use error::AppError;
use henrik::HenrikClient;
use poller::clock::SystemClock;
use poller::interval::describe_cadence;
use poller::tracker::ApiFactory;
use poller::{ErrorKind, OverlayState, Tracker};
use tokio::sync::watch;
use tracing::{error, info, warn};

mod cache;
mod config;
mod error;
mod henrik;
mod logging;
mod models;
mod poller;

#[tokio::main]
async fn main() {
    logging::init();
    info!("🐙 Starting...");

    let config = Config::from_env();
    let budget = config.budget();

    let store: Arc<dyn SnapshotStore> = match cache::connect(&config.database_url).await {
        Ok(pool) => Arc::new(SqliteStore::new(pool)),
        Err(e) => {
            warn!(error = %e, "💾 ⚠️ Snapshot store unavailable, keeping snapshots in memory");
            Arc::new(MemoryStore::default())
        }
    };

    let factory: ApiFactory<HenrikClient> = Box::new({
        let base_url = config.base_url.clone();
        let budget_rpm = config.budget_rpm;
        move |session: &SessionConfig| -> Result<Arc<HenrikClient>, AppError> {
            let client = HenrikClient::new(&session.identity.api_key, &base_url, budget_rpm)?;
            client.start_metrics_logging();
            Ok(Arc::new(client))
        }
    });

    let mut tracker = Tracker::new(factory, Some(store), Arc::new(SystemClock), budget);
    let rx = tracker.subscribe();

    if tracker.reconfigure(&config.overlay) {
        if let Some(interval) = tracker.base_interval() {
            info!(
                accounts = config.overlay.accounts,
                "⏱️ Polling {}",
                describe_cadence(interval.as_millis() as u64)
            );
        }
    }

    tokio::select! {
        _ = report_states(rx) => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!(error = %e, "❌ Failed to listen for Ctrl-C");
            }
            info!("🐙 Shutting down...");
        }
    }

    tracker.shutdown().await;
}

/// Logs every published state until the overlay is found to be misconfigured.
async fn report_states(mut rx: watch::Receiver<OverlayState>) {
    loop {
        let state = rx.borrow_and_update().clone();
        log_state(&state);

        if state
            .error
            .as_ref()
            .is_some_and(|e| e.kind == ErrorKind::Configuration)
        {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

fn log_state(state: &OverlayState) {
    if state.is_loading {
        info!("📺 Loading...");
        return;
    }

    if let Some(error) = state.error.as_ref().filter(|_| state.shows_error()) {
        error!(kind = ?error.kind, "📺 {}", error.message);
        return;
    }

    let Some(snapshot) = &state.snapshot else {
        return;
    };

    let mut flags = Vec::new();
    if state.is_stale {
        flags.push("stale");
    }
    if state.is_rank_stale {
        flags.push("rank stale");
    }

    info!(
        wins = snapshot.wins,
        losses = snapshot.losses,
        kills = snapshot.kills,
        deaths = snapshot.deaths,
        rr = ?snapshot.current_points,
        rr_change = ?snapshot.recent_points_change,
        flags = %flags.join(", "),
        "📺 {}W {}L",
        snapshot.wins,
        snapshot.losses
    );
}
