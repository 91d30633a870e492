use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{Instrument, info_span};

/// Counts the requests sent to the HenrikDev API, split by outcome.
#[derive(Debug)]
pub struct RequestMetrics {
    start: Instant,
    count: AtomicU64,
    rate_limited: AtomicU64,
}

impl RequestMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            count: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
        })
    }

    pub fn inc(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn total_rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    /// Logs the totals once per minute until every other handle on the metrics is dropped.
    pub async fn log_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.tick().await;

        loop {
            interval.tick().await;
            if Arc::strong_count(&self) == 1 {
                break;
            }

            let span = info_span!("📊 ");
            async {
                let total = self.total();
                let elapsed_min = self.start.elapsed().as_secs_f64() / 60.0;
                let avg = if elapsed_min > 0.0 {
                    total as f64 / elapsed_min
                } else {
                    0.0
                };
                tracing::info!(
                    rate_limited = self.total_rate_limited(),
                    "{} requests executed (avg {:.2} req/min)",
                    total,
                    avg
                );
            }
            .instrument(span)
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increase() {
        let metrics = RequestMetrics::new();
        metrics.inc();
        metrics.inc();
        metrics.inc_rate_limited();

        assert_eq!(metrics.total(), 2);
        assert_eq!(metrics.total_rate_limited(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn log_loop_stops_once_metrics_are_dropped() {
        let metrics = RequestMetrics::new();
        let handle = tokio::spawn(metrics.clone().log_loop());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(!handle.is_finished());

        drop(metrics);
        tokio::time::sleep(Duration::from_secs(61)).await;
        handle.await.unwrap();
    }
}
