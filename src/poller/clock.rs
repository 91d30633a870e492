//! Local-time abstraction used to find "today" and to timestamp cache entries.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

/// The local calendar day and the epoch instant of its midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub key: NaiveDate,
    pub start_ms: i64,
}

impl DayWindow {
    pub fn containing<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let key = now.date_naive();
        let midnight = key.and_time(NaiveTime::MIN);

        let start_ms = now
            .timezone()
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.timestamp_millis())
            // Midnight skipped by a DST jump: fall back to the current offset.
            .unwrap_or_else(|| {
                let offset = now.offset().fix().local_minus_utc();
                midnight.and_utc().timestamp_millis() - i64::from(offset) * 1000
            });

        Self { key, start_ms }
    }

    /// Whether an instant expressed in epoch seconds happened on or after this day's midnight.
    pub fn includes_epoch_secs(&self, secs: i64) -> bool {
        secs.saturating_mul(1000) >= self.start_ms
    }
}

pub trait Clock: Send + Sync {
    fn today(&self) -> DayWindow;

    fn now_ms(&self) -> i64;
}

/// Wall clock of the host, in its local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> DayWindow {
        DayWindow::containing(&Local::now())
    }

    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
