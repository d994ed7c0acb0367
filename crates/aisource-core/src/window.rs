//! Lookback-window resolution for aggregation queries.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// A trailing time range over which aggregation is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    pub days: i64,
}

impl LookbackWindow {
    /// Resolve a symbolic range: "24h" → 1 day, "7d" → 7, "30d" → 30,
    /// anything else → 90.
    pub fn from_symbol(range: &str) -> Self {
        let days = match range {
            "24h" => 1,
            "7d" => 7,
            "30d" => 30,
            _ => 90,
        };
        Self { days }
    }

    /// A window of `days` days; zero or negative counts are clamped to 1.
    pub fn from_days(days: i64) -> Self {
        Self {
            days: days.max(1),
        }
    }

    /// Window start: `now` minus the day count.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days)
    }

    /// Start of the equal-length window immediately preceding this one.
    /// The previous period is `[previous_start, start)`.
    pub fn previous_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.start(now) - Duration::days(self.days)
    }

    /// The last `days` UTC calendar dates ending today, chronological.
    ///
    /// This is the zero-fill grid for the daily time series: exactly `days`
    /// entries regardless of event presence.
    pub fn dates(&self, now: DateTime<Utc>) -> Vec<NaiveDate> {
        let today = now.date_naive();
        (0..self.days)
            .rev()
            .map(|offset| today - Duration::days(offset))
            .collect()
    }
}
