use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};

use aisource_core::analytics::WindowEvent;
use aisource_core::store::RecentEvent;

use crate::DuckDbBackend;

/// DuckDB TIMESTAMP comparison format (naive UTC with optional fraction).
fn ts_param(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

impl DuckDbBackend {
    /// All of a site's events with `start <= timestamp < end`, projected to
    /// the fields the aggregator consumes. Ordered by timestamp ascending;
    /// first-seen grouping downstream therefore follows event-time order.
    pub async fn events_between(
        &self,
        site_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WindowEvent>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT url, ai_source, epoch_ms(timestamp) \
             FROM events \
             WHERE site_id = ?1 AND timestamp >= ?2 AND timestamp < ?3 \
             ORDER BY timestamp",
        )?;

        let rows = stmt.query_map(
            duckdb::params![site_id, ts_param(start), ts_param(end)],
            |row| {
                let url: Option<String> = row.get(0)?;
                let ai_source: Option<String> = row.get(1)?;
                let ts_ms: i64 = row.get(2)?;
                Ok((url, ai_source, ts_ms))
            },
        )?;

        let mut events = Vec::new();
        for row in rows {
            let (url, ai_source, ts_ms) = row?;
            let timestamp = Utc
                .timestamp_millis_opt(ts_ms)
                .single()
                .ok_or_else(|| anyhow::anyhow!("stored timestamp out of range: {ts_ms}"))?;
            events.push(WindowEvent {
                url,
                ai_source,
                timestamp,
            });
        }
        Ok(events)
    }

    /// The newest `limit` events since `since`, newest first — the realtime
    /// feed projection.
    pub async fn recent_events(
        &self,
        site_id: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<RecentEvent>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT event_name, ai_source, CAST(timestamp AS VARCHAR), url, title \
             FROM events \
             WHERE site_id = ?1 AND timestamp >= ?2 \
             ORDER BY timestamp DESC \
             LIMIT {}",
            limit.clamp(1, 1000)
        ))?;

        let rows = stmt.query_map(
            duckdb::params![site_id, ts_param(since)],
            |row| {
                Ok(RecentEvent {
                    event_name: row.get(0)?,
                    ai_source: row.get(1)?,
                    timestamp: row.get(2)?,
                    url: row.get(3)?,
                    title: row.get(4)?,
                })
            },
        )?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}
