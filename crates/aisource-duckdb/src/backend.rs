use std::sync::Arc;

use anyhow::Result;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use aisource_core::event::Event;

use crate::schema::init_sql;

/// A DuckDB backend for the event store and site registry.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent writes
/// cause contention. We wrap the connection in `Arc<Mutex<_>>` so the async
/// runtime serialises access while the struct stays cheap to clone and share
/// across Axum handlers. Every operation is one independent statement — no
/// cross-request buffering or caching.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`,
    /// read from `Config.duckdb_memory_limit` at the call site. Runs the
    /// schema init SQL so all tables and indexes exist.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests only — data is discarded when the struct is
    /// dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert exactly one normalized event row.
    ///
    /// The `Event` must already be normalized by the ingestion layer
    /// (`Event::from_track`); this method does not validate `site_id`
    /// against the registry.
    pub async fn insert_event(&self, event: &Event) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO events (
                id, site_id, session_id, distinct_id,
                event_name, timestamp, properties,
                url, title, referrer, ai_source, ai_domain,
                device_type, browser, os, language, timezone,
                screen_width, screen_height, viewport_width, viewport_height,
                time_on_page, time_to_engage, engaged,
                ip_address, created_at
            ) VALUES (
                ?1,  ?2,  ?3,  ?4,
                ?5,  ?6,  ?7,
                ?8,  ?9,  ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21,
                ?22, ?23, ?24,
                ?25, ?26
            )"#,
            duckdb::params![
                event.id,
                event.site_id,
                event.session_id,
                event.distinct_id,
                event.event_name,
                event.timestamp.to_rfc3339(),
                event.properties,
                event.url,
                event.title,
                event.referrer,
                event.ai_source,
                event.ai_domain,
                event.device_type,
                event.browser,
                event.os,
                event.language,
                event.timezone,
                event.screen_width,
                event.screen_height,
                event.viewport_width,
                event.viewport_height,
                event.time_on_page,
                event.time_to_engage,
                event.engaged,
                event.ip_address,
                event.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    ///
    /// Called by the `/health` endpoint. Returns an error if the connection
    /// is unavailable (file locked, disk full, etc.).
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the DuckDB connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify stored data.
    /// Production code should use the typed methods.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
