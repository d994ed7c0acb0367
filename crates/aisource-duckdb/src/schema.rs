/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup (idempotent).
///
/// `memory_limit` is passed at runtime from `Config.duckdb_memory_limit`
/// (env `AISOURCE_DUCKDB_MEMORY`, default `"1GB"`). Always set an explicit
/// limit — the DuckDB default (80% of system RAM) is not acceptable for a
/// server process. `SET threads = 2` keeps the background pool small for
/// single-writer embedded use.
///
/// NOTE: `events.site_id` carries no FOREIGN KEY — referential integrity is
/// not enforced at write time (events for unregistered tokens are stored
/// and simply never surface in any owner's aggregates).
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SITES
-- ===========================================
CREATE TABLE IF NOT EXISTS sites (
    id              VARCHAR PRIMARY KEY,           -- 'site_' + base36 fragment + '_' + base36 millis
    domain          VARCHAR NOT NULL,              -- scheme and trailing slash stripped
    name            VARCHAR NOT NULL,
    owner_id        VARCHAR NOT NULL,              -- opaque id from the identity provider
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_sites_owner ON sites(owner_id, created_at DESC);

-- ===========================================
-- EVENTS (append-only)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    -- Identity
    id              VARCHAR NOT NULL,              -- UUID v4
    site_id         VARCHAR NOT NULL,
    session_id      VARCHAR NOT NULL,              -- client-generated, session-scoped
    distinct_id     VARCHAR NOT NULL,              -- client-generated, profile-scoped

    -- Event data
    event_name      VARCHAR NOT NULL,              -- 'Page Viewed' | 'Page Engaged' | ...
    timestamp       TIMESTAMP NOT NULL,            -- client-supplied event time
    properties      VARCHAR,                       -- full property bag as a JSON string

    -- Lifted well-known properties
    url             VARCHAR,
    title           VARCHAR,
    referrer        VARCHAR,                       -- NULL for direct visits
    ai_source       VARCHAR,                       -- non-NULL iff referrer matched the AI table
    ai_domain       VARCHAR,
    device_type     VARCHAR,
    browser         VARCHAR,
    os              VARCHAR,
    language        VARCHAR,
    timezone        VARCHAR,
    screen_width    INTEGER,
    screen_height   INTEGER,
    viewport_width  INTEGER,
    viewport_height INTEGER,
    time_on_page    BIGINT,                        -- ms
    time_to_engage  BIGINT,                        -- ms
    engaged         BOOLEAN,

    -- Enrichment
    ip_address      VARCHAR,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
-- Optimised for window aggregation and the realtime feed.
CREATE INDEX IF NOT EXISTS idx_events_site_time ON events(site_id, timestamp DESC);
-- Optimised for AI-only breakdowns.
CREATE INDEX IF NOT EXISTS idx_events_site_ai ON events(site_id, ai_source);
"#
    )
}
