//! Storage backend abstraction.
//!
//! The core issues declarative filter/sort queries and receives back
//! ordered rows; indexing, transactions, and storage layout belong to the
//! backend.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::WindowEvent;
use crate::event::Event;
use crate::site::{CreateSiteParams, Site};

/// One row of the realtime feed.
#[derive(Debug, Clone, Serialize)]
pub struct RecentEvent {
    pub event_name: String,
    pub ai_source: Option<String>,
    pub timestamp: String,
    pub url: Option<String>,
    pub title: Option<String>,
}

#[async_trait::async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Persist exactly one event row.
    async fn insert_event(&self, event: &Event) -> anyhow::Result<()>;

    /// All of a site's events with `start <= timestamp < end`, for
    /// aggregation.
    async fn events_between(
        &self,
        site_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<WindowEvent>>;

    /// The newest `limit` events since `since`, newest first.
    async fn recent_events(
        &self,
        site_id: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> anyhow::Result<Vec<RecentEvent>>;
}

#[async_trait::async_trait]
pub trait SiteStore: Send + Sync + 'static {
    async fn create_site(&self, params: CreateSiteParams) -> anyhow::Result<Site>;

    /// All sites owned by `owner_id`, newest first.
    async fn list_sites(&self, owner_id: &str) -> anyhow::Result<Vec<Site>>;

    async fn get_site(&self, id: &str) -> anyhow::Result<Option<Site>>;
}
