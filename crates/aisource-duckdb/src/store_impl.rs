//! Trait impls wiring [`DuckDbBackend`] into the core storage abstraction.

use chrono::{DateTime, Utc};

use aisource_core::analytics::WindowEvent;
use aisource_core::event::Event;
use aisource_core::site::{CreateSiteParams, Site};
use aisource_core::store::{EventStore, RecentEvent, SiteStore};

use crate::DuckDbBackend;

#[async_trait::async_trait]
impl EventStore for DuckDbBackend {
    async fn insert_event(&self, event: &Event) -> anyhow::Result<()> {
        DuckDbBackend::insert_event(self, event).await
    }

    async fn events_between(
        &self,
        site_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<WindowEvent>> {
        DuckDbBackend::events_between(self, site_id, start, end).await
    }

    async fn recent_events(
        &self,
        site_id: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> anyhow::Result<Vec<RecentEvent>> {
        DuckDbBackend::recent_events(self, site_id, since, limit).await
    }
}

#[async_trait::async_trait]
impl SiteStore for DuckDbBackend {
    async fn create_site(&self, params: CreateSiteParams) -> anyhow::Result<Site> {
        DuckDbBackend::create_site(self, params).await
    }

    async fn list_sites(&self, owner_id: &str) -> anyhow::Result<Vec<Site>> {
        DuckDbBackend::list_sites(self, owner_id).await
    }

    async fn get_site(&self, id: &str) -> anyhow::Result<Option<Site>> {
        DuckDbBackend::get_site(self, id).await
    }
}
