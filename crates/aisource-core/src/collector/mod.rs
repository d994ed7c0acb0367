//! The page collector: per-visit identity, referrer classification, and
//! lifecycle event emission.
//!
//! The host environment (DOM storage, network, timers, visibility) is
//! abstracted behind [`CollectorStorage`] and [`EventTransport`] so the
//! component holds no global state and is re-initializable. The host wires
//! its activity events to [`Collector::notify_activity`], a 30-second timer
//! to [`Collector::heartbeat_tick`], and page unload to
//! [`Collector::page_left`].

pub mod device;

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::event::{TrackPayload, DIRECT_SENTINEL};
use crate::sources::{classify_referrer, referring_domain};
use crate::token::generate_token;

/// Ingestion endpoint used when the embed tag carries no override.
pub const DEFAULT_ENDPOINT: &str = "https://app.aisource.dev/api/track";

/// Heartbeat cadence while the page is visible and engaged.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Client-side storage keys, namespaced under the `aisource_` prefix:
/// one session-scoped, one profile-scoped.
pub const SESSION_ID_KEY: &str = "aisource_session_id";
pub const DISTINCT_ID_KEY: &str = "aisource_distinct_id";

/// Which of the host's two key-value stores a value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Short-lived, one browsing session.
    Session,
    /// Long-lived, one browser profile.
    Profile,
}

/// Host key-value storage. Implementations swallow their own failures
/// (privacy mode, quota): reads surface as `None`, writes as no-ops.
pub trait CollectorStorage {
    fn get(&self, scope: StorageScope, key: &str) -> Option<String>;
    fn set(&self, scope: StorageScope, key: &str, value: &str);
    fn remove(&self, scope: StorageScope, key: &str);
}

/// How a payload must reach the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Non-blocking send; failure is logged and never retried.
    FireAndForget,
    /// Must be queued by the host before page teardown (unload-time send).
    Beacon,
}

/// Host network boundary. Sends are fire-and-forget: never awaited, never
/// retried, failures swallowed with at most a debug log.
pub trait EventTransport {
    fn send(&self, payload: &TrackPayload, delivery: Delivery);
}

/// Attributes read off the embed script tag.
#[derive(Debug, Clone, Default)]
pub struct EmbedOptions {
    /// `data-site` — required; init refuses to proceed without it.
    pub site_id: Option<String>,
    /// `data-endpoint` — optional override of [`DEFAULT_ENDPOINT`].
    pub endpoint: Option<String>,
}

/// Snapshot of the page environment at load time.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub url: String,
    pub title: String,
    pub referrer: Option<String>,
    pub user_agent: String,
    pub language: String,
    pub timezone: String,
    pub screen: (i64, i64),
    pub viewport: (i64, i64),
}

pub struct Collector<S, T> {
    site_id: String,
    endpoint: String,
    page: PageContext,
    storage: S,
    transport: T,
    distinct_id: String,
    session_id: String,
    super_properties: Map<String, Value>,
    started: Instant,
    engaged: bool,
}

impl<S: CollectorStorage, T: EventTransport> Collector<S, T> {
    /// Initialize the collector and emit `Page Viewed`.
    ///
    /// Returns `None` (after a warning log) when the embed options carry no
    /// site id — the collector then does nothing for the rest of the page
    /// load. This is the only init failure; everything else degrades
    /// silently.
    pub fn init(opts: EmbedOptions, page: PageContext, storage: S, transport: T) -> Option<Self> {
        let Some(site_id) = opts.site_id.filter(|s| !s.is_empty()) else {
            warn!("data-site attribute required");
            return None;
        };
        let endpoint = opts
            .endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let session_id = resolve_identity(&storage, SESSION_ID_KEY, StorageScope::Session);
        let distinct_id = resolve_identity(&storage, DISTINCT_ID_KEY, StorageScope::Profile);

        let mut collector = Self {
            site_id,
            endpoint,
            page,
            storage,
            transport,
            distinct_id,
            session_id,
            super_properties: Map::new(),
            started: Instant::now(),
            engaged: false,
        };
        collector.seed_referrer_properties();

        collector.send_event(
            "Page Viewed",
            title_property(&collector.page),
            Delivery::FireAndForget,
        );
        Some(collector)
    }

    /// The resolved ingestion endpoint (for the host's network layer).
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn distinct_id(&self) -> &str {
        &self.distinct_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Manual event emission (`aisource.track`).
    pub fn track(&self, event_name: &str, properties: Map<String, Value>) {
        self.send_event(event_name, properties, Delivery::FireAndForget);
    }

    /// First host activity signal (scroll, click, key press, pointer move,
    /// touch start). Emits `Page Engaged` exactly once per page load.
    pub fn notify_activity(&mut self) {
        if self.engaged {
            return;
        }
        self.engaged = true;
        let mut props = title_property(&self.page);
        props.insert(
            "time_to_engage".to_string(),
            Value::from(self.elapsed_ms()),
        );
        self.send_event("Page Engaged", props, Delivery::FireAndForget);
    }

    /// Heartbeat timer tick. Emits only while the page is visible and
    /// engagement has already occurred.
    pub fn heartbeat_tick(&self, visible: bool) {
        if !self.engaged || !visible {
            return;
        }
        let mut props = title_property(&self.page);
        props.insert("time_on_page".to_string(), Value::from(self.elapsed_ms()));
        self.send_event("Page Heartbeat", props, Delivery::FireAndForget);
    }

    /// Page unload. The payload is handed to the transport with
    /// [`Delivery::Beacon`] so it is queued before teardown, not awaited.
    pub fn page_left(&self) {
        let mut props = title_property(&self.page);
        props.insert("time_on_page".to_string(), Value::from(self.elapsed_ms()));
        props.insert("engaged".to_string(), Value::from(self.engaged));
        self.send_event("Page Left", props, Delivery::Beacon);
    }

    /// Identity override (`aisource.identify`). Persists the new distinct
    /// id and, when `properties` is non-empty, emits `$identify` carrying
    /// them under `$set`.
    pub fn identify(&mut self, distinct_id: Option<&str>, properties: Map<String, Value>) {
        if let Some(id) = distinct_id.filter(|s| !s.is_empty()) {
            self.distinct_id = id.to_string();
            self.storage
                .set(StorageScope::Profile, DISTINCT_ID_KEY, id);
        }
        if !properties.is_empty() {
            let mut props = Map::new();
            props.insert("$set".to_string(), Value::Object(properties));
            self.send_event("$identify", props, Delivery::FireAndForget);
        }
    }

    /// Register persistent super-properties, merged into every subsequent
    /// event.
    pub fn register(&mut self, properties: Map<String, Value>) {
        for (key, value) in properties {
            self.super_properties.insert(key, value);
        }
    }

    /// Discard stored identity and super-properties and mint fresh tokens.
    pub fn reset(&mut self) {
        self.storage.remove(StorageScope::Profile, DISTINCT_ID_KEY);
        self.storage.remove(StorageScope::Session, SESSION_ID_KEY);
        self.distinct_id = generate_token();
        self.session_id = generate_token();
        self.super_properties = Map::new();
        self.storage
            .set(StorageScope::Profile, DISTINCT_ID_KEY, &self.distinct_id);
        self.storage
            .set(StorageScope::Session, SESSION_ID_KEY, &self.session_id);
    }

    fn elapsed_ms(&self) -> i64 {
        self.started.elapsed().as_millis() as i64
    }

    /// Classify the referrer once at init and seed the super-properties
    /// every event carries.
    fn seed_referrer_properties(&mut self) {
        let referrer = self.page.referrer.clone().unwrap_or_default();
        let ai = classify_referrer(&referrer);

        let mut props = Map::new();
        match &ai {
            Some(hit) => {
                props.insert("$ai_source".to_string(), Value::from(hit.source.clone()));
                props.insert("$ai_domain".to_string(), Value::from(hit.domain.clone()));
                props.insert("$ai_referrer".to_string(), Value::from(hit.url.clone()));
            }
            None => {
                props.insert("$ai_source".to_string(), Value::Null);
                props.insert("$ai_domain".to_string(), Value::Null);
                props.insert("$ai_referrer".to_string(), Value::Null);
            }
        }
        if referrer.is_empty() {
            props.insert("$referrer".to_string(), Value::from(DIRECT_SENTINEL));
            props.insert(
                "$referring_domain".to_string(),
                Value::from(DIRECT_SENTINEL),
            );
        } else {
            props.insert("$referrer".to_string(), Value::from(referrer.clone()));
            props.insert(
                "$referring_domain".to_string(),
                referring_domain(&referrer)
                    .map(Value::from)
                    .unwrap_or(Value::from(DIRECT_SENTINEL)),
            );
        }
        self.super_properties = props;
    }

    /// Assemble and hand off one payload. Merge order: super-properties,
    /// then page defaults, then call-site properties, then the reserved
    /// keys — later entries win.
    fn send_event(&self, event_name: &str, properties: Map<String, Value>, delivery: Delivery) {
        let mut merged = self.super_properties.clone();
        for (key, value) in default_properties(&self.page) {
            merged.insert(key, value);
        }
        for (key, value) in properties {
            merged.insert(key, value);
        }
        merged.insert(
            "time".to_string(),
            Value::from(chrono::Utc::now().timestamp_millis()),
        );
        merged.insert("$insert_id".to_string(), Value::from(generate_token()));
        merged.insert("token".to_string(), Value::from(self.site_id.clone()));

        let payload = TrackPayload {
            event: event_name.to_string(),
            properties: merged,
            distinct_id: self.distinct_id.clone(),
            session_id: self.session_id.clone(),
        };
        debug!(event = event_name, "emitting collector event");
        self.transport.send(&payload, delivery);
    }
}

/// Read an identity token from its scope, generating and persisting a
/// fresh one when absent.
fn resolve_identity<S: CollectorStorage>(storage: &S, key: &str, scope: StorageScope) -> String {
    storage.get(scope, key).unwrap_or_else(|| {
        let token = generate_token();
        storage.set(scope, key, &token);
        token
    })
}

fn title_property(page: &PageContext) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("$title".to_string(), Value::from(page.title.clone()));
    props
}

/// Device/context fields attached to every event.
fn default_properties(page: &PageContext) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(
        "$device_type".to_string(),
        Value::from(device::classify_device(&page.user_agent)),
    );
    props.insert(
        "$browser".to_string(),
        Value::from(device::classify_browser(&page.user_agent)),
    );
    props.insert(
        "$os".to_string(),
        Value::from(device::classify_os(&page.user_agent)),
    );
    props.insert("$screen_width".to_string(), Value::from(page.screen.0));
    props.insert("$screen_height".to_string(), Value::from(page.screen.1));
    props.insert("$viewport_width".to_string(), Value::from(page.viewport.0));
    props.insert(
        "$viewport_height".to_string(),
        Value::from(page.viewport.1),
    );
    props.insert("$language".to_string(), Value::from(page.language.clone()));
    props.insert("$timezone".to_string(), Value::from(page.timezone.clone()));
    props.insert(
        "$user_agent".to_string(),
        Value::from(page.user_agent.clone()),
    );
    props.insert("$current_url".to_string(), Value::from(page.url.clone()));
    if let Ok(parsed) = url::Url::parse(&page.url) {
        props.insert(
            "$host".to_string(),
            Value::from(parsed.host_str().unwrap_or_default()),
        );
        props.insert("$pathname".to_string(), Value::from(parsed.path()));
        props.insert(
            "$search".to_string(),
            Value::from(parsed.query().map(|q| format!("?{q}")).unwrap_or_default()),
        );
    }
    props
}
