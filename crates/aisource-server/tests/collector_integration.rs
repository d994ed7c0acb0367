//! Drives the embedded collector component against the live router: the
//! payloads the collector emits are POSTed to /api/track verbatim, then the
//! aggregate is read back.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use aisource_core::collector::{
    Collector, CollectorStorage, Delivery, EmbedOptions, EventTransport, PageContext, StorageScope,
};
use aisource_core::config::Config;
use aisource_core::event::TrackPayload;
use aisource_duckdb::DuckDbBackend;
use aisource_server::app::build_app;
use aisource_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/aisource-test".to_string(),
        public_url: "http://localhost:3000".to_string(),
        duckdb_memory_limit: "1GB".to_string(),
    }
}

fn setup() -> axum::Router {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config()));
    build_app(state)
}

#[derive(Default)]
struct MemoryStorage {
    values: RefCell<HashMap<(StorageScope, String), String>>,
}

impl CollectorStorage for MemoryStorage {
    fn get(&self, scope: StorageScope, key: &str) -> Option<String> {
        self.values
            .borrow()
            .get(&(scope, key.to_string()))
            .cloned()
    }

    fn set(&self, scope: StorageScope, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert((scope, key.to_string()), value.to_string());
    }

    fn remove(&self, scope: StorageScope, key: &str) {
        self.values.borrow_mut().remove(&(scope, key.to_string()));
    }
}

#[derive(Clone, Default)]
struct CapturingTransport {
    sent: Rc<RefCell<Vec<(TrackPayload, Delivery)>>>,
}

impl EventTransport for CapturingTransport {
    fn send(&self, payload: &TrackPayload, delivery: Delivery) {
        self.sent.borrow_mut().push((payload.clone(), delivery));
    }
}

fn visit_page(referrer: Option<&str>) -> PageContext {
    PageContext {
        url: "https://x.com/blog/post".to_string(),
        title: "Post".to_string(),
        referrer: referrer.map(str::to_string),
        user_agent: "Mozilla/5.0 (Windows NT 10.0) Chrome/120.0 Safari/537.36".to_string(),
        language: "en-US".to_string(),
        timezone: "UTC".to_string(),
        screen: (1920, 1080),
        viewport: (1200, 800),
    }
}

async fn post_payload(app: &axum::Router, payload: &TrackPayload) {
    let body = serde_json::to_string(payload).expect("serialize payload");
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/track")
                .header("content-type", "application/json")
                .header("x-forwarded-for", "1.2.3.4")
                .body(Body::from(body))
                .expect("build request"),
        )
        .await
        .expect("track request");
    assert_eq!(response.status(), StatusCode::OK);
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

async fn create_site(app: &axum::Router, user: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sites")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {user}"))
                .body(Body::from(
                    json!({ "domain": "x.com", "name": "X" }).to_string(),
                ))
                .expect("build request"),
        )
        .await
        .expect("create site");
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["site"]["id"]
        .as_str()
        .expect("site id")
        .to_string()
}

#[tokio::test]
async fn test_collector_visit_flows_into_aggregate() {
    let app = setup();
    let site_id = create_site(&app, "user_1").await;

    // One AI-referred page visit: view, engage, leave.
    let transport = CapturingTransport::default();
    let mut collector = Collector::init(
        EmbedOptions {
            site_id: Some(site_id.clone()),
            endpoint: None,
        },
        visit_page(Some("https://chat.openai.com/c/123")),
        MemoryStorage::default(),
        transport.clone(),
    )
    .expect("collector init");
    collector.notify_activity();
    collector.page_left();

    let payloads: Vec<(TrackPayload, Delivery)> = transport.sent.borrow().clone();
    assert_eq!(payloads.len(), 3);
    for (payload, _) in &payloads {
        post_payload(&app, payload).await;
    }

    // The unload-time payload was marked for beacon delivery.
    assert_eq!(payloads[2].0.event, "Page Left");
    assert_eq!(payloads[2].1, Delivery::Beacon);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/analytics?siteId={site_id}"))
                .header("authorization", "Bearer user_1")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("analytics request");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    // All three lifecycle events count as in-window events; all carry the
    // AI super-properties seeded at init.
    assert_eq!(body["totalViews"], 3);
    assert_eq!(body["aiViews"], 3);
    assert_eq!(body["topAiSources"][0]["name"], "ChatGPT");
    assert_eq!(body["topPages"][0]["path"], "/blog/post");

    // The realtime feed sees the same visit, newest first.
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/realtime?siteId={site_id}"))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("realtime request");
    let feed = json_body(response).await;
    let events = feed["events"].as_array().expect("events");
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["ai_source"], "ChatGPT");
}

#[tokio::test]
async fn test_organic_visit_has_no_ai_attribution() {
    let app = setup();
    let site_id = create_site(&app, "user_1").await;

    let transport = CapturingTransport::default();
    let _collector = Collector::init(
        EmbedOptions {
            site_id: Some(site_id.clone()),
            endpoint: None,
        },
        visit_page(Some("https://www.example.com/links")),
        MemoryStorage::default(),
        transport.clone(),
    )
    .expect("collector init");

    let payloads: Vec<(TrackPayload, Delivery)> = transport.sent.borrow().clone();
    for (payload, _) in &payloads {
        post_payload(&app, payload).await;
    }

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/analytics?siteId={site_id}"))
                .header("authorization", "Bearer user_1")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("analytics request");
    let body = json_body(response).await;

    assert_eq!(body["totalViews"], 1);
    assert_eq!(body["aiViews"], 0);
    assert_eq!(body["topAiSources"].as_array().expect("sources").len(), 0);
}
