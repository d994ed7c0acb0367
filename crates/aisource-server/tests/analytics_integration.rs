use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use aisource_core::config::Config;
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

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

/// Helper: register a site for `user` and return its generated id.
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

/// Helper: ingest one event through POST /api/track.
async fn ingest(app: &axum::Router, site_id: &str, url: &str, ai_source: Option<&str>, time_ms: i64) {
    let mut properties = json!({
        "token": site_id,
        "$current_url": url,
        "time": time_ms
    });
    if let Some(source) = ai_source {
        properties["$ai_source"] = json!(source);
    }
    let payload = json!({
        "event": "Page Viewed",
        "properties": properties,
        "distinct_id": "d1",
        "session_id": "s1"
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/track")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("build request"),
        )
        .await
        .expect("ingest");
    assert_eq!(response.status(), StatusCode::OK);
}

fn analytics_request(user: &str, query: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(format!("/api/analytics{query}"))
        .header("authorization", format!("Bearer {user}"))
        .body(Body::empty())
        .expect("build request")
}

// ============================================================
// End-to-end: ingest one AI-referred view, aggregate it back
// ============================================================
#[tokio::test]
async fn test_ingest_then_aggregate_roundtrip() {
    let app = setup();
    let site_id = create_site(&app, "user_1").await;

    let t = (Utc::now() - Duration::hours(1)).timestamp_millis();
    ingest(&app, &site_id, "https://x.com/blog/post", Some("Claude"), t).await;

    let response = app
        .oneshot(analytics_request("user_1", &format!("?siteId={site_id}")))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["totalViews"], 1);
    assert_eq!(body["aiViews"], 1);
    assert_eq!(body["topAiSources"][0]["name"], "Claude");
    assert_eq!(body["topAiSources"][0]["views"], 1);
    assert_eq!(body["topPages"][0]["path"], "/blog/post");
    assert_eq!(body["topPages"][0]["views"], 1);
    assert_eq!(body["topPages"][0]["aiViews"], 1);
}

#[tokio::test]
async fn test_ai_views_are_a_subset_of_total_views() {
    let app = setup();
    let site_id = create_site(&app, "user_1").await;

    let t = (Utc::now() - Duration::hours(2)).timestamp_millis();
    ingest(&app, &site_id, "https://x.com/a", Some("ChatGPT"), t).await;
    ingest(&app, &site_id, "https://x.com/a", None, t).await;
    ingest(&app, &site_id, "https://x.com/b", None, t).await;

    let body = json_body(
        app.oneshot(analytics_request("user_1", &format!("?siteId={site_id}")))
            .await
            .expect("request"),
    )
    .await;

    assert_eq!(body["totalViews"], 3);
    assert_eq!(body["aiViews"], 1);
    let pages = body["topPages"].as_array().expect("pages");
    assert_eq!(pages[0]["path"], "/a");
    assert_eq!(pages[0]["views"], 2);
    assert_eq!(pages[0]["aiViews"], 1);
}

#[tokio::test]
async fn test_days_parameter_bounds_the_window() {
    let app = setup();
    let site_id = create_site(&app, "user_1").await;

    let recent = (Utc::now() - Duration::hours(1)).timestamp_millis();
    let stale = (Utc::now() - Duration::days(10)).timestamp_millis();
    ingest(&app, &site_id, "https://x.com/new", None, recent).await;
    ingest(&app, &site_id, "https://x.com/old", None, stale).await;

    let week = json_body(
        app.clone()
            .oneshot(analytics_request(
                "user_1",
                &format!("?siteId={site_id}&days=7"),
            ))
            .await
            .expect("request"),
    )
    .await;
    assert_eq!(week["totalViews"], 1);

    let quarter = json_body(
        app.oneshot(analytics_request(
            "user_1",
            &format!("?siteId={site_id}&days=30"),
        ))
        .await
        .expect("request"),
    )
    .await;
    assert_eq!(quarter["totalViews"], 2);
}

#[tokio::test]
async fn test_change_reflects_previous_period() {
    let app = setup();
    let site_id = create_site(&app, "user_1").await;

    // Two Claude views this week, one in the week before.
    let current = (Utc::now() - Duration::days(1)).timestamp_millis();
    let previous = (Utc::now() - Duration::days(8)).timestamp_millis();
    ingest(&app, &site_id, "https://x.com/", Some("Claude"), current).await;
    ingest(&app, &site_id, "https://x.com/", Some("Claude"), current).await;
    ingest(&app, &site_id, "https://x.com/", Some("Claude"), previous).await;

    let body = json_body(
        app.oneshot(analytics_request(
            "user_1",
            &format!("?siteId={site_id}&days=7"),
        ))
        .await
        .expect("request"),
    )
    .await;

    assert_eq!(body["topAiSources"][0]["name"], "Claude");
    assert_eq!(body["topAiSources"][0]["views"], 2);
    assert_eq!(body["topAiSources"][0]["change"], "+100%");
}

#[tokio::test]
async fn test_analytics_requires_authentication() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/analytics?siteId=site_abc")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_analytics_requires_site_id() {
    let app = setup();

    let response = app
        .oneshot(analytics_request("user_1", ""))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "siteId is required");
}

#[tokio::test]
async fn test_unknown_site_is_not_found() {
    let app = setup();

    let response = app
        .oneshot(analytics_request("user_1", "?siteId=site_missing"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================
// Ownership isolation: someone else's site answers 404, not 403
// ============================================================
#[tokio::test]
async fn test_other_owners_site_answers_not_found() {
    let app = setup();
    let site_id = create_site(&app, "user_1").await;

    let t = (Utc::now() - Duration::hours(1)).timestamp_millis();
    ingest(&app, &site_id, "https://x.com/secret", Some("Claude"), t).await;

    let response = app
        .oneshot(analytics_request("user_2", &format!("?siteId={site_id}")))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Site not found");
    assert!(body.get("totalViews").is_none(), "no data may leak");
}

#[tokio::test]
async fn test_empty_site_aggregates_to_zero() {
    let app = setup();
    let site_id = create_site(&app, "user_1").await;

    let body = json_body(
        app.oneshot(analytics_request("user_1", &format!("?siteId={site_id}")))
            .await
            .expect("request"),
    )
    .await;

    assert_eq!(body["totalViews"], 0);
    assert_eq!(body["aiViews"], 0);
    assert_eq!(body["topAiSources"].as_array().expect("sources").len(), 0);
    assert_eq!(body["topPages"].as_array().expect("pages").len(), 0);
}
