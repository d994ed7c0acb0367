use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reserved referrer value the collector sends for direct visits.
/// Stored as NULL, never as a literal referrer.
pub const DIRECT_SENTINEL: &str = "$direct";

/// The payload the collector sends to POST /api/track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPayload {
    pub event: String,
    /// Open key-value bag. Well-known `$`-keys are lifted into first-class
    /// columns at ingestion; the whole bag is stored alongside them.
    pub properties: Map<String, Value>,
    pub distinct_id: String,
    pub session_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    /// One of `event`, `properties.token`, `distinct_id`, `session_id` is
    /// absent or empty.
    #[error("Missing required fields")]
    MissingFields,
}

impl TrackPayload {
    /// Validate an already-parsed JSON body into a payload.
    ///
    /// Kept permissive on everything except the four required fields so the
    /// ingestion endpoint can distinguish "missing fields" from "not JSON".
    pub fn from_json(body: &Value) -> Result<Self, TrackError> {
        let event = body
            .get("event")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(TrackError::MissingFields)?;
        let properties = body
            .get("properties")
            .and_then(Value::as_object)
            .ok_or(TrackError::MissingFields)?;
        properties
            .get("token")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(TrackError::MissingFields)?;
        let distinct_id = body
            .get("distinct_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(TrackError::MissingFields)?;
        let session_id = body
            .get("session_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(TrackError::MissingFields)?;

        Ok(Self {
            event: event.to_string(),
            properties: properties.clone(),
            distinct_id: distinct_id.to_string(),
            session_id: session_id.to_string(),
        })
    }

    /// The site token carried in `properties.token`.
    pub fn token(&self) -> &str {
        self.properties
            .get("token")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// The normalized, stored version of an event — mirrors the `events` table
/// columns exactly. Append-only; never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub site_id: String,
    pub session_id: String,
    pub distinct_id: String,
    pub event_name: String,
    /// Client-supplied event time (`properties.time`, epoch-ms).
    pub timestamp: DateTime<Utc>,
    /// The full property bag, serialized to a JSON string for storage.
    pub properties: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub referrer: Option<String>,
    pub ai_source: Option<String>,
    pub ai_domain: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub screen_width: Option<i64>,
    pub screen_height: Option<i64>,
    pub viewport_width: Option<i64>,
    pub viewport_height: Option<i64>,
    pub time_on_page: Option<i64>,
    pub time_to_engage: Option<i64>,
    pub engaged: Option<bool>,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Normalize a validated payload into a storable row.
    ///
    /// `received_at` is the server receipt time: it stamps `created_at` and
    /// stands in for the event timestamp when `properties.time` is absent
    /// or not a number.
    pub fn from_track(payload: TrackPayload, ip_address: String, received_at: DateTime<Utc>) -> Self {
        let TrackPayload {
            event,
            properties: props,
            distinct_id,
            session_id,
        } = payload;

        let site_id = props
            .get("token")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let timestamp = prop_i64(&props, "time")
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(received_at);

        let referrer = match prop_str(&props, "$referrer") {
            Some(r) if r == DIRECT_SENTINEL => None,
            other => other,
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            site_id,
            session_id,
            distinct_id,
            event_name: event,
            timestamp,
            url: prop_str(&props, "$current_url"),
            title: prop_str(&props, "$title"),
            referrer,
            ai_source: prop_str(&props, "$ai_source"),
            ai_domain: prop_str(&props, "$ai_domain"),
            device_type: prop_str(&props, "$device_type"),
            browser: prop_str(&props, "$browser"),
            os: prop_str(&props, "$os"),
            language: prop_str(&props, "$language"),
            timezone: prop_str(&props, "$timezone"),
            screen_width: prop_i64(&props, "$screen_width"),
            screen_height: prop_i64(&props, "$screen_height"),
            viewport_width: prop_i64(&props, "$viewport_width"),
            viewport_height: prop_i64(&props, "$viewport_height"),
            time_on_page: prop_i64(&props, "time_on_page"),
            time_to_engage: prop_i64(&props, "time_to_engage"),
            engaged: props.get("engaged").and_then(Value::as_bool),
            properties: Value::Object(props).to_string(),
            ip_address,
            created_at: received_at,
        }
    }
}

fn prop_str(props: &Map<String, Value>, key: &str) -> Option<String> {
    props
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn prop_i64(props: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = props.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "event": "Page Viewed",
            "properties": {
                "token": "site_abc",
                "$current_url": "https://x.com/blog/post",
                "$title": "Post",
                "$referrer": "https://claude.ai/chat",
                "$ai_source": "Claude",
                "$ai_domain": "claude.ai",
                "$screen_width": 1920,
                "time": 1750000000000i64
            },
            "distinct_id": "d1",
            "session_id": "s1"
        })
    }

    #[test]
    fn from_json_accepts_valid_body() {
        let payload = TrackPayload::from_json(&valid_body()).expect("valid payload");
        assert_eq!(payload.event, "Page Viewed");
        assert_eq!(payload.token(), "site_abc");
        assert_eq!(payload.distinct_id, "d1");
        assert_eq!(payload.session_id, "s1");
    }

    #[test]
    fn from_json_rejects_missing_required_fields() {
        for field in ["event", "properties", "distinct_id", "session_id"] {
            let mut body = valid_body();
            body.as_object_mut().expect("object").remove(field);
            assert_eq!(
                TrackPayload::from_json(&body),
                Err(TrackError::MissingFields),
                "missing {field} must be rejected"
            );
        }
    }

    #[test]
    fn from_json_rejects_missing_token() {
        let mut body = valid_body();
        body["properties"]
            .as_object_mut()
            .expect("object")
            .remove("token");
        assert_eq!(TrackPayload::from_json(&body), Err(TrackError::MissingFields));
    }

    #[test]
    fn from_track_lifts_well_known_properties() {
        let payload = TrackPayload::from_json(&valid_body()).expect("valid payload");
        let now = Utc::now();
        let event = Event::from_track(payload, "1.2.3.4".to_string(), now);

        assert_eq!(event.site_id, "site_abc");
        assert_eq!(event.event_name, "Page Viewed");
        assert_eq!(event.url.as_deref(), Some("https://x.com/blog/post"));
        assert_eq!(event.ai_source.as_deref(), Some("Claude"));
        assert_eq!(event.ai_domain.as_deref(), Some("claude.ai"));
        assert_eq!(event.screen_width, Some(1920));
        assert_eq!(event.timestamp.timestamp_millis(), 1750000000000);
        assert_eq!(event.ip_address, "1.2.3.4");
        assert_eq!(event.created_at, now);

        // Full bag retained.
        let bag: Value = serde_json::from_str(&event.properties).expect("stored bag is JSON");
        assert_eq!(bag["$title"], "Post");
    }

    #[test]
    fn direct_sentinel_referrer_becomes_null() {
        let mut body = valid_body();
        body["properties"]["$referrer"] = json!("$direct");
        let payload = TrackPayload::from_json(&body).expect("valid payload");
        let event = Event::from_track(payload, "unknown".to_string(), Utc::now());
        assert_eq!(event.referrer, None);
    }

    #[test]
    fn missing_time_falls_back_to_receipt_time() {
        let mut body = valid_body();
        body["properties"]
            .as_object_mut()
            .expect("object")
            .remove("time");
        let payload = TrackPayload::from_json(&body).expect("valid payload");
        let now = Utc::now();
        let event = Event::from_track(payload, "unknown".to_string(), now);
        assert_eq!(event.timestamp, now);
    }
}
