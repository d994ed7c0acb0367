use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::token::{base36_fragment, to_base36};

/// A tracked site. Owned exclusively by one `owner_id`; immutable after
/// creation except `domain`/`name`/`updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct CreateSiteParams {
    pub domain: String,
    pub name: String,
    pub owner_id: String,
}

/// Generate a site identifier: "site_" + random base-36 fragment + "_" +
/// epoch-millis in base 36. Globally unique by construction probability;
/// the store still enforces uniqueness via the primary key.
pub fn generate_site_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    format!("site_{}_{}", base36_fragment(11), to_base36(millis))
}

/// Strip a scheme prefix and trailing slash before storage.
pub fn clean_domain(domain: &str) -> String {
    domain
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

/// The script tag a host page embeds to load the collector for `site_id`.
pub fn embed_snippet(public_url: &str, site_id: &str) -> String {
    format!(r#"<script defer src="{public_url}/track.js" data-site="{site_id}"></script>"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_ids_are_prefixed_and_distinct() {
        let a = generate_site_id();
        let b = generate_site_id();
        assert!(a.starts_with("site_"));
        assert_ne!(a, b, "identical inputs must still yield distinct ids");
    }

    #[test]
    fn clean_domain_strips_scheme_and_trailing_slash() {
        assert_eq!(clean_domain("https://example.com/"), "example.com");
        assert_eq!(clean_domain("http://example.com"), "example.com");
        assert_eq!(clean_domain("example.com"), "example.com");
        assert_eq!(clean_domain("example.com/sub/"), "example.com/sub");
    }

    #[test]
    fn snippet_references_site_id() {
        let snippet = embed_snippet("https://analytics.example.com", "site_abc");
        assert!(snippet.contains(r#"data-site="site_abc""#));
        assert!(snippet.contains("https://analytics.example.com/track.js"));
    }
}
