//! Static AI-assistant referrer table and classification.

use url::Url;

/// Known AI-assistant referrer domains, in declaration order.
///
/// Matching is first-match-wins, so order is the tie-break if overlapping
/// entries are ever introduced. Entries are currently disjoint.
pub const AI_SOURCES: &[(&str, &str)] = &[
    ("chatgpt.com", "ChatGPT"),
    ("chat.openai.com", "ChatGPT"),
    ("claude.ai", "Claude"),
    ("perplexity.ai", "Perplexity"),
    ("gemini.google.com", "Gemini"),
    ("bard.google.com", "Bard"),
    ("copilot.microsoft.com", "Copilot"),
    ("you.com", "You.com"),
    ("phind.com", "Phind"),
    ("character.ai", "Character.AI"),
    ("poe.com", "Poe"),
    ("searchgpt.com", "SearchGPT"),
];

/// A referrer that matched the AI-source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiReferrer {
    /// Display name, e.g. "ChatGPT".
    pub source: String,
    /// The referrer's actual hostname (may be a subdomain of the table entry).
    pub domain: String,
    /// The full referrer URL as received.
    pub url: String,
}

/// Classify a referrer URL against [`AI_SOURCES`].
///
/// Matches on exact hostname or any subdomain (suffix match on `.domain`).
/// An empty or unparseable referrer is the expected organic/direct case and
/// returns `None` without raising.
pub fn classify_referrer(referrer: &str) -> Option<AiReferrer> {
    if referrer.is_empty() {
        return None;
    }

    let parsed = match Url::parse(referrer) {
        Ok(u) => u,
        Err(_) => {
            tracing::debug!("invalid referrer URL");
            return None;
        }
    };
    let hostname = parsed.host_str()?.to_lowercase();

    for (domain, source) in AI_SOURCES {
        if hostname == *domain || hostname.ends_with(&format!(".{domain}")) {
            return Some(AiReferrer {
                source: (*source).to_string(),
                domain: hostname,
                url: referrer.to_string(),
            });
        }
    }

    None
}

/// Extract the hostname from a referrer URL, for the `$referring_domain`
/// super-property. Returns `None` when the referrer has no parseable host.
pub fn referring_domain(referrer: &str) -> Option<String> {
    Url::parse(referrer)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}
