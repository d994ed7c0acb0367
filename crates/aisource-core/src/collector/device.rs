//! Best-effort device/browser/OS classification from the user-agent string.
//!
//! Ordered case-insensitive substring checks, first match wins. Declaration
//! order is part of the contract (e.g. Safari only matches when Chrome did
//! not, and an Android UA containing "Linux" resolves to Linux because the
//! Linux pattern is checked first).

const MOBILE_PATTERNS: &[&str] = &[
    "mobile",
    "android",
    "iphone",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

const TABLET_PATTERNS: &[&str] = &["tablet", "ipad"];

pub fn classify_device(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if MOBILE_PATTERNS.iter().any(|p| ua.contains(p)) {
        "Mobile"
    } else if TABLET_PATTERNS.iter().any(|p| ua.contains(p)) {
        "Tablet"
    } else {
        "Desktop"
    }
}

pub fn classify_browser(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("chrome") {
        "Chrome"
    } else if ua.contains("firefox") {
        "Firefox"
    } else if ua.contains("safari") {
        "Safari"
    } else if ua.contains("edge") {
        "Edge"
    } else {
        "Unknown"
    }
}

pub fn classify_os(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("windows") {
        "Windows"
    } else if ua.contains("mac") {
        "macOS"
    } else if ua.contains("linux") {
        "Linux"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("ios") {
        "iOS"
    } else {
        "Unknown"
    }
}
