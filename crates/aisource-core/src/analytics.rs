//! Pure aggregation over in-window events.
//!
//! Everything here is a single-pass reduction over rows the store has
//! already filtered by site and window; recomputed on every query, never
//! cached.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use url::Url;

use crate::window::LookbackWindow;

/// Top-N cutoffs for the ranked tables.
pub const TOP_SOURCES: usize = 5;
pub const TOP_PAGES: usize = 10;

/// Minimal event projection the aggregator consumes.
#[derive(Debug, Clone)]
pub struct WindowEvent {
    pub url: Option<String>,
    pub ai_source: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AiSourceRow {
    pub name: String,
    pub views: i64,
    /// Period-over-period change versus the equal-length preceding window,
    /// e.g. "+23%"; "+0%" when no comparison data was supplied.
    pub change: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageRow {
    pub path: String,
    pub views: i64,
    pub ai_views: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    /// Human-readable day labels ("Jan 5"), chronological.
    pub labels: Vec<String>,
    pub total_data: Vec<i64>,
    pub ai_data: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_views: i64,
    pub ai_views: i64,
    pub top_ai_sources: Vec<AiSourceRow>,
    pub top_pages: Vec<PageRow>,
    pub time_series: TimeSeries,
}

/// Aggregate one site's in-window events into a dashboard summary.
///
/// All `change` fields are "+0%" — use [`aggregate_with_previous`] when the
/// preceding window's events are available.
pub fn aggregate(
    events: &[WindowEvent],
    window: LookbackWindow,
    now: DateTime<Utc>,
) -> AnalyticsSummary {
    let total_views = events.len() as i64;
    let ai_views = events.iter().filter(|e| e.ai_source.is_some()).count() as i64;

    let top_ai_sources = rank_sources(count_sources(events))
        .into_iter()
        .map(|(name, views)| AiSourceRow {
            name,
            views,
            change: "+0%".to_string(),
        })
        .collect();

    AnalyticsSummary {
        total_views,
        ai_views,
        top_ai_sources,
        top_pages: top_pages(events),
        time_series: time_series(events, window, now),
    }
}

/// Aggregate with a true period-over-period comparison: `previous` holds the
/// events of the equal-length window immediately preceding the current one,
/// and each top source's `change` is its count delta versus that window.
pub fn aggregate_with_previous(
    current: &[WindowEvent],
    previous: &[WindowEvent],
    window: LookbackWindow,
    now: DateTime<Utc>,
) -> AnalyticsSummary {
    let mut summary = aggregate(current, window, now);
    let prev_counts: HashMap<String, i64> = count_sources(previous).into_iter().collect();
    for row in &mut summary.top_ai_sources {
        let prev = prev_counts.get(&row.name).copied().unwrap_or(0);
        row.change = format_change(row.views, prev);
    }
    summary
}

/// Merge per-site summaries into one dashboard-level summary.
///
/// Counts are summed; source and page tables are merged by key, re-sorted,
/// and re-truncated. The time series is carried from the first summary only
/// (not a true multi-site merge), and merged `change` fields reset to "+0%"
/// since per-site comparison windows cannot be combined.
pub fn merge_summaries(summaries: &[AnalyticsSummary]) -> AnalyticsSummary {
    let mut total_views = 0;
    let mut ai_views = 0;
    let mut sources: Vec<(String, i64)> = Vec::new();
    let mut pages: Vec<PageRow> = Vec::new();

    for summary in summaries {
        total_views += summary.total_views;
        ai_views += summary.ai_views;
        for row in &summary.top_ai_sources {
            match sources.iter_mut().find(|(name, _)| *name == row.name) {
                Some((_, views)) => *views += row.views,
                None => sources.push((row.name.clone(), row.views)),
            }
        }
        for row in &summary.top_pages {
            match pages.iter_mut().find(|p| p.path == row.path) {
                Some(page) => {
                    page.views += row.views;
                    page.ai_views += row.ai_views;
                }
                None => pages.push(row.clone()),
            }
        }
    }

    let top_ai_sources = rank_sources(sources)
        .into_iter()
        .map(|(name, views)| AiSourceRow {
            name,
            views,
            change: "+0%".to_string(),
        })
        .collect();

    pages.sort_by(|a, b| b.views.cmp(&a.views));
    pages.truncate(TOP_PAGES);

    AnalyticsSummary {
        total_views,
        ai_views,
        top_ai_sources,
        top_pages: pages,
        time_series: summaries
            .first()
            .map(|s| s.time_series.clone())
            .unwrap_or(TimeSeries {
                labels: Vec::new(),
                total_data: Vec::new(),
                ai_data: Vec::new(),
            }),
    }
}

/// Strip scheme and host from a page URL, keeping the path only.
///
/// Relative inputs keep their path portion (query/fragment dropped); an
/// absent URL buckets under "/".
pub fn normalize_path(url: Option<&str>) -> String {
    let Some(raw) = url else {
        return "/".to_string();
    };
    if let Ok(parsed) = Url::parse(raw) {
        return parsed.path().to_string();
    }
    let path = raw
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Per-source view counts in first-seen order.
fn count_sources(events: &[WindowEvent]) -> Vec<(String, i64)> {
    let mut counts: Vec<(String, i64)> = Vec::new();
    for event in events {
        let Some(source) = event.ai_source.as_deref() else {
            continue;
        };
        match counts.iter_mut().find(|(name, _)| name == source) {
            Some((_, views)) => *views += 1,
            None => counts.push((source.to_string(), 1)),
        }
    }
    counts
}

/// Sort descending by count and truncate to the top 5. The sort is stable,
/// so ties keep first-seen order.
fn rank_sources(mut counts: Vec<(String, i64)>) -> Vec<(String, i64)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(TOP_SOURCES);
    counts
}

fn top_pages(events: &[WindowEvent]) -> Vec<PageRow> {
    let mut pages: Vec<PageRow> = Vec::new();
    for event in events {
        let path = normalize_path(event.url.as_deref());
        let is_ai = event.ai_source.is_some();
        match pages.iter_mut().find(|p| p.path == path) {
            Some(page) => {
                page.views += 1;
                if is_ai {
                    page.ai_views += 1;
                }
            }
            None => pages.push(PageRow {
                path,
                views: 1,
                ai_views: i64::from(is_ai),
            }),
        }
    }
    pages.sort_by(|a, b| b.views.cmp(&a.views));
    pages.truncate(TOP_PAGES);
    pages
}

/// Daily time series over the window's UTC date grid, zero-filled.
///
/// Events whose UTC date falls outside the grid (the partial first day of
/// an exact N x 24h window) are not bucketed.
fn time_series(
    events: &[WindowEvent],
    window: LookbackWindow,
    now: DateTime<Utc>,
) -> TimeSeries {
    let dates = window.dates(now);
    let index: HashMap<NaiveDate, usize> = dates
        .iter()
        .enumerate()
        .map(|(i, d)| (*d, i))
        .collect();

    let mut total_data = vec![0i64; dates.len()];
    let mut ai_data = vec![0i64; dates.len()];
    for event in events {
        let Some(&i) = index.get(&event.timestamp.date_naive()) else {
            continue;
        };
        total_data[i] += 1;
        if event.ai_source.is_some() {
            ai_data[i] += 1;
        }
    }

    TimeSeries {
        labels: dates.iter().map(day_label).collect(),
        total_data,
        ai_data,
    }
}

fn day_label(date: &NaiveDate) -> String {
    format!("{} {}", date.format("%b"), date.day())
}

fn format_change(current: i64, previous: i64) -> String {
    if previous == 0 {
        return if current == 0 {
            "+0%".to_string()
        } else {
            "+100%".to_string()
        };
    }
    let pct = ((current - previous) as f64 / previous as f64 * 100.0).round() as i64;
    if pct >= 0 {
        format!("+{pct}%")
    } else {
        format!("{pct}%")
    }
}
