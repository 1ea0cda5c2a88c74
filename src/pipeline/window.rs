// src/pipeline/window.rs

//! Query window resolution.
//!
//! The window start comes from persisted state when there is any, but never
//! reaches further back than the configured lookback, and is always strictly
//! before `now`.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::models::StartPolicy;
use crate::utils::time::format_query_bound;

/// What determined the window start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSource {
    LatestPublished,
    LastRun,
    /// Lookback of N days, either as fallback or as the clamp
    DaysWindow(u32),
    /// State pointed at or past `now`
    MinimumSpan,
}

impl fmt::Display for WindowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowSource::LatestPublished => write!(f, "latest_published_at"),
            WindowSource::LastRun => write!(f, "last_crawl_at"),
            WindowSource::DaysWindow(days) => write!(f, "days_window={days}"),
            WindowSource::MinimumSpan => write!(f, "minimum span"),
        }
    }
}

/// Half-open `[start, end)` query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source: WindowSource,
}

impl fmt::Display for CrawlWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} TO {} ({})",
            format_query_bound(self.start),
            format_query_bound(self.end),
            self.source
        )
    }
}

/// Resolve the window for a run ending at `now`.
pub fn resolve_window(
    now: DateTime<Utc>,
    days: u32,
    latest_published: Option<DateTime<Utc>>,
    last_run: Option<DateTime<Utc>>,
    policy: StartPolicy,
) -> CrawlWindow {
    let days = days.max(1);
    let lookback = now
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let from_published = latest_published.map(|at| (at, WindowSource::LatestPublished));
    let from_last_run = last_run.map(|at| (at, WindowSource::LastRun));

    let candidate = match policy {
        StartPolicy::PublishedFirst => from_published.or(from_last_run),
        StartPolicy::Latest => match (from_published, from_last_run) {
            (Some(published), Some(run)) => Some(if run.0 > published.0 { run } else { published }),
            (published, run) => published.or(run),
        },
    };

    let (mut start, mut source) = candidate.unwrap_or((lookback, WindowSource::DaysWindow(days)));

    if start < lookback {
        start = lookback;
        source = WindowSource::DaysWindow(days);
    }

    if start >= now {
        start = now - Duration::minutes(1);
        source = WindowSource::MinimumSpan;
    }

    CrawlWindow {
        start,
        end: now,
        source,
    }
}
