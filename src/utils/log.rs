// src/utils/log.rs

//! Log grouping for CI runners.
//!
//! When enabled, phases of a run are wrapped in GitHub Actions
//! `::group::` / `::endgroup::` markers so each category folds in the job log.
//! Regular log lines go through the `log` facade.

use std::sync::OnceLock;

use crate::models::LoggingConfig;

/// Whether group markers are emitted
static GROUPS_ENABLED: OnceLock<bool> = OnceLock::new();

/// Initialize grouping from configuration, falling back to `GITHUB_ACTIONS`.
pub fn init(config: &LoggingConfig) {
    let enabled = config
        .github_groups
        .unwrap_or_else(|| std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true"));
    let _ = GROUPS_ENABLED.set(enabled);
}

fn groups_enabled() -> bool {
    GROUPS_ENABLED.get().copied().unwrap_or(false)
}

/// An open log group, closed when dropped.
#[must_use = "the group closes as soon as the guard is dropped"]
pub struct Group {
    enabled: bool,
}

impl Group {
    fn open(title: &str, enabled: bool) -> Self {
        if enabled {
            println!("{}", start_marker(title));
        }
        Self { enabled }
    }
}

impl Drop for Group {
    fn drop(&mut self) {
        if self.enabled {
            println!("::endgroup::");
        }
    }
}

/// Open a log group titled `title`.
pub fn group(title: &str) -> Group {
    Group::open(title, groups_enabled())
}

fn start_marker(title: &str) -> String {
    // Markers are line-oriented
    format!("::group::{}", title.replace(['\n', '\r'], " "))
}
