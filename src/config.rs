// src/config.rs

//! Crawl window resolution from the configuration file.
//!
//! The days window can be set in two places. Lookup paths are tried in order
//! and the first one present in the document supplies the value.

use std::fs;
use std::path::Path;

use toml::Value;

/// Lookup paths for the days window, highest precedence first.
pub const DAYS_WINDOW_KEYS: &[&[&str]] = &[
    &["arxiv_paper_setting", "days_window"],
    &["crawler", "days_window"],
];

/// Resolve the crawl lookback in days.
///
/// Never fails: a missing file, unparseable document, missing key or
/// non-positive value all yield `max(default, 1)`.
pub fn resolve_days_window(config_path: &Path, default: u32) -> u32 {
    let fallback = default.max(1);

    let Some(document) = load_document(config_path) else {
        return fallback;
    };

    let Some((key, value)) = lookup_first(&document, DAYS_WINDOW_KEYS) else {
        log::debug!("No days_window configured; using {fallback}");
        return fallback;
    };

    match days_from_value(value) {
        Some(days) => days,
        None => {
            log::warn!("Ignoring invalid {key} = {value}; using {fallback}");
            fallback
        }
    }
}

fn load_document(path: &Path) -> Option<Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No config file at {}", path.display());
            return None;
        }
        Err(e) => {
            log::warn!("Failed to read config {}: {}", path.display(), e);
            return None;
        }
    };

    match content.parse::<toml::Table>() {
        Ok(table) => Some(Value::Table(table)),
        Err(e) => {
            log::warn!("Failed to parse config {}: {}", path.display(), e);
            None
        }
    }
}

/// Walk each path in turn and return the first value found, with its dotted key.
fn lookup_first<'a>(document: &'a Value, paths: &[&[&str]]) -> Option<(String, &'a Value)> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(document, |node, segment| node.get(*segment))
            .map(|value| (path.join("."), value))
    })
}

fn days_from_value(value: &Value) -> Option<u32> {
    let days = match value {
        Value::Integer(n) => *n,
        Value::Float(f) if f.is_finite() => f.trunc() as i64,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    if days >= 1 {
        u32::try_from(days).ok()
    } else {
        None
    }
}
