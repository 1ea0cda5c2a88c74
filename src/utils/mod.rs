//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod time;

/// Extract the short identifier from an arXiv entry id.
///
/// `http://arxiv.org/abs/2406.00001v1` becomes `2406.00001v1` and old-style
/// ids keep their archive prefix (`hep-th/9901001v1`).
pub fn short_id(entry_id: &str) -> Option<String> {
    let trimmed = entry_id.trim();
    let id = match trimmed.rsplit_once("/abs/") {
        Some((_, tail)) => tail,
        None => trimmed,
    };
    let id = id.trim_matches('/');

    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Collapse line breaks into single spaces.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}
