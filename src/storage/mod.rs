//! Storage for crawl state and output batches.
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/
//! ├── config.toml
//! └── archive/
//!     ├── crawl_state.json          # Last-run marker
//!     ├── arxiv_seen.json           # Seen-ledger
//!     └── YYYYMMDD/
//!         └── raw/
//!             └── arxiv_papers_YYYYMMDD.json
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::SeenState;

// Re-export for convenience
pub use local::{LocalStorage, write_json_atomic};

/// On-disk shape of the last-run marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastRunFile {
    pub last_crawl_at: String,
}

/// On-disk shape of the seen-ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenFile {
    pub updated_at: String,
    /// Empty string when no record has been emitted yet
    pub latest_published_at: String,
    /// Sorted
    pub ids: Vec<String>,
}

/// Trait for crawl state backends.
///
/// Loads never fail: missing or malformed state reads as empty. Saves
/// surface every error, since losing the ledger would cause re-emission.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Timestamp at which the last completed run ended.
    async fn load_last_run_at(&self) -> Option<DateTime<Utc>>;

    async fn save_last_run_at(&self, at: DateTime<Utc>) -> Result<()>;

    /// Previously emitted ids and the publication high-water mark.
    async fn load_seen(&self) -> SeenState;

    async fn save_seen(&self, state: &SeenState) -> Result<()>;
}
