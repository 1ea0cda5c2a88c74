// src/pipeline/persist.rs

//! Batch output and state commit.
//!
//! Output goes first: if it cannot be written the ledger is left untouched,
//! and the next run picks the same records up again.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Batch, RunLedger, SeenState};
use crate::storage::{StateStore, write_json_atomic};
use crate::utils::time::date_stamp;

/// Writes a run's batch to its dated output file.
#[derive(Debug, Clone)]
pub struct Persister {
    archive_dir: PathBuf,
    source: String,
    output_override: Option<PathBuf>,
}

impl Persister {
    pub fn new(
        archive_dir: impl Into<PathBuf>,
        source: impl Into<String>,
        output_override: Option<PathBuf>,
    ) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            source: source.into(),
            output_override,
        }
    }

    /// `<archive>/<YYYYMMDD>/raw/<source>_papers_<YYYYMMDD>.json`, unless overridden.
    pub fn output_path(&self, run_end: DateTime<Utc>) -> PathBuf {
        if let Some(path) = &self.output_override {
            return path.clone();
        }
        dated_batch_path(&self.archive_dir, &self.source, run_end)
    }

    /// Write the batch if it has any records.
    ///
    /// Returns the path written, or `None` when the batch was empty.
    pub async fn persist(&self, batch: &Batch, run_end: DateTime<Utc>) -> Result<Option<PathBuf>> {
        if batch.is_empty() {
            log::warn!("No papers found. Check your date range or network.");
            return Ok(None);
        }

        let path = self.output_path(run_end);
        write_json_atomic(&path, batch.records()).await?;
        log::info!("Saved {} papers to {}", batch.len(), path.display());
        Ok(Some(path))
    }
}

pub fn dated_batch_path(archive_dir: &Path, source: &str, run_end: DateTime<Utc>) -> PathBuf {
    let stamp = date_stamp(run_end);
    archive_dir
        .join(&stamp)
        .join("raw")
        .join(format!("{source}_papers_{stamp}.json"))
}

/// Write the seen-ledger and last-run marker for a finished run.
///
/// Called whether or not the run found anything, so the next window advances.
pub async fn commit_state(
    store: &dyn StateStore,
    ledger: RunLedger,
    run_end: DateTime<Utc>,
) -> Result<SeenState> {
    let state = ledger.into_seen_state();
    store.save_seen(&state).await?;
    store.save_last_run_at(run_end).await?;
    log::info!(
        "Seen-ledger now holds {} ids (latest published: {})",
        state.ids.len(),
        state
            .latest_published_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "none".to_string())
    );
    Ok(state)
}
