//! Crawl state carried across runs.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use crate::models::Record;

/// The seen-ledger: every id ever emitted plus the publication high-water mark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenState {
    pub ids: BTreeSet<String>,
    pub latest_published_at: Option<DateTime<Utc>>,
}

impl SeenState {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

/// Outcome of offering a record to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting; the record should be emitted
    New,
    /// Emitted by an earlier run
    AlreadySeen,
    /// Collected earlier in this run, usually under another category
    Duplicate,
}

/// In-memory dedup state for a single run.
///
/// Starts from the persisted seen-ledger and records every id admitted during
/// the run, so the final state can be written back in one piece.
#[derive(Debug, Clone, Default)]
pub struct RunLedger {
    previous: SeenState,
    collected: HashSet<String>,
    latest_new: Option<DateTime<Utc>>,
}

impl RunLedger {
    pub fn new(previous: SeenState) -> Self {
        Self {
            previous,
            collected: HashSet::new(),
            latest_new: None,
        }
    }

    /// Decide whether `record` is new, and mark it seen if so.
    pub fn admit(&mut self, record: &Record) -> Admission {
        if self.previous.contains(&record.id) {
            return Admission::AlreadySeen;
        }
        if !self.collected.insert(record.id.clone()) {
            return Admission::Duplicate;
        }
        if self.latest_new.is_none_or(|latest| record.published > latest) {
            self.latest_new = Some(record.published);
        }
        Admission::New
    }

    /// Number of ids admitted this run.
    pub fn new_count(&self) -> usize {
        self.collected.len()
    }

    /// Latest `published` among records admitted this run.
    pub fn latest_new_published(&self) -> Option<DateTime<Utc>> {
        self.latest_new
    }

    /// The ledger to persist: all ids, and the later of the two high-water marks.
    pub fn into_seen_state(self) -> SeenState {
        let RunLedger {
            previous,
            collected,
            latest_new,
        } = self;

        let latest_published_at = match (previous.latest_published_at, latest_new) {
            (Some(old), Some(new)) => Some(old.max(new)),
            (old, new) => old.or(new),
        };

        let mut ids = previous.ids;
        ids.extend(collected);

        SeenState {
            ids,
            latest_published_at,
        }
    }
}
