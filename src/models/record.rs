//! Harvested paper records.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one harvested paper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Short upstream identifier, unique per record
    pub id: String,

    /// Origin system tag
    pub source: String,

    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Display names in author order
    pub authors: Vec<String>,

    pub primary_category: String,

    /// Classification tags as reported upstream
    pub categories: Vec<String>,

    pub published: DateTime<Utc>,

    /// Direct artifact link, or the landing page when none is offered
    pub link: String,
}

/// Records collected during a run, unique by id in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    records: Vec<Record>,
    ids: HashSet<String>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Returns `false` if its id is already present.
    pub fn insert(&mut self, record: Record) -> bool {
        if !self.ids.insert(record.id.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Fold another batch into this one, keeping the first copy of each id.
    pub fn merge(&mut self, other: Batch) {
        for record in other.records {
            self.insert(record);
        }
    }

    /// Merge many per-category batches into one.
    pub fn merge_all(batches: impl IntoIterator<Item = Batch>) -> Self {
        let mut merged = Self::new();
        for batch in batches {
            merged.merge(batch);
        }
        merged
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Latest `published` timestamp in the batch.
    pub fn latest_published(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(|r| r.published).max()
    }
}
