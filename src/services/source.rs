// src/services/source.rs

//! Upstream metadata source abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Record;
use crate::utils::time::format_query_bound;

/// A category query over a submission-date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Category prefix; matches every sub-category (`cs` covers `cs.AI`)
    pub category: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SearchQuery {
    pub fn new(category: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            category: category.into(),
            start,
            end,
        }
    }

    /// arXiv search expression, e.g. `cat:cs* AND submittedDate:[202406070000 TO 202406100000]`.
    pub fn expression(&self) -> String {
        format!(
            "cat:{}* AND submittedDate:[{} TO {}]",
            self.category,
            format_query_bound(self.start),
            format_query_bound(self.end)
        )
    }
}

/// One page of results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub records: Vec<Record>,
    /// Upstream entries covered by this page, including any that were dropped
    pub consumed: usize,
    /// Total matches reported upstream, when known
    pub total_results: Option<usize>,
}

/// A paginated, newest-first metadata search.
///
/// Implementations own their retry policy: a returned error means the page
/// could not be fetched within a bounded number of attempts.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Source tag stamped on records and used in output file names.
    fn name(&self) -> &str;

    /// Fetch the page of `query` results starting at `offset`, newest first.
    async fn fetch_page(&self, query: &SearchQuery, offset: usize) -> Result<SearchPage>;
}
