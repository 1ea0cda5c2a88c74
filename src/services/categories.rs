// src/services/categories.rs

//! Category crawler service.
//!
//! Queries the metadata source one category at a time, paginating each query
//! to exhaustion before moving on, and keeps only records the run ledger has
//! never seen.

use std::time::Duration;

use crate::error::Result;
use crate::models::{Admission, Batch, CrawlerConfig, RunLedger};
use crate::pipeline::CrawlWindow;
use crate::services::source::{MetadataSource, SearchQuery};
use crate::utils::log::group;

/// Per-category result counters.
#[derive(Debug, Default, Clone)]
pub struct CategoryStats {
    pub category: String,
    pub fetched: usize,
    pub new: usize,
    pub already_seen: usize,
    pub duplicates: usize,
    pub error: Option<String>,
}

/// Summary of crawling every configured category.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    /// New records per category, in crawl order
    pub batches: Vec<Batch>,
    pub categories: Vec<CategoryStats>,
}

/// Service for crawling categories from a metadata source.
pub struct CategoryCrawler<'a> {
    source: &'a dyn MetadataSource,
    config: &'a CrawlerConfig,
}

impl<'a> CategoryCrawler<'a> {
    pub fn new(source: &'a dyn MetadataSource, config: &'a CrawlerConfig) -> Self {
        Self { source, config }
    }

    /// Crawl every category in order.
    ///
    /// A failing category is logged and skipped after a short backoff; records
    /// it yielded before failing are kept.
    pub async fn crawl_all(&self, window: &CrawlWindow, ledger: &mut RunLedger) -> CrawlOutcome {
        let backoff = Duration::from_secs(self.config.error_backoff_secs);
        let mut outcome = CrawlOutcome::default();

        for category in &self.config.categories {
            let _group = group(&format!("Fetch category: {category}"));
            log::info!("Fetching category: {category} ...");

            let mut batch = Batch::new();
            let mut stats = CategoryStats {
                category: category.clone(),
                ..CategoryStats::default()
            };

            match self
                .crawl_category(category, window, ledger, &mut batch, &mut stats)
                .await
            {
                Ok(()) => {
                    log::info!("Finished {category}: got {} new papers", stats.new);
                }
                Err(e) => {
                    log::error!(
                        "Error fetching category {category} after {} new papers: {e}",
                        stats.new
                    );
                    stats.error = Some(e.to_string());
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }

            outcome.batches.push(batch);
            outcome.categories.push(stats);
        }

        outcome
    }

    /// Page through one category, pushing unseen records into `batch`.
    pub async fn crawl_category(
        &self,
        category: &str,
        window: &CrawlWindow,
        ledger: &mut RunLedger,
        batch: &mut Batch,
        stats: &mut CategoryStats,
    ) -> Result<()> {
        let query = SearchQuery::new(category, window.start, window.end);
        let interval = self.config.progress_interval.max(1);
        let mut offset = 0;

        loop {
            let page = self.source.fetch_page(&query, offset).await?;
            if page.consumed == 0 {
                break;
            }
            offset += page.consumed;
            stats.fetched += page.records.len();

            for record in page.records {
                match ledger.admit(&record) {
                    Admission::AlreadySeen => stats.already_seen += 1,
                    Admission::Duplicate => stats.duplicates += 1,
                    Admission::New => {
                        batch.insert(record);
                        stats.new += 1;
                        if stats.new % interval == 0 {
                            log::info!("Category {category}: {} papers fetched...", stats.new);
                        }
                    }
                }
            }

            if page.total_results.is_some_and(|total| offset >= total) {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::tests::sample_record;
    use crate::models::{Record, SeenState};
    use crate::pipeline::WindowSource;
    use crate::services::source::testing::StaticSource;
    use crate::utils::log::capture;
    use chrono::{DateTime, TimeZone, Utc};
    use log::Level;
    use std::collections::BTreeSet;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    fn window() -> CrawlWindow {
        CrawlWindow {
            start: at(7, 0),
            end: at(10, 0),
            source: WindowSource::DaysWindow(3),
        }
    }

    fn config(categories: &[&str]) -> CrawlerConfig {
        CrawlerConfig {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            error_backoff_secs: 0,
            progress_interval: 2,
            ..CrawlerConfig::default()
        }
    }

    fn records(ids: &[&str]) -> Vec<Record> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| sample_record(id, at(9, i as u32)))
            .collect()
    }

    #[tokio::test]
    async fn test_cross_category_duplicates_emitted_once() {
        let source = StaticSource::new(10)
            .with_records("cs", records(&["2406.0001", "2406.0002"]))
            .with_records("math", records(&["2406.0001", "2406.0003"]));
        let config = config(&["cs", "math"]);
        let crawler = CategoryCrawler::new(&source, &config);
        let mut ledger = RunLedger::default();

        let outcome = crawler.crawl_all(&window(), &mut ledger).await;
        assert_eq!(outcome.categories[1].duplicates, 1);
        assert!(outcome.categories.iter().all(|c| c.error.is_none()));

        let merged = Batch::merge_all(outcome.batches);
        let ids: Vec<_> = merged.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2406.0001", "2406.0002", "2406.0003"]);
    }

    #[tokio::test]
    async fn test_previously_seen_ids_are_skipped() {
        let source =
            StaticSource::new(10).with_records("cs", records(&["2406.0001", "2406.0002"]));
        let config = config(&["cs"]);
        let crawler = CategoryCrawler::new(&source, &config);
        let mut ledger = RunLedger::new(SeenState {
            ids: BTreeSet::from(["2406.0001".to_string()]),
            latest_published_at: None,
        });

        let outcome = crawler.crawl_all(&window(), &mut ledger).await;
        assert_eq!(outcome.batches[0].len(), 1);
        assert!(outcome.batches[0].contains("2406.0002"));
        assert_eq!(outcome.categories[0].already_seen, 1);
    }

    #[tokio::test]
    async fn test_paginates_until_total_reached() {
        let ids: Vec<String> = (0..7).map(|i| format!("2406.{i:04}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let source = StaticSource::new(3).with_records("cs", records(&id_refs));
        let config = config(&["cs"]);
        let crawler = CategoryCrawler::new(&source, &config);
        let mut ledger = RunLedger::default();

        let outcome = crawler.crawl_all(&window(), &mut ledger).await;
        assert_eq!(outcome.batches[0].len(), 7);
        assert_eq!(outcome.categories[0].fetched, 7);
        // Pages at offsets 0, 3 and 6
        assert_eq!(source.query_count(), 3);
    }

    #[tokio::test]
    async fn test_progress_logged_every_interval() {
        let source = StaticSource::new(2).with_records("cs", records(&["a", "b", "c", "d", "e"]));
        let config = config(&["cs"]);
        let crawler = CategoryCrawler::new(&source, &config);
        let mut ledger = RunLedger::default();

        capture::start();
        crawler.crawl_all(&window(), &mut ledger).await;
        let progress: Vec<String> = capture::take(Level::Info)
            .into_iter()
            .filter(|line| line.contains("papers fetched..."))
            .collect();

        assert_eq!(
            progress,
            vec![
                "Category cs: 2 papers fetched...",
                "Category cs: 4 papers fetched...",
            ]
        );
    }

    #[tokio::test]
    async fn test_query_covers_window_and_category() {
        let source = StaticSource::new(10);
        let config = config(&["hep-th"]);
        let crawler = CategoryCrawler::new(&source, &config);
        let mut ledger = RunLedger::default();

        crawler.crawl_all(&window(), &mut ledger).await;
        let queries = source.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0].expression(),
            "cat:hep-th* AND submittedDate:[202406070000 TO 202406100000]"
        );
    }

    #[tokio::test]
    async fn test_failed_category_keeps_partial_results_and_continues() {
        let source = StaticSource::new(2)
            .with_records("cs", records(&["a", "b", "c", "d"]))
            .failing_at("cs", 2)
            .with_records("math", records(&["e"]));
        let config = config(&["cs", "math"]);
        let crawler = CategoryCrawler::new(&source, &config);
        let mut ledger = RunLedger::default();

        let outcome = crawler.crawl_all(&window(), &mut ledger).await;

        assert!(outcome.categories[0].error.is_some());
        assert!(outcome.categories[1].error.is_none());
        assert_eq!(outcome.batches[0].len(), 2);
        assert_eq!(outcome.batches[1].len(), 1);

        let state = ledger.into_seen_state();
        assert_eq!(state.ids.len(), 3);
    }
}
