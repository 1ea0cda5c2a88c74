//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - The upstream metadata source abstraction (`MetadataSource`)
//! - The arXiv Atom API adapter (`ArxivSource`)
//! - Per-category crawling with dedup (`CategoryCrawler`)

mod arxiv;
mod categories;
pub mod source;

pub use arxiv::ArxivSource;
pub use categories::{CategoryCrawler, CategoryStats, CrawlOutcome};
pub use source::{MetadataSource, SearchPage, SearchQuery};
