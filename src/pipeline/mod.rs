//! Pipeline entry points for harvester operations.
//!
//! - `resolve_window`: Pick the query range from persisted state
//! - `run_crawler`: Fetch, dedup, write the batch and commit state

pub mod crawl;
pub mod persist;
pub mod window;

pub use crawl::{RunOptions, RunSummary, run_crawler};
pub use persist::{Persister, commit_state, dated_batch_path};
pub use window::{CrawlWindow, WindowSource, resolve_window};
