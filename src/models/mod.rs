// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
pub(crate) mod record;
mod state;

// Re-export all public types
pub use config::{ArxivConfig, Config, CrawlerConfig, LoggingConfig, PathsConfig, StartPolicy};
pub use record::{Batch, Record};
pub use state::{Admission, RunLedger, SeenState};
