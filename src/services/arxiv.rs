// src/services/arxiv.rs

//! arXiv query API adapter.
//!
//! Issues paginated `export.arxiv.org/api/query` requests, parses the Atom
//! response and maps entries to [`Record`]s. Requests are spaced by a fixed
//! delay and each page is retried a bounded number of times.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ArxivConfig, Record};
use crate::services::source::{MetadataSource, SearchPage, SearchQuery};
use crate::utils::time::parse_timestamp;
use crate::utils::{http, normalize_newlines, short_id};

const SOURCE_NAME: &str = "arxiv";

/// `MetadataSource` backed by the arXiv Atom API.
pub struct ArxivSource {
    client: Client,
    config: ArxivConfig,
    last_request: Mutex<Option<Instant>>,
}

impl ArxivSource {
    /// Create a source with a client built from `config`.
    pub fn new(config: &ArxivConfig) -> Result<Self> {
        let client = http::create_client(config)?;
        Ok(Self::with_client(client, config.clone()))
    }

    pub fn with_client(client: Client, config: ArxivConfig) -> Self {
        Self {
            client,
            config,
            last_request: Mutex::new(None),
        }
    }

    /// Build the request URL for one page.
    fn page_url(&self, query: &SearchQuery, offset: usize) -> Result<Url> {
        let url = Url::parse_with_params(
            &self.config.base_url,
            &[
                ("search_query", query.expression()),
                ("start", offset.to_string()),
                ("max_results", self.config.page_size.to_string()),
                ("sortBy", "submittedDate".to_string()),
                ("sortOrder", "descending".to_string()),
            ],
        )?;
        Ok(url)
    }

    /// Wait until `request_delay_ms` has passed since the previous request.
    async fn throttle(&self) {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let wait = {
            let last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
            last.map(|at| delay.saturating_sub(at.elapsed()))
        };

        if let Some(wait) = wait {
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }

        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    /// Single attempt at fetching and decoding a page.
    async fn try_fetch(&self, url: &Url, offset: usize) -> Result<SearchPage> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(url.as_str(), format!("HTTP {status}")));
        }

        let body = response.text().await?;
        let feed = parse_feed(&body)?;

        if let Some(error) = feed.error() {
            return Err(AppError::upstream(url.as_str(), error));
        }

        let consumed = feed.entries.len();
        if consumed == 0 && feed.total_results.is_some_and(|total| offset < total) {
            return Err(AppError::upstream(
                url.as_str(),
                format!(
                    "empty page at offset {offset} of {} results",
                    feed.total_results.unwrap_or_default()
                ),
            ));
        }

        let records = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let entry_id = entry.id.clone();
                let record = entry.into_record(SOURCE_NAME);
                if record.is_none() {
                    log::warn!("Skipping malformed entry {entry_id:?}");
                }
                record
            })
            .collect();

        Ok(SearchPage {
            records,
            consumed,
            total_results: feed.total_results,
        })
    }
}

#[async_trait]
impl MetadataSource for ArxivSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_page(&self, query: &SearchQuery, offset: usize) -> Result<SearchPage> {
        let url = self.page_url(query, offset)?;
        let attempts = self.config.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            self.throttle().await;
            log::debug!("GET {url} (attempt {attempt}/{attempts})");

            match self.try_fetch(&url, offset).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < attempts => {
                    log::warn!(
                        "Page at offset {offset} for {} failed (attempt {attempt}/{attempts}): {e}",
                        query.category
                    );
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::upstream(
                        query.expression(),
                        format!("giving up after {attempts} attempts: {e}"),
                    ));
                }
            }
        }
    }
}

// --- Atom parsing ---

/// The parts of an arXiv Atom response we read.
///
/// Element names match on their local part, so `opensearch:totalResults`
/// binds to `totalResults` and `arxiv:primary_category` to `primary_category`.
#[derive(Debug, Default, Deserialize)]
struct AtomFeed {
    #[serde(rename = "totalResults")]
    total_results: Option<usize>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

impl AtomFeed {
    /// Message of an arXiv error entry, if the response carries one.
    fn error(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.is_error())
            .map(|entry| entry.summary.trim())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AtomEntry {
    id: String,
    title: String,
    summary: String,
    published: String,
    #[serde(rename = "author")]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "link")]
    links: Vec<AtomLink>,
    primary_category: Option<AtomCategory>,
    #[serde(rename = "category")]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Default, Deserialize)]
struct AtomAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@title")]
    title: Option<String>,
    #[serde(rename = "@type")]
    media_type: Option<String>,
}

impl AtomLink {
    fn is_pdf(&self) -> bool {
        self.title.as_deref() == Some("pdf") || self.media_type.as_deref() == Some("application/pdf")
    }
}

#[derive(Debug, Default, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term", default)]
    term: String,
}

impl AtomEntry {
    fn is_error(&self) -> bool {
        self.id.contains("/api/errors")
    }

    fn into_record(self, source: &str) -> Option<Record> {
        let id = short_id(&self.id)?;
        let published = parse_timestamp(&self.published)?;

        let link = self
            .links
            .iter()
            .filter(|link| link.is_pdf())
            .map(|link| link.href.trim())
            .find(|href| !href.is_empty())
            .unwrap_or_else(|| self.id.trim())
            .to_string();

        let categories: Vec<String> = self
            .categories
            .into_iter()
            .map(|category| category.term)
            .filter(|term| !term.is_empty())
            .collect();
        let primary_category = self
            .primary_category
            .map(|category| category.term)
            .filter(|term| !term.is_empty())
            .or_else(|| categories.first().cloned())
            .unwrap_or_default();

        let authors = self
            .authors
            .into_iter()
            .map(|author| author.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        Some(Record {
            id,
            source: source.to_string(),
            title: normalize_newlines(&self.title),
            abstract_text: normalize_newlines(&self.summary),
            authors,
            primary_category,
            categories,
            published,
            link,
        })
    }
}

/// Parse an arXiv Atom response.
fn parse_feed(xml: &str) -> Result<AtomFeed> {
    Ok(from_str::<AtomFeed>(xml)?)
}
