//! Catalog phase: turn (tag, page) queries into newly discovered records.
//!
//! [`CatalogFetcher::fetch_catalog`] builds every endpoint up front, fetches
//! them all concurrently through the session gate, and merges each page's
//! items into the shared [`RecordSet`] with insert-if-absent. A failed page
//! contributes nothing and never stops its siblings.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bookshelf_core::catalog::{CatalogFetcher, CatalogQuery};
//! use bookshelf_core::http::{Session, SessionSettings};
//! use bookshelf_core::record::RecordSet;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(&SessionSettings::default())?;
//! let fetcher = CatalogFetcher::new(session, "api-key");
//! let records = Arc::new(RecordSet::new());
//! let query = CatalogQuery::new(vec!["romance".to_string()], 2, 40);
//! let stats = fetcher.fetch_catalog(&records, &query).await;
//! println!("{} new records from {} pages", stats.inserted, stats.endpoints);
//! # Ok(())
//! # }
//! ```

pub(crate) mod api;

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::http::{FetchError, Session};
use crate::record::RecordSet;
use api::{Volume, VolumesPage};

/// Default volumes search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// Default language restriction applied to searches.
pub const DEFAULT_LANG_RESTRICT: &str = "pt";

/// Which pages to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Search tags, one query per tag.
    pub tags: Vec<String>,
    /// Pages requested per tag.
    pub max_pages_per_tag: u32,
    /// Items per page; also the page offset step.
    pub results_per_page: u32,
}

impl CatalogQuery {
    /// Creates a query.
    #[must_use]
    pub fn new(tags: Vec<String>, max_pages_per_tag: u32, results_per_page: u32) -> Self {
        Self {
            tags,
            max_pages_per_tag,
            results_per_page,
        }
    }
}

/// One search page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Tag being searched.
    pub tag: String,
    /// Offset of the first item on the page.
    pub start_index: u64,
    /// Full request URL, API key included.
    pub url: String,
}

/// Outcome counters of one catalog phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Pages requested.
    pub endpoints: usize,
    /// Pages that failed (transport, status, parse, or task panic).
    pub failed_endpoints: usize,
    /// Records newly inserted into the set.
    pub inserted: usize,
}

/// Fetches search pages and merges their items into a [`RecordSet`].
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    session: Session,
    base_url: String,
    api_key: String,
    lang_restrict: String,
}

impl CatalogFetcher {
    /// Creates a fetcher against the public volumes endpoint.
    #[must_use]
    pub fn new(session: Session, api_key: impl Into<String>) -> Self {
        Self {
            session,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            lang_restrict: DEFAULT_LANG_RESTRICT.to_string(),
        }
    }

    /// Overrides the search endpoint (used by tests against a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the language restriction. An empty value omits the parameter.
    #[must_use]
    pub fn with_lang_restrict(mut self, lang_restrict: impl Into<String>) -> Self {
        self.lang_restrict = lang_restrict.into();
        self
    }

    /// Lists every page to request: for each non-blank tag, offsets
    /// `0, n, 2n, ...` for `max_pages_per_tag` pages, where `n` is
    /// `results_per_page`.
    #[must_use]
    pub fn endpoints(&self, query: &CatalogQuery) -> Vec<Endpoint> {
        let step = u64::from(query.results_per_page);
        query
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .flat_map(|tag| {
                (0..u64::from(query.max_pages_per_tag)).map(move |page| Endpoint {
                    tag: tag.to_string(),
                    start_index: page * step,
                    url: self.endpoint_url(tag, page * step, query.results_per_page),
                })
            })
            .collect()
    }

    /// Fetches every endpoint of `query` concurrently and inserts unseen
    /// records into `records`.
    ///
    /// Existing entries are never overwritten, whether they came from the
    /// dataset or from a sibling page that finished first.
    #[instrument(skip(self, records, query), fields(tags = query.tags.len()))]
    pub async fn fetch_catalog(&self, records: &Arc<RecordSet>, query: &CatalogQuery) -> CatalogStats {
        let endpoints = self.endpoints(query);
        let mut stats = CatalogStats {
            endpoints: endpoints.len(),
            ..CatalogStats::default()
        };
        if endpoints.is_empty() {
            debug!("no catalog endpoints to fetch");
            return stats;
        }

        info!(endpoints = endpoints.len(), "fetching catalog pages");

        let mut handles = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let session = self.session.clone();
            let records = Arc::clone(records);
            handles.push(tokio::spawn(async move {
                let result = fetch_page(&session, &endpoint.url, &records).await;
                (endpoint, result)
            }));
        }

        for handle in handles {
            match handle.await {
                Ok((endpoint, Ok(inserted))) => {
                    debug!(
                        tag = %endpoint.tag,
                        start_index = endpoint.start_index,
                        inserted,
                        "catalog page merged"
                    );
                    stats.inserted += inserted;
                }
                Ok((endpoint, Err(e))) => {
                    warn!(
                        tag = %endpoint.tag,
                        start_index = endpoint.start_index,
                        kind = e.kind(),
                        error = %redact(&e.to_string(), &self.api_key),
                        "catalog page failed"
                    );
                    stats.failed_endpoints += 1;
                }
                Err(e) => {
                    warn!(error = %e, "catalog task panicked");
                    stats.failed_endpoints += 1;
                }
            }
        }

        info!(
            inserted = stats.inserted,
            failed = stats.failed_endpoints,
            total = records.len(),
            "catalog fetch complete"
        );
        stats
    }

    fn endpoint_url(&self, tag: &str, start_index: u64, results_per_page: u32) -> String {
        let mut url = format!(
            "{}?q={}&startIndex={start_index}&maxResults={results_per_page}&key={}",
            self.base_url,
            urlencoding::encode(tag),
            urlencoding::encode(&self.api_key),
        );
        if !self.lang_restrict.is_empty() {
            url.push_str("&langRestrict=");
            url.push_str(&urlencoding::encode(&self.lang_restrict));
        }
        url
    }
}

/// Fetches one page and merges it, returning how many records were new.
async fn fetch_page(session: &Session, url: &str, records: &RecordSet) -> Result<usize, FetchError> {
    let page: VolumesPage = session.get_json(url).await?;
    let mut inserted = 0;
    for item in page.items.unwrap_or_default() {
        let volume = match serde_json::from_value::<Volume>(item) {
            Ok(volume) => volume,
            Err(e) => {
                debug!(error = %e, "skipping malformed catalog item");
                continue;
            }
        };
        if let Some(record) = volume.into_record()
            && records.insert_if_absent(record)
        {
            inserted += 1;
        }
    }
    Ok(inserted)
}

fn redact(message: &str, secret: &str) -> String {
    if secret.is_empty() {
        return message.to_string();
    }
    message
        .replace(secret, "[REDACTED]")
        .replace(urlencoding::encode(secret).as_ref(), "[REDACTED]")
}
