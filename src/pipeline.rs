//! Run orchestration: load, fetch, enrich, archive.
//!
//! The phases run strictly one after another; inside a phase every unit of
//! work runs concurrently under the session gate. One [`Session`] serves the
//! whole run and is closed when the run ends, whether it succeeded or not.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use bookshelf_core::{CrawlConfig, Pipeline};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CrawlConfig::load(Path::new("config.json"))?;
//! config.ensure_dirs()?;
//! let summary = Pipeline::new(config).run().await?;
//! println!("archived {} new books", summary.archived);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::archive::ImageArchiver;
use crate::catalog::CatalogFetcher;
use crate::config::CrawlConfig;
use crate::enrich::ThumbnailEnricher;
use crate::http::{FetchError, Session};
use crate::store::{RecordStore, StoreError};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The HTTP session could not be created.
    #[error("failed to start HTTP session: {0}")]
    Session(#[from] FetchError),

    /// The existing dataset could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking dataset load task did not complete.
    #[error("dataset load task failed: {0}")]
    LoadTask(#[from] tokio::task::JoinError),
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records loaded from the dataset.
    pub loaded: usize,
    /// Catalog pages that failed.
    pub failed_pages: usize,
    /// Records discovered by the catalog phase.
    pub discovered: usize,
    /// Records known after the catalog phase.
    pub catalog_size: usize,
    /// Records that resolved a cover URL.
    pub enriched: usize,
    /// Images written and rows appended.
    pub archived: usize,
    /// Image downloads that failed.
    pub failed_archives: usize,
}

/// Sequences the phases of one crawl run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: CrawlConfig,
}

impl Pipeline {
    /// Creates a pipeline for `config`. Directories must already exist.
    #[must_use]
    pub fn new(config: CrawlConfig) -> Self {
        Self { config }
    }

    /// The configuration this pipeline runs with.
    #[must_use]
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs every phase once.
    ///
    /// Per-request failures are logged and absorbed by the phase that hit
    /// them; they never fail the run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the session cannot be built or the
    /// existing dataset cannot be read.
    #[instrument(skip(self), fields(tags = self.config.tags.len()))]
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let session = Session::new(&self.config.session_settings())?;
        let result = self.run_phases(&session).await;
        session.close();
        result
    }

    async fn run_phases(&self, session: &Session) -> Result<RunSummary, PipelineError> {
        let store = RecordStore::new(&self.config.output_csv);
        let loader = store.clone();
        let records = Arc::new(tokio::task::spawn_blocking(move || loader.load()).await??);
        let mut summary = RunSummary {
            loaded: records.len(),
            ..RunSummary::default()
        };
        info!(loaded = summary.loaded, "loaded existing books from dataset");

        let fetcher = CatalogFetcher::new(session.clone(), &self.config.api_key)
            .with_base_url(&self.config.catalog_base_url)
            .with_lang_restrict(&self.config.lang_restrict);
        let catalog = fetcher
            .fetch_catalog(&records, &self.config.catalog_query())
            .await;
        summary.failed_pages = catalog.failed_endpoints;
        summary.discovered = catalog.inserted;
        summary.catalog_size = records.len();
        info!(
            discovered = summary.discovered,
            total = summary.catalog_size,
            "fetched books from catalog"
        );

        let enriched = ThumbnailEnricher::new(session.clone())
            .enrich(&records)
            .await;
        summary.enriched = enriched.len();
        info!(enriched = summary.enriched, "fetched book thumbnails");

        let archive = ImageArchiver::new(session.clone(), &self.config.images_dir, store)
            .archive(&enriched)
            .await;
        summary.archived = archive.rows_written;
        summary.failed_archives = archive.failed;

        info!(
            loaded = summary.loaded,
            discovered = summary.discovered,
            enriched = summary.enriched,
            archived = summary.archived,
            failed_pages = summary.failed_pages,
            failed_archives = summary.failed_archives,
            "run complete"
        );
        Ok(summary)
    }
}
