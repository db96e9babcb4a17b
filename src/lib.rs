//! Bookshelf Core Library
//!
//! Incrementally crawls a paginated book catalog API, merges new records
//! into a local dataset, resolves a cover image for each new record and
//! archives the image next to a flat dataset row.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`record`] - Records, the shared record set and the enriched subset
//! - [`http`] - Session, request gate and per-request errors
//! - [`catalog`] - Concurrent search page fetching and merging
//! - [`enrich`] - Cover URL lookup via detail documents
//! - [`archive`] - Image download and dataset row persistence
//! - [`store`] - Dataset file load/append and row format
//! - [`config`] - JSON settings, tags file and API key
//! - [`pipeline`] - Phase orchestration for one run

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod catalog;
pub mod config;
pub mod enrich;
pub mod http;
pub mod pipeline;
pub mod record;
pub mod store;
mod user_agent;

// Re-export commonly used types
pub use archive::{ArchiveStats, ImageArchiver};
pub use catalog::{CatalogFetcher, CatalogQuery, CatalogStats};
pub use config::{ConfigError, CrawlConfig};
pub use enrich::ThumbnailEnricher;
pub use http::{FetchError, RequestGate, Session, SessionSettings};
pub use pipeline::{Pipeline, PipelineError, RunSummary};
pub use record::{EnrichedSet, Record, RecordSet};
pub use store::{RecordStore, StoreError};
