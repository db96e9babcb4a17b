//! Run configuration: JSON settings file, tags file and API key.
//!
//! Everything here is read once at startup. Any problem is a fatal
//! [`ConfigError`], since no useful crawl is possible without it.
//!
//! ```json
//! {
//!   "max_concurrent_requests": 5,
//!   "max_pages_per_tag": 5,
//!   "results_per_page": 40,
//!   "request_timeout": 30,
//!   "data_dir": "data",
//!   "tags_file": "tags.txt"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{CatalogQuery, DEFAULT_BASE_URL, DEFAULT_LANG_RESTRICT};
use crate::http::{
    DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_CONCURRENCY,
    MIN_CONCURRENCY, SessionSettings,
};

/// Environment variable holding the catalog API key. Takes precedence over the file.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Default pages requested per tag.
pub const DEFAULT_MAX_PAGES_PER_TAG: u32 = 5;

/// Default and maximum page size accepted by the volumes API.
pub const MAX_RESULTS_PER_PAGE: u32 = 40;

const DEFAULT_DATA_DIR: &str = "data";
const IMAGES_SUBDIR: &str = "images";
const DATASET_FILE: &str = "books.csv";

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Settings file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON of the expected shape.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Settings file path.
        path: PathBuf,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// No API key in the environment or the settings file.
    #[error("missing API key: set {API_KEY_ENV} or `api_key` in the config file")]
    MissingApiKey,

    /// `tags_file` is not set.
    #[error("missing `tags_file` in config")]
    MissingTagsFile,

    /// The tags file could not be read.
    #[error("failed to read tags file {path}: {source}")]
    Tags {
        /// Tags file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A numeric setting is out of range.
    #[error("invalid config value for `{field}`: {value}. Expected range: {expected}")]
    Invalid {
        /// Setting name.
        field: &'static str,
        /// Offending value.
        value: u64,
        /// Human-readable accepted range.
        expected: &'static str,
    },

    /// A data directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Settings file contents, before defaults and validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Cap on simultaneous requests.
    pub max_concurrent_requests: Option<u64>,
    /// Cap on simultaneous requests per host.
    pub max_connections_per_host: Option<u64>,
    /// Pages requested per tag.
    pub max_pages_per_tag: Option<u64>,
    /// Items per page.
    pub results_per_page: Option<u64>,
    /// Per-request timeout in seconds.
    pub request_timeout: Option<u64>,
    /// Root data directory.
    pub data_dir: Option<PathBuf>,
    /// Image directory (defaults under `data_dir`).
    pub images_dir: Option<PathBuf>,
    /// Dataset file (defaults under `data_dir`).
    pub output_csv: Option<PathBuf>,
    /// File listing one search tag per line.
    pub tags_file: Option<PathBuf>,
    /// Search endpoint override.
    pub catalog_base_url: Option<String>,
    /// Language restriction; empty disables it.
    pub lang_restrict: Option<String>,
    /// API key fallback when the environment has none.
    pub api_key: Option<String>,
}

impl FileConfig {
    /// Parses settings from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON.
    pub fn from_json(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Catalog API key.
    pub api_key: String,
    /// Search tags.
    pub tags: Vec<String>,
    /// Cap on simultaneous requests.
    pub max_concurrent_requests: usize,
    /// Cap on simultaneous requests per host.
    pub max_connections_per_host: usize,
    /// Pages requested per tag.
    pub max_pages_per_tag: u32,
    /// Items per page.
    pub results_per_page: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Root data directory.
    pub data_dir: PathBuf,
    /// Image directory.
    pub images_dir: PathBuf,
    /// Dataset file.
    pub output_csv: PathBuf,
    /// Search endpoint.
    pub catalog_base_url: String,
    /// Language restriction; empty disables it.
    pub lang_restrict: String,
}

impl CrawlConfig {
    /// Loads settings from `path`, tags from the configured tags file, and the
    /// API key from [`API_KEY_ENV`] (falling back to the file).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any input is missing, unreadable or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::load_with_api_key(path, env_key)
    }

    /// Like [`load`](Self::load) with an explicit key in place of the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any input is missing, unreadable or invalid.
    pub fn load_with_api_key(path: &Path, api_key: Option<String>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file = FileConfig::from_json(&raw, path)?;
        debug!(path = %path.display(), "config file parsed");
        Self::from_file_config(file, api_key)
    }

    /// Applies defaults, reads the tags file and validates ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any input is missing, unreadable or invalid.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_file_config(file: FileConfig, api_key: Option<String>) -> Result<Self, ConfigError> {
        let api_key = [api_key, file.api_key]
            .into_iter()
            .flatten()
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let tags_file = file.tags_file.ok_or(ConfigError::MissingTagsFile)?;
        let tags = load_tags(&tags_file)?;
        if tags.is_empty() {
            warn!(path = %tags_file.display(), "tags file has no tags; nothing will be fetched");
        }

        let max_concurrent_requests = ranged(
            "max_concurrent_requests",
            file.max_concurrent_requests,
            DEFAULT_MAX_CONCURRENT_REQUESTS as u64,
            MIN_CONCURRENCY as u64..=MAX_CONCURRENCY as u64,
            "1..=100",
        )?;
        let max_connections_per_host = ranged(
            "max_connections_per_host",
            file.max_connections_per_host,
            max_concurrent_requests,
            MIN_CONCURRENCY as u64..=MAX_CONCURRENCY as u64,
            "1..=100",
        )?;
        let max_pages_per_tag = ranged(
            "max_pages_per_tag",
            file.max_pages_per_tag,
            u64::from(DEFAULT_MAX_PAGES_PER_TAG),
            1..=u64::from(u32::MAX),
            ">= 1",
        )?;
        let results_per_page = ranged(
            "results_per_page",
            file.results_per_page,
            u64::from(MAX_RESULTS_PER_PAGE),
            1..=u64::from(MAX_RESULTS_PER_PAGE),
            "1..=40",
        )?;
        let request_timeout = ranged(
            "request_timeout",
            file.request_timeout,
            DEFAULT_REQUEST_TIMEOUT_SECS,
            1..=3600,
            "1..=3600",
        )?;

        let data_dir = file
            .data_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let images_dir = file
            .images_dir
            .unwrap_or_else(|| data_dir.join(IMAGES_SUBDIR));
        let output_csv = file
            .output_csv
            .unwrap_or_else(|| data_dir.join(DATASET_FILE));

        Ok(Self {
            api_key,
            tags,
            max_concurrent_requests: max_concurrent_requests as usize,
            max_connections_per_host: max_connections_per_host as usize,
            max_pages_per_tag: max_pages_per_tag as u32,
            results_per_page: results_per_page as u32,
            request_timeout: Duration::from_secs(request_timeout),
            data_dir,
            images_dir,
            output_csv,
            catalog_base_url: file
                .catalog_base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            lang_restrict: file
                .lang_restrict
                .unwrap_or_else(|| DEFAULT_LANG_RESTRICT.to_string()),
        })
    }

    /// HTTP session settings derived from this config.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_concurrent_requests: self.max_concurrent_requests,
            max_connections_per_host: self.max_connections_per_host,
            request_timeout: self.request_timeout,
        }
    }

    /// Catalog query derived from this config.
    #[must_use]
    pub fn catalog_query(&self) -> CatalogQuery {
        CatalogQuery::new(
            self.tags.clone(),
            self.max_pages_per_tag,
            self.results_per_page,
        )
    }

    /// Creates the data directory, image directory and dataset parent if absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CreateDir`] if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        let mut dirs = vec![self.data_dir.as_path(), self.images_dir.as_path()];
        if let Some(parent) = self.output_csv.parent()
            && !parent.as_os_str().is_empty()
        {
            dirs.push(parent);
        }
        for dir in dirs {
            fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Reads search tags, one per line, trimmed, blank lines dropped.
///
/// # Errors
///
/// Returns [`ConfigError::Tags`] if the file cannot be read.
pub fn load_tags(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Tags {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn ranged(
    field: &'static str,
    value: Option<u64>,
    default: u64,
    range: std::ops::RangeInclusive<u64>,
    expected: &'static str,
) -> Result<u64, ConfigError> {
    let value = value.unwrap_or(default);
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            field,
            value,
            expected,
        })
    }
}
