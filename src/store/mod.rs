//! Flat dataset file: load existing records, append archived ones.
//!
//! The dataset is append-only across runs. [`RecordStore::load`] tolerates
//! blank and malformed lines by skipping them; [`RecordStore::append`] writes
//! a whole batch of rows with a single write call.

pub mod row;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::record::RecordSet;

/// Errors reading or appending to the dataset file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening or writing the dataset failed.
    #[error("IO error on dataset {path}: {source}")]
    Io {
        /// Dataset path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the dataset failed below the row level.
    #[error("failed to read dataset {path}: {source}")]
    Read {
        /// Dataset path.
        path: PathBuf,
        /// The underlying reader error.
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn read(path: &Path, source: csv::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Handle on the dataset file.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Creates a store for the dataset at `path`. Nothing is opened yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Dataset path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every well-formed row into a fresh [`RecordSet`].
    ///
    /// A missing file yields an empty set. Rows with fewer than six fields,
    /// an empty id, or undecodable text are skipped. When an id repeats, the
    /// first row wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be opened or read.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<RecordSet, StoreError> {
        let records = RecordSet::new();
        if !self.path.exists() {
            debug!("dataset not found, starting empty");
            return Ok(records);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_path(&self.path)
            .map_err(|e| StoreError::read(&self.path, e))?;

        let mut skipped = 0usize;
        for result in reader.records() {
            let row = match result {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(StoreError::read(&self.path, e)),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable dataset line");
                    skipped += 1;
                    continue;
                }
            };
            match row::decode(&row) {
                Some(record) => {
                    records.insert_if_absent(record);
                }
                None => {
                    debug!(
                        line = row.position().map(csv::Position::line),
                        fields = row.len(),
                        "skipping malformed dataset line"
                    );
                    skipped += 1;
                }
            }
        }

        info!(loaded = records.len(), skipped, "dataset loaded");
        Ok(records)
    }

    /// Appends `rows` to the dataset with one write.
    ///
    /// Rows missing a trailing newline get one. An empty batch is a no-op
    /// and does not create the file. Callers must not run two appends at once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be opened or written.
    #[instrument(skip(self, rows), fields(path = %self.path.display(), rows = rows.len()))]
    pub async fn append(&self, rows: &[String]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut buffer = String::with_capacity(rows.iter().map(|row| row.len() + 1).sum());
        for row in rows {
            buffer.push_str(row);
            if !row.ends_with('\n') {
                buffer.push('\n');
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        debug!("rows appended");
        Ok(())
    }
}
