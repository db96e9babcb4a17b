//! Archive phase: download cover images and persist rows for the successes.
//!
//! Each enriched record's cover is downloaded concurrently through the
//! session gate into `<images_dir>/<id>.jpg`, with the id percent-encoded.
//! Rows for the records whose image was written are gathered in completion
//! order and appended to the dataset in one write once every download has
//! finished or failed.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tracing::{debug, info, instrument, warn};

use crate::http::Session;
use crate::record::EnrichedSet;
use crate::store::{RecordStore, row};

/// Extension used for every archived image, whatever the served content type.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Outcome counters of one archive phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Downloads started.
    pub attempted: usize,
    /// Images written to disk.
    pub archived: usize,
    /// Downloads or writes that failed.
    pub failed: usize,
    /// Records passed in without a cover URL.
    pub skipped: usize,
    /// Rows appended to the dataset.
    pub rows_written: usize,
}

/// Downloads cover images and appends dataset rows.
#[derive(Debug, Clone)]
pub struct ImageArchiver {
    session: Session,
    images_dir: PathBuf,
    store: RecordStore,
}

impl ImageArchiver {
    /// Creates an archiver writing images under `images_dir` and rows to `store`.
    #[must_use]
    pub fn new(session: Session, images_dir: impl Into<PathBuf>, store: RecordStore) -> Self {
        Self {
            session,
            images_dir: images_dir.into(),
            store,
        }
    }

    /// Where the image for `id` is written.
    #[must_use]
    pub fn image_path(&self, id: &str) -> PathBuf {
        image_path(&self.images_dir, id)
    }

    /// Downloads every cover in `enriched` and appends one row per image written.
    ///
    /// Failures are logged per record and never affect other records. The
    /// dataset is touched at most once per call, and not at all when no image
    /// was written.
    #[instrument(skip(self, enriched), fields(records = enriched.len()))]
    pub async fn archive(&self, enriched: &EnrichedSet) -> ArchiveStats {
        let mut stats = ArchiveStats::default();
        let mut pending = FuturesUnordered::new();

        for record in enriched {
            let Some(cover_url) = record.cover_url().map(str::to_string) else {
                debug!(id = %record.id, "skipping record without cover URL");
                stats.skipped += 1;
                continue;
            };

            let session = self.session.clone();
            let path = self.image_path(&record.id);
            let record = record.clone();
            stats.attempted += 1;
            pending.push(tokio::spawn(async move {
                match session.download_to_file(&cover_url, &path).await {
                    Ok(bytes) => {
                        debug!(id = %record.id, bytes, path = %path.display(), "image archived");
                        Some(row::encode(&record))
                    }
                    Err(e) => {
                        warn!(id = %record.id, kind = e.kind(), error = %e, "image download failed");
                        None
                    }
                }
            }));
        }

        let mut rows = Vec::with_capacity(stats.attempted);
        while let Some(joined) = pending.next().await {
            match joined {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => stats.failed += 1,
                Err(e) => {
                    warn!(error = %e, "image task panicked");
                    stats.failed += 1;
                }
            }
        }
        stats.archived = rows.len();

        match self.store.append(&rows).await {
            Ok(()) => stats.rows_written = rows.len(),
            Err(e) => warn!(error = %e, rows = rows.len(), "failed to append dataset rows"),
        }

        info!(
            archived = stats.archived,
            failed = stats.failed,
            skipped = stats.skipped,
            rows_written = stats.rows_written,
            "archive complete"
        );
        stats
    }
}

fn image_path(images_dir: &Path, id: &str) -> PathBuf {
    images_dir.join(format!("{}.{IMAGE_EXTENSION}", file_stem(id)))
}

/// Percent-encodes every byte outside `[A-Za-z0-9._~-]`, so distinct ids
/// always get distinct names and no id can contain a path separator.
fn file_stem(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}
