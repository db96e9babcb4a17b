//! Enrichment phase: resolve a cover URL for each record via its detail link.
//!
//! Every record that has a detail link but no cover URL yet gets one gated
//! GET. The detail document's `medium` image link wins over `thumbnail`.
//! Records already carrying a cover (archived by an earlier run) are not
//! looked up again. Records without a detail link, without image links, or
//! whose lookup fails stay in the [`RecordSet`] but are left out of the
//! returned [`EnrichedSet`].

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::catalog::api::Volume;
use crate::http::{FetchError, Session};
use crate::record::{EnrichedSet, Record, RecordSet};

/// Resolves cover URLs from detail documents.
#[derive(Debug, Clone)]
pub struct ThumbnailEnricher {
    session: Session,
}

impl ThumbnailEnricher {
    /// Creates an enricher issuing requests through `session`.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Looks up covers for every record with a detail link and no cover yet.
    ///
    /// On success the record's cover URL is set in `records` and the updated
    /// record joins the result. Result order follows `records` insertion
    /// order. An empty input returns immediately without any request.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn enrich(&self, records: &Arc<RecordSet>) -> EnrichedSet {
        if records.is_empty() {
            debug!("no records to enrich");
            return EnrichedSet::default();
        }

        let candidates: Vec<Record> = records
            .snapshot()
            .into_iter()
            .filter(|record| record.detail_link().is_some() && record.cover_url().is_none())
            .collect();
        info!(
            candidates = candidates.len(),
            skipped = records.len().saturating_sub(candidates.len()),
            "resolving cover images"
        );

        let mut handles = Vec::with_capacity(candidates.len());
        for record in candidates {
            let session = self.session.clone();
            let records = Arc::clone(records);
            handles.push(tokio::spawn(async move {
                match lookup_cover(&session, &record).await {
                    Ok(Some(cover_url)) => records.set_cover_url(&record.id, cover_url),
                    Ok(None) => {
                        debug!(id = %record.id, "detail has no image links");
                        None
                    }
                    Err(e) => {
                        warn!(id = %record.id, kind = e.kind(), error = %e, "cover lookup failed");
                        None
                    }
                }
            }));
        }

        let mut resolved = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(record)) => resolved.push(record),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "cover lookup task panicked"),
            }
        }

        let enriched = EnrichedSet::from_records(resolved);
        info!(resolved = enriched.len(), "cover lookup complete");
        enriched
    }
}

/// Fetches the detail document and picks its cover URL.
async fn lookup_cover(session: &Session, record: &Record) -> Result<Option<String>, FetchError> {
    let Some(link) = record.detail_link() else {
        return Ok(None);
    };
    let detail: Volume = session.get_json(link).await?;
    Ok(detail.cover_url().map(str::to_string))
}
