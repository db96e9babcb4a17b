//! Catalog records and the two collections a run builds from them.
//!
//! - [`RecordSet`] holds every known record, keyed by id. It is shared across
//!   the catalog and enrichment tasks of a run and tolerates concurrent
//!   insert-if-absent and per-record field updates.
//! - [`EnrichedSet`] is the immutable subset of records that gained a cover
//!   URL during enrichment.

mod set;

pub use set::{EnrichedSet, RecordSet};

/// Title given to catalog items that carry none.
pub const UNTITLED: &str = "Untitled";

/// One catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// Stable catalog id; never empty once inside a [`RecordSet`].
    pub id: String,
    /// Display title.
    pub title: String,
    /// Authors in catalog order.
    pub authors: Vec<String>,
    /// Categories in catalog order.
    pub categories: Vec<String>,
    /// URL of the per-item detail document.
    pub detail_link: Option<String>,
    /// Cover image URL, set by enrichment.
    pub cover_url: Option<String>,
}

impl Record {
    /// Creates a record with the given id and title and no other data.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Detail link, if present and non-empty.
    #[must_use]
    pub fn detail_link(&self) -> Option<&str> {
        self.detail_link.as_deref().filter(|link| !link.is_empty())
    }

    /// Cover URL, if present and non-empty.
    #[must_use]
    pub fn cover_url(&self) -> Option<&str> {
        self.cover_url.as_deref().filter(|url| !url.is_empty())
    }
}
