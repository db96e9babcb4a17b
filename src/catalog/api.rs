//! Response shapes of the volumes API.
//!
//! Only the fields the crawler reads are modeled; everything else is ignored.
//! Search pages carry items as raw JSON so one oddly shaped item does not
//! spoil the rest of its page.

use serde::Deserialize;

use crate::record::{Record, UNTITLED};

/// One search results page. `items` is absent when a query has no results.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct VolumesPage {
    #[serde(default)]
    pub items: Option<Vec<serde_json::Value>>,
}

/// A single volume, as found in search results and detail documents.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Volume {
    pub id: Option<String>,
    pub volume_info: Option<VolumeInfo>,
    pub self_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImageLinks {
    pub medium: Option<String>,
    pub thumbnail: Option<String>,
}

impl Volume {
    /// Converts a search result into a record. Items without an id yield `None`.
    pub fn into_record(self) -> Option<Record> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let info = self.volume_info.unwrap_or_default();
        Some(Record {
            id,
            title: info
                .title
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            authors: info.authors.unwrap_or_default(),
            categories: info.categories.unwrap_or_default(),
            detail_link: self.self_link.filter(|link| !link.is_empty()),
            cover_url: None,
        })
    }

    /// Preferred cover URL of a detail document: `medium`, else `thumbnail`.
    pub fn cover_url(&self) -> Option<&str> {
        let links = self.volume_info.as_ref()?.image_links.as_ref()?;
        links
            .medium
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| links.thumbnail.as_deref().filter(|url| !url.is_empty()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn volume(value: serde_json::Value) -> Volume {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_into_record_reads_all_fields() {
        let record = volume(json!({
            "id": "b1",
            "volumeInfo": {"title": "T", "authors": ["A"], "categories": ["C"]},
            "selfLink": "http://x/b1"
        }))
        .into_record()
        .unwrap();

        assert_eq!(record.id, "b1");
        assert_eq!(record.title, "T");
        assert_eq!(record.authors, vec!["A"]);
        assert_eq!(record.categories, vec!["C"]);
        assert_eq!(record.detail_link.as_deref(), Some("http://x/b1"));
        assert_eq!(record.cover_url, None);
    }

    #[test]
    fn test_into_record_defaults_missing_title() {
        let record = volume(json!({"id": "b1"})).into_record().unwrap();
        assert_eq!(record.title, UNTITLED);
        assert!(record.authors.is_empty());
        assert_eq!(record.detail_link, None);

        let record = volume(json!({"id": "b2", "volumeInfo": {"title": ""}}))
            .into_record()
            .unwrap();
        assert_eq!(record.title, UNTITLED);
    }

    #[test]
    fn test_into_record_discards_missing_or_empty_id() {
        assert!(volume(json!({"volumeInfo": {"title": "T"}})).into_record().is_none());
        assert!(volume(json!({"id": ""})).into_record().is_none());
    }

    #[test]
    fn test_cover_url_prefers_medium() {
        let detail = volume(json!({
            "volumeInfo": {"imageLinks": {"thumbnail": "http://x/t.jpg", "medium": "http://x/m.jpg"}}
        }));
        assert_eq!(detail.cover_url(), Some("http://x/m.jpg"));
    }

    #[test]
    fn test_cover_url_falls_back_to_thumbnail() {
        let detail = volume(json!({
            "volumeInfo": {"imageLinks": {"thumbnail": "http://x/t.jpg"}}
        }));
        assert_eq!(detail.cover_url(), Some("http://x/t.jpg"));

        let detail = volume(json!({
            "volumeInfo": {"imageLinks": {"medium": "", "thumbnail": "http://x/t.jpg"}}
        }));
        assert_eq!(detail.cover_url(), Some("http://x/t.jpg"));
    }

    #[test]
    fn test_cover_url_absent() {
        assert_eq!(volume(json!({})).cover_url(), None);
        assert_eq!(volume(json!({"volumeInfo": {}})).cover_url(), None);
        assert_eq!(
            volume(json!({"volumeInfo": {"imageLinks": {"smallThumbnail": "http://x/s.jpg"}}}))
                .cover_url(),
            None
        );
    }

    #[test]
    fn test_page_without_items() {
        let page: VolumesPage = serde_json::from_value(json!({"totalItems": 0})).unwrap();
        assert!(page.items.is_none());
    }
}
