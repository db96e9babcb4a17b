//! Shared fixtures for integration tests: catalog JSON builders, an
//! overlap-tracking responder and config construction.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bookshelf_core::config::FileConfig;
use bookshelf_core::{CrawlConfig, Session, SessionSettings};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::{Respond, ResponseTemplate};

/// API key used by every test config.
pub const TEST_API_KEY: &str = "test-key";

/// A catalog item carrying a full `volumeInfo` and a `selfLink`.
pub fn catalog_item(id: &str, title: &str, self_link: &str) -> Value {
    json!({
        "id": id,
        "selfLink": self_link,
        "volumeInfo": {
            "title": title,
            "authors": ["A"],
            "categories": ["C"]
        }
    })
}

/// A search page body holding `items`.
pub fn page(items: Vec<Value>) -> Value {
    json!({ "kind": "books#volumes", "items": items })
}

/// A detail document with the given image links.
pub fn detail(id: &str, medium: Option<&str>, thumbnail: Option<&str>) -> Value {
    let mut links = serde_json::Map::new();
    if let Some(medium) = medium {
        links.insert("medium".into(), json!(medium));
    }
    if let Some(thumbnail) = thumbnail {
        links.insert("thumbnail".into(), json!(thumbnail));
    }
    json!({ "id": id, "volumeInfo": { "title": "T", "imageLinks": links } })
}

/// Session with test-friendly timeouts.
pub fn session(max_concurrent_requests: usize) -> Session {
    Session::new(&SessionSettings {
        max_concurrent_requests,
        max_connections_per_host: max_concurrent_requests,
        request_timeout: Duration::from_secs(10),
    })
    .unwrap()
}

/// Builds a config rooted in `dir` pointing the catalog at `base_url`, with
/// directories created.
pub fn crawl_config(dir: &TempDir, base_url: &str, tags: &[&str], adjust: impl FnOnce(&mut FileConfig)) -> CrawlConfig {
    let tags_file = dir.path().join("tags.txt");
    fs::write(&tags_file, tags.join("\n")).unwrap();

    let mut file = FileConfig {
        max_pages_per_tag: Some(1),
        results_per_page: Some(1),
        request_timeout: Some(10),
        data_dir: Some(dir.path().join("data")),
        tags_file: Some(tags_file),
        catalog_base_url: Some(base_url.to_string()),
        ..FileConfig::default()
    };
    adjust(&mut file);

    let config = CrawlConfig::from_file_config(file, Some(TEST_API_KEY.to_string())).unwrap();
    config.ensure_dirs().unwrap();
    config
}

/// Reads the dataset, returning an empty string when it does not exist.
pub fn read_dataset(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Responder that records when each request arrives and answers after an
/// async delay.
///
/// The mock server keeps serving other connections while a response is
/// delayed, so overlapping requests really overlap. A request can only start
/// once an earlier one has released its gate permit, which happens after
/// that earlier response arrived, so two requests overlap exactly when their
/// arrivals are less than `delay` apart.
pub struct OverlapTrackingResponder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
    delay: Duration,
    body: Value,
}

impl OverlapTrackingResponder {
    pub fn new(arrivals: Arc<Mutex<Vec<Instant>>>, delay: Duration, body: Value) -> Self {
        Self {
            arrivals,
            delay,
            body,
        }
    }
}

impl Respond for OverlapTrackingResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200)
            .set_body_json(self.body.clone())
            .set_delay(self.delay)
    }
}

/// Largest number of requests in flight at once, given arrival times and a
/// fixed response delay.
pub fn peak_overlap(arrivals: &[Instant], delay: Duration) -> usize {
    let mut sorted = arrivals.to_vec();
    sorted.sort();
    (0..sorted.len())
        .map(|i| {
            sorted[..=i]
                .iter()
                .filter(|earlier| sorted[i].duration_since(**earlier) < delay)
                .count()
        })
        .max()
        .unwrap_or(0)
}
