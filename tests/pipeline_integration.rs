//! End-to-end runs of the pipeline against a mock catalog, detail and image host.

use std::fs;

use bookshelf_core::{Pipeline, RunSummary};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::{catalog_item, crawl_config, detail, page, read_dataset};

async fn mount_single_book(server: &MockServer, image: ResponseTemplate) {
    let uri = server.uri();
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![catalog_item("b1", "T", &format!("{uri}/b1"))])),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(detail("b1", None, Some(&format!("{uri}/b1.jpg")))),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b1.jpg"))
        .respond_with(image)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_archives_new_book() {
    let server = MockServer::start().await;
    mount_single_book(&server, ResponseTemplate::new(200).set_body_bytes(b"IMG".to_vec())).await;

    let dir = TempDir::new().unwrap();
    let config = crawl_config(&dir, &format!("{}/volumes", server.uri()), &["romance"], |_| {});
    let dataset = config.output_csv.clone();
    let image = config.images_dir.join("b1.jpg");

    let summary = Pipeline::new(config).run().await.unwrap();

    let uri = server.uri();
    assert_eq!(read_dataset(&dataset), format!("b1,T,A,C,{uri}/b1,{uri}/b1.jpg\n"));
    assert_eq!(fs::read(&image).unwrap(), b"IMG");
    assert_eq!(
        summary,
        RunSummary {
            loaded: 0,
            failed_pages: 0,
            discovered: 1,
            catalog_size: 1,
            enriched: 1,
            archived: 1,
            failed_archives: 0,
        }
    );
}

#[tokio::test]
async fn test_second_run_adds_nothing() {
    let server = MockServer::start().await;
    mount_single_book(&server, ResponseTemplate::new(200).set_body_bytes(b"IMG".to_vec())).await;

    let dir = TempDir::new().unwrap();
    let config = crawl_config(&dir, &format!("{}/volumes", server.uri()), &["romance"], |_| {});
    let dataset = config.output_csv.clone();

    Pipeline::new(config.clone()).run().await.unwrap();
    let after_first = read_dataset(&dataset);

    let summary = Pipeline::new(config).run().await.unwrap();

    assert_eq!(read_dataset(&dataset), after_first);
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.discovered, 0);
    assert_eq!(summary.enriched, 0);
    assert_eq!(summary.archived, 0);
}

#[tokio::test]
async fn test_known_book_is_not_looked_up_again() {
    let server = MockServer::start().await;
    let uri = server.uri();
    Mock::given(path("/volumes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![catalog_item("b1", "T", &format!("{uri}/b1"))])),
        )
        .mount(&server)
        .await;
    Mock::given(path("/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail("b1", Some("http://x"), None)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = crawl_config(&dir, &format!("{uri}/volumes"), &["romance"], |_| {});
    let existing = format!("b1,Old,A,C,{uri}/b1,{uri}/b1.jpg\n");
    fs::write(&config.output_csv, &existing).unwrap();
    let dataset = config.output_csv.clone();

    let summary = Pipeline::new(config).run().await.unwrap();

    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.catalog_size, 1);
    assert_eq!(read_dataset(&dataset), existing);
}

#[tokio::test]
async fn test_failed_image_leaves_dataset_untouched() {
    let server = MockServer::start().await;
    mount_single_book(&server, ResponseTemplate::new(404)).await;

    let dir = TempDir::new().unwrap();
    let config = crawl_config(&dir, &format!("{}/volumes", server.uri()), &["romance"], |_| {});
    let dataset = config.output_csv.clone();
    let image = config.images_dir.join("b1.jpg");

    let summary = Pipeline::new(config).run().await.unwrap();

    assert!(!dataset.exists());
    assert!(!image.exists());
    assert_eq!(summary.enriched, 1);
    assert_eq!(summary.archived, 0);
    assert_eq!(summary.failed_archives, 1);
}

#[tokio::test]
async fn test_failed_catalog_still_completes() {
    let server = MockServer::start().await;
    Mock::given(path("/volumes"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = crawl_config(&dir, &format!("{}/volumes", server.uri()), &["a", "b"], |file| {
        file.max_pages_per_tag = Some(2);
    });
    let dataset = config.output_csv.clone();

    let summary = Pipeline::new(config).run().await.unwrap();

    assert_eq!(summary.failed_pages, 4);
    assert_eq!(summary.catalog_size, 0);
    assert!(!dataset.exists());
}

#[tokio::test]
async fn test_malformed_dataset_lines_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(path("/volumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = crawl_config(&dir, &format!("{}/volumes", server.uri()), &["x"], |_| {});
    fs::write(
        &config.output_csv,
        "b1,T,A,C,http://x/b1,http://x/b1.jpg\n\nshort,row\nb2,U,,,,\n",
    )
    .unwrap();

    let summary = Pipeline::new(config).run().await.unwrap();
    assert_eq!(summary.loaded, 2);
}
