// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::archive::SUMMARY_FILE;
use crate::client::{HEADER_TOTAL, HEADER_TOTAL_PAGES};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use walkdir::WalkDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    Config {
        backup_dir: dir.path().join("backups"),
        rate_limit_delay: Duration::ZERO,
        ..Config::new(server.uri(), "test_user", "test_password")
    }
}

async fn create_test_backup() -> (WordPressBackup, MockServer, TempDir) {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let backup = WordPressBackup::new(test_config(&server, &dir)).unwrap();
    (backup, server, dir)
}

async fn mount_collection(server: &MockServer, endpoint: &str, items: Vec<Value>) {
    let total = items.len().to_string();
    Mock::given(method("GET"))
        .and(path(format!("/wp-json/wp/v2/{endpoint}")))
        .and(query_param("per_page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(HEADER_TOTAL, total.as_str())
                .insert_header(HEADER_TOTAL_PAGES, total.as_str())
                .set_body_json(items.iter().take(1).collect::<Vec<_>>()),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/wp-json/wp/v2/{endpoint}")))
        .and(query_param("per_page", "20"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

async fn mount_failure(server: &MockServer, endpoint: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/wp-json/wp/v2/{endpoint}")))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

async fn mount_reference_data(server: &MockServer) {
    mount_collection(server, "categories", vec![json!({"id": 1, "name": "News"})]).await;
    mount_collection(server, "tags", vec![json!({"id": 2, "name": "rust"})]).await;
    mount_collection(server, "users", vec![json!({"id": 1, "name": "Author 1"})]).await;
    mount_collection(server, "media", vec![]).await;
}

fn post(id: i64, slug: &str, date: &str) -> Value {
    json!({
        "id": id,
        "date": date,
        "modified": date,
        "slug": slug,
        "title": {"rendered": format!("Post {id}")},
        "content": {"rendered": format!("Content of post {id}")},
        "excerpt": {"rendered": ""},
        "author": 1,
        "status": "publish",
        "categories": [1],
        "tags": [2]
    })
}

fn markdown_files(root: &std::path::Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "md"))
        .map(|entry| entry.into_path())
        .collect()
}

#[tokio::test]
async fn test_save_post_writes_document() {
    let (mut backup, _server, dir) = create_test_backup().await;
    backup.refs.authors = ReferenceMap::from_items("users", vec![json!({"id": 1, "name": "Author 1"})]);

    let post = json!({
        "id": 1,
        "date": "2023-01-01T00:00:00Z",
        "modified": "2023-01-01T00:00:00Z",
        "slug": "test-post",
        "title": {"rendered": "Test Post"},
        "content": {"rendered": "Test content"},
        "excerpt": {"rendered": "Test excerpt"},
        "author": 1,
        "featured_media": 1,
        "status": "publish"
    });

    let path = backup.save_post(&post).await.unwrap();

    assert_eq!(
        path,
        dir.path().join("backups").join("2023").join("01").join("test-post.md")
    );
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("Test Post"));
    assert!(content.contains("Test content"));
    assert!(content.contains("name: Author 1"));
    assert!(content.contains("featured_media: null"));
}

#[tokio::test]
async fn test_unknown_references_become_null_placeholders() {
    let (mut backup, _server, _dir) = create_test_backup().await;
    backup.refs.categories = ReferenceMap::from_items("categories", vec![json!({"id": 1, "name": "News"})]);

    let mut value = post(5, "refs", "2022-12-24T18:00:00");
    value["categories"] = json!([404, 1, 405]);
    value["tags"] = json!([9]);

    let path = backup.save_post(&value).await.unwrap();
    let content = std::fs::read_to_string(path).unwrap();

    assert!(content.contains("categories:\n- null\n- id: 1\n  name: News\n- null\n"));
    assert!(content.contains("tags:\n- null\n"));
}

#[tokio::test]
async fn test_saving_same_post_twice_overwrites() {
    let (backup, _server, dir) = create_test_backup().await;
    let value = post(1, "same", "2023-05-05T05:05:05");

    let first = backup.save_post(&value).await.unwrap();
    let second = backup.save_post(&value).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(markdown_files(dir.path()).len(), 1);
}

#[tokio::test]
async fn test_invalid_post_is_error_without_file() {
    let (backup, _server, dir) = create_test_backup().await;
    let mut value = post(3, "broken", "2023-01-01T00:00:00Z");
    value["date"] = json!("yesterday");

    let err = backup.save_post(&value).await.unwrap_err();

    assert!(matches!(err, Error::InvalidPost { .. }), "got {err:?}");
    assert!(markdown_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_featured_media_download() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = Config {
        download_media: true,
        ..test_config(&server, &dir)
    };
    let mut backup = WordPressBackup::new(config).unwrap();
    backup.refs.media = ReferenceMap::from_items(
        "media",
        vec![json!({"id": 7, "source_url": format!("{}/files/2023/01/photo.jpg", server.uri())})],
    );
    Mock::given(method("GET"))
        .and(path("/files/2023/01/photo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"Test media content".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut value = post(1, "with-media", "2023-01-01T00:00:00Z");
    value["featured_media"] = json!(7);
    let path = backup.save_post(&value).await.unwrap();

    let media_path = dir.path().join("backups").join("media").join("photo.jpg");
    assert_eq!(std::fs::read(media_path).unwrap(), b"Test media content");
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("featured_media: photo.jpg\n"));
}

#[tokio::test]
async fn test_failed_media_download_keeps_resolved_item() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = Config {
        download_media: true,
        ..test_config(&server, &dir)
    };
    let mut backup = WordPressBackup::new(config).unwrap();
    let source_url = format!("{}/files/gone.jpg", server.uri());
    backup.refs.media = ReferenceMap::from_items(
        "media",
        vec![json!({"id": 7, "source_url": source_url})],
    );
    Mock::given(method("GET"))
        .and(path("/files/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut value = post(1, "media-missing", "2023-01-01T00:00:00Z");
    value["featured_media"] = json!(7);
    let path = backup.save_post(&value).await.unwrap();

    assert!(!dir.path().join("backups").join("media").join("gone.jpg").exists());
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("source_url:"));
    assert!(content.contains("/files/gone.jpg"));
    assert!(!content.contains("featured_media: gone.jpg"));
}

#[tokio::test]
async fn test_media_not_downloaded_when_disabled() {
    let (mut backup, server, dir) = create_test_backup().await;
    backup.refs.media = ReferenceMap::from_items(
        "media",
        vec![json!({"id": 7, "source_url": format!("{}/files/photo.jpg", server.uri())})],
    );
    Mock::given(method("GET"))
        .and(path("/files/photo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let mut value = post(1, "no-download", "2023-01-01T00:00:00Z");
    value["featured_media"] = json!(7);
    backup.save_post(&value).await.unwrap();

    assert!(!dir.path().join("backups").join("media").exists());
}

#[tokio::test]
async fn test_run_writes_reference_files_and_summary() {
    let (mut backup, server, dir) = create_test_backup().await;
    mount_reference_data(&server).await;
    mount_collection(
        &server,
        "posts",
        vec![post(1, "first", "2023-01-01T00:00:00Z"), post(2, "second", "2023-02-01T00:00:00Z")],
    )
    .await;

    let summary = backup.run().await.unwrap();

    assert_eq!(summary.total_posts, 2);
    assert_eq!(summary.saved_posts, 2);
    assert_eq!(summary.failed_posts, 0);
    assert_eq!(summary.stats.categories, 1);
    assert_eq!(summary.stats.tags, 1);
    assert_eq!(summary.stats.authors, 1);
    assert_eq!(summary.stats.media, 0);

    let root = dir.path().join("backups");
    for file in ["taxonomies.json", "authors.json", "media.json", SUMMARY_FILE] {
        assert!(root.join(file).is_file(), "{file} missing");
    }
    assert!(root.join("2023").join("02").join("second.md").is_file());
    assert_eq!(backup.references().categories.len(), 1);
}

#[tokio::test]
async fn test_failed_post_fetch_still_writes_summary() {
    let (mut backup, server, dir) = create_test_backup().await;
    mount_reference_data(&server).await;
    mount_failure(&server, "posts").await;

    let summary = backup.run().await.unwrap();

    assert_eq!(summary.total_posts, 0);
    let written: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("backups").join(SUMMARY_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(written["total_posts"], 0);
    assert!(markdown_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_reference_failure_aborts_run() {
    let (mut backup, server, dir) = create_test_backup().await;
    mount_collection(&server, "categories", vec![json!({"id": 1, "name": "News"})]).await;
    mount_collection(&server, "tags", vec![]).await;
    mount_failure(&server, "users").await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let err = backup.run().await.unwrap_err();

    assert!(err.is_connectivity(), "got {err:?}");
    let root = dir.path().join("backups");
    assert!(root.join("taxonomies.json").is_file());
    assert!(!root.join("authors.json").exists());
    assert!(!root.join(SUMMARY_FILE).exists());
}

#[tokio::test]
async fn test_one_bad_post_does_not_stop_the_loop() {
    let (mut backup, server, dir) = create_test_backup().await;
    mount_reference_data(&server).await;
    let mut broken = post(2, "broken", "2023-01-01T00:00:00Z");
    broken.as_object_mut().unwrap().remove("slug");
    mount_collection(
        &server,
        "posts",
        vec![
            post(1, "before", "2023-01-01T00:00:00Z"),
            broken,
            post(3, "after", "2023-01-02T00:00:00Z"),
        ],
    )
    .await;

    let summary = backup.run().await.unwrap();

    assert_eq!(summary.total_posts, 3);
    assert_eq!(summary.saved_posts, 2);
    assert_eq!(summary.failed_posts, 1);
    assert_eq!(markdown_files(dir.path()).len(), 2);
}

#[test]
fn test_uncreatable_backup_dir_is_config_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();

    let config = Config {
        backup_dir: blocker.join("backups"),
        ..Config::new("https://example.wordpress.com", "user", "pass")
    };

    let err = WordPressBackup::new(config).unwrap_err();
    assert!(err.is_config(), "got {err:?}");
}

#[test]
fn test_empty_credentials_rejected_before_directory_creation() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        backup_dir: dir.path().join("backups"),
        ..Config::new("https://example.wordpress.com", "", "")
    };

    let err = WordPressBackup::new(config).unwrap_err();
    assert!(err.is_config());
    assert!(!dir.path().join("backups").exists());
}
