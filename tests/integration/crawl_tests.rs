//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small forum and run the full
//! pipeline end-to-end over real HTTP.

use forum_harvest::config::Config;
use forum_harvest::crawler::{harvest, Coordinator, EXIT_COMPLETE, EXIT_DEGRADED};
use forum_harvest::output::write_results;
use forum_harvest::ItemState;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock forum
fn create_test_config(base_url: &str, pages: u32, threads: u32) -> Config {
    let mut config = Config::default();
    config.crawl.url = format!("{}/forums/8/", base_url);
    config.crawl.pages = pages;
    config.crawl.threads = threads;
    config.crawl.throttle = false;
    config.http.timeout_secs = 5;
    config
}

fn index_page(items: &[&str], next: Option<&str>) -> String {
    let mut html = String::from("<html><head><title>Forum</title></head><body>");
    for item in items {
        html.push_str(&format!(
            r#"<div class="structItem structItem--thread"><div class="structItem-title"><a href="{}">Thread</a></div></div>"#,
            item
        ));
    }
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<nav class="pageNav"><a class="pageNav-jump pageNav-jump--next" href="{}">Next</a></nav>"#,
            next
        ));
    }
    html.push_str("</body></html>");
    html
}

fn thread_page(posts: &[(&str, &str)], next: Option<&str>) -> String {
    let mut html = String::from(
        r#"<html><body><div class="block-body js-replyNewMessageContainer">"#,
    );
    for (author, text) in posts {
        html.push_str(&format!(
            r#"<article class="message message--post js-post js-inlineModContainer" data-author="{}">
                <div class="message-inner"><div class="bbWrapper">{}</div></div>
            </article>"#,
            author, text
        ));
    }
    html.push_str("</div>");
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<a class="pageNav-jump pageNav-jump--next" href="{}">Next</a>"#,
            next
        ));
    }
    html.push_str("</body></html>");
    html
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Index with two pages of two threads each, plus a third page that must
/// not be visited with a page limit of 2. Thread 1 spans two pages.
async fn mount_scenario(server: &MockServer) {
    mount_page(
        server,
        "/forums/8/",
        index_page(
            &["/threads/zero.10/", "/threads/one.11/"],
            Some("/forums/8/page-2"),
        ),
    )
    .await;
    mount_page(
        server,
        "/forums/8/page-2",
        index_page(
            &["/threads/two.12/", "/threads/three.13/"],
            Some("/forums/8/page-3"),
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/forums/8/page-3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(
            &["/threads/four.14/"],
            None,
        )))
        .expect(0)
        .mount(server)
        .await;

    mount_page(
        server,
        "/threads/zero.10/",
        thread_page(&[("alice", "zero")], None),
    )
    .await;
    mount_page(
        server,
        "/threads/one.11/",
        thread_page(&[("bob", "one, page one")], Some("/threads/one.11/page-2")),
    )
    .await;
    mount_page(
        server,
        "/threads/one.11/page-2",
        thread_page(&[("carol", "one, page two")], None),
    )
    .await;
    mount_page(
        server,
        "/threads/two.12/",
        thread_page(&[("dave", "two")], None),
    )
    .await;
    mount_page(
        server,
        "/threads/three.13/",
        thread_page(&[("erin", "three")], None),
    )
    .await;
}

fn texts(report: &forum_harvest::crawler::RunReport) -> Vec<Vec<String>> {
    report
        .items
        .iter()
        .map(|item| item.fragments.iter().map(|f| f.text.clone()).collect())
        .collect()
}

#[tokio::test]
async fn test_two_index_pages_four_threads() {
    let mock_server = MockServer::start().await;
    mount_scenario(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), 2, 3);
    let coordinator = Coordinator::new(&config).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Harvest failed");

    assert_eq!(report.discovery.index_pages_visited, 2);
    assert_eq!(report.items.len(), 4);
    assert_eq!(
        texts(&report),
        vec![
            vec!["zero".to_string()],
            vec!["one, page one".to_string(), "one, page two".to_string()],
            vec!["two".to_string()],
            vec!["three".to_string()],
        ]
    );
    assert_eq!(report.items[1].fragments[1].author, "carol");
    assert_eq!(report.items[1].pages_visited, 2);
    assert_eq!(report.exit_code(), EXIT_COMPLETE);
}

#[tokio::test]
async fn test_order_matches_discovery_when_later_threads_finish_first() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/forums/8/",
        index_page(
            &["/threads/a.1/", "/threads/b.2/", "/threads/c.3/"],
            None,
        ),
    )
    .await;

    for (thread, delay_ms) in [("a.1", 300), ("b.2", 150), ("c.3", 0)] {
        Mock::given(method("GET"))
            .and(path(format!("/threads/{}/", thread)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(thread_page(&[("poster", thread)], None))
                    .set_delay(Duration::from_millis(delay_ms)),
            )
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&mock_server.uri(), 1, 3);
    let report = harvest(&config, CancellationToken::new())
        .await
        .expect("Harvest failed");

    assert_eq!(
        texts(&report),
        vec![
            vec!["a.1".to_string()],
            vec!["b.2".to_string()],
            vec!["c.3".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_second_page_failure_keeps_slot() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/forums/8/",
        index_page(&["/threads/ok.1/", "/threads/broken.2/"], None),
    )
    .await;
    mount_page(
        &mock_server,
        "/threads/ok.1/",
        thread_page(&[("alice", "fine")], None),
    )
    .await;
    mount_page(
        &mock_server,
        "/threads/broken.2/",
        thread_page(&[("bob", "before failure")], Some("/threads/broken.2/page-2")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/threads/broken.2/page-2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 1, 2);
    let report = Coordinator::new(&config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Harvest failed");

    assert_eq!(report.items.len(), 2);
    assert_eq!(report.items[0].state, ItemState::Complete);
    assert_eq!(report.items[1].state, ItemState::Partial);
    assert_eq!(texts(&report)[1], vec!["before failure".to_string()]);
    assert_eq!(report.exit_code(), EXIT_DEGRADED);
}

#[tokio::test]
async fn test_missing_thread_yields_empty_entry() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/forums/8/",
        index_page(&["/threads/gone.1/", "/threads/here.2/"], None),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/threads/gone.1/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/threads/here.2/",
        thread_page(&[("alice", "present")], None),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), 1, 2);
    let report = harvest(&config, CancellationToken::new())
        .await
        .expect("Harvest failed");

    assert_eq!(report.items[0].state, ItemState::Failed);
    assert!(report.items[0].fragments.is_empty());
    assert_eq!(texts(&report)[1], vec!["present".to_string()]);
}

#[tokio::test]
async fn test_result_file_written_in_discovery_order() {
    let mock_server = MockServer::start().await;
    mount_scenario(&mock_server).await;

    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&mock_server.uri(), 2, 4);
    config.output.path = dir.path().join("result.json");

    let report = harvest(&config, CancellationToken::new())
        .await
        .expect("Harvest failed");
    write_results(&config.output.path, &report).expect("Failed to write results");

    let content = std::fs::read_to_string(&config.output.path).expect("Failed to read results");
    let value: serde_json::Value = serde_json::from_str(&content).expect("Invalid JSON");

    assert_eq!(
        value,
        serde_json::json!([
            [{"author": "alice", "txt": "zero"}],
            [
                {"author": "bob", "txt": "one, page one"},
                {"author": "carol", "txt": "one, page two"}
            ],
            [{"author": "dave", "txt": "two"}],
            [{"author": "erin", "txt": "three"}]
        ])
    );
}
