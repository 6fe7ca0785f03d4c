//! Integration tests for the crawler
//!
//! These tests use wiremock to serve small article graphs and run the full
//! crawl cycle end-to-end against a temporary SQLite database.

use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiki_crawler::config::Config;
use wiki_crawler::crawler::{crawl, CrawlEngine};
use wiki_crawler::storage::{RunStatus, SqliteStorage, Storage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to `db_path`
fn create_test_config(db_path: &Path, max_depth: u32, workers: usize) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = max_depth;
    config.crawler.workers = workers;
    config.crawler.dequeue_timeout_ms = 100;
    config.fetch.timeout_secs = 5;
    config.fetch.connect_timeout_secs = 2;
    config.output.database_path = db_path.display().to_string();
    config
}

/// Renders an article page linking to the given paths
fn article_html(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a>"#, link, link))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "<html><head><title>Article</title></head><body><p>Text</p>{}</body></html>",
        anchors
    )
}

/// Serves an article at `route`, expecting exactly `expected` fetches
async fn mount_article(server: &MockServer, route: &str, links: &[&str], expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(article_html(links), "text/html; charset=utf-8"),
        )
        .expect(expected)
        .mount(server)
        .await;
}

fn open_db(db_path: &Path) -> SqliteStorage {
    SqliteStorage::new(db_path).expect("Failed to reopen database")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_seed_with_two_dead_ends() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_article(
        &server,
        "/wiki/A",
        &["/wiki/B", "/wiki/C", "/wiki/Special:Random"],
        1,
    )
    .await;
    mount_article(&server, "/wiki/B", &[], 1).await;
    mount_article(&server, "/wiki/C", &[], 1).await;
    mount_article(&server, "/wiki/Special:Random", &[], 0).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("links.db");
    let config = create_test_config(&db_path, 1, 4);

    let engine = CrawlEngine::new(config, None).unwrap();
    let report = engine
        .run(&format!("{}/wiki/A", base), CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.processed(), 3);

    let storage = open_db(&db_path);
    assert_eq!(storage.count_visited().unwrap(), 3);
    assert_eq!(storage.visited_depth(&format!("{}/wiki/A", base)).unwrap(), Some(0));
    assert_eq!(storage.visited_depth(&format!("{}/wiki/B", base)).unwrap(), Some(1));
    assert_eq!(storage.visited_depth(&format!("{}/wiki/C", base)).unwrap(), Some(1));

    assert_eq!(storage.count_links().unwrap(), 2);
    assert!(storage.is_discovered(&format!("{}/wiki/B", base)).unwrap());
    assert!(storage.is_discovered(&format!("{}/wiki/C", base)).unwrap());

    let run = storage.get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.processed_count, 3);
    assert!(run.finished_at.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_bound_is_respected() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_article(&server, "/wiki/A", &["/wiki/B"], 1).await;
    mount_article(&server, "/wiki/B", &["/wiki/D"], 1).await;
    // One hop too far: discovered but never fetched
    mount_article(&server, "/wiki/D", &["/wiki/E"], 0).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("links.db");
    let config = create_test_config(&db_path, 1, 3);

    let engine = CrawlEngine::new(config, None).unwrap();
    let report = engine
        .run(&format!("{}/wiki/A", base), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed(), 2);

    let storage = open_db(&db_path);
    let depths = storage.depth_breakdown().unwrap();
    assert!(depths.keys().all(|depth| *depth <= 1));
    assert!(storage.is_discovered(&format!("{}/wiki/D", base)).unwrap());
    assert!(!storage.is_visited(&format!("{}/wiki/D", base)).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_max_depth_zero_visits_only_seed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_article(&server, "/wiki/A", &["/wiki/B", "/wiki/C"], 1).await;
    mount_article(&server, "/wiki/B", &[], 0).await;
    mount_article(&server, "/wiki/C", &[], 0).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("links.db");
    let config = create_test_config(&db_path, 0, 2);

    let engine = CrawlEngine::new(config, None).unwrap();
    let report = engine
        .run(&format!("{}/wiki/A", base), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed(), 1);

    let storage = open_db(&db_path);
    assert_eq!(storage.count_visited().unwrap(), 1);
    assert_eq!(storage.count_links().unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_article_fetched_twice() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Diamond with a back edge to the seed
    mount_article(&server, "/wiki/A", &["/wiki/B", "/wiki/C"], 1).await;
    mount_article(&server, "/wiki/B", &["/wiki/D", "/wiki/C", "/wiki/A"], 1).await;
    mount_article(&server, "/wiki/C", &["/wiki/D", "/wiki/B", "/wiki/A"], 1).await;
    mount_article(&server, "/wiki/D", &["/wiki/A", "/wiki/B", "/wiki/C"], 1).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("links.db");
    let config = create_test_config(&db_path, 5, 8);

    let engine = CrawlEngine::new(config, None).unwrap();
    let report = engine
        .run(&format!("{}/wiki/A", base), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed(), 4);
    assert_eq!(report.counts.failed(), 0);

    let storage = open_db(&db_path);
    assert_eq!(storage.count_visited().unwrap(), 4);
    assert_eq!(storage.visited_depth(&format!("{}/wiki/A", base)).unwrap(), Some(0));
    // The seed is reachable through back edges, so it is also a discovered link
    assert_eq!(storage.count_links().unwrap(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fetch_failure_drops_item() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_article(&server, "/wiki/A", &["/wiki/B", "/wiki/Missing"], 1).await;
    mount_article(&server, "/wiki/B", &[], 1).await;
    Mock::given(method("GET"))
        .and(path("/wiki/Missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("links.db");
    let config = create_test_config(&db_path, 2, 4);

    let engine = CrawlEngine::new(config, None).unwrap();
    let report = engine
        .run(&format!("{}/wiki/A", base), CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.processed(), 2);
    assert_eq!(report.counts.fetch_failed, 1);

    let storage = open_db(&db_path);
    let missing = format!("{}/wiki/Missing", base);
    assert!(storage.is_discovered(&missing).unwrap());
    assert!(!storage.is_visited(&missing).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_stops_promptly() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_article(&server, "/wiki/A", &["/wiki/Slow"], 1).await;
    Mock::given(method("GET"))
        .and(path("/wiki/Slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(article_html(&[]), "text/html; charset=utf-8")
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("links.db");
    let config = create_test_config(&db_path, 3, 4);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let engine = CrawlEngine::new(config, None).unwrap();
    let report = engine
        .run(&format!("{}/wiki/A", base), cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(report.processed(), 1);

    // Work committed before the stop signal survives
    let storage = open_db(&db_path);
    assert!(storage.is_visited(&format!("{}/wiki/A", base)).unwrap());
    assert!(!storage.is_visited(&format!("{}/wiki/Slow", base)).unwrap());

    let run = storage.get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resume_skips_visited_and_fresh_clears() {
    let server = MockServer::start().await;
    let base = server.uri();
    let seed = format!("{}/wiki/A", base);

    // Fetched once by the first run and once more by the fresh run
    mount_article(&server, "/wiki/A", &["/wiki/B"], 2).await;
    mount_article(&server, "/wiki/B", &[], 2).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("links.db");

    let first = crawl(
        create_test_config(&db_path, 1, 2),
        None,
        &seed,
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(first.processed(), 2);

    let resumed = crawl(
        create_test_config(&db_path, 1, 2),
        None,
        &seed,
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(resumed.processed(), 0);
    assert_eq!(resumed.counts.duplicates, 1);

    let fresh = crawl(
        create_test_config(&db_path, 1, 2),
        None,
        &seed,
        true,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(fresh.processed(), 2);

    let storage = open_db(&db_path);
    assert_eq!(storage.count_visited().unwrap(), 2);
    assert_eq!(storage.recent_runs(10).unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crawl_into_two_table_store_file() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_article(&server, "/wiki/A", &["/wiki/B"], 1).await;
    mount_article(&server, "/wiki/B", &[], 1).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wikipedia_links.db");
    {
        // Bare layout: no timestamps, no runs table
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE links (url TEXT PRIMARY KEY);
             CREATE TABLE visited (url TEXT PRIMARY KEY, depth INTEGER);",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO links (url) VALUES (?1)",
            [format!("{}/wiki/Old", base)],
        )
        .unwrap();
    }

    let engine = CrawlEngine::new(create_test_config(&db_path, 1, 2), None).unwrap();
    let report = engine
        .run(&format!("{}/wiki/A", base), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed(), 2);
    assert_eq!(report.counts.failed(), 0);

    let storage = open_db(&db_path);
    assert_eq!(storage.count_visited().unwrap(), 2);
    assert_eq!(storage.visited_depth(&format!("{}/wiki/B", base)).unwrap(), Some(1));
    assert!(storage.is_discovered(&format!("{}/wiki/Old", base)).unwrap());
    assert!(storage.is_discovered(&format!("{}/wiki/B", base)).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_store_write_failure_drops_only_that_item() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_article(&server, "/wiki/A", &["/wiki/B", "/wiki/D"], 1).await;
    mount_article(&server, "/wiki/B", &["/wiki/C"], 1).await;
    mount_article(&server, "/wiki/C", &[], 0).await;
    mount_article(&server, "/wiki/D", &[], 1).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("links.db");
    drop(open_db(&db_path));
    {
        // Saving B's links fails, and so does recording D as visited
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_c BEFORE INSERT ON links
             WHEN NEW.url LIKE '%/wiki/C'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;
             CREATE TRIGGER reject_d BEFORE INSERT ON visited
             WHEN NEW.url LIKE '%/wiki/D'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
    }

    let engine = CrawlEngine::new(create_test_config(&db_path, 3, 4), None).unwrap();
    let report = engine
        .run(&format!("{}/wiki/A", base), CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.processed(), 1);
    assert_eq!(report.counts.store_failed, 2);

    let storage = open_db(&db_path);
    assert!(storage.is_visited(&format!("{}/wiki/A", base)).unwrap());
    assert!(!storage.is_visited(&format!("{}/wiki/B", base)).unwrap());
    assert!(!storage.is_visited(&format!("{}/wiki/D", base)).unwrap());
    // B's children were never recorded or enqueued
    assert!(!storage.is_discovered(&format!("{}/wiki/C", base)).unwrap());

    let run = storage.get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.processed_count, 1);
}
