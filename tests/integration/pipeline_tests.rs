//! Integration tests for the pipeline
//!
//! These tests use wiremock to serve listing pages and run the full
//! fetch / parse / aggregate cycle end-to-end over real HTTP.

use archive_pager::config::{
    Config, CrawlConfig, ExtractConfig, OutputConfig, OutputFormat, SessionMode, SourceConfig,
    UserAgentConfig,
};
use archive_pager::crawler::{crawl, Coordinator};
use archive_pager::output::{sink_for, Sink};
use archive_pager::state::SlotState;
use archive_pager::RunParams;
use std::collections::BTreeMap;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, start_page: u32, page_count: u32, output_dir: &str) -> Config {
    let mut query = BTreeMap::new();
    query.insert("view".to_string(), "page".to_string());

    Config {
        source: SourceConfig {
            base_url: format!("{}/news/archive", base_url),
            page_param: "page".to_string(),
            page_size_param: "pageSize".to_string(),
            page_size: 10,
            query,
            headers: BTreeMap::new(),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestPager".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        crawl: CrawlConfig {
            start_page,
            page_count,
            fetch_workers: 3,
            parse_workers: 2,
            dequeue_timeout_ms: 20,
            drain_check_ms: 5,
            aggregation_grace_ms: 500,
            shutdown_timeout_secs: 10,
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            session: SessionMode::Shared,
        },
        extract: ExtractConfig::default(),
        output: OutputConfig {
            directory: output_dir.to_string(),
            format: OutputFormat::Json,
        },
    }
}

/// Listing page with `count` articles, titled after the page number
fn listing_html(page: u32, count: usize) -> String {
    let mut articles = String::new();
    for i in 1..=count {
        articles.push_str(&format!(
            r#"<article class="story">
                <h3 class="story-title">  Page {} story {}  </h3>
                <div class="story-content"><p>Excerpt {}-{}</p></div>
                <span class="timestamp">2024-03-0{}T08:00:00+08:00</span>
            </article>"#,
            page, i, page, i, i
        ));
    }
    format!(
        r#"<html><body><div class="news-headline-list">{}</div></body></html>"#,
        articles
    )
}

async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/news/archive"))
        .and(query_param("view", "page"))
        .and(query_param("page", page.to_string().as_str()))
        .and(query_param("pageSize", "10"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

#[tokio::test]
async fn test_failed_page_keeps_its_position() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, html(listing_html(1, 3))).await;
    mount_page(&mock_server, 2, ResponseTemplate::new(500)).await;
    mount_page(&mock_server, 3, html(listing_html(3, 2))).await;

    let temp = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), 1, 3, temp.path().to_str().unwrap());
    let outcome = crawl(&config).await.expect("run should complete");

    let indices: Vec<u32> = outcome.pages.iter().map(|p| p.index()).collect();
    assert_eq!(indices, vec![1, 2, 3]);

    assert_eq!(outcome.pages[0].state(), SlotState::Parsed);
    assert_eq!(outcome.pages[0].records().len(), 3);
    assert_eq!(outcome.pages[0].records()[0].title, "Page 1 story 1");
    assert_eq!(outcome.pages[0].records()[0].body, "Excerpt 1-1");
    assert!(outcome.pages[0].records()[0].published_at.is_some());

    assert_eq!(outcome.pages[1].state(), SlotState::FetchFailed);
    assert!(outcome.pages[1].records().is_empty());

    assert_eq!(outcome.pages[2].state(), SlotState::Parsed);
    assert_eq!(outcome.pages[2].records().len(), 2);

    assert_eq!(outcome.report.parsed_pages, 2);
    assert_eq!(outcome.report.fetch_failed_pages, 1);
    assert_eq!(outcome.report.total_records, 5);
}

#[tokio::test]
async fn test_broken_unit_keeps_recovered_prefix() {
    let mock_server = MockServer::start().await;
    let broken = r#"<html><body><div class="news-headline-list">
        <article><h3 class="story-title">One</h3><div class="story-content"><p>a</p></div></article>
        <article><h3 class="story-title">Two</h3><div class="story-content"><p>b</p></div></article>
        <article><div class="story-content"><p>no title</p></div></article>
        <article><h3 class="story-title">Four</h3><div class="story-content"><p>d</p></div></article>
    </div></body></html>"#;
    mount_page(&mock_server, 1, html(broken.to_string())).await;

    let temp = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), 1, 1, temp.path().to_str().unwrap());
    let outcome = crawl(&config).await.unwrap();

    let page = &outcome.pages[0];
    assert_eq!(page.state(), SlotState::ParseFailed);
    let titles: Vec<&str> = page.records().iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two"]);
}

#[tokio::test]
async fn test_many_pages_small_pools_stay_ordered() {
    let mock_server = MockServer::start().await;
    for page in 5..25 {
        mount_page(
            &mock_server,
            page,
            html(listing_html(page, 1)).set_delay(Duration::from_millis((page % 4) as u64 * 10)),
        )
        .await;
    }

    let temp = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), 5, 20, temp.path().to_str().unwrap());
    let coordinator = Coordinator::from_config(&config).unwrap();

    for (fetch, parse) in [(1, 1), (1, 4), (4, 1), (6, 3)] {
        let params = RunParams {
            start_page: 5,
            page_count: 20,
            fetch_workers: fetch,
            parse_workers: parse,
        };
        let outcome = coordinator.run(params).await.unwrap();

        let indices: Vec<u32> = outcome.pages.iter().map(|p| p.index()).collect();
        assert_eq!(indices, (5..25).collect::<Vec<_>>(), "fetch={} parse={}", fetch, parse);
        assert!(outcome.pages.iter().all(|p| p.state() == SlotState::Parsed));
        assert_eq!(
            outcome.pages[7].records()[0].title,
            "Page 12 story 1",
            "fetch={} parse={}",
            fetch,
            parse
        );
    }
}

#[tokio::test]
async fn test_per_worker_sessions() {
    let mock_server = MockServer::start().await;
    for page in 1..=6 {
        mount_page(&mock_server, page, html(listing_html(page, 2))).await;
    }

    let temp = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), 1, 6, temp.path().to_str().unwrap());
    config.crawl.session = SessionMode::PerWorker;

    let outcome = crawl(&config).await.unwrap();
    assert_eq!(outcome.report.parsed_pages, 6);
    assert_eq!(outcome.report.total_records, 12);
}

#[tokio::test]
async fn test_unreachable_source_degrades_every_page() {
    // Nothing listens on port 1, so every connection is refused
    let temp = TempDir::new().unwrap();
    let config = create_test_config("http://127.0.0.1:1", 1, 4, temp.path().to_str().unwrap());
    let outcome = crawl(&config).await.expect("transport failures never abort the run");

    assert_eq!(outcome.pages.len(), 4);
    assert!(outcome
        .pages
        .iter()
        .all(|p| p.state() == SlotState::FetchFailed));
}

#[tokio::test]
async fn test_output_written_in_page_order() {
    let mock_server = MockServer::start().await;
    for page in 1..=4 {
        mount_page(&mock_server, page, html(listing_html(page, 1))).await;
    }

    let temp = TempDir::new().unwrap();
    let output_dir = temp.path().join("digest");
    let mut config = create_test_config(&mock_server.uri(), 1, 4, output_dir.to_str().unwrap());
    config.output.format = OutputFormat::Markdown;

    let outcome = crawl(&config).await.unwrap();
    let written = sink_for(config.output.format)
        .write(&outcome.pages, &outcome.report, &output_dir)
        .unwrap();

    assert_eq!(written, output_dir.join("pages_1-4.md"));
    let markdown = std::fs::read_to_string(written).unwrap();
    let positions: Vec<usize> = (1..=4)
        .map(|page| markdown.find(&format!("## Page {}\n", page)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}
