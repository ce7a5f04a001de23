//! End-to-end runs of the HTTP fetcher and pipeline against mock servers.

use flate2::write::GzEncoder;
use flate2::Compression;
use sitemap_harvest::acquisition::{HttpClient, HttpFetcher, RetryPolicy};
use sitemap_harvest::config::{FetchConfig, HarvestConfig, OutputConfig, PipelineConfig};
use sitemap_harvest::export::{self, OutputFormat};
use sitemap_harvest::pipeline::{OrderMode, RunOutcome};
use sitemap_harvest::{FailureKind, Pipeline, SitemapTarget};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn urlset(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{u}</loc><lastmod>2024-05-01</lastmod></url>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#
    )
}

fn fast_retry(max_attempts: u32, retry_server_errors: bool) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        jitter_factor: 0.0,
        retry_server_errors,
        ..RetryPolicy::default()
    }
}

fn pipeline(retry: RetryPolicy, concurrency: usize, order: OrderMode) -> Pipeline {
    let client = HttpClient::new(&FetchConfig {
        timeout_ms: 2_000,
        ..FetchConfig::default()
    })
    .unwrap();
    let fetcher = HttpFetcher::new(client, retry);
    Pipeline::new(
        Arc::new(fetcher),
        PipelineConfig {
            concurrency,
            min_delay_ms: 0,
            order,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_harvest_many_sitemaps() {
    let server = MockServer::start().await;
    let mut targets = Vec::new();
    for i in 0..5 {
        let locs: Vec<String> = (0..20)
            .map(|j| format!("https://shop.test/{i}/page-{j}"))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/sitemap-{i}.xml")))
            .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&locs)))
            .mount(&server)
            .await;
        targets.push(format!("{}/sitemap-{i}.xml", server.uri()));
    }

    let p = pipeline(RetryPolicy::no_retry(), 3, OrderMode::Input);
    let (result, stats) = p
        .run(SitemapTarget::from_urls(targets.clone()), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.records.len(), 100);
    assert_eq!(stats.total_urls, 100);
    assert_eq!(stats.succeeded, 5);
    assert_eq!(stats.outcome(), RunOutcome::AllSucceeded);
    assert_eq!(result.records[0].url, "https://shop.test/0/page-0");
    assert_eq!(result.records[0].last_modified.as_deref(), Some("2024-05-01"));
    assert_eq!(result.records[0].source_sitemap, targets[0]);
    assert_eq!(result.records[99].url, "https://shop.test/4/page-19");
}

#[tokio::test]
async fn test_mixed_failures_are_isolated() {
    let server = MockServer::start().await;
    Mock::given(path("/good.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(urlset(&["https://good.test/a".to_string()])),
        )
        .mount(&server)
        .await;
    Mock::given(path("/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/junk.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("no markup here"))
        .mount(&server)
        .await;

    let good = format!("{}/good.xml", server.uri());
    let missing = format!("{}/missing.xml", server.uri());
    let junk = format!("{}/junk.xml", server.uri());

    let p = pipeline(fast_retry(3, false), 4, OrderMode::Completion);
    let (result, stats) = p
        .run(
            SitemapTarget::from_urls([&good, &missing, &junk]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.records.len(), 1);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.total_failures, 2);
    assert_eq!(stats.outcome(), RunOutcome::PartialFailure);
    assert_eq!(
        result.statuses[&missing].failure.as_ref().unwrap().kind,
        FailureKind::HttpError
    );
    assert_eq!(
        result.statuses[&junk].failure.as_ref().unwrap().kind,
        FailureKind::MalformedXml
    );
}

#[tokio::test]
async fn test_server_errors_retried_when_enabled() {
    let server = MockServer::start().await;
    Mock::given(path("/flaky.xml"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(path("/flaky.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(urlset(&["https://flaky.test/ok".to_string()])),
        )
        .mount(&server)
        .await;

    let p = pipeline(fast_retry(3, true), 1, OrderMode::Completion);
    let (result, stats) = p
        .run(
            SitemapTarget::from_urls([format!("{}/flaky.xml", server.uri())]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(stats.total_failures, 0);
    assert_eq!(result.records[0].url, "https://flaky.test/ok");
}

#[tokio::test]
async fn test_gzip_sitemap_body() {
    let server = MockServer::start().await;
    let xml = urlset(&[
        "https://gz.test/a".to_string(),
        "https://gz.test/b".to_string(),
    ]);
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(xml.as_bytes()).unwrap();
    let gz = enc.finish().unwrap();

    // Served as an opaque .gz file, not with Content-Encoding.
    Mock::given(path("/sitemap.xml.gz"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-gzip")
                .set_body_bytes(gz),
        )
        .mount(&server)
        .await;

    let p = pipeline(RetryPolicy::no_retry(), 1, OrderMode::Completion);
    let (result, _) = p
        .run(
            SitemapTarget::from_urls([format!("{}/sitemap.xml.gz", server.uri())]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let urls: Vec<_> = result.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["https://gz.test/a", "https://gz.test/b"]);
}

#[tokio::test]
async fn test_sitemap_index_lists_child_sitemaps() {
    let server = MockServer::start().await;
    let body = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
        <sitemap><loc>https://news.test/sitemap-1.xml</loc><lastmod>2024-02-02T10:00:00+00:00</lastmod></sitemap>
        <sitemap><loc>https://news.test/sitemap-2.xml</loc></sitemap>
    </sitemapindex>"#;
    Mock::given(path("/index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let p = pipeline(RetryPolicy::no_retry(), 1, OrderMode::Completion);
    let (result, _) = p
        .run(
            SitemapTarget::from_urls([format!("{}/index.xml", server.uri())]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.records.len(), 2);
    assert_eq!(
        result.records[0].last_modified.as_deref(),
        Some("2024-02-02T10:00:00+00:00")
    );
    assert_eq!(result.records[1].last_modified, None);
}

#[tokio::test]
async fn test_harvest_then_export_csv() {
    let server = MockServer::start().await;
    Mock::given(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[
            "https://www.example.test/a".to_string(),
            "https://www.example.test/a".to_string(),
            "https://www.example.test/b".to_string(),
        ])))
        .mount(&server)
        .await;

    let mut config = HarvestConfig::default();
    config.retry = RetryPolicy::no_retry();
    let fetcher = HttpFetcher::from_config(&config).unwrap();
    let p = Pipeline::new(Arc::new(fetcher), config.pipeline.clone()).unwrap();
    let targets = SitemapTarget::from_urls([format!("{}/sitemap.xml", server.uri())]);
    let domain = export::domain_label(&targets);
    let (result, _) = p.run(targets, CancellationToken::new()).await.unwrap();
    assert_eq!(result.records.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let output = OutputConfig {
        dir: dir.path().to_path_buf(),
        format: OutputFormat::Csv,
        unique: true,
    };
    let written = export::write_result(&result, &output, &domain).unwrap();
    let csv = std::fs::read_to_string(written).unwrap();
    let lines: Vec<_> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "url,last_modified,source_sitemap");
    assert!(lines[1].starts_with("https://www.example.test/a,2024-05-01,"));
    assert!(lines[2].starts_with("https://www.example.test/b,"));
}
