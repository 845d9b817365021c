//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use arxiv_fetch::config::CacheConfig;
use arxiv_fetch::models::{Paper, PaperBuilder};
use arxiv_fetch::utils::{CacheService, HttpClient, RetryConfig, DEFAULT_USER_AGENT};
use arxiv_fetch::ArxivClient;
use mockito::ServerGuard;
use std::path::Path;
use std::time::Duration;

pub const API_PATH: &str = "/api/query";

/// Retry config that keeps backoff sleeps in the millisecond range
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::new(max_retries, 2.0).backoff_unit(Duration::from_millis(5))
}

pub fn http(max_retries: u32) -> HttpClient {
    HttpClient::new(DEFAULT_USER_AGENT, fast_retry(max_retries)).unwrap()
}

pub fn cache(dir: &Path) -> CacheService {
    CacheService::from_config(CacheConfig {
        enabled: true,
        directory: Some(dir.to_path_buf()),
        ..CacheConfig::default()
    })
}

/// Client pointed at the mock server with its cache under `cache_dir`
pub fn client(server: &ServerGuard, cache_dir: &Path) -> ArxivClient {
    ArxivClient::new(
        http(3),
        cache(cache_dir),
        format!("{}{}", server.url(), API_PATH),
        Duration::from_secs(5),
    )
}

pub fn entry(id: &str, title: &str) -> String {
    format!(
        r#"<entry>
    <id>http://arxiv.org/abs/{id}</id>
    <updated>2024-03-02T00:00:00Z</updated>
    <published>2024-03-01T00:00:00Z</published>
    <title>{title}</title>
    <summary>Abstract of {title}.</summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/{id}" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/{id}" rel="related" type="application/pdf"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
  </entry>"#
    )
}

pub fn entry_without_id(title: &str) -> String {
    format!(
        r#"<entry>
    <title>{title}</title>
    <summary>No identifier here.</summary>
    <link title="pdf" href="http://arxiv.org/pdf/0000.00000" rel="related" type="application/pdf"/>
  </entry>"#
    )
}

pub fn feed(total: usize, entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/test</id>
  <opensearch:totalResults>{total}</opensearch:totalResults>
  <opensearch:startIndex>0</opensearch:startIndex>
  <opensearch:itemsPerPage>{count}</opensearch:itemsPerPage>
  {body}
</feed>"#,
        count = entries.len(),
        body = entries.join("\n  ")
    )
}

/// A paper whose PDF is served by the mock server at `/pdf/<id>`
pub fn hosted_paper(server: &ServerGuard, id: &str, title: &str) -> Paper {
    PaperBuilder::new(id, title, format!("{}/pdf/{}", server.url(), id))
        .authors(["Ada Lovelace"])
        .abstract_text(format!("Abstract of {}.", title))
        .categories(["cs.AI"])
        .published("2024-03-01T00:00:00Z")
        .build()
        .unwrap()
}

pub fn has_partial_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .any(|e| e.path().extension().is_some_and(|ext| ext == "part"))
}

pub fn pdf_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "pdf"))
        .count()
}
