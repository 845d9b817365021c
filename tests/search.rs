//! End-to-end search behaviour against a local mock of the arXiv API.

mod common;

use arxiv_fetch::models::{DateRange, SearchRequest};
use arxiv_fetch::ArxivError;
use common::{client, entry, entry_without_id, feed, API_PATH};
use mockito::{Matcher, Server};
use tempfile::TempDir;

#[tokio::test]
async fn test_search_returns_entries_in_document_order() {
    let mut server = Server::new_async().await;
    let ids = [
        "2403.00005v1",
        "2403.00001v1",
        "2403.00004v2",
        "2403.00002v1",
        "2403.00003v1",
    ];
    let entries: Vec<String> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| entry(id, &format!("Paper number {}", i)))
        .collect();
    let mock = server
        .mock("GET", API_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("search_query".into(), "cat:cs.AI".into()),
            Matcher::UrlEncoded("max_results".into(), "5".into()),
            Matcher::UrlEncoded("start".into(), "0".into()),
            Matcher::UrlEncoded("sortBy".into(), "relevance".into()),
            Matcher::UrlEncoded("sortOrder".into(), "descending".into()),
        ]))
        .with_status(200)
        .with_body(feed(42, &entries))
        .expect(1)
        .create_async()
        .await;

    let cache_dir = TempDir::new().unwrap();
    let client = client(&server, cache_dir.path());
    let page = client
        .search_page(&SearchRequest::new("cat:cs.AI").max_results(5))
        .await
        .unwrap();

    let got: Vec<&str> = page.papers.iter().map(|p| p.id()).collect();
    assert_eq!(got, ids);
    assert_eq!(page.total_results, Some(42));
    assert!(page.has_more());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_entry_without_id_is_skipped() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(feed(
            2,
            &[entry("2403.00001v1", "Good entry"), entry_without_id("Bad entry")],
        ))
        .create_async()
        .await;

    let cache_dir = TempDir::new().unwrap();
    let papers = client(&server, cache_dir.path())
        .search(&SearchRequest::new("all:entry"))
        .await
        .unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].title(), "Good entry");
}

#[tokio::test]
async fn test_repeated_search_is_served_from_cache() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(feed(1, &[entry("2403.00001v1", "Cached paper")]))
        .expect(1)
        .create_async()
        .await;

    let cache_dir = TempDir::new().unwrap();
    let client = client(&server, cache_dir.path());
    let request = SearchRequest::new("ti:cached")
        .date_range(DateRange::parse(Some("2024-01-01"), None).unwrap());

    let first = client.search_page(&request).await.unwrap();
    let second = client.search_page(&request).await.unwrap();
    assert_eq!(first, second);

    let stats = client.cache_stats();
    assert_eq!(stats.search_count, 1);
    // Versioned and base id entries.
    assert_eq!(stats.paper_count, 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_paper_uses_id_list_then_cache() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", API_PATH)
        .match_query(Matcher::UrlEncoded("id_list".into(), "2301.00001".into()))
        .with_status(200)
        .with_body(feed(1, &[entry("2301.00001v2", "Looked up by id")]))
        .expect(1)
        .create_async()
        .await;

    let cache_dir = TempDir::new().unwrap();
    let client = client(&server, cache_dir.path());

    let paper = client
        .get_paper("https://arxiv.org/abs/2301.00001")
        .await
        .unwrap();
    assert_eq!(paper.id(), "2301.00001v2");

    let again = client.get_paper("arXiv:2301.00001").await.unwrap();
    assert_eq!(again, paper);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_paper_not_found() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(feed(0, &[]))
        .create_async()
        .await;

    let cache_dir = TempDir::new().unwrap();
    let result = client(&server, cache_dir.path())
        .get_paper("2301.99999")
        .await;
    assert!(matches!(result, Err(ArxivError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_request_never_reaches_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let cache_dir = TempDir::new().unwrap();
    let client = client(&server, cache_dir.path());

    let empty = client.search(&SearchRequest::default()).await;
    assert!(matches!(empty, Err(ArxivError::Validation(_))));

    let bad_id = client
        .search(&SearchRequest::by_ids(["2301.00001", "not-an-id"]))
        .await;
    match bad_id {
        Err(ArxivError::Validation(msg)) => assert!(msg.contains("not-an-id")),
        other => panic!("expected validation error, got {:?}", other),
    }

    let zero = client
        .search(&SearchRequest::new("cat:cs.AI").max_results(0))
        .await;
    assert!(matches!(zero, Err(ArxivError::Validation(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_feed_is_a_parse_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<feed><entry></feed>")
        .create_async()
        .await;

    let cache_dir = TempDir::new().unwrap();
    let result = client(&server, cache_dir.path())
        .search(&SearchRequest::new("cat:cs.AI"))
        .await;
    assert!(matches!(result, Err(ArxivError::Parse(_))));
}

#[tokio::test]
async fn test_unavailable_upstream_is_a_network_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", API_PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let cache_dir = TempDir::new().unwrap();
    let result = client(&server, cache_dir.path())
        .search(&SearchRequest::new("cat:cs.AI"))
        .await;
    match result {
        Err(ArxivError::Network(msg)) => assert!(msg.contains("3 attempts")),
        other => panic!("expected network error, got {:?}", other),
    }
    mock.assert_async().await;
}
