//! arXiv API client.
//!
//! [`ArxivClient`] ties the query builder, the retrying HTTP client, the Atom
//! parser and the result cache together:
//!
//! ```rust,no_run
//! use arxiv_fetch::{ArxivClient, Config, SearchRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), arxiv_fetch::ArxivError> {
//! let client = ArxivClient::from_config(&Config::default())?;
//! let papers = client
//!     .search(&SearchRequest::new("cat:cs.AI").max_results(5))
//!     .await?;
//! for paper in &papers {
//!     println!("{} {}", paper.id(), paper.title());
//! }
//! # Ok(())
//! # }
//! ```

mod id;
pub mod parser;
pub mod query;

pub use id::{is_valid_arxiv_id, normalize_id, strip_version, validate_id};
pub use parser::ParsedFeed;
pub use query::QueryParams;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::download::{DownloadOptions, DownloadPipeline};
use crate::error::ArxivError;
use crate::models::{Paper, SearchRequest};
use crate::utils::{CacheService, CacheStats, ClearedCounts, HttpClient};

/// Default arXiv API endpoint
pub const DEFAULT_API_URL: &str = "http://export.arxiv.org/api/query";

/// One page of search results with the feed's paging fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Papers in server order
    pub papers: Vec<Paper>,
    /// Total matches upstream, when the feed reported it
    pub total_results: Option<usize>,
    pub start_index: Option<usize>,
    pub items_per_page: Option<usize>,
}

impl SearchPage {
    /// Whether more results exist past this page
    pub fn has_more(&self) -> bool {
        match (self.total_results, self.start_index) {
            (Some(total), Some(start)) => start + self.papers.len() < total,
            _ => false,
        }
    }
}

impl From<ParsedFeed> for SearchPage {
    fn from(feed: ParsedFeed) -> Self {
        Self {
            papers: feed.papers,
            total_results: feed.total_results,
            start_index: feed.start_index,
            items_per_page: feed.items_per_page,
        }
    }
}

/// Client for the arXiv search API
#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: HttpClient,
    cache: CacheService,
    api_url: String,
    request_timeout: Duration,
}

impl ArxivClient {
    pub fn new(
        http: HttpClient,
        cache: CacheService,
        api_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http,
            cache,
            api_url: api_url.into(),
            request_timeout,
        }
    }

    /// Build a client from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, ArxivError> {
        let http = HttpClient::new(&config.network.user_agent, config.retry_config())?;
        let cache = CacheService::from_config(config.cache.clone());
        Ok(Self::new(
            http,
            cache,
            config.network.api_url.clone(),
            Duration::from_secs(config.network.request_timeout_secs),
        ))
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// A download pipeline sharing this client's HTTP connection pool
    pub fn pipeline(&self, options: DownloadOptions) -> DownloadPipeline {
        DownloadPipeline::new(self.http.clone(), options)
    }

    /// Run a search and return the matching papers in server order
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Paper>, ArxivError> {
        self.search_page(request).await.map(|page| page.papers)
    }

    /// Run a search and keep the feed's paging metadata
    ///
    /// Validation happens before any network traffic. Results are served
    /// from the search cache when a fresh entry exists; fetched results are
    /// written to both cache namespaces.
    #[instrument(skip(self, request), fields(start = request.start, max_results = request.max_results))]
    pub async fn search_page(&self, request: &SearchRequest) -> Result<SearchPage, ArxivError> {
        let params = query::build(request)?;
        let key = params.cache_key();

        if let Some(page) = self.cache.get_search::<SearchPage>(&key) {
            debug!(results = page.papers.len(), "Serving search from cache");
            return Ok(page);
        }

        debug!(query = ?params.search_query, id_list = ?params.id_list, "Querying arXiv");
        let body = self
            .http
            .get_text(&self.api_url, &params.to_pairs(), self.request_timeout)
            .await?;
        let page = SearchPage::from(parser::parse_feed(&body)?);

        if let Err(e) = self.cache.put_search(&key, &page) {
            warn!(error = %e, "Failed to cache search result");
        }
        for paper in &page.papers {
            self.cache_paper(paper);
        }

        Ok(page)
    }

    fn cache_paper(&self, paper: &Paper) {
        let mut ids = vec![paper.id()];
        if paper.base_id() != paper.id() {
            ids.push(paper.base_id());
        }
        for id in ids {
            if let Err(e) = self.cache.put_paper(id, paper) {
                warn!(paper_id = id, error = %e, "Failed to cache paper");
            }
        }
    }

    /// Fetch one paper by id
    ///
    /// Accepts `2301.00001`, `2301.00001v2`, `arXiv:2301.00001`, abstract or
    /// PDF URLs and legacy ids. A versioned id returns that version.
    #[instrument(skip(self))]
    pub async fn get_paper(&self, id: &str) -> Result<Paper, ArxivError> {
        let id = normalize_id(id)?;
        self.get_papers(std::slice::from_ref(&id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ArxivError::NotFound(format!("No paper found with ID {}", id)))
    }

    /// Fetch several papers by id, consulting the paper cache first
    ///
    /// Ids that match nothing upstream are left out of the result.
    pub async fn get_papers(&self, ids: &[String]) -> Result<Vec<Paper>, ArxivError> {
        let ids = ids
            .iter()
            .map(|id| normalize_id(id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut found: Vec<(String, Paper)> = Vec::new();
        let mut missing = Vec::new();
        for id in &ids {
            match self.cache.get_paper(id) {
                Some(paper) => found.push((id.clone(), paper)),
                None => missing.push(id.clone()),
            }
        }

        if !missing.is_empty() {
            let request = SearchRequest::by_ids(missing.iter().cloned());
            let page = self.search_page(&request).await?;
            for id in missing {
                let matched = page
                    .papers
                    .iter()
                    .find(|p| p.id() == id || p.base_id() == id)
                    .cloned();
                match matched {
                    Some(paper) => {
                        self.cache_paper(&paper);
                        found.push((id, paper));
                    }
                    None => warn!(paper_id = %id, "No paper returned for id"),
                }
            }
        }

        // Keep the caller's order.
        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|(k, _)| k == id).map(|(_, p)| p.clone()))
            .collect())
    }

    /// Delete expired and unreadable cache entries
    pub fn clear_expired_cache(&self) -> ClearedCounts {
        self.cache.clear_expired()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
