//! Utility modules supporting search and download.
//!
//! - [`HttpClient`]: HTTP client that retries transient failures
//! - [`RetryConfig`] / [`with_retry`]: exponential backoff around any async operation
//! - [`CacheService`]: two-namespace on-disk cache for searches and papers
//! - [`filename`]: title sanitising and collision-free target paths
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use arxiv_fetch::utils::{with_retry, RetryConfig};
//! use arxiv_fetch::ArxivError;
//!
//! # async fn fetch_data() -> Result<String, ArxivError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), ArxivError> {
//! let config = RetryConfig::new(3, 2.0);
//! let data = with_retry(config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod filename;
mod http;
mod retry;

pub use cache::{CacheNamespace, CacheResult, CacheService, CacheStats, ClearedCounts};
pub use http::{HttpClient, DEFAULT_USER_AGENT};
pub use retry::{with_retry, RetryConfig, MAX_BACKOFF};
