//! # arxiv-fetch
//!
//! Search the arXiv API and batch-download papers as PDFs.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Paper, SearchRequest, etc.)
//! - [`arxiv`]: Query building, Atom feed parsing and the API client
//! - [`download`]: Bounded-concurrency PDF download pipeline and statistics
//! - [`filters`]: Pluggable admit/record hooks run around each download
//! - [`utils`]: HTTP client with retries, on-disk cache, filename handling
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal output for the command-line tool

pub mod arxiv;
pub mod config;
pub mod download;
pub mod error;
pub mod filters;
pub mod models;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use arxiv::{ArxivClient, SearchPage};
pub use config::Config;
pub use download::{DownloadOptions, DownloadPipeline, DownloadReport, DownloadStats};
pub use error::ArxivError;
pub use filters::{DownloadFilter, FilterChain};
pub use models::{Paper, SearchRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
