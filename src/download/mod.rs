//! Downloading papers to disk.
//!
//! [`DownloadPipeline`] fetches PDFs with bounded concurrency, skips papers
//! that are already on disk and never leaves a truncated file behind.

mod pipeline;
mod stats;
mod summary;

pub use pipeline::{
    CancelHandle, DownloadOptions, DownloadPipeline, ProgressCallback, DEFAULT_CONCURRENCY,
};
pub use stats::{DownloadReport, DownloadState, DownloadStats, PaperOutcome};
pub use summary::{render_summary, summary_file_name, write_summary};
