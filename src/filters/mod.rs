//! Pre/post download hooks.
//!
//! A [`FilterChain`] holds an ordered list of [`DownloadFilter`]s. Before a
//! paper is fetched every enabled filter is asked to [`admit`] it, in
//! registration order, stopping at the first rejection. Filters that had
//! already admitted a rejected paper are told through a failed [`record`],
//! so any reservation they took is released. After an admitted paper
//! finished (successfully or not) every enabled filter gets to [`record`]
//! the result.
//!
//! Filters that return an error are logged and ignored, so one broken
//! filter never blocks the remaining downloads.
//!
//! [`admit`]: DownloadFilter::admit
//! [`record`]: DownloadFilter::record

mod category;
mod duplicate;
mod metadata;

pub use category::CategoryFilter;
pub use duplicate::{content_hash, DuplicateFilter};
pub use metadata::{recorded_file, MetadataRecorder, PaperMetadata, METADATA_DIR};

use std::path::Path;
use std::sync::Arc;

use crate::models::Paper;

/// A pluggable download hook
pub trait DownloadFilter: Send + Sync {
    /// Unique name used to enable, disable or remove the filter
    fn name(&self) -> &str;

    /// Whether `paper` may be downloaded
    fn admit(&self, paper: &Paper) -> anyhow::Result<bool>;

    /// Observe the outcome for an admitted paper; `path` is set on success
    fn record(&self, paper: &Paper, path: Option<&Path>, success: bool) -> anyhow::Result<()> {
        let _ = (paper, path, success);
        Ok(())
    }
}

struct Registered {
    filter: Arc<dyn DownloadFilter>,
    enabled: bool,
}

/// Ordered collection of download filters
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Registered>,
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|r| (r.filter.name(), r.enabled)))
            .finish()
    }
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; an existing filter with the same name is replaced in place
    pub fn register(&mut self, filter: impl DownloadFilter + 'static) -> &mut Self {
        self.register_arc(Arc::new(filter))
    }

    pub fn register_arc(&mut self, filter: Arc<dyn DownloadFilter>) -> &mut Self {
        match self
            .filters
            .iter_mut()
            .find(|r| r.filter.name() == filter.name())
        {
            Some(existing) => {
                existing.filter = filter;
                existing.enabled = true;
            }
            None => self.filters.push(Registered {
                filter,
                enabled: true,
            }),
        }
        self
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, filter: impl DownloadFilter + 'static) -> Self {
        self.register(filter);
        self
    }

    /// Remove a filter by name, returning whether it was present
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|r| r.filter.name() != name);
        before != self.filters.len()
    }

    /// Enable or disable a filter by name, returning whether it was found
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.filters.iter_mut().find(|r| r.filter.name() == name) {
            Some(registered) => {
                registered.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Registered filter names, in order
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|r| r.filter.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    fn enabled(&self) -> impl Iterator<Item = &Arc<dyn DownloadFilter>> {
        self.filters
            .iter()
            .filter(|r| r.enabled)
            .map(|r| &r.filter)
    }

    /// Ask every enabled filter; returns the name of the first one that rejects
    pub fn admit(&self, paper: &Paper) -> Result<(), String> {
        let mut admitted: Vec<&Arc<dyn DownloadFilter>> = Vec::new();
        for filter in self.enabled() {
            match filter.admit(paper) {
                Ok(true) => admitted.push(filter),
                Ok(false) => {
                    tracing::info!(
                        paper_id = paper.id(),
                        filter = filter.name(),
                        "Filter rejected paper"
                    );
                    for earlier in admitted {
                        record_one(earlier.as_ref(), paper, None, false);
                    }
                    return Err(filter.name().to_string());
                }
                Err(e) => {
                    tracing::warn!(
                        paper_id = paper.id(),
                        filter = filter.name(),
                        error = %e,
                        "Filter failed, ignoring it"
                    );
                }
            }
        }
        Ok(())
    }

    /// Let every enabled filter observe a finished download
    pub fn record(&self, paper: &Paper, path: Option<&Path>, success: bool) {
        for filter in self.enabled() {
            record_one(filter.as_ref(), paper, path, success);
        }
    }
}

fn record_one(filter: &dyn DownloadFilter, paper: &Paper, path: Option<&Path>, success: bool) {
    if let Err(e) = filter.record(paper, path, success) {
        tracing::warn!(
            paper_id = paper.id(),
            filter = filter.name(),
            error = %e,
            "Filter failed to record outcome"
        );
    }
}
