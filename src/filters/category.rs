//! Allow/block lists over arXiv categories.

use std::collections::HashSet;

use super::DownloadFilter;
use crate::models::Paper;

/// Admits papers by category
///
/// A paper carrying any blocked category is rejected. When an allow list is
/// configured, a paper must also carry at least one allowed category.
#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    allowed: HashSet<String>,
    blocked: HashSet<String>,
}

impl CategoryFilter {
    pub const NAME: &'static str = "category_filter";

    pub fn new<A, B, S>(allowed: A, blocked: B) -> Self
    where
        A: IntoIterator<Item = S>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            blocked: blocked.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allow(mut self, category: impl Into<String>) -> Self {
        self.allowed.insert(category.into());
        self
    }

    pub fn block(mut self, category: impl Into<String>) -> Self {
        self.blocked.insert(category.into());
        self
    }
}

impl DownloadFilter for CategoryFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn admit(&self, paper: &Paper) -> anyhow::Result<bool> {
        if let Some(blocked) = paper.categories().iter().find(|c| self.blocked.contains(*c)) {
            tracing::info!(paper_id = paper.id(), category = %blocked, "Blocked category");
            return Ok(false);
        }

        if !self.allowed.is_empty() && !paper.categories().iter().any(|c| self.allowed.contains(c)) {
            tracing::info!(paper_id = paper.id(), "No allowed category");
            return Ok(false);
        }

        Ok(true)
    }
}
