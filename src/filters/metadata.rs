//! Side-car JSON records for downloaded papers.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::DownloadFilter;
use crate::models::Paper;
use crate::utils::filename::id_for_filename;

/// Directory (inside the download directory) holding metadata records
pub const METADATA_DIR: &str = ".metadata";

/// Contents of `.metadata/<id>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub r#abstract: String,
    pub pdf_url: String,
    pub published: String,
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub download_time: String,
    pub file_path: String,
    pub file_size: u64,
}

/// File a paper was saved to, according to its record under `download_dir`
pub fn recorded_file(download_dir: &Path, id: &str) -> Option<PathBuf> {
    let record = download_dir.join(METADATA_DIR).join(record_name(id));
    let content = fs::read_to_string(record).ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    value.get("file_path")?.as_str().map(PathBuf::from)
}

fn record_name(id: &str) -> String {
    format!("{}.json", id_for_filename(id))
}

/// Writes a metadata record after each successful download; admits everything
#[derive(Debug, Clone)]
pub struct MetadataRecorder {
    metadata_dir: PathBuf,
}

impl MetadataRecorder {
    pub const NAME: &'static str = "metadata";

    pub fn new(download_dir: &Path) -> Self {
        Self {
            metadata_dir: download_dir.join(METADATA_DIR),
        }
    }

    /// Where the record for `id` lives
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.metadata_dir.join(record_name(id))
    }
}

impl DownloadFilter for MetadataRecorder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn admit(&self, _paper: &Paper) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn record(&self, paper: &Paper, path: Option<&Path>, success: bool) -> anyhow::Result<()> {
        let Some(path) = path.filter(|_| success) else {
            return Ok(());
        };

        let metadata = PaperMetadata {
            id: paper.id().to_string(),
            title: paper.title().to_string(),
            authors: paper.authors().to_vec(),
            r#abstract: paper.r#abstract().to_string(),
            pdf_url: paper.pdf_url().to_string(),
            published: paper.published().to_string(),
            categories: paper.categories().to_vec(),
            doi: paper.doi().map(str::to_string),
            download_time: chrono::Local::now().to_rfc3339(),
            file_path: path.display().to_string(),
            file_size: fs::metadata(path).map(|m| m.len()).unwrap_or(0),
        };

        fs::create_dir_all(&self.metadata_dir)
            .with_context(|| format!("creating {}", self.metadata_dir.display()))?;
        let target = self.record_path(paper.id());
        fs::write(&target, serde_json::to_string_pretty(&metadata)?)
            .with_context(|| format!("writing {}", target.display()))?;

        tracing::debug!(paper_id = paper.id(), path = %target.display(), "Saved metadata");
        Ok(())
    }
}
