//! Duplicate detection by arXiv id and by content.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use super::metadata::METADATA_DIR;
use super::DownloadFilter;
use crate::arxiv::strip_version;
use crate::models::Paper;
use crate::utils::filename::id_from_stem;

/// Stable hash over a paper's title, abstract and authors
pub fn content_hash(paper: &Paper) -> String {
    let content = format!(
        "{}_{}_{}",
        paper.title(),
        paper.r#abstract(),
        paper.authors().join(",")
    );
    format!("{:x}", md5::compute(content.as_bytes()))
}

#[derive(Debug, Default)]
struct SeenState {
    /// Version-less ids already on disk or downloaded in this process
    ids: HashSet<String>,
    /// Content hashes of completed downloads
    hashes: HashSet<String>,
    /// Content hashes admitted but not finished yet
    pending: HashSet<String>,
}

/// Rejects papers whose id or content has already been downloaded
///
/// A content hash is reserved when a paper is admitted, so two
/// same-content papers in one batch never both download. The reservation is
/// dropped again if the download fails or a later filter rejects the paper.
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    state: Mutex<SeenState>,
}

impl DuplicateFilter {
    pub const NAME: &'static str = "duplicate_check";

    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter that already knows the papers in `dir`
    pub fn for_directory(dir: &Path) -> Self {
        let filter = Self::new();
        let loaded = filter.seed_from_dir(dir);
        tracing::debug!(dir = %dir.display(), loaded, "Loaded previously downloaded papers");
        filter
    }

    /// Mark an id as already downloaded
    pub fn mark_seen(&self, id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.ids.insert(strip_version(id).to_string());
        }
    }

    /// Seed ids from `*.pdf` names carrying an id suffix and from
    /// `.metadata/*.json` records; returns how many ids were added
    pub fn seed_from_dir(&self, dir: &Path) -> usize {
        let mut ids = Vec::new();

        if let Ok(entries) = fs::read_dir(dir) {
            for path in entries.flatten().map(|e| e.path()) {
                if path.extension().is_some_and(|ext| ext == "pdf") {
                    if let Some(id) = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .and_then(id_from_stem)
                    {
                        ids.push(id);
                    }
                }
            }
        }

        if let Ok(entries) = fs::read_dir(dir.join(METADATA_DIR)) {
            for path in entries.flatten().map(|e| e.path()) {
                if path.extension().is_some_and(|ext| ext == "json") {
                    if let Some(id) = read_metadata_id(&path) {
                        ids.push(id);
                    }
                }
            }
        }

        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        let before = state.ids.len();
        state
            .ids
            .extend(ids.iter().map(|id| strip_version(id).to_string()));
        state.ids.len() - before
    }
}

fn read_metadata_id(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    value.get("id")?.as_str().map(str::to_string)
}

impl DownloadFilter for DuplicateFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn admit(&self, paper: &Paper) -> anyhow::Result<bool> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("duplicate filter state poisoned"))?;

        if state.ids.contains(paper.base_id()) {
            tracing::info!(paper_id = paper.id(), "Paper ID duplicate, skipping download");
            return Ok(false);
        }

        let hash = content_hash(paper);
        if state.hashes.contains(&hash) || state.pending.contains(&hash) {
            tracing::info!(paper_id = paper.id(), "Paper content duplicate, skipping download");
            return Ok(false);
        }

        state.pending.insert(hash);
        Ok(true)
    }

    fn record(&self, paper: &Paper, _path: Option<&Path>, success: bool) -> anyhow::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("duplicate filter state poisoned"))?;

        let hash = content_hash(paper);
        state.pending.remove(&hash);
        if success {
            state.ids.insert(paper.base_id().to_string());
            state.hashes.insert(hash);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperBuilder;
    use tempfile::TempDir;

    fn paper(id: &str, title: &str) -> Paper {
        PaperBuilder::new(id, title, format!("https://arxiv.org/pdf/{id}"))
            .authors(["Jane Doe", "John Smith"])
            .abstract_text("Same words.")
            .build()
            .unwrap()
    }

    #[test]
    fn test_same_content_different_id_rejected() {
        let filter = DuplicateFilter::new();
        let first = paper("2401.00001", "Twin");
        let second = paper("2401.00002", "Twin");

        assert!(filter.admit(&first).unwrap());
        assert!(!filter.admit(&second).unwrap());

        filter.record(&first, None, true).unwrap();
        assert!(!filter.admit(&second).unwrap());
    }

    #[test]
    fn test_failed_download_releases_reservation() {
        let filter = DuplicateFilter::new();
        let p = paper("2401.00001", "Flaky");

        assert!(filter.admit(&p).unwrap());
        filter.record(&p, None, false).unwrap();
        assert!(filter.admit(&p).unwrap());
    }

    #[test]
    fn test_id_seen_across_versions() {
        let filter = DuplicateFilter::new();
        filter.mark_seen("2401.00001v1");
        assert!(!filter.admit(&paper("2401.00001v3", "New Title")).unwrap());
        assert!(filter.admit(&paper("2401.00002", "Other")).unwrap());
    }

    #[test]
    fn test_seed_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Some Paper_2401.00007v2.pdf"), b"%PDF").unwrap();
        fs::write(dir.path().join("Plain Title.pdf"), b"%PDF").unwrap();
        fs::write(dir.path().join("notes_2401.00008.txt"), b"").unwrap();
        fs::create_dir(dir.path().join(METADATA_DIR)).unwrap();
        fs::write(
            dir.path().join(METADATA_DIR).join("hep-th_9901001.json"),
            r#"{"id": "hep-th/9901001", "title": "Strings"}"#,
        )
        .unwrap();
        fs::write(dir.path().join(METADATA_DIR).join("junk.json"), "nope").unwrap();

        let filter = DuplicateFilter::for_directory(dir.path());
        assert!(!filter.admit(&paper("2401.00007", "A")).unwrap());
        assert!(!filter.admit(&paper("hep-th/9901001v2", "B")).unwrap());
        assert!(filter.admit(&paper("2401.00008", "C")).unwrap());
    }

    #[test]
    fn test_content_hash_depends_on_authors() {
        let a = paper("2401.00001", "T");
        let b = PaperBuilder::new("2401.00001", "T", "https://arxiv.org/pdf/2401.00001")
            .authors(["Someone Else"])
            .abstract_text("Same words.")
            .build()
            .unwrap();
        assert_ne!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a), content_hash(&a.clone()));
    }
}
