//! File naming for downloaded papers.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::arxiv::strip_version;
use crate::filters::recorded_file;
use crate::models::Paper;

/// Default maximum length of a sanitized title, in characters
pub const DEFAULT_MAX_FILENAME_LENGTH: usize = 100;

/// Stem used when a title sanitizes to nothing
pub const UNTITLED: &str = "untitled";

const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Turn a paper title into a portable file stem
///
/// Strips characters that are illegal on common filesystems, collapses
/// whitespace, truncates to `max_len` characters and falls back to
/// [`UNTITLED`] when nothing is left.
pub fn sanitize_title(title: &str, max_len: usize) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .filter(|c| !ILLEGAL.contains(c))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(max_len.max(1)).collect();
    let trimmed = truncated.trim_end_matches(['.', ' ']).trim();

    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// arXiv id in a form usable inside a file name (`hep-th/9901001` becomes `hep-th_9901001`)
pub fn id_for_filename(id: &str) -> String {
    id.replace('/', "_")
}

/// Outcome of choosing a target path for a paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// Nothing is there yet; the path is now reserved for this paper
    Fresh(PathBuf),
    /// The paper is already on disk at this path
    Existing(PathBuf),
}

/// Picks collision-free target paths inside one download directory
///
/// A paper goes to `<title>.pdf`. When that name is taken, by another paper
/// of the same batch or by a file this paper does not own, it goes to
/// `<title>_<id>.pdf`, then `<title>_<n>.pdf`.
///
/// An existing `<title>_<id>.pdf` always belongs to the paper. An existing
/// `<title>.pdf` only does when it was [claimed](Self::claim) or the paper's
/// `.metadata` record points at it.
#[derive(Debug)]
pub struct PathAllocator {
    dir: PathBuf,
    max_len: usize,
    reserved: HashSet<PathBuf>,
    /// Path to version-less id of the paper stored there
    claims: HashMap<PathBuf, String>,
}

impl PathAllocator {
    pub fn new(dir: impl Into<PathBuf>, max_len: usize) -> Self {
        Self {
            dir: dir.into(),
            max_len,
            reserved: HashSet::new(),
            claims: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remember that `path` holds the paper `id`
    pub fn claim(&mut self, path: impl Into<PathBuf>, id: &str) {
        self.claims
            .insert(path.into(), strip_version(id).to_string());
    }

    fn is_free(&self, path: &Path) -> bool {
        !self.reserved.contains(path) && !path.exists()
    }

    fn is_owned_by(&self, path: &Path, paper: &Paper) -> bool {
        if self.claims.get(path).is_some_and(|id| id == paper.base_id()) {
            return true;
        }
        recorded_file(&self.dir, paper.id())
            .is_some_and(|file| file.file_name().is_some() && file.file_name() == path.file_name())
    }

    /// Choose and reserve a target path for `paper`
    pub fn allocate(&mut self, paper: &Paper) -> Allocation {
        let stem = sanitize_title(paper.title(), self.max_len);
        let primary = self.dir.join(format!("{}.pdf", stem));
        let with_id = self
            .dir
            .join(format!("{}_{}.pdf", stem, id_for_filename(paper.id())));

        if !self.reserved.contains(&with_id) && with_id.exists() {
            return Allocation::Existing(with_id);
        }
        if !self.reserved.contains(&primary) {
            if !primary.exists() {
                return self.reserve(primary);
            }
            if self.is_owned_by(&primary, paper) {
                return Allocation::Existing(primary);
            }
        }
        if self.is_free(&with_id) {
            return self.reserve(with_id);
        }

        let mut n = 1;
        loop {
            let candidate = self.dir.join(format!("{}_{}.pdf", stem, n));
            if self.is_free(&candidate) {
                return self.reserve(candidate);
            }
            n += 1;
        }
    }

    fn reserve(&mut self, path: PathBuf) -> Allocation {
        self.reserved.insert(path.clone());
        Allocation::Fresh(path)
    }

    /// Give a reservation back after a failed download
    pub fn release(&mut self, path: &Path) {
        self.reserved.remove(path);
    }
}

/// Staging path a download streams into before it is renamed into place
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Look for an arXiv id at the end of a file stem such as `Title_2301.00001v2`
pub fn id_from_stem(stem: &str) -> Option<String> {
    let (_, tail) = stem.rsplit_once('_')?;
    if crate::arxiv::is_valid_arxiv_id(tail) {
        return Some(tail.to_string());
    }
    // Legacy ids were written as `archive_NNNNNNN`.
    let mut parts = stem.rsplitn(3, '_');
    let number = parts.next()?;
    let archive = parts.next()?;
    let legacy = format!("{}/{}", archive, number);
    crate::arxiv::is_valid_arxiv_id(&legacy).then_some(legacy)
}
