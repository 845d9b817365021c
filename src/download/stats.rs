//! Per-batch download statistics and per-paper outcomes.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::Paper;

/// Terminal state of one paper in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl DownloadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadState::Completed => "completed",
            DownloadState::Failed => "failed",
            DownloadState::Skipped => "skipped",
            DownloadState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one paper
#[derive(Debug, Clone, Serialize)]
pub struct PaperOutcome {
    pub paper: Paper,
    pub state: DownloadState,
    /// Final file for completed papers, the existing file for skipped ones
    pub path: Option<PathBuf>,
    pub bytes: u64,
    /// Failure or skip reason
    pub reason: Option<String>,
}

impl PaperOutcome {
    pub fn completed(paper: Paper, path: PathBuf, bytes: u64) -> Self {
        Self {
            paper,
            state: DownloadState::Completed,
            path: Some(path),
            bytes,
            reason: None,
        }
    }

    pub fn failed(paper: Paper, reason: impl Into<String>) -> Self {
        Self {
            paper,
            state: DownloadState::Failed,
            path: None,
            bytes: 0,
            reason: Some(reason.into()),
        }
    }

    pub fn skipped(paper: Paper, path: Option<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            paper,
            state: DownloadState::Skipped,
            path,
            bytes: 0,
            reason: Some(reason.into()),
        }
    }

    pub fn cancelled(paper: Paper) -> Self {
        Self {
            paper,
            state: DownloadState::Cancelled,
            path: None,
            bytes: 0,
            reason: None,
        }
    }

    /// File name of the outcome's path, if any
    pub fn file_name(&self) -> Option<String> {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Aggregate counts for one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DownloadStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Papers never started because the batch was cancelled
    pub cancelled: usize,
    pub total_bytes: u64,
    pub elapsed: Duration,
}

impl DownloadStats {
    /// Fold a batch of outcomes into stats
    pub fn from_outcomes(outcomes: &[PaperOutcome], elapsed: Duration) -> Self {
        let mut stats = Self {
            total: outcomes.len(),
            elapsed,
            ..Default::default()
        };
        for outcome in outcomes {
            stats.record(outcome);
        }
        stats
    }

    fn record(&mut self, outcome: &PaperOutcome) {
        match outcome.state {
            DownloadState::Completed => {
                self.successful += 1;
                self.total_bytes += outcome.bytes;
            }
            DownloadState::Failed => self.failed += 1,
            DownloadState::Skipped => self.skipped += 1,
            DownloadState::Cancelled => self.cancelled += 1,
        }
    }

    /// Share of the batch that downloaded successfully, 0.0 for an empty batch
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64
    }

    /// Bytes per second over the batch's wall-clock time
    pub fn average_speed(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / secs
    }

    pub fn total_mb(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }
}

impl fmt::Display for DownloadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} papers: {} downloaded, {} failed, {} skipped",
            self.total, self.successful, self.failed, self.skipped
        )?;
        if self.cancelled > 0 {
            write!(f, ", {} cancelled", self.cancelled)?;
        }
        write!(
            f,
            " ({:.1}% success, {:.2} MB in {:.1}s)",
            self.success_rate() * 100.0,
            self.total_mb(),
            self.elapsed.as_secs_f64()
        )
    }
}

/// Stats plus one outcome per input paper, in input order
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub stats: DownloadStats,
    pub outcomes: Vec<PaperOutcome>,
}

impl DownloadReport {
    pub fn new(outcomes: Vec<PaperOutcome>, elapsed: Duration) -> Self {
        Self {
            stats: DownloadStats::from_outcomes(&outcomes, elapsed),
            outcomes,
        }
    }

    /// Outcomes in a given state
    pub fn with_state(&self, state: DownloadState) -> impl Iterator<Item = &PaperOutcome> {
        self.outcomes.iter().filter(move |o| o.state == state)
    }
}
