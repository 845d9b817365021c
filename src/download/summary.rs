//! Markdown summary of a download batch.

use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::stats::DownloadReport;
use crate::error::ArxivError;

/// Characters of abstract shown per paper
const ABSTRACT_PREVIEW: usize = 200;

/// `download_summary_<YYYYMMDD_HHMM>.md`
pub fn summary_file_name(at: &DateTime<Local>) -> String {
    format!("download_summary_{}.md", at.format("%Y%m%d_%H%M"))
}

/// Render the summary document
pub fn render_summary(report: &DownloadReport, generated_at: &DateTime<Local>) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    let _ = writeln!(out, "# arXiv Download Summary\n");
    let _ = writeln!(out, "Generated: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "## Statistics\n");
    let _ = writeln!(out, "- Total papers: {}", stats.total);
    let _ = writeln!(out, "- Successful downloads: {}", stats.successful);
    let _ = writeln!(out, "- Failed downloads: {}", stats.failed);
    let _ = writeln!(out, "- Skipped downloads: {}", stats.skipped);
    if stats.cancelled > 0 {
        let _ = writeln!(out, "- Cancelled: {}", stats.cancelled);
    }
    let _ = writeln!(out, "- Success rate: {:.1}%", stats.success_rate() * 100.0);
    if stats.total_bytes > 0 {
        let _ = writeln!(out, "- Total size: {:.2} MB", stats.total_mb());
        let _ = writeln!(
            out,
            "- Average speed: {:.2} MB/s",
            stats.average_speed() / (1024.0 * 1024.0)
        );
    }

    let _ = writeln!(out, "\n## Paper List\n");
    for (i, outcome) in report.outcomes.iter().enumerate() {
        let paper = &outcome.paper;
        let _ = writeln!(out, "### {}. {}", i + 1, paper.title());
        let _ = writeln!(out, "- **Paper ID**: {}", paper.id());
        let _ = writeln!(out, "- **Authors**: {}", paper.authors_str());
        let _ = writeln!(out, "- **Categories**: {}", paper.categories_str());
        let _ = writeln!(out, "- **Published**: {}", paper.published());
        let _ = writeln!(out, "- **Abstract**: {}", paper.short_abstract(ABSTRACT_PREVIEW));
        let _ = writeln!(out, "- **Status**: {}", outcome.state);
        if let Some(name) = outcome.file_name() {
            let _ = writeln!(out, "- **File**: {}", name);
        }
        if let Some(reason) = &outcome.reason {
            let _ = writeln!(out, "- **Note**: {}", reason);
        }
        out.push('\n');
    }

    out
}

/// Write the summary into `dir` and return its path
pub fn write_summary(dir: &Path, report: &DownloadReport) -> Result<PathBuf, ArxivError> {
    let now = Local::now();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(summary_file_name(&now));
    std::fs::write(&path, render_summary(report, &now))?;
    tracing::info!(path = %path.display(), "Summary document generated");
    Ok(path)
}
