//! CLI UI utilities for terminal output.
//!
//! Colored status lines, paper tables, progress bars and the end-of-batch
//! statistics block used by the `arxiv-fetch` binary.

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::download::{DownloadReport, DownloadState, DownloadStats};
use crate::models::Paper;
use crate::utils::CacheStats;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Skipped,
    Download,
    Search,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Skipped => "○",
        Status::Download => "↓",
        Status::Search => "🔍",
    }
}

/// Print a styled status message to stderr.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
        Status::Skipped => eprintln!("{} {}", icon.white().dimmed(), msg),
        Status::Download => eprintln!("{} {}", icon.magenta(), msg),
        Status::Search => eprintln!("{} {}", icon.yellow(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print search results header.
pub fn print_search_header(query: &str, count: usize, total: Option<usize>, duration: Duration) {
    println!();
    println!(
        "{} Search results for: \"{}\"",
        status_icon(Status::Search).yellow().bold(),
        query.cyan().bold()
    );
    let found = match total {
        Some(total) => format!("{} of {}", count, format_number(total)),
        None => count.to_string(),
    };
    println!(
        "{} Showing {} papers in {:.2}s",
        "─".repeat(30).dimmed(),
        found.green().bold(),
        duration.as_secs_f64()
    );
    println!();
}

/// Render papers as a table.
pub fn paper_table(papers: &[Paper]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Title", "Authors", "Categories", "Published"]);

    for paper in papers {
        table.add_row(vec![
            Cell::new(paper.id()),
            Cell::new(truncate_with_ellipsis(paper.title(), 60)).add_attribute(Attribute::Bold),
            Cell::new(truncate_with_ellipsis(&paper.authors_str(), 30)),
            Cell::new(truncate_with_ellipsis(&paper.categories_str(), 20)),
            Cell::new(paper.published().get(..10).unwrap_or(paper.published())),
        ]);
    }
    table
}

/// Print one paper with its abstract.
pub fn print_paper_details(paper: &Paper) {
    println!();
    println!("{}", paper.title().blue().bold());
    println!("  {} {}", "ID:".dimmed(), paper.id().yellow());
    println!("  {} {}", "Authors:".dimmed(), paper.authors_str());
    println!("  {} {}", "Categories:".dimmed(), paper.categories_str());
    println!("  {} {}", "Published:".dimmed(), paper.published());
    if paper.updated() != paper.published() {
        println!("  {} {}", "Updated:".dimmed(), paper.updated());
    }
    if let Some(doi) = paper.doi() {
        println!("  {} {}", "DOI:".dimmed(), doi);
    }
    if let Some(journal_ref) = paper.journal_ref() {
        println!("  {} {}", "Journal:".dimmed(), journal_ref);
    }
    println!("  {} {}", "Abstract page:".dimmed(), paper.abs_url());
    println!("  {} {}", "PDF:".dimmed(), paper.pdf_url());
    println!();
    println!("{}", paper.r#abstract());
}

/// Print the end-of-batch statistics block.
pub fn print_download_stats(stats: &DownloadStats) {
    print_section("Download Summary");
    println!("  Total papers:   {}", stats.total);
    println!("  Successful:     {}", stats.successful.to_string().green());
    println!("  Failed:         {}", stats.failed.to_string().red());
    println!("  Skipped:        {}", stats.skipped.to_string().yellow());
    if stats.cancelled > 0 {
        println!("  Cancelled:      {}", stats.cancelled.to_string().yellow());
    }
    println!("  Success rate:   {:.1}%", stats.success_rate() * 100.0);
    println!("  Total size:     {}", format_file_size(stats.total_bytes));
    println!("  Elapsed:        {:.1}s", stats.elapsed.as_secs_f64());
    println!(
        "  Average speed:  {}/s",
        format_file_size(stats.average_speed() as u64)
    );
}

/// Print failed papers with their reasons.
pub fn print_failures(report: &DownloadReport) {
    let failed: Vec<_> = report.with_state(DownloadState::Failed).collect();
    if failed.is_empty() {
        return;
    }
    print_section("Failed Downloads");
    for outcome in failed {
        println!(
            "  {} {} {}",
            status_icon(Status::Error).red(),
            outcome.paper.id().yellow(),
            outcome.reason.as_deref().unwrap_or("unknown error").dimmed()
        );
    }
}

/// Print cache statistics.
pub fn print_cache_stats(stats: &CacheStats) {
    print_section("Cache");
    let enabled = if stats.enabled {
        "enabled".green().to_string()
    } else {
        "disabled".red().to_string()
    };
    println!("  Status:     {}", enabled);
    println!("  Directory:  {}", stats.cache_dir.display());
    println!(
        "  Searches:   {} entries, {} KB (ttl {}s)",
        stats.search_count,
        stats.search_size_kb,
        stats.ttl_search.as_secs()
    );
    println!(
        "  Papers:     {} entries, {} KB (ttl {}s)",
        stats.paper_count,
        stats.paper_size_kb,
        stats.ttl_paper.as_secs()
    );
    println!("  Total:      {} KB", stats.total_size_kb);
}

/// Create a progress bar for a download batch.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{msg}: {bar:40.cyan/blue} {pos}/{len} ({percent}%)")
        .map(|s| s.progress_chars("█▓▒░ "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb
}

/// Format a number with commas.
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Truncate text to at most `max_chars` characters, ellipsis included.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Get a human-readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperBuilder;

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert_eq!(status_icon(Status::Search), "🔍");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Hello", 10), "Hello");
        assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
        assert_eq!(truncate_with_ellipsis("Hello", 3), "...");
        assert_eq!(truncate_with_ellipsis("Über große Modelle", 8), "Über...");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1000000), "1,000,000");
        assert_eq!(format_number(123), "123");
        assert_eq!(format_number(0), "0");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(500), "500 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1048576), "1.00 MB");
    }

    #[test]
    fn test_paper_table_has_row_per_paper() {
        let paper = PaperBuilder::new(
            "2301.00001v1",
            "Attention Is Still All You Need",
            "http://arxiv.org/pdf/2301.00001v1",
        )
        .authors(["A. Author"])
        .categories(["cs.AI"])
        .published("2023-01-01T00:00:00Z")
        .build()
        .unwrap();

        let table = paper_table(&[paper.clone(), paper]);
        assert_eq!(table.row_iter().count(), 2);
        assert!(table.to_string().contains("2301.00001v1"));
    }
}
