use anyhow::{bail, Context, Result};
use arxiv_fetch::config::{find_config_file, load_config, user_config_path, Config, LogFormat};
use arxiv_fetch::download::{write_summary, CancelHandle, DownloadReport};
use arxiv_fetch::filters::{CategoryFilter, DuplicateFilter, FilterChain, MetadataRecorder};
use arxiv_fetch::models::{
    DateRange, FieldQuery, Paper, SearchField, SearchRequest, SortBy, SortOrder,
};
use arxiv_fetch::{ui, ArxivClient};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// arxiv-fetch - Search arXiv and batch-download papers
#[derive(Parser, Debug)]
#[command(name = "arxiv-fetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search the arXiv API and download papers as PDFs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bypass the on-disk cache for this command
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table on a terminal, JSON otherwise
    Auto,
    Table,
    Json,
    Plain,
}

/// Field the query text is scoped to
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FieldArg {
    All,
    Title,
    Author,
    Abstract,
    Comment,
    JournalRef,
    Category,
}

impl From<FieldArg> for SearchField {
    fn from(field: FieldArg) -> Self {
        match field {
            FieldArg::All => SearchField::All,
            FieldArg::Title => SearchField::Title,
            FieldArg::Author => SearchField::Author,
            FieldArg::Abstract => SearchField::Abstract,
            FieldArg::Comment => SearchField::Comment,
            FieldArg::JournalRef => SearchField::JournalRef,
            FieldArg::Category => SearchField::Category,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortField {
    Relevance,
    Submitted,
    Updated,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Order {
    Asc,
    Desc,
}

/// Which papers to select
#[derive(Args, Debug, Default)]
struct Selection {
    /// Query text; passed through as written unless --field is given
    query: Option<String>,

    /// Scope each word of the query to this field
    #[arg(long, value_enum)]
    field: Option<FieldArg>,

    /// Earliest submission date (YYYY-MM-DD)
    #[arg(long)]
    date_from: Option<String>,

    /// Latest submission date (YYYY-MM-DD)
    #[arg(long)]
    date_to: Option<String>,

    /// Only papers submitted today
    #[arg(long, conflicts_with_all = ["yesterday", "last_week", "date_from", "date_to"])]
    today: bool,

    /// Only papers submitted yesterday
    #[arg(long, conflicts_with_all = ["last_week", "date_from", "date_to"])]
    yesterday: bool,

    /// Papers submitted in the last seven days
    #[arg(long, conflicts_with_all = ["date_from", "date_to"])]
    last_week: bool,

    /// Category code, e.g. cs.AI (repeatable)
    #[arg(long, short)]
    category: Vec<String>,

    /// Explicit arXiv id (repeatable)
    #[arg(long)]
    id: Vec<String>,

    /// Maximum number of results
    #[arg(long, short)]
    max_results: Option<usize>,

    /// Offset of the first result
    #[arg(long, default_value_t = 0)]
    start: usize,

    #[arg(long, value_enum)]
    sort_by: Option<SortField>,

    #[arg(long, value_enum)]
    order: Option<Order>,
}

impl Selection {
    fn date_range(&self) -> Result<Option<DateRange>> {
        let range = if self.today {
            Some(DateRange::today())
        } else if self.yesterday {
            Some(DateRange::yesterday())
        } else if self.last_week {
            Some(DateRange::last_days(7))
        } else if self.date_from.is_some() || self.date_to.is_some() {
            Some(DateRange::parse(
                self.date_from.as_deref(),
                self.date_to.as_deref(),
            )?)
        } else {
            None
        };
        Ok(range)
    }

    fn to_request(&self, config: &Config) -> Result<SearchRequest> {
        let query = self.query.clone().or_else(|| {
            (self.category.is_empty() && self.id.is_empty())
                .then(|| config.search.default_query.clone())
        });

        let mut request = match (query, self.field) {
            (Some(text), Some(field)) if field != FieldArg::All => SearchRequest::fields(vec![
                FieldQuery::new(field.into(), text.split_whitespace()),
            ]),
            (Some(text), _) => SearchRequest::new(text),
            (None, _) => SearchRequest::default(),
        };

        request = request
            .ids(self.id.iter().cloned())
            .max_results(
                self.max_results
                    .unwrap_or(config.search.default_max_results),
            )
            .start(self.start)
            .sort_by(match self.sort_by {
                Some(SortField::Submitted) => SortBy::SubmittedDate,
                Some(SortField::Updated) => SortBy::LastUpdatedDate,
                Some(SortField::Relevance) | None => SortBy::Relevance,
            })
            .sort_order(match self.order {
                Some(Order::Asc) => SortOrder::Ascending,
                Some(Order::Desc) | None => SortOrder::Descending,
            });
        for category in &self.category {
            request = request.category(category.clone());
        }
        if let Some(range) = self.date_range()? {
            request = request.date_range(range);
        }
        Ok(request)
    }

    fn describe(&self, config: &Config) -> String {
        self.query
            .clone()
            .or_else(|| (!self.category.is_empty()).then(|| self.category.join(", ")))
            .or_else(|| (!self.id.is_empty()).then(|| self.id.join(", ")))
            .unwrap_or_else(|| config.search.default_query.clone())
    }
}

/// Where and how to download
#[derive(Args, Debug, Default)]
struct DownloadArgs {
    /// Target directory (defaults to the configured one)
    #[arg(long, short)]
    dir: Option<PathBuf>,

    /// Downloads in flight; 1 downloads sequentially with a pause between papers
    #[arg(long)]
    concurrency: Option<usize>,

    /// Download papers even if already seen in the target directory
    #[arg(long)]
    no_dedup: bool,

    /// Only download papers in these categories (repeatable)
    #[arg(long)]
    allow_category: Vec<String>,

    /// Never download papers in these categories (repeatable)
    #[arg(long)]
    block_category: Vec<String>,

    /// Skip writing .metadata/<id>.json records; reruns then only
    /// recognise files saved as <title>_<id>.pdf
    #[arg(long)]
    no_metadata: bool,

    /// Write a Markdown summary of the batch into the target directory
    #[arg(long)]
    summary: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search arXiv and list matching papers
    #[command(alias = "s")]
    Search {
        #[command(flatten)]
        selection: Selection,
    },

    /// Search arXiv and download the matching papers
    #[command(alias = "d")]
    Download {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Download specific papers by id
    Get {
        /// arXiv ids, optionally versioned or as abs/pdf URLs
        #[arg(required = true)]
        ids: Vec<String>,

        /// Print metadata instead of downloading
        #[arg(long)]
        info: bool,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Manage the on-disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show or create configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Remove cached entries
    Clear {
        /// Only remove expired or unreadable entries
        #[arg(long)]
        expired: bool,
    },
    /// Show cache statistics
    Stats,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default configuration file
    Init {
        /// Destination (defaults to the user config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("arxiv_fetch={}", level)));

    let json = config.logging.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    match format {
        OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
        OutputFormat::Auto => OutputFormat::Json,
        other => other,
    }
}

fn output_papers(papers: &[Paper], format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(papers)?),
        OutputFormat::Plain => {
            for paper in papers {
                println!("{} - {}", paper.id(), paper.title());
                println!("  Authors: {}", paper.authors_str());
                println!("  PDF: {}", paper.pdf_url());
                println!();
            }
        }
        _ => println!("{}", ui::paper_table(papers)),
    }
    Ok(())
}

fn build_filters(args: &DownloadArgs, dir: &std::path::Path) -> FilterChain {
    let mut chain = FilterChain::new();
    if !args.no_dedup {
        chain.register(DuplicateFilter::for_directory(dir));
    }
    if !args.allow_category.is_empty() || !args.block_category.is_empty() {
        chain.register(CategoryFilter::new(
            args.allow_category.iter().cloned(),
            args.block_category.iter().cloned(),
        ));
    }
    if !args.no_metadata {
        chain.register(MetadataRecorder::new(dir));
    }
    chain
}

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// Stop scheduling papers, let running fetches finish
    Drain,
    /// Quit immediately
    Abort,
}

fn on_interrupt(cancel: &CancelHandle) -> Interrupt {
    if cancel.is_cancelled() {
        return Interrupt::Abort;
    }
    cancel.cancel();
    Interrupt::Drain
}

async fn run_download(
    client: &ArxivClient,
    config: &Config,
    papers: Vec<Paper>,
    args: &DownloadArgs,
    quiet: bool,
    format: OutputFormat,
) -> Result<DownloadReport> {
    let options = config.download_options(args.dir.as_deref());
    let dir = options.directory.clone();
    let concurrency = args.concurrency.unwrap_or(config.downloads.max_concurrent);

    let progress = if quiet || !ui::is_terminal() {
        ProgressBar::hidden()
    } else {
        ui::create_progress_bar(papers.len() as u64, "Downloading")
    };
    let bar = progress.clone();
    let pipeline = client
        .pipeline(options)
        .with_filters(build_filters(args, &dir))
        .on_progress(move |outcome| {
            bar.inc(1);
            bar.set_message(outcome.paper.id().to_string());
        });

    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&cancel) {
                Interrupt::Drain => {
                    tracing::warn!("Interrupted, finishing in-flight downloads (Ctrl-C again to quit)");
                }
                Interrupt::Abort => {
                    tracing::warn!("Interrupted twice, exiting");
                    std::process::exit(130);
                }
            }
        }
    });

    let report = pipeline.download_with_report(&papers, concurrency).await;
    progress.finish_and_clear();

    if resolve_format(format) == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        ui::print_download_stats(&report.stats);
        ui::print_failures(&report);
    }

    if args.summary {
        let path = write_summary(&dir, &report).context("Failed to write download summary")?;
        if !quiet {
            ui::print_status(
                ui::Status::Info,
                &format!("Summary written to {}", path.display()),
            );
        }
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(config_path.as_deref())?;
    if cli.no_cache {
        config.cache.enabled = false;
    }

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "Using config file");
    }

    match &cli.command {
        Commands::Search { selection } => {
            let client = ArxivClient::from_config(&config)?;
            let request = selection.to_request(&config)?;

            let started = Instant::now();
            let page = client.search_page(&request).await?;
            if !cli.quiet && resolve_format(cli.output) == OutputFormat::Table {
                ui::print_search_header(
                    &selection.describe(&config),
                    page.papers.len(),
                    page.total_results,
                    started.elapsed(),
                );
            }
            output_papers(&page.papers, cli.output)?;
        }

        Commands::Download {
            selection,
            download,
        } => {
            let client = ArxivClient::from_config(&config)?;
            let request = selection.to_request(&config)?;
            let papers = client.search(&request).await?;
            if papers.is_empty() {
                if !cli.quiet {
                    ui::print_status(ui::Status::Warning, "No papers matched the search");
                }
                return Ok(());
            }
            if !cli.quiet {
                ui::print_status(
                    ui::Status::Search,
                    &format!("Found {} papers", papers.len().to_string().green()),
                );
            }
            run_download(&client, &config, papers, download, cli.quiet, cli.output).await?;
        }

        Commands::Get {
            ids,
            info,
            download,
        } => {
            let client = ArxivClient::from_config(&config)?;
            let papers = client.get_papers(ids).await?;
            if papers.len() < ids.len() && !cli.quiet {
                ui::print_status(
                    ui::Status::Warning,
                    &format!("{} of {} ids matched no paper", ids.len() - papers.len(), ids.len()),
                );
            }
            if papers.is_empty() {
                bail!("No papers found for the given ids");
            }
            if *info {
                match resolve_format(cli.output) {
                    OutputFormat::Table => papers.iter().for_each(ui::print_paper_details),
                    _ => output_papers(&papers, cli.output)?,
                }
            } else {
                run_download(&client, &config, papers, download, cli.quiet, cli.output).await?;
            }
        }

        Commands::Cache { action } => {
            let client = ArxivClient::from_config(&config)?;
            match action {
                CacheAction::Clear { expired: true } => {
                    let cleared = client.clear_expired_cache();
                    ui::print_status(
                        ui::Status::Success,
                        &format!(
                            "Removed {} expired entries ({} searches, {} papers)",
                            cleared.total(),
                            cleared.searches,
                            cleared.papers
                        ),
                    );
                }
                CacheAction::Clear { expired: false } => {
                    client.cache().clear_all()?;
                    ui::print_status(ui::Status::Success, "Cache cleared");
                }
                CacheAction::Stats => {
                    let stats = client.cache_stats();
                    if resolve_format(cli.output) == OutputFormat::Json {
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    } else {
                        ui::print_cache_stats(&stats);
                    }
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => print!("{}", config.to_toml()?),
            ConfigAction::Init { path, force } => {
                let path = match path.clone().or_else(user_config_path) {
                    Some(path) => path,
                    None => bail!("Could not determine a config directory; pass a path"),
                };
                if path.exists() && !force {
                    bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                Config::default().save(&path)?;
                ui::print_status(
                    ui::Status::Success,
                    &format!("Wrote {}", path.display()),
                );
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["arxiv-fetch", "search"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(!cli.no_cache);
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["arxiv-fetch", "-vv", "search"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["arxiv-fetch", "search", "--verbose"]);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_cli_output_format() {
        let cli = Cli::parse_from(["arxiv-fetch", "-o", "json", "search"]);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_search_defaults_to_configured_query() {
        let cli = Cli::parse_from(["arxiv-fetch", "search"]);
        let Commands::Search { selection } = cli.command else {
            panic!("Expected Search command");
        };
        let request = selection.to_request(&Config::default()).unwrap();
        assert_eq!(request, SearchRequest::new("cat:cs.AI").max_results(10));
    }

    #[test]
    fn test_search_with_options() {
        let cli = Cli::parse_from([
            "arxiv-fetch",
            "search",
            "graph neural",
            "--field",
            "title",
            "--category",
            "cs.LG",
            "--date-from",
            "2024-01-01",
            "--max-results",
            "25",
            "--sort-by",
            "submitted",
            "--order",
            "asc",
        ]);
        let Commands::Search { selection } = cli.command else {
            panic!("Expected Search command");
        };
        let request = selection.to_request(&Config::default()).unwrap();
        assert_eq!(request.max_results, 25);
        assert_eq!(request.categories, vec!["cs.LG".to_string()]);
        assert_eq!(request.sort_by, SortBy::SubmittedDate);
        assert_eq!(request.sort_order, SortOrder::Ascending);
        assert!(request.date_range.is_some());
        assert_eq!(
            request.query,
            Some(arxiv_fetch::models::Query::Fields(vec![FieldQuery::new(
                SearchField::Title,
                ["graph", "neural"]
            )]))
        );
    }

    #[test]
    fn test_category_only_search_has_no_query() {
        let cli = Cli::parse_from(["arxiv-fetch", "search", "--category", "cs.AI"]);
        let Commands::Search { selection } = cli.command else {
            panic!("Expected Search command");
        };
        let request = selection.to_request(&Config::default()).unwrap();
        assert!(request.query.is_none());
        assert!(request.has_categories());
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let cli = Cli::parse_from(["arxiv-fetch", "search", "x", "--date-to", "2024/01/01"]);
        let Commands::Search { selection } = cli.command else {
            panic!("Expected Search command");
        };
        assert!(selection.to_request(&Config::default()).is_err());
    }

    #[test]
    fn test_date_shortcuts_conflict() {
        let result = Cli::try_parse_from(["arxiv-fetch", "search", "--today", "--last-week"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_download_command() {
        let cli = Cli::parse_from([
            "arxiv-fetch",
            "download",
            "cat:cs.AI",
            "--dir",
            "/tmp/papers",
            "--concurrency",
            "1",
            "--no-dedup",
            "--block-category",
            "cs.CR",
            "--summary",
        ]);
        match cli.command {
            Commands::Download { download, .. } => {
                assert_eq!(download.dir, Some(PathBuf::from("/tmp/papers")));
                assert_eq!(download.concurrency, Some(1));
                assert!(download.no_dedup);
                assert_eq!(download.block_category, vec!["cs.CR".to_string()]);
                assert!(download.summary);
            }
            _ => panic!("Expected Download command"),
        }
    }

    #[test]
    fn test_get_requires_ids() {
        assert!(Cli::try_parse_from(["arxiv-fetch", "get"]).is_err());
        let cli = Cli::parse_from(["arxiv-fetch", "get", "2301.00001", "arXiv:2301.00002v2"]);
        match cli.command {
            Commands::Get { ids, .. } => assert_eq!(ids.len(), 2),
            _ => panic!("Expected Get command"),
        }
    }

    #[test]
    fn test_second_interrupt_aborts() {
        let cancel = CancelHandle::default();
        assert_eq!(on_interrupt(&cancel), Interrupt::Drain);
        assert!(cancel.is_cancelled());
        assert_eq!(on_interrupt(&cancel), Interrupt::Abort);
    }

    #[test]
    fn test_build_filters() {
        let dir = tempfile::tempdir().unwrap();
        let args = DownloadArgs {
            allow_category: vec!["cs.AI".to_string()],
            ..Default::default()
        };
        let chain = build_filters(&args, dir.path());
        assert_eq!(
            chain.names(),
            vec!["duplicate_check", "category_filter", "metadata"]
        );

        let bare = DownloadArgs {
            no_dedup: true,
            no_metadata: true,
            ..Default::default()
        };
        assert!(build_filters(&bare, dir.path()).is_empty());
    }
}
