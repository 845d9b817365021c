//! Bounded-concurrency PDF downloads.

use futures_util::future::join_all;
use futures_util::StreamExt;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::stats::{DownloadReport, DownloadStats, PaperOutcome};
use crate::error::ArxivError;
use crate::filters::FilterChain;
use crate::models::Paper;
use crate::utils::filename::{partial_path, Allocation, PathAllocator, DEFAULT_MAX_FILENAME_LENGTH};
use crate::utils::HttpClient;

/// Default number of downloads in flight
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Callback invoked once per paper as it reaches a terminal state
pub type ProgressCallback = Arc<dyn Fn(&PaperOutcome) + Send + Sync>;

/// Settings for a [`DownloadPipeline`]
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Target directory, created on demand
    pub directory: PathBuf,
    /// Timeout for one PDF, body included
    pub timeout: Duration,
    /// Pause between fetches when downloading sequentially
    pub request_delay: Duration,
    pub max_filename_length: usize,
}

impl DownloadOptions {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            timeout: Duration::from_secs(60),
            request_delay: Duration::from_secs(1),
            max_filename_length: DEFAULT_MAX_FILENAME_LENGTH,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn max_filename_length(mut self, len: usize) -> Self {
        self.max_filename_length = len;
        self
    }
}

/// Stops a running batch from starting further papers
///
/// Papers already being fetched run to completion; the rest are reported as
/// cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so the pipeline can run again
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Shared state of one batch; guarded so that concurrent papers never pick
/// the same file
struct Batch {
    allocator: PathAllocator,
    ids: HashSet<String>,
}

/// Downloads papers into a directory
pub struct DownloadPipeline {
    http: HttpClient,
    options: DownloadOptions,
    filters: FilterChain,
    cancel: CancelHandle,
    progress: Option<ProgressCallback>,
    /// Files written by earlier batches, keyed by path
    completed: Mutex<HashMap<PathBuf, String>>,
}

impl std::fmt::Debug for DownloadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadPipeline")
            .field("options", &self.options)
            .field("filters", &self.filters)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl DownloadPipeline {
    pub fn new(http: HttpClient, options: DownloadOptions) -> Self {
        Self {
            http,
            options,
            filters: FilterChain::new(),
            cancel: CancelHandle::default(),
            progress: None,
            completed: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the filter chain
    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    /// Register a progress callback
    pub fn on_progress(mut self, callback: impl Fn(&PaperOutcome) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterChain {
        &mut self.filters
    }

    pub fn directory(&self) -> &Path {
        &self.options.directory
    }

    /// Handle that cancels this pipeline's batches
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Download `papers`, returning aggregate statistics
    ///
    /// Individual failures are counted, never returned as errors.
    pub async fn download(&self, papers: &[Paper], concurrency: usize) -> DownloadStats {
        self.download_with_report(papers, concurrency).await.stats
    }

    /// Download `papers`, returning statistics and one outcome per paper
    ///
    /// With `concurrency <= 1` papers are fetched one after another with the
    /// configured politeness delay in between. Otherwise up to `concurrency`
    /// fetches run at once. Outcomes are reported in input order.
    #[instrument(skip_all, fields(papers = papers.len(), concurrency = concurrency, dir = %self.options.directory.display()))]
    pub async fn download_with_report(&self, papers: &[Paper], concurrency: usize) -> DownloadReport {
        let started = tokio::time::Instant::now();

        if let Err(e) = tokio::fs::create_dir_all(&self.options.directory).await {
            warn!(error = %e, "Cannot create download directory");
            let reason = format!("cannot create {}: {}", self.options.directory.display(), e);
            let outcomes = papers
                .iter()
                .map(|p| self.finish(PaperOutcome::failed(p.clone(), reason.clone())))
                .collect();
            return DownloadReport::new(outcomes, started.elapsed());
        }

        let mut allocator = PathAllocator::new(
            &self.options.directory,
            self.options.max_filename_length,
        );
        if let Ok(completed) = self.completed.lock() {
            for (path, id) in completed.iter() {
                allocator.claim(path, id);
            }
        }
        let batch = Mutex::new(Batch {
            allocator,
            ids: HashSet::new(),
        });

        let outcomes = if concurrency <= 1 {
            self.run_sequential(papers, &batch).await
        } else {
            self.run_concurrent(papers, &batch, concurrency).await
        };

        let report = DownloadReport::new(outcomes, started.elapsed());
        info!(stats = %report.stats, "Download batch finished");
        report
    }

    async fn run_sequential(&self, papers: &[Paper], batch: &Mutex<Batch>) -> Vec<PaperOutcome> {
        let mut outcomes = Vec::with_capacity(papers.len());

        for (i, paper) in papers.iter().enumerate() {
            let (outcome, fetched) = self.process(paper, batch).await;
            outcomes.push(outcome);

            let more = i + 1 < papers.len();
            if fetched && more && !self.cancel.is_cancelled() && !self.options.request_delay.is_zero() {
                tokio::time::sleep(self.options.request_delay).await;
            }
        }
        outcomes
    }

    async fn run_concurrent(
        &self,
        papers: &[Paper],
        batch: &Mutex<Batch>,
        concurrency: usize,
    ) -> Vec<PaperOutcome> {
        let semaphore = Semaphore::new(concurrency);

        let tasks = papers.iter().map(|paper| {
            let semaphore = &semaphore;
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return self.finish(PaperOutcome::cancelled(paper.clone()));
                };
                self.process(paper, batch).await.0
            }
        });

        join_all(tasks).await
    }

    /// Drive one paper to a terminal state; the flag tells whether a fetch was attempted
    #[instrument(skip(self, batch, paper), fields(paper_id = paper.id()))]
    async fn process(&self, paper: &Paper, batch: &Mutex<Batch>) -> (PaperOutcome, bool) {
        if self.cancel.is_cancelled() {
            return (self.finish(PaperOutcome::cancelled(paper.clone())), false);
        }

        let target = match self.allocate(paper, batch) {
            Ok(path) => path,
            Err(outcome) => return (self.finish(outcome), false),
        };

        if let Err(filter) = self.filters.admit(paper) {
            self.release(batch, &target);
            let outcome = PaperOutcome::skipped(paper.clone(), None, format!("rejected by {}", filter));
            return (self.finish(outcome), false);
        }

        let outcome = match self.fetch(paper, &target).await {
            Ok(bytes) => {
                info!(path = %target.display(), bytes, "Download completed");
                if let Ok(mut completed) = self.completed.lock() {
                    completed.insert(target.clone(), paper.id().to_string());
                }
                self.filters.record(paper, Some(&target), true);
                PaperOutcome::completed(paper.clone(), target, bytes)
            }
            Err(e) => {
                warn!(error = %e, "Download failed");
                self.release(batch, &target);
                self.filters.record(paper, None, false);
                PaperOutcome::failed(paper.clone(), e.to_string())
            }
        };
        (self.finish(outcome), true)
    }

    fn allocate(&self, paper: &Paper, batch: &Mutex<Batch>) -> Result<PathBuf, PaperOutcome> {
        let mut batch = batch
            .lock()
            .map_err(|_| PaperOutcome::failed(paper.clone(), "download state poisoned"))?;

        if !batch.ids.insert(paper.id().to_string()) {
            debug!("Paper appears twice in batch");
            return Err(PaperOutcome::skipped(paper.clone(), None, "duplicate in batch"));
        }

        match batch.allocator.allocate(paper) {
            Allocation::Fresh(path) => Ok(path),
            Allocation::Existing(path) => {
                info!(path = %path.display(), "File already exists");
                Err(PaperOutcome::skipped(paper.clone(), Some(path), "already exists"))
            }
        }
    }

    fn release(&self, batch: &Mutex<Batch>, target: &Path) {
        if let Ok(mut batch) = batch.lock() {
            batch.allocator.release(target);
        }
    }

    /// Stream the PDF into `<target>.part`, then move it into place
    async fn fetch(&self, paper: &Paper, target: &Path) -> Result<u64, ArxivError> {
        let part = partial_path(target);
        let result = self.stream_to(paper.pdf_url(), &part).await;

        let result = match result {
            Ok(bytes) => tokio::fs::rename(&part, target)
                .await
                .map(|_| bytes)
                .map_err(ArxivError::from),
            Err(e) => Err(e),
        };

        if result.is_err() {
            remove_partial(&part).await;
        }
        result
    }

    async fn stream_to(&self, url: &str, part: &Path) -> Result<u64, ArxivError> {
        let response = self.http.get_stream(url, self.options.timeout).await?;

        let file = tokio::fs::File::create(part).await?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }

        writer.flush().await?;
        Ok(bytes_written)
    }

    fn finish(&self, outcome: PaperOutcome) -> PaperOutcome {
        if let Some(progress) = &self.progress {
            progress(&outcome);
        }
        outcome
    }
}

async fn remove_partial(part: &Path) {
    match tokio::fs::remove_file(part).await {
        Ok(()) => debug!(path = %part.display(), "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %part.display(), error = %e, "Could not remove partial download"),
    }
}
