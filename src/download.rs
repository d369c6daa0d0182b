//! Core mirroring logic.
//!
//! A run lists the starting directory, then walks the tree as a set of
//! dynamically spawned units of work: one per file (fetch and write) and one
//! per expandable subdirectory (create, list, fan out). All units are
//! tracked by a single [`TaskTracker`]; the run is finished when it drains.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::filter::{FilterList, relative_path};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::listing::{DownloadStatus, Listing, ListingEntry, classify, parse_listing};
use crate::path::PathContext;
use crate::remote::{AppTarget, RemoteOutput, RemoteSource};
use crate::stats::{Failure, RunReport, RunState};

/// Mirrors a remote directory tree onto the local file system.
///
/// A `Downloader` performs exactly one run; [`Downloader::run`] consumes it.
/// Use [`Downloader::state`] beforehand to poll progress while it runs.
pub struct Downloader<S: RemoteSource, F: FileSystem = TokioFileSystem> {
    source: S,
    fs: F,
    target: AppTarget,
    config: DownloadConfig,
    filter: FilterList,
    cancellation: CancellationToken,
    state: Arc<RunState>,
}

impl<S: RemoteSource + 'static> Downloader<S, TokioFileSystem> {
    /// Creates a downloader that writes with `tokio::fs`.
    #[must_use]
    pub fn new(source: S, target: AppTarget, config: DownloadConfig) -> Self {
        Self::with_fs(source, target, config, TokioFileSystem)
    }
}

impl<S: RemoteSource + 'static, F: FileSystem + 'static> Downloader<S, F> {
    /// Creates a downloader with a custom file system implementation.
    #[must_use]
    pub fn with_fs(source: S, target: AppTarget, config: DownloadConfig, fs: F) -> Self {
        Self {
            source,
            fs,
            target,
            config,
            filter: FilterList::default(),
            cancellation: CancellationToken::new(),
            state: Arc::new(RunState::new()),
        }
    }

    /// Sets the paths to skip.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterList) -> Self {
        self.filter = filter;
        self
    }

    /// Sets a token that stops new remote reads once cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns a handle to the run's shared counters.
    #[must_use]
    pub fn state(&self) -> Arc<RunState> {
        Arc::clone(&self.state)
    }

    /// Mirrors `root` and waits for every spawned unit of work to finish.
    ///
    /// If the run is cancelled before the starting directory has been
    /// listed, nothing is created and an empty cancelled report is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RootListing`] if the starting directory cannot be
    /// listed. Failures below the root never produce an error; they are
    /// collected in the returned report.
    pub async fn run(self, root: PathContext) -> Result<RunReport> {
        let started = Instant::now();
        let context = Arc::new(RunContext {
            fetch_permits: Semaphore::new(self.config.max_concurrent_fetches.max(1)),
            server_root: root.server_path().to_string(),
            tracker: TaskTracker::new(),
            source: self.source,
            fs: self.fs,
            target: self.target,
            config: self.config,
            filter: self.filter,
            cancellation: self.cancellation,
            state: self.state,
        });

        log::info!("Listing {} of {}", root.server_path(), context.target);
        let Some(listing) = context.list(root.server_path()).await else {
            return Ok(context.state.report(started.elapsed(), true));
        };
        if !matches!(listing.status, DownloadStatus::Ok(_) | DownloadStatus::Empty) {
            return Err(Error::RootListing {
                path: root.server_path().to_string(),
                status: listing.status,
            });
        }

        context.tracker.spawn(Arc::clone(&context).walk(listing, root));
        context.tracker.close();
        context.tracker.wait().await;

        let report = context
            .state
            .report(started.elapsed(), context.cancellation.is_cancelled());
        log::info!(
            "Mirrored {} file(s) with {} failure(s)",
            report.files_downloaded,
            report.failures.len()
        );
        Ok(report)
    }
}

/// Everything one run shares between its units of work.
struct RunContext<S, F> {
    source: S,
    fs: F,
    target: AppTarget,
    config: DownloadConfig,
    filter: FilterList,
    server_root: String,
    fetch_permits: Semaphore,
    tracker: TaskTracker,
    cancellation: CancellationToken,
    state: Arc<RunState>,
}

impl<S: RemoteSource + 'static, F: FileSystem + 'static> RunContext<S, F> {
    /// Expands one listed directory.
    ///
    /// Subdirectory listings are fetched here, inside the parent's unit of
    /// work, so a child walk is only spawned once its children are known.
    fn walk(self: Arc<Self>, listing: Listing, dir: PathContext) -> BoxFuture<'static, ()> {
        async move {
            if let Err(e) = self.fs.create_dir_all(dir.local_path()).await {
                log::warn!("Failed to create {}: {e}", dir.local_path().display());
                self.record(&dir, DownloadStatus::WriteFailure);
                return;
            }

            for entry in &listing.files {
                let Some(file) = self.child(&dir, entry) else {
                    continue;
                };
                let context = Arc::clone(&self);
                self.tracker
                    .spawn(async move { context.download_file(file).await });
            }

            for entry in &listing.dirs {
                let Some(child) = self.child(&dir, entry) else {
                    continue;
                };
                if let Err(e) = self.fs.create_dir_all(child.local_path()).await {
                    log::warn!("Failed to create {}: {e}", child.local_path().display());
                    self.record(&child, DownloadStatus::WriteFailure);
                    continue;
                }

                let Some(sub) = self.list(child.server_path()).await else {
                    return;
                };
                if sub.status.is_ok() {
                    self.tracker.spawn(Arc::clone(&self).walk(sub, child));
                } else if sub.status == DownloadStatus::Empty {
                    log::debug!("{} is empty", child.server_path());
                } else {
                    self.record(&child, sub.status);
                }
            }
        }
        .boxed()
    }

    /// Fetches one file and writes it locally.
    async fn download_file(&self, file: PathContext) {
        let Some(output) = self.fetch(file.server_path()).await else {
            return;
        };
        match classify(&output.text) {
            DownloadStatus::Ok(_) | DownloadStatus::Empty if output.transport_error.is_some() => {
                self.record(&file, DownloadStatus::Incomplete);
            }
            DownloadStatus::Ok(body) => self.write_local(&file, body.as_bytes()).await,
            // The remote side reports zero-length files with the empty-directory marker.
            DownloadStatus::Empty => self.write_local(&file, &[]).await,
            status => self.record(&file, status),
        }
    }

    /// Writes `contents`, retrying with exponential backoff.
    async fn write_local(&self, file: &PathContext, contents: &[u8]) {
        let path = file.local_path();
        log::info!("Writing file: {}", file.server_path());

        let mut delays = self.config.write_retry.delays();
        loop {
            match self.fs.write_file(path, contents).await {
                Ok(()) => {
                    self.state.record_download();
                    return;
                }
                Err(e) => {
                    let Some(delay) = delays.next() else {
                        log::warn!(
                            "Giving up on {} after {} attempt(s): {e}",
                            path.display(),
                            self.config.write_retry.max_attempts()
                        );
                        if self.config.cleanup_on_error {
                            let _ = self.fs.remove_file(path).await;
                        }
                        self.record(file, DownloadStatus::WriteFailure);
                        return;
                    };
                    log::debug!("Write to {} failed: {e}, retrying in {delay:?}", path.display());
                    if !self.pause(delay).await {
                        if self.config.cleanup_on_error {
                            let _ = self.fs.remove_file(path).await;
                        }
                        return;
                    }
                }
            }
        }
    }

    /// Lists a directory, retrying transient failures when configured.
    ///
    /// Returns `None` once the run is cancelled.
    async fn list(&self, server_path: &str) -> Option<Listing> {
        let retry = self.config.listing_retry;
        let mut attempt = 0;
        loop {
            let output = self.fetch(server_path).await?;
            let mut listing = parse_listing(&output.text);
            if output.transport_error.is_some()
                && matches!(listing.status, DownloadStatus::Ok(_) | DownloadStatus::Empty)
            {
                listing = Listing::childless(DownloadStatus::Incomplete);
            }
            let retryable = listing.status.is_transient()
                || (listing.status == DownloadStatus::Unknown && output.is_truncated());
            if !retryable || attempt >= retry.attempts {
                return Some(listing);
            }
            attempt += 1;
            log::warn!(
                "Listing {server_path} failed ({}), retry {attempt}/{}",
                listing.status,
                retry.attempts
            );
            if !self.pause(retry.interval()).await {
                return None;
            }
        }
    }

    /// Performs one bounded remote read, or returns `None` once the run is
    /// cancelled. Cancellation is checked after the permit is granted, so
    /// queued reads never start after an interrupt.
    async fn fetch(&self, server_path: &str) -> Option<RemoteOutput> {
        let _permit = tokio::select! {
            biased;
            () = self.cancellation.cancelled() => return None,
            permit = self.fetch_permits.acquire() => permit.ok(),
        };
        if self.cancellation.is_cancelled() {
            return None;
        }
        log::debug!("Fetching {server_path}");
        let output = self.source.fetch(&self.target, server_path).await;
        if let Some(e) = &output.transport_error {
            log::warn!("{server_path}: {e}");
        }
        Some(output)
    }

    /// Sleeps for `delay`; returns false if the run is cancelled first.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    /// Derives a child context, or `None` if the entry is unsafe or filtered.
    fn child(&self, dir: &PathContext, entry: &ListingEntry) -> Option<PathContext> {
        let Some(node) = dir.child(entry) else {
            log::warn!("Ignoring entry {:?} in {}", entry.name(), dir.server_path());
            return None;
        };
        if self.filter.should_skip(node.server_path(), &self.server_root) {
            log::info!("Skipping {}", node.server_path());
            return None;
        }
        Some(node)
    }

    fn record(&self, node: &PathContext, status: DownloadStatus) {
        let path = relative_path(node.server_path(), &self.server_root);
        self.state.record_failure(Failure::new(path, status));
    }
}
