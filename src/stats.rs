//! Shared run counters and the final report.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::listing::DownloadStatus;

/// One file or directory that was not mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Server path relative to the run root.
    pub path: String,
    /// Why it failed.
    pub status: DownloadStatus,
}

impl Failure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(path: impl Into<String>, status: DownloadStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }

    /// Returns true if the local side failed rather than the remote side.
    #[must_use]
    pub const fn is_write_failure(&self) -> bool {
        matches!(self.status, DownloadStatus::WriteFailure)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_write_failure() {
            write!(
                f,
                "{}: Write Error, encountered error while writing to local file",
                self.path
            )
        } else {
            write!(f, "{}: Server Error, not downloaded ({})", self.path, self.status)
        }
    }
}

/// Counters shared by every unit of work in one run.
///
/// The file counter may be polled at any time; the failure list is only
/// complete once the run has drained.
#[derive(Debug, Default)]
pub struct RunState {
    files_downloaded: AtomicU64,
    failures: Mutex<Vec<Failure>>,
}

impl RunState {
    /// Creates empty run state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully written file.
    pub fn record_download(&self) {
        self.files_downloaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Appends a failure record.
    pub fn record_failure(&self, failure: Failure) {
        log::warn!("{failure}");
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    /// Number of files written so far.
    #[must_use]
    pub fn files_downloaded(&self) -> u64 {
        self.files_downloaded.load(Ordering::Relaxed)
    }

    /// Snapshots the state into a report.
    #[must_use]
    pub fn report(&self, elapsed: Duration, cancelled: bool) -> RunReport {
        RunReport {
            files_downloaded: self.files_downloaded(),
            failures: self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            elapsed,
            cancelled,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Files successfully written.
    pub files_downloaded: u64,
    /// Failures in the order they were recorded.
    pub failures: Vec<Failure>,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
    /// Whether the run was cancelled before finishing.
    pub cancelled: bool,
}

impl RunReport {
    /// Returns true if every node was mirrored.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn failure_messages_distinguish_write_errors() {
        let remote = Failure::new("/app/secret.pem", DownloadStatus::PermissionFailure);
        let local = Failure::new("/app/big.bin", DownloadStatus::WriteFailure);
        assert_eq!(
            remote.to_string(),
            "/app/secret.pem: Server Error, not downloaded (permission denied)"
        );
        assert!(local.to_string().starts_with("/app/big.bin: Write Error"));
        assert!(local.is_write_failure());
        assert!(!remote.is_write_failure());
    }

    #[test]
    fn report_snapshots_state() {
        let state = RunState::new();
        state.record_download();
        state.record_download();
        state.record_failure(Failure::new("/a", DownloadStatus::ServerError(502)));

        let report = state.report(Duration::from_secs(3), false);
        assert_eq!(report.files_downloaded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.elapsed, Duration::from_secs(3));
        assert!(!report.is_complete());
    }

    #[test]
    fn empty_report_is_complete() {
        let report = RunState::new().report(Duration::ZERO, false);
        assert!(report.is_complete());
        assert!(!RunState::new().report(Duration::ZERO, true).is_complete());
    }

    #[test]
    fn concurrent_recording_loses_nothing() {
        let state = Arc::new(RunState::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        if i % 4 == 0 {
                            state.record_failure(Failure::new(
                                format!("/{t}/{i}"),
                                DownloadStatus::Unknown,
                            ));
                        } else {
                            state.record_download();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(state.files_downloaded(), 600);
        assert_eq!(state.report(Duration::ZERO, false).failures.len(), 200);
    }
}
