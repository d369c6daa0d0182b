//! Configuration types for mirror runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::filter::IGNORE_FILE;

/// Exponential backoff for local file writes.
///
/// The first retry waits `initial_delay_ms`, each following retry doubles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteRetry {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
}

impl Default for WriteRetry {
    fn default() -> Self {
        Self {
            max_retries: 6,
            initial_delay_ms: 1_000,
        }
    }
}

impl WriteRetry {
    /// Delays to sleep before each retry, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let initial = Duration::from_millis(self.initial_delay_ms);
        (0..self.max_retries).map(move |n| initial.saturating_mul(2u32.saturating_pow(n)))
    }

    /// Total number of write attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Fixed-interval retry for listings that hit a transient server error or
/// came back truncated. Disabled when `attempts` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingRetry {
    /// Retries after the first listing attempt.
    pub attempts: u32,
    /// Delay between attempts, in milliseconds.
    pub interval_ms: u64,
}

impl Default for ListingRetry {
    fn default() -> Self {
        Self {
            attempts: 0,
            interval_ms: 3_000,
        }
    }
}

impl ListingRetry {
    /// Delay between attempts.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Configuration for a mirror run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Maximum number of remote reads in flight at once.
    pub max_concurrent_fetches: usize,
    /// Whether to write into an existing destination directory.
    pub force_overwrite: bool,
    /// Whether to remove a partially written file after its retries run out.
    pub cleanup_on_error: bool,
    /// Local write retry policy.
    pub write_retry: WriteRetry,
    /// Listing retry policy.
    pub listing_retry: ListingRetry,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 32,
            force_overwrite: false,
            cleanup_on_error: true,
            write_retry: WriteRetry::default(),
            listing_retry: ListingRetry::default(),
        }
    }
}

impl DownloadConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of concurrent remote reads (at least one).
    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    /// Sets whether to write into an existing destination.
    #[must_use]
    pub const fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// Sets whether to remove partial files after a failed write.
    #[must_use]
    pub const fn with_cleanup_on_error(mut self, cleanup: bool) -> Self {
        self.cleanup_on_error = cleanup;
        self
    }

    /// Sets the local write retry policy.
    #[must_use]
    pub const fn with_write_retry(mut self, retry: WriteRetry) -> Self {
        self.write_retry = retry;
        self
    }

    /// Sets the listing retry policy.
    #[must_use]
    pub const fn with_listing_retry(mut self, retry: ListingRetry) -> Self {
        self.listing_retry = retry;
        self
    }
}

/// Settings for the remote `cf` client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Executable used to read remote paths.
    pub program: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            program: "cf".to_string(),
        }
    }
}

/// Complete application configuration, as read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Download configuration.
    pub download: DownloadConfig,
    /// Remote client configuration.
    pub remote: RemoteConfig,
    /// Ignore file consulted in the working directory.
    pub ignore_file: Option<PathBuf>,
}

impl AppConfig {
    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cf-download")
            .join("config.toml")
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                log::info!("Loaded config from {}", path.display());
                Ok(toml::from_str(&contents)?)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Ignore file to read, defaulting to `.cfignore`.
    #[must_use]
    pub fn ignore_file(&self) -> PathBuf {
        self.ignore_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(IGNORE_FILE))
    }
}
