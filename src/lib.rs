//! cf-download - mirror a remote application's file tree onto local disk.
//!
//! The library walks a remote directory tree through a "list/read path"
//! primitive ([`RemoteSource`]), fetching files and listing subdirectories
//! concurrently. Failures of individual files or subtrees are collected
//! rather than aborting the run.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use cf_download::{AppTarget, CfCli, DownloadConfig, Downloader, FilterList, PathContext};
//!
//! # async fn example() -> cf_download::Result<()> {
//! let filter = FilterList::load(Path::new(".cfignore"), "app/node_modules").await?;
//! let downloader = Downloader::new(CfCli::default(), AppTarget::new("my-app", 0), DownloadConfig::default())
//!     .with_filter(filter);
//!
//! let report = downloader
//!     .run(PathContext::root("/app", "my-app-download/app"))
//!     .await?;
//! println!("Downloaded {} files", report.files_downloaded);
//! for failure in &report.failures {
//!     println!("{failure}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod download;
pub mod error;
pub mod filter;
pub mod format;
pub mod fs;
pub mod listing;
pub mod path;
pub mod remote;
pub mod stats;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use config::{AppConfig, DownloadConfig, ListingRetry, RemoteConfig, WriteRetry};
pub use download::Downloader;
pub use error::{Error, Result};
pub use filter::{FilterList, IGNORE_FILE};
pub use format::format_duration;
pub use fs::{FileSystem, TokioFileSystem};
pub use listing::{DownloadStatus, Listing, ListingEntry, classify, parse_listing};
pub use path::PathContext;
pub use remote::{AppTarget, CfCli, RemoteOutput, RemoteSource};
pub use stats::{Failure, RunReport, RunState};
