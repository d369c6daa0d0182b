//! Error types for the cf-download library.

use std::path::PathBuf;

use thiserror::Error;

use crate::listing::DownloadStatus;

/// Setup errors that abort a run before (or instead of) any fan-out.
///
/// Per-file and per-directory problems are never reported through this type;
/// they are collected as [`Failure`](crate::stats::Failure) records instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during setup (working directory, ignore file, config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command-line usage.
    #[error("{0}")]
    Usage(String),

    /// Destination already exists and overwrite is disabled.
    #[error(
        "destination path {} already exists and is not an empty directory. Delete it or use --overwrite",
        path.display()
    )]
    DestinationExists {
        /// Local destination root.
        path: PathBuf,
    },

    /// `CF_TRACE` is enabled, which corrupts the `cf files` output.
    #[error("environment variable CF_TRACE is set to true. This prevents download from succeeding")]
    TraceEnabled,

    /// The starting directory could not be listed.
    #[error("could not list '{path}': {status}")]
    RootListing {
        /// Server path of the starting directory.
        path: String,
        /// Classified response for the root listing.
        status: DownloadStatus,
    },

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// A specialized `Result` type for cf-download operations.
pub type Result<T> = std::result::Result<T, Error>;
