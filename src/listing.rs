//! Parsing and classification of `cf files` output.
//!
//! Every response has the same three-part shape: an informational banner
//! line, a status line, and a body. For a directory the body is a
//! whitespace-separated run of `name size` pairs (directories use `-` as the
//! size and end in `/`); for a file the body is the raw file content.

use std::fmt;
use std::mem;
use std::sync::LazyLock;

use regex::Regex;

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]([0-9]|.)*[GMBK]$").expect("valid regex"));

static SERVER_ERROR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(5[0-9]{2})\b").expect("valid regex"));

/// Body the remote side returns for an empty directory (and, by a known
/// quirk, for a zero-length file).
pub const NO_FILES_MARKER: &str = "No files found";

/// Error code reported when the app is stopped or the API call failed.
const APP_UNAVAILABLE_CODE: &str = "190001";

/// Classified result of one remote read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    /// The read succeeded; carries the raw body.
    Ok(String),
    /// The directory exists but has no children.
    Empty,
    /// The app does not exist (wrong space or org).
    NotFound,
    /// The app is stopped or the platform API failed.
    AppUnavailable,
    /// The path exists but cannot be read.
    PermissionFailure,
    /// Transient server-side failure with its HTTP status code.
    ServerError(u16),
    /// The remote read reported success but did not exit cleanly, so the
    /// body may be cut short.
    Incomplete,
    /// The local write failed after all retries.
    WriteFailure,
    /// The response did not match any known shape.
    Unknown,
}

impl DownloadStatus {
    /// Returns true if the remote read produced usable content.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns true if retrying the same read may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ServerError(_) | Self::Incomplete)
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(_) => f.write_str("ok"),
            Self::Empty => f.write_str("no files found"),
            Self::NotFound => f.write_str("app not found (check space and org)"),
            Self::AppUnavailable => f.write_str("app not found, or the app is in stopped state"),
            Self::PermissionFailure => f.write_str("permission denied"),
            Self::ServerError(code) => write!(f, "server returned status {code}"),
            Self::Incomplete => f.write_str("remote read was interrupted"),
            Self::WriteFailure => f.write_str("local write failed"),
            Self::Unknown => f.write_str("unrecognized response"),
        }
    }
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEntry {
    /// A regular file; the name never ends in `/`.
    File {
        /// Last path segment.
        name: String,
    },
    /// A directory; the name always ends in `/`.
    Directory {
        /// Last path segment, including the trailing slash.
        name: String,
    },
}

impl ListingEntry {
    /// Returns the entry name as reported by the remote side.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name } | Self::Directory { name } => name,
        }
    }

    /// Returns true for directory entries.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }
}

/// A classified and tokenized directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Classification of the response.
    pub status: DownloadStatus,
    /// File entries, in remote order.
    pub files: Vec<ListingEntry>,
    /// Directory entries, in remote order.
    pub dirs: Vec<ListingEntry>,
}

impl Listing {
    /// Creates a listing with no children.
    #[must_use]
    pub const fn childless(status: DownloadStatus) -> Self {
        Self {
            status,
            files: Vec::new(),
            dirs: Vec::new(),
        }
    }
}

/// Parses raw listing output into its status and children.
///
/// Children are only produced for an `Ok` status. Parsing never fails; an
/// unrecognized response is reported as [`DownloadStatus::Unknown`].
#[must_use]
pub fn parse_listing(raw: &str) -> Listing {
    let status = classify(raw);
    let DownloadStatus::Ok(body) = &status else {
        return Listing::childless(status);
    };
    let (files, dirs) = tokenize(body);
    Listing {
        status,
        files,
        dirs,
    }
}

/// Classifies a raw response by its banner, status line and body.
#[must_use]
pub fn classify(raw: &str) -> DownloadStatus {
    let mut parts = raw.splitn(3, '\n');
    let banner = parts.next().unwrap_or_default();
    let status_line = parts.next();
    let body = parts.next().unwrap_or_default();

    if banner.contains("not found") || status_line.is_some_and(|s| s.contains("not found")) {
        return DownloadStatus::NotFound;
    }

    let Some(status_line) = status_line else {
        return if banner.contains(APP_UNAVAILABLE_CODE) {
            DownloadStatus::AppUnavailable
        } else {
            DownloadStatus::Unknown
        };
    };

    let status_ok = status_line.contains("OK");
    if banner.contains(APP_UNAVAILABLE_CODE)
        || status_line.contains(APP_UNAVAILABLE_CODE)
        || (!status_ok && body.contains(APP_UNAVAILABLE_CODE))
    {
        return DownloadStatus::AppUnavailable;
    }

    if body.trim() == NO_FILES_MARKER {
        return DownloadStatus::Empty;
    }

    if status_line.contains("FAILED") {
        return DownloadStatus::PermissionFailure;
    }

    if let Some(code) = SERVER_ERROR_RE
        .captures(status_line)
        .and_then(|caps| caps[1].parse().ok())
    {
        return DownloadStatus::ServerError(code);
    }

    if status_ok {
        return DownloadStatus::Ok(body.to_owned());
    }

    DownloadStatus::Unknown
}

/// Returns true for a size column token (`220B`, `3.0K`, `757.2K`) or `-`.
#[must_use]
pub fn is_size_delimiter(token: &str) -> bool {
    token == "-" || SIZE_RE.is_match(token)
}

/// Splits a listing body into file and directory entries.
///
/// Names are not quoted, so tokens are accumulated greedily until a size
/// column or a trailing slash closes the current name.
fn tokenize(body: &str) -> (Vec<ListingEntry>, Vec<ListingEntry>) {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let mut name = String::new();

    for token in body.split_whitespace() {
        if token.ends_with('/') {
            name.push_str(token);
            dirs.push(ListingEntry::Directory {
                name: mem::take(&mut name),
            });
        } else if is_size_delimiter(token) {
            if !name.is_empty() {
                name.pop();
                files.push(ListingEntry::File {
                    name: mem::take(&mut name),
                });
            }
        } else {
            name.push_str(token);
            name.push(' ');
        }
    }

    (files, dirs)
}
