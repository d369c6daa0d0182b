//! Paired server/local paths for one node of the mirrored tree.

use std::path::{Path, PathBuf};

use crate::listing::ListingEntry;

/// An immutable (server path, local path) pair.
///
/// Directory server paths always end in `/`; file server paths never do.
/// Children are derived only through [`PathContext::child`], never from disk
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    server_path: String,
    local_path: PathBuf,
}

impl PathContext {
    /// Creates the context for a directory root.
    ///
    /// The server path is normalized to start and end with `/`.
    #[must_use]
    pub fn root(server_path: &str, local_path: impl Into<PathBuf>) -> Self {
        let trimmed = server_path.trim_matches('/');
        let server_path = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        };
        Self {
            server_path,
            local_path: local_path.into(),
        }
    }

    /// Derives the context for a listed child of this directory.
    ///
    /// Returns `None` for names that would not stay inside this directory:
    /// empty names, `.`, `..`, and names with an inner `/`.
    #[must_use]
    pub fn child(&self, entry: &ListingEntry) -> Option<Self> {
        debug_assert!(self.is_dir(), "child of a file: {}", self.server_path);
        let name = entry.name();
        let segment = name.strip_suffix('/').unwrap_or(name);
        if matches!(segment, "" | "." | "..") || segment.contains('/') {
            return None;
        }
        Some(Self {
            server_path: format!("{}{name}", self.server_path),
            local_path: self.local_path.join(segment),
        })
    }

    /// Absolute server path.
    #[must_use]
    pub fn server_path(&self) -> &str {
        &self.server_path
    }

    /// Local filesystem path.
    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Returns true if this context denotes a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.server_path.ends_with('/')
    }
}
