//! Ignore-list construction and exact path matching.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;

/// Default ignore file, read from the working directory.
pub const IGNORE_FILE: &str = ".cfignore";

/// Server-relative paths excluded from traversal and download.
///
/// Entries always start with `/` and never end with `/`. Matching is exact:
/// an entry skips only that node, and because directories are checked before
/// they are listed, skipping a directory prunes its whole subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterList {
    entries: BTreeSet<String>,
}

impl FilterList {
    /// Builds a filter list from raw paths, normalizing each one.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: paths
                .into_iter()
                .filter_map(|p| Self::normalize(p.as_ref()))
                .collect(),
        }
    }

    /// Merges newline-delimited ignore file contents with a
    /// semicolon-delimited omit argument.
    #[must_use]
    pub fn from_sources(ignore_contents: Option<&str>, omit: &str) -> Self {
        let ignored = ignore_contents.into_iter().flat_map(str::lines);
        Self::new(ignored.chain(omit.split(';')))
    }

    /// Reads `ignore_file` (if it exists) and merges it with `omit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ignore file exists but cannot be read.
    pub async fn load(ignore_file: &Path, omit: &str) -> Result<Self> {
        let contents = match tokio::fs::read_to_string(ignore_file).await {
            Ok(contents) => {
                log::info!("Using {}", ignore_file.display());
                Some(contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No {} found, using --omit only", ignore_file.display());
                None
            }
            Err(e) => return Err(e.into()),
        };
        let list = Self::from_sources(contents.as_deref(), omit);
        for entry in list.iter() {
            log::debug!("Filtering {entry}");
        }
        Ok(list)
    }

    /// Normalizes one raw entry to `/a/b` form, or `None` if it is blank.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<String> {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(format!("/{trimmed}"))
        }
    }

    /// Returns true if `server_path`, taken relative to `server_root`, is
    /// listed verbatim.
    #[must_use]
    pub fn should_skip(&self, server_path: &str, server_root: &str) -> bool {
        !self.entries.is_empty() && self.entries.contains(&relative_path(server_path, server_root))
    }

    /// Iterates over the normalized entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is filtered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strips the trailing slash and the `server_root` prefix from `server_path`.
///
/// The root is only removed on a segment boundary and the result always
/// starts with `/`.
#[must_use]
pub fn relative_path(server_path: &str, server_root: &str) -> String {
    let path = server_path.strip_suffix('/').unwrap_or(server_path);
    let root = server_root.trim_end_matches('/');
    let relative = match path.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };
    if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("/{relative}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn exact_match_only() {
        let list = FilterList::new(["/app/node_modules"]);
        assert!(list.should_skip("/app/node_modules/", "/"));
        assert!(list.should_skip("/app/node_modules", "/"));
        assert!(!list.should_skip("/app/node_modules_backup", "/"));
        assert!(!list.should_skip("/app/node_modules/express/", "/"));
        assert!(!list.should_skip("/app/", "/"));
    }

    #[test]
    fn normalization() {
        assert_eq!(FilterList::normalize("app/"), Some("/app".to_string()));
        assert_eq!(FilterList::normalize("  /app/logs/ "), Some("/app/logs".to_string()));
        assert_eq!(FilterList::normalize("//app"), Some("/app".to_string()));
        assert_eq!(FilterList::normalize("   "), None);
        assert_eq!(FilterList::normalize("/"), None);
    }

    #[test]
    fn merges_ignore_file_and_omit() {
        let list = FilterList::from_sources(Some("app/tmp/\n\n/logs\r\n"), "app/node_modules;;/run.pid/");
        let entries: Vec<_> = list.iter().collect();
        assert_eq!(entries, ["/app/node_modules", "/app/tmp", "/logs", "/run.pid"]);
    }

    #[test]
    fn construction_is_order_independent() {
        let a = FilterList::from_sources(Some("b\na"), "c;d");
        let b = FilterList::from_sources(Some("d\nc"), "a;b");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_omit_filters_nothing() {
        let list = FilterList::from_sources(None, "");
        assert!(list.is_empty());
        assert!(!list.should_skip("/", "/"));
    }

    #[test]
    fn relative_to_nested_root() {
        assert_eq!(relative_path("/app/node_modules/", "/app/"), "/node_modules");
        assert_eq!(relative_path("/app/", "/app/"), "/");
        assert_eq!(relative_path("/application/x", "/app/"), "/application/x");
        assert_eq!(relative_path("/logs/a.log", "/"), "/logs/a.log");

        let list = FilterList::new(["node_modules"]);
        assert!(list.should_skip("/app/node_modules/", "/app/"));
        assert!(!list.should_skip("/app/node_modules/", "/"));
    }

    #[tokio::test]
    async fn load_reads_ignore_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(IGNORE_FILE);
        std::fs::write(&path, "/app/vendor/\nlogs\n").unwrap();

        let list = FilterList::load(&path, "tmp").await.unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.should_skip("/app/vendor/", "/"));
        assert!(list.should_skip("/tmp/", "/"));
    }

    #[tokio::test]
    async fn load_tolerates_missing_ignore_file() {
        let dir = TempDir::new().unwrap();
        let list = FilterList::load(&dir.path().join(IGNORE_FILE), "app")
            .await
            .unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), ["/app"]);
    }
}
