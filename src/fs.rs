//! File system abstraction for testability.

use async_trait::async_trait;
use std::path::Path;

/// Abstraction over the local file system operations the mirror needs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Checks if anything exists at the given path.
    async fn path_exists(&self, path: &Path) -> bool;

    /// Creates a directory and all missing ancestors. Succeeds if it exists.
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Writes `contents` to `path`, replacing any existing file.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()>;

    /// Removes the file at `path`.
    async fn remove_file(&self, path: &Path) -> std::io::Result<()>;
}

/// Default file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem` instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn path_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(path, contents).await
    }

    async fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
