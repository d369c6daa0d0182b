//! The remote "list/read path" primitive.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

/// Identifies which app, and which running instance of it, to read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    /// App name.
    pub app: String,
    /// Instance index.
    pub instance: u32,
}

impl AppTarget {
    /// Creates a target for the given app and instance.
    #[must_use]
    pub fn new(app: impl Into<String>, instance: u32) -> Self {
        Self {
            app: app.into(),
            instance,
        }
    }
}

impl fmt::Display for AppTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (instance {})", self.app, self.instance)
    }
}

/// Raw output of one remote read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    /// Combined text output: banner, status line, body.
    pub text: String,
    /// Transport-level failure (spawn error, non-zero exit), independent of
    /// the status embedded in `text`.
    pub transport_error: Option<String>,
}

impl RemoteOutput {
    /// Creates a successful output.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            transport_error: None,
        }
    }

    /// Returns true if the output is missing its status line.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        !self.text.contains('\n')
    }
}

/// Source of directory listings and file contents.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Reads `server_path` from `target`.
    ///
    /// Never fails outright; transport problems are reported in
    /// [`RemoteOutput::transport_error`] alongside whatever text was produced.
    async fn fetch(&self, target: &AppTarget, server_path: &str) -> RemoteOutput;
}

#[async_trait]
impl<T: RemoteSource + ?Sized> RemoteSource for Arc<T> {
    async fn fetch(&self, target: &AppTarget, server_path: &str) -> RemoteOutput {
        (**self).fetch(target, server_path).await
    }
}

/// Reads paths by running `cf files APP PATH -i INSTANCE`.
#[derive(Debug, Clone)]
pub struct CfCli {
    program: String,
}

impl Default for CfCli {
    fn default() -> Self {
        Self::new("cf")
    }
}

impl CfCli {
    /// Creates a source that invokes the given `cf` executable.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl RemoteSource for CfCli {
    async fn fetch(&self, target: &AppTarget, server_path: &str) -> RemoteOutput {
        let instance = target.instance.to_string();
        let result = Command::new(&self.program)
            .args(["files", target.app.as_str(), server_path, "-i", instance.as_str()])
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                let transport_error = (!output.status.success())
                    .then(|| format!("{} exited with {}", self.program, output.status));
                RemoteOutput {
                    text,
                    transport_error,
                }
            }
            Err(e) => RemoteOutput {
                text: String::new(),
                transport_error: Some(format!("failed to run {}: {e}", self.program)),
            },
        }
    }
}
