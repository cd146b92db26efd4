//! Error types for driving VMware Fusion tools.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for fusion-driver operations.
pub type FusionResult<T> = Result<T, FusionError>;

/// Errors surfaced by driver operations.
///
/// Nothing here is retried internally; every variant reaches the caller
/// exactly as it was produced.
#[derive(Debug, Error)]
pub enum FusionError {
    /// A caller-supplied path could not be made absolute.
    #[error("failed to resolve absolute path for {}: {source}", .path.display())]
    PathResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A vendor tool failed to launch or exited non-zero.
    ///
    /// `status` is `None` when the process never started or was killed by a
    /// signal.
    #[error("{command} failed: {reason}{}", stderr_suffix(.stderr))]
    Process {
        command: String,
        reason: String,
        status: Option<i32>,
        stderr: String,
    },

    /// The application bundle itself is missing.
    #[error("Fusion application not found at path: {}", .0.display())]
    ApplicationNotFound(PathBuf),

    /// The bundle exists but one of the tools inside it does not.
    #[error("Critical application '{name}' not found at path: {}", .path.display())]
    ComponentNotFound { name: String, path: PathBuf },

    /// Invalid driver configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem errors passed through unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FusionError {
    /// Captured stderr of a failed process, if this is a process error.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            FusionError::Process { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Exit code of a failed process, when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            FusionError::Process { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether verification failed because something was not installed.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FusionError::ApplicationNotFound(_) | FusionError::ComponentNotFound { .. }
        )
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}
