//! Error types for exestamp.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate error.
pub type Result<T> = std::result::Result<T, Error>;

/// Windows `ERROR_SHARING_VIOLATION`.
const WIN_SHARING_VIOLATION: i32 = 32;

/// Windows `ERROR_LOCK_VIOLATION`.
const WIN_LOCK_VIOLATION: i32 = 33;

/// Errors produced while locating the patch tool, replacing the executable,
/// or collecting build metadata.
#[derive(Debug, Error)]
pub enum Error {
    /// An explicitly supplied patch tool path does not exist.
    #[error("metadata patch tool not found at {}", path.display())]
    ToolNotFound {
        /// The path that was checked.
        path: PathBuf,
    },

    /// The tool could not be downloaded.
    #[error("failed to download metadata patch tool: {0}")]
    DownloadFailed(String),

    /// The patch tool exited unsuccessfully.
    #[error("failed to update executable metadata ({status}), output: {output}")]
    PatchFailed {
        /// Exit status description.
        status: String,
        /// Combined stdout and stderr of the tool.
        output: String,
    },

    /// Copying the executable to the staging path failed.
    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    StagingFailed {
        /// The running executable.
        from: PathBuf,
        /// The staging copy.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Renaming the original executable to its backup path failed.
    #[error("failed to back up {} to {}: {source}", from.display(), to.display())]
    BackupFailed {
        /// The running executable.
        from: PathBuf,
        /// The backup path.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Moving the patched copy into place failed; the backup was restored.
    #[error("failed to replace {} with {}: {source} (original restored)", target.display(), staging.display())]
    SwapFailed {
        /// The executable path.
        target: PathBuf,
        /// The patched staging copy.
        staging: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Moving the patched copy into place failed and so did restoring the backup.
    #[error(
        "failed to replace executable ({swap}) and failed to restore backup ({rollback}); \
         the original binary is at {}",
        backup.display()
    )]
    RollbackFailed {
        /// Error from the swap rename.
        swap: io::Error,
        /// Error from the restore rename.
        rollback: io::Error,
        /// Where the original binary now lives.
        backup: PathBuf,
    },

    /// The restarted process could not be spawned.
    #[error("failed to restart {}: {source}", path.display())]
    RestartLaunchFailed {
        /// The executable that was launched.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The stale backup could not be reclaimed. Only ever logged.
    #[error("failed to reclaim backup {}: {reason}", path.display())]
    CleanupPartialFailure {
        /// The backup path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The running executable path could not be determined.
    #[error("failed to get executable path: {0}")]
    ExecutablePath(#[source] io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A git command failed.
    #[error("git error: {0}")]
    Git(String),

    /// Build history error.
    #[error("build history error: {0}")]
    History(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether an I/O error looks like a lock or permission condition that may
    /// clear on retry.
    #[must_use]
    pub fn is_transient_lock(err: &io::Error) -> bool {
        if err.kind() == io::ErrorKind::PermissionDenied {
            return true;
        }
        matches!(
            err.raw_os_error(),
            Some(WIN_SHARING_VIOLATION | WIN_LOCK_VIOLATION)
        ) && cfg!(windows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_transient() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(Error::is_transient_lock(&err));
    }

    #[test]
    fn test_not_found_is_not_transient() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert!(!Error::is_transient_lock(&err));
    }

    #[test]
    fn test_patch_failed_carries_output() {
        let err = Error::PatchFailed {
            status: "exit status: 1".to_string(),
            output: "bad PE header".to_string(),
        };
        assert!(err.to_string().contains("bad PE header"));
    }

    #[test]
    fn test_rollback_failed_names_backup() {
        let err = Error::RollbackFailed {
            swap: io::Error::from(io::ErrorKind::PermissionDenied),
            rollback: io::Error::from(io::ErrorKind::NotFound),
            backup: PathBuf::from("/app/prog.bak"),
        };
        assert!(err.to_string().contains("/app/prog.bak"));
    }
}
