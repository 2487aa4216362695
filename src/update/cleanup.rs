//! Reclaiming the backup left behind by a completed update.
//!
//! After a successful swap the old binary stays at `.bak` and an empty
//! `.remove` marker is written. The next process start sees the marker,
//! deletes the backup (retrying lock and permission errors) and clears the
//! marker whatever the outcome, so a stubborn backup is never retried on
//! every launch.

use super::fs::FileSystem;
use super::paths::WorkingPaths;
use crate::config::CleanupConfig;
use crate::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Attempt `n` is followed by a `n * step` pause.
    pub step: Duration,
}

impl RetryPolicy {
    /// Pause after the given (1-based) attempt.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&CleanupConfig::default())
    }
}

impl From<&CleanupConfig> for RetryPolicy {
    fn from(config: &CleanupConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            step: config.backoff_step(),
        }
    }
}

/// What happened to the backup during a reclaim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupDisposition {
    /// Deleted.
    Deleted,
    /// Already gone.
    Missing,
    /// Could not be deleted; moved aside to this path.
    RenamedTo(PathBuf),
    /// Could neither be deleted nor moved.
    Left,
}

/// Result of running the cleanup signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// No marker was present.
    NoMarker,
    /// A reclaim was attempted.
    Attempted {
        /// Fate of the backup.
        backup: BackupDisposition,
        /// Whether the marker was removed.
        marker_cleared: bool,
    },
}

impl CleanupOutcome {
    /// Whether a reclaim ran.
    #[must_use]
    pub fn attempted(&self) -> bool {
        matches!(self, Self::Attempted { .. })
    }
}

/// Checks for the reclaim marker and disposes of the backup.
pub struct CleanupSignal<'a> {
    paths: &'a WorkingPaths,
    fs: &'a dyn FileSystem,
    policy: RetryPolicy,
}

impl<'a> CleanupSignal<'a> {
    /// Cleanup for the given paths.
    #[must_use]
    pub fn new(paths: &'a WorkingPaths, fs: &'a dyn FileSystem, policy: RetryPolicy) -> Self {
        Self { paths, fs, policy }
    }

    /// Reclaim the backup if the marker says one is owed.
    ///
    /// Never fails; problems are logged.
    pub fn reclaim(&self) -> CleanupOutcome {
        let marker = self.paths.marker();
        if !self.fs.exists(marker) {
            return CleanupOutcome::NoMarker;
        }
        info!("Remove signal detected");

        let backup = self.dispose_backup();

        let marker_cleared = match self.fs.remove_file(marker) {
            Ok(()) => {
                debug!("Signal file removed");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to remove signal file {}: {e}", marker.display());
                false
            }
        };

        CleanupOutcome::Attempted {
            backup,
            marker_cleared,
        }
    }

    fn dispose_backup(&self) -> BackupDisposition {
        let backup = self.paths.backup();
        let err = match remove_with_retry(self.fs, backup, self.policy) {
            Ok(0) => {
                debug!("No backup at {}", backup.display());
                return BackupDisposition::Missing;
            }
            Ok(_) => {
                info!("Backup file removed successfully");
                return BackupDisposition::Deleted;
            }
            Err(e) => e,
        };

        let stale = self.paths.stale_backup();
        match self.fs.rename(backup, &stale) {
            Ok(()) => {
                warn!(
                    "{}",
                    Error::CleanupPartialFailure {
                        path: backup.to_path_buf(),
                        reason: format!("{err}; renamed to {}", stale.display()),
                    }
                );
                BackupDisposition::RenamedTo(stale)
            }
            Err(rename_err) => {
                warn!(
                    "{}",
                    Error::CleanupPartialFailure {
                        path: backup.to_path_buf(),
                        reason: format!("{err}; rename also failed: {rename_err}"),
                    }
                );
                BackupDisposition::Left
            }
        }
    }
}

/// Delete `path`, retrying lock and permission errors.
///
/// Before each retry the file's permissions are relaxed and attempt `n`
/// waits `n * policy.step`. Other errors fail at once. A missing file counts
/// as success with zero attempts spent.
///
/// # Errors
///
/// The last deletion error once attempts are exhausted, or the first
/// non-transient error.
pub fn remove_with_retry(fs: &dyn FileSystem, path: &Path, policy: RetryPolicy) -> io::Result<u32> {
    let mut attempt = 1;
    loop {
        match fs.remove_file(path) {
            Ok(()) => return Ok(attempt),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(attempt - 1),
            Err(e) if !Error::is_transient_lock(&e) || attempt >= policy.max_attempts => {
                return Err(e);
            }
            Err(e) => {
                debug!(
                    "Attempt {attempt}/{} to remove {} failed: {e}",
                    policy.max_attempts,
                    path.display()
                );
                if let Err(perm) = fs.relax_permissions(path) {
                    debug!("Could not relax permissions on {}: {perm}", path.display());
                }
                std::thread::sleep(policy.delay_after(attempt));
                attempt += 1;
            }
        }
    }
}
