//! Copy, patch, back up and swap the executable, with rollback.
//!
//! The replacer walks a fixed sequence of states:
//!
//! ```text
//! Start -> StagingCopied -> Patched -> OriginalBackedUp -> Swapped -> Done
//! ```
//!
//! Every failure before `Swapped` leaves the original executable at its path.
//! A failed swap renames the backup back into place before returning.
//!
//! Both swap renames stay inside the executable's directory, so the path
//! always resolves to a complete binary (old or new). The backup is kept
//! rather than deleted because the running process may still be mapped from
//! it; the next start reclaims it (see [`super::cleanup`]).
//!
//! Only one update attempt may run against an executable at a time. This is
//! not enforced.

use super::fs::FileSystem;
use super::patcher::{MetadataFields, Patcher};
use super::paths::WorkingPaths;
use crate::error::{Error, Result};
use std::fmt;
use tracing::{info, warn};

/// Position in the replacement sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceState {
    /// Nothing on disk has changed yet.
    Start,
    /// The executable was copied to the staging path.
    StagingCopied,
    /// The staging copy carries the new metadata.
    Patched,
    /// The original was moved to the backup path.
    OriginalBackedUp,
    /// The patched copy is live at the executable path.
    Swapped,
    /// The reclaim marker step has run.
    Done,
}

impl fmt::Display for ReplaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::StagingCopied => "staging copied",
            Self::Patched => "patched",
            Self::OriginalBackedUp => "original backed up",
            Self::Swapped => "swapped",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceReport {
    /// Whether the `.remove` marker was written.
    pub marker_written: bool,
}

/// Performs the copy/patch/backup/swap sequence for one executable.
pub struct AtomicReplacer<'a> {
    paths: &'a WorkingPaths,
    fs: &'a dyn FileSystem,
    patcher: &'a dyn Patcher,
}

impl<'a> AtomicReplacer<'a> {
    /// Create a replacer over the given paths.
    #[must_use]
    pub fn new(paths: &'a WorkingPaths, fs: &'a dyn FileSystem, patcher: &'a dyn Patcher) -> Self {
        Self { paths, fs, patcher }
    }

    /// Run the whole sequence.
    ///
    /// # Errors
    ///
    /// Returns the error of the step that failed. See the step methods.
    pub fn replace(&self, fields: &MetadataFields) -> Result<ReplaceReport> {
        self.clear_stale_marker();

        let mut state = ReplaceState::Start;
        let mut marker_written = false;
        while state != ReplaceState::Done {
            state = match state {
                ReplaceState::Start => self.stage()?,
                ReplaceState::StagingCopied => self.patch(fields)?,
                ReplaceState::Patched => self.back_up()?,
                ReplaceState::OriginalBackedUp => self.swap()?,
                ReplaceState::Swapped => {
                    marker_written = self.mark_for_reclaim();
                    ReplaceState::Done
                }
                ReplaceState::Done => ReplaceState::Done,
            };
        }

        Ok(ReplaceReport { marker_written })
    }

    /// Remove a `.remove` marker left by an interrupted cleanup.
    pub fn clear_stale_marker(&self) {
        let marker = self.paths.marker();
        if !self.fs.exists(marker) {
            return;
        }
        match self.fs.remove_file(marker) {
            Ok(()) => info!("Removed stale reclaim marker {}", marker.display()),
            Err(e) => warn!("Failed to remove stale marker {}: {e}", marker.display()),
        }
    }

    /// `Start -> StagingCopied`: byte-copy the executable to `.tmp`.
    ///
    /// # Errors
    ///
    /// [`Error::StagingFailed`]; any partial copy is removed.
    pub fn stage(&self) -> Result<ReplaceState> {
        let (from, to) = (self.paths.executable(), self.paths.staging());
        info!("Copying {} to {}", from.display(), to.display());

        if let Err(source) = self.fs.copy(from, to) {
            self.discard_staging();
            return Err(Error::StagingFailed {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            });
        }
        Ok(ReplaceState::StagingCopied)
    }

    /// `StagingCopied -> Patched`: stamp metadata into `.tmp`.
    ///
    /// # Errors
    ///
    /// The patcher's error, after removing `.tmp`.
    pub fn patch(&self, fields: &MetadataFields) -> Result<ReplaceState> {
        info!(
            "Patching {} (version {})",
            self.paths.staging().display(),
            fields.file_version
        );

        if let Err(e) = self.patcher.patch(self.paths.staging(), fields) {
            self.discard_staging();
            return Err(e);
        }
        Ok(ReplaceState::Patched)
    }

    /// `Patched -> OriginalBackedUp`: rename the executable to `.bak`.
    ///
    /// # Errors
    ///
    /// [`Error::BackupFailed`], after removing `.tmp`.
    pub fn back_up(&self) -> Result<ReplaceState> {
        let (from, to) = (self.paths.executable(), self.paths.backup());
        info!("Backing up {} to {}", from.display(), to.display());

        if let Err(source) = self.fs.rename(from, to) {
            self.discard_staging();
            return Err(Error::BackupFailed {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            });
        }
        Ok(ReplaceState::OriginalBackedUp)
    }

    /// `OriginalBackedUp -> Swapped`: rename `.tmp` onto the executable path.
    ///
    /// # Errors
    ///
    /// [`Error::SwapFailed`] once the backup is restored, or
    /// [`Error::RollbackFailed`] if the restore itself fails.
    pub fn swap(&self) -> Result<ReplaceState> {
        let (staging, target) = (self.paths.staging(), self.paths.executable());
        info!("Replacing {} with {}", target.display(), staging.display());

        let Err(swap_err) = self.fs.rename(staging, target) else {
            return Ok(ReplaceState::Swapped);
        };

        warn!("Swap failed ({swap_err}), restoring backup");
        if let Err(rollback) = self.fs.rename(self.paths.backup(), target) {
            return Err(Error::RollbackFailed {
                swap: swap_err,
                rollback,
                backup: self.paths.backup().to_path_buf(),
            });
        }
        self.discard_staging();

        Err(Error::SwapFailed {
            target: target.to_path_buf(),
            staging: staging.to_path_buf(),
            source: swap_err,
        })
    }

    /// `Swapped -> Done`: write the zero-length `.remove` marker.
    ///
    /// Failure is logged only; the update itself already succeeded.
    pub fn mark_for_reclaim(&self) -> bool {
        let marker = self.paths.marker();
        match self.fs.create_empty(marker) {
            Ok(()) => {
                info!("Backup marked for removal at next start");
                true
            }
            Err(e) => {
                warn!("Failed to create remove signal file {}: {e}", marker.display());
                false
            }
        }
    }

    fn discard_staging(&self) {
        let staging = self.paths.staging();
        if !self.fs.exists(staging) {
            return;
        }
        if let Err(e) = self.fs.remove_file(staging) {
            warn!("Failed to remove staging copy {}: {e}", staging.display());
        }
    }
}
