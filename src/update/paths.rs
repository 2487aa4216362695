//! Suffixed sibling paths of the running executable.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix of the patched staging copy.
pub const STAGING_SUFFIX: &str = ".tmp";

/// Suffix of the pre-update backup.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Suffix of the zero-byte reclaim marker.
pub const MARKER_SUFFIX: &str = ".remove";

/// Appended to the backup when it cannot be deleted.
pub const STALE_BACKUP_SUFFIX: &str = ".old";

/// The executable path and the three working paths derived from it.
///
/// The suffixes are appended to the full file name, so `prog.exe` becomes
/// `prog.exe.tmp`, never `prog.tmp`. All four paths share a directory, which
/// keeps every rename on one volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingPaths {
    executable: PathBuf,
    staging: PathBuf,
    backup: PathBuf,
    marker: PathBuf,
}

impl WorkingPaths {
    /// Derive working paths for an executable.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        Self {
            staging: with_suffix(&executable, STAGING_SUFFIX),
            backup: with_suffix(&executable, BACKUP_SUFFIX),
            marker: with_suffix(&executable, MARKER_SUFFIX),
            executable,
        }
    }

    /// Working paths of the currently running binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable path cannot be resolved.
    pub fn current() -> Result<Self> {
        let exe = std::env::current_exe()
            .and_then(|p| p.canonicalize())
            .map_err(Error::ExecutablePath)?;
        Ok(Self::new(exe))
    }

    /// The executable itself.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The `.tmp` staging copy.
    #[must_use]
    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// The `.bak` backup.
    #[must_use]
    pub fn backup(&self) -> &Path {
        &self.backup
    }

    /// The `.remove` reclaim marker.
    #[must_use]
    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Where an undeletable backup is moved aside to (`.bak.old`).
    #[must_use]
    pub fn stale_backup(&self) -> PathBuf {
        with_suffix(&self.backup, STALE_BACKUP_SUFFIX)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
