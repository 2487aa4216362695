//! Filesystem operations used by the replacer and cleanup.
//!
//! Everything that touches the executable and its siblings goes through
//! [`FileSystem`], so failures at each step can be injected in tests.

use std::fs;
use std::io;
use std::path::Path;

/// Filesystem primitives the update pipeline relies on.
pub trait FileSystem {
    /// Byte-copy `from` to `to`, replacing `to`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Rename `from` to `to` within one directory.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create (or truncate) a zero-length file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn create_empty(&self, path: &Path) -> io::Result<()>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Make a file writable by everyone so it can be deleted.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn relax_permissions(&self, path: &Path) -> io::Result<()>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FileSystem for StdFs {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_empty(&self, path: &Path) -> io::Result<()> {
        fs::File::create(path).map(drop)
    }

    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling entry still counts as present
        fs::symlink_metadata(path).is_ok()
    }

    #[cfg(unix)]
    fn relax_permissions(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o666))
    }

    #[cfg(not(unix))]
    fn relax_permissions(&self, path: &Path) -> io::Result<()> {
        let mut perms = fs::metadata(path)?.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(path, perms)
    }
}
