//! Locating (or fetching) the metadata patch tool.

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Places searched for rcedit, in priority order.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "./rcedit.exe",
    "./rcedit-x64.exe",
    "./rcedit-x86.exe",
    "/usr/local/bin/rcedit-x64",
    "/usr/local/bin/rcedit-x86",
    "C:\\Program Files\\rcedit.exe",
    "C:\\Program Files\\rcedit-x64.exe",
    "C:\\Program Files (x86)\\rcedit-x86.exe",
];

/// How a tool path was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOrigin {
    /// Supplied by the caller.
    Explicit,
    /// Found among the search candidates.
    Discovered,
    /// Downloaded during this run; deleted once the reference is dropped.
    Downloaded,
}

/// A resolved patch tool path.
///
/// Downloaded tools are ephemeral: dropping the reference deletes the file,
/// so every early return out of an update attempt still cleans it up.
#[derive(Debug)]
pub struct ToolReference {
    path: PathBuf,
    origin: ToolOrigin,
}

impl ToolReference {
    /// Wrap a path with its origin.
    #[must_use]
    pub fn new(path: PathBuf, origin: ToolOrigin) -> Self {
        Self { path, origin }
    }

    /// Path to the tool.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How the tool was obtained.
    #[must_use]
    pub fn origin(&self) -> ToolOrigin {
        self.origin
    }

    /// Whether the tool file belongs to this run and is deleted after use.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.origin == ToolOrigin::Downloaded
    }

    /// Release the tool now, deleting it if it was downloaded.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for ToolReference {
    fn drop(&mut self) {
        if !self.is_ephemeral() {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed downloaded tool {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove downloaded tool {}: {e}",
                self.path.display()
            ),
        }
    }
}

/// Fetches a URL into a file.
pub trait Downloader {
    /// Download `url` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DownloadFailed`] on any network or I/O error.
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// [`Downloader`] using a blocking reqwest client.
#[derive(Debug, Default)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("exestamp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::DownloadFailed(format!("failed to build HTTP client: {e}")))?;

        let mut response = client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::DownloadFailed(format!("request to {url} failed: {e}")))?;

        let mut out = fs::File::create(dest).map_err(|e| {
            Error::DownloadFailed(format!("failed to create {}: {e}", dest.display()))
        })?;

        if let Err(e) = response.copy_to(&mut out) {
            drop(out);
            let _ = fs::remove_file(dest);
            return Err(Error::DownloadFailed(format!(
                "failed to save {}: {e}",
                dest.display()
            )));
        }

        Ok(())
    }
}

/// Resolves the patch tool: explicit path, then candidates, then download.
pub struct ToolLocator {
    candidates: Vec<PathBuf>,
    download: DownloadConfig,
    download_dir: Option<PathBuf>,
    downloader: Box<dyn Downloader>,
}

impl ToolLocator {
    /// Locator with the default candidates and HTTP download.
    #[must_use]
    pub fn new(download: DownloadConfig) -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES.iter().map(PathBuf::from).collect(),
            download,
            download_dir: None,
            downloader: Box::new(HttpDownloader),
        }
    }

    /// Replace the search candidates.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Download into `dir` instead of the home directory.
    #[must_use]
    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.download_dir = Some(dir);
        self
    }

    /// Use a different downloader.
    #[must_use]
    pub fn with_downloader(mut self, downloader: Box<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Search candidates in priority order.
    #[must_use]
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Resolve the tool.
    ///
    /// An explicit path must exist; there is no fallback when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] for a missing explicit path and
    /// [`Error::DownloadFailed`] if nothing is found and the download fails.
    pub fn locate(&self, explicit: Option<&Path>) -> Result<ToolReference> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::ToolNotFound {
                    path: path.to_path_buf(),
                });
            }
            debug!("Using patch tool at {}", path.display());
            return Ok(ToolReference::new(path.to_path_buf(), ToolOrigin::Explicit));
        }

        info!("No rcedit path provided, searching local directories and standard paths");
        if let Some(found) = self.search() {
            info!("Found rcedit at {}", found.display());
            return Ok(ToolReference::new(found, ToolOrigin::Discovered));
        }

        info!("rcedit not found, attempting to download");
        self.download()
    }

    /// First existing candidate.
    #[must_use]
    pub fn search(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find(|p| {
                debug!("Probing {}", p.display());
                p.exists()
            })
            .cloned()
    }

    fn download(&self) -> Result<ToolReference> {
        let dir = match &self.download_dir {
            Some(dir) => dir.clone(),
            None => home_dir().ok_or_else(|| {
                Error::DownloadFailed("failed to get user home directory".to_string())
            })?,
        };
        let dest = dir.join(&self.download.file_name);
        let url = self.download.url_for_host();

        info!("Downloading {url} to {}", dest.display());
        self.downloader.fetch(url, &dest)?;
        let tool = ToolReference::new(dest, ToolOrigin::Downloaded);
        make_executable(tool.path())?;

        Ok(tool)
    }
}

fn home_dir() -> Option<PathBuf> {
    directories::UserDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| {
        Error::DownloadFailed(format!("failed to mark {} executable: {e}", path.display()))
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
