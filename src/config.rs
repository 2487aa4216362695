//! Configuration for exestamp.

use crate::update::MetadataFields;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Release download for 64-bit hosts.
pub const RCEDIT_URL_X64: &str =
    "https://github.com/electron/rcedit/releases/download/v1.1.1/rcedit-x64.exe";

/// Release download for 32-bit x86 hosts.
pub const RCEDIT_URL_X86: &str =
    "https://github.com/electron/rcedit/releases/download/v1.1.1/rcedit-x86.exe";

/// Updater configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Metadata stamped into the executable.
    #[serde(default)]
    pub metadata: MetadataFields,

    /// Explicit path to the patch tool. Disables the search and download.
    #[serde(default)]
    pub tool_path: Option<PathBuf>,

    /// Backup reclaim settings.
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Restart settings.
    #[serde(default)]
    pub restart: RestartConfig,

    /// Tool download settings.
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Backup reclaim configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Deletion attempts before the backup is moved aside.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Attempt `n` waits `n * backoff_step_ms` before retrying.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

/// Restart configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartConfig {
    /// Pause before relaunching, in milliseconds.
    #[serde(default = "default_restart_delay_ms")]
    pub delay_ms: u64,

    /// Argument passed to the relaunched executable.
    #[serde(default = "default_restart_argument")]
    pub argument: String,
}

/// Download fallback configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// URL used on 64-bit hosts.
    #[serde(default = "default_url_x64")]
    pub url_x64: String,

    /// URL used on 32-bit x86 hosts.
    #[serde(default = "default_url_x86")]
    pub url_x86: String,

    /// File name of the download inside the home directory.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
        }
    }
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_restart_delay_ms(),
            argument: default_restart_argument(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            url_x64: default_url_x64(),
            url_x86: default_url_x86(),
            file_name: default_file_name(),
        }
    }
}

impl CleanupConfig {
    /// Backoff step as a duration.
    #[must_use]
    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }
}

impl RestartConfig {
    /// Restart delay as a duration.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl DownloadConfig {
    /// URL matching the architecture this binary was built for.
    #[must_use]
    pub fn url_for_host(&self) -> &str {
        if cfg!(target_arch = "x86") {
            &self.url_x86
        } else {
            &self.url_x64
        }
    }
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_backoff_step_ms() -> u64 {
    100
}

const fn default_restart_delay_ms() -> u64 {
    1000
}

fn default_restart_argument() -> String {
    "--tmp-clear".to_string()
}

fn default_url_x64() -> String {
    RCEDIT_URL_X64.to_string()
}

fn default_url_x86() -> String {
    RCEDIT_URL_X86.to_string()
}

fn default_file_name() -> String {
    "rcedit.exe".to_string()
}

/// Default configuration file location (`<config dir>/exestamp/config.toml`).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "exestamp")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl UpdaterConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails
    /// validation.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path`, or from the default location if it exists, or fall
    /// back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be loaded.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(default) if default.is_file() => {
                debug!("Loading config from {}", default.display());
                Self::from_file(&default)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Check values that would make the pipeline misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] describing the first problem found.
    pub fn validate(&self) -> crate::Result<()> {
        if self.cleanup.max_attempts == 0 {
            return Err(crate::Error::Config(
                "cleanup.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.metadata.file_version.trim().is_empty() {
            return Err(crate::Error::Config(
                "metadata.file_version must not be empty".to_string(),
            ));
        }
        if self.restart.argument.is_empty() {
            return Err(crate::Error::Config(
                "restart.argument must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = UpdaterConfig::default();
        assert_eq!(config.cleanup.max_attempts, 5);
        assert_eq!(config.cleanup.backoff_step(), Duration::from_millis(100));
        assert_eq!(config.restart.delay(), Duration::from_secs(1));
        assert_eq!(config.restart.argument, "--tmp-clear");
        assert_eq!(config.download.file_name, "rcedit.exe");
        assert!(config.tool_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = UpdaterConfig::default();
        config.metadata.file_version = "2.0.0".to_string();
        config.metadata.product_name = "Prog".to_string();
        config.tool_path = Some(PathBuf::from("/opt/rcedit.exe"));
        config.to_file(&path).unwrap();

        let loaded = UpdaterConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cleanup]\nmax_attempts = 3\n").unwrap();

        let loaded = UpdaterConfig::from_file(&path).unwrap();
        assert_eq!(loaded.cleanup.max_attempts, 3);
        assert_eq!(loaded.cleanup.backoff_step_ms, 100);
        assert_eq!(loaded.restart, RestartConfig::default());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cleanup]\nmax_attempts = 0\n").unwrap();

        let err = UpdaterConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "metadata = [").unwrap();

        assert!(matches!(
            UpdaterConfig::from_file(&path),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = UpdaterConfig::load(Some(&dir.path().join("missing.toml")));
        assert!(result.is_err());
    }
}
