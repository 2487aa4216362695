//! Bounded history of builds, persisted as JSON.

use super::BuildInfo;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use tracing::debug;

/// The most recent builds, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildHistory {
    builds: VecDeque<BuildInfo>,
    limit: usize,
}

impl BuildHistory {
    /// Empty history holding at most `limit` builds (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            builds: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Append a build, evicting the oldest when full.
    pub fn add_build(&mut self, info: BuildInfo) {
        while self.builds.len() >= self.limit {
            self.builds.pop_front();
        }
        self.builds.push_back(info);
    }

    /// The newest build.
    #[must_use]
    pub fn latest(&self) -> Option<&BuildInfo> {
        self.builds.back()
    }

    /// Build at `index`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::History`] if `index` is out of range.
    pub fn get(&self, index: usize) -> Result<&BuildInfo> {
        self.builds.get(index).ok_or_else(|| {
            Error::History(format!(
                "invalid index {index} (history holds {})",
                self.builds.len()
            ))
        })
    }

    /// All builds, oldest first.
    pub fn list(&self) -> impl Iterator<Item = &BuildInfo> {
        self.builds.iter()
    }

    /// Number of builds held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.builds.len()
    }

    /// Whether no builds are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    /// Capacity.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Write the history to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec(self)?;
        std::fs::write(path, data).map_err(|e| {
            Error::History(format!(
                "failed to write build history to {}: {e}",
                path.display()
            ))
        })?;
        debug!("Saved {} builds to {}", self.len(), path.display());
        Ok(())
    }

    /// Read a history written by [`save_to_file`](Self::save_to_file).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            Error::History(format!(
                "failed to read build history file {}: {e}",
                path.display()
            ))
        })?;
        let mut history: Self = serde_json::from_slice(&data)?;
        history.limit = history.limit.max(1);
        while history.builds.len() > history.limit {
            history.builds.pop_front();
        }
        Ok(history)
    }
}
