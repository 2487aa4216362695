//! Top-level dispatch of the update triggers.

use super::cleanup::{CleanupOutcome, CleanupSignal, RetryPolicy};
use super::fs::{FileSystem, StdFs};
use super::locator::ToolLocator;
use super::patcher::RceditPatcher;
use super::paths::WorkingPaths;
use super::replacer::AtomicReplacer;
use super::restart::RestartCoordinator;
use crate::config::UpdaterConfig;
use crate::error::Result;
use std::ffi::OsStr;
use tracing::{error, info};

/// Argument that requests an update.
pub const UPDATE_ARG: &str = "--update";

/// Argument that requests a cleanup only.
pub const CLEAR_ARG: &str = "--tmp-clear";

/// What the process was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Reclaim temporary state and exit.
    ClearTemporary,
    /// Patch and swap the executable, then restart.
    Update,
    /// Not an update invocation.
    None,
}

impl Trigger {
    /// Trigger named by the first argument (program name excluded).
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        match args.into_iter().next() {
            Some(arg) if arg.as_ref() == CLEAR_ARG => Self::ClearTemporary,
            Some(arg) if arg.as_ref() == UPDATE_ARG => Self::Update,
            _ => Self::None,
        }
    }
}

/// What the caller must do after [`UpdateOrchestrator::run`].
#[derive(Debug)]
pub enum Dispatch {
    /// Carry on with normal program logic.
    Inert,
    /// Temporary state was cleared; exit with status 0.
    Cleared(CleanupOutcome),
    /// The executable was replaced; restart through the coordinator.
    Restart(RestartCoordinator),
}

/// Composes cleanup, tool lookup, replacement and restart.
pub struct UpdateOrchestrator {
    paths: WorkingPaths,
    config: UpdaterConfig,
    locator: ToolLocator,
    fs: Box<dyn FileSystem>,
}

impl UpdateOrchestrator {
    /// Orchestrator for `paths` with the real filesystem and locator.
    #[must_use]
    pub fn new(paths: WorkingPaths, config: UpdaterConfig) -> Self {
        let locator = ToolLocator::new(config.download.clone());
        Self {
            paths,
            config,
            locator,
            fs: Box::new(StdFs),
        }
    }

    /// Orchestrator for the running executable.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable path cannot be resolved.
    pub fn for_current_exe(config: UpdaterConfig) -> Result<Self> {
        Ok(Self::new(WorkingPaths::current()?, config))
    }

    /// Use a different tool locator.
    #[must_use]
    pub fn with_locator(mut self, locator: ToolLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Use a different filesystem.
    #[must_use]
    pub fn with_file_system(mut self, fs: Box<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// The working paths.
    #[must_use]
    pub fn paths(&self) -> &WorkingPaths {
        &self.paths
    }

    /// Run the cleanup signal.
    pub fn reclaim(&self) -> CleanupOutcome {
        let policy = RetryPolicy::from(&self.config.cleanup);
        CleanupSignal::new(&self.paths, self.fs.as_ref(), policy).reclaim()
    }

    /// Handle a trigger. Cleanup always runs first.
    ///
    /// # Errors
    ///
    /// Any failure of the update path: tool resolution, staging, patching,
    /// backup or swap.
    pub fn run(&self, trigger: Trigger) -> Result<Dispatch> {
        let outcome = self.reclaim();

        match trigger {
            Trigger::None => Ok(Dispatch::Inert),
            Trigger::ClearTemporary => {
                info!("Temporary files cleared");
                Ok(Dispatch::Cleared(outcome))
            }
            Trigger::Update => self.update().map(Dispatch::Restart),
        }
    }

    /// Locate the tool and replace the executable, without the leading
    /// reclaim that [`run`](Self::run) performs.
    ///
    /// # Errors
    ///
    /// Tool resolution, staging, patching, backup or swap failures.
    pub fn update(&self) -> Result<RestartCoordinator> {
        let tool = self.locator.locate(self.config.tool_path.as_deref())?;
        let patcher = RceditPatcher::new(tool.path());

        let result = AtomicReplacer::new(&self.paths, self.fs.as_ref(), &patcher)
            .replace(&self.config.metadata);
        tool.dispose();

        if let Err(e) = &result {
            error!("Update failed: {e}");
        }
        result?;

        Ok(RestartCoordinator::from_config(
            self.paths.executable(),
            &self.config.restart,
        ))
    }
}
