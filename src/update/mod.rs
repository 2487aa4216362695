//! Self-replacement engine.
//!
//! This module handles:
//! - Finding or downloading the metadata patch tool
//! - Stamping metadata into a staging copy of the running executable
//! - Swapping the copy in with rollback on failure
//! - Restarting, and reclaiming the backup on the next start

mod cleanup;
mod fs;
mod locator;
mod orchestrator;
mod patcher;
mod paths;
mod replacer;
mod restart;

pub use cleanup::{remove_with_retry, BackupDisposition, CleanupOutcome, CleanupSignal, RetryPolicy};
pub use fs::{FileSystem, StdFs};
pub use locator::{Downloader, HttpDownloader, ToolLocator, ToolOrigin, ToolReference, DEFAULT_CANDIDATES};
pub use orchestrator::{Dispatch, Trigger, UpdateOrchestrator, CLEAR_ARG, UPDATE_ARG};
pub use patcher::{AppMetadata, MetadataFields, Patcher, RceditPatcher};
pub use paths::{WorkingPaths, BACKUP_SUFFIX, MARKER_SUFFIX, STAGING_SUFFIX, STALE_BACKUP_SUFFIX};
pub use replacer::{AtomicReplacer, ReplaceReport, ReplaceState};
pub use restart::RestartCoordinator;

use crate::config::UpdaterConfig;
use crate::error::Result;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};

/// What the host program should do after [`run_startup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    /// No trigger was given; run normally.
    Continue,
    /// Exit now with this status.
    Exit(i32),
}

/// Reclaim a stale backup and handle the update triggers.
///
/// Call this first in `main`, passing the arguments after the program name.
/// On a successful `--update` the new binary is launched and this process
/// exits, so the function does not return.
///
/// # Errors
///
/// Returns an error if the executable path cannot be resolved or the update
/// fails at any step. The original executable is intact in every case except
/// [`crate::Error::RollbackFailed`].
pub fn run_startup<I, S>(args: I, config: &UpdaterConfig) -> Result<Startup>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    startup(Trigger::from_args(args), Ok(config.clone()))
}

/// [`run_startup`] with the configuration read from `path`, or from the
/// default location.
///
/// A config file that fails to load does not stop the reclaim. It only
/// fails an `--update`.
///
/// # Errors
///
/// As [`run_startup`], plus the config error when updating.
pub fn run_startup_with_file<I, S>(args: I, path: Option<&Path>) -> Result<Startup>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    startup(Trigger::from_args(args), UpdaterConfig::load(path))
}

/// Reclaim, then act on `trigger`.
///
/// The reclaim runs before `config` is looked at. If the configuration
/// failed to load, the default cleanup settings are used and the error only
/// matters for [`Trigger::Update`].
///
/// # Errors
///
/// Returns an error if the executable path cannot be resolved, or, for an
/// update, if the configuration is unusable or the update fails.
pub fn startup(trigger: Trigger, config: Result<UpdaterConfig>) -> Result<Startup> {
    let paths = WorkingPaths::current()?;

    let policy = match &config {
        Ok(config) => RetryPolicy::from(&config.cleanup),
        Err(e) => {
            warn!("Failed to load configuration, reclaiming with defaults: {e}");
            RetryPolicy::default()
        }
    };
    CleanupSignal::new(&paths, &StdFs, policy).reclaim();

    match trigger {
        Trigger::None => Ok(Startup::Continue),
        Trigger::ClearTemporary => {
            info!("Temporary files cleared");
            Ok(Startup::Exit(0))
        }
        Trigger::Update => {
            let restart = UpdateOrchestrator::new(paths, config?).update()?;
            match restart.restart()? {}
        }
    }
}
