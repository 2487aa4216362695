//! Relaunching the updated executable.

use crate::config::RestartConfig;
use crate::error::{Error, Result};
use std::convert::Infallible;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::info;

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Starts the new binary and ends the current process.
#[derive(Debug, Clone)]
pub struct RestartCoordinator {
    executable: PathBuf,
    argument: OsString,
    delay: Duration,
}

impl RestartCoordinator {
    /// Coordinator that relaunches `executable` with `argument`.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>, argument: impl Into<OsString>, delay: Duration) -> Self {
        Self {
            executable: executable.into(),
            argument: argument.into(),
            delay,
        }
    }

    /// Coordinator configured from [`RestartConfig`].
    #[must_use]
    pub fn from_config(executable: &Path, config: &RestartConfig) -> Self {
        Self::new(executable, &config.argument, config.delay())
    }

    /// The executable that will be launched.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The restart argument.
    #[must_use]
    pub fn argument(&self) -> &OsString {
        &self.argument
    }

    /// The command that [`launch`](Self::launch) spawns.
    #[must_use]
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(&self.argument)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        cmd
    }

    /// Wait out the settle delay and spawn the detached child.
    ///
    /// Returns the child's process id. The child is not waited on.
    ///
    /// # Errors
    ///
    /// [`Error::RestartLaunchFailed`] if the spawn fails. No retry is made.
    pub fn launch(&self) -> Result<u32> {
        info!("Update successful! Restarting...");
        std::thread::sleep(self.delay);

        let child = self
            .command()
            .spawn()
            .map_err(|source| Error::RestartLaunchFailed {
                path: self.executable.clone(),
                source,
            })?;

        info!(
            "Started {} (pid {})",
            self.executable.display(),
            child.id()
        );
        Ok(child.id())
    }

    /// Launch the new process and exit this one with status 0.
    ///
    /// # Errors
    ///
    /// Only returns if the launch fails.
    pub fn restart(&self) -> Result<Infallible> {
        self.launch()?;
        std::process::exit(0)
    }
}
