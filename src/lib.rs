//! # exestamp
//!
//! Embeds build metadata into a program and keeps its on-disk executable in
//! step with it. The self-replacement engine copies the running binary,
//! stamps the copy's version resources with an external tool (rcedit),
//! swaps it in with a rename, keeps a rollback backup and reclaims that
//! backup on the next start.
//!
//! ## Startup
//!
//! Host programs call [`run_startup`] (or [`run_startup_with_file`], which
//! loads the configuration itself) before anything else in `main`. It
//! reclaims a stale backup left by a previous update, even when the
//! configuration is broken, and handles the `--update` and `--tmp-clear`
//! triggers:
//!
//! ```rust,ignore
//! use exestamp::{run_startup_with_file, Startup};
//!
//! match run_startup_with_file(std::env::args().skip(1), None) {
//!     Ok(Startup::Continue) => { /* normal program logic */ }
//!     Ok(Startup::Exit(code)) => std::process::exit(code),
//!     Err(e) => { eprintln!("{e}"); std::process::exit(1) }
//! }
//! ```
//!
//! ## On-disk layout
//!
//! Next to the executable `prog`:
//!
//! - `prog.tmp`: patched staging copy
//! - `prog.bak`: the pre-update binary, kept until reclaimed
//! - `prog.remove`: empty marker meaning "a backup is owed a reclaim"
//!
//! Only one update attempt may be in flight per installation.

pub mod config;
pub mod error;
pub mod update;
pub mod version;

pub use config::UpdaterConfig;
pub use error::{Error, Result};
pub use update::{run_startup, run_startup_with_file, startup, Startup, Trigger, UpdateOrchestrator};
pub use version::{BuildHistory, BuildInfo, Changelog, GitInfo};
