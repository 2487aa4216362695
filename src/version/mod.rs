//! Build and version metadata.

mod build_info;
mod git;
mod history;

pub use build_info::{BuildInfo, UNKNOWN};
pub use git::{Changelog, CommitDetails, Git, GitInfo};
pub use history::BuildHistory;
