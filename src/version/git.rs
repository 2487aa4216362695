//! Commit and changelog metadata read from the `git` CLI.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// `git log` format parsed by [`Changelog::parse`].
const LOG_FORMAT: &str = "--pretty=format:%h - %s - %an <%ae> - %ad";

/// Repository state at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    /// Full commit hash.
    pub commit_hash: String,
    /// Seven-character commit hash.
    pub commit_hash_short: String,
    /// Current branch.
    pub branch_name: String,
    /// Commit date (`YYYY-MM-DD`).
    pub commit_date: String,
    /// Commits since a reference, if collected.
    #[serde(default)]
    pub changelog: Option<Changelog>,
}

/// One parsed `git log` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetails {
    /// Abbreviated hash.
    pub hash: String,
    /// Subject line.
    pub message: String,
    /// Author name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Author date (ISO format).
    pub date: String,
}

/// Raw log lines plus the commits that parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changelog {
    /// Every log line as printed.
    pub entries: Vec<String>,
    /// Lines that matched the expected format.
    pub commits: Vec<CommitDetails>,
}

/// Runs git in a fixed working directory.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    /// Git runner for the repository containing `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Repository directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Full hash of `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Git`] if git fails.
    pub fn commit_hash(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"])
    }

    /// Abbreviated hash of `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Git`] if git fails.
    pub fn commit_hash_short(&self) -> Result<String> {
        self.run(&["rev-parse", "--short", "HEAD"])
    }

    /// Current branch name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Git`] if git fails.
    pub fn branch_name(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Date of the last commit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Git`] if git fails.
    pub fn commit_date(&self) -> Result<String> {
        self.run(&["log", "-1", "--format=%cd", "--date=short"])
    }

    /// Non-merge commits, optionally only those after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Git`] if git fails.
    pub fn changelog(&self, since: Option<&str>) -> Result<Changelog> {
        let range = since.map(|s| format!("{s}..HEAD"));
        let mut args = vec!["log", LOG_FORMAT, "--no-merges", "--date=iso"];
        if let Some(range) = range.as_deref() {
            args.push(range);
        }
        Ok(Changelog::parse(&self.run(&args)?))
    }

    /// Collect [`GitInfo`] for `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Git`] if any git query fails.
    pub fn info(&self) -> Result<GitInfo> {
        Ok(GitInfo {
            commit_hash: self.commit_hash()?,
            commit_hash_short: self.commit_hash_short()?,
            branch_name: self.branch_name()?,
            commit_date: self.commit_date()?,
            changelog: None,
        })
    }
}

impl GitInfo {
    /// Override the commit hash; the short hash is derived from it.
    #[must_use]
    pub fn with_commit_hash(mut self, hash: &str) -> Self {
        self.commit_hash = hash.to_string();
        self.commit_hash_short = hash.chars().take(7).collect();
        self
    }

    /// Override the branch name.
    #[must_use]
    pub fn with_branch_name(mut self, branch: &str) -> Self {
        self.branch_name = branch.to_string();
        self
    }

    /// Override the commit date.
    #[must_use]
    pub fn with_commit_date(mut self, date: &str) -> Self {
        self.commit_date = date.to_string();
        self
    }

    /// Attach a changelog.
    #[must_use]
    pub fn with_changelog(mut self, changelog: Changelog) -> Self {
        self.changelog = Some(changelog);
        self
    }
}

impl Changelog {
    /// Parse `git log` output in [`LOG_FORMAT`].
    ///
    /// Lines that do not match are kept in `entries` only.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let mut changelog = Self::default();
        for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
            changelog.entries.push(line.to_string());
            if let Some(commit) = parse_line(line) {
                changelog.commits.push(commit);
            }
        }
        changelog
    }

    /// Markdown bullet list of the raw entries.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Changelog\n\n");
        for entry in &self.entries {
            let _ = writeln!(out, "- {entry}");
        }
        out
    }

    /// JSON array of the parsed commits.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.commits)?)
    }
}

fn parse_line(line: &str) -> Option<CommitDetails> {
    let (hash, rest) = line.split_once(" - ")?;
    // subjects may contain the separator, so author and date come off the right
    let mut tail = rest.rsplitn(3, " - ");
    let date = tail.next()?;
    let author_part = tail.next()?;
    let message = tail.next()?;

    let open = author_part.find('<')?;
    let close = author_part[open..].find('>')? + open;

    Some(CommitDetails {
        hash: hash.to_string(),
        message: message.to_string(),
        author: author_part[..open].trim().to_string(),
        email: author_part[open + 1..close].to_string(),
        date: date.to_string(),
    })
}
