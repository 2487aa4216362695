//! Command-line interface definition.

use clap::{ArgGroup, Parser, ValueEnum};
use exestamp::{Trigger, UpdaterConfig};
use std::path::PathBuf;

/// Stamp version metadata into this executable, swap it in place and restart.
#[derive(Parser, Debug)]
#[command(name = "exestamp")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("trigger").args(["update", "tmp_clear"])))]
pub struct Cli {
    /// Patch this executable's metadata, replace it and restart.
    #[arg(long)]
    pub update: bool,

    /// Reclaim the backup left by a previous update and exit.
    #[arg(long = "tmp-clear")]
    pub tmp_clear: bool,

    /// Path to rcedit (skips the search and download).
    #[arg(long, env = "EXESTAMP_RCEDIT")]
    pub rcedit: Option<PathBuf>,

    /// File version to stamp.
    #[arg(long, env = "EXESTAMP_FILE_VERSION")]
    pub file_version: Option<String>,

    /// Product version to stamp.
    #[arg(long, env = "EXESTAMP_PRODUCT_VERSION")]
    pub product_version: Option<String>,

    /// Product (and internal) name to stamp.
    #[arg(long, env = "EXESTAMP_PRODUCT_NAME")]
    pub product_name: Option<String>,

    /// File description to stamp.
    #[arg(long, env = "EXESTAMP_DESCRIPTION")]
    pub description: Option<String>,

    /// Copyright notice to stamp.
    #[arg(long, env = "EXESTAMP_LEGAL")]
    pub legal: Option<String>,

    /// Company name to stamp.
    #[arg(long, env = "EXESTAMP_COMPANY")]
    pub company: Option<String>,

    /// Print the embedded build information.
    #[arg(long, value_enum, num_args = 0..=1, default_missing_value = "text")]
    pub build_info: Option<OutputFormat>,

    /// Print the git changelog of the current directory.
    #[arg(long)]
    pub changelog: bool,

    /// Only list commits after this revision.
    #[arg(long, requires = "changelog")]
    pub since: Option<String>,

    /// Changelog output format.
    #[arg(long, value_enum, default_value = "markdown", requires = "changelog")]
    pub changelog_format: OutputFormat,

    /// Append this build to a JSON build history file.
    #[arg(long)]
    pub record_build: Option<PathBuf>,

    /// Builds kept in the history file.
    #[arg(long, default_value = "10")]
    pub history_limit: usize,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON.
    #[arg(long)]
    pub log_json: bool,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text.
    Text,
    /// JSON.
    Json,
    /// Markdown.
    Markdown,
}

impl Cli {
    /// The update trigger selected by the flags.
    #[must_use]
    pub fn trigger(&self) -> Trigger {
        if self.update {
            Trigger::Update
        } else if self.tmp_clear {
            Trigger::ClearTemporary
        } else {
            Trigger::None
        }
    }

    /// Build the updater configuration from file values and flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be loaded or the result is
    /// invalid.
    pub fn to_config(&self) -> exestamp::Result<UpdaterConfig> {
        let mut config = UpdaterConfig::load(self.config.as_deref())?;

        if let Some(ref path) = self.rcedit {
            config.tool_path = Some(path.clone());
        }

        let metadata = &mut config.metadata;
        for (value, field) in [
            (&self.file_version, &mut metadata.file_version),
            (&self.product_version, &mut metadata.product_version),
            (&self.product_name, &mut metadata.product_name),
            (&self.description, &mut metadata.description),
            (&self.legal, &mut metadata.legal),
            (&self.company, &mut metadata.company_name),
        ] {
            if let Some(value) = value {
                field.clone_from(value);
            }
        }

        config.validate()?;
        Ok(config)
    }
}
