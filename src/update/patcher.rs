//! Stamping version resources into an executable with rcedit.

use crate::error::{Error, Result};
use crate::version::BuildInfo;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Version resource values written into the staging copy.
///
/// The internal name is always the product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFields {
    /// `FileVersion`.
    #[serde(default = "default_version")]
    pub file_version: String,
    /// `ProductVersion`.
    #[serde(default = "default_version")]
    pub product_version: String,
    /// `ProductName` and `InternalName`.
    #[serde(default = "default_name")]
    pub product_name: String,
    /// `FileDescription`.
    #[serde(default = "default_description")]
    pub description: String,
    /// `LegalCopyright`.
    #[serde(default)]
    pub legal: String,
    /// `CompanyName`.
    #[serde(default = "default_company")]
    pub company_name: String,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_description() -> String {
    env!("CARGO_PKG_DESCRIPTION").to_string()
}

fn default_company() -> String {
    env!("CARGO_PKG_AUTHORS").to_string()
}

impl Default for MetadataFields {
    fn default() -> Self {
        Self {
            file_version: default_version(),
            product_version: default_version(),
            product_name: default_name(),
            description: default_description(),
            legal: String::new(),
            company_name: default_company(),
        }
    }
}

/// Application-level values that are not part of [`BuildInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppMetadata {
    /// Product version, if it differs from the build version.
    pub product_version: Option<String>,
    /// Program name.
    pub program_name: String,
    /// File description.
    pub description: String,
    /// Copyright notice.
    pub legal: String,
    /// Company name.
    pub company_name: String,
}

impl MetadataFields {
    /// Combine a build's version with application metadata.
    #[must_use]
    pub fn from_build_info(info: &BuildInfo, app: AppMetadata) -> Self {
        Self {
            file_version: info.version.clone(),
            product_version: app.product_version.unwrap_or_else(|| info.version.clone()),
            product_name: app.program_name,
            description: app.description,
            legal: app.legal,
            company_name: app.company_name,
        }
    }

    /// `InternalName`, which mirrors the product name.
    #[must_use]
    pub fn internal_name(&self) -> &str {
        &self.product_name
    }

    /// rcedit arguments that stamp these fields into `target`.
    #[must_use]
    pub fn rcedit_args(&self, target: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![target.as_os_str().to_owned()];
        args.extend(
            [
                "--set-file-version",
                self.file_version.as_str(),
                "--set-product-version",
                self.product_version.as_str(),
            ]
            .map(OsString::from),
        );
        for (key, value) in [
            ("ProductName", self.product_name.as_str()),
            ("FileDescription", self.description.as_str()),
            ("LegalCopyright", self.legal.as_str()),
            ("CompanyName", self.company_name.as_str()),
            ("InternalName", self.internal_name()),
        ] {
            args.extend(["--set-version-string", key, value].map(OsString::from));
        }
        args
    }
}

/// Writes metadata into a binary.
pub trait Patcher {
    /// Stamp `fields` into the file at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PatchFailed`] with the tool's output on failure.
    fn patch(&self, target: &Path, fields: &MetadataFields) -> Result<()>;
}

/// [`Patcher`] that runs rcedit as a subprocess.
#[derive(Debug, Clone)]
pub struct RceditPatcher {
    tool: PathBuf,
}

impl RceditPatcher {
    /// Patcher for the tool at `tool`.
    #[must_use]
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }
}

impl Patcher for RceditPatcher {
    fn patch(&self, target: &Path, fields: &MetadataFields) -> Result<()> {
        debug!(
            "Running {} against {}",
            self.tool.display(),
            target.display()
        );

        let output = Command::new(&self.tool)
            .args(fields.rcedit_args(target))
            .output()
            .map_err(|e| Error::PatchFailed {
                status: format!("failed to launch {}: {e}", self.tool.display()),
                output: String::new(),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(Error::PatchFailed {
            status: output.status.to_string(),
            output: combined,
        })
    }
}
