//! Build metadata embedded in the program.

use crate::error::Result;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder for values unavailable at build time.
pub const UNKNOWN: &str = "unknown";

/// Packages resolved in Cargo.lock, written by the build script.
const LOCKED_DEPENDENCIES: &[(&str, &str)] =
    include!(concat!(env!("OUT_DIR"), "/dependencies.rs"));

/// Version information about one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Release version.
    pub version: String,
    /// Build timestamp (RFC 3339).
    pub build_date: String,
    /// Commit the build was made from.
    pub commit_hash: String,
    /// Compiler version.
    pub rust_version: String,
    /// Operating system.
    pub platform: String,
    /// CPU architecture.
    pub architecture: String,
    /// Random 128-bit identifier, hex encoded.
    pub build_id: String,
    /// Release channel, e.g. `release` or `beta`.
    pub release_type: String,
    /// Who made the build.
    pub developer: String,
    /// Dependency name to version.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// `{version}-{commit}({release_type}) | {date}`.
    pub detailed_version: String,
}

impl BuildInfo {
    /// Stamp a new build.
    #[must_use]
    pub fn new(version: &str, commit: &str, release_type: &str, developer: &str) -> Self {
        Self::at(Utc::now(), version, commit, release_type, developer)
    }

    fn at(
        now: DateTime<Utc>,
        version: &str,
        commit: &str,
        release_type: &str,
        developer: &str,
    ) -> Self {
        let release_type = if release_type.is_empty() {
            release_type_for(version)
        } else {
            release_type.to_string()
        };
        let detailed_version = format!(
            "{version}-{commit}({release_type}) | {}",
            now.format("%Y-%m-%d")
        );

        Self {
            version: version.to_string(),
            build_date: now.to_rfc3339(),
            commit_hash: commit.to_string(),
            rust_version: option_env!("EXESTAMP_RUSTC_VERSION")
                .unwrap_or(UNKNOWN)
                .to_string(),
            platform: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            build_id: generate_build_id(),
            release_type,
            developer: developer.to_string(),
            dependencies: BTreeMap::new(),
            detailed_version,
        }
    }

    /// Build info for this binary from compile-time values, including the
    /// dependency versions locked at build time.
    #[must_use]
    pub fn embedded() -> Self {
        let mut info = Self::new(
            env!("CARGO_PKG_VERSION"),
            option_env!("EXESTAMP_GIT_HASH").unwrap_or(UNKNOWN),
            "",
            env!("CARGO_PKG_AUTHORS"),
        );
        for (name, version) in LOCKED_DEPENDENCIES {
            info.add_dependency(name, version);
        }
        info
    }

    /// Record a dependency.
    pub fn add_dependency(&mut self, name: &str, version: &str) {
        self.dependencies
            .insert(name.to_string(), version.to_string());
    }

    /// Forget a dependency.
    pub fn remove_dependency(&mut self, name: &str) {
        self.dependencies.remove(name);
    }

    /// Markdown rendering.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        format!(
            "## Version Info\n\n\
             * **Version:** {}\n\
             * **Build Date:** {}\n\
             * **Commit Hash:** {}\n\
             * **Rust Version:** {}\n\
             * **Platform:** {}\n\
             * **Architecture:** {}\n\
             * **Build ID:** {}\n\
             * **Release Type:** {}\n\
             * **Developer:** {}\n\
             * **Detailed Version:** {}\n\
             * **Dependencies:** {}",
            self.version,
            self.build_date,
            self.commit_hash,
            self.rust_version,
            self.platform,
            self.architecture,
            self.build_id,
            self.release_type,
            self.developer,
            self.detailed_version,
            self.dependency_list(),
        )
    }

    /// JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn dependency_list(&self) -> String {
        if self.dependencies.is_empty() {
            return "none".to_string();
        }
        self.dependencies
            .iter()
            .map(|(name, version)| format!("{name} {version}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Build Date: {}", self.build_date)?;
        writeln!(f, "Commit: {}", self.commit_hash)?;
        writeln!(f, "Rust Version: {}", self.rust_version)?;
        writeln!(f, "Platform: {}", self.platform)?;
        writeln!(f, "Architecture: {}", self.architecture)?;
        writeln!(f, "Build ID: {}", self.build_id)?;
        writeln!(f, "Release Type: {}", self.release_type)?;
        writeln!(f, "Developer: {}", self.developer)?;
        writeln!(f, "Detailed Version: {}", self.detailed_version)?;
        write!(f, "Dependencies: {}", self.dependency_list())
    }
}

/// `release`, or the first pre-release identifier of a semver version.
fn release_type_for(version: &str) -> String {
    semver::Version::parse(version.trim_start_matches('v'))
        .ok()
        .filter(|v| !v.pre.is_empty())
        .and_then(|v| v.pre.as_str().split('.').next().map(str::to_string))
        .unwrap_or_else(|| "release".to_string())
}

fn generate_build_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
