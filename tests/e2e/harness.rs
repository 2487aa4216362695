//! Test fixture: a temporary install directory with a fake program and tool.

use exestamp::config::DownloadConfig;
use exestamp::update::{ToolLocator, WorkingPaths};
use exestamp::{UpdateOrchestrator, UpdaterConfig};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Contents of the fake program. When run it records its arguments.
pub const PROGRAM: &str = "#!/bin/sh\necho \"$@\" > \"$0.launched\"\n";

/// A temporary directory holding `prog` and helper scripts.
pub struct Fixture {
    dir: TempDir,
    paths: WorkingPaths,
}

impl Fixture {
    /// Directory with an executable `prog` script.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let exe = dir.path().join("prog");
        write_script(&exe, PROGRAM);
        Self {
            paths: WorkingPaths::new(exe),
            dir,
        }
    }

    /// Fixture whose program is a copy of `binary`.
    pub fn with_binary(binary: &Path) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let exe = dir.path().join("prog");
        fs::copy(binary, &exe).expect("Failed to copy binary");
        Self {
            paths: WorkingPaths::new(exe),
            dir,
        }
    }

    /// The install directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Working paths of `prog`.
    pub fn paths(&self) -> &WorkingPaths {
        &self.paths
    }

    /// Current bytes of `prog`.
    pub fn program_bytes(&self) -> Vec<u8> {
        fs::read(self.paths.executable()).expect("Failed to read program")
    }

    /// A fake rcedit that appends `# stamped <file version>` to its target.
    pub fn stamping_tool(&self) -> PathBuf {
        self.tool(
            "rcedit-stamp",
            "printf '# stamped %s\\n' \"$3\" >> \"$1\"",
        )
    }

    /// A fake rcedit that prints `output` and exits 1.
    pub fn failing_tool(&self, output: &str) -> PathBuf {
        self.tool("rcedit-fail", &format!("echo '{output}'\nexit 1"))
    }

    /// Write an executable script named `name` with the given body.
    pub fn tool(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        write_script(&path, &format!("#!/bin/sh\n{body}\n"));
        path
    }

    /// Config using `tool`, with no delays.
    pub fn config(&self, tool: Option<PathBuf>) -> UpdaterConfig {
        let mut config = UpdaterConfig::default();
        config.tool_path = tool;
        config.metadata.file_version = "2.0.0".to_string();
        config.metadata.product_name = "Prog".to_string();
        config.cleanup.backoff_step_ms = 0;
        config.restart.delay_ms = 0;
        config
    }

    /// Orchestrator over `prog` that never searches the system for rcedit.
    pub fn orchestrator(&self, config: UpdaterConfig) -> UpdateOrchestrator {
        let locator = ToolLocator::new(DownloadConfig::default())
            .with_candidates(Vec::new())
            .with_download_dir(self.dir.path().to_path_buf());
        UpdateOrchestrator::new(self.paths.clone(), config).with_locator(locator)
    }

    /// Names of the files in the install directory, sorted.
    pub fn listing(&self) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(self.dir.path())
            .expect("Failed to list dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("prog"))
            .collect();
        names.sort();
        names
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    condition()
}

fn write_script(path: &Path, content: &str) {
    fs::write(path, content).expect("Failed to write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .expect("Failed to set permissions");
}
