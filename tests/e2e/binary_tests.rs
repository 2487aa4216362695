//! Runs of the built binary updating a copy of itself.

use super::harness::{wait_for, Fixture};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

fn binary() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_exestamp"))
}

/// Command running the fixture's copy of the binary with a clean environment.
fn prog(fixture: &Fixture) -> Command {
    let mut cmd = Command::new(fixture.paths().executable());
    for var in [
        "RUST_LOG",
        "EXESTAMP_RCEDIT",
        "EXESTAMP_FILE_VERSION",
        "EXESTAMP_PRODUCT_VERSION",
        "EXESTAMP_PRODUCT_NAME",
        "EXESTAMP_DESCRIPTION",
        "EXESTAMP_LEGAL",
        "EXESTAMP_COMPANY",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Write the fixture's config next to the program.
fn write_config(fixture: &Fixture, tool: PathBuf) -> PathBuf {
    let path = fixture.dir().join("exestamp.toml");
    fixture.config(Some(tool)).to_file(&path).unwrap();
    path
}

#[test]
fn test_binary_updates_itself_and_reclaims_on_restart() {
    let fixture = Fixture::with_binary(binary());
    let original = fixture.program_bytes();
    let config = write_config(&fixture, fixture.stamping_tool());

    let output = prog(&fixture)
        .arg("--update")
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "update failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // The replacement carries the stamp appended by the tool
    let patched = fixture.program_bytes();
    assert!(patched.starts_with(&original));
    assert!(patched.ends_with(b"# stamped 2.0.0\n"));

    // The restarted process clears the backup and the marker
    let backup = fixture.paths().backup().to_path_buf();
    let marker = fixture.paths().marker().to_path_buf();
    assert!(
        wait_for(Duration::from_secs(15), || !backup.exists() && !marker.exists()),
        "restarted process did not reclaim: {:?}",
        fixture.listing()
    );
    assert_eq!(fixture.listing(), vec!["prog".to_string()]);
}

#[test]
fn test_binary_reports_patch_failure() {
    let fixture = Fixture::with_binary(binary());
    let original = fixture.program_bytes();
    let config = write_config(&fixture, fixture.failing_tool("bad PE header"));

    let output = prog(&fixture)
        .arg("--update")
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad PE header"), "stderr: {stderr}");
    assert_eq!(fixture.program_bytes(), original);
    assert_eq!(fixture.listing(), vec!["prog".to_string()]);
}

#[test]
fn test_binary_clear_flag_reclaims_and_exits() {
    let fixture = Fixture::with_binary(binary());
    seed_reclaim(&fixture);

    let output = prog(&fixture).arg("--tmp-clear").output().unwrap();

    assert!(output.status.success());
    assert_eq!(fixture.listing(), vec!["prog".to_string()]);
}

#[test]
fn test_binary_build_info_json() {
    let fixture = Fixture::with_binary(binary());

    let output = prog(&fixture).args(["--build-info", "json"]).output().unwrap();

    assert!(output.status.success());
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(info["build_id"].as_str().map(str::len), Some(32));
    assert!(info["dependencies"]["serde"].is_string());
}

/// Seed a completed update's leftovers next to the program.
fn seed_reclaim(fixture: &Fixture) {
    fs::write(fixture.paths().backup(), b"old binary").unwrap();
    fs::write(fixture.paths().marker(), b"").unwrap();
}

#[test]
fn test_binary_clear_with_invalid_config_file() {
    let fixture = Fixture::with_binary(binary());
    seed_reclaim(&fixture);
    let config = fixture.dir().join("broken.toml");
    fs::write(&config, "[cleanup]\nmax_attempts = 0\n").unwrap();

    let output = prog(&fixture)
        .arg("--tmp-clear")
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(fixture.listing(), vec!["prog".to_string()]);
}

#[cfg(target_os = "linux")]
#[test]
fn test_binary_clear_with_invalid_default_config() {
    let fixture = Fixture::with_binary(binary());
    seed_reclaim(&fixture);
    let config_home = fixture.dir().join("xdg");
    fs::create_dir_all(config_home.join("exestamp")).unwrap();
    fs::write(
        config_home.join("exestamp").join("config.toml"),
        "[cleanup]\nmax_attempts = 0\n",
    )
    .unwrap();

    // The restarted child gets no --config and falls back to the default path
    let output = prog(&fixture)
        .arg("--tmp-clear")
        .env("XDG_CONFIG_HOME", &config_home)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(fixture.listing(), vec!["prog".to_string()]);
}

#[test]
fn test_binary_update_with_invalid_config_fails_cleanly() {
    let fixture = Fixture::with_binary(binary());
    let original = fixture.program_bytes();
    let config = fixture.dir().join("broken.toml");
    fs::write(&config, "[cleanup]\nmax_attempts = 0\n").unwrap();

    let output = prog(&fixture)
        .arg("--update")
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_attempts"));
    assert_eq!(fixture.program_bytes(), original);
}
