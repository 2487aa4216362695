//! Emits compile-time build metadata for `BuildInfo::embedded`.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");
    println!("cargo:rerun-if-changed=Cargo.lock");

    if let Some(hash) = command_output("git", &["rev-parse", "HEAD"]) {
        println!("cargo:rustc-env=EXESTAMP_GIT_HASH={hash}");
    }

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    if let Some(version) = command_output(&rustc, &["--version"]) {
        println!("cargo:rustc-env=EXESTAMP_RUSTC_VERSION={version}");
    }

    write_dependencies();
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Write `$OUT_DIR/dependencies.rs`: a `&[(name, version)]` slice of every
/// package resolved in Cargo.lock except this one.
fn write_dependencies() {
    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        return;
    };

    let mut source = String::from("&[\n");
    for (name, version) in locked_packages() {
        let _ = writeln!(source, "    ({name:?}, {version:?}),");
    }
    source.push(']');

    if let Err(e) = fs::write(out_dir.join("dependencies.rs"), source) {
        println!("cargo:warning=failed to write dependency list: {e}");
    }
}

fn locked_packages() -> Vec<(String, String)> {
    let Some(manifest_dir) = env::var_os("CARGO_MANIFEST_DIR").map(PathBuf::from) else {
        return Vec::new();
    };
    let Ok(content) = fs::read_to_string(manifest_dir.join("Cargo.lock")) else {
        println!("cargo:warning=Cargo.lock not found, dependency list is empty");
        return Vec::new();
    };
    let lock: toml::Table = match content.parse() {
        Ok(lock) => lock,
        Err(e) => {
            println!("cargo:warning=failed to parse Cargo.lock: {e}");
            return Vec::new();
        }
    };

    let own_name = env::var("CARGO_PKG_NAME").unwrap_or_default();
    lock.get("package")
        .and_then(toml::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|package| {
            let name = package.get("name")?.as_str()?;
            let version = package.get("version")?.as_str()?;
            (name != own_name).then(|| (name.to_string(), version.to_string()))
        })
        .collect()
}
