//! Library-level runs of the full update cycle against real files and
//! processes.

use super::harness::{wait_for, Fixture, PROGRAM};
use exestamp::update::{BackupDisposition, CleanupOutcome, Dispatch};
use exestamp::{Error, Trigger};
use std::fs;
use std::time::Duration;

#[test]
fn test_update_cycle_then_reclaim() {
    let fixture = Fixture::new();
    let tool = fixture.stamping_tool();
    let orch = fixture.orchestrator(fixture.config(Some(tool.clone())));

    let dispatch = orch.run(Trigger::Update).expect("update should succeed");
    let Dispatch::Restart(restart) = dispatch else {
        unreachable!("expected a restart dispatch");
    };

    // Patched binary in place, original kept as backup, marker written
    let patched = String::from_utf8(fixture.program_bytes()).unwrap();
    assert!(patched.starts_with(PROGRAM));
    assert!(patched.ends_with("# stamped 2.0.0\n"));
    assert_eq!(fs::read_to_string(fixture.paths().backup()).unwrap(), PROGRAM);
    assert!(fixture.paths().marker().exists());
    assert!(!fixture.paths().staging().exists());
    // An explicit tool is never deleted
    assert!(tool.exists());

    // Relaunch the replacement with the clear argument
    assert_eq!(restart.argument(), "--tmp-clear");
    restart.launch().expect("relaunch should spawn");
    let launched = fixture.dir().join("prog.launched");
    assert!(wait_for(Duration::from_secs(5), || launched.exists()));
    assert!(wait_for(Duration::from_secs(5), || {
        fs::read_to_string(&launched).is_ok_and(|s| s.trim() == "--tmp-clear")
    }));
    fs::remove_file(&launched).unwrap();

    // The relaunched process reclaims
    let dispatch = orch.run(Trigger::ClearTemporary).unwrap();
    let Dispatch::Cleared(outcome) = dispatch else {
        unreachable!("expected a cleared dispatch");
    };
    assert_eq!(
        outcome,
        CleanupOutcome::Attempted {
            backup: BackupDisposition::Deleted,
            marker_cleared: true,
        }
    );
    assert_eq!(fixture.listing(), vec!["prog".to_string()]);
}

#[test]
fn test_patch_failure_leaves_executable_untouched() {
    let fixture = Fixture::new();
    let tool = fixture.failing_tool("bad PE header");
    let orch = fixture.orchestrator(fixture.config(Some(tool)));

    let err = orch.run(Trigger::Update).expect_err("update should fail");

    assert!(
        matches!(&err, Error::PatchFailed { output, .. } if output.contains("bad PE header")),
        "unexpected error: {err}"
    );
    assert_eq!(fixture.program_bytes(), PROGRAM.as_bytes());
    assert_eq!(fixture.listing(), vec!["prog".to_string()]);
}

#[test]
fn test_missing_tool_fails_before_touching_disk() {
    let fixture = Fixture::new();
    let missing = fixture.dir().join("no-such-rcedit");
    let orch = fixture.orchestrator(fixture.config(Some(missing.clone())));

    let err = orch.run(Trigger::Update).expect_err("update should fail");

    assert!(matches!(&err, Error::ToolNotFound { path } if *path == missing));
    assert_eq!(fixture.listing(), vec!["prog".to_string()]);
}

#[test]
fn test_repeated_updates_replace_backup() {
    let fixture = Fixture::new();
    let tool = fixture.stamping_tool();
    let orch = fixture.orchestrator(fixture.config(Some(tool)));

    orch.run(Trigger::Update).unwrap();
    let after_first = fixture.program_bytes();

    // Second update runs reclaim first, so the old backup is gone before
    // the new one is written
    orch.run(Trigger::Update).unwrap();

    assert_eq!(fs::read(fixture.paths().backup()).unwrap(), after_first);
    let patched = String::from_utf8(fixture.program_bytes()).unwrap();
    assert_eq!(patched.matches("# stamped 2.0.0").count(), 2);
    assert!(fixture.paths().marker().exists());
}

#[test]
fn test_reclaim_without_marker_keeps_files() {
    let fixture = Fixture::new();
    fs::write(fixture.paths().backup(), b"left over").unwrap();
    let orch = fixture.orchestrator(fixture.config(None));

    let dispatch = orch.run(Trigger::None).unwrap();

    assert!(matches!(dispatch, Dispatch::Inert));
    assert!(fixture.paths().backup().exists());
}

#[test]
fn test_reclaim_with_marker_and_no_backup() {
    let fixture = Fixture::new();
    fs::write(fixture.paths().marker(), b"").unwrap();
    let orch = fixture.orchestrator(fixture.config(None));

    let Dispatch::Cleared(outcome) = orch.run(Trigger::ClearTemporary).unwrap() else {
        unreachable!("expected a cleared dispatch");
    };

    assert_eq!(
        outcome,
        CleanupOutcome::Attempted {
            backup: BackupDisposition::Missing,
            marker_cleared: true,
        }
    );
    assert_eq!(fixture.listing(), vec!["prog".to_string()]);
}
