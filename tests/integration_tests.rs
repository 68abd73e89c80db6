//! End-to-end bootstrap tests
//!
//! Each test stages a job the way the control node would and runs the real
//! binary against it.

mod common;

use std::fs;

use predicates::prelude::*;
use serde_json::json;

use common::JobFixture;

// ─────────────────────────────────────────────────────────────────
// Successful Runs
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_runs_staged_task() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("result.txt");
    fixture.write_task(
        "42",
        &json!({
            "schema_version": 1,
            "kind": "write_file",
            "name": "job-42",
            "params": { "path": target, "contents": "done" }
        }),
    );

    fixture
        .cmd("42", &[])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(fs::read_to_string(&target).unwrap(), "done");
}

#[test]
fn test_tarball_extracts_into_staging_dir() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("result.txt");
    fixture.write_archive("packages.tar", &[("helper.mod", "helper contents", 0o644)]);
    fixture.write_task(
        "7",
        &json!({
            "schema_version": 1,
            "kind": "write_file",
            "params": { "path": target, "contents": "ok" }
        }),
    );

    fixture.cmd("7", &["--tarball"]).assert().success();

    assert_eq!(
        fs::read_to_string(fixture.staging_dir().join("helper.mod")).unwrap(),
        "helper contents"
    );
    assert!(target.exists());
}

#[test]
fn test_archive_ignored_without_tarball_flag() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("result.txt");
    fixture.write_archive("packages.tar", &[("helper.mod", "x", 0o644)]);
    fixture.write_task(
        "8",
        &json!({
            "schema_version": 1,
            "kind": "write_file",
            "params": { "path": target, "contents": "ok" }
        }),
    );

    fixture.cmd("8", &[]).assert().success();

    assert!(!fixture.staging_dir().join("helper.mod").exists());
    assert!(target.exists());
}

#[test]
fn test_tarball_without_archive_still_runs() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("result.txt");
    fixture.write_task(
        "9",
        &json!({
            "schema_version": 1,
            "kind": "write_file",
            "params": { "path": target, "contents": "ok" }
        }),
    );

    fixture.cmd("9", &["--tarball"]).assert().success();

    assert!(target.exists());
}

#[test]
fn test_debug_checkpoints_on_stderr() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("result.txt");
    fixture.write_task(
        "11",
        &json!({
            "schema_version": 1,
            "kind": "write_file",
            "params": { "path": target, "contents": "ok" }
        }),
    );

    fixture
        .cmd("11", &["--debug"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("starting at "))
        .stderr(predicate::str::is_match(r"extracted tar after \d+\.\d{6} seconds").unwrap())
        .stderr(predicate::str::is_match(r"loaded pickled data after \d+\.\d{6} seconds").unwrap());
}

#[test]
fn test_no_checkpoints_without_debug() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("result.txt");
    fixture.write_task(
        "12",
        &json!({
            "schema_version": 1,
            "kind": "write_file",
            "params": { "path": target, "contents": "ok" }
        }),
    );

    fixture
        .cmd("12", &[])
        .assert()
        .success()
        .stderr(predicate::str::contains("starting at").not());
}

#[cfg(unix)]
#[test]
fn test_command_resolved_from_archive() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("from-script.txt");
    fixture.write_archive(
        "packages.tar",
        &[("stage-helper", "#!/bin/sh\nprintf staged > \"$1\"\n", 0o755)],
    );
    fixture.write_task(
        "13",
        &json!({
            "schema_version": 1,
            "kind": "command",
            "params": { "program": "stage-helper", "args": [target] }
        }),
    );

    fixture.cmd("13", &["--tarball"]).assert().success();

    assert_eq!(fs::read_to_string(&target).unwrap(), "staged");
}

#[cfg(unix)]
#[test]
fn test_command_resolved_from_project_dir() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = JobFixture::new();
    let target = fixture.staging_dir().join("from-project.txt");
    let script = fixture.project_dir().join("project-helper");
    fs::write(&script, "#!/bin/sh\nprintf project > \"$1\"\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    fixture.write_task(
        "14",
        &json!({
            "schema_version": 1,
            "kind": "command",
            "params": { "program": "project-helper", "args": [target] }
        }),
    );

    fixture.cmd("14", &[]).assert().success();

    assert_eq!(fs::read_to_string(&target).unwrap(), "project");
}

// ─────────────────────────────────────────────────────────────────
// Failures
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_missing_task_blob() {
    let fixture = JobFixture::new();

    fixture
        .cmd("404", &[])
        .assert()
        .code(50)
        .stdout(predicate::str::contains("E500"))
        .stdout(predicate::str::contains("404.job-instance.json"));
}

#[test]
fn test_corrupt_task_blob() {
    let fixture = JobFixture::new();
    fixture.write_raw_task("15", b"\x80\x04not json");

    fixture
        .cmd("15", &[])
        .assert()
        .code(50)
        .stdout(predicate::str::contains("E502"));
}

#[test]
fn test_unsupported_schema_version() {
    let fixture = JobFixture::new();
    fixture.write_task("16", &json!({ "schema_version": 99, "kind": "write_file" }));

    fixture
        .cmd("16", &[])
        .assert()
        .code(50)
        .stdout(predicate::str::contains("E503"));
}

#[test]
fn test_unknown_task_kind() {
    let fixture = JobFixture::new();
    fixture.write_task("17", &json!({ "schema_version": 1, "kind": "train_model" }));

    fixture
        .cmd("17", &[])
        .assert()
        .code(50)
        .stdout(predicate::str::contains("train_model"))
        .stdout(predicate::str::contains("command, write_file"));
}

#[test]
fn test_unresolved_command() {
    let fixture = JobFixture::new();
    fixture.write_task(
        "18",
        &json!({
            "schema_version": 1,
            "kind": "command",
            "params": { "program": "definitely-not-a-real-program-xyz" }
        }),
    );

    fixture
        .cmd("18", &[])
        .assert()
        .code(50)
        .stdout(predicate::str::contains("E506"));
}

#[test]
fn test_work_failure_is_reported_on_stdout() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("missing-dir").join("result.txt");
    fixture.write_task(
        "19",
        &json!({
            "schema_version": 1,
            "kind": "write_file",
            "name": "doomed",
            "params": { "path": target, "contents": "never" }
        }),
    );

    fixture
        .cmd("19", &[])
        .assert()
        .code(60)
        .stdout(predicate::str::contains("E600"))
        .stdout(predicate::str::contains("Task 'doomed' failed"))
        .stdout(predicate::str::contains("caused by: opening"));
}

#[cfg(unix)]
#[test]
fn test_failing_command_exit_code() {
    let fixture = JobFixture::new();
    fixture.write_task(
        "20",
        &json!({
            "schema_version": 1,
            "kind": "command",
            "params": { "program": "/bin/sh", "args": ["-c", "exit 3"] }
        }),
    );

    fixture
        .cmd("20", &[])
        .assert()
        .code(60)
        .stdout(predicate::str::contains("exited unsuccessfully"));
}

#[test]
fn test_corrupt_archive() {
    let fixture = JobFixture::new();
    fs::write(fixture.staging_dir().join("packages.tar"), vec![0xffu8; 1024]).unwrap();
    fixture.write_task("21", &json!({ "schema_version": 1, "kind": "write_file" }));

    fixture
        .cmd("21", &["--tarball"])
        .assert()
        .code(40)
        .stdout(predicate::str::contains("packages.tar"));
}

#[test]
fn test_fail_policy_rejects_existing_entries() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("result.txt");
    fixture.write_archive("packages.tar", &[("helper.mod", "new", 0o644)]);
    fs::write(fixture.staging_dir().join("helper.mod"), "old").unwrap();
    fixture.write_task(
        "22",
        &json!({
            "schema_version": 1,
            "kind": "write_file",
            "params": { "path": target, "contents": "ok" }
        }),
    );

    fixture
        .cmd("22", &["--tarball"])
        .env("TASK_BOOTSTRAP_ON_EXISTING", "fail")
        .assert()
        .code(40)
        .stdout(predicate::str::contains("E402"));

    assert_eq!(
        fs::read_to_string(fixture.staging_dir().join("helper.mod")).unwrap(),
        "old"
    );
    assert!(!target.exists());
}

#[test]
fn test_overwrite_policy_replaces_existing_entries() {
    let fixture = JobFixture::new();
    let target = fixture.project_dir().join("result.txt");
    fixture.write_archive("packages.tar", &[("helper.mod", "new", 0o644)]);
    fs::write(fixture.staging_dir().join("helper.mod"), "old").unwrap();
    fixture.write_task(
        "23",
        &json!({
            "schema_version": 1,
            "kind": "write_file",
            "params": { "path": target, "contents": "ok" }
        }),
    );

    fixture.cmd("23", &["--tarball"]).assert().success();

    assert_eq!(
        fs::read_to_string(fixture.staging_dir().join("helper.mod")).unwrap(),
        "new"
    );
}
