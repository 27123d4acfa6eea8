//! Smoke tests for the cltrace binary.

use assert_cmd::Command;
use predicates::prelude::*;

const SMALL_LOG: &str = "\
<<<< clCreateContext: EnqueueCounter: 1 properties = [ p ] num_devices = 1 devices = [ d ]
>>>> clCreateContext: -> CL_SUCCESS returned 0x10
<<<< clReleaseContext: EnqueueCounter: 2 context = 0x10
>>>> clReleaseContext: -> CL_SUCCESS
";

#[test]
fn test_text_summary_on_small_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("trace.log");
    std::fs::write(&log, SMALL_LOG).unwrap();

    Command::cargo_bin("cltrace")
        .unwrap()
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::str::contains("events: 2"))
        .stdout(predicate::str::contains("no leaked objects"));
}

#[test]
fn test_json_summary_parses() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("trace.log");
    std::fs::write(&log, SMALL_LOG).unwrap();

    let output = Command::cargo_bin("cltrace")
        .unwrap()
        .arg(&log)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["events"], 2);
    assert_eq!(summary["objects"], 1);
}

#[test]
fn test_missing_log_file_fails() {
    Command::cargo_bin("cltrace")
        .unwrap()
        .arg("/nonexistent/trace.log")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse trace log"));
}

#[test]
fn test_dump_dir_correlation() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("trace.log");
    std::fs::write(
        &log,
        "\
<<<< clCreateProgramWithSource: EnqueueCounter: 3 context = 0x10 count = 1
>>>> clCreateProgramWithSource: -> CL_SUCCESS program number = 0001 returned 0x30
",
    )
    .unwrap();

    let dumps = dir.path().join("dumps");
    std::fs::create_dir(&dumps).unwrap();
    std::fs::write(dumps.join("CLI_0001_0badf00d_source.cl"), "__kernel").unwrap();

    Command::cargo_bin("cltrace")
        .unwrap()
        .arg(&log)
        .args(["--dump-dir"])
        .arg(&dumps)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 program sources"));
}
