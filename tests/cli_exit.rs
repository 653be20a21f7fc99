//! Exit status and side effects of the `exshot` binary

use std::process::Command;

fn exshot() -> Command {
    Command::new(env!("CARGO_BIN_EXE_exshot"))
}

#[test]
fn help_exits_zero_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("screenshots");

    let status = exshot()
        .args(["--help", "--out"])
        .arg(&out)
        .status()
        .expect("failed to run exshot");

    assert!(status.success());
    assert!(!out.exists());
}

#[test]
fn invalid_width_exits_one_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("screenshots");

    let output = exshot()
        .args(["--width", "abc", "--out"])
        .arg(&out)
        .output()
        .expect("failed to run exshot");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid value for width: abc"));
    assert!(!out.exists());
}

#[test]
fn empty_delay_exits_one_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("screenshots");

    let output = exshot()
        .args(["--delay", "", "--out"])
        .arg(&out)
        .output()
        .expect("failed to run exshot");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Missing value for --delay"));
    assert!(!out.exists());
}

#[test]
fn unknown_flag_exits_one() {
    let output = exshot().arg("--frobnicate").output().expect("failed to run exshot");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--frobnicate"));
}

#[test]
fn missing_catalog_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("screenshots");

    let output = exshot()
        .arg("--examples")
        .arg(dir.path().join("nope.json"))
        .arg("--out")
        .arg(&out)
        .output()
        .expect("failed to run exshot");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Could not load example catalog"));
    assert!(!out.exists());
}
