#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn kmbox(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kmbox"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .env_remove("KMBOX_PORT")
        .env_remove("KMBOX_BAUD")
        .env_remove("KMBOX_DEBUG")
        .output()
        .expect("kmbox should run")
}

fn unique_temp_file(tag: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "kmbox-{tag}-{}-{}.txt",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::write(&path, contents).expect("temp file should be writable");
    path
}

#[test]
fn version_prints_package_version() {
    let output = kmbox(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("kmbox {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_reports_backend() {
    let output = kmbox(&["version", "--extended"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("backend: "), "stdout: {stdout}");
}

#[test]
fn doctor_json_has_schema_and_checks() {
    let output = kmbox(&["--format", "json", "doctor"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("doctor-report.schema.json"), "stdout: {stdout}");
    assert!(stdout.contains("\"platform_backend\""), "stdout: {stdout}");
    assert!(stdout.contains("\"overall\""), "stdout: {stdout}");
}

#[test]
fn find_without_matching_device_exits_not_found() {
    let output = kmbox(&["find", "--match", "kmbox-no-such-token"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no compatible CH340 device"), "stderr: {stderr}");
}

#[test]
fn list_json_is_well_formed() {
    let output = kmbox(&["--format", "json", "list"]);
    // Enumeration may be unavailable in sandboxes; only check shape on success.
    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let value: serde_json::Value =
            serde_json::from_str(stdout.trim()).expect("list output should be JSON");
        assert!(value["devices"].is_array());
    }
}

#[cfg(unix)]
#[test]
fn move_to_missing_port_exits_transport_error() {
    let output = kmbox(&["move", "10", "-5", "--port", "/dev/kmbox-missing"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/dev/kmbox-missing"), "stderr: {stderr}");
}

#[test]
fn run_rejects_invalid_script_before_connecting() {
    let script = unique_temp_file("bad-script", "move 1 1\nscroll 3\n");
    let output = kmbox(&[
        "run",
        script.to_str().expect("utf-8 path"),
        "--port",
        "kmbox-missing",
    ]);
    let _ = std::fs::remove_file(&script);

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr: {stderr}");
}

#[test]
fn run_with_missing_script_fails() {
    let output = kmbox(&["run", "/nonexistent/kmbox-script.txt"]);
    assert_eq!(output.status.code(), Some(3));
}
