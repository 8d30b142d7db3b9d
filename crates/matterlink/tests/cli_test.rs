//! Integration tests for the `matterlink` CLI binary.
//!
//! Every test points the settings and bridge configuration at a
//! temporary directory so the user's real files are never touched.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `matterlink` binary with env isolation.
fn matterlink_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("matterlink");
    cmd.env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env("MATTERLINK_SETTINGS", dir.join("matterlink.toml"))
        .env_remove("MATTERLINK_OUTPUT")
        .env_remove("MATTERLINK_CONFIG_FILE")
        .env_remove("MATTERLINK_INSTANCE")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const VALID: &str = r#"
[controller]
enabled = true

[[bridges]]
uuid = "b1"
name = "Living room"

[[bridges.list]]
uuid = "d1"
name = "Lamp"
oid = "alias.0.lamp"
type = "dimmer"

[[devices]]
uuid = "d2"
name = "Plug"
oid = "hm-rpc.0.plug"
type = "socket"
"#;

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = matterlink_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "Expected 'Usage' in output:\n{stderr}");
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    matterlink_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("config").and(predicate::str::contains("simulate")));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_check_accepts_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "matter.toml", VALID);

    matterlink_cmd(dir.path())
        .args(["config", "check", "--color", "never", "-f"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid (1 bridges, 1 devices)"));
}

#[test]
fn test_config_check_rejects_duplicate_uuids() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(
        dir.path(),
        "matter.toml",
        "[[bridges]]\nuuid = \"same\"\n\n[[devices]]\nuuid = \"same\"\n",
    );

    matterlink_cmd(dir.path())
        .args(["config", "check", "-f"])
        .arg(&file)
        .assert()
        .code(6)
        .stderr(predicate::str::contains("same"));
}

#[test]
fn test_config_check_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();

    matterlink_cmd(dir.path())
        .args(["config", "check", "-f"])
        .arg(dir.path().join("absent.toml"))
        .assert()
        .code(4);
}

#[test]
fn test_config_show_plain_lists_uuids() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "matter.toml", VALID);

    matterlink_cmd(dir.path())
        .args(["config", "show", "-o", "plain", "-f"])
        .arg(&file)
        .assert()
        .success()
        .stdout("b1\nd1\nd2\n");
}

#[test]
fn test_config_show_json_reports_commissioning() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "matter.toml", VALID);
    write(
        dir.path(),
        "matter.commissioning.json",
        r#"{ "devices": { "d2": { "commissioned": true } } }"#,
    );

    let output = matterlink_cmd(dir.path())
        .args(["config", "show", "-o", "json", "-f"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[1]["bridge"], "b1");
    assert_eq!(rows[2]["uuid"], "d2");
    assert_eq!(rows[2]["commissioned"], true);
}

#[test]
fn test_config_normalize_unwraps_legacy_json() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = write(
        dir.path(),
        "legacy.json",
        r#"{ "controller": null, "devices": { "list": [{ "uuid": "d1", "type": "socket" }] } }"#,
    );
    let target = dir.path().join("out").join("matter.toml");

    matterlink_cmd(dir.path())
        .args(["config", "normalize", "--write", "-f"])
        .arg(&target)
        .arg(&legacy)
        .assert()
        .success();

    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("[[devices]]"), "unexpected output:\n{written}");
    assert!(written.contains("uuid = \"d1\""));
}

#[test]
fn test_config_normalize_reports_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = write(dir.path(), "legacy.json", "{ not json");

    matterlink_cmd(dir.path())
        .args(["config", "normalize"])
        .arg(&legacy)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid JSON"));
}

// ── Simulate ────────────────────────────────────────────────────────

#[test]
fn test_simulate_records_events_and_patches() {
    let dir = tempfile::tempdir().unwrap();

    let output = matterlink_cmd(dir.path())
        .args(["simulate", "-o", "plain"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("patch Lamp"), "missing lamp patches:\n{stdout}");
    assert!(stdout.contains("bridgedDeviceBasicInformation"), "missing bridged patch:\n{stdout}");
    assert!(stdout.contains("batChargeLevel"), "missing battery patch:\n{stdout}");
    assert!(stdout.contains("event Speakers"), "missing speaker events:\n{stdout}");
}
