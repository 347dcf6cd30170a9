use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn resolve_reports_isolated_delegated_and_missing_units() {
    let dir = tempdir().unwrap();
    let plugin = dir.path().join("plugin");
    let host = dir.path().join("host");
    fs::create_dir_all(plugin.join("acme")).unwrap();
    fs::create_dir_all(host.join("core")).unwrap();
    fs::write(plugin.join("acme/Foo.unit"), b"foo").unwrap();
    fs::write(host.join("core/Base.unit"), b"base").unwrap();

    let output = Command::cargo_bin("unitscope")
        .unwrap()
        .arg("resolve")
        .arg("--base")
        .arg(&plugin)
        .arg("--host-base")
        .arg(&host)
        .args(["acme.Foo", "core.Base", "acme.Missing"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("acme.Foo isolated file:"));
    assert!(lines[1].starts_with("core.Base delegated file:"));
    assert_eq!(lines[2], "acme.Missing missing");
}

#[test]
fn list_prints_locations_with_their_units() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("acme")).unwrap();
    fs::write(dir.path().join("acme/Foo.unit"), b"foo").unwrap();

    let output = Command::cargo_bin("unitscope")
        .unwrap()
        .args(["list", "--include", "**/*.unit", "--base"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("  - acme.Foo"));
}

#[test]
fn malformed_exclude_fails() {
    let dir = tempdir().unwrap();
    let output = Command::cargo_bin("unitscope")
        .unwrap()
        .args(["resolve", "--exclude", "(broken", "--base"])
        .arg(dir.path())
        .arg("acme.Foo")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
