use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn lifevault(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lifevault").unwrap();
    cmd.env("LIFEVAULT_DATA_DIR", home).env_remove("RUST_LOG");
    cmd
}

fn write_backup(dir: &Path, name: &str, backup: &Value) -> String {
    let path = dir.join(name);
    fs::write(&path, backup.to_string()).unwrap();
    path.to_string_lossy().to_string()
}

fn current_backup() -> Value {
    json!({
        "schemaVersion": 3,
        "exportDate": "2024-10-05T18:00:00Z",
        "appVersion": "1.9.0",
        "buildId": "c0ffee1",
        "domains": {
            "goals": json!([{"id": "g1"}, {"id": "g2"}]).to_string(),
            "settings": json!({"theme": "dark"}).to_string()
        },
        "statistics": {"goals": 2, "settings": 1}
    })
}

#[test]
fn registry_lists_domains() {
    let home = TempDir::new().unwrap();

    lifevault(home.path())
        .arg("registry")
        .assert()
        .success()
        .stdout(predicate::str::contains("journal_entries"))
        .stdout(predicate::str::contains("secret, never exported"))
        .stdout(predicate::str::contains("every persisted domain is registered"));
}

#[test]
fn registry_reports_unregistered_files() {
    let home = TempDir::new().unwrap();
    fs::create_dir_all(home.path().join("data")).unwrap();
    fs::write(home.path().join("data").join("streaks.json"), "[]").unwrap();

    lifevault(home.path())
        .arg("registry")
        .assert()
        .success()
        .stdout(predicate::str::contains("streaks"));
}

#[test]
fn export_to_stdout_is_a_current_snapshot() {
    let home = TempDir::new().unwrap();
    fs::create_dir_all(home.path().join("data")).unwrap();
    fs::write(
        home.path().join("data").join("goals.json"),
        r#"[{"id": "g1", "title": "Run"}]"#,
    )
    .unwrap();

    let output = lifevault(home.path())
        .args(["export", "--compact"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let snapshot: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["schemaVersion"], json!(3));
    assert_eq!(snapshot["statistics"]["goals"], json!(1));
    assert!(snapshot["domains"]["goals"].is_string());
}

#[test]
fn export_to_file() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("out.json");

    lifevault(home.path())
        .args(["export", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 0 domain(s)"));

    assert!(out.exists());
}

#[test]
fn restore_without_force_only_inspects() {
    let home = TempDir::new().unwrap();
    let file = write_backup(home.path(), "snap.json", &current_backup());

    lifevault(home.path())
        .args(["restore", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("goals"));

    assert!(!home.path().join("data").join("goals.json").exists());
}

#[test]
fn restore_with_force_writes_data_and_takes_a_backup() {
    let home = TempDir::new().unwrap();
    let file = write_backup(home.path(), "snap.json", &current_backup());

    lifevault(home.path())
        .args(["restore", &file, "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pre-restore backup saved"))
        .stdout(predicate::str::contains("Restored: goals, settings"));

    let goals: Value = serde_json::from_str(
        &fs::read_to_string(home.path().join("data").join("goals.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(goals, json!([{"id": "g1"}, {"id": "g2"}]));

    let backups = fs::read_dir(home.path().join("backups")).unwrap().count();
    assert_eq!(backups, 1);
}

#[test]
fn restore_takes_auto_backup_when_enabled() {
    let home = TempDir::new().unwrap();
    fs::create_dir_all(home.path().join("data")).unwrap();
    fs::write(
        home.path().join("data").join("settings.json"),
        r#"{"theme": "light", "autoBackupEnabled": true}"#,
    )
    .unwrap();
    fs::write(
        home.path().join("config.json"),
        r#"{"backup_before_restore": false}"#,
    )
    .unwrap();
    let file = write_backup(home.path(), "snap.json", &current_backup());

    lifevault(home.path())
        .args(["restore", &file, "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pre-restore backup").not())
        .stdout(predicate::str::contains("Auto-backup saved"));

    let backups = fs::read_dir(home.path().join("backups")).unwrap().count();
    assert_eq!(backups, 1);
}

#[test]
fn restore_rejects_newer_schema() {
    let home = TempDir::new().unwrap();
    let mut backup = current_backup();
    backup["schemaVersion"] = json!(4);
    let file = write_backup(home.path(), "future.json", &backup);

    lifevault(home.path())
        .args(["restore", &file, "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("newer version"));

    assert!(!home.path().join("data").join("goals.json").exists());
}

#[test]
fn restore_fails_when_nothing_restored() {
    let home = TempDir::new().unwrap();
    let mut backup = current_backup();
    backup["domains"] = json!({"goals": "[{"});
    let file = write_backup(home.path(), "broken.json", &backup);

    lifevault(home.path())
        .args(["restore", &file, "--force"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAILED"));
}

#[test]
fn inspect_legacy_export() {
    let home = TempDir::new().unwrap();
    let legacy = json!({
        "exportedAt": "2022-12-24T10:00:00Z",
        "data": {"goals": [{"title": "Sleep more"}], "journalEntries": []}
    });
    let file = write_backup(home.path(), "old.json", &legacy);

    lifevault(home.path())
        .args(["inspect", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("legacy"))
        .stdout(predicate::str::contains("will migrate to 3"));
}

#[test]
fn inspect_missing_file() {
    let home = TempDir::new().unwrap();

    lifevault(home.path())
        .args(["inspect", "nowhere.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup not found"));
}

#[test]
fn backup_create_and_list() {
    let home = TempDir::new().unwrap();

    lifevault(home.path())
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created"));

    lifevault(home.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 backup(s)"));
}

#[test]
fn config_shows_paths() {
    let home = TempDir::new().unwrap();

    lifevault(home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Schema version:   3"))
        .stdout(predicate::str::contains(home.path().to_string_lossy().to_string()));
}
