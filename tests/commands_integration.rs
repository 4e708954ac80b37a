//! Integration tests for the ptdb binary.
//!
//! Stores are populated through the library with a ManualClock, then
//! inspected through the CLI. Config lookup is pointed at the temp dir so
//! the user's own config files never leak into results.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use assert_cmd::Command;
use chrono::{TimeZone, Utc};
use predicates::prelude::*;
use tempfile::TempDir;

use plaintxtdb::core::clock::ManualClock;
use plaintxtdb::core::paths::DbPaths;
use plaintxtdb::core::types::{SnapshotId, StorePath};
use plaintxtdb::db::{Database, FieldKind, Registry, Schema};

// =============================================================================
// Test Fixtures
// =============================================================================

/// Get a command for running ptdb against `root`.
fn ptdb(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ptdb").unwrap();
    cmd.arg("--root")
        .arg(root)
        .env("HOME", root.join("home"))
        .env("XDG_CONFIG_HOME", root.join("xdg"))
        .env_remove("PTDB_CONFIG");
    cmd
}

/// A root with `accounts/cash` holding 100 on 2023-01-01 and 250 on
/// 2023-06-01.
fn cash_fixture() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    let registry = Registry::builder()
        .register(Schema::new("Account").field("quantity", FieldKind::Plain, 0))
        .unwrap()
        .build();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
    ));
    let db = Database::builder(dir.path(), registry)
        .clock(clock.clone())
        .build();

    let cash = db.open("accounts/cash", "Account").unwrap();
    cash.set("quantity", 100).unwrap();
    db.save(&cash).unwrap();

    clock.set(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap());
    cash.set("quantity", 250).unwrap();
    db.save(&cash).unwrap();

    dir
}

fn cash_dir(root: &Path) -> std::path::PathBuf {
    DbPaths::new(root).store_dir(&StorePath::new("accounts/cash").unwrap())
}

// =============================================================================
// Global Flags
// =============================================================================

#[test]
fn version_flag_works() {
    Command::cargo_bin("ptdb")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ptdb"));
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("ptdb")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("show"));
}

#[test]
fn invalid_store_path_fails() {
    let dir = TempDir::new().unwrap();
    ptdb(dir.path())
        .args(["log", "../outside"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid store path"));
}

// =============================================================================
// log
// =============================================================================

#[test]
fn log_lists_newest_first() {
    let dir = cash_fixture();
    let output = ptdb(dir.path())
        .args(["log", "accounts/cash"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("2023-06-01__00.00.00.json"));
    assert!(lines[1].ends_with("2023-01-01__00.00.00.json"));
}

#[test]
fn log_limit() {
    let dir = cash_fixture();
    ptdb(dir.path())
        .args(["log", "accounts/cash", "-n", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2023-06-01__00.00.00.json"))
        .stdout(predicate::str::contains("2023-01-01__00.00.00.json").not())
        .stdout(predicate::str::contains("1 older snapshots not shown"));
}

#[test]
fn log_empty_store() {
    let dir = TempDir::new().unwrap();
    ptdb(dir.path())
        .args(["log", "accounts/none"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no snapshots"));
}

// =============================================================================
// show
// =============================================================================

#[test]
fn show_latest() {
    let dir = cash_fixture();
    ptdb(dir.path())
        .args(["show", "accounts/cash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"quantity\": 250"));
}

#[test]
fn show_at_time() {
    let dir = cash_fixture();
    ptdb(dir.path())
        .args(["show", "accounts/cash", "--at", "2023-03-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"quantity\": 100"));
}

#[test]
fn show_before_first_snapshot_fails() {
    let dir = cash_fixture();
    ptdb(dir.path())
        .args(["show", "accounts/cash", "--at", "2022-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no data at or before"));
}

#[test]
fn show_rejects_bad_time() {
    let dir = cash_fixture();
    ptdb(dir.path())
        .args(["show", "accounts/cash", "--at", "last tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid time"));
}

// =============================================================================
// check
// =============================================================================

#[test]
fn check_clean_store() {
    let dir = cash_fixture();
    ptdb(dir.path())
        .args(["check", "accounts/cash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("accounts/cash: ok"));
}

#[test]
fn check_repairs_interrupted_save() {
    let dir = cash_fixture();
    let store = cash_dir(dir.path());
    let target = SnapshotId::new(Utc.with_ymd_and_hms(2023, 7, 1, 0, 0, 0).unwrap(), 0);
    fs::write(DbPaths::snapshot_path(&store, &target), "{\"quan").unwrap();
    fs::write(DbPaths::sentinel_path(&store), target.file_name()).unwrap();

    ptdb(dir.path())
        .args(["check", "accounts/cash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("discarded"));

    assert!(!DbPaths::sentinel_path(&store).exists());
    assert!(!DbPaths::snapshot_path(&store, &target).exists());
}

#[test]
fn check_repairs_torn_sentinel() {
    let dir = cash_fixture();
    let store = cash_dir(dir.path());
    fs::write(DbPaths::sentinel_path(&store), [0xff, 0xfe, 0x00, 0x32]).unwrap();

    ptdb(dir.path())
        .args(["check", "accounts/cash"])
        .assert()
        .success()
        .stderr(predicate::str::contains("removed corrupt sentinel"));

    assert!(!DbPaths::sentinel_path(&store).exists());
}

#[test]
fn reserved_store_name_fails() {
    let dir = TempDir::new().unwrap();
    ptdb(dir.path())
        .args(["check", "accounts/saving"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reserved"));
}

#[test]
fn check_quiet_prints_nothing() {
    let dir = cash_fixture();
    ptdb(dir.path())
        .args(["-q", "check", "accounts/cash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn check_creates_missing_store() {
    let dir = TempDir::new().unwrap();
    ptdb(dir.path())
        .args(["check", "new/store"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created empty store"));

    assert!(dir.path().join("new/store").is_dir());
}

#[test]
fn check_on_file_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("cash"), "").unwrap();
    ptdb(dir.path())
        .args(["check", "cash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}

// =============================================================================
// config
// =============================================================================

#[test]
fn config_defaults() {
    let dir = TempDir::new().unwrap();
    ptdb(dir.path())
        .args(["config", "get", "sentinel_policy"])
        .assert()
        .success()
        .stdout("discard\n");
}

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    ptdb(dir.path())
        .args(["config", "set", "sentinel_policy", "verify"])
        .assert()
        .success();

    ptdb(dir.path())
        .args(["config", "get", "sentinel_policy"])
        .assert()
        .success()
        .stdout("verify\n");

    assert!(dir.path().join(".ptdb/config.toml").exists());
}

#[test]
fn config_set_rejects_zero_retries() {
    let dir = TempDir::new().unwrap();
    ptdb(dir.path())
        .args(["config", "set", "max_collision_retries", "0"])
        .assert()
        .failure();
}

#[test]
fn config_list_shows_all_keys() {
    let dir = TempDir::new().unwrap();
    ptdb(dir.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sentinel_policy = discard"))
        .stdout(predicate::str::contains("locking = true"))
        .stdout(predicate::str::contains("max_collision_retries = 16"))
        .stdout(predicate::str::contains("sync = true"));
}

#[test]
fn config_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    ptdb(dir.path())
        .args(["config", "get", "colour"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

// =============================================================================
// completion
// =============================================================================

#[test]
fn completion_bash() {
    Command::cargo_bin("ptdb")
        .unwrap()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ptdb"));
}
