use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;

fn service() -> Command {
    let mut cmd = Command::cargo_bin("globalindex-service-records").expect("binary exists");
    cmd.env("LOG_FORMAT", "text")
        .env("RUST_LOG", "info")
        .env("METRICS_ENABLED", "false")
        .env("REFRESH_ON_STARTUP", "false")
        .env("API_PORT", "0")
        .timeout(Duration::from_secs(30));
    cmd
}

#[test]
fn exits_when_sqlite_file_is_missing() {
    let dir = tempfile::tempdir().expect("temp dir");

    service()
        .env("STORE_BACKEND", "sqlite")
        .env("SQLITE_PATH", dir.path().join("missing.db"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed to connect to record store"));
}

#[test]
fn exits_on_unknown_backend() {
    service()
        .env("STORE_BACKEND", "cassandra")
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid configuration"));
}

#[test]
fn exits_on_invalid_schedule() {
    service()
        .env("STORE_BACKEND", "sqlite")
        .env("REFRESH_SCHEDULE", "every new year")
        .assert()
        .failure();
}
