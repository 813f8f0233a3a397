// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod common;

use assert_cmd::Command;
use common::lockpool_cmd;
use lockpool::{FileLock, LockConfig};
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn config_for(temp: &TempDir) -> LockConfig {
    LockConfig::default().with_lock_dir(temp.path().join("locks"))
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("lockpool")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("run"))
        .stdout(contains("pool"))
        .stdout(contains("status"))
        .stdout(contains("path"));
}

#[test]
fn path_prints_encoded_lock_file() {
    let temp = TempDir::new().unwrap();
    lockpool_cmd(temp.path())
        .args(["path", "job-42"])
        .assert()
        .success()
        .stdout(contains("lockpool_job_2d42.lock"));
}

#[test]
fn prefix_flag_changes_file_name() {
    let temp = TempDir::new().unwrap();
    lockpool_cmd(temp.path())
        .args(["--prefix", "ci", "path", "job"])
        .assert()
        .success()
        .stdout(contains("ci_job.lock"));
}

#[test]
fn invalid_prefix_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    lockpool_cmd(temp.path())
        .args(["--prefix", "../up", "path", "job"])
        .assert()
        .code(2)
        .stderr(contains("prefix"));
}

#[test]
fn overlong_prefix_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    let prefix = "p".repeat(190);
    lockpool_cmd(temp.path())
        .args(["--prefix", prefix.as_str(), "path", "job"])
        .assert()
        .code(2)
        .stderr(contains("the limit is 129"));
}

#[test]
fn status_reports_held_and_free_as_json() {
    let temp = TempDir::new().unwrap();
    let config = config_for(&temp);
    let mut holder = FileLock::with_config("busy", &config);
    assert!(holder.try_acquire().unwrap());

    let output = lockpool_cmd(temp.path())
        .args(["status", "--json", "busy", "idle"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let statuses: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(statuses[0]["identity"], "busy");
    assert_eq!(statuses[0]["state"], "held");
    assert_eq!(statuses[1]["identity"], "idle");
    assert_eq!(statuses[1]["state"], "free");
}

#[test]
fn status_table_shows_states() {
    let temp = TempDir::new().unwrap();
    lockpool_cmd(temp.path())
        .args(["status", "idle"])
        .assert()
        .success()
        .stdout(contains("Identity"))
        .stdout(contains("free"));
}

#[test]
fn run_requires_a_command() {
    let temp = TempDir::new().unwrap();
    lockpool_cmd(temp.path())
        .args(["run", "job"])
        .assert()
        .failure();
}

#[test]
fn pool_requires_a_slot() {
    let temp = TempDir::new().unwrap();
    lockpool_cmd(temp.path())
        .args(["pool", "--", "true"])
        .assert()
        .failure()
        .stderr(contains("--slot"));
}

#[test]
fn run_on_held_identity_exits_with_tempfail() {
    let temp = TempDir::new().unwrap();
    let config = config_for(&temp);
    let mut holder = FileLock::with_config("job", &config);
    assert!(holder.try_acquire().unwrap());

    lockpool_cmd(temp.path())
        .args(["run", "job", "--", "true"])
        .assert()
        .code(75)
        .stderr(contains("Failed to immediately acquire lock 'job'"));
}

#[test]
fn run_with_timeout_reports_wait() {
    let temp = TempDir::new().unwrap();
    let config = config_for(&temp);
    let mut holder = FileLock::with_config("job", &config);
    assert!(holder.try_acquire().unwrap());

    lockpool_cmd(temp.path())
        .args(["run", "--timeout", "0.2", "--poll-ms", "20"])
        .args(["job", "--", "true"])
        .assert()
        .code(75)
        .stderr(contains("Timed out acquiring lock 'job'"));
}

#[test]
fn invalid_timeout_is_rejected() {
    let temp = TempDir::new().unwrap();
    lockpool_cmd(temp.path())
        .args(["run", "--timeout", "soon", "job", "--", "true"])
        .assert()
        .code(2)
        .stderr(contains("soon"));
}

#[cfg(unix)]
#[test]
fn run_propagates_child_exit_code() {
    let temp = TempDir::new().unwrap();
    lockpool_cmd(temp.path())
        .args(["run", "job", "--", "sh", "-c", "exit 7"])
        .assert()
        .code(7);

    let config = config_for(&temp);
    let mut after = FileLock::with_config("job", &config);
    assert!(after.try_acquire().unwrap());
}

#[cfg(unix)]
#[test]
fn pool_exports_chosen_slot() {
    let temp = TempDir::new().unwrap();
    let config = config_for(&temp);
    let mut busy = FileLock::with_config("a", &config);
    assert!(busy.try_acquire().unwrap());

    lockpool_cmd(temp.path())
        .args(["pool", "--slot", "a", "--slot", "b", "--"])
        .args(["sh", "-c", "echo $LOCKPOOL_SLOT"])
        .assert()
        .success()
        .stdout(predicate::str::diff("b\n"));
}

#[test]
fn malformed_config_file_is_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.toml"), "prefix = [").unwrap();

    lockpool_cmd(temp.path())
        .args(["path", "job"])
        .assert()
        .code(2)
        .stderr(contains("config.toml"));
}

#[test]
fn config_file_timeout_is_used() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("config.toml"),
        "timeout = \"0.1\"\npoll_interval_ms = 10\n",
    )
    .unwrap();
    let config = config_for(&temp);
    let mut holder = FileLock::with_config("job", &config);
    assert!(holder.try_acquire().unwrap());

    lockpool_cmd(temp.path())
        .args(["run", "--wait", "job", "--", "true"])
        .assert()
        .code(75)
        .stderr(contains("Timed out"));
}
