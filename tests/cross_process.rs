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

#![cfg(unix)]

mod common;

use common::unique_identity;
use lockpool::{FileLock, LockConfig};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn lockpool_process(temp: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lockpool"));
    cmd.arg("--config")
        .arg(temp.path().join("config.toml"))
        .arg("--lock-dir")
        .arg(temp.path().join("locks"));
    cmd
}

#[test]
fn waiting_process_runs_once_holder_releases() {
    let temp = TempDir::new().unwrap();
    let config = LockConfig::default().with_lock_dir(temp.path().join("locks"));
    let identity = unique_identity("job");

    let mut holder = FileLock::with_config(identity.clone(), &config);
    assert!(holder.try_acquire().unwrap());

    let mut child = lockpool_process(&temp)
        .args(["run", "--wait", "--timeout", "5", "--poll-ms", "20"])
        .arg(&identity)
        .args(["--", "true"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(300));
    assert!(
        child.try_wait().unwrap().is_none(),
        "child should still be waiting for the lock"
    );

    holder.release().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        assert!(Instant::now() < deadline, "child never acquired the lock");
        thread::sleep(Duration::from_millis(20));
    };
    assert!(status.success());
}

#[test]
fn lock_held_by_child_process_blocks_parent() {
    let temp = TempDir::new().unwrap();
    let config = LockConfig::default().with_lock_dir(temp.path().join("locks"));
    let identity = unique_identity("shared");

    let mut child = lockpool_process(&temp)
        .arg("run")
        .arg(&identity)
        .args(["--", "sleep", "1"])
        .spawn()
        .unwrap();

    let mut watcher = FileLock::with_config(identity, &config);
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut saw_held = false;
    while Instant::now() < deadline && child.try_wait().unwrap().is_none() {
        if !watcher.try_acquire().unwrap() {
            saw_held = true;
            break;
        }
        watcher.release().unwrap();
        thread::sleep(Duration::from_millis(10));
    }
    assert!(saw_held, "parent never observed the child's lock");

    assert!(child.wait().unwrap().success());
    assert!(watcher.try_acquire().unwrap());
}
