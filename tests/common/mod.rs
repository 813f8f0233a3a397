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

#![allow(dead_code)]

use assert_cmd::Command;
use lockpool::LockConfig;
use std::path::Path;
use tempfile::TempDir;

/// Config whose lock directory is a fresh temporary directory.
pub fn temp_config() -> (TempDir, LockConfig) {
    let temp = TempDir::new().unwrap();
    let config = LockConfig::default().with_lock_dir(temp.path().join("locks"));
    (temp, config)
}

/// Identity unlikely to collide with anything else running on the host.
pub fn unique_identity(base: &str) -> String {
    format!("{base}-{:08x}", rand::random::<u32>())
}

/// The `lockpool` binary pointed at `temp`, isolated from the user's config.
pub fn lockpool_cmd(temp: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lockpool").unwrap();
    cmd.arg("--config")
        .arg(temp.join("config.toml"))
        .arg("--lock-dir")
        .arg(temp.join("locks"));
    cmd
}
