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

use crate::commands::{AcquireArgs, run_child};
use crate::config::LockConfig;
use crate::error::Result;
use crate::locking::FileLock;
use log::info;

/// Holds one named lock for the lifetime of a child command.
pub struct RunCommand<'a> {
    config: &'a LockConfig,
}

impl<'a> RunCommand<'a> {
    pub fn new(config: &'a LockConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Returns the child's exit code.
    pub fn execute(
        &self,
        identity: &str,
        acquire: &AcquireArgs,
        command: &[String],
    ) -> Result<i32> {
        let options = acquire.options(self.config)?;
        let mut lock = FileLock::with_config(identity, self.config);
        let guard = lock.lock(&options)?;
        info!("Acquired lock '{identity}' at {}", guard.path().display());

        let outcome = run_child(command, None);
        guard.release()?;
        outcome
    }
}
