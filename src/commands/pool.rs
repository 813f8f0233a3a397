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

use crate::commands::{AcquireArgs, SLOT_ENV, run_child};
use crate::config::LockConfig;
use crate::error::Result;
use crate::locking::FileLockPool;
use log::info;

/// Runs a child command while holding the first free slot of a pool.
pub struct PoolCommand<'a> {
    config: &'a LockConfig,
}

impl<'a> PoolCommand<'a> {
    pub fn new(config: &'a LockConfig) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn execute(
        &self,
        slots: &[String],
        acquire: &AcquireArgs,
        command: &[String],
    ) -> Result<i32> {
        let options = acquire.options(self.config)?;
        let mut pool = FileLockPool::with_config(slots, self.config)?;
        let guard = pool.lock(&options)?;
        let slot = guard.identity().to_string();
        info!("Acquired pool slot '{slot}', exporting it as {SLOT_ENV}");

        let outcome = run_child(command, Some(&slot));
        guard.release()?;
        outcome
    }
}
