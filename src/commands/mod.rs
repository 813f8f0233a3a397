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

pub mod path;
pub mod pool;
pub mod run;
pub mod status;

use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::locking::{AcquireMode, AcquireOptions, LockTimeoutResolver, LockTimeoutValue};
use clap::Args;
use log::debug;
use std::process::{Command, ExitStatus};
use std::time::Duration;

/// Environment variable that tells a pool child which slot it holds.
pub const SLOT_ENV: &str = "LOCKPOOL_SLOT";

/// Acquisition flags shared by `run` and `pool`.
#[derive(Debug, Clone, Default, Args)]
pub struct AcquireArgs {
    /// Wait for the lock instead of failing when it is held
    #[arg(short, long)]
    pub wait: bool,

    /// Give up waiting after this many seconds, or "infinite" (implies --wait)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<String>,

    /// Delay between lock attempts while waiting
    #[arg(long, value_name = "MS")]
    pub poll_ms: Option<u64>,
}

impl AcquireArgs {
    /// Starts from the configured defaults and applies the flags on top.
    pub fn options(&self, config: &LockConfig) -> Result<AcquireOptions> {
        let mode = if self.wait || self.timeout.is_some() {
            AcquireMode::Blocking
        } else {
            AcquireMode::NonBlocking
        };

        let resolution = LockTimeoutResolver::new(
            self.timeout.as_deref(),
            config.timeout_value()?,
            LockTimeoutValue::Infinite,
        )
        .resolve()
        .map_err(|e| LockError::InvalidConfig(e.to_string()))?;
        debug!(
            "Lock timeout {} (from {})",
            resolution.value, resolution.source
        );

        let mut options = AcquireOptions::from_config(config)?
            .with_mode(mode)
            .with_timeout_value(resolution.value);
        if let Some(poll_ms) = self.poll_ms {
            options = options.with_poll_interval(Duration::from_millis(poll_ms));
        }

        if options.backoff().peek().is_zero() {
            return Err(LockError::InvalidConfig(
                "Poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(options)
    }
}

/// Runs `command` to completion and returns the exit code to propagate.
pub(crate) fn run_child(command: &[String], slot: Option<&str>) -> Result<i32> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| LockError::InvalidConfig("No command given to run".to_string()))?;

    let mut child = Command::new(program);
    child.args(args);
    if let Some(slot) = slot {
        child.env(SLOT_ENV, slot);
    }

    debug!("Running {program} with {} argument(s)", args.len());
    let status = child.status()?;
    Ok(exit_code_of(status))
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
