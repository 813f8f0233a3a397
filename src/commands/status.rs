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

use crate::config::LockConfig;
use crate::error::Result;
use crate::locking::FileLock;
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL};
use log::debug;
use serde::Serialize;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    Held,
    Free,
}

#[derive(Debug, Serialize)]
pub struct LockStatus {
    pub identity: String,
    pub state: LockState,
    pub path: String,
}

/// Reports whether each identity is currently held by some process.
pub struct StatusCommand<'a> {
    config: &'a LockConfig,
}

impl<'a> StatusCommand<'a> {
    pub fn new(config: &'a LockConfig) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn execute(&self, identities: &[String], json: bool) -> Result<()> {
        let statuses = self.check_all(identities)?;

        if json {
            let output = serde_json::to_string_pretty(&statuses).map_err(io::Error::from)?;
            println!("{output}");
            return Ok(());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Identity", "State", "Lock file"]);
        for status in &statuses {
            let state = match status.state {
                LockState::Held => Cell::new("held").fg(Color::Yellow),
                LockState::Free => Cell::new("free").fg(Color::Green),
            };
            table.add_row(vec![
                Cell::new(&status.identity),
                state,
                Cell::new(&status.path),
            ]);
        }
        println!("{table}");
        Ok(())
    }

    /// Checks with a non-blocking acquire that is released straight away.
    pub fn check_all(&self, identities: &[String]) -> Result<Vec<LockStatus>> {
        identities
            .iter()
            .map(|identity| self.check(identity))
            .collect()
    }

    fn check(&self, identity: &str) -> Result<LockStatus> {
        let mut lock = FileLock::with_config(identity, self.config);
        let state = if lock.try_acquire()? {
            lock.release()?;
            LockState::Free
        } else {
            LockState::Held
        };
        debug!("Lock '{identity}' is {state:?}");

        Ok(LockStatus {
            identity: identity.to_string(),
            state,
            path: lock.path().display().to_string(),
        })
    }
}
