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

use crate::error::{LockError, Result};
use crate::locking::timeout::{LockTimeoutValue, parse_timeout_override};
use crate::paths::MAX_PREFIX_LEN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PREFIX: &str = "lockpool";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Where lock files live and how they are named and polled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,

    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Unix permission bits for newly created lock files.
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,

    /// Default wait budget for blocking acquisitions ("infinite" or seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lock_dir: default_lock_dir(),
            prefix: default_prefix(),
            poll_interval_ms: default_poll_interval_ms(),
            file_mode: default_file_mode(),
            timeout: None,
        }
    }
}

fn default_lock_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

impl LockConfig {
    pub fn with_lock_dir<P: Into<PathBuf>>(mut self, lock_dir: P) -> Self {
        self.lock_dir = lock_dir.into();
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parsed form of the configured timeout, if one is set.
    pub fn timeout_value(&self) -> Result<Option<LockTimeoutValue>> {
        self.timeout
            .as_deref()
            .map(|raw| {
                parse_timeout_override(raw).map_err(|err| LockError::InvalidConfig(err.to_string()))
            })
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(LockError::InvalidConfig(
                "Lock file prefix must not be empty".to_string(),
            ));
        }

        if self.prefix.len() > MAX_PREFIX_LEN {
            return Err(LockError::InvalidConfig(format!(
                "Lock file prefix is {} bytes long, the limit is {MAX_PREFIX_LEN}",
                self.prefix.len()
            )));
        }

        if let Some(bad) = self
            .prefix
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_'))
        {
            return Err(LockError::InvalidConfig(format!(
                "Lock file prefix '{}' contains unsupported character '{bad}'",
                self.prefix
            )));
        }

        if self.file_mode > 0o7777 {
            return Err(LockError::InvalidConfig(format!(
                "File mode {:o} is not a valid permission mask",
                self.file_mode
            )));
        }

        self.timeout_value()?;
        Ok(())
    }

    /// Loads the configuration at `config_path`, falling back to defaults when
    /// the file does not exist.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            log::debug!("Config file not found at {config_path:?}, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(config_path)?;
        let config: LockConfig = toml::from_str(&contents).map_err(|e| {
            LockError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;
        config.validate()?;

        log::debug!("Loaded config from {config_path:?}");
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| LockError::ConfigError(format!("Failed to serialize config: {e}")))?;

        fs::write(config_path, contents)?;
        log::debug!("Saved config to {config_path:?}");
        Ok(())
    }

    /// Per-user configuration location used by the CLI when `--config` is absent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lockpool").join(CONFIG_FILE_NAME))
    }
}
