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

mod context;
mod exit_codes;
mod format;

pub use context::ErrorContext;
pub use exit_codes::get_exit_code;
pub use format::{format_error_chain, format_error_with_color};

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockError {
    /// The only recoverable acquisition failure. `waited` is `None` when the
    /// attempt was non-blocking.
    #[error("{}", timeout_message(.target, .waited))]
    LockTimeout {
        target: String,
        waited: Option<Duration>,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Lock path is a directory: {0}")]
    IsADirectory(String),

    #[error("File locking is not supported for {path}: {details}")]
    LockingUnsupported { path: String, details: String },

    #[error("Failed to release lock '{target}': {details}")]
    LockingRelease { target: String, details: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LockError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::LockTimeout { .. })
    }
}

fn timeout_message(target: &str, waited: &Option<Duration>) -> String {
    match waited {
        None => format!("Failed to immediately acquire {target}"),
        Some(waited) => format!(
            "Timed out acquiring {target} after {:.3}s",
            waited.as_secs_f64()
        ),
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
