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

use crate::error::LockError;
use std::fmt;

pub struct ErrorContext<'a> {
    pub error: &'a LockError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(error: &'a LockError) -> Self {
        let (suggestion, details) = match error {
            LockError::LockTimeout { waited, .. } => {
                let suggestion = if waited.is_some() {
                    Some(
                        "Another process still holds the lock. Increase --timeout or use \
                         'lockpool status' to see which locks are held."
                            .to_string(),
                    )
                } else {
                    Some(
                        "Another process holds the lock. Pass --wait to block until it is \
                         released."
                            .to_string(),
                    )
                };
                (suggestion, None)
            }
            LockError::PermissionDenied(path) => {
                let suggestion = Some(format!(
                    "Ensure the lock file and its directory are writable by this user: {path}"
                ));
                (suggestion, None)
            }
            LockError::IsADirectory(path) => {
                let suggestion = Some(
                    "Remove the directory or choose another --lock-dir or --prefix so the lock \
                     file name does not collide with it."
                        .to_string(),
                );
                let details = Some(format!("A directory exists at the lock path {path}."));
                (suggestion, details)
            }
            LockError::LockingUnsupported { details, .. } => {
                let suggestion = Some(
                    "Advisory locks are unavailable on this filesystem (common for network \
                     shares). Point --lock-dir at a local filesystem."
                        .to_string(),
                );
                (suggestion, Some(details.clone()))
            }
            LockError::ConfigError(msg) | LockError::InvalidConfig(msg) => {
                let suggestion =
                    Some("Check the lockpool configuration file for typos.".to_string());
                (suggestion, Some(msg.clone()))
            }
            LockError::Io(io_err) => {
                let suggestion = match io_err.kind() {
                    std::io::ErrorKind::NotFound => Some(
                        "Ensure the lock directory exists and the path is correct.".to_string(),
                    ),
                    _ => None,
                };
                let details = Some(format!("I/O error: {io_err}"));
                (suggestion, details)
            }
            _ => (None, None),
        };

        ErrorContext {
            error,
            suggestion,
            details,
        }
    }
}

impl fmt::Display for ErrorContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\n\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}
