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
use crate::error::{LockError, Result};
use crate::locking::acquisition::{AcquireOptions, poll_until_acquired};
use crate::locking::guard::FileLockGuard;
use crate::paths::lock_file_path;
use crate::platform::{LockBackend, PlatformBackend, map_open_error};
use log::{debug, trace, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A named cross-process lock backed by a lock file.
///
/// Acquiring an instance that already holds its lock is a no-op, but two
/// instances with the same identity are independent: inside one process they
/// contend exactly like two processes would.
pub struct FileLock<B: LockBackend = PlatformBackend> {
    identity: String,
    path: PathBuf,
    file_mode: u32,
    backend: B,
    held: Option<HeldLock<B::Guard>>,
}

#[derive(Debug)]
struct HeldLock<G> {
    guard: G,
    acquired_at: Instant,
}

impl FileLock<PlatformBackend> {
    /// Lock for `identity` under the default lock directory and prefix.
    pub fn new<S: Into<String>>(identity: S) -> Self {
        Self::with_config(identity, &LockConfig::default())
    }

    pub fn with_config<S: Into<String>>(identity: S, config: &LockConfig) -> Self {
        Self::with_backend(identity, config, PlatformBackend::default())
    }
}

impl<B: LockBackend> FileLock<B> {
    pub fn with_backend<S: Into<String>>(identity: S, config: &LockConfig, backend: B) -> Self {
        let identity = identity.into();
        let path = lock_file_path(config, &identity);
        Self {
            identity,
            path,
            file_mode: config.file_mode,
            backend,
            held: None,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_locked(&self) -> bool {
        self.held.is_some()
    }

    /// How long the lock has been held, if it is.
    pub fn held_for(&self) -> Option<Duration> {
        self.held.as_ref().map(|held| held.acquired_at.elapsed())
    }

    /// Acquires the lock according to `options`.
    ///
    /// Contention surfaces as [`LockError::LockTimeout`]; every other error is
    /// returned as-is without retrying. On error the instance stays unlocked.
    pub fn acquire(&mut self, options: &AcquireOptions) -> Result<&mut Self> {
        if self.is_locked() {
            trace!("Lock '{}' already held by this instance", self.identity);
            return Ok(self);
        }

        let target = self.target_label();
        poll_until_acquired(options, &target, || self.try_acquire())?;
        Ok(self)
    }

    /// Acquires the lock and returns a guard that releases it when dropped.
    pub fn lock(&mut self, options: &AcquireOptions) -> Result<FileLockGuard<'_, B>> {
        self.acquire(options)?;
        Ok(FileLockGuard::new(self))
    }

    /// Makes one non-blocking attempt. `Ok(false)` means another holder has it.
    pub fn try_acquire(&mut self) -> Result<bool> {
        if self.held.is_some() {
            return Ok(true);
        }

        self.ensure_lock_dir()?;
        let Some(file) = self.backend.open_lock_target(&self.path, self.file_mode)? else {
            trace!("Lock file {} is busy", self.path.display());
            return Ok(false);
        };
        match self.backend.try_lock(file, &self.path)? {
            Some(guard) => {
                self.held = Some(HeldLock {
                    guard,
                    acquired_at: Instant::now(),
                });
                debug!(
                    "Acquired lock '{}' ({})",
                    self.identity,
                    self.path.display()
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Releases the lock if held. The instance is unlocked afterwards even when
    /// the OS reports an unlock failure.
    pub fn release(&mut self) -> Result<()> {
        let Some(held) = self.held.take() else {
            return Ok(());
        };

        let held_for = held.acquired_at.elapsed();
        match self.backend.unlock(held.guard, &self.path) {
            Ok(()) => {
                debug!(
                    "Released lock '{}' after {:.3}s",
                    self.identity,
                    held_for.as_secs_f64()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "Failed to release lock '{}' ({}): {err}",
                    self.identity,
                    self.path.display()
                );
                Err(LockError::LockingRelease {
                    target: self.identity.clone(),
                    details: err.to_string(),
                })
            }
        }
    }

    fn target_label(&self) -> String {
        format!("lock '{}'", self.identity)
    }

    fn ensure_lock_dir(&self) -> Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                fs::create_dir_all(parent).map_err(|err| map_open_error(err, parent))
            }
            _ => Ok(()),
        }
    }
}

impl<B: LockBackend> fmt::Debug for FileLock<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLock")
            .field("identity", &self.identity)
            .field("path", &self.path)
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl<B: LockBackend> Drop for FileLock<B> {
    fn drop(&mut self) {
        if !self.is_locked() {
            return;
        }

        if let Err(err) = self.release() {
            warn!("Failed to release lock during drop: {err}");
        }
    }
}
