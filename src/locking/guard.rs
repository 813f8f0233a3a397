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

use crate::error::Result;
use crate::locking::file_lock::FileLock;
use crate::locking::pool::FileLockPool;
use crate::platform::{LockBackend, PlatformBackend};
use log::warn;
use std::ops::Deref;

/// Releases a held [`FileLock`] when dropped, including during unwinding.
pub struct FileLockGuard<'a, B: LockBackend = PlatformBackend> {
    lock: &'a mut FileLock<B>,
    released: bool,
}

impl<'a, B: LockBackend> FileLockGuard<'a, B> {
    pub(crate) fn new(lock: &'a mut FileLock<B>) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// Releases now, surfacing any unlock error instead of logging it.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.lock.release()
    }
}

impl<B: LockBackend> Deref for FileLockGuard<'_, B> {
    type Target = FileLock<B>;

    fn deref(&self) -> &Self::Target {
        self.lock
    }
}

impl<B: LockBackend> Drop for FileLockGuard<'_, B> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(err) = self.lock.release() {
            warn!("Failed to release lock '{}': {err}", self.lock.identity());
        }
    }
}

/// Releases the slot held by a [`FileLockPool`] when dropped.
pub struct PoolGuard<'a, B: LockBackend = PlatformBackend> {
    pool: &'a mut FileLockPool<B>,
    released: bool,
}

impl<'a, B: LockBackend> PoolGuard<'a, B> {
    pub(crate) fn new(pool: &'a mut FileLockPool<B>) -> Self {
        Self {
            pool,
            released: false,
        }
    }

    /// Identity of the slot this guard holds.
    pub fn identity(&self) -> &str {
        self.pool.acquired_identity().unwrap_or_default()
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.pool.release()
    }
}

impl<B: LockBackend> Deref for PoolGuard<'_, B> {
    type Target = FileLockPool<B>;

    fn deref(&self) -> &Self::Target {
        self.pool
    }
}

impl<B: LockBackend> Drop for PoolGuard<'_, B> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(err) = self.pool.release() {
            warn!("Failed to release pool slot: {err}");
        }
    }
}
