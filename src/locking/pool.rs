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
use crate::locking::file_lock::FileLock;
use crate::locking::guard::PoolGuard;
use crate::platform::{LockBackend, PlatformBackend};
use log::{debug, trace, warn};
use std::fmt;

/// First-fit allocator over a fixed, ordered set of named locks.
///
/// Each scan walks the locks in construction order and takes the first free
/// one, so earlier identities act as preferred slots. There is no fairness
/// between competing processes.
pub struct FileLockPool<B: LockBackend = PlatformBackend> {
    locks: Vec<FileLock<B>>,
    acquired: Option<usize>,
}

impl FileLockPool<PlatformBackend> {
    pub fn new<I, S>(identities: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(identities, &LockConfig::default())
    }

    pub fn with_config<I, S>(identities: I, config: &LockConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let locks = identities
            .into_iter()
            .map(|identity| FileLock::with_config(identity, config))
            .collect();
        Self::from_locks(locks)
    }
}

impl<B: LockBackend> FileLockPool<B> {
    /// Builds a pool from already constructed locks, keeping their order.
    pub fn from_locks(locks: Vec<FileLock<B>>) -> Result<Self> {
        if locks.is_empty() {
            return Err(LockError::InvalidConfig(
                "A lock pool needs at least one identity".to_string(),
            ));
        }

        Ok(Self {
            locks,
            acquired: None,
        })
    }

    /// Acquires the first free lock in pool order.
    ///
    /// A no-op while this pool already holds a slot. Fatal errors from any slot
    /// abort the scan; contention on every slot yields `LockTimeout` under the
    /// same blocking and timeout rules as [`FileLock::acquire`].
    pub fn acquire(&mut self, options: &AcquireOptions) -> Result<&mut Self> {
        if self.acquired.is_some() {
            trace!("Pool already holds {:?}", self.acquired_identity());
            return Ok(self);
        }

        let target = self.target_label();
        let mut chosen = None;
        poll_until_acquired(options, &target, || {
            for (index, lock) in self.locks.iter_mut().enumerate() {
                if lock.try_acquire()? {
                    chosen = Some(index);
                    return Ok(true);
                }
            }
            Ok(false)
        })?;

        self.acquired = chosen;
        if let Some(lock) = self.acquired_lock() {
            debug!("Pool acquired slot '{}'", lock.identity());
        }
        Ok(self)
    }

    pub fn lock(&mut self, options: &AcquireOptions) -> Result<PoolGuard<'_, B>> {
        self.acquire(options)?;
        Ok(PoolGuard::new(self))
    }

    /// Releases the held slot, if any. The selection is cleared even when the
    /// unlock itself fails.
    pub fn release(&mut self) -> Result<()> {
        let Some(index) = self.acquired.take() else {
            return Ok(());
        };

        match self.locks.get_mut(index) {
            Some(lock) => lock.release(),
            None => Ok(()),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.acquired.is_some()
    }

    pub fn acquired_lock(&self) -> Option<&FileLock<B>> {
        self.acquired.and_then(|index| self.locks.get(index))
    }

    pub fn acquired_identity(&self) -> Option<&str> {
        self.acquired_lock().map(FileLock::identity)
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.locks.iter().map(FileLock::identity)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn target_label(&self) -> String {
        let names: Vec<&str> = self.identities().collect();
        format!("a lock from the pool [{}]", names.join(", "))
    }
}

impl<B: LockBackend> fmt::Debug for FileLockPool<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLockPool")
            .field("identities", &self.identities().collect::<Vec<_>>())
            .field("acquired", &self.acquired_identity())
            .finish()
    }
}

impl<B: LockBackend> Drop for FileLockPool<B> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("Failed to release pool slot during drop: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::fixtures::{CountingBackend, UnsupportedBackend, temp_config};
    use std::time::{Duration, Instant};

    #[test]
    fn empty_pool_is_rejected() {
        let (_temp, config) = temp_config();
        let err = FileLockPool::with_config(Vec::<String>::new(), &config).unwrap_err();
        assert!(matches!(err, LockError::InvalidConfig(_)));
    }

    #[test]
    fn preserves_identity_order() {
        let (_temp, config) = temp_config();
        let pool = FileLockPool::with_config(["c", "a", "b"], &config).unwrap();
        assert_eq!(pool.identities().collect::<Vec<_>>(), ["c", "a", "b"]);
        assert_eq!(pool.len(), 3);
        assert!(!pool.is_locked());
    }

    #[test]
    fn first_free_slot_wins() {
        let (_temp, config) = temp_config();
        let mut external = FileLock::with_config("a", &config);
        external.acquire(&AcquireOptions::default()).unwrap();

        let mut pool = FileLockPool::with_config(["a", "b", "c"], &config).unwrap();
        pool.acquire(&AcquireOptions::default()).unwrap();
        assert_eq!(pool.acquired_identity(), Some("b"));

        // c was never touched, so another instance can take it right away
        let mut other_c = FileLock::with_config("c", &config);
        other_c.acquire(&AcquireOptions::default()).unwrap();
        other_c.release().unwrap();

        pool.release().unwrap();
        assert!(!pool.is_locked());
        assert!(external.is_locked());

        let mut other_b = FileLock::with_config("b", &config);
        other_b.acquire(&AcquireOptions::default()).unwrap();
    }

    #[test]
    fn acquire_while_holding_is_noop() {
        let (_temp, config) = temp_config();
        let mut pool = FileLockPool::with_config(["a", "b"], &config).unwrap();
        pool.acquire(&AcquireOptions::default()).unwrap();
        pool.acquire(&AcquireOptions::default()).unwrap();
        assert_eq!(pool.acquired_identity(), Some("a"));

        let mut b = FileLock::with_config("b", &config);
        b.acquire(&AcquireOptions::default()).unwrap();
    }

    #[test]
    fn exhausted_pool_fails_immediately_when_non_blocking() {
        let (_temp, config) = temp_config();
        let mut first = FileLockPool::with_config(["a", "b"], &config).unwrap();
        let mut second = FileLockPool::with_config(["a", "b"], &config).unwrap();
        let mut third = FileLockPool::with_config(["a", "b"], &config).unwrap();

        first.acquire(&AcquireOptions::default()).unwrap();
        second.acquire(&AcquireOptions::default()).unwrap();
        assert_eq!(second.acquired_identity(), Some("b"));

        let err = third.acquire(&AcquireOptions::default()).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Failed to immediately acquire a lock from the pool [a, b]"
        );
        assert!(!third.is_locked());
    }

    #[test]
    fn exhausted_pool_times_out_when_blocking() {
        let (_temp, config) = temp_config();
        let mut holder = FileLockPool::with_config(["only"], &config).unwrap();
        holder.acquire(&AcquireOptions::default()).unwrap();

        let mut waiter = FileLockPool::with_config(["only"], &config).unwrap();
        let timeout = Duration::from_millis(200);
        let options = AcquireOptions::blocking()
            .with_timeout(timeout)
            .with_poll_interval(Duration::from_millis(50));

        let started = Instant::now();
        let err = waiter.acquire(&options).unwrap_err();
        assert!(started.elapsed() >= timeout);
        assert!(matches!(
            err,
            LockError::LockTimeout {
                waited: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn rescans_from_start_after_release() {
        let (_temp, config) = temp_config();
        let mut pool = FileLockPool::with_config(["a", "b"], &config).unwrap();
        pool.acquire(&AcquireOptions::default()).unwrap();
        pool.release().unwrap();
        pool.acquire(&AcquireOptions::default()).unwrap();
        assert_eq!(pool.acquired_identity(), Some("a"));
    }

    #[test]
    fn fatal_slot_error_aborts_scan() {
        let (_temp, config) = temp_config();
        let backend = UnsupportedBackend::default();
        let locks = ["a", "b"]
            .into_iter()
            .map(|id| FileLock::with_backend(id, &config, backend.clone()))
            .collect();
        let mut pool = FileLockPool::from_locks(locks).unwrap();

        let err = pool.acquire(&AcquireOptions::blocking()).unwrap_err();
        assert!(matches!(err, LockError::LockingUnsupported { .. }));
        assert_eq!(backend.attempts(), 1);
    }

    #[test]
    fn release_touches_only_held_slot() {
        let (_temp, config) = temp_config();
        let backend = CountingBackend::default();
        let locks = ["a", "b", "c"]
            .into_iter()
            .map(|id| FileLock::with_backend(id, &config, backend.clone()))
            .collect();
        let mut pool = FileLockPool::from_locks(locks).unwrap();

        pool.release().unwrap();
        assert_eq!(backend.unlocks(), 0);

        pool.acquire(&AcquireOptions::default()).unwrap();
        assert_eq!(backend.opens(), 1);
        pool.release().unwrap();
        assert_eq!(backend.unlocks(), 1);
    }

    #[test]
    fn drop_releases_slot() {
        let (_temp, config) = temp_config();
        {
            let mut pool = FileLockPool::with_config(["a"], &config).unwrap();
            pool.acquire(&AcquireOptions::default()).unwrap();
        }
        let mut again = FileLockPool::with_config(["a"], &config).unwrap();
        again.acquire(&AcquireOptions::default()).unwrap();
    }
}
