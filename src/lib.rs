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

//! Cross-process mutual exclusion over OS advisory file locks.
//!
//! [`FileLock`] guards one named resource; [`FileLockPool`] hands out whichever
//! of N named slots is free first. Both poll instead of blocking in the kernel,
//! and both release on drop.
//!
//! ```no_run
//! use lockpool::{AcquireOptions, FileLock};
//! use std::time::Duration;
//!
//! let mut lock = FileLock::new("job-42");
//! let options = AcquireOptions::blocking().with_timeout(Duration::from_secs(2));
//! let guard = lock.lock(&options)?;
//! // ... critical section ...
//! guard.release()?;
//! # Ok::<(), lockpool::error::LockError>(())
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod locking;
pub mod logging;
pub mod paths;
pub mod platform;
#[cfg(test)]
pub mod test;

pub use config::LockConfig;
pub use error::{LockError, Result};
pub use locking::{
    AcquireMode, AcquireOptions, FileLock, FileLockGuard, FileLockPool, LockTimeoutValue,
    PollingBackoff, PoolGuard,
};
pub use platform::{LockBackend, PlatformBackend};
