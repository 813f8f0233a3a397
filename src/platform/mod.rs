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

//! OS advisory-lock primitives.
//!
//! Each target compiles exactly one [`LockBackend`] implementation, exposed as
//! [`PlatformBackend`]: `flock(2)` on unix and `LockFile` over a single byte on
//! Windows. Everything above this module is platform-agnostic.

pub mod filesystem;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{PosixBackend, PosixLockGuard};
#[cfg(windows)]
pub use windows::{WindowsBackend, WindowsLockGuard};

#[cfg(unix)]
pub type PlatformBackend = PosixBackend;
#[cfg(windows)]
pub type PlatformBackend = WindowsBackend;

use crate::error::{LockError, Result};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Non-blocking exclusive locking over an open lock file.
pub trait LockBackend: fmt::Debug {
    /// An open file whose OS-level lock is held.
    type Guard: fmt::Debug;

    /// Opens (creating if needed) a read/write handle to `path`.
    ///
    /// `Ok(None)` means the file is busy and cannot be opened right now, which
    /// backends with exclusive opens report instead of failing. Paths that can
    /// never be locked fail with `IsADirectory`/`PermissionDenied`.
    fn open_lock_target(&self, path: &Path, mode: u32) -> Result<Option<File>>;

    /// Attempts the lock without blocking. `Ok(None)` means another handle holds
    /// it; the file is closed in that case.
    fn try_lock(&self, file: File, path: &Path) -> Result<Option<Self::Guard>>;

    /// Releases the lock and closes the handle.
    fn unlock(&self, guard: Self::Guard, path: &Path) -> Result<()>;
}

/// Rejects lock targets that are directories or read-only files.
///
/// A read-only file with a zero mtime is let through: that combination is what
/// some filesystems report for a file another process is still creating.
pub(crate) fn precheck_lock_target(path: &Path) -> Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(map_open_error(err, path)),
    };

    if metadata.is_dir() {
        return Err(directory_collision(path));
    }

    let touched = metadata
        .modified()
        .map(|mtime| mtime != SystemTime::UNIX_EPOCH)
        .unwrap_or(true);
    if !owner_writable(&metadata) && touched {
        return Err(LockError::PermissionDenied(format!(
            "{} is not writable",
            path.display()
        )));
    }

    Ok(())
}

pub(crate) fn map_open_error(err: io::Error, path: &Path) -> LockError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => LockError::PermissionDenied(path.display().to_string()),
        io::ErrorKind::IsADirectory => directory_collision(path),
        _ => LockError::Io(err),
    }
}

pub(crate) fn unsupported_error(path: &Path, cause: &str) -> LockError {
    let details = match filesystem::describe_filesystem(path) {
        Some(kind) if kind.is_network_share() => format!(
            "network filesystem {kind} rejected the lock request: {cause}; \
             use a local lock directory"
        ),
        Some(kind) => format!("filesystem {kind} rejected the lock request: {cause}"),
        None => cause.to_string(),
    };
    LockError::LockingUnsupported {
        path: path.display().to_string(),
        details,
    }
}

#[cfg(unix)]
fn directory_collision(path: &Path) -> LockError {
    LockError::IsADirectory(path.display().to_string())
}

#[cfg(not(unix))]
fn directory_collision(path: &Path) -> LockError {
    LockError::PermissionDenied(format!("{} is a directory", path.display()))
}

#[cfg(unix)]
fn owner_writable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o200 != 0
}

#[cfg(not(unix))]
fn owner_writable(metadata: &fs::Metadata) -> bool {
    !metadata.permissions().readonly()
}
