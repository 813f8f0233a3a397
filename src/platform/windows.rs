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
use crate::platform::{LockBackend, map_open_error, precheck_lock_target, unsupported_error};
use log::{debug, trace};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::AsRawHandle;
use std::path::Path;
use winapi::shared::winerror::{
    ERROR_ACCESS_DENIED, ERROR_INVALID_FUNCTION, ERROR_LOCK_VIOLATION, ERROR_NOT_SUPPORTED,
    ERROR_SHARING_VIOLATION,
};
use winapi::um::fileapi::{LockFile, UnlockFile};
use winapi::um::winnt::HANDLE;

/// Region-lock backend locking the first byte of the lock file.
///
/// Lock files are opened with no sharing at all, so only the holder ever has
/// the file open. That is what makes removing the file after unlock safe: a
/// removal can only succeed once no other handle to the old file exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsBackend;

#[derive(Debug)]
pub struct WindowsLockGuard {
    file: File,
}

impl LockBackend for WindowsBackend {
    type Guard = WindowsLockGuard;

    fn open_lock_target(&self, path: &Path, _mode: u32) -> Result<Option<File>> {
        precheck_lock_target(path)?;
        let opened = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .share_mode(0)
            .open(path);

        match opened {
            Ok(file) => Ok(Some(file)),
            Err(err) if is_busy_open(&err, path) => {
                trace!("{} is held open by another handle", path.display());
                Ok(None)
            }
            Err(err) => Err(map_open_error(err, path)),
        }
    }

    fn try_lock(&self, file: File, path: &Path) -> Result<Option<WindowsLockGuard>> {
        let ok = unsafe { LockFile(file.as_raw_handle() as HANDLE, 0, 0, 1, 0) };
        if ok != 0 {
            return Ok(Some(WindowsLockGuard { file }));
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == ERROR_LOCK_VIOLATION as i32 => Ok(None),
            Some(code)
                if code == ERROR_NOT_SUPPORTED as i32 || code == ERROR_INVALID_FUNCTION as i32 =>
            {
                Err(unsupported_error(path, &err.to_string()))
            }
            _ => Err(LockError::Io(err)),
        }
    }

    fn unlock(&self, guard: WindowsLockGuard, path: &Path) -> Result<()> {
        let ok = unsafe { UnlockFile(guard.file.as_raw_handle() as HANDLE, 0, 0, 1, 0) };
        let unlock_err = (ok == 0).then(io::Error::last_os_error);
        // The handle must be closed first: with no sharing, even our own
        // delete request would be refused while it is open.
        drop(guard);

        if let Err(err) = fs::remove_file(path) {
            debug!(
                "Left lock file {} in place after unlock: {err}",
                path.display()
            );
        }

        match unlock_err {
            Some(err) => Err(LockError::Io(err)),
            None => Ok(()),
        }
    }
}

/// A sharing violation means another handle has the file open. Access denied
/// on an existing file means a delete is still pending on it; both clear once
/// the other side closes its handle.
fn is_busy_open(err: &io::Error, path: &Path) -> bool {
    match err.raw_os_error() {
        Some(code) if code == ERROR_SHARING_VIOLATION as i32 => true,
        Some(code) if code == ERROR_ACCESS_DENIED as i32 => path.exists(),
        _ => false,
    }
}
