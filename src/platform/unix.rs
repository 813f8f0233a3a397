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
use log::trace;
use nix::errno::Errno;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// `flock(2)` backend. The lock covers the whole file and belongs to the open
/// file description, so closing the descriptor also drops it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixBackend;

#[derive(Debug)]
pub struct PosixLockGuard {
    file: File,
}

impl LockBackend for PosixBackend {
    type Guard = PosixLockGuard;

    fn open_lock_target(&self, path: &Path, mode: u32) -> Result<Option<File>> {
        precheck_lock_target(path)?;
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(mode)
            .open(path)
            .map(Some)
            .map_err(|err| map_open_error(err, path))
    }

    fn try_lock(&self, file: File, path: &Path) -> Result<Option<PosixLockGuard>> {
        loop {
            let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            match Errno::result(ret) {
                Ok(_) => return Ok(Some(PosixLockGuard { file })),
                Err(Errno::EINTR) => continue,
                Err(errno) if is_contended(errno) => {
                    trace!("flock on {} would block", path.display());
                    return Ok(None);
                }
                Err(errno) if is_unsupported(errno) => {
                    return Err(unsupported_error(path, errno.desc()));
                }
                Err(errno) => return Err(LockError::Io(errno.into())),
            }
        }
    }

    fn unlock(&self, guard: PosixLockGuard, path: &Path) -> Result<()> {
        let ret = unsafe { libc::flock(guard.file.as_raw_fd(), libc::LOCK_UN) };
        // The file stays on disk: unlinking it would let a later opener lock a
        // fresh inode while a waiter still holds the old one.
        drop(guard);
        Errno::result(ret).map(drop).map_err(|errno| {
            trace!("LOCK_UN failed for {}: {errno}", path.display());
            LockError::Io(errno.into())
        })
    }
}

fn is_contended(errno: Errno) -> bool {
    errno == Errno::EWOULDBLOCK || errno == Errno::EAGAIN
}

fn is_unsupported(errno: Errno) -> bool {
    errno == Errno::ENOLCK
        || errno == Errno::ENOSYS
        || errno == Errno::EOPNOTSUPP
        || errno == Errno::ENOTSUP
}
