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

//! Best-effort identification of the filesystem behind a lock path. Only used
//! to explain why advisory locking was refused.

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilesystemKind {
    Ext4,
    Xfs,
    Btrfs,
    Apfs,
    Tmpfs,
    Overlay,
    Zfs,
    Fat,
    Exfat,
    Nfs,
    Cifs,
    Smb2,
    Other(String),
}

impl FilesystemKind {
    pub fn is_network_share(&self) -> bool {
        matches!(
            self,
            FilesystemKind::Nfs | FilesystemKind::Cifs | FilesystemKind::Smb2
        )
    }
}

impl fmt::Display for FilesystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FilesystemKind::Ext4 => "ext4",
            FilesystemKind::Xfs => "xfs",
            FilesystemKind::Btrfs => "btrfs",
            FilesystemKind::Apfs => "apfs",
            FilesystemKind::Tmpfs => "tmpfs",
            FilesystemKind::Overlay => "overlay",
            FilesystemKind::Zfs => "zfs",
            FilesystemKind::Fat => "fat",
            FilesystemKind::Exfat => "exfat",
            FilesystemKind::Nfs => "nfs",
            FilesystemKind::Cifs => "cifs",
            FilesystemKind::Smb2 => "smb2",
            FilesystemKind::Other(name) => name.as_str(),
        };
        f.write_str(label)
    }
}

/// Classifies the filesystem holding `path` (or its parent when the file does
/// not exist yet). Returns `None` when the platform offers no answer.
pub fn describe_filesystem(path: &Path) -> Option<FilesystemKind> {
    let stat_target = resolve_stat_target(path)?;

    #[cfg(unix)]
    {
        classify_unix(&stat_target)
    }

    #[cfg(not(unix))]
    {
        let _ = stat_target;
        None
    }
}

fn resolve_stat_target(original: &Path) -> Option<PathBuf> {
    if let Ok(existing) = original.canonicalize() {
        return Some(existing);
    }

    original
        .parent()
        .and_then(|parent| parent.canonicalize().ok())
}

#[cfg(unix)]
fn classify_unix(path: &Path) -> Option<FilesystemKind> {
    use nix::sys::statfs::statfs;

    let stats = match statfs(path) {
        Ok(stats) => stats,
        Err(err) => {
            log::debug!("statfs failed for {}: {err}", path.display());
            return None;
        }
    };

    let raw = stats.filesystem_type().0 as libc::c_long;
    if let Some(kind) = classify_unix_magic(raw) {
        return Some(kind);
    }

    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "openbsd",
        target_os = "netbsd"
    ))]
    {
        if let Some(name) = stats.fstypename()
            && let Ok(name_str) = name.to_str()
        {
            return Some(classify_by_name(name_str));
        }
    }

    Some(FilesystemKind::Other(format!("0x{raw:x}")))
}

#[cfg(unix)]
fn classify_unix_magic(raw: libc::c_long) -> Option<FilesystemKind> {
    match raw {
        EXT4_SUPER_MAGIC => Some(FilesystemKind::Ext4),
        XFS_SUPER_MAGIC => Some(FilesystemKind::Xfs),
        BTRFS_SUPER_MAGIC => Some(FilesystemKind::Btrfs),
        TMPFS_MAGIC => Some(FilesystemKind::Tmpfs),
        OVERLAYFS_SUPER_MAGIC => Some(FilesystemKind::Overlay),
        ZFS_SUPER_MAGIC => Some(FilesystemKind::Zfs),
        CIFS_MAGIC_NUMBER => Some(FilesystemKind::Cifs),
        SMB2_MAGIC_NUMBER => Some(FilesystemKind::Smb2),
        NFS_SUPER_MAGIC => Some(FilesystemKind::Nfs),
        MSDOS_SUPER_MAGIC | VFAT_SUPER_MAGIC => Some(FilesystemKind::Fat),
        EXFAT_SUPER_MAGIC => Some(FilesystemKind::Exfat),
        _ => None,
    }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "netbsd"
))]
fn classify_by_name(name: &str) -> FilesystemKind {
    match name.to_ascii_lowercase().as_str() {
        "apfs" => FilesystemKind::Apfs,
        "zfs" => FilesystemKind::Zfs,
        "nfs" => FilesystemKind::Nfs,
        "smbfs" | "cifs" => FilesystemKind::Cifs,
        "msdos" => FilesystemKind::Fat,
        "exfat" => FilesystemKind::Exfat,
        other => FilesystemKind::Other(other.to_string()),
    }
}

#[cfg(unix)]
const EXT4_SUPER_MAGIC: libc::c_long = 0xEF53;
#[cfg(unix)]
const XFS_SUPER_MAGIC: libc::c_long = 0x5846_5342;
#[cfg(unix)]
const BTRFS_SUPER_MAGIC: libc::c_long = 0x9123_683E;
#[cfg(unix)]
const TMPFS_MAGIC: libc::c_long = 0x0102_1994;
#[cfg(unix)]
const OVERLAYFS_SUPER_MAGIC: libc::c_long = 0x794C_7630;
#[cfg(unix)]
const ZFS_SUPER_MAGIC: libc::c_long = 0x2FC1_2FC1;
#[cfg(unix)]
const CIFS_MAGIC_NUMBER: libc::c_long = 0xFF53_4D42;
#[cfg(unix)]
const SMB2_MAGIC_NUMBER: libc::c_long = 0xFE53_4D42;
#[cfg(unix)]
const NFS_SUPER_MAGIC: libc::c_long = 0x0000_6969;
#[cfg(unix)]
const MSDOS_SUPER_MAGIC: libc::c_long = 0x0000_4D44;
#[cfg(unix)]
const VFAT_SUPER_MAGIC: libc::c_long = 0x0000_5646;
#[cfg(unix)]
const EXFAT_SUPER_MAGIC: libc::c_long = 0x2011_BAB0;
