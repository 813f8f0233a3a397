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

//! Mapping from lock identities to lock file paths.

use crate::config::LockConfig;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const LOCK_SUFFIX: &str = ".lock";
const MAX_FILE_NAME_LEN: usize = 200;
const DIGEST_HEX_LEN: usize = 64;

/// Longest prefix that still leaves room for the separators, the digest and
/// the suffix of a hashed name.
pub const MAX_PREFIX_LEN: usize = MAX_FILE_NAME_LEN - (2 + DIGEST_HEX_LEN + LOCK_SUFFIX.len());

/// Encodes an identity into a filesystem-safe segment.
///
/// ASCII alphanumerics pass through; every other byte, `_` included, becomes
/// `_xx` in lowercase hex. Because `_` never appears unescaped the encoding is
/// injective.
pub fn sanitize_identity(identity: &str) -> String {
    let mut output = String::with_capacity(identity.len());
    for byte in identity.bytes() {
        if byte.is_ascii_alphanumeric() {
            output.push(byte as char);
        } else {
            let _ = write!(output, "_{byte:02x}");
        }
    }
    output
}

/// File name (without directory) of the lock file for `identity`.
pub fn lock_file_name(prefix: &str, identity: &str) -> String {
    let sanitized = sanitize_identity(identity);
    let plain_len = prefix.len() + 1 + sanitized.len() + LOCK_SUFFIX.len();
    if plain_len <= MAX_FILE_NAME_LEN {
        return format!("{prefix}_{sanitized}{LOCK_SUFFIX}");
    }

    // Sanitized output is pure ASCII, so any byte offset is a char boundary.
    let head_len = MAX_FILE_NAME_LEN
        .saturating_sub(prefix.len() + 2 + DIGEST_HEX_LEN + LOCK_SUFFIX.len())
        .min(sanitized.len());
    let head = &sanitized[..head_len];
    let digest = hex::encode(Sha256::digest(identity.as_bytes()));
    format!("{prefix}_{head}-{digest}{LOCK_SUFFIX}")
}

pub fn lock_file_path_in(lock_dir: &Path, prefix: &str, identity: &str) -> PathBuf {
    lock_dir.join(lock_file_name(prefix, identity))
}

pub fn lock_file_path(config: &LockConfig, identity: &str) -> PathBuf {
    lock_file_path_in(&config.lock_dir, &config.prefix, identity)
}
