// Copyright 2025 eraflo
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

//! The bundle naming scheme.
//!
//! Bundle compilers reject names containing path separators, so logical names
//! are flattened before use. When a rule asks for content addressing the
//! flattened name is replaced by a digest of itself. Both the build pipeline
//! and the runtime resolver go through [`bundle_name`].

/// The token that replaces separators and dots in a logical bundle name.
pub const SEPARATOR_TOKEN: char = '_';

/// Number of hex characters kept from the digest of a content-addressed name.
pub const CONTENT_ADDRESS_LEN: usize = 32;

/// Replaces `/`, `\` and `.` in `logical_name` with [`SEPARATOR_TOKEN`].
pub fn normalize(logical_name: &str) -> String {
    logical_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '.' => SEPARATOR_TOKEN,
            other => other,
        })
        .collect()
}

/// Derives the stable bundle name for a logical bundle path.
pub fn bundle_name(logical_name: &str, content_addressed: bool) -> String {
    let normalized = normalize(logical_name);
    if content_addressed {
        let digest = blake3::hash(normalized.as_bytes()).to_hex();
        digest.as_str()[..CONTENT_ADDRESS_LEN].to_string()
    } else {
        normalized
    }
}
