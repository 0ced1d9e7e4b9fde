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

//! The in-memory form of a physically loaded bundle.

use std::collections::HashMap;

/// The contents of one bundle after it has been read and decompressed.
///
/// Entries are keyed by the logical path of the asset they were compiled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedBundle {
    name: String,
    entries: HashMap<String, Vec<u8>>,
}

impl LoadedBundle {
    /// Creates a loaded bundle from its entries.
    pub fn new(name: impl Into<String>, entries: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Self {
            name: name.into(),
            entries: entries.into_iter().collect(),
        }
    }

    /// The bundle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw bytes of the asset compiled from `logical_path`.
    pub fn entry(&self, logical_path: &str) -> Option<&[u8]> {
        self.entries.get(logical_path).map(Vec::as_slice)
    }

    /// Returns `true` if the bundle contains `logical_path`.
    pub fn contains(&self, logical_path: &str) -> bool {
        self.entries.contains_key(logical_path)
    }

    /// The logical paths of every asset in the bundle, sorted.
    pub fn asset_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// The number of assets in the bundle.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bundle holds no assets.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
