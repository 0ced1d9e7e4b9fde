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

//! The file-listing collaborator the grouper and compiler read assets through.
//!
//! Paths crossing this boundary are logical: relative to the assets root and
//! always forward-slash separated, whatever the host platform.

use crate::error::BuildError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read access to a tree of source assets.
pub trait SourceTree {
    /// Every file below `dir`, recursively, as sorted logical paths.
    /// A missing directory yields an empty list.
    fn list_files(&self, dir: &str) -> Result<Vec<String>, BuildError>;

    /// Returns `true` if `path` names a file in the tree.
    fn contains(&self, path: &str) -> bool;

    /// Reads the bytes of a file.
    fn read(&self, path: &str) -> Result<Vec<u8>, BuildError>;
}

/// A source tree rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySourceTree {
    root: PathBuf,
}

impl DirectorySourceTree {
    /// Creates a tree rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, logical: &str) -> PathBuf {
        logical
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    fn to_logical(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect();
        Some(parts?.join("/"))
    }
}

impl SourceTree for DirectorySourceTree {
    fn list_files(&self, dir: &str) -> Result<Vec<String>, BuildError> {
        let base = self.resolve(dir);
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| base.clone());
                BuildError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            match self.to_logical(entry.path()) {
                Some(logical) => files.push(logical),
                None => log::warn!(
                    "Skipping '{}': path is not valid UTF-8",
                    entry.path().display()
                ),
            }
        }
        files.sort();
        Ok(files)
    }

    fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, BuildError> {
        let full = self.resolve(path);
        fs::read(&full).map_err(|e| BuildError::io(full, e))
    }
}

/// An in-memory source tree, for tooling and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceTree {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySourceTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.into(), bytes.into());
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl SourceTree for MemorySourceTree {
    fn list_files(&self, dir: &str) -> Result<Vec<String>, BuildError> {
        let prefix = format!("{dir}/");
        Ok(self
            .files
            .keys()
            .filter(|path| path.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, BuildError> {
        self.files.get(path).cloned().ok_or_else(|| {
            BuildError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file in memory tree"),
            )
        })
    }
}
