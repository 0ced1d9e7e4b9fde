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

//! Build-time errors. Every variant aborts the build before anything is committed.

use kbundle_core::graph::CycleError;
use kbundle_core::ConfigError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One rejected asset, reported as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNameIssue {
    /// Logical path of the offending asset.
    pub path: String,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for AssetNameIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

fn list_issues(issues: &[AssetNameIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A bundle build failed.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The rule set or configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every invalid asset name found during grouping, collected before failing.
    #[error("{} invalid asset name(s):\n{}", .0.len(), list_issues(.0))]
    InvalidAssetNames(Vec<AssetNameIssue>),

    /// The bundle dependency graph has a cycle.
    #[error("bundle dependency cycle: {0}")]
    Cycle(#[from] CycleError<String>),

    /// Two distinct output files hash identically.
    #[error("output files '{first}' and '{second}' share content hash {hash}")]
    NameCollision {
        /// The shared digest.
        hash: String,
        /// The first file with that digest.
        first: String,
        /// The second file with that digest.
        second: String,
    },

    /// A dependency sidecar could not be parsed.
    #[error("invalid dependency sidecar '{path}': {message}")]
    Sidecar {
        /// Logical path of the sidecar.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A bundle could not be serialized.
    #[error("failed to encode bundle '{bundle}': {message}")]
    Encode {
        /// The bundle being compiled.
        bundle: String,
        /// Encoder message.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Attaches a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}
