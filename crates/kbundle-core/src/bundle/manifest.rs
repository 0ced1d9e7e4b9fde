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

//! The persisted build manifest.

use super::rules::PackagingRuleSet;
use crate::error::ConfigError;
use crate::graph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// File name of the manifest inside a bundle output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// File name of the plain version marker used by update checks.
pub const VERSION_FILE_NAME: &str = "version.txt";

/// One physical output file and the digest of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    /// The bundle file name, which is also the bundle name.
    pub file_name: String,
    /// Hex BLAKE3 digest of the file contents.
    pub content_hash: String,
}

/// Everything the runtime needs to know about a bundle build.
///
/// Loaded once per session and treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// `{base_version}.{build_timestamp}`.
    pub version: String,
    /// Every bundle file produced by the build.
    pub files: Vec<ManifestFile>,
    /// Bundle name to the bundles it depends on.
    pub dependency_edges: BTreeMap<String, Vec<String>>,
    /// The rule set the build ran with. The runtime re-derives bundle names from it.
    pub config: PackagingRuleSet,
}

impl Manifest {
    /// Parses and validates a manifest from its JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let manifest: Manifest =
            serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse {
                what: MANIFEST_FILE_NAME.to_string(),
                message: e.to_string(),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serializes the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Checks that the rule snapshot is valid, every edge points at a listed
    /// bundle, and the edges are acyclic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()?;

        let known: HashSet<&str> = self.files.iter().map(|f| f.file_name.as_str()).collect();
        if known.len() != self.files.len() {
            return Err(ConfigError::Manifest("a bundle file is listed twice".into()));
        }

        for (owner, deps) in &self.dependency_edges {
            if !known.contains(owner.as_str()) {
                return Err(ConfigError::Manifest(format!(
                    "dependency edges reference unknown bundle '{owner}'"
                )));
            }
            if let Some(missing) = deps.iter().find(|d| !known.contains(d.as_str())) {
                return Err(ConfigError::Manifest(format!(
                    "bundle '{owner}' depends on unknown bundle '{missing}'"
                )));
            }
        }

        let adjacency: BTreeMap<&str, BTreeSet<&str>> = self
            .dependency_edges
            .iter()
            .map(|(owner, deps)| (owner.as_str(), deps.iter().map(String::as_str).collect()))
            .collect();
        if let Some(cycle) = graph::find_cycle(&adjacency) {
            return Err(ConfigError::Manifest(format!(
                "dependency cycle: {}",
                graph::CycleError::new(cycle)
            )));
        }
        Ok(())
    }

    /// Looks up the output file of a bundle.
    pub fn file(&self, bundle: &str) -> Option<&ManifestFile> {
        self.files.iter().find(|f| f.file_name == bundle)
    }

    /// Iterates over every bundle name in the manifest.
    pub fn bundle_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.file_name.as_str())
    }

    /// The direct dependencies of `bundle`, empty if it has none or is unknown.
    pub fn dependencies_of(&self, bundle: &str) -> &[String] {
        self.dependency_edges
            .get(bundle)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every bundle `bundle` depends on, directly or not, each listed once and
    /// after all of its own dependencies.
    pub fn transitive_dependencies<'a>(&'a self, bundle: &'a str) -> Vec<String> {
        let mut visited = HashSet::from([bundle]);
        let mut ordered = Vec::new();
        self.collect_dependencies(bundle, &mut visited, &mut ordered);
        ordered
    }

    fn collect_dependencies<'a>(
        &'a self,
        bundle: &str,
        visited: &mut HashSet<&'a str>,
        ordered: &mut Vec<String>,
    ) {
        for dep in self.dependencies_of(bundle) {
            if visited.insert(dep.as_str()) {
                self.collect_dependencies(dep, visited, ordered);
                ordered.push(dep.clone());
            }
        }
    }
}
