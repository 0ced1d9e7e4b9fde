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

//! Expands packaging rules over a source tree into concrete bundles.

use crate::error::{AssetNameIssue, BuildError};
use crate::source::SourceTree;
use kbundle_core::bundle::{Compression, PackDirType, PackagingRuleSet};
use kbundle_core::NamingError;
use std::collections::BTreeMap;

/// Extension of dependency sidecar files. Sidecars are never bundled.
pub const SIDECAR_EXTENSION: &str = "meta";

/// One bundle to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDescriptor {
    /// The bundle name, which is also its output file name.
    pub name: String,
    /// Logical paths of the assets it contains, sorted.
    pub source_asset_paths: Vec<String>,
    /// Compression inherited from the owning rule.
    pub compression: Compression,
}

/// The outcome of grouping: bundles, and which bundle every asset went to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    bundles: BTreeMap<String, BundleDescriptor>,
    assignments: BTreeMap<String, String>,
}

impl Grouping {
    /// The bundles, keyed by name.
    pub fn bundles(&self) -> impl Iterator<Item = &BundleDescriptor> {
        self.bundles.values()
    }

    /// Looks up one bundle.
    pub fn bundle(&self, name: &str) -> Option<&BundleDescriptor> {
        self.bundles.get(name)
    }

    /// The bundle an asset was assigned to.
    pub fn bundle_of(&self, asset_path: &str) -> Option<&str> {
        self.assignments.get(asset_path).map(String::as_str)
    }

    /// Asset path to bundle name, for every grouped asset.
    pub fn assignments(&self) -> &BTreeMap<String, String> {
        &self.assignments
    }

    /// Number of bundles.
    pub fn bundle_count(&self) -> usize {
        self.bundles.len()
    }

    /// Number of grouped assets.
    pub fn asset_count(&self) -> usize {
        self.assignments.len()
    }
}

/// Returns `true` for characters allowed in an asset's base name.
fn is_allowed_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_sidecar(path: &str) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, extension)| extension == SIDECAR_EXTENSION)
}

/// Assigns every asset covered by `rules` to a bundle.
///
/// Invalid names and bundle-name clashes are collected across the whole tree
/// and reported together; nothing is returned unless the tree is clean.
pub fn group_assets(rules: &PackagingRuleSet, tree: &dyn SourceTree) -> Result<Grouping, BuildError> {
    let mut grouping = Grouping::default();
    let mut issues = Vec::new();
    // Bundle name to (owning rule, first asset) for clash reporting.
    let mut origins: BTreeMap<String, (String, String)> = BTreeMap::new();

    for rule in rules.iter() {
        let files = tree.list_files(&rule.source_path)?;
        if files.is_empty() {
            log::warn!("Rule '{}' matched no files", rule.source_path);
            continue;
        }

        for path in files {
            if is_sidecar(&path) {
                continue;
            }
            // A nested, more specific rule claims this file instead.
            match rules.owning_rule(&path) {
                Ok(owner) if owner.source_path == rule.source_path => {}
                _ => continue,
            }

            let name = base_name(&path);
            if let Some(bad) = name.chars().find(|c| !is_allowed_name_char(*c)) {
                issues.push(AssetNameIssue {
                    path: path.clone(),
                    reason: format!("character {bad:?} is not allowed in asset names"),
                });
                continue;
            }

            let bundle = match rules.bundle_for(&path) {
                Ok(bundle) => bundle,
                Err(NamingError::LooseFile { .. }) => {
                    log::warn!(
                        "Skipping '{path}': sub-single rule '{}' only bundles subdirectories",
                        rule.source_path
                    );
                    continue;
                }
                Err(e) => {
                    issues.push(AssetNameIssue {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match origins.get(&bundle) {
                Some((origin_rule, first)) if origin_rule != &rule.source_path => {
                    issues.push(AssetNameIssue {
                        path: path.clone(),
                        reason: format!(
                            "bundle name '{bundle}' is also produced by rule '{origin_rule}' (from '{first}')"
                        ),
                    });
                    continue;
                }
                Some((_, first)) if rule.pack_dir_type == PackDirType::File => {
                    issues.push(AssetNameIssue {
                        path: path.clone(),
                        reason: format!("file bundle '{bundle}' already holds '{first}'"),
                    });
                    continue;
                }
                Some(_) => {}
                None => {
                    origins.insert(bundle.clone(), (rule.source_path.clone(), path.clone()));
                }
            }

            log::trace!("Assigning '{path}' to bundle '{bundle}'");
            grouping
                .bundles
                .entry(bundle.clone())
                .or_insert_with(|| BundleDescriptor {
                    name: bundle.clone(),
                    source_asset_paths: Vec::new(),
                    compression: rule.compression,
                })
                .source_asset_paths
                .push(path.clone());
            grouping.assignments.insert(path, bundle);
        }
    }

    if !issues.is_empty() {
        return Err(BuildError::InvalidAssetNames(issues));
    }

    for bundle in grouping.bundles.values_mut() {
        bundle.source_asset_paths.sort();
    }
    log::info!(
        "Grouped {} assets into {} bundles",
        grouping.asset_count(),
        grouping.bundle_count()
    );
    Ok(grouping)
}
