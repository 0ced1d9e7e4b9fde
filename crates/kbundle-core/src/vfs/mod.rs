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

//! Runtime view of a bundle build, answering "which bundle holds this asset".
//!
//! [`BundleNameResolver`] is built from the manifest once per session. It
//! finds the most specific packaging rule for a logical asset path and
//! re-derives the bundle name through the same naming functions the build
//! used, then confirms the bundle was actually produced.

use crate::bundle::{Manifest, ManifestFile};
use crate::error::{ConfigError, LoadError};
use std::collections::HashMap;

/// The runtime representation of `manifest.json`.
#[derive(Debug, Clone)]
pub struct BundleNameResolver {
    manifest: Manifest,
    /// Bundle name to its index in `manifest.files`.
    files: HashMap<String, usize>,
}

impl BundleNameResolver {
    /// Wraps a manifest, validating it first.
    pub fn new(manifest: Manifest) -> Result<Self, ConfigError> {
        manifest.validate()?;
        let files = manifest
            .files
            .iter()
            .enumerate()
            .map(|(index, file)| (file.file_name.clone(), index))
            .collect();
        Ok(Self { manifest, files })
    }

    /// Parses the manifest's JSON bytes and builds the resolver.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        Self::new(Manifest::from_json(bytes)?)
    }

    /// Maps a logical asset path to the bundle that contains it.
    ///
    /// # Errors
    /// [`LoadError::Resolution`] if no rule covers the path, and
    /// [`LoadError::MissingBundle`] if the derived bundle was not part of the build.
    pub fn resolve(&self, logical_path: &str) -> Result<String, LoadError> {
        let bundle = self.manifest.config.bundle_for(logical_path)?;
        if !self.files.contains_key(&bundle) {
            return Err(LoadError::MissingBundle(bundle));
        }
        Ok(bundle)
    }

    /// Returns `true` if the manifest lists `bundle`.
    pub fn contains_bundle(&self, bundle: &str) -> bool {
        self.files.contains_key(bundle)
    }

    /// The manifest entry of a bundle.
    pub fn file(&self, bundle: &str) -> Option<&ManifestFile> {
        self.files.get(bundle).map(|&index| &self.manifest.files[index])
    }

    /// The direct dependencies of a listed bundle.
    pub fn dependencies_of(&self, bundle: &str) -> Result<&[String], LoadError> {
        if !self.contains_bundle(bundle) {
            return Err(LoadError::MissingBundle(bundle.to_string()));
        }
        Ok(self.manifest.dependencies_of(bundle))
    }

    /// The transitive dependencies of a listed bundle, dependencies first.
    pub fn transitive_dependencies(&self, bundle: &str) -> Result<Vec<String>, LoadError> {
        if !self.contains_bundle(bundle) {
            return Err(LoadError::MissingBundle(bundle.to_string()));
        }
        Ok(self.manifest.transitive_dependencies(bundle))
    }

    /// The manifest version string.
    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    /// The underlying manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{PackDirType, PackagingRule, PackagingRuleSet};
    use crate::error::NamingError;
    use std::collections::BTreeMap;

    fn resolver() -> BundleNameResolver {
        let files = ["UI", "Font_f1", "Font_f2"]
            .iter()
            .map(|name| ManifestFile {
                file_name: name.to_string(),
                content_hash: format!("hash-{name}"),
            })
            .collect();
        BundleNameResolver::new(Manifest {
            version: "1.0.42".into(),
            files,
            dependency_edges: BTreeMap::from([("UI".to_string(), vec!["Font_f1".to_string()])]),
            config: PackagingRuleSet::new(vec![
                PackagingRule::new("UI", PackDirType::Single),
                PackagingRule::new("Font", PackDirType::File),
            ])
            .unwrap(),
        })
        .unwrap()
    }

    #[test]
    fn resolves_to_the_owning_bundle() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("UI/a.png").unwrap(), "UI");
        assert_eq!(resolver.resolve("Font/f2.ttf").unwrap(), "Font_f2");
        assert_eq!(resolver.dependencies_of("UI").unwrap(), ["Font_f1".to_string()]);
    }

    #[test]
    fn unmatched_paths_are_resolution_misses() {
        assert_eq!(
            resolver().resolve("Audio/x.ogg"),
            Err(LoadError::Resolution(NamingError::NoMatchingRule {
                path: "Audio/x.ogg".into()
            }))
        );
    }

    #[test]
    fn derived_bundles_missing_from_the_build_are_reported() {
        assert_eq!(
            resolver().resolve("Font/f3.ttf"),
            Err(LoadError::MissingBundle("Font_f3".into()))
        );
        assert!(resolver().dependencies_of("Font_f3").is_err());
    }
}
