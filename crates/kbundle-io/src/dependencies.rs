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

//! Asset-dependency introspection: which other assets an asset references.
//!
//! The concrete source of truth is a TOML sidecar next to the asset,
//! `<asset>.meta`, listing logical paths:
//!
//! ```toml
//! dependencies = ["Atlas/ui.png", "Font/f1.ttf"]
//! ```

use crate::error::BuildError;
use crate::grouping::SIDECAR_EXTENSION;
use crate::source::SourceTree;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Resolves the set of assets an asset references.
pub trait DependencyResolver {
    /// The logical paths referenced by `asset_path`.
    fn references(&self, asset_path: &str, tree: &dyn SourceTree) -> Result<Vec<String>, BuildError>;
}

#[derive(Debug, Default, Deserialize)]
struct AssetSidecar {
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Reads references from `<asset>.meta` sidecars. Assets without a sidecar
/// reference nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarDependencies;

impl SidecarDependencies {
    /// The sidecar path for an asset.
    pub fn sidecar_path(asset_path: &str) -> String {
        format!("{asset_path}.{SIDECAR_EXTENSION}")
    }
}

impl DependencyResolver for SidecarDependencies {
    fn references(&self, asset_path: &str, tree: &dyn SourceTree) -> Result<Vec<String>, BuildError> {
        let sidecar = Self::sidecar_path(asset_path);
        if !tree.contains(&sidecar) {
            return Ok(Vec::new());
        }

        let bytes = tree.read(&sidecar)?;
        let text = String::from_utf8(bytes).map_err(|e| BuildError::Sidecar {
            path: sidecar.clone(),
            message: e.to_string(),
        })?;
        let parsed: AssetSidecar = toml::from_str(&text).map_err(|e| BuildError::Sidecar {
            path: sidecar.clone(),
            message: e.to_string(),
        })?;
        Ok(parsed.dependencies)
    }
}

/// A fixed reference table, for tools that already know the asset graph.
#[derive(Debug, Clone, Default)]
pub struct StaticDependencies {
    references: BTreeMap<String, Vec<String>>,
}

impl StaticDependencies {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `asset` references `referenced`.
    pub fn with_reference(mut self, asset: impl Into<String>, referenced: impl Into<String>) -> Self {
        self.references
            .entry(asset.into())
            .or_default()
            .push(referenced.into());
        self
    }
}

impl DependencyResolver for StaticDependencies {
    fn references(&self, asset_path: &str, _tree: &dyn SourceTree) -> Result<Vec<String>, BuildError> {
        Ok(self.references.get(asset_path).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySourceTree;

    #[test]
    fn sidecar_lists_references() {
        let tree = MemorySourceTree::new()
            .with_file("UI/panel.prefab", "p")
            .with_file(
                "UI/panel.prefab.meta",
                r#"dependencies = ["Atlas/ui.png", "Font/f1.ttf"]"#,
            );
        let refs = SidecarDependencies.references("UI/panel.prefab", &tree).unwrap();
        assert_eq!(refs, vec!["Atlas/ui.png", "Font/f1.ttf"]);
    }

    #[test]
    fn missing_sidecar_means_no_references() {
        let tree = MemorySourceTree::new().with_file("UI/a.png", "a");
        assert!(SidecarDependencies.references("UI/a.png", &tree).unwrap().is_empty());
    }

    #[test]
    fn malformed_sidecar_is_an_error() {
        let tree = MemorySourceTree::new().with_file("UI/a.png.meta", "dependencies = [");
        assert!(matches!(
            SidecarDependencies.references("UI/a.png", &tree),
            Err(BuildError::Sidecar { .. })
        ));
    }
}
