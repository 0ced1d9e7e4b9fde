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

//! Content hashing and manifest serialization.

use crate::error::BuildError;
use crate::graph::DependencyGraph;
use kbundle_core::bundle::{
    Manifest, ManifestFile, PackagingRuleSet, MANIFEST_FILE_NAME, VERSION_FILE_NAME,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A physical file produced by bundle compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// The name the file is published under (the bundle name).
    pub file_name: String,
    /// Where the file currently lives.
    pub path: PathBuf,
}

/// Hex BLAKE3 digest of a file's contents.
pub fn hash_file(path: &Path) -> Result<String, BuildError> {
    let bytes = fs::read(path).map_err(|e| BuildError::io(path, e))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Hashes every output and rejects the set if two distinct files share a digest.
pub fn hash_outputs(outputs: &[OutputFile]) -> Result<Vec<ManifestFile>, BuildError> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(outputs.len());
    let mut files = Vec::with_capacity(outputs.len());

    for output in outputs {
        let hash = hash_file(&output.path)?;
        if let Some(first) = seen.get(&hash) {
            if *first != output.file_name {
                return Err(BuildError::NameCollision {
                    hash,
                    first: first.to_string(),
                    second: output.file_name.clone(),
                });
            }
        }
        seen.insert(hash.clone(), output.file_name.as_str());
        files.push(ManifestFile {
            file_name: output.file_name.clone(),
            content_hash: hash,
        });
    }

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

/// Writes `manifest.json` and the plain `version.txt` marker.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    base_version: String,
    timestamp: u64,
}

impl ManifestWriter {
    /// Creates a writer stamping `{base_version}.{timestamp}`.
    pub fn new(base_version: impl Into<String>, timestamp: u64) -> Self {
        Self {
            base_version: base_version.into(),
            timestamp,
        }
    }

    /// The full version string.
    pub fn version(&self) -> String {
        format!("{}.{}", self.base_version, self.timestamp)
    }

    /// Hashes the outputs and assembles a validated manifest.
    pub fn build_manifest(
        &self,
        outputs: &[OutputFile],
        graph: &DependencyGraph,
        rules: &PackagingRuleSet,
    ) -> Result<Manifest, BuildError> {
        let manifest = Manifest {
            version: self.version(),
            files: hash_outputs(outputs)?,
            dependency_edges: graph.to_manifest_edges(),
            config: rules.clone(),
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Writes the manifest and version marker into `dir`, returning both paths.
    pub fn write(&self, manifest: &Manifest, dir: &Path) -> Result<[PathBuf; 2], BuildError> {
        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        let json = manifest.to_json().map_err(|e| BuildError::Encode {
            bundle: MANIFEST_FILE_NAME.to_string(),
            message: e.to_string(),
        })?;
        fs::write(&manifest_path, json).map_err(|e| BuildError::io(&manifest_path, e))?;

        let version_path = dir.join(VERSION_FILE_NAME);
        fs::write(&version_path, &manifest.version).map_err(|e| BuildError::io(&version_path, e))?;

        log::debug!(
            "Wrote manifest {} ({} files) to '{}'",
            manifest.version,
            manifest.files.len(),
            dir.display()
        );
        Ok([manifest_path, version_path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbundle_core::bundle::{PackDirType, PackagingRule};
    use std::collections::{BTreeMap, BTreeSet};

    fn output(dir: &Path, name: &str, bytes: &[u8]) -> OutputFile {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        OutputFile {
            file_name: name.to_string(),
            path,
        }
    }

    #[test]
    fn identical_contents_under_different_names_collide() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = vec![
            output(dir.path(), "UI", b"same"),
            output(dir.path(), "Font_f1", b"different"),
            output(dir.path(), "Font_f2", b"same"),
        ];
        match hash_outputs(&outputs) {
            Err(BuildError::NameCollision { first, second, .. }) => {
                assert_eq!(first, "UI");
                assert_eq!(second, "Font_f2");
            }
            other => panic!("expected a collision, got {other:?}"),
        }
    }

    #[test]
    fn manifest_records_version_hashes_edges_and_rules() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = vec![
            output(dir.path(), "UI", b"ui"),
            output(dir.path(), "Atlas", b"atlas"),
        ];
        let graph = DependencyGraph::from_edges(BTreeMap::from([
            ("UI".to_string(), BTreeSet::from(["Atlas".to_string()])),
            ("Atlas".to_string(), BTreeSet::new()),
        ]));
        let rules = PackagingRuleSet::new(vec![
            PackagingRule::new("UI", PackDirType::Single),
            PackagingRule::new("Atlas", PackDirType::Single),
        ])
        .unwrap();

        let writer = ManifestWriter::new("2.1", 1_700_000_000);
        let manifest = writer.build_manifest(&outputs, &graph, &rules).unwrap();
        assert_eq!(manifest.version, "2.1.1700000000");
        assert_eq!(manifest.files[0].file_name, "Atlas");
        assert_eq!(manifest.files[0].content_hash, blake3::hash(b"atlas").to_hex().to_string());
        assert_eq!(manifest.dependencies_of("UI"), ["Atlas".to_string()]);

        let [manifest_path, version_path] = writer.write(&manifest, dir.path()).unwrap();
        let reloaded = Manifest::from_json(&fs::read(manifest_path).unwrap()).unwrap();
        assert_eq!(reloaded, manifest);
        assert_eq!(fs::read_to_string(version_path).unwrap(), "2.1.1700000000");
    }
}
