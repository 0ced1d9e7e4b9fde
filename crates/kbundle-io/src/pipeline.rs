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

//! The build entry point.
//!
//! [`build_bundles`] writes every bundle and the manifest into a staging
//! directory next to the output, and only moves them into place once the whole
//! set has been produced and checked. If any stage fails the staging
//! directory is removed and a previous output set is left as it was.

use crate::archive::{ArchiveCompiler, BundleCompiler};
use crate::config::PackagingConfig;
use crate::dependencies::DependencyResolver;
use crate::error::BuildError;
use crate::graph::build_dependency_graph;
use crate::grouping::group_assets;
use crate::manifest_writer::{ManifestWriter, OutputFile};
use crate::source::SourceTree;
use kbundle_core::bundle::{Manifest, PackagingRuleSet, MANIFEST_FILE_NAME, VERSION_FILE_NAME};
use kbundle_core::ConfigError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const STAGING_PREFIX: &str = ".kbundle-staging";

/// Everything a build needs besides its inputs.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// The packaging rules.
    pub rules: PackagingRuleSet,
    /// Directory the bundles are committed to.
    pub output_dir: PathBuf,
    /// Version prefix.
    pub base_version: String,
    /// Unix timestamp appended to the version. `None` uses the current time.
    pub timestamp: Option<u64>,
}

impl BuildOptions {
    /// Options with base version `1.0` and a wall-clock timestamp.
    pub fn new(rules: PackagingRuleSet, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules,
            output_dir: output_dir.into(),
            base_version: "1.0".to_string(),
            timestamp: None,
        }
    }

    /// Builds options from a loaded configuration file.
    pub fn from_config(config: &PackagingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: config.rule_set()?,
            output_dir: config.output_dir.clone(),
            base_version: config.base_version.clone(),
            timestamp: None,
        })
    }

    /// Sets the version prefix.
    pub fn with_base_version(mut self, base_version: impl Into<String>) -> Self {
        self.base_version = base_version.into();
        self
    }

    /// Pins the version timestamp, making the version reproducible.
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn resolved_timestamp(&self) -> u64 {
        self.timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default()
        })
    }
}

/// Summary of a committed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// The version string written to the manifest.
    pub version: String,
    /// Number of bundle files produced.
    pub bundle_count: usize,
    /// Number of assets packed across all bundles.
    pub asset_count: usize,
    /// Number of bundle-to-bundle dependency edges.
    pub edge_count: usize,
    /// Total size of the bundle files.
    pub bytes_written: u64,
    /// Where the manifest was committed.
    pub manifest_path: PathBuf,
}

/// Removes the staging directory unless it was emptied by a commit.
struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    fn create(output_dir: &Path) -> Result<Self, BuildError> {
        let path = output_dir.join(format!("{STAGING_PREFIX}-{}", std::process::id()));
        if path.exists() {
            fs::remove_dir_all(&path).map_err(|e| BuildError::io(&path, e))?;
        }
        fs::create_dir_all(&path).map_err(|e| BuildError::io(&path, e))?;
        Ok(Self { path })
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            log::warn!(
                "Failed to remove staging directory '{}': {e}",
                self.path.display()
            );
        }
    }
}

/// Runs a complete build of `tree` into `options.output_dir`.
///
/// Stages run in order: grouping, dependency graph, cycle check, bundle
/// compilation, hashing, manifest write. Nothing is staged before the cycle
/// check passes, and the output directory is only touched by the final commit.
pub fn build_bundles(
    tree: &dyn SourceTree,
    dependencies: &dyn DependencyResolver,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    build_bundles_with(tree, dependencies, &ArchiveCompiler, options)
}

/// [`build_bundles`] with a custom bundle compiler.
pub fn build_bundles_with(
    tree: &dyn SourceTree,
    dependencies: &dyn DependencyResolver,
    compiler: &dyn BundleCompiler,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    options.rules.validate()?;
    log::info!("Building bundles into '{}'", options.output_dir.display());

    let grouping = group_assets(&options.rules, tree)?;
    let graph = build_dependency_graph(&grouping, dependencies, tree)?;
    graph.check_acyclic().inspect_err(|cycle| {
        log::error!("Bundle dependency cycle: {cycle}");
    })?;
    let order = graph.compile_order()?;

    fs::create_dir_all(&options.output_dir).map_err(|e| BuildError::io(&options.output_dir, e))?;
    let staging = StagingDir::create(&options.output_dir)?;

    let mut outputs = Vec::with_capacity(order.len());
    let mut bytes_written = 0u64;
    for name in &order {
        let Some(descriptor) = grouping.bundle(name) else {
            continue;
        };
        let bytes = compiler.compile(descriptor, tree)?;
        let path = staging.path.join(name);
        fs::write(&path, &bytes).map_err(|e| BuildError::io(&path, e))?;
        log::debug!(
            "Compiled '{name}': {} assets, {} bytes",
            descriptor.source_asset_paths.len(),
            bytes.len()
        );
        bytes_written += bytes.len() as u64;
        outputs.push(OutputFile {
            file_name: name.clone(),
            path,
        });
    }

    let writer = ManifestWriter::new(&options.base_version, options.resolved_timestamp());
    let manifest = writer.build_manifest(&outputs, &graph, &options.rules)?;
    writer.write(&manifest, &staging.path)?;

    let manifest_path = commit(&staging, &options.output_dir, &manifest)?;
    drop(staging);

    let report = BuildReport {
        version: manifest.version.clone(),
        bundle_count: outputs.len(),
        asset_count: grouping.asset_count(),
        edge_count: graph.edge_count(),
        bytes_written,
        manifest_path,
    };
    log::info!(
        "Build {} committed: {} bundles, {} assets, {} edges, {} bytes",
        report.version,
        report.bundle_count,
        report.asset_count,
        report.edge_count,
        report.bytes_written
    );
    Ok(report)
}

/// Moves the staged set into `output_dir`.
///
/// The previous manifest is removed first so that a reader never pairs it
/// with half-replaced bundles, and the new manifest is moved last. Bundles the
/// previous manifest listed but the new one does not are deleted afterwards.
fn commit(staging: &StagingDir, output_dir: &Path, manifest: &Manifest) -> Result<PathBuf, BuildError> {
    let manifest_path = output_dir.join(MANIFEST_FILE_NAME);
    let stale = previous_bundles(&manifest_path);
    if manifest_path.exists() {
        fs::remove_file(&manifest_path).map_err(|e| BuildError::io(&manifest_path, e))?;
    }

    for file in &manifest.files {
        move_into(&staging.path, output_dir, &file.file_name)?;
    }
    move_into(&staging.path, output_dir, MANIFEST_FILE_NAME)?;
    move_into(&staging.path, output_dir, VERSION_FILE_NAME)?;

    let current: BTreeSet<&str> = manifest.bundle_names().collect();
    for name in stale.iter().filter(|name| !current.contains(name.as_str())) {
        let path = output_dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("Removed stale bundle '{name}'"),
            Err(e) => log::warn!("Failed to remove stale bundle '{}': {e}", path.display()),
        }
    }
    Ok(manifest_path)
}

fn move_into(from_dir: &Path, to_dir: &Path, file_name: &str) -> Result<(), BuildError> {
    let from = from_dir.join(file_name);
    let to = to_dir.join(file_name);
    fs::rename(&from, &to).map_err(|e| BuildError::io(&to, e))
}

/// Bundle names of the manifest currently at `manifest_path`, if it is readable.
fn previous_bundles(manifest_path: &Path) -> Vec<String> {
    fs::read(manifest_path)
        .ok()
        .and_then(|bytes| Manifest::from_json(&bytes).ok())
        .map(|manifest| manifest.bundle_names().map(str::to_string).collect())
        .unwrap_or_default()
}
