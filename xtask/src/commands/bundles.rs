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


use anyhow::{Context, Result};
use clap::Subcommand;
use kbundle_core::bundle::MANIFEST_FILE_NAME;
use kbundle_core::vfs::BundleNameResolver;
use kbundle_io::archive::decode_bundle;
use kbundle_io::config::{PackagingConfig, DEFAULT_CONFIG_FILE};
use kbundle_io::dependencies::SidecarDependencies;
use kbundle_io::graph::build_dependency_graph;
use kbundle_io::grouping::group_assets;
use kbundle_io::source::DirectorySourceTree;
use kbundle_io::{build_bundles, BuildOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::helpers::*;

#[derive(Subcommand)]
pub enum BundleCommands {
    /// Pack the asset tree into bundles and commit a new manifest
    Build {
        /// Packaging configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Pin the version timestamp (unix seconds) for a reproducible build
        #[arg(long)]
        timestamp: Option<u64>,

        /// Override the configured base version
        #[arg(long)]
        base_version: Option<String>,
    },

    /// Show how the asset tree would be grouped, without writing anything
    Plan {
        /// Packaging configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Print the bundle that serves a logical asset path
    Resolve {
        /// Logical asset path, e.g. "UI/a.png"
        path: String,

        /// Manifest to resolve against. Defaults to the configured output
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Packaging configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// List the bundles, hashes and dependency edges of a committed build
    Inspect {
        /// Manifest to inspect. Defaults to the configured output
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Packaging configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Also decode every bundle and list its entries
        #[arg(long)]
        entries: bool,
    },
}

pub fn run(command: BundleCommands) -> Result<()> {
    match command {
        BundleCommands::Build {
            config,
            timestamp,
            base_version,
        } => build(&config, timestamp, base_version),
        BundleCommands::Plan { config } => plan(&config),
        BundleCommands::Resolve {
            path,
            manifest,
            config,
        } => resolve(&path, manifest, &config),
        BundleCommands::Inspect {
            manifest,
            config,
            entries,
        } => inspect(manifest, &config, entries),
    }
}

/// Loads the configuration and resolves its directories against the
/// directory that holds it.
fn load_config(path: &Path) -> Result<PackagingConfig> {
    let config = PackagingConfig::load(path)
        .with_context(|| format!("Failed to load packaging configuration '{}'", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.rooted_at(base))
}

fn build(config_path: &Path, timestamp: Option<u64>, base_version: Option<String>) -> Result<()> {
    print_task_start("Building Asset Bundles", PACKAGE, BLUE);
    let config = load_config(config_path)?;

    let mut options = BuildOptions::from_config(&config).context("Invalid packaging rules")?;
    if let Some(base_version) = base_version {
        options = options.with_base_version(base_version);
    }
    if let Some(timestamp) = timestamp {
        options = options.with_timestamp(timestamp);
    }

    print_info(&format!(
        "Packing '{}' into '{}' with {} rule(s)",
        config.assets_root.display(),
        options.output_dir.display(),
        options.rules.len()
    ));

    let start_time = Instant::now();
    let tree = DirectorySourceTree::new(&config.assets_root);
    let report = build_bundles(&tree, &SidecarDependencies, &options).context("Bundle build failed")?;

    print_success(&format!(
        "Built version {} in {:.2}s",
        report.version,
        start_time.elapsed().as_secs_f64()
    ));
    println!(
        "  {} bundle(s), {} asset(s), {} dependency edge(s), {:.2} KB",
        report.bundle_count,
        report.asset_count,
        report.edge_count,
        report.bytes_written as f64 / 1024.0
    );
    println!("  manifest: {}", report.manifest_path.display());
    Ok(())
}

fn plan(config_path: &Path) -> Result<()> {
    print_task_start("Planning Asset Bundles", MAGNIFIER, CYAN);
    let config = load_config(config_path)?;
    let rules = config.rule_set().context("Invalid packaging rules")?;

    let tree = DirectorySourceTree::new(&config.assets_root);
    let grouping = group_assets(&rules, &tree).context("Grouping failed")?;
    let graph = build_dependency_graph(&grouping, &SidecarDependencies, &tree)
        .context("Dependency scan failed")?;
    let order = graph.compile_order().context("Dependency check failed")?;

    for name in &order {
        let Some(bundle) = grouping.bundle(name) else {
            continue;
        };
        println!(
            "{}{}{}{} ({} asset(s), {:?})",
            BOLD, YELLOW, bundle.name, RESET,
            bundle.source_asset_paths.len(),
            bundle.compression
        );
        for path in &bundle.source_asset_paths {
            println!("    {path}");
        }
        if let Some(dependencies) = graph.dependencies_of(name) {
            for dependency in dependencies {
                println!("    -> {dependency}");
            }
        }
    }

    print_success(&format!(
        "{} asset(s) would be packed into {} bundle(s)",
        grouping.asset_count(),
        grouping.bundle_count()
    ));
    Ok(())
}

fn open_resolver(manifest: Option<PathBuf>, config_path: &Path) -> Result<BundleNameResolver> {
    let manifest_path = match manifest {
        Some(path) => path,
        None => load_config(config_path)?.output_dir.join(MANIFEST_FILE_NAME),
    };
    let bytes = fs::read(&manifest_path)
        .with_context(|| format!("Failed to read manifest '{}'", manifest_path.display()))?;
    BundleNameResolver::from_json(&bytes)
        .with_context(|| format!("Invalid manifest '{}'", manifest_path.display()))
}

fn resolve(path: &str, manifest: Option<PathBuf>, config_path: &Path) -> Result<()> {
    let resolver = open_resolver(manifest, config_path)?;
    let bundle = resolver
        .resolve(path)
        .with_context(|| format!("Failed to resolve '{path}'"))?;

    println!("{}{}{}{}", BOLD, GREEN, bundle, RESET);
    for dependency in resolver.transitive_dependencies(&bundle)? {
        println!("  requires {dependency}");
    }
    Ok(())
}

fn inspect(manifest: Option<PathBuf>, config_path: &Path, entries: bool) -> Result<()> {
    print_task_start("Inspecting Manifest", MAGNIFIER, CYAN);
    let bundle_dir = match &manifest {
        Some(path) => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        None => load_config(config_path)?.output_dir,
    };
    let resolver = open_resolver(manifest, config_path)?;
    let manifest = resolver.manifest();

    println!("{}Version:{} {}", BOLD, RESET, manifest.version);
    for file in &manifest.files {
        println!(
            "  {}{}{} {}",
            BOLD, file.file_name, RESET, file.content_hash
        );
        for dependency in manifest.dependencies_of(&file.file_name) {
            println!("    -> {dependency}");
        }
        if entries {
            let path = bundle_dir.join(&file.file_name);
            let bytes = fs::read(&path)
                .with_context(|| format!("Failed to read bundle '{}'", path.display()))?;
            let bundle = decode_bundle(&bytes)
                .with_context(|| format!("Failed to decode bundle '{}'", path.display()))?;
            for asset in bundle.asset_paths() {
                println!("      {asset}");
            }
        }
    }

    print_success(&format!(
        "{} bundle(s), {} rule(s)",
        manifest.files.len(),
        manifest.config.len()
    ));
    Ok(())
}
