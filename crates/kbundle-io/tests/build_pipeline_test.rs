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
use kbundle_core::bundle::{
    Compression, Manifest, PackDirType, PackagingRule, PackagingRuleSet, MANIFEST_FILE_NAME,
    VERSION_FILE_NAME,
};
use kbundle_core::vfs::BundleNameResolver;
use kbundle_io::archive::{decode_bundle, BundleCompiler};
use kbundle_io::dependencies::SidecarDependencies;
use kbundle_io::grouping::{group_assets, BundleDescriptor};
use kbundle_io::source::{DirectorySourceTree, SourceTree};
use kbundle_io::{build_bundles, build_bundles_with, BuildError, BuildOptions};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, logical: &str, bytes: &[u8]) -> Result<()> {
    let path = root.join(logical);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, bytes).with_context(|| format!("writing fixture '{logical}'"))
}

fn read_manifest(out: &Path) -> Result<Manifest> {
    let bytes = fs::read(out.join(MANIFEST_FILE_NAME))?;
    Ok(Manifest::from_json(&bytes)?)
}

#[test]
fn test_build_groups_files_and_records_edges() -> Result<()> {
    let assets = tempdir()?;
    let out = tempdir()?;
    write(assets.path(), "UI/a.png", b"a")?;
    write(assets.path(), "UI/b.png", b"b")?;
    write(assets.path(), "UI/a.png.meta", b"dependencies = [\"Font/f1.ttf\"]\n")?;
    write(assets.path(), "Font/f1.ttf", b"font one")?;
    write(assets.path(), "Font/f2.ttf", b"font two")?;

    let rules = PackagingRuleSet::new(vec![
        PackagingRule::new("UI", PackDirType::Single),
        PackagingRule::new("Font", PackDirType::File).with_compression(Compression::None),
    ])?;
    let options = BuildOptions::new(rules, out.path())
        .with_base_version("3.0")
        .with_timestamp(1_700_000_000);

    let report = build_bundles(
        &DirectorySourceTree::new(assets.path()),
        &SidecarDependencies,
        &options,
    )?;

    assert_eq!(report.version, "3.0.1700000000");
    assert_eq!(report.bundle_count, 3);
    assert_eq!(report.asset_count, 4);
    assert_eq!(report.edge_count, 1);
    assert_eq!(fs::read_to_string(out.path().join(VERSION_FILE_NAME))?, report.version);

    let manifest = read_manifest(out.path())?;
    let names: Vec<&str> = manifest.bundle_names().collect();
    assert_eq!(names, ["Font_f1", "Font_f2", "UI"]);
    assert_eq!(manifest.dependencies_of("UI"), ["Font_f1".to_string()]);
    assert!(manifest.dependencies_of("Font_f2").is_empty());

    for file in &manifest.files {
        let bytes = fs::read(out.path().join(&file.file_name))?;
        assert_eq!(file.content_hash, blake3::hash(&bytes).to_hex().to_string());
    }

    let ui = decode_bundle(&fs::read(out.path().join("UI"))?)?;
    assert_eq!(ui.asset_paths(), ["UI/a.png", "UI/b.png"]);
    assert_eq!(ui.entry("UI/a.png"), Some(&b"a"[..]));
    Ok(())
}

#[test]
fn test_cycle_leaves_previous_output_untouched() -> Result<()> {
    let assets = tempdir()?;
    let out = tempdir()?;
    write(assets.path(), "UI/panel.prefab", b"panel")?;
    write(assets.path(), "Atlas/ui.png", b"atlas")?;

    let rules = PackagingRuleSet::new(vec![
        PackagingRule::new("UI", PackDirType::Single),
        PackagingRule::new("Atlas", PackDirType::Single),
    ])?;
    let tree = DirectorySourceTree::new(assets.path());
    build_bundles(
        &tree,
        &SidecarDependencies,
        &BuildOptions::new(rules.clone(), out.path()).with_timestamp(1),
    )?;
    let before = fs::read(out.path().join(MANIFEST_FILE_NAME))?;

    write(assets.path(), "UI/panel.prefab.meta", b"dependencies = [\"Atlas/ui.png\"]")?;
    write(assets.path(), "Atlas/ui.png.meta", b"dependencies = [\"UI/panel.prefab\"]")?;
    let err = build_bundles(
        &tree,
        &SidecarDependencies,
        &BuildOptions::new(rules, out.path()).with_timestamp(2),
    )
    .unwrap_err();

    match err {
        BuildError::Cycle(cycle) => {
            assert!(cycle.path.contains(&"UI".to_string()));
            assert!(cycle.path.contains(&"Atlas".to_string()));
        }
        other => panic!("expected a cycle error, got {other}"),
    }
    assert_eq!(fs::read(out.path().join(MANIFEST_FILE_NAME))?, before);
    assert_eq!(fs::read_to_string(out.path().join(VERSION_FILE_NAME))?, "1.0.1");
    Ok(())
}

#[test]
fn test_invalid_names_are_reported_together_and_nothing_is_written() -> Result<()> {
    let assets = tempdir()?;
    let out = tempdir()?;
    write(assets.path(), "UI/good.png", b"ok")?;
    write(assets.path(), "UI/bad name.png", b"space")?;
    write(assets.path(), "UI/worse#name.png", b"hash")?;

    let rules = PackagingRuleSet::new(vec![PackagingRule::new("UI", PackDirType::Single)])?;
    let err = build_bundles(
        &DirectorySourceTree::new(assets.path()),
        &SidecarDependencies,
        &BuildOptions::new(rules, out.path()),
    )
    .unwrap_err();

    match err {
        BuildError::InvalidAssetNames(issues) => {
            let paths: Vec<&str> = issues.iter().map(|issue| issue.path.as_str()).collect();
            assert_eq!(paths, ["UI/bad name.png", "UI/worse#name.png"]);
        }
        other => panic!("expected invalid asset names, got {other}"),
    }
    assert!(!out.path().join(MANIFEST_FILE_NAME).exists());
    Ok(())
}

#[test]
fn test_resolver_agrees_with_grouper_for_every_asset() -> Result<()> {
    let assets = tempdir()?;
    let out = tempdir()?;
    for logical in [
        "UI/panel.prefab",
        "UI/Icons/close.png",
        "UI/Icons/open.png",
        "Maps/forest/terrain.bin",
        "Maps/forest/props/tree.mesh",
        "Maps/desert/terrain.bin",
        "Audio/theme.ogg",
    ] {
        write(assets.path(), logical, logical.as_bytes())?;
    }

    let rules = PackagingRuleSet::new(vec![
        PackagingRule::new("UI", PackDirType::Single),
        PackagingRule::new("UI/Icons", PackDirType::File),
        PackagingRule::new("Maps", PackDirType::SubSingle),
        PackagingRule::new("Audio", PackDirType::Single).content_addressed(true),
    ])?;
    let tree = DirectorySourceTree::new(assets.path());
    build_bundles(&tree, &SidecarDependencies, &BuildOptions::new(rules.clone(), out.path()))?;

    let resolver = BundleNameResolver::from_json(&fs::read(out.path().join(MANIFEST_FILE_NAME))?)?;
    let grouping = group_assets(&rules, &tree)?;
    assert_eq!(grouping.asset_count(), 7);
    for (asset, bundle) in grouping.assignments() {
        assert_eq!(&resolver.resolve(asset)?, bundle, "asset '{asset}'");
    }

    assert_eq!(resolver.resolve("UI/Icons/close.png")?, "UI_Icons_close");
    assert_eq!(resolver.resolve("Maps/forest/props/tree.mesh")?, "Maps_forest");
    assert_eq!(resolver.resolve("Audio/theme.ogg")?.len(), 32);
    Ok(())
}

/// Emits the same bytes for every bundle, as a broken compiler might.
struct ConstantCompiler;

impl BundleCompiler for ConstantCompiler {
    fn compile(&self, _: &BundleDescriptor, _: &dyn SourceTree) -> Result<Vec<u8>, BuildError> {
        Ok(b"identical".to_vec())
    }
}

#[test]
fn test_hash_collision_fails_without_writing_a_manifest() -> Result<()> {
    let assets = tempdir()?;
    let out = tempdir()?;
    write(assets.path(), "Font/f1.ttf", b"one")?;
    write(assets.path(), "Font/f2.ttf", b"two")?;

    let rules = PackagingRuleSet::new(vec![PackagingRule::new("Font", PackDirType::File)])?;
    let err = build_bundles_with(
        &DirectorySourceTree::new(assets.path()),
        &SidecarDependencies,
        &ConstantCompiler,
        &BuildOptions::new(rules, out.path()),
    )
    .unwrap_err();

    match err {
        BuildError::NameCollision { first, second, .. } => {
            assert_eq!((first.as_str(), second.as_str()), ("Font_f1", "Font_f2"));
        }
        other => panic!("expected a name collision, got {other}"),
    }
    assert!(!out.path().join(MANIFEST_FILE_NAME).exists());
    assert_eq!(fs::read_dir(out.path())?.count(), 0);
    Ok(())
}
