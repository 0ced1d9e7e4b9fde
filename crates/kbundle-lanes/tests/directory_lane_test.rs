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

use anyhow::Result;
use kbundle_core::bundle::{Manifest, PackDirType, PackagingRule, PackagingRuleSet, MANIFEST_FILE_NAME};
use kbundle_core::LoadError;
use kbundle_io::dependencies::StaticDependencies;
use kbundle_io::source::MemorySourceTree;
use kbundle_io::{build_bundles, BuildOptions};
use kbundle_lanes::bundle_lane::{BundleLoadingLane, DirectoryBundleLane};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn build_fixture(out: &Path) -> Result<Manifest> {
    let tree = MemorySourceTree::new()
        .with_file("UI/panel.prefab", "panel")
        .with_file("UI/button.prefab", "button")
        .with_file("Atlas/ui.png", "atlas pixels");
    let rules = PackagingRuleSet::new(vec![
        PackagingRule::new("UI", PackDirType::Single),
        PackagingRule::new("Atlas", PackDirType::Single),
    ])?;
    build_bundles(&tree, &StaticDependencies::new(), &BuildOptions::new(rules, out))?;
    Ok(Manifest::from_json(&fs::read(out.join(MANIFEST_FILE_NAME))?)?)
}

#[test]
fn test_sync_load_decodes_every_entry() -> Result<()> {
    let out = tempdir()?;
    let manifest = build_fixture(out.path())?;
    let mut lane = DirectoryBundleLane::new(out.path()).verified_against(&manifest);

    let ui = lane.load("UI")?;
    assert_eq!(ui.name(), "UI");
    assert_eq!(ui.asset_paths(), ["UI/button.prefab", "UI/panel.prefab"]);
    assert_eq!(ui.entry("UI/panel.prefab"), Some(&b"panel"[..]));
    Ok(())
}

#[test]
fn test_async_load_completes_through_polling() -> Result<()> {
    let out = tempdir()?;
    build_fixture(out.path())?;
    let mut lane = DirectoryBundleLane::new(out.path());

    let mut pending = lane.begin_load("Atlas");
    let deadline = Instant::now() + Duration::from_secs(10);
    let outcome = loop {
        if let Some(outcome) = pending.poll() {
            break outcome;
        }
        assert!(Instant::now() < deadline, "async load never completed");
        std::thread::sleep(Duration::from_millis(1));
    };
    assert_eq!(outcome?.entry("Atlas/ui.png"), Some(&b"atlas pixels"[..]));

    let waited = lane.begin_load("UI").wait()?;
    assert_eq!(waited.len(), 2);
    Ok(())
}

#[test]
fn test_missing_and_tampered_bundles_fail() -> Result<()> {
    let out = tempdir()?;
    let manifest = build_fixture(out.path())?;
    let mut lane = DirectoryBundleLane::new(out.path()).verified_against(&manifest);

    assert!(matches!(lane.load("Nope"), Err(LoadError::Io { .. })));
    assert!(matches!(lane.load("../UI"), Err(LoadError::Io { .. })));

    let mut bytes = fs::read(out.path().join("UI"))?;
    bytes.push(0);
    fs::write(out.path().join("UI"), bytes)?;
    match lane.begin_load("UI").wait() {
        Err(LoadError::Io { bundle, message }) => {
            assert_eq!(bundle, "UI");
            assert!(message.contains("does not match"), "{message}");
        }
        other => panic!("expected a hash mismatch, got {other:?}"),
    }
    Ok(())
}
