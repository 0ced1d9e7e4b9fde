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

//! Eviction of handles that have stayed unreferenced past the grace period.

use super::agent::LoadCache;
use super::asset::AssetPhase;
use super::bundle::BundlePhase;
use kbundle_core::event::CacheEvent;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// What one reaper pass unloaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapSummary {
    /// Decoded assets dropped.
    pub assets: usize,
    /// Bundles unloaded.
    pub bundles: usize,
}

impl LoadCache {
    /// Unloads every handle that has been unreferenced for at least the
    /// configured grace period as of `now` (immediately if none is configured).
    ///
    /// Assets go first. A bundle is then unloaded only if no bundle that is
    /// loading or still held depends on it, and no asset is waiting on it.
    pub fn reap_unreferenced(&mut self, now: Instant) -> ReapSummary {
        let grace = self.config.reap_grace.unwrap_or(Duration::ZERO);
        let mut summary = ReapSummary::default();

        let idle_assets: Vec<String> = self
            .assets
            .iter()
            .filter(|(_, slot)| {
                matches!(slot.phase, AssetPhase::Loaded(_))
                    && slot.callbacks.is_empty()
                    && slot.refs.is_idle_for(grace, now)
            })
            .map(|(path, _)| path.clone())
            .collect();
        for path in idle_assets {
            self.assets.remove(&path);
            log::debug!("Reaped asset '{path}'");
            self.events.publish(CacheEvent::AssetUnloaded(path));
            summary.assets += 1;
        }

        let protected = self.protected_bundles(grace, now);
        let idle_bundles: Vec<String> = self
            .bundles
            .iter()
            .filter(|(name, slot)| {
                matches!(slot.phase, BundlePhase::Loaded(_))
                    && slot.refs.is_idle_for(grace, now)
                    && !protected.contains(name.as_str())
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in idle_bundles {
            self.bundles.remove(&name);
            log::debug!("Reaped bundle '{name}'");
            self.events.publish(CacheEvent::BundleUnloaded(name));
            summary.bundles += 1;
        }

        if summary != ReapSummary::default() {
            log::info!(
                "Reaper unloaded {} asset(s) and {} bundle(s)",
                summary.assets,
                summary.bundles
            );
        }
        summary
    }

    /// Bundles that must stay resident: the transitive dependencies of every
    /// bundle that is loading or held, and the bundles loading assets wait on.
    fn protected_bundles(&self, grace: Duration, now: Instant) -> HashSet<String> {
        let mut roots: Vec<&str> = Vec::new();
        for (name, slot) in &self.bundles {
            let holds_dependencies = match slot.phase {
                BundlePhase::Unrequested => false,
                BundlePhase::Loaded(_) => !slot.refs.is_idle_for(grace, now),
                _ => true,
            };
            if holds_dependencies {
                roots.push(name);
            }
        }

        let mut protected: HashSet<String> = self
            .assets
            .values()
            .filter(|slot| slot.is_loading())
            .map(|slot| slot.bundle.clone())
            .collect();
        let waited_on: Vec<String> = protected.iter().cloned().collect();
        for root in roots.into_iter().chain(waited_on.iter().map(String::as_str)) {
            protected.extend(self.resolver.transitive_dependencies(root).unwrap_or_default());
        }
        protected
    }
}
