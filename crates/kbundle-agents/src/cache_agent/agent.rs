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

//! The `LoadCache` type, its construction, and the cooperative update cycle.

use super::asset::AssetSlot;
use super::bundle::BundleSlot;
use super::config::CacheConfig;
use super::decoder::DecoderRegistry;
use kbundle_core::asset::Asset;
use kbundle_core::event::{CacheEvent, CacheEventBus};
use kbundle_core::vfs::BundleNameResolver;
use kbundle_core::LoadError;
use kbundle_lanes::asset_lane::AssetLoaderLane;
use kbundle_lanes::bundle_lane::BundleLoadingLane;
use std::collections::HashMap;
use std::time::Instant;

/// Reference-counted cache of loaded bundles and decoded assets.
///
/// One cache serves one session: create it once the manifest is available,
/// call [`update`](Self::update) once per frame or tick, and drop or
/// [`clear`](Self::clear) it when the session ends. Pending callbacks are
/// failed with [`LoadError::SessionEnded`] at that point, so every callback
/// runs exactly once.
///
/// Every successful acquisition takes one reference, which the caller must
/// give back with the matching release method.
pub struct LoadCache {
    pub(super) resolver: BundleNameResolver,
    pub(super) lane: Box<dyn BundleLoadingLane>,
    pub(super) decoders: DecoderRegistry,
    pub(super) bundles: HashMap<String, BundleSlot>,
    pub(super) assets: HashMap<String, AssetSlot>,
    pub(super) events: CacheEventBus,
    pub(super) config: CacheConfig,
}

impl LoadCache {
    /// Creates a cache with the default configuration (no eviction).
    pub fn new(resolver: BundleNameResolver, lane: impl BundleLoadingLane + 'static) -> Self {
        Self::with_config(resolver, lane, CacheConfig::default())
    }

    /// Creates a cache with an explicit configuration.
    pub fn with_config(
        resolver: BundleNameResolver,
        lane: impl BundleLoadingLane + 'static,
        config: CacheConfig,
    ) -> Self {
        log::info!(
            "Load cache created for manifest {} ({} bundles)",
            resolver.version(),
            resolver.manifest().files.len()
        );
        Self {
            resolver,
            lane: Box::new(lane),
            decoders: DecoderRegistry::default(),
            bundles: HashMap::new(),
            assets: HashMap::new(),
            events: CacheEventBus::new(),
            config,
        }
    }

    /// Registers the decoder for assets whose logical path ends in `extension`.
    ///
    /// Every acquisition of such an asset returns the one shared decoded value.
    pub fn register_loader<A: Asset>(&mut self, extension: &str, loader: impl AssetLoaderLane<A> + 'static) {
        self.decoders.register::<A>(extension, loader);
    }

    /// Registers the decoder for an instantiable asset type.
    ///
    /// Every acquisition returns a fresh copy tagged with its logical path.
    pub fn register_instantiable_loader<A: Asset + Clone>(
        &mut self,
        extension: &str,
        loader: impl AssetLoaderLane<A> + 'static,
    ) {
        self.decoders.register_instantiable::<A>(extension, loader);
    }

    /// Advances all asynchronous work by one step.
    ///
    /// In order: completed bundle loads are collected and their callbacks
    /// fired, bundles whose dependencies are now loaded issue their own load,
    /// assets whose bundle is now loaded are decoded, and finally the reaper
    /// runs if a grace period is configured.
    ///
    /// Returns the number of bundle loads that completed during this call.
    pub fn update(&mut self) -> usize {
        let completed = self.poll_in_flight();
        self.advance_waiting_bundles();
        self.advance_waiting_assets();

        if self.config.reap_grace.is_some() {
            self.reap_unreferenced(Instant::now());
        }
        completed
    }

    /// Fails every pending request with [`LoadError::SessionEnded`] and drops
    /// all handles.
    pub fn clear(&mut self) {
        let assets = std::mem::take(&mut self.assets);
        let bundles = std::mem::take(&mut self.bundles);
        let mut abandoned = 0;

        for (path, slot) in assets {
            for callback in slot.callbacks {
                abandoned += 1;
                callback(Err(LoadError::SessionEnded(path.clone())));
            }
        }
        for (name, slot) in bundles {
            for callback in slot.callbacks {
                abandoned += 1;
                callback(Err(LoadError::SessionEnded(name.clone())));
            }
        }

        if abandoned > 0 {
            log::info!("Load cache cleared, {abandoned} pending request(s) abandoned");
        } else {
            log::debug!("Load cache cleared");
        }
    }

    /// A receiver for the [`CacheEvent`]s published from now on.
    ///
    /// Every subscriber gets its own copy of each event. Events published
    /// while nobody is subscribed are not kept.
    pub fn subscribe(&mut self) -> flume::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// The resolver the cache maps logical paths with.
    pub fn resolver(&self) -> &BundleNameResolver {
        &self.resolver
    }

    /// The active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl Drop for LoadCache {
    fn drop(&mut self) {
        self.clear();
    }
}
