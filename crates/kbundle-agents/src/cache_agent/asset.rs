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

//! The asset state machine, layered on top of loaded bundles.

use super::agent::LoadCache;
use super::decoder::StoredAsset;
use super::refcount::{RefCount, Release};
use kbundle_core::asset::{Acquired, Asset, AssetHandle, Instance, InstanceTag};
use kbundle_core::bundle::LoadedBundle;
use kbundle_core::event::CacheEvent;
use kbundle_core::LoadError;
use std::sync::Arc;
use std::time::Instant;

/// Delivers a decoded value to a typed callback; returns `true` if the
/// callback received an acquisition, which then needs a reference.
pub(super) type AssetCallback = Box<dyn FnOnce(Result<StoredAsset, LoadError>) -> bool + Send>;

/// The load state of an asset, as observed from outside the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    /// Never requested, or the last load failed.
    Unrequested,
    /// A blocking load is running on the caller's stack.
    SyncLoading,
    /// Waiting for the owning bundle to finish an asynchronous load.
    AsyncLoading,
    /// Decoded and resident.
    Loaded,
}

#[derive(Default)]
pub(super) enum AssetPhase {
    #[default]
    Unrequested,
    SyncLoading,
    AwaitingBundle,
    Loaded(StoredAsset),
}

pub(super) struct AssetSlot {
    /// The bundle that owns the asset.
    pub(super) bundle: String,
    pub(super) phase: AssetPhase,
    pub(super) refs: RefCount,
    pub(super) callbacks: Vec<AssetCallback>,
}

impl AssetSlot {
    fn new(bundle: &str) -> Self {
        Self {
            bundle: bundle.to_string(),
            phase: AssetPhase::Unrequested,
            refs: RefCount::default(),
            callbacks: Vec::new(),
        }
    }

    pub(super) fn state(&self) -> AssetState {
        match self.phase {
            AssetPhase::Unrequested => AssetState::Unrequested,
            AssetPhase::SyncLoading => AssetState::SyncLoading,
            AssetPhase::AwaitingBundle => AssetState::AsyncLoading,
            AssetPhase::Loaded(_) => AssetState::Loaded,
        }
    }

    pub(super) fn is_loading(&self) -> bool {
        matches!(self.phase, AssetPhase::SyncLoading | AssetPhase::AwaitingBundle)
    }
}

/// Converts a stored value into what a caller asking for `A` receives.
fn deliver<A: Asset>(path: &str, stored: &StoredAsset) -> Result<Acquired<A>, LoadError> {
    if stored.is_instantiable() {
        if let Some(copy) = stored.instantiate::<A>(path)? {
            return Ok(Acquired::Instance(Instance::new(InstanceTag::new(path), copy)));
        }
    }
    Ok(Acquired::Shared(AssetHandle::from_arc(stored.shared::<A>(path)?)))
}

impl LoadCache {
    /// Loads an asset, blocking until its bundle (and that bundle's
    /// dependencies) are resident and the asset is decoded.
    ///
    /// Instantiable types yield a fresh [`Instance`]; other types yield the
    /// shared handle. Either way the caller holds one reference, released with
    /// [`release_reference`](Self::release_reference) or
    /// [`release_instance`](Self::release_instance). Failures are logged and
    /// yield `None`.
    pub fn get_asset<A: Asset>(&mut self, path: &str) -> Option<Acquired<A>> {
        let outcome = self.resolver.resolve(path).and_then(|bundle| {
            let stored = self.ensure_asset_sync(path, &bundle)?;
            self.acquire::<A>(path, &bundle, &stored)
        });
        match outcome {
            Ok(acquired) => Some(acquired),
            Err(e) => {
                log::error!("Failed to get asset '{path}': {e}");
                None
            }
        }
    }

    /// Requests an asset without blocking.
    ///
    /// `callback` runs exactly once, immediately if the asset is already
    /// decoded or its path resolves to no bundle, otherwise from a later
    /// [`update`](Self::update).
    pub fn get_asset_async<A, F>(&mut self, path: &str, callback: F)
    where
        A: Asset,
        F: FnOnce(Result<Acquired<A>, LoadError>) + Send + 'static,
    {
        let bundle = match self.resolver.resolve(path) {
            Ok(bundle) => bundle,
            Err(e) => {
                log::error!("Failed to get asset '{path}': {e}");
                callback(Err(e));
                return;
            }
        };

        let slot = self
            .assets
            .entry(path.to_string())
            .or_insert_with(|| AssetSlot::new(&bundle));
        if let AssetPhase::Loaded(stored) = &slot.phase {
            let stored = stored.clone();
            callback(self.acquire::<A>(path, &bundle, &stored));
            return;
        }

        let owned_path = path.to_string();
        slot.callbacks.push(Box::new(move |outcome: Result<StoredAsset, LoadError>| {
            match outcome.and_then(|stored| deliver::<A>(&owned_path, &stored)) {
                Ok(acquired) => {
                    callback(Ok(acquired));
                    true
                }
                Err(e) => {
                    callback(Err(e));
                    false
                }
            }
        }));

        if matches!(slot.phase, AssetPhase::Unrequested) {
            slot.phase = AssetPhase::AwaitingBundle;
            self.request_bundle_async(&bundle);
        }
    }

    /// Gives back one reference on an asset (and on its bundle chain).
    ///
    /// Releasing an asset whose count is already zero does nothing.
    pub fn release_reference(&mut self, path: &str) {
        let now = Instant::now();
        let Some(slot) = self.assets.get_mut(path) else {
            log::debug!("Ignoring release of unknown asset '{path}'");
            return;
        };
        match slot.refs.release(now) {
            Release::AlreadyZero => {
                log::debug!("Ignoring release of unreferenced asset '{path}'");
                return;
            }
            Release::BecameUnreferenced => {
                self.events.publish(CacheEvent::AssetUnreferenced(path.to_string()));
            }
            Release::Decremented => {}
        }
        let bundle = slot.bundle.clone();
        self.release_chain(&bundle);
    }

    /// Discards an instance, releasing the reference it was handed out with.
    pub fn release_instance<A: Asset>(&mut self, instance: Instance<A>) {
        let (tag, _value) = instance.into_parts();
        self.release_reference(tag.logical_path());
    }

    /// The current state of an asset.
    pub fn asset_state(&self, path: &str) -> AssetState {
        self.assets
            .get(path)
            .map_or(AssetState::Unrequested, AssetSlot::state)
    }

    /// The current reference count of an asset.
    pub fn asset_ref_count(&self, path: &str) -> usize {
        self.assets.get(path).map_or(0, |slot| slot.refs.count())
    }

    fn ensure_asset_sync(&mut self, path: &str, bundle: &str) -> Result<StoredAsset, LoadError> {
        let slot = self
            .assets
            .entry(path.to_string())
            .or_insert_with(|| AssetSlot::new(bundle));
        if let AssetPhase::Loaded(stored) = &slot.phase {
            return Ok(stored.clone());
        }
        // An async request may be pending; this call completes it.
        slot.phase = AssetPhase::SyncLoading;

        let outcome = self
            .ensure_bundle_sync(bundle)
            .and_then(|loaded| self.decode_entry(path, &loaded));
        match outcome {
            Ok(stored) => {
                self.complete_asset(path, stored.clone());
                Ok(stored)
            }
            Err(e) => {
                self.fail_asset(path, e.clone());
                Err(e)
            }
        }
    }

    fn decode_entry(&self, path: &str, bundle: &LoadedBundle) -> Result<StoredAsset, LoadError> {
        let bytes = bundle.entry(path).ok_or_else(|| LoadError::MissingAsset {
            path: path.to_string(),
            bundle: bundle.name().to_string(),
        })?;
        self.decoders.decode(path, bytes)
    }

    fn acquire<A: Asset>(
        &mut self,
        path: &str,
        bundle: &str,
        stored: &StoredAsset,
    ) -> Result<Acquired<A>, LoadError> {
        let acquired = deliver::<A>(path, stored)?;
        self.retain_asset(path, bundle);
        Ok(acquired)
    }

    fn retain_asset(&mut self, path: &str, bundle: &str) {
        if let Some(slot) = self.assets.get_mut(path) {
            slot.refs.retain();
        }
        self.retain_chain(bundle);
    }

    fn complete_asset(&mut self, path: &str, stored: StoredAsset) {
        let Some(slot) = self.assets.get_mut(path) else {
            return;
        };
        slot.phase = AssetPhase::Loaded(stored.clone());
        slot.refs.mark_loaded(Instant::now());
        let callbacks = std::mem::take(&mut slot.callbacks);
        let bundle = slot.bundle.clone();

        log::debug!("Decoded asset '{path}'");
        for callback in callbacks {
            if callback(Ok(stored.clone())) {
                self.retain_asset(path, &bundle);
            }
        }
    }

    fn fail_asset(&mut self, path: &str, error: LoadError) {
        let Some(slot) = self.assets.get_mut(path) else {
            return;
        };
        slot.phase = AssetPhase::Unrequested;
        let callbacks = std::mem::take(&mut slot.callbacks);

        log::warn!("Load of asset '{path}' failed: {error}");
        for callback in callbacks {
            callback(Err(error.clone()));
        }
    }

    /// Fails every asset waiting asynchronously on `bundle`.
    pub(super) fn fail_assets_waiting_on(&mut self, bundle: &str, error: &LoadError) {
        let mut waiting: Vec<String> = self
            .assets
            .iter()
            .filter(|(_, slot)| slot.bundle == bundle && matches!(slot.phase, AssetPhase::AwaitingBundle))
            .map(|(path, _)| path.clone())
            .collect();
        waiting.sort();
        for path in waiting {
            self.fail_asset(&path, error.clone());
        }
    }

    /// Decodes every waiting asset whose bundle has become resident.
    pub(super) fn advance_waiting_assets(&mut self) {
        let mut ready: Vec<(String, Arc<LoadedBundle>)> = self
            .assets
            .iter()
            .filter(|(_, slot)| matches!(slot.phase, AssetPhase::AwaitingBundle))
            .filter_map(|(path, slot)| {
                self.loaded_bundle(&slot.bundle)
                    .map(|bundle| (path.clone(), bundle))
            })
            .collect();
        ready.sort_by(|a, b| a.0.cmp(&b.0));

        for (path, bundle) in ready {
            match self.decode_entry(&path, &bundle) {
                Ok(stored) => self.complete_asset(&path, stored),
                Err(e) => self.fail_asset(&path, e),
            }
        }
    }
}
