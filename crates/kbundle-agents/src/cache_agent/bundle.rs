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

//! The bundle state machine.

use super::agent::LoadCache;
use super::refcount::{RefCount, Release};
use kbundle_core::bundle::LoadedBundle;
use kbundle_core::event::CacheEvent;
use kbundle_core::LoadError;
use kbundle_lanes::bundle_lane::PendingBundleLoad;
use std::sync::Arc;
use std::time::Instant;

pub(super) type BundleCallback = Box<dyn FnOnce(Result<Arc<LoadedBundle>, LoadError>) + Send>;

/// The load state of a bundle, as observed from outside the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleState {
    /// Never requested, or the last load failed.
    Unrequested,
    /// A blocking load is running on the caller's stack.
    SyncLoading,
    /// An asynchronous load is waiting on dependencies or on the lane.
    AsyncLoading,
    /// The bundle is resident.
    Loaded,
}

#[derive(Default)]
pub(super) enum BundlePhase {
    #[default]
    Unrequested,
    SyncLoading,
    /// Asynchronous; waiting for these direct dependencies before issuing its own load.
    AwaitingDependencies(Vec<String>),
    /// Asynchronous; the lane is reading the bundle.
    InFlight(Box<dyn PendingBundleLoad>),
    Loaded(Arc<LoadedBundle>),
}

#[derive(Default)]
pub(super) struct BundleSlot {
    pub(super) phase: BundlePhase,
    pub(super) refs: RefCount,
    /// Fired in insertion order when the load settles.
    pub(super) callbacks: Vec<BundleCallback>,
}

impl BundleSlot {
    pub(super) fn state(&self) -> BundleState {
        match self.phase {
            BundlePhase::Unrequested => BundleState::Unrequested,
            BundlePhase::SyncLoading => BundleState::SyncLoading,
            BundlePhase::AwaitingDependencies(_) | BundlePhase::InFlight(_) => BundleState::AsyncLoading,
            BundlePhase::Loaded(_) => BundleState::Loaded,
        }
    }

    pub(super) fn loaded(&self) -> Option<&Arc<LoadedBundle>> {
        match &self.phase {
            BundlePhase::Loaded(bundle) => Some(bundle),
            _ => None,
        }
    }
}

impl LoadCache {
    /// Loads a bundle and its dependencies, blocking until they are resident.
    ///
    /// If the bundle is already loading asynchronously, this waits for that
    /// load instead of starting another one. On success the caller holds one
    /// reference, released with [`release_bundle`](Self::release_bundle).
    /// Failures are logged and yield `None`.
    pub fn load_bundle_sync(&mut self, bundle: &str) -> Option<Arc<LoadedBundle>> {
        match self.ensure_bundle_sync(bundle) {
            Ok(loaded) => {
                self.retain_chain(bundle);
                Some(loaded)
            }
            Err(e) => {
                log::error!("Failed to load bundle '{bundle}': {e}");
                None
            }
        }
    }

    /// Requests a bundle without blocking.
    ///
    /// `callback` runs exactly once: immediately if the bundle is already
    /// resident or unknown, otherwise from a later [`update`](Self::update).
    /// Concurrent requests for the same bundle share one physical load and
    /// receive the same [`LoadedBundle`]. A successful callback holds one
    /// reference.
    pub fn load_bundle_async<F>(&mut self, bundle: &str, callback: F)
    where
        F: FnOnce(Result<Arc<LoadedBundle>, LoadError>) + Send + 'static,
    {
        if !self.resolver.contains_bundle(bundle) {
            let error = LoadError::MissingBundle(bundle.to_string());
            log::error!("Failed to load bundle '{bundle}': {error}");
            callback(Err(error));
            return;
        }
        if let Some(loaded) = self.loaded_bundle(bundle) {
            self.retain_chain(bundle);
            callback(Ok(loaded));
            return;
        }

        self.bundles
            .entry(bundle.to_string())
            .or_default()
            .callbacks
            .push(Box::new(callback));
        self.request_bundle_async(bundle);
    }

    /// Takes a reference on a bundle and its transitive dependencies,
    /// whatever their load state.
    ///
    /// Returns `false` if the manifest does not list the bundle.
    pub fn retain_bundle(&mut self, bundle: &str) -> bool {
        if !self.resolver.contains_bundle(bundle) {
            log::warn!("Cannot retain unknown bundle '{bundle}'");
            return false;
        }
        self.retain_chain(bundle);
        true
    }

    /// Gives back one reference on a bundle and its transitive dependencies.
    ///
    /// Releasing a bundle whose count is already zero does nothing.
    pub fn release_bundle(&mut self, bundle: &str) {
        self.release_chain(bundle);
    }

    /// The current state of a bundle.
    pub fn bundle_state(&self, bundle: &str) -> BundleState {
        self.bundles
            .get(bundle)
            .map_or(BundleState::Unrequested, BundleSlot::state)
    }

    /// The current reference count of a bundle.
    pub fn bundle_ref_count(&self, bundle: &str) -> usize {
        self.bundles.get(bundle).map_or(0, |slot| slot.refs.count())
    }

    /// The number of resident bundles.
    pub fn loaded_bundle_count(&self) -> usize {
        self.bundles.values().filter(|slot| slot.loaded().is_some()).count()
    }

    pub(super) fn loaded_bundle(&self, bundle: &str) -> Option<Arc<LoadedBundle>> {
        self.bundles.get(bundle).and_then(BundleSlot::loaded).cloned()
    }

    /// Loads `bundle` on the caller's stack, dependencies first. Takes no reference.
    pub(super) fn ensure_bundle_sync(&mut self, bundle: &str) -> Result<Arc<LoadedBundle>, LoadError> {
        if let Some(loaded) = self.loaded_bundle(bundle) {
            return Ok(loaded);
        }

        let dependencies = self.resolver.dependencies_of(bundle)?.to_vec();
        for dependency in &dependencies {
            if let Err(cause) = self.ensure_bundle_sync(dependency) {
                return Err(LoadError::DependencyFailed {
                    bundle: bundle.to_string(),
                    dependency: dependency.clone(),
                    cause: Box::new(cause),
                });
            }
        }

        let slot = self.bundles.entry(bundle.to_string()).or_default();
        let outcome = match std::mem::replace(&mut slot.phase, BundlePhase::SyncLoading) {
            BundlePhase::Loaded(loaded) => {
                slot.phase = BundlePhase::Loaded(Arc::clone(&loaded));
                return Ok(loaded);
            }
            BundlePhase::InFlight(pending) => {
                log::debug!("Blocking on the in-flight load of '{bundle}'");
                pending.wait()
            }
            BundlePhase::Unrequested | BundlePhase::SyncLoading | BundlePhase::AwaitingDependencies(_) => {
                log::debug!("Loading bundle '{bundle}' synchronously");
                self.lane.load(bundle)
            }
        };

        match outcome {
            Ok(loaded) => {
                let loaded = Arc::new(loaded);
                self.complete_bundle(bundle, Arc::clone(&loaded));
                Ok(loaded)
            }
            Err(e) => {
                self.fail_bundle(bundle, e.clone());
                Err(e)
            }
        }
    }

    /// Starts an asynchronous load of `bundle` and, first, of every dependency
    /// not yet requested. Does nothing if the bundle is already past `Unrequested`.
    pub(super) fn request_bundle_async(&mut self, bundle: &str) {
        let dependencies = match self.resolver.dependencies_of(bundle) {
            Ok(dependencies) => dependencies.to_vec(),
            Err(e) => {
                self.fail_bundle(bundle, e);
                return;
            }
        };

        let slot = self.bundles.entry(bundle.to_string()).or_default();
        if !matches!(slot.phase, BundlePhase::Unrequested) {
            return;
        }
        // Enter the waiting phase before recursing so a failing dependency
        // can find and fail this bundle.
        slot.phase = BundlePhase::AwaitingDependencies(dependencies.clone());

        for dependency in &dependencies {
            self.request_bundle_async(dependency);
        }
        self.try_issue_load(bundle);
    }

    /// Issues the lane load for a waiting bundle once all of its dependencies are loaded.
    fn try_issue_load(&mut self, bundle: &str) {
        let ready = match self.bundles.get(bundle).map(|slot| &slot.phase) {
            Some(BundlePhase::AwaitingDependencies(dependencies)) => dependencies
                .iter()
                .all(|dependency| self.loaded_bundle(dependency).is_some()),
            _ => false,
        };
        if !ready {
            return;
        }

        log::debug!("Issuing asynchronous load of '{bundle}'");
        let pending = self.lane.begin_load(bundle);
        if let Some(slot) = self.bundles.get_mut(bundle) {
            slot.phase = BundlePhase::InFlight(pending);
        }
    }

    pub(super) fn advance_waiting_bundles(&mut self) {
        let mut waiting: Vec<String> = self
            .bundles
            .iter()
            .filter(|(_, slot)| matches!(slot.phase, BundlePhase::AwaitingDependencies(_)))
            .map(|(name, _)| name.clone())
            .collect();
        waiting.sort();
        for bundle in waiting {
            self.try_issue_load(&bundle);
        }
    }

    /// Polls every in-flight load, settling those that finished.
    pub(super) fn poll_in_flight(&mut self) -> usize {
        let mut in_flight: Vec<String> = self
            .bundles
            .iter()
            .filter(|(_, slot)| matches!(slot.phase, BundlePhase::InFlight(_)))
            .map(|(name, _)| name.clone())
            .collect();
        in_flight.sort();

        let limit = self.config.max_completions_per_update.unwrap_or(usize::MAX);
        let mut completed = 0;
        for bundle in in_flight {
            if completed >= limit {
                break;
            }
            let outcome = match self.bundles.get_mut(&bundle).map(|slot| &mut slot.phase) {
                Some(BundlePhase::InFlight(pending)) => pending.poll(),
                _ => None,
            };
            let Some(outcome) = outcome else {
                continue;
            };

            completed += 1;
            match outcome {
                Ok(loaded) => self.complete_bundle(&bundle, Arc::new(loaded)),
                Err(e) => self.fail_bundle(&bundle, e),
            }
        }
        completed
    }

    /// Marks `bundle` resident and hands it to every queued callback.
    fn complete_bundle(&mut self, bundle: &str, loaded: Arc<LoadedBundle>) {
        let slot = self.bundles.entry(bundle.to_string()).or_default();
        slot.phase = BundlePhase::Loaded(Arc::clone(&loaded));
        slot.refs.mark_loaded(Instant::now());
        let callbacks = std::mem::take(&mut slot.callbacks);

        log::info!("Loaded bundle '{bundle}' ({} assets)", loaded.len());
        self.events.publish(CacheEvent::BundleLoaded(bundle.to_string()));

        for callback in callbacks {
            self.retain_chain(bundle);
            callback(Ok(Arc::clone(&loaded)));
        }
    }

    /// Returns `bundle` to `Unrequested`, failing its callbacks, every bundle
    /// waiting on it, and every asset waiting on it.
    pub(super) fn fail_bundle(&mut self, bundle: &str, error: LoadError) {
        let callbacks = match self.bundles.get_mut(bundle) {
            Some(slot) => {
                slot.phase = BundlePhase::Unrequested;
                std::mem::take(&mut slot.callbacks)
            }
            None => Vec::new(),
        };
        log::warn!("Load of bundle '{bundle}' failed: {error}");
        for callback in callbacks {
            callback(Err(error.clone()));
        }

        let mut dependents: Vec<String> = self
            .bundles
            .iter()
            .filter(|(_, slot)| match &slot.phase {
                BundlePhase::AwaitingDependencies(dependencies) => {
                    dependencies.iter().any(|dependency| dependency == bundle)
                }
                _ => false,
            })
            .map(|(name, _)| name.clone())
            .collect();
        dependents.sort();
        for dependent in dependents {
            let cause = LoadError::DependencyFailed {
                bundle: dependent.clone(),
                dependency: bundle.to_string(),
                cause: Box::new(error.clone()),
            };
            self.fail_bundle(&dependent, cause);
        }

        self.fail_assets_waiting_on(bundle, &error);
    }

    /// The transitive dependencies of `bundle`, followed by `bundle` itself.
    fn bundle_chain(&self, bundle: &str) -> Vec<String> {
        let mut chain = self.resolver.transitive_dependencies(bundle).unwrap_or_default();
        chain.push(bundle.to_string());
        chain
    }

    pub(super) fn retain_chain(&mut self, bundle: &str) {
        for name in self.bundle_chain(bundle) {
            self.bundles.entry(name).or_default().refs.retain();
        }
    }

    pub(super) fn release_chain(&mut self, bundle: &str) {
        let now = Instant::now();
        match self.bundles.get_mut(bundle).map(|slot| slot.refs.release(now)) {
            Some(Release::BecameUnreferenced) => {
                self.events.publish(CacheEvent::BundleUnreferenced(bundle.to_string()));
            }
            Some(Release::Decremented) => {}
            Some(Release::AlreadyZero) | None => {
                log::debug!("Ignoring release of unreferenced bundle '{bundle}'");
                return;
            }
        }

        for dependency in self.resolver.transitive_dependencies(bundle).unwrap_or_default() {
            let released = self
                .bundles
                .get_mut(&dependency)
                .map(|slot| slot.refs.release(now));
            if released == Some(Release::BecameUnreferenced) {
                self.events.publish(CacheEvent::BundleUnreferenced(dependency));
            }
        }
    }
}
