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

//! Physical bundle loading.
//!
//! A [`BundleLoadingLane`] turns a bundle name into a [`LoadedBundle`], either
//! blocking the caller or through a [`PendingBundleLoad`] that the cache polls
//! once per update tick.

mod directory;

pub use directory::*;

use kbundle_core::bundle::LoadedBundle;
use kbundle_core::LoadError;

/// An asynchronous bundle load that has been issued but not yet observed complete.
pub trait PendingBundleLoad: Send {
    /// Returns the outcome once the load has finished, `None` while it is in progress.
    ///
    /// After `Some` has been returned the operation is spent and must be dropped.
    fn poll(&mut self) -> Option<Result<LoadedBundle, LoadError>>;

    /// Blocks until the load finishes.
    fn wait(self: Box<Self>) -> Result<LoadedBundle, LoadError>;
}

/// Reads bundles by name.
pub trait BundleLoadingLane: Send {
    /// Loads a bundle, blocking until it is available.
    fn load(&mut self, bundle: &str) -> Result<LoadedBundle, LoadError>;

    /// Starts loading a bundle without blocking.
    fn begin_load(&mut self, bundle: &str) -> Box<dyn PendingBundleLoad>;
}

/// A load whose outcome is already known.
#[derive(Debug)]
pub struct CompletedBundleLoad {
    outcome: Option<Result<LoadedBundle, LoadError>>,
    bundle: String,
}

impl CompletedBundleLoad {
    /// Wraps an outcome for `bundle`.
    pub fn new(bundle: impl Into<String>, outcome: Result<LoadedBundle, LoadError>) -> Self {
        Self {
            outcome: Some(outcome),
            bundle: bundle.into(),
        }
    }
}

impl PendingBundleLoad for CompletedBundleLoad {
    fn poll(&mut self) -> Option<Result<LoadedBundle, LoadError>> {
        self.outcome.take()
    }

    fn wait(self: Box<Self>) -> Result<LoadedBundle, LoadError> {
        let Self { outcome, bundle } = *self;
        outcome.unwrap_or_else(|| {
            Err(LoadError::Io {
                bundle,
                message: "load outcome was already taken".to_string(),
            })
        })
    }
}
