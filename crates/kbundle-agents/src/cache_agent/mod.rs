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

//! Acts as the agent for the bundle subsystem.
//!
//! [`LoadCache`] is the public entry point for requesting bundles and assets
//! by name or logical path. It maps paths to bundles through the manifest,
//! loads dependencies before dependents, merges duplicate requests into a
//! single physical load, and counts references so that idle handles can be
//! reclaimed by the reaper.
//!
//! All mutation happens on the caller's thread. Asynchronous work is owned by
//! the bundle lane and observed by polling from [`LoadCache::update`].

mod agent;
mod asset;
mod bundle;
mod config;
mod decoder;
mod reaper;
mod refcount;

pub use agent::LoadCache;
pub use asset::AssetState;
pub use bundle::BundleState;
pub use config::CacheConfig;
pub use reaper::ReapSummary;
