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

//! Contracts for decoded assets handed out by the runtime cache.
//!
//! - The [`Asset`] trait marks types the cache may decode and store.
//! - [`AssetHandle`] is the shared form returned for ordinary assets.
//! - [`Instance`] is the owned, tagged copy returned for instantiable assets,
//!   and [`Acquired`] is what a lookup yields: one or the other.

mod handle;
mod instance;

pub use handle::*;
pub use instance::*;

/// A marker trait for types that can be decoded out of a bundle and cached.
///
/// The supertraits let decoded values be shared across threads and stored in
/// type-erased form for the whole session.
///
/// # Examples
///
/// ```
/// use kbundle_core::asset::Asset;
///
/// struct Sprite {
///     pixels: Vec<u8>,
/// }
///
/// impl Asset for Sprite {}
/// ```
pub trait Asset: Send + Sync + 'static {}
