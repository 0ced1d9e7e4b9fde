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

use kbundle_core::asset::Asset;
use std::error::Error;

/// A trait for types that can load a specific kind of asset from a byte slice.
///
/// Implementors do the potentially CPU-intensive work of parsing raw bundle
/// entry data into a usable asset type. Each loader is specialized for a
/// single asset type `A`.
///
/// Any `Fn(&[u8]) -> Result<A, _>` closure is a loader as well.
pub trait AssetLoaderLane<A: Asset>: Send + Sync {
    /// Parses a byte slice and converts it into an instance of the asset `A`.
    ///
    /// # Returns
    /// The loaded asset, or a boxed thread-safe error.
    fn load(&self, bytes: &[u8]) -> Result<A, Box<dyn Error + Send + Sync>>;
}

impl<A, F> AssetLoaderLane<A> for F
where
    A: Asset,
    F: Fn(&[u8]) -> Result<A, Box<dyn Error + Send + Sync>> + Send + Sync,
{
    fn load(&self, bytes: &[u8]) -> Result<A, Box<dyn Error + Send + Sync>> {
        self(bytes)
    }
}
