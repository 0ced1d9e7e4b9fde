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

use super::{Asset, AssetHandle};
use std::ops::{Deref, DerefMut};

/// Identifies the cached asset an instantiated copy was made from.
///
/// Releasing an instance routes through this tag so the right asset and
/// bundle handles are decremented.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceTag {
    logical_path: String,
}

impl InstanceTag {
    /// Creates a tag for an asset path.
    pub fn new(logical_path: impl Into<String>) -> Self {
        Self {
            logical_path: logical_path.into(),
        }
    }

    /// The logical path of the originating asset.
    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }
}

/// A fresh, caller-owned copy of an instantiable asset.
#[derive(Debug)]
pub struct Instance<A: Asset> {
    tag: InstanceTag,
    value: A,
}

impl<A: Asset> Instance<A> {
    /// Tags a freshly copied value.
    pub fn new(tag: InstanceTag, value: A) -> Self {
        Self { tag, value }
    }

    /// The tag that routes this instance's release.
    pub fn tag(&self) -> &InstanceTag {
        &self.tag
    }

    /// Splits the instance into its tag and value.
    ///
    /// Keep the tag: an object pool that parks the value still owes one
    /// release for it when the pooled object is finally discarded.
    pub fn into_parts(self) -> (InstanceTag, A) {
        (self.tag, self.value)
    }
}

impl<A: Asset> Deref for Instance<A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.value
    }
}

impl<A: Asset> DerefMut for Instance<A> {
    fn deref_mut(&mut self) -> &mut A {
        &mut self.value
    }
}

/// The result of a successful asset lookup.
#[derive(Debug)]
pub enum Acquired<A: Asset> {
    /// The single shared decoded object.
    Shared(AssetHandle<A>),
    /// A fresh copy, for instantiable asset types.
    Instance(Instance<A>),
}

impl<A: Asset> Acquired<A> {
    /// Returns `true` for a tagged copy.
    pub fn is_instance(&self) -> bool {
        matches!(self, Acquired::Instance(_))
    }

    /// The shared handle, if this is not an instance.
    pub fn into_shared(self) -> Option<AssetHandle<A>> {
        match self {
            Acquired::Shared(handle) => Some(handle),
            Acquired::Instance(_) => None,
        }
    }

    /// The instance, if the asset type is instantiable.
    pub fn into_instance(self) -> Option<Instance<A>> {
        match self {
            Acquired::Instance(instance) => Some(instance),
            Acquired::Shared(_) => None,
        }
    }
}

impl<A: Asset> Deref for Acquired<A> {
    type Target = A;

    fn deref(&self) -> &A {
        match self {
            Acquired::Shared(handle) => &**handle,
            Acquired::Instance(instance) => &**instance,
        }
    }
}
