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

//! A registry of asset decoders keyed by file extension, storing decoded
//! values in type-erased form.

use kbundle_core::asset::Asset;
use kbundle_core::LoadError;
use kbundle_lanes::asset_lane::AssetLoaderLane;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

type ErasedValue = Arc<dyn Any + Send + Sync>;

/// Produces an owned copy of an erased value, for instantiable types.
type Duplicate = fn(&(dyn Any + Send + Sync)) -> Option<Box<dyn Any + Send>>;

fn duplicate<A: Asset + Clone>(value: &(dyn Any + Send + Sync)) -> Option<Box<dyn Any + Send>> {
    value
        .downcast_ref::<A>()
        .map(|asset| Box::new(asset.clone()) as Box<dyn Any + Send>)
}

/// A decoded asset as the cache stores it.
#[derive(Clone)]
pub(super) struct StoredAsset {
    value: ErasedValue,
    type_id: TypeId,
    type_name: &'static str,
    duplicate: Option<Duplicate>,
}

impl StoredAsset {
    pub(super) fn is_instantiable(&self) -> bool {
        self.duplicate.is_some()
    }

    /// The shared value, if it is an `A`.
    pub(super) fn shared<A: Asset>(&self, path: &str) -> Result<Arc<A>, LoadError> {
        self.check_type::<A>(path)?;
        Arc::clone(&self.value)
            .downcast::<A>()
            .map_err(|_| self.mismatch::<A>(path))
    }

    /// A fresh owned copy, if the value is an instantiable `A`.
    pub(super) fn instantiate<A: Asset>(&self, path: &str) -> Result<Option<A>, LoadError> {
        self.check_type::<A>(path)?;
        let Some(duplicate) = self.duplicate else {
            return Ok(None);
        };
        duplicate(self.value.as_ref())
            .and_then(|copy| copy.downcast::<A>().ok())
            .map(|copy| Some(*copy))
            .ok_or_else(|| self.mismatch::<A>(path))
    }

    fn check_type<A: Asset>(&self, path: &str) -> Result<(), LoadError> {
        if self.type_id == TypeId::of::<A>() {
            Ok(())
        } else {
            Err(self.mismatch::<A>(path))
        }
    }

    fn mismatch<A: Asset>(&self, path: &str) -> LoadError {
        LoadError::TypeMismatch {
            path: path.to_string(),
            requested: type_name::<A>().to_string(),
            registered: self.type_name.to_string(),
        }
    }
}

impl std::fmt::Debug for StoredAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredAsset")
            .field("type_name", &self.type_name)
            .field("instantiable", &self.is_instantiable())
            .finish()
    }
}

/// Internal trait for decoding any asset type.
trait AnyDecoder: Send + Sync {
    fn decode_any(&self, path: &str, bytes: &[u8]) -> Result<StoredAsset, LoadError>;
}

/// Wraps a generic `AssetLoaderLane<A>` so it can sit in the registry.
struct DecoderWrapper<A: Asset, L: AssetLoaderLane<A>> {
    loader: L,
    duplicate: Option<Duplicate>,
    _asset: PhantomData<fn() -> A>,
}

impl<A: Asset, L: AssetLoaderLane<A>> AnyDecoder for DecoderWrapper<A, L> {
    fn decode_any(&self, path: &str, bytes: &[u8]) -> Result<StoredAsset, LoadError> {
        let asset: A = self.loader.load(bytes).map_err(|e| LoadError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(StoredAsset {
            value: Arc::new(asset),
            type_id: TypeId::of::<A>(),
            type_name: type_name::<A>(),
            duplicate: self.duplicate,
        })
    }
}

/// The registry the cache decodes through.
#[derive(Default)]
pub(super) struct DecoderRegistry {
    /// Lowercase extension (without the dot) to decoder.
    decoders: HashMap<String, Box<dyn AnyDecoder>>,
}

impl DecoderRegistry {
    pub(super) fn register<A: Asset>(&mut self, extension: &str, loader: impl AssetLoaderLane<A> + 'static) {
        self.insert(extension, loader, None);
    }

    pub(super) fn register_instantiable<A: Asset + Clone>(
        &mut self,
        extension: &str,
        loader: impl AssetLoaderLane<A> + 'static,
    ) {
        self.insert(extension, loader, Some(duplicate::<A>));
    }

    fn insert<A: Asset>(
        &mut self,
        extension: &str,
        loader: impl AssetLoaderLane<A> + 'static,
        duplicate: Option<Duplicate>,
    ) {
        let key = normalize_extension(extension);
        let wrapped = DecoderWrapper {
            loader,
            duplicate,
            _asset: PhantomData,
        };
        if self.decoders.insert(key.clone(), Box::new(wrapped)).is_some() {
            log::warn!("Replacing the decoder registered for '.{key}'");
        }
    }

    /// Decodes the bytes of `path` with the decoder registered for its extension.
    pub(super) fn decode(&self, path: &str, bytes: &[u8]) -> Result<StoredAsset, LoadError> {
        let decoder = extension_of(path)
            .and_then(|extension| self.decoders.get(&extension))
            .ok_or_else(|| LoadError::NoLoader(path.to_string()))?;
        decoder.decode_any(path, bytes)
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

fn extension_of(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(normalize_extension(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbundle_lanes::asset_lane::{BytesAsset, BytesLoaderLane, TextAsset, TextLoaderLane};

    #[test]
    fn decodes_by_extension_case_insensitively() {
        let mut registry = DecoderRegistry::default();
        registry.register::<TextAsset>(".TXT", TextLoaderLane);

        let stored = registry.decode("Docs/readme.Txt", b"hi").unwrap();
        assert!(!stored.is_instantiable());
        assert_eq!(stored.shared::<TextAsset>("Docs/readme.Txt").unwrap().0, "hi");
        assert_eq!(
            registry.decode("Docs/readme", b"hi").unwrap_err(),
            LoadError::NoLoader("Docs/readme".to_string())
        );
        assert!(matches!(
            registry.decode("Docs/.txt", b"hi"),
            Err(LoadError::NoLoader(_))
        ));
    }

    #[test]
    fn wrong_type_is_a_mismatch() {
        let mut registry = DecoderRegistry::default();
        registry.register::<TextAsset>("txt", TextLoaderLane);
        let stored = registry.decode("a.txt", b"x").unwrap();
        assert!(matches!(
            stored.shared::<BytesAsset>("a.txt"),
            Err(LoadError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn instantiable_values_are_copied() {
        let mut registry = DecoderRegistry::default();
        registry.register_instantiable::<BytesAsset>("bin", BytesLoaderLane);
        let stored = registry.decode("a.bin", &[1, 2]).unwrap();
        assert!(stored.is_instantiable());

        let mut copy = stored.instantiate::<BytesAsset>("a.bin").unwrap().unwrap();
        copy.0.push(3);
        assert_eq!(stored.shared::<BytesAsset>("a.bin").unwrap().0, vec![1, 2]);
    }

    #[test]
    fn decoder_errors_carry_the_path() {
        let mut registry = DecoderRegistry::default();
        registry.register::<TextAsset>("txt", TextLoaderLane);
        match registry.decode("bad.txt", &[0xff]) {
            Err(LoadError::Decode { path, .. }) => assert_eq!(path, "bad.txt"),
            other => panic!("expected a decode error, got {other:?}"),
        }
    }
}
