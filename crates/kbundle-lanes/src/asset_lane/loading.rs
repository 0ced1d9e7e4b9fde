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

//! Loaders for assets that need no format-specific parsing.

use super::AssetLoaderLane;
use kbundle_core::asset::Asset;
use std::error::Error;

/// An asset kept as its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesAsset(pub Vec<u8>);

impl Asset for BytesAsset {}

/// A UTF-8 text asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAsset(pub String);

impl Asset for TextAsset {}

/// Copies the entry bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesLoaderLane;

impl AssetLoaderLane<BytesAsset> for BytesLoaderLane {
    fn load(&self, bytes: &[u8]) -> Result<BytesAsset, Box<dyn Error + Send + Sync>> {
        Ok(BytesAsset(bytes.to_vec()))
    }
}

/// Decodes the entry as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoaderLane;

impl AssetLoaderLane<TextAsset> for TextLoaderLane {
    fn load(&self, bytes: &[u8]) -> Result<TextAsset, Box<dyn Error + Send + Sync>> {
        let text = std::str::from_utf8(bytes)?;
        Ok(TextAsset(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_loader_rejects_invalid_utf8() {
        assert_eq!(
            TextLoaderLane.load(b"hello").unwrap(),
            TextAsset("hello".to_string())
        );
        assert!(TextLoaderLane.load(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn closures_are_loaders() {
        let loader = |bytes: &[u8]| -> Result<BytesAsset, Box<dyn Error + Send + Sync>> {
            Ok(BytesAsset(bytes.iter().rev().copied().collect()))
        };
        assert_eq!(loader.load(&[1, 2, 3]).unwrap(), BytesAsset(vec![3, 2, 1]));
        assert_eq!(BytesLoaderLane.load(&[7]).unwrap(), BytesAsset(vec![7]));
    }
}
