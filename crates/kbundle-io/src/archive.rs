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

//! On-disk bundle format.
//!
//! A bundle file is a single bincode-encoded [`BundleArchive`]. Entry data is
//! LZ4 compressed (size-prefixed block format) unless the bundle was built
//! with [`Compression::None`]. `lz4_flex` has no high-compression encoder,
//! so `Max` currently uses the same block codec as `Fast`; the requested
//! level is still recorded in the header.

use crate::error::BuildError;
use crate::grouping::BundleDescriptor;
use crate::source::SourceTree;
use kbundle_core::bundle::{Compression, LoadedBundle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current archive layout version.
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

/// One compiled asset inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Logical path of the source asset.
    pub path: String,
    /// Uncompressed length in bytes.
    pub raw_len: u64,
    /// Stored bytes, compressed according to the archive header.
    pub data: Vec<u8>,
}

/// A compiled bundle as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleArchive {
    /// Layout version, checked on decode.
    pub format_version: u32,
    /// The bundle name.
    pub name: String,
    /// How `entries[*].data` is stored.
    pub compression: Compression,
    /// The compiled assets, sorted by path.
    pub entries: Vec<ArchiveEntry>,
}

/// A bundle file could not be decoded.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The bytes are not a bincode archive.
    #[error("malformed bundle archive: {0}")]
    Malformed(#[from] bincode::error::DecodeError),
    /// The archive was written by an incompatible build.
    #[error(
        "unsupported bundle archive version {found} (expected {expected})",
        expected = ARCHIVE_FORMAT_VERSION
    )]
    UnsupportedVersion {
        /// The version found in the header.
        found: u32,
    },
    /// An entry failed to decompress.
    #[error("entry '{path}' failed to decompress: {message}")]
    Decompress {
        /// The entry path.
        path: String,
        /// Decoder message.
        message: String,
    },
    /// An entry decompressed to the wrong length.
    #[error("entry '{path}' is {actual} bytes, header says {expected}")]
    LengthMismatch {
        /// The entry path.
        path: String,
        /// Length recorded at build time.
        expected: u64,
        /// Length after decompression.
        actual: u64,
    },
}

fn compress(compression: Compression, bytes: Vec<u8>) -> Vec<u8> {
    match compression {
        Compression::None => bytes,
        Compression::Fast | Compression::Max => lz4_flex::compress_prepend_size(&bytes),
    }
}

/// Turns a bundle descriptor into the bytes of its physical file.
pub trait BundleCompiler {
    /// Compiles one bundle.
    fn compile(&self, descriptor: &BundleDescriptor, tree: &dyn SourceTree) -> Result<Vec<u8>, BuildError>;
}

/// The standard compiler, producing the archive format read by [`decode_bundle`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveCompiler;

impl BundleCompiler for ArchiveCompiler {
    fn compile(&self, descriptor: &BundleDescriptor, tree: &dyn SourceTree) -> Result<Vec<u8>, BuildError> {
        compile_bundle(descriptor, tree)
    }
}

/// Reads every asset of `descriptor` from `tree` and encodes the bundle file.
pub fn compile_bundle(descriptor: &BundleDescriptor, tree: &dyn SourceTree) -> Result<Vec<u8>, BuildError> {
    let mut entries = Vec::with_capacity(descriptor.source_asset_paths.len());
    for path in &descriptor.source_asset_paths {
        let bytes = tree.read(path)?;
        entries.push(ArchiveEntry {
            path: path.clone(),
            raw_len: bytes.len() as u64,
            data: compress(descriptor.compression, bytes),
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    let archive = BundleArchive {
        format_version: ARCHIVE_FORMAT_VERSION,
        name: descriptor.name.clone(),
        compression: descriptor.compression,
        entries,
    };
    encode_archive(&archive).map_err(|e| BuildError::Encode {
        bundle: descriptor.name.clone(),
        message: e.to_string(),
    })
}

/// Encodes an archive with the standard bincode configuration.
pub fn encode_archive(archive: &BundleArchive) -> Result<Vec<u8>, bincode::error::EncodeError> {
    bincode::serde::encode_to_vec(archive, bincode::config::standard())
}

/// Upper bound on how far one LZ4 block can expand.
const LZ4_MAX_RATIO: u64 = 255;

/// Decompresses a size-prefixed LZ4 entry into a buffer of exactly
/// `raw_len` bytes. The size prefix and `raw_len` must agree, and neither is
/// trusted beyond what the payload could expand to.
fn decompress_entry(entry: &ArchiveEntry) -> Result<Vec<u8>, ArchiveError> {
    let decompress_error = |message: String| ArchiveError::Decompress {
        path: entry.path.clone(),
        message,
    };

    let (prefix, payload) = match entry.data.split_first_chunk::<4>() {
        Some(split) => split,
        None => return Err(decompress_error("missing size prefix".to_string())),
    };
    let declared = u64::from(u32::from_le_bytes(*prefix));
    if declared != entry.raw_len {
        return Err(ArchiveError::LengthMismatch {
            path: entry.path.clone(),
            expected: entry.raw_len,
            actual: declared,
        });
    }
    if declared > (payload.len() as u64 + 1) * LZ4_MAX_RATIO {
        return Err(decompress_error(format!(
            "declared size {declared} cannot come from a {} byte payload",
            payload.len()
        )));
    }

    let mut data = vec![0; declared as usize];
    let written = lz4_flex::block::decompress_into(payload, &mut data)
        .map_err(|e| decompress_error(e.to_string()))?;
    data.truncate(written);
    Ok(data)
}

/// Decodes a bundle file and decompresses all of its entries.
pub fn decode_bundle(bytes: &[u8]) -> Result<LoadedBundle, ArchiveError> {
    let (archive, _): (BundleArchive, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    if archive.format_version != ARCHIVE_FORMAT_VERSION {
        return Err(ArchiveError::UnsupportedVersion {
            found: archive.format_version,
        });
    }

    let mut entries = Vec::with_capacity(archive.entries.len());
    for entry in archive.entries {
        let data = match archive.compression {
            Compression::None => entry.data,
            Compression::Fast | Compression::Max => decompress_entry(&entry)?,
        };
        if data.len() as u64 != entry.raw_len {
            return Err(ArchiveError::LengthMismatch {
                path: entry.path,
                expected: entry.raw_len,
                actual: data.len() as u64,
            });
        }
        entries.push((entry.path, data));
    }
    Ok(LoadedBundle::new(archive.name, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySourceTree;

    fn descriptor(compression: Compression) -> BundleDescriptor {
        BundleDescriptor {
            name: "UI".into(),
            source_asset_paths: vec!["UI/b.txt".into(), "UI/a.txt".into()],
            compression,
        }
    }

    fn tree() -> MemorySourceTree {
        MemorySourceTree::new()
            .with_file("UI/a.txt", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
            .with_file("UI/b.txt", "")
    }

    #[test]
    fn compiled_bundles_decode_to_their_sources() {
        for compression in [Compression::None, Compression::Fast, Compression::Max] {
            let bytes = compile_bundle(&descriptor(compression), &tree()).unwrap();
            let bundle = decode_bundle(&bytes).unwrap();
            assert_eq!(bundle.name(), "UI");
            assert_eq!(bundle.asset_paths(), vec!["UI/a.txt", "UI/b.txt"]);
            assert_eq!(bundle.entry("UI/a.txt").unwrap(), &[b'a'; 40][..]);
            assert_eq!(bundle.entry("UI/b.txt").unwrap(), b"");
        }
    }

    #[test]
    fn compression_shrinks_repetitive_entries() {
        let raw = compile_bundle(&descriptor(Compression::None), &tree()).unwrap();
        let packed = compile_bundle(&descriptor(Compression::Fast), &tree()).unwrap();
        assert!(packed.len() < raw.len());
    }

    #[test]
    fn foreign_versions_are_rejected() {
        let archive = BundleArchive {
            format_version: ARCHIVE_FORMAT_VERSION + 1,
            name: "UI".into(),
            compression: Compression::None,
            entries: vec![],
        };
        let bytes = encode_archive(&archive).unwrap();
        assert!(matches!(
            decode_bundle(&bytes),
            Err(ArchiveError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn truncated_files_are_malformed() {
        let bytes = compile_bundle(&descriptor(Compression::Fast), &tree()).unwrap();
        assert!(decode_bundle(&bytes[..bytes.len() / 2]).is_err());
    }

    fn archive_with_entry(raw_len: u64, data: Vec<u8>) -> Vec<u8> {
        encode_archive(&BundleArchive {
            format_version: ARCHIVE_FORMAT_VERSION,
            name: "UI".into(),
            compression: Compression::Fast,
            entries: vec![ArchiveEntry {
                path: "UI/a.txt".into(),
                raw_len,
                data,
            }],
        })
        .unwrap()
    }

    #[test]
    fn oversized_size_prefix_is_rejected_before_allocating() {
        let mut data = u32::MAX.to_le_bytes().to_vec();
        data.push(0);

        let matching = archive_with_entry(u64::from(u32::MAX), data.clone());
        assert!(matches!(
            decode_bundle(&matching),
            Err(ArchiveError::Decompress { .. })
        ));

        let disagreeing = archive_with_entry(1, data);
        assert!(matches!(
            decode_bundle(&disagreeing),
            Err(ArchiveError::LengthMismatch { expected: 1, .. })
        ));
    }

    #[test]
    fn short_payload_is_a_length_mismatch() {
        let mut data = lz4_flex::compress_prepend_size(b"abc");
        data[..4].copy_from_slice(&4u32.to_le_bytes());
        let bytes = archive_with_entry(4, data);
        assert!(decode_bundle(&bytes).is_err());
    }

    #[test]
    fn entry_without_prefix_fails_to_decompress() {
        let bytes = archive_with_entry(0, vec![1, 2]);
        assert!(matches!(
            decode_bundle(&bytes),
            Err(ArchiveError::Decompress { .. })
        ));
    }

    #[test]
    fn missing_source_asset_fails_compilation() {
        let tree = MemorySourceTree::new().with_file("UI/a.txt", "a");
        assert!(matches!(
            compile_bundle(&descriptor(Compression::None), &tree),
            Err(BuildError::Io { .. })
        ));
    }
}
