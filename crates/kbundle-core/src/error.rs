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

//! Error types shared by the build pipeline and the runtime cache.

use thiserror::Error;

/// A packaging rule set or a manifest could not be parsed or failed validation.
///
/// Fatal to whatever operation needed the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The document could not be read or decoded.
    #[error("failed to parse {what}: {message}")]
    Parse {
        /// What was being parsed (a file path or a document kind).
        what: String,
        /// The underlying decoder message.
        message: String,
    },
    /// A rule has a source path the naming scheme cannot represent.
    #[error("invalid packaging rule '{source_path}': {reason}")]
    InvalidRule {
        /// The offending rule's source path.
        source_path: String,
        /// Why the rule was rejected.
        reason: String,
    },
    /// Two rules share the same source path.
    #[error("duplicate packaging rule for '{0}'")]
    DuplicateRule(String),
    /// The manifest is structurally inconsistent.
    #[error("invalid manifest: {0}")]
    Manifest(String),
}

/// A logical asset path could not be mapped to a bundle name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// No rule's source path is a prefix of the asset path.
    #[error("no packaging rule covers '{path}'")]
    NoMatchingRule {
        /// The logical asset path.
        path: String,
    },
    /// More than one rule matches with the same, maximal prefix length.
    #[error("'{path}' is matched ambiguously by more than one rule for '{source_path}'")]
    AmbiguousRule {
        /// The logical asset path.
        path: String,
        /// The source path shared by the competing rules.
        source_path: String,
    },
    /// The asset sits directly in a `SubSingle` rule's directory instead of
    /// in one of its subdirectories, so it belongs to no bundle.
    #[error("'{path}' is not inside a subdirectory of sub-single rule '{source_path}'")]
    LooseFile {
        /// The logical asset path.
        path: String,
        /// The owning rule's source path.
        source_path: String,
    },
}

/// A runtime load failed.
///
/// This is delivered to async callbacks and is therefore cheap to clone; I/O
/// failures are carried as messages rather than `std::io::Error` values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The logical path matches no rule.
    #[error(transparent)]
    Resolution(#[from] NamingError),
    /// The bundle name has no entry in the manifest.
    #[error("bundle '{0}' is not listed in the manifest")]
    MissingBundle(String),
    /// The owning bundle loaded but does not contain the asset.
    #[error("asset '{path}' is not contained in bundle '{bundle}'")]
    MissingAsset {
        /// The logical asset path.
        path: String,
        /// The bundle that was searched.
        bundle: String,
    },
    /// The physical bundle read failed.
    #[error("failed to read bundle '{bundle}': {message}")]
    Io {
        /// The bundle being read.
        bundle: String,
        /// The underlying failure.
        message: String,
    },
    /// A dependency of the bundle failed to load, so the bundle itself was not loaded.
    #[error("dependency '{dependency}' of bundle '{bundle}' failed: {cause}")]
    DependencyFailed {
        /// The bundle that was requested.
        bundle: String,
        /// The dependency that failed.
        dependency: String,
        /// Why the dependency failed.
        cause: Box<LoadError>,
    },
    /// No decoder is registered for the asset's extension.
    #[error("no loader registered for '{0}'")]
    NoLoader(String),
    /// The decoder rejected the asset bytes.
    #[error("failed to decode '{path}': {message}")]
    Decode {
        /// The logical asset path.
        path: String,
        /// The decoder's message.
        message: String,
    },
    /// The asset was requested as a different Rust type than its decoder produces.
    #[error("asset '{path}' was requested as {requested} but decodes to {registered}")]
    TypeMismatch {
        /// The logical asset path.
        path: String,
        /// The type the caller asked for.
        requested: String,
        /// The type the registered decoder produces.
        registered: String,
    },
    /// The cache was cleared while the request was still pending.
    #[error("load of '{0}' was abandoned because the cache session ended")]
    SessionEnded(String),
}
