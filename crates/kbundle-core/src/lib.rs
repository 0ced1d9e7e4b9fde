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

//! # KBundle Core
//!
//! Foundational crate for the asset bundle system. It holds the data model
//! shared by the build pipeline and the runtime cache: packaging rules, the
//! bundle naming scheme, the persisted manifest, and the contracts used to
//! hand decoded assets back to callers.
//!
//! Nothing in this crate touches the filesystem. Build-time I/O lives in
//! `kbundle-io` and the physical bundle loaders live in `kbundle-lanes`.

#![warn(missing_docs)]

pub mod asset;
pub mod bundle;
pub mod error;
pub mod event;
pub mod graph;
pub mod vfs;

pub use error::{ConfigError, LoadError, NamingError};
