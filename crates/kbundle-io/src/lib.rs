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

//! # KBundle IO
//!
//! The build side of the bundle system. A build runs
//! grouping -> dependency graph -> cycle check -> bundle compilation ->
//! manifest write, and either commits a complete output set or leaves the
//! previous one untouched.
//!
//! The entry point is [`build_bundles`]; the stages are also public so tools
//! can run them individually.

pub mod archive;
pub mod config;
pub mod dependencies;
pub mod error;
pub mod graph;
pub mod grouping;
pub mod manifest_writer;
pub mod pipeline;
pub mod source;

pub use error::{AssetNameIssue, BuildError};
pub use pipeline::{build_bundles, build_bundles_with, BuildOptions, BuildReport};
