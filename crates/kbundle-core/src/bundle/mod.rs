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

//! The bundle data model: packaging rules, the naming scheme, the manifest,
//! and the in-memory form of a loaded bundle.
//!
//! Rules and the manifest are read-only configuration, loaded once. The
//! naming functions are pure and deterministic; the build pipeline and the
//! runtime resolver both derive names through [`PackagingRuleSet::bundle_for`],
//! which is what keeps the two sides in agreement.

mod loaded;
mod manifest;
pub mod naming;
mod rules;

pub use loaded::*;
pub use manifest::*;
pub use rules::*;
