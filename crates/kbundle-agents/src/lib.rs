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

//! # KBundle Agents
//!
//! The stateful half of the runtime. [`cache_agent::LoadCache`] owns the
//! bundle and asset state machines and decides when the lanes in
//! `kbundle-lanes` run.

#![warn(missing_docs)]

pub mod cache_agent;
