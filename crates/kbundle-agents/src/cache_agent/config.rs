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

use std::time::Duration;

/// Tuning for a [`LoadCache`](super::LoadCache).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a handle must stay unreferenced before `update` unloads it.
    /// `None` disables automatic eviction.
    pub reap_grace: Option<Duration>,
    /// Upper bound on asynchronous bundle completions handled per `update`.
    /// `None` handles every completed load.
    pub max_completions_per_update: Option<usize>,
}

impl CacheConfig {
    /// Enables the reaper with the given grace period.
    pub fn with_reap_grace(mut self, grace: Duration) -> Self {
        self.reap_grace = Some(grace);
        self
    }

    /// Limits the completions handled per update tick.
    pub fn with_max_completions_per_update(mut self, max: usize) -> Self {
        self.max_completions_per_update = Some(max.max(1));
        self
    }
}
