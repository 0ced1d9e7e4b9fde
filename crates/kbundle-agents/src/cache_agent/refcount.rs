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

use std::time::{Duration, Instant};

/// What a release did to the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Release {
    Decremented,
    /// The count went from one to zero.
    BecameUnreferenced,
    /// The count was already zero; nothing changed.
    AlreadyZero,
}

/// A reference count that remembers when it last reached zero.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct RefCount {
    count: usize,
    unreferenced_since: Option<Instant>,
}

impl RefCount {
    pub(super) fn count(&self) -> usize {
        self.count
    }

    pub(super) fn retain(&mut self) {
        self.count += 1;
        self.unreferenced_since = None;
    }

    pub(super) fn release(&mut self, now: Instant) -> Release {
        match self.count {
            0 => Release::AlreadyZero,
            1 => {
                self.count = 0;
                self.unreferenced_since = Some(now);
                Release::BecameUnreferenced
            }
            _ => {
                self.count -= 1;
                Release::Decremented
            }
        }
    }

    /// Starts the idle clock for a handle that finished loading without
    /// anyone holding it.
    pub(super) fn mark_loaded(&mut self, now: Instant) {
        if self.count == 0 && self.unreferenced_since.is_none() {
            self.unreferenced_since = Some(now);
        }
    }

    pub(super) fn is_idle_for(&self, grace: Duration, now: Instant) -> bool {
        self.count == 0
            && self
                .unreferenced_since
                .is_some_and(|since| now.saturating_duration_since(since) >= grace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_one_to_zero_transition_is_reported() {
        let now = Instant::now();
        let mut refs = RefCount::default();
        assert_eq!(refs.release(now), Release::AlreadyZero);

        refs.retain();
        refs.retain();
        assert_eq!(refs.release(now), Release::Decremented);
        assert_eq!(refs.release(now), Release::BecameUnreferenced);
        assert_eq!(refs.release(now), Release::AlreadyZero);

        refs.retain();
        assert_eq!(refs.release(now), Release::BecameUnreferenced);
    }

    #[test]
    fn idle_clock_starts_at_zero_and_resets_on_retain() {
        let start = Instant::now();
        let grace = Duration::from_secs(5);
        let mut refs = RefCount::default();
        assert!(!refs.is_idle_for(Duration::ZERO, start));

        refs.mark_loaded(start);
        assert!(!refs.is_idle_for(grace, start + Duration::from_secs(4)));
        assert!(refs.is_idle_for(grace, start + grace));

        refs.retain();
        assert!(!refs.is_idle_for(grace, start + grace * 10));
    }
}
