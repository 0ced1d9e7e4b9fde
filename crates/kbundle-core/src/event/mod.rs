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

//! Notifications published by the runtime cache.

/// Something observers of the cache may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A bundle's reference count dropped from one to zero.
    BundleUnreferenced(String),
    /// An asset's reference count dropped from one to zero.
    AssetUnreferenced(String),
    /// A bundle finished loading.
    BundleLoaded(String),
    /// An unreferenced bundle was unloaded by the reaper.
    BundleUnloaded(String),
    /// An unreferenced asset was dropped by the reaper.
    AssetUnloaded(String),
}

/// Fans [`CacheEvent`]s out to every live subscriber.
///
/// Each subscriber gets its own unbounded channel and sees every event
/// published after it subscribed. With no subscriber, events are dropped.
#[derive(Debug, Default)]
pub struct CacheEventBus {
    subscribers: Vec<flume::Sender<CacheEvent>>,
}

impl CacheEventBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an event to every subscriber, forgetting those whose
    /// receiver was dropped.
    pub fn publish(&mut self, event: CacheEvent) {
        log::trace!("Cache event: {event:?}");
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Returns a new receiver for the events published from now on.
    pub fn subscribe(&mut self) -> flume::Receiver<CacheEvent> {
        let (sender, receiver) = flume::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// The number of subscribers still attached as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
