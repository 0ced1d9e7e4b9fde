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

use super::{BundleLoadingLane, CompletedBundleLoad, PendingBundleLoad};
use crossbeam_channel::{Receiver, TryRecvError};
use kbundle_core::bundle::{LoadedBundle, Manifest};
use kbundle_core::LoadError;
use kbundle_io::archive::decode_bundle;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// A lane reading bundle files from a build output directory.
///
/// Each bundle is the file `<root>/<bundle name>`. Asynchronous loads run the
/// read and decode on a dedicated worker thread and hand the result back over a
/// channel.
#[derive(Debug, Clone)]
pub struct DirectoryBundleLane {
    root: PathBuf,
    /// Bundle name to expected BLAKE3 hex digest, when verification is on.
    expected_hashes: Option<Arc<HashMap<String, String>>>,
}

impl DirectoryBundleLane {
    /// Creates a lane reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            expected_hashes: None,
        }
    }

    /// Verifies every bundle against the content hash recorded in `manifest`.
    pub fn verified_against(mut self, manifest: &Manifest) -> Self {
        let hashes = manifest
            .files
            .iter()
            .map(|file| (file.file_name.clone(), file.content_hash.clone()))
            .collect();
        self.expected_hashes = Some(Arc::new(hashes));
        self
    }

    /// The directory bundles are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BundleLoadingLane for DirectoryBundleLane {
    fn load(&mut self, bundle: &str) -> Result<LoadedBundle, LoadError> {
        read_bundle(&self.root, self.expected_hashes.as_deref(), bundle)
    }

    fn begin_load(&mut self, bundle: &str) -> Box<dyn PendingBundleLoad> {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let root = self.root.clone();
        let hashes = self.expected_hashes.clone();
        let name = bundle.to_string();

        let spawned = thread::Builder::new()
            .name(format!("kbundle-load-{bundle}"))
            .spawn(move || {
                let outcome = read_bundle(&root, hashes.as_deref(), &name);
                // The receiver is gone if the cache was cleared mid-load.
                let _ = sender.send(outcome);
            });

        match spawned {
            Ok(_) => Box::new(ThreadedBundleLoad {
                bundle: bundle.to_string(),
                receiver,
            }),
            Err(e) => {
                log::warn!("Could not spawn a loader thread for '{bundle}' ({e}), reading inline");
                let outcome = read_bundle(&self.root, self.expected_hashes.as_deref(), bundle);
                Box::new(CompletedBundleLoad::new(bundle, outcome))
            }
        }
    }
}

/// A load running on a worker thread.
struct ThreadedBundleLoad {
    bundle: String,
    receiver: Receiver<Result<LoadedBundle, LoadError>>,
}

impl ThreadedBundleLoad {
    fn worker_lost(&self) -> LoadError {
        LoadError::Io {
            bundle: self.bundle.clone(),
            message: "loader thread exited without a result".to_string(),
        }
    }
}

impl PendingBundleLoad for ThreadedBundleLoad {
    fn poll(&mut self) -> Option<Result<LoadedBundle, LoadError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(self.worker_lost())),
        }
    }

    fn wait(self: Box<Self>) -> Result<LoadedBundle, LoadError> {
        match self.receiver.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(self.worker_lost()),
        }
    }
}

fn read_bundle(
    root: &Path,
    expected_hashes: Option<&HashMap<String, String>>,
    bundle: &str,
) -> Result<LoadedBundle, LoadError> {
    let io_error = |message: String| LoadError::Io {
        bundle: bundle.to_string(),
        message,
    };

    if bundle.is_empty() || bundle.contains(['/', '\\']) || bundle.starts_with('.') {
        return Err(io_error("not a valid bundle file name".to_string()));
    }

    let path = root.join(bundle);
    let bytes = fs::read(&path).map_err(|e| io_error(format!("{}: {e}", path.display())))?;

    if let Some(hashes) = expected_hashes {
        let actual = blake3::hash(&bytes).to_hex();
        match hashes.get(bundle) {
            Some(expected) if expected.as_str() == actual.as_str() => {}
            Some(expected) => {
                return Err(io_error(format!(
                    "content hash {actual} does not match manifest hash {expected}"
                )))
            }
            None => return Err(io_error("bundle has no manifest hash".to_string())),
        }
    }

    let loaded = decode_bundle(&bytes).map_err(|e| io_error(e.to_string()))?;
    if loaded.name() != bundle {
        return Err(io_error(format!(
            "file holds bundle '{}' instead",
            loaded.name()
        )));
    }
    log::debug!("Read bundle '{bundle}' ({} entries, {} bytes)", loaded.len(), bytes.len());
    Ok(loaded)
}
