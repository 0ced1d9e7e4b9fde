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

//! Bundle-level dependency graph construction and validation.

use crate::dependencies::DependencyResolver;
use crate::error::BuildError;
use crate::grouping::Grouping;
use crate::source::SourceTree;
use kbundle_core::graph::{self, CycleError};
use std::collections::{BTreeMap, BTreeSet};

/// Bundle name to the set of bundles it depends on.
///
/// Every grouped bundle has an entry, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Builds a graph directly from an adjacency map.
    pub fn from_edges(edges: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self { edges }
    }

    /// The direct dependencies of a bundle.
    pub fn dependencies_of(&self, bundle: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(bundle)
    }

    /// The adjacency map.
    pub fn edges(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.edges
    }

    /// The total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Fails with the full cycle path if the graph is not acyclic.
    pub fn check_acyclic(&self) -> Result<(), CycleError<String>> {
        match graph::find_cycle(&self.edges) {
            Some(path) => Err(CycleError::new(path)),
            None => Ok(()),
        }
    }

    /// Bundle names ordered so that dependencies precede their dependents.
    pub fn compile_order(&self) -> Result<Vec<String>, CycleError<String>> {
        graph::dependency_order(&self.edges).map_err(|unordered| {
            let path = graph::find_cycle(&self.edges).unwrap_or(unordered.remaining);
            CycleError::new(path)
        })
    }

    /// The edges in manifest form.
    pub fn to_manifest_edges(&self) -> BTreeMap<String, Vec<String>> {
        self.edges
            .iter()
            .map(|(owner, deps)| (owner.clone(), deps.iter().cloned().collect()))
            .collect()
    }
}

/// Records an edge from each asset's bundle to the bundle of every asset it
/// references, whenever the two differ.
///
/// References to assets that no bundle owns are logged and ignored: they are
/// either loose files or assets outside every rule, and neither can be loaded
/// at runtime through a bundle.
pub fn build_dependency_graph(
    grouping: &Grouping,
    resolver: &dyn DependencyResolver,
    tree: &dyn SourceTree,
) -> Result<DependencyGraph, BuildError> {
    let mut edges: BTreeMap<String, BTreeSet<String>> = grouping
        .bundles()
        .map(|bundle| (bundle.name.clone(), BTreeSet::new()))
        .collect();

    for (asset, owner) in grouping.assignments() {
        for referenced in resolver.references(asset, tree)? {
            match grouping.bundle_of(&referenced) {
                Some(target) if target != owner => {
                    log::debug!("'{asset}' references '{referenced}': {owner} -> {target}");
                    edges.entry(owner.clone()).or_default().insert(target.to_string());
                }
                Some(_) => {}
                None => log::warn!(
                    "'{asset}' references '{referenced}', which is not in any bundle; ignoring"
                ),
            }
        }
    }

    let graph = DependencyGraph { edges };
    log::info!(
        "Dependency graph: {} bundles, {} edges",
        graph.edges.len(),
        graph.edge_count()
    );
    Ok(graph)
}
