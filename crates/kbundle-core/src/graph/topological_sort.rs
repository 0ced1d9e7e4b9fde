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

//! Kahn's algorithm over a dependency map, producing a dependencies-first order.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The graph could not be ordered; the listed nodes sit on or behind a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unordered<T> {
    /// Nodes that never reached an in-degree of zero.
    pub remaining: Vec<T>,
}

/// Orders the nodes of `dependencies` (node to the nodes it depends on) so
/// that every node comes after all of its dependencies.
///
/// Ties are broken by key order, so the result is deterministic. Nodes that
/// only appear as dependencies are included.
pub fn dependency_order<T>(dependencies: &BTreeMap<T, BTreeSet<T>>) -> Result<Vec<T>, Unordered<T>>
where
    T: Ord + Clone,
{
    // 1. Count unresolved dependencies per node and invert the edges.
    let mut pending: BTreeMap<&T, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&T, Vec<&T>> = BTreeMap::new();
    for (node, deps) in dependencies {
        *pending.entry(node).or_insert(0) += deps.len();
        for dep in deps {
            pending.entry(dep).or_insert(0);
            dependents.entry(dep).or_default().push(node);
        }
    }

    // 2. Seed with nodes that depend on nothing.
    let mut ready: VecDeque<&T> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();

    // 3. Release dependents as their dependencies are emitted.
    let mut ordered = Vec::with_capacity(pending.len());
    while let Some(node) = ready.pop_front() {
        ordered.push(node.clone());
        for dependent in dependents.get(node).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.push_back(*dependent);
                }
            }
        }
    }

    // 4. Anything left over is part of, or blocked by, a cycle.
    if ordered.len() == pending.len() {
        Ok(ordered)
    } else {
        let emitted: BTreeSet<&T> = ordered.iter().collect();
        Err(Unordered {
            remaining: pending
                .keys()
                .filter(|node| !emitted.contains(*node))
                .map(|node| (*node).clone())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_come_first() {
        let deps = BTreeMap::from([
            ("ui", BTreeSet::from(["atlas", "font"])),
            ("font", BTreeSet::new()),
            ("atlas", BTreeSet::from(["shaders"])),
        ]);
        let order = dependency_order(&deps).unwrap();
        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        assert_eq!(order.len(), 4);
        assert!(pos("shaders") < pos("atlas"));
        assert!(pos("atlas") < pos("ui"));
        assert!(pos("font") < pos("ui"));
    }

    #[test]
    fn cycles_leave_nodes_unordered() {
        let deps = BTreeMap::from([
            ("a", BTreeSet::from(["b"])),
            ("b", BTreeSet::from(["a"])),
            ("c", BTreeSet::new()),
        ]);
        let err = dependency_order(&deps).unwrap_err();
        assert_eq!(err.remaining, vec!["a", "b"]);
    }
}
