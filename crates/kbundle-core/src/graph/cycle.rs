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

//! Depth-first cycle detection that reports the offending path.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A cycle found in a dependency graph.
///
/// `path` lists every node on the cycle once, starting from the first node
/// the walk re-entered; the last node has an edge back to the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError<T> {
    /// The nodes on the cycle, in edge order.
    pub path: Vec<T>,
}

impl<T> CycleError<T> {
    /// Wraps a cycle path.
    pub fn new(path: Vec<T>) -> Self {
        Self { path }
    }
}

impl<T: fmt::Display> fmt::Display for CycleError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.path {
            write!(f, "{node} -> ")?;
        }
        match self.path.first() {
            Some(first) => write!(f, "{first}"),
            None => write!(f, "<empty>"),
        }
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for CycleError<T> {}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

/// Searches `graph` (node to its successors) for a cycle.
///
/// Nodes are visited in key order, so the reported cycle is deterministic.
/// Nodes proven acyclic are not walked again, which keeps the search linear
/// in nodes plus edges. The walk is iterative and safe on deep chains.
pub fn find_cycle<T>(graph: &BTreeMap<T, BTreeSet<T>>) -> Option<Vec<T>>
where
    T: Ord + Clone,
{
    let mut marks: BTreeMap<&T, Mark> = BTreeMap::new();

    for root in graph.keys() {
        if marks.contains_key(root) {
            continue;
        }

        let mut path: Vec<&T> = vec![root];
        let mut cursors = vec![graph.get(root).into_iter().flatten()];
        marks.insert(root, Mark::OnPath);

        while let Some(cursor) = cursors.last_mut() {
            match cursor.next() {
                Some(next) => match marks.get(next) {
                    Some(Mark::OnPath) => {
                        let start = path.iter().position(|node| *node == next).unwrap_or(0);
                        return Some(path[start..].iter().map(|node| (*node).clone()).collect());
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::OnPath);
                        path.push(next);
                        cursors.push(graph.get(next).into_iter().flatten());
                    }
                },
                None => {
                    cursors.pop();
                    if let Some(finished) = path.pop() {
                        marks.insert(finished, Mark::Done);
                    }
                }
            }
        }
    }

    None
}
