/*!
`mscsc` maintains an approximately-minimal "necessary" edge set over a dynamic directed graph's
strongly-connected components as the graph is edited.

Given a directed graph, a *minimum strongly-connected spanning component* for each SCC is a
minimal subset of its internal edges that keeps it strongly connected. Computing one from
scratch after every edit would mean re-running Tarjan's algorithm over the whole graph; instead
this crate keeps that subset (within a 2-approximation bound) incrementally, so the caller only
pays for the part of the graph an edit actually touches.

# Overview

```
use mscsc::Graph;

// 0 -> 1 -> 2, no cycle yet: three singleton SCCs.
let mut g = Graph::build(2, &[(0, 1), (1, 2)]);
assert!(!g.in_same_scc(0, 2));

// Closing the cycle merges all three into one SCC.
g.insertion(2, 0);
assert!(g.in_same_scc(0, 2));

// Removing the edge that closed it splits the SCC back apart.
g.deletion(2, 0).unwrap();
assert!(!g.in_same_scc(0, 2));
```

# Architecture

The index is two cooperating layers, mirroring the two union-find-shaped structures the
update algorithms need at different granularities:

* [`tarjan::TarjanLayer`] holds the original per-vertex adjacency and a one-hop (no path
  compression) mapping from vertex to current SCC representative, maintained directly by each
  update rather than recomputed.
* [`reduced_graph::ReducedGraphLayer`] holds the condensation graph — one node per SCC, one
  super-edge per pair of SCCs with at least one crossing original edge — and runs its own,
  separate, path-compressing union-find whenever it needs to re-Tarjan a slice of the
  condensation.

[`Graph`] owns both layers and implements the five update algorithms (`insertion`,
`insertion_minimum`, `deletion`, `deletion_without_pruning_power`, plus their batch forms) by
resolving cross-layer bookkeeping (representative-edge selection, re-homing super-edges after a
merge or split) that neither layer can do in isolation.
*/

pub mod arena;
pub mod driver;
pub mod error;
pub mod reduced_graph;
pub mod scratch;
pub mod tarjan;
pub mod types;

pub use crate::driver::Graph;
pub use crate::error::GraphError;
pub use crate::types::{DecOutput, GraphInfo, IncOutput, NodeId};
