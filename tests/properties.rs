//! Round-trip laws checked over small random edge sets rather than literal worked examples.

use std::collections::BTreeSet;

use mscsc::Graph;
use proptest::prelude::*;

/// A small simple directed graph: `n` vertices, a handful of distinct edges.
fn small_edge_list(n: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    let mut pairs = Vec::new();
    for u in 0..n {
        for v in 0..n {
            if u != v {
                pairs.push((u, v));
            }
        }
    }
    proptest::sample::subsequence(pairs, 0..=6)
}

fn partition_snapshot(graph: &Graph, n: usize) -> Vec<usize> {
    (0..n).map(|v| graph.find(v)).collect()
}

/// Two snapshots describe the same partition when they agree on which vertices are
/// co-resident, independent of which representative id each class happens to carry.
fn same_partition(a: &[usize], b: &[usize]) -> bool {
    for i in 0..a.len() {
        for j in 0..a.len() {
            if (a[i] == a[j]) != (b[i] == b[j]) {
                return false;
            }
        }
    }
    true
}

proptest! {
    /// R1: deleting an edge and immediately re-inserting it restores the SCC partition, even
    /// though the re-inserted edge is a new `OriginalEdge` and may not be marked `needed` the
    /// same way the original was.
    #[test]
    fn delete_then_insert_restores_the_partition(edges in small_edge_list(6)) {
        prop_assume!(!edges.is_empty());
        let n = 6;
        let mut graph = Graph::build(n, &edges);
        let before = partition_snapshot(&graph, n);

        let (u, v) = edges[0];
        if graph.deletion(u, v).is_ok() {
            graph.insertion(u, v);
            let after = partition_snapshot(&graph, n);
            prop_assert!(same_partition(&before, &after));
        }
    }

    /// R2: folding a batch of new edges in through `batch_insertion` reaches the same SCC
    /// partition as folding them in one at a time through `insertion`.
    #[test]
    fn batch_insertion_matches_sequential_insertion(
        base in small_edge_list(6),
        extra in small_edge_list(6),
    ) {
        let n = 6;
        let mut sequential = Graph::build(n, &base);
        for &(u, v) in &extra {
            sequential.insertion(u, v);
        }

        let mut batched = Graph::build(n, &base);
        batched.batch_insertion(&extra);

        let seq_snapshot = partition_snapshot(&sequential, n);
        let batch_snapshot = partition_snapshot(&batched, n);
        prop_assert!(same_partition(&seq_snapshot, &batch_snapshot));
    }

    /// R3: removing a batch of edges through `batch_deletion` reaches the same SCC partition as
    /// removing them one at a time through `deletion`, as long as none of them repeats (a
    /// repeated pair would mean deleting an edge that is no longer present).
    #[test]
    fn batch_deletion_matches_sequential_deletion(
        base in small_edge_list(6),
        drop_indices in proptest::collection::vec(0usize..6, 0..4),
    ) {
        let n = 6;

        let mut seen = BTreeSet::new();
        let mut to_drop = Vec::new();
        for &idx in &drop_indices {
            if idx < base.len() {
                let edge = base[idx];
                if seen.insert(edge) {
                    to_drop.push(edge);
                }
            }
        }
        prop_assume!(!to_drop.is_empty());

        let mut sequential = Graph::build(n, &base);
        let mut sequential_ok = true;
        for &(u, v) in &to_drop {
            if sequential.deletion(u, v).is_err() {
                sequential_ok = false;
            }
        }
        prop_assume!(sequential_ok);

        let mut batched = Graph::build(n, &base);
        prop_assume!(batched.batch_deletion(&to_drop).is_ok());

        let seq_snapshot = partition_snapshot(&sequential, n);
        let batch_snapshot = partition_snapshot(&batched, n);
        prop_assert!(same_partition(&seq_snapshot, &batch_snapshot));
    }
}
