//! Public entry point: owns both layers and orchestrates the five update algorithms plus the
//! read-only queries.

use std::collections::BTreeMap;

use error_stack::Report;

use crate::error::GraphError;
use crate::reduced_graph::ReducedGraphLayer;
use crate::tarjan::TarjanLayer;
use crate::types::{EdgeId, GraphInfo, NodeId};

pub struct Graph {
    tarjan: TarjanLayer,
    reduced: ReducedGraphLayer,

    scc_try_split: u64,
    scc_real_split: u64,
    scc_try_split_no_prune: u64,
    scc_real_split_no_prune: u64,
    scc_merge: u64,
}

impl Graph {
    /// Build the index from `original_n` vertices (ids `0..=original_n`) and an initial edge
    /// list. Both layers are fully Tarjan'd before this returns.
    pub fn build(original_n: usize, edge_list: &[(NodeId, NodeId)]) -> Self {
        let mut tarjan = TarjanLayer::build(original_n, edge_list);
        let reduced = ReducedGraphLayer::new(&mut tarjan);

        Graph {
            tarjan,
            reduced,
            scc_try_split: 0,
            scc_real_split: 0,
            scc_try_split_no_prune: 0,
            scc_real_split_no_prune: 0,
            scc_merge: 0,
        }
    }

    pub fn in_same_scc(&self, u: NodeId, v: NodeId) -> bool {
        self.tarjan.in_same_scc(u, v)
    }

    /// The current SCC representative of `v` (a vertex id for a singleton, a super-node id
    /// otherwise).
    pub fn find(&self, v: NodeId) -> NodeId {
        self.tarjan.find(v)
    }

    /// The necessary-edge count of the SCC containing `v`.
    pub fn scc_necessary_edge_count(&self, v: NodeId) -> i64 {
        self.tarjan.nec_edge_num[self.tarjan.find(v)]
    }

    pub fn query_reachable(&self, u: NodeId, v: NodeId) -> bool {
        self.tarjan.query_reachable(u, v)
    }

    /// Resolve each of `output.nec_edge`'s super-edges down to one representative original
    /// edge (the first id in its `sub_edges` set), the input `TarjanLayer::insertion_manage_scc_node`
    /// expects.
    fn representative_edges(&self, nec_edge: &[crate::types::SuperEdgeId]) -> Vec<EdgeId> {
        nec_edge
            .iter()
            .map(|&id| {
                *self
                    .reduced
                    .super_edge(id)
                    .sub_edges
                    .iter()
                    .next()
                    .expect("super-edge with no sub-edges should already have been deleted")
            })
            .collect()
    }

    /// Insert `(u, v)`, folding it in via the cheap single-witness-cycle probe.
    pub fn insertion(&mut self, u: NodeId, v: NodeId) {
        let new_edge = self.tarjan.edge_insertion(u, v);
        self.reduced.single_insertion(&mut self.tarjan, new_edge);

        let s = self.tarjan.find(u);
        let t = self.tarjan.find(v);
        if s == t {
            return;
        }

        let mut output = self.reduced.may_merge(s, t);
        if output.aff_node.is_empty() {
            return;
        }

        self.scc_merge += 1;
        let representative_edges = self.representative_edges(&output.nec_edge);
        self.tarjan
            .insertion_scc_merge(new_edge, &mut output, &representative_edges);
        self.reduced.apply_merge(&mut self.tarjan, &output);
    }

    /// Insert `(u, v)`, and if it closes a cycle, fully re-Tarjan the affected slice of the
    /// condensation so `nec_edge` is a minimum cover of every cycle closed, not just one
    /// witness.
    pub fn insertion_minimum(&mut self, u: NodeId, v: NodeId) {
        let new_edge = self.tarjan.edge_insertion(u, v);
        self.reduced.single_insertion(&mut self.tarjan, new_edge);

        let s = self.tarjan.find(u);
        let t = self.tarjan.find(v);
        if s == t {
            return;
        }

        let mut output = self.reduced.insertion_minimum(&mut self.tarjan, new_edge);
        if output.aff_node.is_empty() {
            return;
        }

        self.scc_merge += 1;
        let representative_edges = self.representative_edges(&output.nec_edge);
        self.tarjan
            .insertion_scc_minimum(&mut output, &representative_edges);
        self.reduced.apply_merge(&mut self.tarjan, &output);
    }

    /// Insert every `(u, v)` pair in `edges`, then resolve every merge the whole batch closes
    /// in one condensation-level pass.
    pub fn batch_insertion(&mut self, edges: &[(NodeId, NodeId)]) {
        let new_edges: Vec<EdgeId> = edges
            .iter()
            .map(|&(u, v)| self.tarjan.edge_insertion(u, v))
            .collect();

        let outputs: BTreeMap<NodeId, crate::types::IncOutput> =
            self.reduced.batch_insertion(&mut self.tarjan, &new_edges);

        for (_, mut output) in outputs {
            if output.aff_node.is_empty() {
                continue;
            }
            self.scc_merge += 1;
            let representative_edges = self.representative_edges(&output.nec_edge);
            self.tarjan
                .insertion_scc_minimum(&mut output, &representative_edges);
            self.reduced.apply_merge(&mut self.tarjan, &output);
        }
    }

    /// Remove the edge `(u, v)`. If it was marked `needed`, probe whether its SCC actually
    /// splits; otherwise this is a cheap no-op for the partition.
    pub fn deletion(&mut self, u: NodeId, v: NodeId) -> Result<(), Report<GraphError>> {
        let edge_id = self.tarjan.edge_remove(u, v)?;
        let was_internal = self.tarjan.edge(edge_id).internal;
        let was_needed = self.tarjan.edge(edge_id).needed;

        if !was_internal {
            self.reduced.single_deletion(&self.tarjan, edge_id);
            return Ok(());
        }

        if !was_needed {
            return Ok(());
        }

        self.scc_try_split += 1;
        let output = self.tarjan.deletion_scc(u, v);
        if output.new_node.len() > 1 {
            self.scc_real_split += 1;
            self.reduced.deletion_scc(&mut self.tarjan, &output);
        }
        Ok(())
    }

    /// Like [`Graph::deletion`], but always probes for a split regardless of whether the
    /// removed edge was marked `needed` — the unpruned baseline `deletion` optimizes away.
    pub fn deletion_without_pruning_power(&mut self, u: NodeId, v: NodeId) -> Result<(), Report<GraphError>> {
        let edge_id = self.tarjan.edge_remove(u, v)?;
        let was_internal = self.tarjan.edge(edge_id).internal;

        if !was_internal {
            self.reduced.single_deletion(&self.tarjan, edge_id);
            return Ok(());
        }

        self.scc_try_split_no_prune += 1;
        let output = self.tarjan.deletion_scc(u, v);
        if output.new_node.len() > 1 {
            self.scc_real_split_no_prune += 1;
            self.reduced.deletion_scc(&mut self.tarjan, &output);
        }
        Ok(())
    }

    /// Remove every `(u, v)` pair, then fully re-Tarjan each SCC that lost more than one
    /// internal edge in the same batch.
    pub fn batch_deletion(&mut self, edges: &[(NodeId, NodeId)]) -> Result<(), Report<GraphError>> {
        let mut touched: std::collections::BTreeSet<NodeId> = std::collections::BTreeSet::new();

        for &(u, v) in edges {
            let edge_id = self.tarjan.edge_remove(u, v)?;
            if self.tarjan.edge(edge_id).internal {
                touched.insert(self.tarjan.find(u));
            } else {
                self.reduced.single_deletion(&self.tarjan, edge_id);
            }
        }

        for scc_id in touched {
            self.scc_try_split += 1;
            let output = self.tarjan.batch_deletion_scc(scc_id);
            if output.new_node.len() > 1 {
                self.scc_real_split += 1;
                self.reduced.deletion_scc(&mut self.tarjan, &output);
            }
        }
        Ok(())
    }

    /// A fresh snapshot of every counter a caller would want to log.
    pub fn info(&self) -> GraphInfo {
        let mut non_singleton = 0usize;
        let mut current_scc_count = 0usize;
        let mut current_internal_edges: u64 = 0;
        let mut necessary_edge_count: u64 = 0;

        for i in 0..=self.tarjan.original_n + self.tarjan.extend_n {
            let members = &self.tarjan.inv_scc_map[i];
            if members.is_empty() {
                continue;
            }
            current_scc_count += 1;
            if members.len() > 1 {
                non_singleton += 1;
            }
        }

        for i in 0..self.tarjan.g.len() {
            for &edge_id in &self.tarjan.g[i] {
                let edge = self.tarjan.edge(edge_id);
                if edge.internal {
                    current_internal_edges += 1;
                    if edge.needed {
                        necessary_edge_count += 1;
                    }
                }
            }
        }

        let current_external_edges = self.tarjan.m - current_internal_edges;

        GraphInfo {
            original_n: self.tarjan.original_n,
            original_m: self.tarjan.m,
            current_scc_count,
            non_singleton_scc_count: non_singleton,
            current_external_edges,
            current_internal_edges,
            necessary_edge_count,
            scc_try_split: self.scc_try_split,
            scc_real_split: self.scc_real_split,
            scc_try_split_no_prune: self.scc_try_split_no_prune,
            scc_real_split_no_prune: self.scc_real_split_no_prune,
            scc_merge: self.scc_merge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_merges_a_path_into_a_cycle() {
        let mut graph = Graph::build(2, &[(0, 1), (1, 2)]);
        assert!(!graph.in_same_scc(0, 2));
        graph.insertion(2, 0);
        assert!(graph.in_same_scc(0, 2));
        assert!(graph.in_same_scc(1, 2));
    }

    #[test]
    fn deletion_splits_a_cycle_back_into_singletons() {
        let mut graph = Graph::build(2, &[(0, 1), (1, 2), (2, 0)]);
        assert!(graph.in_same_scc(0, 2));
        graph.deletion(2, 0).unwrap();
        assert!(!graph.in_same_scc(0, 2));
    }

    #[test]
    fn deletion_of_unknown_edge_is_an_error() {
        let mut graph = Graph::build(2, &[(0, 1)]);
        assert!(graph.deletion(1, 0).is_err());
    }

    #[test]
    fn insertion_minimum_merges_same_as_insertion() {
        let mut graph = Graph::build(2, &[(0, 1), (1, 2)]);
        graph.insertion_minimum(2, 0);
        assert!(graph.in_same_scc(0, 1));
        assert!(graph.in_same_scc(1, 2));
    }

    #[test]
    fn batch_insertion_merges_multiple_cycles() {
        let mut graph = Graph::build(4, &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 3)]);
        assert!(graph.in_same_scc(0, 2));
        assert!(graph.in_same_scc(3, 4));
        assert!(!graph.in_same_scc(0, 3));
        let info = graph.info();
        assert_eq!(info.original_n, 4);
    }

    #[test]
    fn batch_deletion_splits_every_touched_scc() {
        let mut graph = Graph::build(2, &[(0, 1), (1, 2), (2, 0)]);
        graph.batch_deletion(&[(2, 0)]).unwrap();
        assert!(!graph.in_same_scc(0, 2));
    }
}
