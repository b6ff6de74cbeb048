//! Tarjan layer: per-original-node SCC bookkeeping.
//!
//! Owns the original adjacency, the union-find-like `scc_map` (a node id `u` is its own
//! representative whenever `scc_map[u] <= 0`; otherwise `scc_map[u]` is the id of whoever
//! it merged into), and the recycled pool of super-node ids used to name an SCC with more
//! than one member. This is the first of the two union-find-shaped structures in this
//! crate; see [`crate::reduced_graph`] for the second, deliberately separate, one.
//!
//! The recursive DFS passes (`build`, `build_internal`, `try_build_internal`) are kept as
//! free functions taking disjoint field borrows rather than `&mut self` methods: each holds
//! a [`ScratchGuard`] borrowing `scratch` for the whole recursion, and a `&mut self` method
//! would have to reborrow every other field through `self` on every recursive call, which
//! the borrow checker cannot reconcile with the live scratch borrow.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use error_stack::{Report, ResultExt};

use crate::arena::Arena;
use crate::error::GraphError;
use crate::scratch::{DfsScratch, ScratchGuard};
use crate::types::{DecOutput, EdgeId, IncOutput, NodeId, OriginalEdge};

pub struct TarjanLayer {
    pub(crate) edges: Arena<OriginalEdge>,
    /// Outgoing adjacency, indexed by original node id.
    pub(crate) g: Vec<Vec<EdgeId>>,

    pub m: u64,
    pub original_n: usize,
    /// `(original_n + 2) / 2`: the number of super-node ids reserved for naming SCCs.
    pub extend_n: usize,

    /// Nodes in `[n+1, n+extend_n]` not currently naming an SCC, smallest id first so ids are
    /// reused in a stable, low-to-high order.
    empty_node: BinaryHeap<Reverse<NodeId>>,

    /// `scc_map[u] <= 0` iff `u` is its own representative: `-1` for an unmapped/singleton
    /// leaf node, `0` for an unused super-node slot, or `-size` for a representative super-node
    /// with `size` members. Otherwise `scc_map[u]` is the representative `u` points to.
    scc_map: Vec<i64>,
    pub(crate) inv_scc_map: Vec<Vec<NodeId>>,
    pub(crate) nec_edge_num: Vec<i64>,

    scratch: DfsScratch,
}

impl TarjanLayer {
    /// Build the initial index from `original_n` vertices (ids `0..=original_n`) and an edge
    /// list. Runs the initial Tarjan pass immediately, so the returned layer already has a
    /// correct SCC partition and necessary-edge marking.
    pub fn build(original_n: usize, edge_list: &[(NodeId, NodeId)]) -> Self {
        let extend_n = (original_n + 2) / 2;
        let total = original_n + 1 + extend_n;

        let mut edges = Arena::new();
        let mut g = vec![Vec::new(); original_n + 1];
        for &(s, t) in edge_list {
            let id = edges.insert(OriginalEdge::new(s, t));
            g[s].push(id);
        }

        let mut scc_map = vec![-1i64; total];
        for slot in scc_map.iter_mut().skip(original_n + 1) {
            *slot = 0;
        }

        let empty_node = (original_n + 1..total).map(Reverse).collect();

        let mut layer = TarjanLayer {
            edges,
            g,
            m: edge_list.len() as u64,
            original_n,
            extend_n,
            empty_node,
            scc_map,
            inv_scc_map: vec![Vec::new(); total],
            nec_edge_num: vec![0; total],
            scratch: DfsScratch::new(original_n + 1),
        };

        layer.construction();
        layer
    }

    fn construction(&mut self) {
        let mut guard = ScratchGuard::new(&mut self.scratch);
        for u in 0..=self.original_n {
            if guard.dfn(u) == 0 {
                build(
                    &self.g,
                    &mut self.edges,
                    &mut self.scc_map,
                    &mut self.empty_node,
                    u,
                    &mut guard,
                );
            }
        }
        drop(guard);

        for u in 0..=self.original_n {
            let root = self.find(u);
            self.inv_scc_map[root].push(u);
        }
    }

    pub fn find(&self, u: NodeId) -> NodeId {
        if self.scc_map[u] <= 0 {
            u
        } else {
            self.scc_map[u] as NodeId
        }
    }

    pub fn in_same_scc(&self, u: NodeId, v: NodeId) -> bool {
        self.find(u) == self.find(v)
    }

    pub fn edge(&self, id: EdgeId) -> &OriginalEdge {
        self.edges.get(id)
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> &mut OriginalEdge {
        self.edges.get_mut(id)
    }

    pub fn edge_insertion(&mut self, u: NodeId, v: NodeId) -> EdgeId {
        self.m += 1;
        let id = self.edges.insert(OriginalEdge::new(u, v));
        self.g[u].push(id);
        id
    }

    pub fn edge_remove(&mut self, u: NodeId, v: NodeId) -> Result<EdgeId, Report<GraphError>> {
        let position = self.g[u]
            .iter()
            .position(|&id| self.edges.get(id).t == v)
            .ok_or(GraphError::EdgeNotFound { s: u, t: v })
            .attach_printable("edge_remove: no such outgoing edge")?;
        Ok(self.g[u].remove(position))
    }

    /// Plain BFS reachability over the original (non-reduced) graph.
    pub fn query_reachable(&self, u: NodeId, v: NodeId) -> bool {
        if u == v {
            return true;
        }

        let mut visited = vec![false; self.original_n + 1];
        visited[u] = true;
        let mut frontier = vec![u];

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for i in frontier {
                for &edge_id in &self.g[i] {
                    let edge = self.edges.get(edge_id);
                    if edge.t == v {
                        return true;
                    }
                    if !visited[edge.t] {
                        visited[edge.t] = true;
                        next.push(edge.t);
                    }
                }
            }
            frontier = next;
        }

        false
    }

    /// Mark `new_edge` (the edge that just closed a cycle across SCCs) necessary, then run
    /// [`TarjanLayer::insertion_manage_scc_node`]. No-op if `output.aff_node` is empty (no
    /// merge to perform).
    pub fn insertion_scc_merge(
        &mut self,
        new_edge: EdgeId,
        output: &mut IncOutput,
        representative_edges: &[EdgeId],
    ) {
        if output.aff_node.is_empty() {
            return;
        }
        self.edges.get_mut(new_edge).needed = true;
        self.insertion_manage_scc_node(output, representative_edges);
    }

    /// The minimum-cover insertion variant: the new edge's owning super-edge is already one of
    /// `output.nec_edge`, so there is nothing extra to mark beyond the representative edges.
    pub fn insertion_scc_minimum(&mut self, output: &mut IncOutput, representative_edges: &[EdgeId]) {
        if output.aff_node.is_empty() {
            return;
        }
        self.insertion_manage_scc_node(output, representative_edges);
    }

    /// Absorb every SCC named in `output.aff_node` into whichever one is currently largest
    /// (a fresh super-node id is drawn only if every affected SCC is a singleton), then set
    /// `output.final_id` and recompute its necessary-edge count.
    ///
    /// `representative_edges` must have one entry per `output.nec_edge`, each being an
    /// arbitrary original edge drawn from that super-edge's sub-edges: marking exactly one
    /// representative per cycle-closing super-edge is what keeps the necessary-edge set
    /// within the 2-approximation bound instead of marking every sub-edge.
    pub fn insertion_manage_scc_node(&mut self, output: &mut IncOutput, representative_edges: &[EdgeId]) {
        let mut max_id = None;
        let mut max_size: i64 = 0;
        let mut nec_edge_size: i64 = 0;

        for &i in &output.aff_node {
            let size = -self.scc_map[i];
            if size > max_size {
                max_size = size;
                max_id = Some(i);
            }
            nec_edge_size += self.nec_edge_num[i];
        }
        nec_edge_size += representative_edges.len() as i64;

        for &edge_id in representative_edges {
            self.edges.get_mut(edge_id).needed = true;
        }

        let max_id = if max_size == 1 {
            self.empty_node.pop().expect("empty node pool exhausted").0
        } else {
            max_id.expect("aff_node non-empty but no representative found")
        };

        for &i in &output.aff_node {
            if i != max_id {
                self.scc_map[max_id] += self.scc_map[i];
                let members = std::mem::take(&mut self.inv_scc_map[i]);
                for &node in &members {
                    self.scc_map[node] = max_id as i64;
                }
                self.inv_scc_map[max_id].extend(members);
                if i > self.original_n {
                    self.scc_map[i] = 0;
                    self.empty_node.push(Reverse(i));
                }
            }
        }

        output.final_id = max_id;
        self.nec_edge_num[max_id] = nec_edge_size;
        output.aff_node.remove(&max_id);
    }

    /// Detect whether removing the edge `(u, v)` splits the SCC containing both. `u` must
    /// currently reach `v` via the removed edge (caller already knows `in_same_scc(u, v)` and
    /// that the edge being removed was `needed`).
    pub fn deletion_scc(&mut self, u: NodeId, v: NodeId) -> DecOutput {
        let scc_id = self.find(u);
        let mut output = DecOutput {
            scc_id,
            ..Default::default()
        };

        let scc_node_list = std::mem::take(&mut self.inv_scc_map[scc_id]);
        for &i in &scc_node_list {
            self.scc_map[i] = -1;
        }

        let v_root = self.find(v);
        let mut redo = false;
        let mut prev_last_drop_num: i64 = 0;
        let threshold = 2 * (scc_node_list.len() as i64 - 1);
        let mut nec_edge_num = self.nec_edge_num[v_root];

        let found_alternative;
        {
            let mut guard = ScratchGuard::new(&mut self.scratch);
            found_alternative = try_build_internal(
                &self.g,
                &mut self.edges,
                &mut self.scc_map,
                &mut self.empty_node,
                self.original_n,
                u,
                v,
                &mut redo,
                &mut prev_last_drop_num,
                threshold,
                &mut nec_edge_num,
                &mut guard,
            );

            if found_alternative || redo {
                self.nec_edge_num[v_root] = nec_edge_num;
                drop(guard);
                for &i in &scc_node_list {
                    self.scc_map[i] = scc_id as i64;
                }
                self.inv_scc_map[scc_id] = scc_node_list;
                return output;
            }

            for &i in &scc_node_list {
                if guard.dfn(i) == 0 {
                    build_internal(&self.g, &mut self.edges, &mut self.scc_map, &mut self.empty_node, i, &mut guard);
                }
            }
        }
        self.nec_edge_num[v_root] = nec_edge_num;

        for &i in &scc_node_list {
            let root = self.find(i);
            self.inv_scc_map[root].push(i);
            output.new_node.insert(root);
        }
        output.scc_node_list = scc_node_list;

        self.repack_after_split(scc_id, &mut output);

        for &i in &output.new_node {
            self.nec_edge_num[i] = 0;
        }

        output
    }

    /// Re-partition every node of `scc_id` from scratch (used by batch deletion, where more
    /// than one internal edge left the SCC at once so the cheap single-edge probe does not
    /// apply).
    pub fn batch_deletion_scc(&mut self, scc_id: NodeId) -> DecOutput {
        let mut output = DecOutput {
            scc_id,
            ..Default::default()
        };

        let scc_node_list = std::mem::take(&mut self.inv_scc_map[scc_id]);
        for &i in &scc_node_list {
            self.scc_map[i] = -1;
        }

        {
            let mut guard = ScratchGuard::new(&mut self.scratch);
            for &i in &scc_node_list {
                if guard.dfn(i) == 0 {
                    build_internal(&self.g, &mut self.edges, &mut self.scc_map, &mut self.empty_node, i, &mut guard);
                }
            }
        }

        let mut output_scc: BTreeSet<NodeId> = BTreeSet::new();
        for &i in &scc_node_list {
            output_scc.insert(self.find(i));
        }

        if output_scc.len() == 1 {
            let only = *output_scc.iter().next().unwrap();
            self.scc_map[only] = 0;
            self.empty_node.push(Reverse(only));
            for &i in &scc_node_list {
                self.scc_map[i] = scc_id as i64;
            }
            self.inv_scc_map[scc_id] = scc_node_list;
        } else {
            for &i in &scc_node_list {
                let root = self.find(i);
                self.inv_scc_map[root].push(i);
                output.new_node.insert(root);
            }
            output.scc_node_list = scc_node_list;
            self.repack_after_split(scc_id, &mut output);
        }

        output
    }

    /// Shared tail of `deletion_scc`/`batch_deletion_scc`: keep the old SCC id attached to
    /// whichever resulting piece is largest, so the Reduced Graph layer has to rewrite the
    /// fewest super-edges.
    fn repack_after_split(&mut self, scc_id: NodeId, output: &mut DecOutput) {
        let mut max_id = scc_id;
        let mut max_size: i64 = 0;
        for &i in &output.new_node {
            if self.scc_map[i] < max_size {
                max_size = self.scc_map[i];
                max_id = i;
            }
        }

        if max_size <= -2 {
            self.inv_scc_map.swap(max_id, scc_id);
            let members = self.inv_scc_map[scc_id].clone();
            for node in members {
                self.scc_map[node] = scc_id as i64;
            }
            self.scc_map[scc_id] = self.scc_map[max_id];
            self.scc_map[max_id] = 0;
            self.empty_node.push(Reverse(max_id));

            output.new_node.remove(&max_id);
            output.new_node.insert(scc_id);
        } else {
            self.scc_map[scc_id] = 0;
            self.empty_node.push(Reverse(scc_id));
        }
    }
}

fn create_scc(
    scc_map: &mut [i64],
    empty_node: &mut BinaryHeap<Reverse<NodeId>>,
    root: NodeId,
    guard: &mut ScratchGuard<'_>,
) {
    let mut new_node: Option<NodeId> = None;
    if *guard.dfs_stack.last().unwrap() != root {
        new_node = Some(empty_node.pop().expect("empty node pool exhausted").0);
    }

    while *guard.dfs_stack.last().unwrap() != root {
        let top = guard.dfs_stack.pop().unwrap();
        let nn = new_node.unwrap();
        scc_map[top] = nn as i64;
        scc_map[nn] -= 1;
        guard.leave_stack(top);
    }

    guard.leave_stack(root);
    guard.dfs_stack.pop();
    if let Some(nn) = new_node {
        scc_map[root] = nn as i64;
        scc_map[nn] -= 1;
    }
}

/// Initial-build DFS: walks every outgoing edge, marks tree edges and the last dropping
/// back/cross edge as needed, and closes out an SCC via [`create_scc`] once a root is found.
fn build(
    g: &[Vec<EdgeId>],
    edges: &mut Arena<OriginalEdge>,
    scc_map: &mut [i64],
    empty_node: &mut BinaryHeap<Reverse<NodeId>>,
    u: NodeId,
    guard: &mut ScratchGuard<'_>,
) {
    guard.discover(u);
    let mut last_drop: Option<EdgeId> = None;

    for index in 0..g[u].len() {
        let edge_id = g[u][index];
        edges.get_mut(edge_id).needed = false;
        let v = edges.get(edge_id).t;

        if guard.dfn(v) == 0 {
            edges.get_mut(edge_id).needed = true;
            build(g, edges, scc_map, empty_node, v, guard);

            if guard.low(v) <= guard.low(u) {
                last_drop = Some(edge_id);
                guard.set_low(u, guard.low(v));
            }
        } else if guard.in_stack(v) && guard.low(u) > guard.dfn(v) {
            last_drop = Some(edge_id);
            guard.set_low(u, guard.dfn(v));
        }
    }

    if let Some(drop_edge) = last_drop {
        edges.get_mut(drop_edge).needed = true;
    }

    if guard.low(u) == guard.dfn(u) {
        create_scc(scc_map, empty_node, u, guard);
    }
}

/// Re-partition DFS: identical to `build` but restricted to edges already marked `internal`,
/// used once a split has been confirmed and the SCC must be fully re-Tarjan'd.
fn build_internal(
    g: &[Vec<EdgeId>],
    edges: &mut Arena<OriginalEdge>,
    scc_map: &mut [i64],
    empty_node: &mut BinaryHeap<Reverse<NodeId>>,
    u: NodeId,
    guard: &mut ScratchGuard<'_>,
) {
    guard.discover(u);
    let mut last_drop: Option<EdgeId> = None;

    for index in 0..g[u].len() {
        let edge_id = g[u][index];
        if !edges.get(edge_id).internal {
            continue;
        }

        edges.get_mut(edge_id).needed = false;
        let v = edges.get(edge_id).t;

        if guard.dfn(v) == 0 {
            edges.get_mut(edge_id).needed = true;
            build_internal(g, edges, scc_map, empty_node, v, guard);

            if guard.low(v) <= guard.low(u) {
                last_drop = Some(edge_id);
                guard.set_low(u, guard.low(v));
            }
        } else if guard.in_stack(v) && guard.low(u) > guard.dfn(v) {
            last_drop = Some(edge_id);
            guard.set_low(u, guard.dfn(v));
        }
    }

    if let Some(drop_edge) = last_drop {
        edges.get_mut(drop_edge).needed = true;
    }

    if guard.low(u) == guard.dfn(u) {
        create_scc(scc_map, empty_node, u, guard);
    }
}

/// Cheap alternative-path probe: DFS from `u` looking for `target`, tracking how many internal
/// edges would need to flip to `needed` along the way.
/// Returns `true` the first time it reaches `target` within `threshold` necessary edges;
/// sets `*redo` instead if `target` is reachable but only by exceeding the budget, signaling
/// the caller to fall back to a full `build_internal` pass.
#[allow(clippy::too_many_arguments)]
fn try_build_internal(
    g: &[Vec<EdgeId>],
    edges: &mut Arena<OriginalEdge>,
    scc_map: &mut [i64],
    empty_node: &mut BinaryHeap<Reverse<NodeId>>,
    original_n: usize,
    u: NodeId,
    target: NodeId,
    redo: &mut bool,
    prev_last_drop_num: &mut i64,
    threshold: i64,
    nec_edge_num: &mut i64,
    guard: &mut ScratchGuard<'_>,
) -> bool {
    let _ = original_n;

    if u == target {
        if *nec_edge_num + *prev_last_drop_num > threshold {
            *redo = true;
        } else {
            return true;
        }
    }

    guard.discover(u);
    let mut last_drop: Option<EdgeId> = None;

    for index in 0..g[u].len() {
        let edge_id = g[u][index];
        if !edges.get(edge_id).internal {
            continue;
        }

        *nec_edge_num -= i64::from(edges.get(edge_id).needed);
        edges.get_mut(edge_id).needed = false;
        let v = edges.get(edge_id).t;

        if guard.dfn(v) == 0 {
            *nec_edge_num += 1;
            edges.get_mut(edge_id).needed = true;

            *prev_last_drop_num += i64::from(last_drop.is_some_and(|d| !edges.get(d).needed));

            if try_build_internal(
                g,
                edges,
                scc_map,
                empty_node,
                original_n,
                v,
                target,
                redo,
                prev_last_drop_num,
                threshold,
                nec_edge_num,
                guard,
            ) {
                if let Some(drop_edge) = last_drop {
                    *nec_edge_num += i64::from(!edges.get(drop_edge).needed);
                    edges.get_mut(drop_edge).needed = true;
                }
                return true;
            }

            *prev_last_drop_num -= i64::from(last_drop.is_some_and(|d| !edges.get(d).needed));

            if guard.low(v) <= guard.low(u) {
                last_drop = Some(edge_id);
                guard.set_low(u, guard.low(v));
            }
        } else if guard.in_stack(v) && guard.low(u) > guard.dfn(v) {
            last_drop = Some(edge_id);
            guard.set_low(u, guard.dfn(v));
        }
    }

    if let Some(drop_edge) = last_drop {
        *nec_edge_num += i64::from(!edges.get(drop_edge).needed);
        edges.get_mut(drop_edge).needed = true;
    }

    if guard.low(u) == guard.dfn(u) && !*redo {
        create_scc(scc_map, empty_node, u, guard);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(n: usize) -> Vec<(NodeId, NodeId)> {
        (0..n).map(|i| (i, (i + 1) % n)).collect()
    }

    #[test]
    fn initial_build_collapses_a_cycle_into_one_scc() {
        let tarjan = TarjanLayer::build(2, &cycle(3));
        assert!(tarjan.in_same_scc(0, 1));
        assert!(tarjan.in_same_scc(1, 2));
    }

    #[test]
    fn singleton_nodes_are_their_own_representative() {
        let tarjan = TarjanLayer::build(2, &[(0, 1), (1, 2)]);
        assert_eq!(tarjan.find(0), 0);
        assert_eq!(tarjan.find(1), 1);
        assert_eq!(tarjan.find(2), 2);
    }

    #[test]
    fn query_reachable_follows_directed_edges_only() {
        let tarjan = TarjanLayer::build(2, &[(0, 1), (1, 2)]);
        assert!(tarjan.query_reachable(0, 2));
        assert!(!tarjan.query_reachable(2, 0));
    }
}
