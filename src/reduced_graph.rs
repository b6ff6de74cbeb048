//! Reduced Graph layer: the condensation of the original graph into one node per SCC.
//!
//! Keeps its own super-edges (each a set of original edges collapsing onto the same
//! condensation-level arc) and its own union-find, `scc_map`, used only transiently while a
//! condensation-level Tarjan pass (`only_tarjan`/`build_condensation`) discovers a merge. This
//! is deliberately a *second*, path-compressing, union-by-size union-find, distinct from
//! [`crate::tarjan::TarjanLayer`]'s one-hop table: the two serve different lifetimes (this one
//! is reset to all-singletons after every call that uses it) and different shapes (this one
//! never needs `TarjanLayer`'s recyclable-id pool, since a condensation-level "representative"
//! is just one of the existing affected node ids).
//!
//! Every method that needs to resolve a node to its current SCC takes `&TarjanLayer`/
//! `&mut TarjanLayer` explicitly rather than storing a pointer back to it, so the borrow
//! checker can see that the two layers never alias each other.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hashbrown::HashMap;

use crate::arena::Arena;
use crate::scratch::{DfsScratch, ScratchGuard};
use crate::tarjan::TarjanLayer;
use crate::types::{DecOutput, EdgeId, IncOutput, NodeId, SuperEdge, SuperEdgeId};

pub struct ReducedGraphLayer {
    super_edges: Arena<SuperEdge>,
    g_out: Vec<BTreeMap<NodeId, SuperEdgeId>>,
    g_in: Vec<BTreeMap<NodeId, SuperEdgeId>>,
    n: usize,

    /// 0 = unvisited, 1 = on the current `may_merge` probe's stack, 2 = confirmed on the cycle
    /// back to the probe's start. Reset to all-zero after every `may_merge` call.
    state: Vec<u8>,
    /// This layer's own union-find; `scc_map[u] <= 0` iff `u` is its own representative (with
    /// `-scc_map[u]` members), matching the sign convention but *not* the identity of
    /// `TarjanLayer::scc_map`.
    scc_map: Vec<i64>,
    scratch: DfsScratch,
}

impl ReducedGraphLayer {
    /// Build the condensation from `tarjan`'s current partition: one super-edge per pair of
    /// distinct SCCs with at least one original edge crossing between them, and every original
    /// edge whose endpoints already agree marked `internal`.
    pub fn new(tarjan: &mut TarjanLayer) -> Self {
        let n = tarjan.original_n + 1 + tarjan.extend_n;
        let mut super_edges: Arena<SuperEdge> = Arena::new();
        let mut g_out = vec![BTreeMap::new(); n + 1];
        let mut g_in = vec![BTreeMap::new(); n + 1];

        for i in 0..=tarjan.original_n {
            let s = tarjan.find(i);
            let edge_ids = tarjan.g[i].clone();
            for edge_id in edge_ids {
                let t = tarjan.find(tarjan.edge(edge_id).t);

                if s == t {
                    tarjan.edge_mut(edge_id).internal = true;
                    if tarjan.edge(edge_id).needed {
                        tarjan.nec_edge_num[s] += 1;
                    }
                    continue;
                }

                tarjan.edge_mut(edge_id).needed = false;

                if let Some(&existing) = g_out[s].get(&t) {
                    super_edges.get_mut(existing).sub_edges.insert(edge_id);
                } else {
                    let mut super_edge = SuperEdge::new(s, t);
                    super_edge.sub_edges.insert(edge_id);
                    let id = super_edges.insert(super_edge);
                    g_out[s].insert(t, id);
                    g_in[t].insert(s, id);
                }
            }
        }

        ReducedGraphLayer {
            super_edges,
            g_out,
            g_in,
            n,
            state: vec![0; n + 1],
            scc_map: vec![-1; n + 1],
            scratch: DfsScratch::new(n + 1),
        }
    }

    pub fn super_edge(&self, id: SuperEdgeId) -> &SuperEdge {
        self.super_edges.get(id)
    }

    fn super_edge_mut(&mut self, id: SuperEdgeId) -> &mut SuperEdge {
        self.super_edges.get_mut(id)
    }

    pub fn find(&mut self, u: NodeId) -> NodeId {
        find_local(&mut self.scc_map, u)
    }

    fn merge(&mut self, u: NodeId, v: NodeId) {
        merge_local(&mut self.scc_map, u, v);
    }

    fn add_edge(&mut self, tarjan: &TarjanLayer, new_edge: EdgeId) {
        let s = tarjan.find(tarjan.edge(new_edge).s);
        let t = tarjan.find(tarjan.edge(new_edge).t);
        let mut super_edge = SuperEdge::new(s, t);
        super_edge.sub_edges.insert(new_edge);
        let id = self.super_edges.insert(super_edge);
        self.g_out[s].insert(t, id);
        self.g_in[t].insert(s, id);
    }

    fn delete_edge(&mut self, id: SuperEdgeId) {
        let super_edge = self.super_edges.remove(id);
        self.g_out[super_edge.s].remove(&super_edge.t);
        self.g_in[super_edge.t].remove(&super_edge.s);
    }

    /// Fold `new_edge` into the condensation: becomes `internal` if its endpoints already
    /// agree, joins an existing super-edge's sub-edges if one already bridges the pair, or
    /// opens a brand new super-edge otherwise.
    pub fn single_insertion(&mut self, tarjan: &mut TarjanLayer, new_edge: EdgeId) {
        let s = tarjan.find(tarjan.edge(new_edge).s);
        let t = tarjan.find(tarjan.edge(new_edge).t);

        if s == t {
            tarjan.edge_mut(new_edge).internal = true;
            return;
        }

        if let Some(&existing) = self.g_out[s].get(&t) {
            self.super_edge_mut(existing).sub_edges.insert(new_edge);
            return;
        }

        self.add_edge(tarjan, new_edge);
    }

    /// Drop `delete_edge` out of the condensation: a no-op for an edge that was already
    /// `internal`, otherwise remove it from its super-edge and delete the super-edge once it
    /// is left empty.
    pub fn single_deletion(&mut self, tarjan: &TarjanLayer, delete_edge: EdgeId) {
        let s = tarjan.find(tarjan.edge(delete_edge).s);
        let t = tarjan.find(tarjan.edge(delete_edge).t);
        if s == t {
            return;
        }

        let id = self.g_out[s][&t];
        self.super_edge_mut(id).sub_edges.remove(&delete_edge);
        if self.super_edge(id).sub_edges.is_empty() {
            self.delete_edge(id);
        }
    }

    /// Three-colour reachability probe: does the condensation already have a path `t -> s`?
    /// If so every super-edge on *a* witnessing path back is collected into `nec_edge` (one
    /// marked `needed` sub-edge each keeps the resulting cycle's footprint within the
    /// 2-approximation bound) and every node on it into `aff_node`. `s`/`t` must already be
    /// condensation-level (i.e. Tarjan-layer) representatives.
    pub fn may_merge(&mut self, s: NodeId, t: NodeId) -> IncOutput {
        let mut output = IncOutput::default();
        let mut visited = Vec::new();
        self.may_merge_dfs(s, t, &mut output, &mut visited);
        for i in visited {
            self.state[i] = 0;
        }
        output
    }

    fn may_merge_dfs(&mut self, s: NodeId, now: NodeId, output: &mut IncOutput, visited: &mut Vec<NodeId>) -> bool {
        visited.push(now);
        self.state[now] = 1;

        if now == s {
            self.state[now] = 2;
            output.aff_node.insert(now);
            return true;
        }

        let mut result = false;
        let neighbors: Vec<(NodeId, SuperEdgeId)> =
            self.g_out[now].iter().map(|(&v, &e)| (v, e)).collect();

        for (v, edge) in neighbors {
            if self.state[v] == 0 {
                if self.may_merge_dfs(s, v, output, visited) {
                    result = true;
                    output.nec_edge.push(edge);
                    self.state[now] = 2;
                    output.aff_node.insert(now);
                }
            } else if self.state[v] == 2 {
                result = true;
                if self.state[now] != 2 {
                    output.nec_edge.push(edge);
                    self.state[now] = 2;
                    output.aff_node.insert(now);
                }
            }
        }

        result
    }

    /// Like [`Self::may_merge`] but instead of stopping at the first witnessing cycle, fully
    /// re-Tarjans the affected slice of the condensation so the
    /// resulting `nec_edge` set is a minimum cover of *every* cross-SCC cycle the new edge
    /// closes, not just one path back. `new_edge` must already have been folded in via
    /// [`Self::single_insertion`] and must bridge two distinct SCCs.
    pub fn insertion_minimum(&mut self, tarjan: &mut TarjanLayer, new_edge: EdgeId) -> IncOutput {
        let s = tarjan.find(tarjan.edge(new_edge).s);
        let t = tarjan.find(tarjan.edge(new_edge).t);
        let new_super_edge = self.g_out[s][&t];

        {
            let mut guard = ScratchGuard::new(&mut self.scratch);
            only_tarjan(&self.g_out, &mut self.scc_map, t, &mut guard);
        }

        let mut output = IncOutput::default();
        for i in 0..=self.n {
            if self.scc_map[i] != -1 {
                output.aff_node.insert(i);
            }
        }
        if output.aff_node.is_empty() {
            return output;
        }

        let mut in_degree: HashMap<NodeId, i64> = HashMap::new();
        for &i in &output.aff_node {
            for &v in self.g_out[i].keys() {
                if self.scc_map[v] != -1 {
                    *in_degree.entry(v).or_insert(0) += 1;
                }
            }
        }

        let mut can_reach: HashMap<NodeId, bool> = HashMap::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(t);

        while let Some(u) = queue.pop_front() {
            if u == s {
                continue;
            }

            let mut reached_u = false;
            let mut last_edge: Option<SuperEdgeId> = None;
            let neighbors: Vec<(NodeId, SuperEdgeId)> =
                self.g_out[u].iter().map(|(&v, &e)| (v, e)).collect();

            for (v, edge) in neighbors {
                if self.scc_map[v] == -1 {
                    continue;
                }
                last_edge = Some(edge);
                let entry = in_degree.entry(v).or_insert(0);
                *entry -= 1;
                if *entry == 0 {
                    queue.push_back(v);
                    if !can_reach.get(&v).copied().unwrap_or(false) {
                        can_reach.insert(v, true);
                        reached_u = true;
                        output.nec_edge.push(edge);
                    }
                }
            }

            if !reached_u {
                if let Some(edge) = last_edge {
                    let target = self.super_edge(edge).t;
                    can_reach.insert(target, true);
                    output.nec_edge.push(edge);
                }
            }
        }

        for &i in &output.aff_node {
            self.scc_map[i] = -1;
        }

        output.nec_edge.push(new_super_edge);
        output
    }

    /// Walk all of `edge_ids` (already folded in via `single_insertion`) at once, re-Tarjan
    /// only the handful of SCCs any of them touch, and group the result per merge component.
    pub fn batch_insertion(
        &mut self,
        tarjan: &mut TarjanLayer,
        edge_ids: &[EdgeId],
    ) -> BTreeMap<NodeId, IncOutput> {
        let mut source_node: BTreeSet<NodeId> = BTreeSet::new();
        for &edge_id in edge_ids {
            self.single_insertion(tarjan, edge_id);
            source_node.insert(tarjan.find(tarjan.edge(edge_id).s));
            source_node.insert(tarjan.find(tarjan.edge(edge_id).t));
        }

        let mut nec_edge: BTreeSet<SuperEdgeId> = BTreeSet::new();
        {
            let mut guard = ScratchGuard::new(&mut self.scratch);
            for &i in &source_node {
                if guard.dfn(i) == 0 {
                    build_condensation(&self.g_out, &mut self.scc_map, i, &mut guard, &mut nec_edge);
                }
            }
        }

        let mut output: BTreeMap<NodeId, IncOutput> = BTreeMap::new();
        for &edge_id in &nec_edge {
            let (edge_s, edge_t) = {
                let edge = self.super_edge(edge_id);
                (edge.s, edge.t)
            };
            if self.find(edge_s) == self.find(edge_t) {
                let id = self.find(edge_s);
                let entry = output.entry(id).or_default();
                entry.aff_node.insert(edge_s);
                entry.aff_node.insert(edge_t);
                entry.nec_edge.push(edge_id);
            }
        }

        for per_component in output.values() {
            for &id in &per_component.aff_node {
                self.scc_map[id] = -1;
            }
        }

        output
    }

    /// Apply a confirmed merge (`output.aff_node`/`output.final_id` already filled in by
    /// `TarjanLayer::insertion_manage_scc_node`): re-home every super-edge touching an affected
    /// node, flipping it to `internal` where both endpoints landed inside the merged SCC.
    /// Shared by the single-edge, minimum, and batch insertion paths.
    pub fn apply_merge(&mut self, tarjan: &mut TarjanLayer, output: &IncOutput) {
        let final_id = output.final_id;
        let mut delete_list: BTreeSet<SuperEdgeId> = BTreeSet::new();
        let mut rehome: Vec<BTreeSet<EdgeId>> = Vec::new();

        for &node in &output.aff_node {
            let out_entries: Vec<(NodeId, SuperEdgeId)> =
                self.g_out[node].iter().map(|(&k, &v)| (k, v)).collect();
            for (_, id) in out_entries {
                delete_list.insert(id);
                let raw_t = self.super_edge(id).t;
                if tarjan.find(raw_t) == final_id || output.aff_node.contains(&raw_t) {
                    let members: Vec<EdgeId> = self.super_edge(id).sub_edges.iter().copied().collect();
                    for edge_id in members {
                        tarjan.edge_mut(edge_id).internal = true;
                    }
                } else {
                    rehome.push(std::mem::take(&mut self.super_edge_mut(id).sub_edges));
                }
            }

            let in_entries: Vec<(NodeId, SuperEdgeId)> =
                self.g_in[node].iter().map(|(&k, &v)| (k, v)).collect();
            for (_, id) in in_entries {
                delete_list.insert(id);
                let raw_s = self.super_edge(id).s;
                if tarjan.find(raw_s) == final_id || output.aff_node.contains(&raw_s) {
                    let members: Vec<EdgeId> = self.super_edge(id).sub_edges.iter().copied().collect();
                    for edge_id in members {
                        tarjan.edge_mut(edge_id).internal = true;
                    }
                } else {
                    rehome.push(std::mem::take(&mut self.super_edge_mut(id).sub_edges));
                }
            }
        }

        for id in delete_list {
            self.delete_edge(id);
        }

        for group in rehome {
            for edge_id in group {
                let s = tarjan.find(tarjan.edge(edge_id).s);
                let t = tarjan.find(tarjan.edge(edge_id).t);

                if s == t {
                    tarjan.edge_mut(edge_id).internal = true;
                    continue;
                }

                if let Some(&existing) = self.g_out[s].get(&t) {
                    self.super_edge_mut(existing).sub_edges.insert(edge_id);
                    continue;
                }

                self.add_edge(tarjan, edge_id);
            }
        }
    }

    /// After a Tarjan-layer split, reclassify every edge that touched the old SCC: internal
    /// edges whose endpoints no longer agree become (or join) a super-edge; super-edges whose
    /// endpoint is now only reachable from part of the old SCC get their crossing sub-edges
    /// peeled off into new or existing super-edges.
    pub fn deletion_scc(&mut self, tarjan: &mut TarjanLayer, output: &DecOutput) {
        let scc_id = output.scc_id;
        let mut delete_list: Vec<SuperEdgeId> = Vec::new();
        let mut rehome: Vec<EdgeId> = Vec::new();

        for &node in &output.scc_node_list {
            let edge_ids = tarjan.g[node].clone();
            for edge_id in edge_ids {
                if !tarjan.edge(edge_id).internal {
                    continue;
                }
                let s = tarjan.find(tarjan.edge(edge_id).s);
                let t = tarjan.find(tarjan.edge(edge_id).t);
                if s != t {
                    tarjan.edge_mut(edge_id).internal = false;
                    rehome.push(edge_id);
                } else {
                    tarjan.nec_edge_num[s] += 1;
                }
            }
        }

        let out_keys: Vec<NodeId> = self.g_out[scc_id].keys().copied().collect();
        for key in out_keys {
            let id = self.g_out[scc_id][&key];
            let members: Vec<EdgeId> = self.super_edge(id).sub_edges.iter().copied().collect();
            for edge_id in members {
                if tarjan.find(tarjan.edge(edge_id).s) != scc_id {
                    rehome.push(edge_id);
                    self.super_edge_mut(id).sub_edges.remove(&edge_id);
                }
            }
            if self.super_edge(id).sub_edges.is_empty() {
                delete_list.push(id);
            }
        }

        let in_keys: Vec<NodeId> = self.g_in[scc_id].keys().copied().collect();
        for key in in_keys {
            let id = self.g_in[scc_id][&key];
            let members: Vec<EdgeId> = self.super_edge(id).sub_edges.iter().copied().collect();
            for edge_id in members {
                if tarjan.find(tarjan.edge(edge_id).t) != scc_id {
                    rehome.push(edge_id);
                    self.super_edge_mut(id).sub_edges.remove(&edge_id);
                }
            }
            if self.super_edge(id).sub_edges.is_empty() {
                delete_list.push(id);
            }
        }

        for id in delete_list {
            self.delete_edge(id);
        }

        for edge_id in rehome {
            let s = tarjan.find(tarjan.edge(edge_id).s);
            let t = tarjan.find(tarjan.edge(edge_id).t);

            if s == t {
                tarjan.edge_mut(edge_id).internal = true;
                continue;
            }

            if let Some(&existing) = self.g_out[s].get(&t) {
                self.super_edge_mut(existing).sub_edges.insert(edge_id);
                continue;
            }

            self.add_edge(tarjan, edge_id);
        }
    }
}

fn find_local(scc_map: &mut [i64], u: NodeId) -> NodeId {
    if scc_map[u] < 0 {
        u
    } else {
        let root = find_local(scc_map, scc_map[u] as NodeId);
        scc_map[u] = root as i64;
        root
    }
}

fn merge_local(scc_map: &mut [i64], u: NodeId, v: NodeId) {
    let u_root = find_local(scc_map, u);
    let v_root = find_local(scc_map, v);
    if u_root == v_root {
        return;
    }
    if scc_map[u_root] < scc_map[v_root] {
        scc_map[u_root] += scc_map[v_root];
        scc_map[v_root] = u_root as i64;
    } else {
        scc_map[v_root] += scc_map[u_root];
        scc_map[u_root] = v_root as i64;
    }
}

/// Condensation-level Tarjan used by `insertion_minimum`: closes SCCs via `merge_local` as it
/// finds them, tracking no necessary-edge bookkeeping since `insertion_minimum`'s topological
/// walk derives `nec_edge` separately, afterwards.
fn only_tarjan(
    g_out: &[BTreeMap<NodeId, SuperEdgeId>],
    scc_map: &mut [i64],
    u: NodeId,
    guard: &mut ScratchGuard<'_>,
) {
    guard.discover(u);

    let neighbors: Vec<NodeId> = g_out[u].keys().copied().collect();
    for v in neighbors {
        if guard.dfn(v) == 0 {
            only_tarjan(g_out, scc_map, v, guard);
            if guard.low(v) <= guard.low(u) {
                guard.set_low(u, guard.low(v));
            }
        } else if guard.in_stack(v) && guard.low(u) > guard.dfn(v) {
            guard.set_low(u, guard.dfn(v));
        }
    }

    if guard.low(u) == guard.dfn(u) {
        while *guard.dfs_stack.last().unwrap() != u {
            let top = guard.dfs_stack.pop().unwrap();
            merge_local(scc_map, u, top);
            guard.leave_stack(top);
        }
        guard.leave_stack(u);
        guard.dfs_stack.pop();
    }
}

/// Condensation-level Tarjan used by `batch_insertion`: like `only_tarjan` but also collects
/// every tree edge and last-dropping back/cross edge into `nec_edge`, applying the same
/// last-drop-edge rule one level up.
fn build_condensation(
    g_out: &[BTreeMap<NodeId, SuperEdgeId>],
    scc_map: &mut [i64],
    u: NodeId,
    guard: &mut ScratchGuard<'_>,
    nec_edge: &mut BTreeSet<SuperEdgeId>,
) {
    guard.discover(u);
    let mut last_drop: Option<SuperEdgeId> = None;

    let neighbors: Vec<(NodeId, SuperEdgeId)> = g_out[u].iter().map(|(&v, &e)| (v, e)).collect();
    for (v, edge) in neighbors {
        if guard.dfn(v) == 0 {
            nec_edge.insert(edge);
            build_condensation(g_out, scc_map, v, guard, nec_edge);
            if guard.low(v) <= guard.low(u) {
                last_drop = Some(edge);
                guard.set_low(u, guard.low(v));
            }
        } else if guard.in_stack(v) && guard.low(u) > guard.dfn(v) {
            last_drop = Some(edge);
            guard.set_low(u, guard.dfn(v));
        }
    }

    if let Some(edge) = last_drop {
        nec_edge.insert(edge);
    }

    if guard.low(u) == guard.dfn(u) {
        while *guard.dfs_stack.last().unwrap() != u {
            let top = guard.dfs_stack.pop().unwrap();
            merge_local(scc_map, u, top);
            guard.leave_stack(top);
        }
        guard.leave_stack(u);
        guard.dfs_stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_condensation_has_no_self_loops() {
        let mut tarjan = TarjanLayer::build(3, &[(0, 1), (1, 2), (2, 3)]);
        let reduced = ReducedGraphLayer::new(&mut tarjan);
        for (s, row) in reduced.g_out.iter().enumerate() {
            assert!(!row.contains_key(&s));
        }
    }

    #[test]
    fn single_insertion_closing_a_cycle_is_detected_by_may_merge() {
        let mut tarjan = TarjanLayer::build(2, &[(0, 1), (1, 2)]);
        let mut reduced = ReducedGraphLayer::new(&mut tarjan);
        let new_edge = tarjan.edge_insertion(2, 0);
        reduced.single_insertion(&mut tarjan, new_edge);

        let s = tarjan.find(2);
        let t = tarjan.find(0);
        let output = reduced.may_merge(s, t);
        assert!(!output.aff_node.is_empty());
    }

    #[test]
    fn unrelated_insertion_does_not_may_merge() {
        let mut tarjan = TarjanLayer::build(3, &[(0, 1), (2, 3)]);
        let mut reduced = ReducedGraphLayer::new(&mut tarjan);
        let new_edge = tarjan.edge_insertion(1, 2);
        reduced.single_insertion(&mut tarjan, new_edge);

        let s = tarjan.find(1);
        let t = tarjan.find(2);
        let output = reduced.may_merge(s, t);
        assert!(output.aff_node.is_empty());
    }
}
