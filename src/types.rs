//! Shared id and output types threaded between the Tarjan layer and the Reduced Graph layer.

use std::collections::BTreeSet;

use crate::arena::ArenaId;

/// A vertex id in the extended id space `[0, originalN] ∪ superNodeIds`.
pub type NodeId = usize;

/// An edge of the original graph, as given by the caller.
pub struct OriginalEdge {
    pub s: NodeId,
    pub t: NodeId,
    /// Marked by the last-drop-edge rule during a Tarjan pass: true if this edge is part of
    /// the 2-approximate minimum necessary-edge set for the SCC it currently sits inside.
    /// Meaningless (and never read) while `internal` is false.
    pub needed: bool,
    /// True once `s` and `t` resolve to the same SCC representative.
    pub internal: bool,
}

impl OriginalEdge {
    pub fn new(s: NodeId, t: NodeId) -> Self {
        OriginalEdge {
            s,
            t,
            needed: false,
            internal: false,
        }
    }
}

pub type EdgeId = ArenaId<OriginalEdge>;

/// A condensation-level edge between two distinct SCCs, backed by the set of original edges
/// it summarizes.
pub struct SuperEdge {
    pub s: NodeId,
    pub t: NodeId,
    pub sub_edges: BTreeSet<EdgeId>,
}

impl SuperEdge {
    pub fn new(s: NodeId, t: NodeId) -> Self {
        SuperEdge {
            s,
            t,
            sub_edges: BTreeSet::new(),
        }
    }
}

pub type SuperEdgeId = ArenaId<SuperEdge>;

/// Result of a merge-detecting operation (cycle-closing insertion, minimum-cover insertion,
/// or batch insertion). An empty `aff_node` means no merge happened.
#[derive(Default)]
pub struct IncOutput {
    /// The id every node in `aff_node` (plus the nodes already inside it) merges into.
    pub final_id: NodeId,
    /// Nodes whose SCC membership changes. Coming out of the condensation layer this is
    /// "nodes found to be mutually reachable"; once the Tarjan layer has folded the merge in,
    /// this becomes "super-edges to delete because their endpoints merged".
    pub aff_node: BTreeSet<NodeId>,
    /// Super-edges on the cycle that closed the merge; exactly one underlying original edge
    /// per super-edge gets marked `needed` to keep the 2-approximation bound.
    pub nec_edge: Vec<SuperEdgeId>,
    /// The edge whose insertion triggered this merge, if any (absent for the minimum-cover
    /// insertion path, which folds the new edge into `nec_edge` instead).
    pub added_edge: Option<EdgeId>,
}

/// Result of a split-detecting operation. `new_node.len() <= 1` means the SCC did not
/// actually split.
#[derive(Default)]
pub struct DecOutput {
    pub scc_id: NodeId,
    pub new_node: BTreeSet<NodeId>,
    pub deleted_edge: Option<EdgeId>,
    pub scc_node_list: Vec<NodeId>,
}

/// Snapshot of index-wide counters returned by `Graph::info()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphInfo {
    pub original_n: usize,
    pub original_m: u64,
    pub current_scc_count: usize,
    pub non_singleton_scc_count: usize,
    pub current_external_edges: u64,
    pub current_internal_edges: u64,
    pub necessary_edge_count: u64,
    pub scc_try_split: u64,
    pub scc_real_split: u64,
    pub scc_try_split_no_prune: u64,
    pub scc_real_split_no_prune: u64,
    pub scc_merge: u64,
}
