use core::fmt::{Display, Formatter};

use error_stack::Context;

/// Invariant violations the index can detect but not recover from.
///
/// These are programmer errors (the caller asked for something the current graph state
/// cannot satisfy), not malformed input: malformed input is an out-of-scope, external-loader
/// concern. Once one of these fires the index must not be used further.
#[derive(Debug)]
pub enum GraphError {
    /// `delete`/`delete_without_pruning_power`/`batch_delete` was asked to remove an edge
    /// that does not exist in the current adjacency.
    EdgeNotFound { s: usize, t: usize },
    /// Every super-node slot in the empty-node pool is in use. Given how `extend_n` is sized,
    /// this should be unreachable for any sequence of operations that only ever inserts edges
    /// between existing vertices; seeing it means the pool accounting itself has a bug.
    EmptyNodePoolExhausted,
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EdgeNotFound { s, t } => write!(f, "edge ({s}, {t}) not found"),
            Self::EmptyNodePoolExhausted => write!(f, "empty super-node pool exhausted"),
        }
    }
}

impl Context for GraphError {}
