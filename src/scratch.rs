//! Scoped DFS scratch state shared by every Tarjan-style pass.
//!
//! Each recursive DFS pass needs per-node `dfn`/`low`/`in_stack` state that must return to its
//! rest value (`0`/`0`/not-in-stack) for every node it touched, however the call tree was
//! unwound: a normal return, an early return once an alternative path is found, or an
//! abandoned probe that gets thrown away. A plain function that "remembers to clean up at the
//! end" cannot offer that guarantee once a call has more than one exit path; an RAII guard can.
//! [`ScratchGuard`] is that guard: it borrows the layer's persistent `dfn`/`low`/`in_stack`
//! vectors for the duration of one DFS pass and restores every visited entry to zero when
//! dropped, regardless of how the pass ended.

use fixedbitset::FixedBitSet;

pub struct DfsScratch {
    pub dfn: Vec<u32>,
    pub low: Vec<u32>,
    pub in_stack: FixedBitSet,
}

impl DfsScratch {
    pub fn new(capacity: usize) -> Self {
        DfsScratch {
            dfn: vec![0; capacity],
            low: vec![0; capacity],
            in_stack: FixedBitSet::with_capacity(capacity),
        }
    }
}

/// One DFS pass over a [`DfsScratch`]. Tracks every node touched this pass (`visited`) and a
/// monotonically increasing discovery counter (`dfn_num`), and on drop clears `dfn`/`low`/
/// `in_stack` back to their rest state for exactly those nodes.
pub struct ScratchGuard<'a> {
    scratch: &'a mut DfsScratch,
    pub visited: Vec<usize>,
    pub dfn_num: u32,
    pub dfs_stack: Vec<usize>,
}

impl<'a> ScratchGuard<'a> {
    pub fn new(scratch: &'a mut DfsScratch) -> Self {
        ScratchGuard {
            scratch,
            visited: Vec::new(),
            dfn_num: 0,
            dfs_stack: Vec::new(),
        }
    }

    pub fn dfn(&self, u: usize) -> u32 {
        self.scratch.dfn[u]
    }

    pub fn low(&self, u: usize) -> u32 {
        self.scratch.low[u]
    }

    pub fn set_low(&mut self, u: usize, value: u32) {
        self.scratch.low[u] = value;
    }

    pub fn in_stack(&self, u: usize) -> bool {
        self.scratch.in_stack.contains(u)
    }

    /// Discover `u`: assign it the next dfn/low, push it on the DFS stack, mark it visited
    /// for this pass so `Drop` knows to reset it.
    pub fn discover(&mut self, u: usize) {
        self.visited.push(u);
        self.dfn_num += 1;
        self.scratch.dfn[u] = self.dfn_num;
        self.scratch.low[u] = self.dfn_num;
        self.dfs_stack.push(u);
        self.scratch.in_stack.put(u);
    }

    pub fn leave_stack(&mut self, u: usize) {
        self.scratch.in_stack.set(u, false);
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        for &i in &self.visited {
            self.scratch.in_stack.set(i, false);
            self.scratch.dfn[i] = 0;
            self.scratch.low[i] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_clears_only_visited_nodes() {
        let mut scratch = DfsScratch::new(4);
        {
            let mut guard = ScratchGuard::new(&mut scratch);
            guard.discover(1);
            guard.discover(2);
            assert_eq!(guard.dfn(1), 1);
            assert_eq!(guard.dfn(2), 2);
        }
        assert_eq!(scratch.dfn, vec![0, 0, 0, 0]);
        assert_eq!(scratch.low, vec![0, 0, 0, 0]);
        assert_eq!(scratch.in_stack.count_ones(..), 0);
    }

    #[test]
    fn early_return_still_restores_scratch() {
        let mut scratch = DfsScratch::new(3);
        fn abandon(scratch: &mut DfsScratch) {
            let mut guard = ScratchGuard::new(scratch);
            guard.discover(0);
            if true {
                return; // abandoned mid-probe, guard still drops here
            }
            #[allow(unreachable_code)]
            {
                guard.discover(1);
            }
        }
        abandon(&mut scratch);
        assert_eq!(scratch.dfn, vec![0, 0, 0]);
    }
}
