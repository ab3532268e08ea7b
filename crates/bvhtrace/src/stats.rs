//! Per-query traversal counters.

use std::ops::AddAssign;

/// Work done by one traversal call (or the sum over several).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Interior nodes whose children were slab-tested.
    pub nodes_visited: u32,
    /// Leaves whose primitives were intersected.
    pub leaves_visited: u32,
    /// `Triangle4` records intersected.
    pub primitives_tested: u32,
    /// Stack entries discarded because a closer hit made them stale.
    pub stale_pops: u32,
    /// Most stack entries held at once.
    pub peak_stack: u32,
}

impl AddAssign for TraversalStats {
    /// Sum the counters; `peak_stack` keeps the maximum.
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_visited += rhs.nodes_visited;
        self.leaves_visited += rhs.leaves_visited;
        self.primitives_tested += rhs.primitives_tested;
        self.stale_pops += rhs.stale_pops;
        self.peak_stack = self.peak_stack.max(rhs.peak_stack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut total = TraversalStats::default();
        total += TraversalStats {
            nodes_visited: 3,
            leaves_visited: 1,
            primitives_tested: 2,
            stale_pops: 0,
            peak_stack: 4,
        };
        total += TraversalStats {
            nodes_visited: 1,
            leaves_visited: 2,
            primitives_tested: 2,
            stale_pops: 1,
            peak_stack: 2,
        };
        assert_eq!(total.nodes_visited, 4);
        assert_eq!(total.leaves_visited, 3);
        assert_eq!(total.primitives_tested, 4);
        assert_eq!(total.stale_pops, 1);
        assert_eq!(total.peak_stack, 4);
    }
}
