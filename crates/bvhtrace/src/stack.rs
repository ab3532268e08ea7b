//! Fixed-capacity traversal stack and small sort networks.
//!
//! Capacity is a compile-time bound of `(arity - 1) * MAX_DEPTH + 1` items,
//! so traversal never allocates. Items pushed in one quaternary step are
//! ordered with a 3- or 4-element compare-and-swap network so the nearest
//! child ends up on top.

use crate::node::NodeRef;

/// Deepest hierarchy (in interior-node levels) the traversal stacks support.
pub const MAX_DEPTH: usize = 64;

/// Stack capacity needed by a hierarchy of `arity` with `max_depth` levels.
pub const fn stack_bound(arity: usize, max_depth: usize) -> usize {
    (arity - 1) * max_depth + 1
}

/// Stack capacity for binary traversal.
pub const BVH2_STACK_SIZE: usize = stack_bound(2, MAX_DEPTH);

/// Stack capacity for quaternary traversal.
pub const BVH4_STACK_SIZE: usize = stack_bound(4, MAX_DEPTH);

/// A deferred subtree and the distance at which the ray enters it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackItem {
    /// Subtree to visit.
    pub node: NodeRef,
    /// Entry distance of the subtree's bounds.
    pub dist: f32,
}

impl StackItem {
    /// Create a stack item.
    #[inline]
    pub fn new(node: NodeRef, dist: f32) -> Self {
        Self { node, dist }
    }
}

impl Default for StackItem {
    fn default() -> Self {
        Self::new(NodeRef::EMPTY, f32::INFINITY)
    }
}

/// Array-backed stack of [`StackItem`]s holding at most `N` entries.
#[derive(Debug, Clone)]
pub struct TraversalStack<const N: usize> {
    items: [StackItem; N],
    len: usize,
    peak: usize,
}

impl<const N: usize> TraversalStack<N> {
    /// An empty stack.
    #[inline]
    pub fn new() -> Self {
        Self {
            items: [StackItem::default(); N],
            len: 0,
            peak: 0,
        }
    }

    /// Push an item.
    ///
    /// # Panics
    ///
    /// Panics if the stack is full, which only happens for a hierarchy deeper
    /// than [`MAX_DEPTH`]; validated hierarchies never get there.
    #[inline]
    pub fn push(&mut self, item: StackItem) {
        debug_assert!(self.len < N, "traversal stack overflow");
        self.items[self.len] = item;
        self.len += 1;
        self.peak = self.peak.max(self.len);
    }

    /// Pop the top item.
    #[inline]
    pub fn pop(&mut self) -> Option<StackItem> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.items[self.len])
    }

    /// Pop until an item not farther than `t_max` turns up.
    ///
    /// Returns the item and how many stale items were discarded on the way.
    #[inline]
    pub fn pop_within(&mut self, t_max: f32) -> (Option<StackItem>, u32) {
        let mut stale = 0;
        while let Some(item) = self.pop() {
            if item.dist <= t_max {
                return (Some(item), stale);
            }
            stale += 1;
        }
        (None, stale)
    }

    /// Number of items on the stack.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the stack is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most items held at once since creation.
    #[inline]
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Sort the top `k` items so distance decreases towards the top.
    ///
    /// `k` of 2, 3 or 4 uses a fixed network; anything else is left as is.
    #[inline]
    pub fn sort_top(&mut self, k: usize) {
        let top = &mut self.items[self.len - k..self.len];
        match k {
            2 => compare_swap(top, 0, 1),
            3 => sort3(top),
            4 => sort4(top),
            _ => {}
        }
    }
}

impl<const N: usize> Default for TraversalStack<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Order `items[i]` and `items[j]` (`i < j`) so the farther one comes first.
#[inline(always)]
fn compare_swap(items: &mut [StackItem], i: usize, j: usize) {
    if items[i].dist < items[j].dist {
        items.swap(i, j);
    }
}

/// Three-element network: nearest item last.
#[inline]
pub fn sort3(items: &mut [StackItem]) {
    compare_swap(items, 0, 1);
    compare_swap(items, 1, 2);
    compare_swap(items, 0, 1);
}

/// Four-element network: nearest item last.
#[inline]
pub fn sort4(items: &mut [StackItem]) {
    compare_swap(items, 0, 1);
    compare_swap(items, 2, 3);
    compare_swap(items, 0, 2);
    compare_swap(items, 1, 3);
    compare_swap(items, 1, 2);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(dists: &[f32]) -> Vec<StackItem> {
        dists
            .iter()
            .enumerate()
            .map(|(i, &d)| StackItem::new(NodeRef::node(i as u32).unwrap(), d))
            .collect()
    }

    fn dists(items: &[StackItem]) -> Vec<f32> {
        items.iter().map(|i| i.dist).collect()
    }

    /// Every permutation of `values`.
    fn permutations(values: &[f32]) -> Vec<Vec<f32>> {
        if values.len() <= 1 {
            return vec![values.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..values.len() {
            let mut rest = values.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn test_sort3_all_permutations() {
        for perm in permutations(&[1.0, 2.0, 3.0]) {
            let mut v = items(&perm);
            sort3(&mut v);
            assert_eq!(dists(&v), vec![3.0, 2.0, 1.0], "input {perm:?}");
        }
    }

    #[test]
    fn test_sort4_all_permutations() {
        for perm in permutations(&[1.0, 2.0, 3.0, 4.0]) {
            let mut v = items(&perm);
            sort4(&mut v);
            assert_eq!(dists(&v), vec![4.0, 3.0, 2.0, 1.0], "input {perm:?}");
        }
    }

    #[test]
    fn test_sort_keeps_nodes_with_distances() {
        let mut v = items(&[0.5, 9.0, 3.0, 1.0]);
        sort4(&mut v);
        let nodes: Vec<usize> = v.iter().map(|i| i.node.index()).collect();
        assert_eq!(nodes, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_push_pop_order() {
        let mut stack = TraversalStack::<4>::new();
        assert!(stack.is_empty());
        for item in items(&[1.0, 2.0, 3.0]) {
            stack.push(item);
        }
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop().map(|i| i.dist), Some(3.0));
        assert_eq!(stack.pop().map(|i| i.dist), Some(2.0));
        assert_eq!(stack.peak(), 3);
    }

    #[test]
    fn test_pop_within_discards_stale() {
        let mut stack = TraversalStack::<8>::new();
        for item in items(&[1.0, 6.0, 2.0, 7.0, 8.0]) {
            stack.push(item);
        }
        let (item, stale) = stack.pop_within(5.0);
        assert_eq!(item.map(|i| i.dist), Some(2.0));
        assert_eq!(stale, 2);

        let (item, stale) = stack.pop_within(0.5);
        assert!(item.is_none());
        assert_eq!(stale, 2);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_sort_top_only_touches_top() {
        let mut stack = TraversalStack::<8>::new();
        for item in items(&[0.1, 5.0, 1.0, 3.0]) {
            stack.push(item);
        }
        stack.sort_top(3);
        assert_eq!(stack.pop().map(|i| i.dist), Some(1.0));
        assert_eq!(stack.pop().map(|i| i.dist), Some(3.0));
        assert_eq!(stack.pop().map(|i| i.dist), Some(5.0));
        assert_eq!(stack.pop().map(|i| i.dist), Some(0.1));
    }

    #[test]
    fn test_stack_bounds() {
        assert_eq!(stack_bound(2, 10), 11);
        assert_eq!(stack_bound(4, 10), 31);
        assert_eq!(BVH2_STACK_SIZE, MAX_DEPTH + 1);
        assert_eq!(BVH4_STACK_SIZE, 3 * MAX_DEPTH + 1);
    }
}
