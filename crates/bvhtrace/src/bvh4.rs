//! Stack-based traversal of quaternary hierarchies.
//!
//! Same contract and pruning as the binary traverser, with up to four
//! children hit per step:
//!
//! - none: pop the next live entry;
//! - one: descend without touching the stack;
//! - two: defer the farther, descend the nearer;
//! - three or four: push them all, order the pushed entries with a fixed
//!   sort network so the nearest is on top, and pop it straight away.

use crate::hierarchy::Bvh4;
use crate::intersector::Intersector;
use crate::node::{Node4, NodeRef, RayFrame};
use crate::ray::{Hit, Ray};
use crate::stack::{StackItem, TraversalStack, BVH4_STACK_SIZE};
use crate::stats::TraversalStats;

/// Nearest-hit and occlusion queries over a borrowed [`Bvh4`].
#[derive(Debug, Clone, Copy)]
pub struct Bvh4Intersector<'a> {
    bvh: &'a Bvh4,
}

/// Pick the next node among the children of `node` selected by `mask`.
///
/// Returns `None` when no child was hit and the caller must pop.
#[inline]
fn descend(
    node: &Node4,
    mask: u32,
    dist: &[f32; 4],
    stack: &mut TraversalStack<BVH4_STACK_SIZE>,
) -> Option<NodeRef> {
    match mask.count_ones() {
        0 => None,
        1 => Some(node.children[mask.trailing_zeros() as usize]),
        2 => {
            let a = mask.trailing_zeros() as usize;
            let b = (mask & (mask - 1)).trailing_zeros() as usize;
            let (near, far) = if dist[b] < dist[a] { (b, a) } else { (a, b) };
            stack.push(StackItem::new(node.children[far], dist[far]));
            Some(node.children[near])
        }
        hits => {
            let mut bits = mask;
            while bits != 0 {
                let slot = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                stack.push(StackItem::new(node.children[slot], dist[slot]));
            }
            stack.sort_top(hits as usize);
            stack.pop().map(|item| item.node)
        }
    }
}

impl<'a> Bvh4Intersector<'a> {
    /// Wrap a hierarchy.
    pub fn new(bvh: &'a Bvh4) -> Self {
        Self { bvh }
    }

    /// The wrapped hierarchy.
    pub fn bvh(&self) -> &'a Bvh4 {
        self.bvh
    }

    /// Find the closest hit in `[ray.near, hit.t]`, recording work in `stats`.
    pub fn traverse_with_stats(&self, ray: &Ray, hit: &mut Hit, stats: &mut TraversalStats) {
        let nodes = self.bvh.nodes();
        if nodes.is_empty() {
            return;
        }
        let primitives = self.bvh.primitives();
        let frame = RayFrame::new(ray);
        let mut stack = TraversalStack::<BVH4_STACK_SIZE>::new();
        let mut cur = NodeRef::ROOT;

        'traversal: loop {
            while !cur.is_leaf() {
                stats.nodes_visited += 1;
                let node = &nodes[cur.index()];
                let (mask, dist) = node.intersect(&frame, hit.t);

                cur = match descend(node, mask, &dist, &mut stack) {
                    Some(next) => next,
                    None => {
                        let (next, stale) = stack.pop_within(hit.t);
                        stats.stale_pops += stale;
                        match next {
                            Some(item) => item.node,
                            None => break 'traversal,
                        }
                    }
                };
            }

            stats.leaves_visited += 1;
            for group in &primitives[cur.leaf_range()] {
                stats.primitives_tested += 1;
                group.intersect(ray, hit);
            }

            let (next, stale) = stack.pop_within(hit.t);
            stats.stale_pops += stale;
            match next {
                Some(item) => cur = item.node,
                None => break,
            }
        }

        stats.peak_stack = stats.peak_stack.max(stack.peak() as u32);
    }

    /// True if anything intersects the ray in `[ray.near, ray.far]`,
    /// recording work in `stats`.
    pub fn occluded_with_stats(&self, ray: &Ray, stats: &mut TraversalStats) -> bool {
        let nodes = self.bvh.nodes();
        if nodes.is_empty() {
            return false;
        }
        let primitives = self.bvh.primitives();
        let frame = RayFrame::new(ray);
        let mut stack = TraversalStack::<BVH4_STACK_SIZE>::new();
        let mut cur = NodeRef::ROOT;
        let mut occluded = false;

        'traversal: loop {
            while !cur.is_leaf() {
                stats.nodes_visited += 1;
                let node = &nodes[cur.index()];
                let (mask, dist) = node.intersect(&frame, ray.far);

                let next = descend(node, mask, &dist, &mut stack)
                    .or_else(|| stack.pop().map(|item| item.node));
                cur = match next {
                    Some(next) => next,
                    None => break 'traversal,
                };
            }

            stats.leaves_visited += 1;
            for group in &primitives[cur.leaf_range()] {
                stats.primitives_tested += 1;
                if group.occluded(ray) {
                    occluded = true;
                    break 'traversal;
                }
            }

            match stack.pop() {
                Some(item) => cur = item.node,
                None => break,
            }
        }

        stats.peak_stack = stats.peak_stack.max(stack.peak() as u32);
        occluded
    }
}

impl Intersector for Bvh4Intersector<'_> {
    fn traverse(&self, ray: &Ray, hit: &mut Hit) {
        self.traverse_with_stats(ray, hit, &mut TraversalStats::default());
    }

    fn occluded(&self, ray: &Ray) -> bool {
        self.occluded_with_stats(ray, &mut TraversalStats::default())
    }
}
