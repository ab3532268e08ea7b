//! Stack-based traversal of binary hierarchies.
//!
//! Each step slab-tests both children of the current node at once. If both
//! are hit the farther one is deferred on the stack together with its entry
//! distance and the nearer one is descended; deferred entries whose distance
//! has since been overtaken by a closer hit are dropped when popped.

use crate::hierarchy::Bvh2;
use crate::intersector::Intersector;
use crate::node::{NodeRef, RayFrame};
use crate::ray::{Hit, Ray};
use crate::stack::{StackItem, TraversalStack, BVH2_STACK_SIZE};
use crate::stats::TraversalStats;

/// Nearest-hit and occlusion queries over a borrowed [`Bvh2`].
#[derive(Debug, Clone, Copy)]
pub struct Bvh2Intersector<'a> {
    bvh: &'a Bvh2,
}

impl<'a> Bvh2Intersector<'a> {
    /// Wrap a hierarchy.
    pub fn new(bvh: &'a Bvh2) -> Self {
        Self { bvh }
    }

    /// The wrapped hierarchy.
    pub fn bvh(&self) -> &'a Bvh2 {
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
        let mut stack = TraversalStack::<BVH2_STACK_SIZE>::new();
        let mut cur = NodeRef::ROOT;

        'traversal: loop {
            while !cur.is_leaf() {
                stats.nodes_visited += 1;
                let node = &nodes[cur.index()];
                let (mask, dist) = node.intersect(&frame, hit.t);

                cur = match mask {
                    0b11 => {
                        let (near, far) = if dist[1] < dist[0] { (1, 0) } else { (0, 1) };
                        stack.push(StackItem::new(node.children[far], dist[far]));
                        node.children[near]
                    }
                    0b01 => node.children[0],
                    0b10 => node.children[1],
                    _ => {
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
    ///
    /// The box-test window stays at the ray's own far bound: any intersection
    /// ends the query, so there is no closer distance to prune with.
    pub fn occluded_with_stats(&self, ray: &Ray, stats: &mut TraversalStats) -> bool {
        let nodes = self.bvh.nodes();
        if nodes.is_empty() {
            return false;
        }
        let primitives = self.bvh.primitives();
        let frame = RayFrame::new(ray);
        let mut stack = TraversalStack::<BVH2_STACK_SIZE>::new();
        let mut cur = NodeRef::ROOT;
        let mut occluded = false;

        'traversal: loop {
            while !cur.is_leaf() {
                stats.nodes_visited += 1;
                let node = &nodes[cur.index()];
                let (mask, dist) = node.intersect(&frame, ray.far);

                cur = match mask {
                    0b11 => {
                        let (near, far) = if dist[1] < dist[0] { (1, 0) } else { (0, 1) };
                        stack.push(StackItem::new(node.children[far], dist[far]));
                        node.children[near]
                    }
                    0b01 => node.children[0],
                    0b10 => node.children[1],
                    _ => match stack.pop() {
                        Some(item) => item.node,
                        None => break 'traversal,
                    },
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

impl Intersector for Bvh2Intersector<'_> {
    fn traverse(&self, ray: &Ray, hit: &mut Hit) {
        self.traverse_with_stats(ray, hit, &mut TraversalStats::default());
    }

    fn occluded(&self, ray: &Ray) -> bool {
        self.occluded_with_stats(ray, &mut TraversalStats::default())
    }
}
