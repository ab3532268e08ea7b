//! Immutable hierarchy storage shared by every arity.
//!
//! A hierarchy is a flat node array (root at index 0), a flat array of
//! [`Triangle4`] records addressed by leaf references, and the declared
//! maximum depth used to size traversal stacks. It is validated once on
//! construction and never mutated afterwards, so any number of traversals
//! may read it concurrently.

use bvhtrace_math::{Aabb3, Tolerance};

use crate::error::{BvhError, Result};
use crate::node::{Node2, Node4, NodeRef, WideNode};
use crate::stack::MAX_DEPTH;
use crate::triangle::Triangle4;

/// Hierarchy over nodes of type `N`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh<N: WideNode> {
    nodes: Vec<N>,
    primitives: Vec<Triangle4>,
    max_depth: usize,
}

/// Binary hierarchy.
pub type Bvh2 = Bvh<Node2>;

/// Quaternary hierarchy.
pub type Bvh4 = Bvh<Node4>;

impl<N: WideNode> Bvh<N> {
    /// Assemble a hierarchy from builder output.
    ///
    /// `max_depth` counts interior-node levels (a root whose children are all
    /// leaves has depth 1). The structure is checked before it is accepted:
    /// child indices and leaf ranges must be in bounds, the reachable depth
    /// must not exceed `max_depth` (which also rejects cycles), `max_depth`
    /// must not exceed [`MAX_DEPTH`], and each leaf's triangles must lie
    /// inside the bounds its parent stores for it.
    pub fn from_parts(nodes: Vec<N>, primitives: Vec<Triangle4>, max_depth: usize) -> Result<Self> {
        let bvh = Self {
            nodes,
            primitives,
            max_depth,
        };
        match bvh.validate() {
            Ok(depth) => {
                log::debug!(
                    "accepted {}-ary hierarchy: {} nodes, {} groups, depth {} (declared {})",
                    N::ARITY,
                    bvh.nodes.len(),
                    bvh.primitives.len(),
                    depth,
                    max_depth
                );
                Ok(bvh)
            }
            Err(err) => {
                log::warn!("rejected {}-ary hierarchy: {}", N::ARITY, err);
                Err(err)
            }
        }
    }

    /// A hierarchy with no nodes; every query misses.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            primitives: Vec::new(),
            max_depth: 0,
        }
    }

    /// Node array, root first.
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Primitive groups addressed by leaves.
    pub fn primitives(&self) -> &[Triangle4] {
        &self.primitives
    }

    /// Declared maximum depth in interior-node levels.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// True if the hierarchy has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of triangles stored (padding lanes excluded).
    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(Triangle4::len).sum()
    }

    /// Bounds of the whole hierarchy: the union of the root's child bounds.
    pub fn bounds(&self) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        if let Some(root) = self.nodes.first() {
            for slot in 0..N::ARITY {
                aabb.include_aabb(&root.child_bounds(slot));
            }
        }
        aabb
    }

    /// Walk the tree from the root, returning the depth reached.
    ///
    /// Subtrees may be shared. A node is walked again only when it is
    /// reached at a greater depth than before, so each node is expanded at
    /// most `max_depth` times.
    fn validate(&self) -> Result<usize> {
        if self.max_depth > MAX_DEPTH {
            return Err(BvhError::DepthLimit {
                max_depth: self.max_depth,
                limit: MAX_DEPTH,
            });
        }
        if self.nodes.is_empty() {
            return Ok(0);
        }

        let tol = Tolerance::DEFAULT;
        let mut deepest = 0;
        let mut seen_at = vec![0usize; self.nodes.len()];
        let mut pending = vec![(0usize, 1usize)];

        while let Some((index, depth)) = pending.pop() {
            if depth > self.max_depth {
                return Err(BvhError::DepthExceeded {
                    depth,
                    max_depth: self.max_depth,
                });
            }
            if seen_at[index] >= depth {
                continue;
            }
            seen_at[index] = depth;
            deepest = deepest.max(depth);

            let node = &self.nodes[index];
            for slot in 0..N::ARITY {
                let child = node.child(slot);
                if child.is_leaf() {
                    self.validate_leaf(index, slot, child, &node.child_bounds(slot), &tol)?;
                } else if child.index() >= self.nodes.len() {
                    return Err(BvhError::ChildOutOfRange {
                        node: index,
                        slot,
                        index: child.index(),
                        len: self.nodes.len(),
                    });
                } else {
                    pending.push((child.index(), depth + 1));
                }
            }
        }

        Ok(deepest)
    }

    fn validate_leaf(
        &self,
        node: usize,
        slot: usize,
        leaf: NodeRef,
        bounds: &Aabb3,
        tol: &Tolerance,
    ) -> Result<()> {
        let range = leaf.leaf_range();
        if range.end > self.primitives.len() {
            return Err(BvhError::LeafOutOfRange {
                node,
                slot,
                offset: range.start,
                end: range.end,
                len: self.primitives.len(),
            });
        }
        for group in &self.primitives[range] {
            let group_bounds = group.bounds();
            if !group_bounds.is_empty() && !tol.contains(bounds, &group_bounds) {
                return Err(BvhError::PrimitiveOutsideBounds { node, slot });
            }
        }
        Ok(())
    }
}

impl<N: WideNode> Default for Bvh<N> {
    fn default() -> Self {
        Self::empty()
    }
}
