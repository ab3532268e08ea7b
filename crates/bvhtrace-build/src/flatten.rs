//! Lowering the binary build tree into traversal node arrays.
//!
//! Nodes are emitted in pre-order: a node's slot is reserved before its
//! children are flattened and filled in once their references are known.
//! Leaf bounds are taken from the packed [`Triangle4`] records themselves, so
//! the stored child bounds always cover exactly what traversal intersects.

use bvhtrace::{Bvh2, Bvh4, BvhError, Node2, Node4, NodeRef, Triangle, Triangle4};
use bvhtrace_math::Aabb3;

use crate::error::Result;
use crate::tree::{BuildNode, BuildPrim};

/// Flattened child: bounds, reference and interior depth below it.
type Child = (Aabb3, NodeRef, usize);

struct Flattener<'a, N> {
    triangles: &'a [Triangle],
    ids: &'a [(u32, u32)],
    order: &'a [BuildPrim],
    nodes: Vec<N>,
    primitives: Vec<Triangle4>,
}

impl<'a, N> Flattener<'a, N> {
    fn new(triangles: &'a [Triangle], ids: &'a [(u32, u32)], order: &'a [BuildPrim]) -> Self {
        Self {
            triangles,
            ids,
            order,
            nodes: Vec::new(),
            primitives: Vec::new(),
        }
    }

    /// Pack a leaf's triangles into `Triangle4` records.
    fn emit_leaf(&mut self, prims: &std::ops::Range<usize>) -> Result<Child> {
        let offset = self.primitives.len();
        let order = self.order;
        for chunk in order[prims.clone()].chunks(Triangle4::WIDTH) {
            let mut group = Triangle4::empty();
            for (lane, p) in chunk.iter().enumerate() {
                let (geom_id, prim_id) = self.ids[p.index];
                group.set(lane, &self.triangles[p.index], geom_id, prim_id);
            }
            self.primitives.push(group);
        }

        let mut aabb = Aabb3::empty();
        for group in &self.primitives[offset..] {
            aabb.include_aabb(&group.bounds());
        }
        let count = self.primitives.len() - offset;
        let offset = u32::try_from(offset).map_err(|_| BvhError::OffsetOverflow(u32::MAX))?;
        Ok((aabb, NodeRef::leaf(offset, count as u32)?, 0))
    }

    /// Reserve a node slot, returning its index and reference.
    fn reserve(&mut self, placeholder: N) -> Result<(usize, NodeRef)> {
        let index = self.nodes.len();
        let raw = u32::try_from(index).map_err(|_| BvhError::IndexOverflow(u32::MAX))?;
        self.nodes.push(placeholder);
        Ok((index, NodeRef::node(raw)?))
    }
}

impl Flattener<'_, Node2> {
    fn flatten(&mut self, node: &BuildNode) -> Result<Child> {
        match node {
            BuildNode::Leaf { prims, .. } => self.emit_leaf(prims),
            BuildNode::Internal { left, right, .. } => {
                let (index, this) = self.reserve(Node2::single((Aabb3::empty(), NodeRef::EMPTY)))?;
                let l = self.flatten(left)?;
                let r = self.flatten(right)?;
                self.nodes[index] = Node2::new((l.0, l.1), (r.0, r.1));
                Ok((l.0.union(&r.0), this, 1 + l.2.max(r.2)))
            }
        }
    }
}

impl Flattener<'_, Node4> {
    fn flatten(&mut self, node: &BuildNode) -> Result<Child> {
        let (left, right) = match node {
            BuildNode::Leaf { prims, .. } => return self.emit_leaf(prims),
            BuildNode::Internal { left, right, .. } => (left.as_ref(), right.as_ref()),
        };

        let children = collapse(left, right);
        let (index, this) = self.reserve(Node4::empty())?;
        let mut node4 = Node4::empty();
        let mut aabb = Aabb3::empty();
        let mut depth = 0;
        for (slot, child) in children.iter().enumerate() {
            let (child_aabb, child_ref, child_depth) = self.flatten(child)?;
            node4.set_child(slot, &child_aabb, child_ref);
            aabb.include_aabb(&child_aabb);
            depth = depth.max(child_depth);
        }
        self.nodes[index] = node4;
        Ok((aabb, this, depth + 1))
    }
}

/// Gather up to four children for one quaternary node by repeatedly opening
/// the internal child with the largest surface area.
fn collapse<'n>(left: &'n BuildNode, right: &'n BuildNode) -> Vec<&'n BuildNode> {
    let mut children = vec![left, right];
    while children.len() < 4 {
        let widest = children
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_leaf())
            .max_by(|(_, a), (_, b)| a.aabb().surface_area().total_cmp(&b.aabb().surface_area()))
            .map(|(i, _)| i);
        let Some(i) = widest else {
            break;
        };
        let node: &'n BuildNode = children[i];
        if let BuildNode::Internal { left, right, .. } = node {
            children[i] = left.as_ref();
            children.insert(i + 1, right.as_ref());
        }
    }
    children
}

/// Flatten into a binary hierarchy.
pub(crate) fn flatten_bvh2(
    tree: &BuildNode,
    triangles: &[Triangle],
    ids: &[(u32, u32)],
    order: &[BuildPrim],
) -> Result<Bvh2> {
    let mut f = Flattener::<Node2>::new(triangles, ids, order);
    let (aabb, root, depth) = f.flatten(tree)?;
    if root.is_leaf() {
        f.nodes.push(Node2::single((aabb, root)));
    }
    Ok(Bvh2::from_parts(f.nodes, f.primitives, depth.max(1))?)
}

/// Flatten into a quaternary hierarchy.
pub(crate) fn flatten_bvh4(
    tree: &BuildNode,
    triangles: &[Triangle],
    ids: &[(u32, u32)],
    order: &[BuildPrim],
) -> Result<Bvh4> {
    let mut f = Flattener::<Node4>::new(triangles, ids, order);
    let (aabb, root, depth) = f.flatten(tree)?;
    if root.is_leaf() {
        f.nodes.push(Node4::from_children(&[(aabb, root)]));
    }
    Ok(Bvh4::from_parts(f.nodes, f.primitives, depth.max(1))?)
}
