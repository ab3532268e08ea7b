//! Node layouts and child-reference encoding.
//!
//! A child reference is a single `u32`. With the top bit clear it indexes
//! the node array; with the top bit set it is a leaf packing a primitive
//! offset (26 bits) and a primitive-group count (5 bits):
//!
//! ```text
//!  31 | 30 ............... 5 | 4 ..... 0
//!   1 |       offset         |  count
//! ```
//!
//! Child bounds are stored per axis and side for all children of a node at
//! once (`[lower_x, upper_x, lower_y, upper_y, lower_z, upper_z]`, each row
//! one lane per child), so the slab test for every child is one fixed-width
//! pass over six rows.

use std::fmt;
use std::ops::Range;

use bvhtrace_math::{Aabb3, Point3};

use crate::error::{BvhError, Result};
use crate::ray::Ray;

const LEAF_FLAG: u32 = 1 << 31;
const COUNT_BITS: u32 = 5;
const COUNT_MASK: u32 = (1 << COUNT_BITS) - 1;

/// Largest primitive-group count a leaf can address.
pub const MAX_LEAF_COUNT: u32 = COUNT_MASK;

/// Largest primitive offset a leaf can address.
pub const MAX_LEAF_OFFSET: u32 = (LEAF_FLAG - 1) >> COUNT_BITS;

/// Packed reference to a child node or a leaf's primitive range.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeRef(u32);

impl NodeRef {
    /// The root node.
    pub const ROOT: NodeRef = NodeRef(0);

    /// A leaf with no primitives, used for unused child slots.
    pub const EMPTY: NodeRef = NodeRef(LEAF_FLAG);

    /// Reference the interior node at `index`.
    pub fn node(index: u32) -> Result<Self> {
        if index & LEAF_FLAG != 0 {
            return Err(BvhError::IndexOverflow(index));
        }
        Ok(Self(index))
    }

    /// Reference `count` primitive groups starting at `offset`.
    pub fn leaf(offset: u32, count: u32) -> Result<Self> {
        if offset > MAX_LEAF_OFFSET {
            return Err(BvhError::OffsetOverflow(offset));
        }
        if count > MAX_LEAF_COUNT {
            return Err(BvhError::CountOverflow(count));
        }
        Ok(Self(LEAF_FLAG | (offset << COUNT_BITS) | count))
    }

    /// The raw encoded value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True if this references a leaf.
    #[inline]
    pub const fn is_leaf(self) -> bool {
        self.0 & LEAF_FLAG != 0
    }

    /// Node index. Only meaningful for interior references.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// First primitive group of a leaf.
    #[inline]
    pub const fn offset(self) -> usize {
        ((self.0 & !LEAF_FLAG) >> COUNT_BITS) as usize
    }

    /// Number of primitive groups in a leaf.
    #[inline]
    pub const fn count(self) -> usize {
        (self.0 & COUNT_MASK) as usize
    }

    /// Primitive-group range of a leaf.
    #[inline]
    pub fn leaf_range(self) -> Range<usize> {
        let offset = self.offset();
        offset..offset + self.count()
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            write!(f, "Leaf({}+{})", self.offset(), self.count())
        } else {
            write!(f, "Node({})", self.index())
        }
    }
}

/// Per-ray constants for the lane-parallel slab test.
///
/// For each axis, `near_row` selects the bounds row (lower or upper) the ray
/// enters through and `far_row` the one it leaves through, so the same
/// arithmetic serves rays pointing either way without per-node branches.
#[derive(Debug, Clone, Copy)]
pub struct RayFrame {
    origin: [f32; 3],
    rdir: [f32; 3],
    near_row: [usize; 3],
    far_row: [usize; 3],
    near: f32,
}

impl RayFrame {
    /// Precompute the frame for `ray`.
    pub fn new(ray: &Ray) -> Self {
        let mut near_row = [0; 3];
        let mut far_row = [0; 3];
        for axis in 0..3 {
            let negative = ray.rdir[axis] < 0.0;
            near_row[axis] = 2 * axis + negative as usize;
            far_row[axis] = 2 * axis + (!negative) as usize;
        }
        Self {
            origin: [ray.origin.x, ray.origin.y, ray.origin.z],
            rdir: [ray.rdir.x, ray.rdir.y, ray.rdir.z],
            near_row,
            far_row,
            near: ray.near,
        }
    }

    /// Slab-test all `N` children against the window `[ray.near, t_max]`.
    ///
    /// Returns a bitmask of the children hit and each child's entry distance.
    #[inline]
    pub fn intersect<const N: usize>(&self, bounds: &[[f32; N]; 6], t_max: f32) -> (u32, [f32; N]) {
        let mut t_near = [self.near; N];
        let mut t_far = [t_max; N];
        for axis in 0..3 {
            let lo = &bounds[self.near_row[axis]];
            let hi = &bounds[self.far_row[axis]];
            for lane in 0..N {
                t_near[lane] = t_near[lane].max((lo[lane] - self.origin[axis]) * self.rdir[axis]);
                t_far[lane] = t_far[lane].min((hi[lane] - self.origin[axis]) * self.rdir[axis]);
            }
        }

        let mut mask = 0;
        for lane in 0..N {
            mask |= ((t_near[lane] <= t_far[lane]) as u32) << lane;
        }
        (mask, t_near)
    }
}

/// Operations shared by the node layouts of every arity.
pub trait WideNode: Copy + Send + Sync + 'static {
    /// Number of child slots.
    const ARITY: usize;

    /// Child reference in `slot`.
    fn child(&self, slot: usize) -> NodeRef;

    /// Bounds stored for the child in `slot`.
    fn child_bounds(&self, slot: usize) -> Aabb3;
}

fn empty_rows<const N: usize>() -> [[f32; N]; 6] {
    let mut rows = [[0.0; N]; 6];
    for axis in 0..3 {
        rows[2 * axis] = [f32::INFINITY; N];
        rows[2 * axis + 1] = [f32::NEG_INFINITY; N];
    }
    rows
}

fn write_lane<const N: usize>(rows: &mut [[f32; N]; 6], lane: usize, aabb: &Aabb3) {
    for axis in 0..3 {
        rows[2 * axis][lane] = aabb.min[axis];
        rows[2 * axis + 1][lane] = aabb.max[axis];
    }
}

fn read_lane<const N: usize>(rows: &[[f32; N]; 6], lane: usize) -> Aabb3 {
    Aabb3::new(
        Point3::new(rows[0][lane], rows[2][lane], rows[4][lane]),
        Point3::new(rows[1][lane], rows[3][lane], rows[5][lane]),
    )
}

/// Interior node of a binary hierarchy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node2 {
    /// Child bounds, one row per axis side, one lane per child.
    pub bounds: [[f32; 2]; 6],
    /// Child references.
    pub children: [NodeRef; 2],
}

impl Node2 {
    /// Node with two children.
    pub fn new(left: (Aabb3, NodeRef), right: (Aabb3, NodeRef)) -> Self {
        let mut bounds = empty_rows();
        write_lane(&mut bounds, 0, &left.0);
        write_lane(&mut bounds, 1, &right.0);
        Self {
            bounds,
            children: [left.1, right.1],
        }
    }

    /// Node whose only child is `child`; the other slot is an empty leaf.
    pub fn single(child: (Aabb3, NodeRef)) -> Self {
        Self::new(child, (Aabb3::empty(), NodeRef::EMPTY))
    }

    /// Slab-test both children; see [`RayFrame::intersect`].
    #[inline]
    pub fn intersect(&self, frame: &RayFrame, t_max: f32) -> (u32, [f32; 2]) {
        frame.intersect(&self.bounds, t_max)
    }
}

impl WideNode for Node2 {
    const ARITY: usize = 2;

    fn child(&self, slot: usize) -> NodeRef {
        self.children[slot]
    }

    fn child_bounds(&self, slot: usize) -> Aabb3 {
        read_lane(&self.bounds, slot)
    }
}

/// Interior node of a quaternary hierarchy.
///
/// Unused slots hold inverted bounds and [`NodeRef::EMPTY`], so the slab
/// test never reports them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node4 {
    /// Child bounds, one row per axis side, one lane per child.
    pub bounds: [[f32; 4]; 6],
    /// Child references.
    pub children: [NodeRef; 4],
}

impl Node4 {
    /// Node with every slot unused.
    pub fn empty() -> Self {
        Self {
            bounds: empty_rows(),
            children: [NodeRef::EMPTY; 4],
        }
    }

    /// Node with up to four children in slot order.
    ///
    /// # Panics
    ///
    /// Panics if more than four children are given.
    pub fn from_children(children: &[(Aabb3, NodeRef)]) -> Self {
        assert!(children.len() <= 4, "a Node4 holds at most 4 children");
        let mut node = Self::empty();
        for (slot, (aabb, child)) in children.iter().enumerate() {
            node.set_child(slot, aabb, *child);
        }
        node
    }

    /// Store a child in `slot`.
    pub fn set_child(&mut self, slot: usize, aabb: &Aabb3, child: NodeRef) {
        write_lane(&mut self.bounds, slot, aabb);
        self.children[slot] = child;
    }

    /// Slab-test all four children; see [`RayFrame::intersect`].
    #[inline]
    pub fn intersect(&self, frame: &RayFrame, t_max: f32) -> (u32, [f32; 4]) {
        frame.intersect(&self.bounds, t_max)
    }
}

impl Default for Node4 {
    fn default() -> Self {
        Self::empty()
    }
}

impl WideNode for Node4 {
    const ARITY: usize = 4;

    fn child(&self, slot: usize) -> NodeRef {
        self.children[slot]
    }

    fn child_bounds(&self, slot: usize) -> Aabb3 {
        read_lane(&self.bounds, slot)
    }
}
