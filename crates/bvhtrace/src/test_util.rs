//! Hand-built hierarchies shared by the unit tests.

use bvhtrace_math::{Aabb3, Point3};

use crate::hierarchy::{Bvh2, Bvh4};
use crate::node::{Node2, Node4, NodeRef};
use crate::triangle::{Triangle, Triangle4};

/// Bounds of the unit cube `[x0, x0 + 1] x [0, 1] x [0, 1]`.
pub fn cube_bounds(x0: f32) -> Aabb3 {
    Aabb3::new(Point3::new(x0, 0.0, 0.0), Point3::new(x0 + 1.0, 1.0, 1.0))
}

/// The 12 triangles of the unit cube at `x0`.
pub fn cube_triangles(x0: f32) -> Vec<Triangle> {
    let c = |i: f32, j: f32, k: f32| Point3::new(x0 + i, j, k);
    let quads = [
        [c(0., 0., 0.), c(0., 1., 0.), c(0., 1., 1.), c(0., 0., 1.)],
        [c(1., 0., 0.), c(1., 1., 0.), c(1., 1., 1.), c(1., 0., 1.)],
        [c(0., 0., 0.), c(1., 0., 0.), c(1., 0., 1.), c(0., 0., 1.)],
        [c(0., 1., 0.), c(1., 1., 0.), c(1., 1., 1.), c(0., 1., 1.)],
        [c(0., 0., 0.), c(1., 0., 0.), c(1., 1., 0.), c(0., 1., 0.)],
        [c(0., 0., 1.), c(1., 0., 1.), c(1., 1., 1.), c(0., 1., 1.)],
    ];
    quads
        .iter()
        .flat_map(|[p0, p1, p2, p3]| [Triangle::new(*p0, *p1, *p2), Triangle::new(*p0, *p2, *p3)])
        .collect()
}

/// Pack a cube's triangles into three groups tagged with `geom_id`.
fn cube_groups(x0: f32, geom_id: u32) -> Vec<Triangle4> {
    let tris = cube_triangles(x0);
    tris.chunks(4)
        .enumerate()
        .map(|(chunk, group)| {
            let entries: Vec<_> = group
                .iter()
                .enumerate()
                .map(|(i, tri)| (*tri, geom_id, (chunk * 4 + i) as u32))
                .collect();
            Triangle4::from_triangles(&entries)
        })
        .collect()
}

fn two_cube_primitives() -> Vec<Triangle4> {
    let mut prims = cube_groups(0.0, 0);
    prims.extend(cube_groups(2.0, 1));
    prims
}

/// Unit cubes at x = 0 (geom 0) and x = 2 (geom 1) under a single binary root.
pub fn two_cubes_bvh2() -> Bvh2 {
    let root = Node2::new(
        (cube_bounds(0.0), NodeRef::leaf(0, 3).unwrap()),
        (cube_bounds(2.0), NodeRef::leaf(3, 3).unwrap()),
    );
    Bvh2::from_parts(vec![root], two_cube_primitives(), 1).unwrap()
}

/// The same two cubes under a single quaternary root with two unused slots.
pub fn two_cubes_bvh4() -> Bvh4 {
    let root = Node4::from_children(&[
        (cube_bounds(2.0), NodeRef::leaf(3, 3).unwrap()),
        (cube_bounds(0.0), NodeRef::leaf(0, 3).unwrap()),
    ]);
    Bvh4::from_parts(vec![root], two_cube_primitives(), 1).unwrap()
}

/// Primitive groups and one `(bounds, leaf)` pair per cube for a row of `n`
/// unit cubes along x (cube `i` at x = 2i, geom `i`).
pub fn cube_row(n: usize) -> (Vec<Triangle4>, Vec<(Aabb3, NodeRef)>) {
    let mut prims = Vec::new();
    let mut leaves = Vec::new();
    for i in 0..n {
        let x0 = 2.0 * i as f32;
        let offset = prims.len() as u32;
        prims.extend(cube_groups(x0, i as u32));
        leaves.push((cube_bounds(x0), NodeRef::leaf(offset, 3).unwrap()));
    }
    (prims, leaves)
}

/// Binary tree over a row of 4 cubes: root -> {node 1, node 2} -> leaves.
pub fn cube_row_bvh2() -> Bvh2 {
    let (prims, leaves) = cube_row(4);
    let left = Node2::new(leaves[0], leaves[1]);
    let right = Node2::new(leaves[2], leaves[3]);
    let root = Node2::new(
        (leaves[0].0.union(&leaves[1].0), NodeRef::node(1).unwrap()),
        (leaves[2].0.union(&leaves[3].0), NodeRef::node(2).unwrap()),
    );
    Bvh2::from_parts(vec![root, left, right], prims, 2).unwrap()
}

/// Quaternary tree over a row of 4 cubes, leaves deliberately out of x order.
pub fn cube_row_bvh4() -> Bvh4 {
    let (prims, leaves) = cube_row(4);
    let root = Node4::from_children(&[leaves[2], leaves[0], leaves[3], leaves[1]]);
    Bvh4::from_parts(vec![root], prims, 1).unwrap()
}
