#![warn(missing_docs)]

//! Reference hierarchy builder for `bvhtrace`.
//!
//! Builds a binary tree over triangles with a binned surface area heuristic
//! (or centroid median splits), then lowers it into either traversal layout:
//! binary nodes directly, or quaternary nodes by collapsing pairs of levels.
//! Both layouts end up with the same leaves.
//!
//! # Example
//!
//! ```ignore
//! use bvhtrace::{Arity, Intersector, Ray};
//! use bvhtrace_build::{build_hierarchy, BuildSettings};
//!
//! let settings = BuildSettings::from_toml_str("max_leaf_triangles = 8")?;
//! let hierarchy = build_hierarchy(&triangles, Arity::Quaternary, &settings)?;
//! let hit = hierarchy.intersector().intersect(&ray);
//! ```

pub mod error;
mod flatten;
pub mod mesh;
pub mod settings;
pub mod stats;
mod tree;

pub use error::{BuildError, Result};
pub use mesh::TriangleMesh;
pub use settings::{BuildSettings, SplitMethod, MAX_LEAF_TRIANGLES};
pub use stats::BuildStats;

use bvhtrace::{Arity, Bvh2, Bvh4, Hierarchy, Triangle};

use crate::flatten::{flatten_bvh2, flatten_bvh4};
use crate::tree::{build_tree, BuildNode, BuildPrim};

/// Build a binary hierarchy. Triangles get `geom_id` 0 and their slice index
/// as `prim_id`.
pub fn build_bvh2(triangles: &[Triangle], settings: &BuildSettings) -> Result<Bvh2> {
    let ids = plain_ids(triangles.len());
    let (tree, order) = build_binary_tree(triangles, settings)?;
    let bvh = flatten_bvh2(&tree, triangles, &ids, &order)?;
    log_stats(Arity::Binary, &BuildStats::from_bvh(&bvh));
    Ok(bvh)
}

/// Build a quaternary hierarchy. Ids are assigned as in [`build_bvh2`].
pub fn build_bvh4(triangles: &[Triangle], settings: &BuildSettings) -> Result<Bvh4> {
    let ids = plain_ids(triangles.len());
    let (tree, order) = build_binary_tree(triangles, settings)?;
    let bvh = flatten_bvh4(&tree, triangles, &ids, &order)?;
    log_stats(Arity::Quaternary, &BuildStats::from_bvh(&bvh));
    Ok(bvh)
}

/// Build a hierarchy of the requested arity.
pub fn build_hierarchy(
    triangles: &[Triangle],
    arity: Arity,
    settings: &BuildSettings,
) -> Result<Hierarchy> {
    Ok(match arity {
        Arity::Binary => build_bvh2(triangles, settings)?.into(),
        Arity::Quaternary => build_bvh4(triangles, settings)?.into(),
    })
}

/// Build a binary hierarchy over several meshes. Each triangle's `geom_id` is
/// its mesh's index and `prim_id` its index within that mesh.
pub fn build_bvh2_from_meshes(meshes: &[TriangleMesh], settings: &BuildSettings) -> Result<Bvh2> {
    let (triangles, ids) = gather_meshes(meshes)?;
    let (tree, order) = build_binary_tree(&triangles, settings)?;
    let bvh = flatten_bvh2(&tree, &triangles, &ids, &order)?;
    log_stats(Arity::Binary, &BuildStats::from_bvh(&bvh));
    Ok(bvh)
}

/// Build a quaternary hierarchy over several meshes. Ids are assigned as in
/// [`build_bvh2_from_meshes`].
pub fn build_bvh4_from_meshes(meshes: &[TriangleMesh], settings: &BuildSettings) -> Result<Bvh4> {
    let (triangles, ids) = gather_meshes(meshes)?;
    let (tree, order) = build_binary_tree(&triangles, settings)?;
    let bvh = flatten_bvh4(&tree, &triangles, &ids, &order)?;
    log_stats(Arity::Quaternary, &BuildStats::from_bvh(&bvh));
    Ok(bvh)
}

fn plain_ids(len: usize) -> Vec<(u32, u32)> {
    (0..len).map(|i| (0, i as u32)).collect()
}

fn gather_meshes(meshes: &[TriangleMesh]) -> Result<(Vec<Triangle>, Vec<(u32, u32)>)> {
    let mut triangles = Vec::new();
    let mut ids = Vec::new();
    for (geom_id, mesh) in meshes.iter().enumerate() {
        let tris = mesh.triangles()?;
        ids.extend((0..tris.len()).map(|prim_id| (geom_id as u32, prim_id as u32)));
        triangles.extend(tris);
    }
    Ok((triangles, ids))
}

fn build_binary_tree(
    triangles: &[Triangle],
    settings: &BuildSettings,
) -> Result<(BuildNode, Vec<BuildPrim>)> {
    settings.validate()?;
    if triangles.is_empty() {
        return Err(BuildError::EmptyInput);
    }

    let mut prims = triangles
        .iter()
        .enumerate()
        .map(|(index, tri)| {
            if !tri.is_finite() {
                return Err(BuildError::DegenerateTriangle(index));
            }
            Ok(BuildPrim {
                index,
                aabb: tri.bounds(),
                centroid: tri.centroid(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let tree = build_tree(&mut prims, settings);
    Ok((tree, prims))
}

fn log_stats(arity: Arity, stats: &BuildStats) {
    log::debug!(
        "built {}-ary hierarchy: {} nodes, {} leaves, {} groups, {} triangles, depth {}",
        arity.value(),
        stats.interior_nodes,
        stats.leaves,
        stats.primitive_groups,
        stats.triangles,
        stats.depth
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvhtrace::{Intersector, Ray};
    use bvhtrace_math::{Point3, Vec3};

    fn fan(n: usize) -> Vec<Triangle> {
        (0..n)
            .map(|i| {
                let x = i as f32;
                Triangle::new(
                    Point3::new(x, 0.0, 0.0),
                    Point3::new(x + 0.5, 0.0, 0.0),
                    Point3::new(x, 1.0, 0.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let settings = BuildSettings::default();
        assert!(matches!(build_bvh2(&[], &settings), Err(BuildError::EmptyInput)));
        assert!(matches!(build_bvh4(&[], &settings), Err(BuildError::EmptyInput)));
        assert!(matches!(
            build_bvh2_from_meshes(&[TriangleMesh::new()], &settings),
            Err(BuildError::EmptyInput)
        ));
    }

    #[test]
    fn test_degenerate_triangle_rejected() {
        let mut tris = fan(5);
        tris[3].v1.y = f32::NAN;
        assert!(matches!(
            build_bvh4(&tris, &BuildSettings::default()),
            Err(BuildError::DegenerateTriangle(3))
        ));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = BuildSettings {
            max_leaf_triangles: 0,
            ..Default::default()
        };
        assert!(matches!(
            build_bvh2(&fan(5), &settings),
            Err(BuildError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_single_leaf_root() {
        let tris = fan(3);
        let bvh2 = build_bvh2(&tris, &BuildSettings::default()).unwrap();
        assert_eq!(bvh2.nodes().len(), 1);
        assert_eq!(bvh2.max_depth(), 1);
        let bvh4 = build_bvh4(&tris, &BuildSettings::default()).unwrap();
        assert_eq!(bvh4.nodes().len(), 1);
        assert_eq!(bvh4.triangle_count(), 3);
    }

    #[test]
    fn test_every_triangle_findable() {
        let tris = fan(50);
        for arity in [Arity::Binary, Arity::Quaternary] {
            let hierarchy = build_hierarchy(&tris, arity, &BuildSettings::default()).unwrap();
            assert_eq!(hierarchy.arity(), arity);
            assert_eq!(hierarchy.triangle_count(), 50);
            let isect = hierarchy.intersector();
            for (i, tri) in tris.iter().enumerate() {
                let target = tri.centroid();
                let ray = Ray::new(Point3::new(target.x, target.y, 5.0), Vec3::new(0.0, 0.0, -1.0));
                let hit = isect.intersect(&ray);
                assert_eq!(hit.prim_id, i as u32, "{arity:?}");
                assert_eq!(hit.geom_id, 0);
                assert!((hit.t - 5.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_mesh_ids() {
        let a = TriangleMesh::from_triangles(&fan(6));
        let shifted: Vec<_> = fan(6)
            .into_iter()
            .map(|t| {
                let up = Vec3::y() * 5.0;
                Triangle::new(t.v0 + up, t.v1 + up, t.v2 + up)
            })
            .collect();
        let b = TriangleMesh::from_triangles(&shifted);
        let bvh = build_bvh4_from_meshes(&[a, b], &BuildSettings::default()).unwrap();
        let isect = bvhtrace::Bvh4Intersector::new(&bvh);

        let centroid = shifted[4].centroid();
        let ray = Ray::new(Point3::new(centroid.x, centroid.y, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = isect.intersect(&ray);
        assert_eq!((hit.geom_id, hit.prim_id), (1, 4));
    }
}
