//! Shape statistics of a finished hierarchy.

use bvhtrace::{Bvh, Hierarchy, WideNode};
use serde::{Deserialize, Serialize};

/// Counts describing a finished hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Interior nodes.
    pub interior_nodes: usize,
    /// Non-empty leaves.
    pub leaves: usize,
    /// `Triangle4` records.
    pub primitive_groups: usize,
    /// Triangles stored.
    pub triangles: usize,
    /// Deepest interior-node level reached.
    pub depth: usize,
}

impl BuildStats {
    /// Walk `bvh` from the root.
    pub fn from_bvh<N: WideNode>(bvh: &Bvh<N>) -> Self {
        let mut stats = Self {
            primitive_groups: bvh.primitives().len(),
            triangles: bvh.triangle_count(),
            ..Default::default()
        };
        if bvh.is_empty() {
            return stats;
        }

        let nodes = bvh.nodes();
        let mut pending = vec![(0usize, 1usize)];
        while let Some((index, depth)) = pending.pop() {
            stats.interior_nodes += 1;
            stats.depth = stats.depth.max(depth);
            for slot in 0..N::ARITY {
                let child = nodes[index].child(slot);
                if !child.is_leaf() {
                    pending.push((child.index(), depth + 1));
                } else if child.count() > 0 {
                    stats.leaves += 1;
                }
            }
        }
        stats
    }

    /// Statistics of a hierarchy of either arity.
    pub fn from_hierarchy(hierarchy: &Hierarchy) -> Self {
        match hierarchy {
            Hierarchy::Binary(bvh) => Self::from_bvh(bvh),
            Hierarchy::Quaternary(bvh) => Self::from_bvh(bvh),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvhtrace::{Bvh2, Node2, NodeRef, Triangle, Triangle4};
    use bvhtrace_math::Point3;

    #[test]
    fn test_counts() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let group = Triangle4::from_triangles(&[(tri, 0, 0), (tri, 0, 1)]);
        let bounds = tri.bounds();
        let nodes = vec![
            Node2::new(
                (bounds, NodeRef::node(1).unwrap()),
                (bounds, NodeRef::leaf(0, 1).unwrap()),
            ),
            Node2::single((bounds, NodeRef::leaf(1, 1).unwrap())),
        ];
        let bvh = Bvh2::from_parts(nodes, vec![group, group], 2).unwrap();
        let stats = BuildStats::from_bvh(&bvh);
        assert_eq!(
            stats,
            BuildStats {
                interior_nodes: 2,
                leaves: 2,
                primitive_groups: 2,
                triangles: 4,
                depth: 2,
            }
        );
        assert_eq!(BuildStats::from_bvh(&Bvh2::empty()), BuildStats::default());
    }

    #[test]
    fn test_toml_report_roundtrip() {
        let stats = BuildStats {
            interior_nodes: 7,
            leaves: 8,
            primitive_groups: 9,
            triangles: 33,
            depth: 3,
        };
        let text = toml::to_string(&stats).unwrap();
        assert!(text.contains("primitive_groups = 9"));
        let parsed: BuildStats = toml::from_str(&text).unwrap();
        assert_eq!(parsed, stats);
    }
}
