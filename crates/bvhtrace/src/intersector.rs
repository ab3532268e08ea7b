//! The query contract shared by every traverser, and runtime arity selection.

use bvhtrace_math::Aabb3;

use crate::bvh2::Bvh2Intersector;
use crate::bvh4::Bvh4Intersector;
use crate::hierarchy::{Bvh2, Bvh4};
use crate::ray::{Hit, PacketHit, Ray, RayPacket, PACKET_WIDTH};
use crate::stack::stack_bound;
use crate::stats::TraversalStats;

/// Ray queries against an acceleration structure.
///
/// Implementors hold only shared references to immutable data, so one
/// intersector can serve many threads at once.
pub trait Intersector: Send + Sync {
    /// Find the closest intersection in `[ray.near, hit.t]`.
    ///
    /// `hit` is updated in place and only when a strictly closer
    /// intersection is found (or an equally close one while `hit` is still
    /// empty). On a miss it is left untouched.
    fn traverse(&self, ray: &Ray, hit: &mut Hit);

    /// True if any intersection exists in `[ray.near, ray.far]`.
    fn occluded(&self, ray: &Ray) -> bool;

    /// Closest intersection for `ray`, starting from an empty hit.
    fn intersect(&self, ray: &Ray) -> Hit {
        let mut hit = Hit::new(ray);
        self.traverse(ray, &mut hit);
        hit
    }

    /// Trace each active lane of `packet` independently.
    fn traverse_packet(&self, packet: &RayPacket, hit: &mut PacketHit) {
        for lane in 0..PACKET_WIDTH {
            if packet.active[lane] {
                self.traverse(&packet.rays[lane], &mut hit.hits[lane]);
            }
        }
    }

    /// Occlusion per lane; inactive lanes report `false`.
    fn occluded_packet(&self, packet: &RayPacket) -> [bool; PACKET_WIDTH] {
        let mut out = [false; PACKET_WIDTH];
        for lane in 0..PACKET_WIDTH {
            out[lane] = packet.active[lane] && self.occluded(&packet.rays[lane]);
        }
        out
    }
}

/// Branching factor of a hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Arity {
    /// Two children per node.
    #[default]
    Binary,
    /// Four children per node.
    Quaternary,
}

impl Arity {
    /// Children per node.
    pub fn value(self) -> usize {
        match self {
            Arity::Binary => 2,
            Arity::Quaternary => 4,
        }
    }

    /// Traversal stack entries needed for a hierarchy of `max_depth` levels.
    pub fn stack_bound(self, max_depth: usize) -> usize {
        stack_bound(self.value(), max_depth)
    }
}

/// A hierarchy of either arity.
#[derive(Debug, Clone, PartialEq)]
pub enum Hierarchy {
    /// Binary hierarchy.
    Binary(Bvh2),
    /// Quaternary hierarchy.
    Quaternary(Bvh4),
}

impl Hierarchy {
    /// Branching factor.
    pub fn arity(&self) -> Arity {
        match self {
            Hierarchy::Binary(_) => Arity::Binary,
            Hierarchy::Quaternary(_) => Arity::Quaternary,
        }
    }

    /// Borrow a traverser for this hierarchy.
    pub fn intersector(&self) -> AnyIntersector<'_> {
        match self {
            Hierarchy::Binary(bvh) => AnyIntersector::Binary(Bvh2Intersector::new(bvh)),
            Hierarchy::Quaternary(bvh) => AnyIntersector::Quaternary(Bvh4Intersector::new(bvh)),
        }
    }

    /// Bounds of the whole hierarchy.
    pub fn bounds(&self) -> Aabb3 {
        match self {
            Hierarchy::Binary(bvh) => bvh.bounds(),
            Hierarchy::Quaternary(bvh) => bvh.bounds(),
        }
    }

    /// Declared maximum depth.
    pub fn max_depth(&self) -> usize {
        match self {
            Hierarchy::Binary(bvh) => bvh.max_depth(),
            Hierarchy::Quaternary(bvh) => bvh.max_depth(),
        }
    }

    /// Number of triangles stored.
    pub fn triangle_count(&self) -> usize {
        match self {
            Hierarchy::Binary(bvh) => bvh.triangle_count(),
            Hierarchy::Quaternary(bvh) => bvh.triangle_count(),
        }
    }
}

impl From<Bvh2> for Hierarchy {
    fn from(bvh: Bvh2) -> Self {
        Hierarchy::Binary(bvh)
    }
}

impl From<Bvh4> for Hierarchy {
    fn from(bvh: Bvh4) -> Self {
        Hierarchy::Quaternary(bvh)
    }
}

/// Traverser for a [`Hierarchy`] of either arity.
#[derive(Debug, Clone, Copy)]
pub enum AnyIntersector<'a> {
    /// Binary traverser.
    Binary(Bvh2Intersector<'a>),
    /// Quaternary traverser.
    Quaternary(Bvh4Intersector<'a>),
}

impl AnyIntersector<'_> {
    /// Closest-hit query that also records traversal work.
    pub fn traverse_with_stats(&self, ray: &Ray, hit: &mut Hit, stats: &mut TraversalStats) {
        match self {
            AnyIntersector::Binary(isect) => isect.traverse_with_stats(ray, hit, stats),
            AnyIntersector::Quaternary(isect) => isect.traverse_with_stats(ray, hit, stats),
        }
    }

    /// Occlusion query that also records traversal work.
    pub fn occluded_with_stats(&self, ray: &Ray, stats: &mut TraversalStats) -> bool {
        match self {
            AnyIntersector::Binary(isect) => isect.occluded_with_stats(ray, stats),
            AnyIntersector::Quaternary(isect) => isect.occluded_with_stats(ray, stats),
        }
    }
}

impl Intersector for AnyIntersector<'_> {
    fn traverse(&self, ray: &Ray, hit: &mut Hit) {
        match self {
            AnyIntersector::Binary(isect) => isect.traverse(ray, hit),
            AnyIntersector::Quaternary(isect) => isect.traverse(ray, hit),
        }
    }

    fn occluded(&self, ray: &Ray) -> bool {
        match self {
            AnyIntersector::Binary(isect) => isect.occluded(ray),
            AnyIntersector::Quaternary(isect) => isect.occluded(ray),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{two_cubes_bvh2, two_cubes_bvh4};
    use bvhtrace_math::{Point3, Vec3};

    fn x_ray(origin_x: f32) -> Ray {
        Ray::new(Point3::new(origin_x, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0))
    }

    #[test]
    fn test_arity() {
        assert_eq!(Arity::Binary.value(), 2);
        assert_eq!(Arity::Quaternary.value(), 4);
        assert_eq!(Arity::Binary.stack_bound(10), 11);
        assert_eq!(Arity::Quaternary.stack_bound(10), 31);

        let h: Hierarchy = two_cubes_bvh4().into();
        assert_eq!(h.arity(), Arity::Quaternary);
        assert_eq!(h.max_depth(), 1);
        assert_eq!(h.triangle_count(), 24);
    }

    #[test]
    fn test_both_arities_agree() {
        let hierarchies = [Hierarchy::from(two_cubes_bvh2()), Hierarchy::from(two_cubes_bvh4())];
        let rays = [
            x_ray(-1.0),
            x_ray(1.5),
            Ray::new(Point3::new(4.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0)),
            Ray::new(Point3::new(0.5, 3.0, 0.5), Vec3::new(0.0, -1.0, 0.0)),
        ];
        for ray in &rays {
            let a = hierarchies[0].intersector().intersect(ray);
            let b = hierarchies[1].intersector().intersect(ray);
            assert_eq!(a.t, b.t);
            assert_eq!((a.geom_id, a.prim_id), (b.geom_id, b.prim_id));
            assert_eq!(
                hierarchies[0].intersector().occluded(ray),
                hierarchies[1].intersector().occluded(ray)
            );
        }
        assert_eq!(hierarchies[0].bounds(), hierarchies[1].bounds());
    }

    #[test]
    fn test_packet_lanes_traced_independently() {
        let h = Hierarchy::from(two_cubes_bvh2());
        let isect = h.intersector();
        let rays = [
            x_ray(-1.0),
            x_ray(-1.0).with_range(0.0, 0.5),
            Ray::new(Point3::new(5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0)),
        ];
        let packet = RayPacket::from_slice(&rays);
        let mut hits = PacketHit::new(&packet);
        isect.traverse_packet(&packet, &mut hits);

        assert_eq!(hits.hits[0].geom_id, 0);
        assert!(!hits.hits[1].is_hit());
        assert_eq!(hits.hits[1].t, 0.5);
        assert_eq!(hits.hits[2].geom_id, 1);
        assert!(!hits.hits[3].is_hit());

        assert_eq!(isect.occluded_packet(&packet), [true, false, true, false]);
    }

    #[test]
    fn test_stats_dispatch() {
        let h = Hierarchy::from(two_cubes_bvh4());
        let ray = x_ray(-1.0);
        let mut hit = Hit::new(&ray);
        let mut stats = TraversalStats::default();
        h.intersector().traverse_with_stats(&ray, &mut hit, &mut stats);
        assert_eq!(stats.nodes_visited, 1);
        assert_eq!(stats.leaves_visited, 1);
        assert!(h.intersector().occluded_with_stats(&ray, &mut stats));
        assert_eq!(stats.nodes_visited, 2);
    }
}
