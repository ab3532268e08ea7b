//! Triangles and four-wide triangle batches.
//!
//! Leaves address runs of [`Triangle4`] records: four triangles stored as
//! structure-of-arrays lanes, so a leaf is intersected one batch at a time.

use bvhtrace_math::{Aabb3, Point3, Tolerance, Vec3};

use crate::ray::{Hit, Ray, INVALID_ID};

/// Parameters of a ray-triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray.
    pub t: f32,
    /// Barycentric weight of `v1`.
    pub u: f32,
    /// Barycentric weight of `v2`.
    pub v: f32,
}

/// A single triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex.
    pub v0: Point3,
    /// Second vertex.
    pub v1: Point3,
    /// Third vertex.
    pub v2: Point3,
}

impl Triangle {
    /// Create a triangle from its vertices.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Bounding box of the three vertices.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points([&self.v0, &self.v1, &self.v2])
    }

    /// Centroid of the three vertices.
    pub fn centroid(&self) -> Point3 {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// True if every vertex coordinate is finite.
    pub fn is_finite(&self) -> bool {
        [self.v0, self.v1, self.v2]
            .iter()
            .all(|p| p.iter().all(|c| c.is_finite()))
    }

    /// Intersect the ray with this triangle inside `[ray.near, ray.far]`.
    pub fn intersect(&self, ray: &Ray) -> Option<TriangleHit> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        moller_trumbore(&ray.origin, &ray.dir, &self.v0, &e1, &e2)
            .filter(|h| h.t >= ray.near && h.t <= ray.far)
    }
}

/// Möller–Trumbore ray-triangle test with precomputed edges.
///
/// Returns the hit regardless of the sign of `t`; callers apply the window.
/// Barycentric bounds are inclusive so edges shared by two triangles are hit
/// by both.
#[inline]
fn moller_trumbore(
    origin: &Point3,
    dir: &Vec3,
    v0: &Point3,
    e1: &Vec3,
    e2: &Vec3,
) -> Option<TriangleHit> {
    let p = dir.cross(e2);
    let det = e1.dot(&p);
    if Tolerance::DEFAULT.is_degenerate(det) {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = origin - v0;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(e1);
    let v = dir.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(&q) * inv_det;
    Some(TriangleHit { t, u, v })
}

/// Four triangles in structure-of-arrays layout.
///
/// Each coordinate array holds one component for all four lanes. Lanes whose
/// `prim_ids` entry is [`INVALID_ID`] are padding and never intersect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle4 {
    v0: [[f32; 4]; 3],
    e1: [[f32; 4]; 3],
    e2: [[f32; 4]; 3],
    geom_ids: [u32; 4],
    prim_ids: [u32; 4],
}

impl Triangle4 {
    /// Number of lanes.
    pub const WIDTH: usize = 4;

    /// A batch with every lane unused.
    pub fn empty() -> Self {
        Self {
            v0: [[0.0; 4]; 3],
            e1: [[0.0; 4]; 3],
            e2: [[0.0; 4]; 3],
            geom_ids: [INVALID_ID; 4],
            prim_ids: [INVALID_ID; 4],
        }
    }

    /// Pack up to four `(triangle, geom_id, prim_id)` entries; the rest stay unused.
    ///
    /// # Panics
    ///
    /// Panics if more than four entries are given.
    pub fn from_triangles(entries: &[(Triangle, u32, u32)]) -> Self {
        assert!(entries.len() <= Self::WIDTH, "a Triangle4 holds at most 4 triangles");
        let mut batch = Self::empty();
        for (lane, (tri, geom_id, prim_id)) in entries.iter().enumerate() {
            batch.set(lane, tri, *geom_id, *prim_id);
        }
        batch
    }

    /// Store a triangle in `lane`.
    pub fn set(&mut self, lane: usize, tri: &Triangle, geom_id: u32, prim_id: u32) {
        let e1 = tri.v1 - tri.v0;
        let e2 = tri.v2 - tri.v0;
        for axis in 0..3 {
            self.v0[axis][lane] = tri.v0[axis];
            self.e1[axis][lane] = e1[axis];
            self.e2[axis][lane] = e2[axis];
        }
        self.geom_ids[lane] = geom_id;
        self.prim_ids[lane] = prim_id;
    }

    /// True if `lane` holds a triangle.
    #[inline]
    pub fn is_valid(&self, lane: usize) -> bool {
        self.prim_ids[lane] != INVALID_ID
    }

    /// Number of lanes holding a triangle.
    pub fn len(&self) -> usize {
        (0..Self::WIDTH).filter(|&lane| self.is_valid(lane)).count()
    }

    /// True if no lane holds a triangle.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(geom_id, prim_id)` of `lane`.
    pub fn ids(&self, lane: usize) -> (u32, u32) {
        (self.geom_ids[lane], self.prim_ids[lane])
    }

    /// Rebuild the triangle stored in `lane`.
    pub fn triangle(&self, lane: usize) -> Option<Triangle> {
        if !self.is_valid(lane) {
            return None;
        }
        let v0 = self.lane_v0(lane);
        Some(Triangle::new(v0, v0 + self.lane_e1(lane), v0 + self.lane_e2(lane)))
    }

    /// Bounding box of the valid lanes.
    pub fn bounds(&self) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        for tri in (0..Self::WIDTH).filter_map(|lane| self.triangle(lane)) {
            aabb.include_aabb(&tri.bounds());
        }
        aabb
    }

    /// Update `hit` with the closest lane intersection in `[ray.near, hit.t]`.
    ///
    /// Returns true if `hit` was updated. An exact tie with an existing hit
    /// keeps the existing one.
    #[inline]
    pub fn intersect(&self, ray: &Ray, hit: &mut Hit) -> bool {
        let mut updated = false;
        for lane in 0..Self::WIDTH {
            if !self.is_valid(lane) {
                continue;
            }
            let Some(h) = self.intersect_lane(ray, lane) else {
                continue;
            };
            let closer = h.t < hit.t || (h.t == hit.t && !hit.is_hit());
            if h.t >= ray.near && closer {
                hit.t = h.t;
                hit.u = h.u;
                hit.v = h.v;
                hit.geom_id = self.geom_ids[lane];
                hit.prim_id = self.prim_ids[lane];
                updated = true;
            }
        }
        updated
    }

    /// True if any lane intersects the ray inside `[ray.near, ray.far]`.
    #[inline]
    pub fn occluded(&self, ray: &Ray) -> bool {
        (0..Self::WIDTH).any(|lane| {
            self.is_valid(lane)
                && self
                    .intersect_lane(ray, lane)
                    .is_some_and(|h| h.t >= ray.near && h.t <= ray.far)
        })
    }

    #[inline]
    fn intersect_lane(&self, ray: &Ray, lane: usize) -> Option<TriangleHit> {
        moller_trumbore(
            &ray.origin,
            &ray.dir,
            &self.lane_v0(lane),
            &self.lane_e1(lane),
            &self.lane_e2(lane),
        )
    }

    #[inline]
    fn lane_v0(&self, lane: usize) -> Point3 {
        Point3::new(self.v0[0][lane], self.v0[1][lane], self.v0[2][lane])
    }

    #[inline]
    fn lane_e1(&self, lane: usize) -> Vec3 {
        Vec3::new(self.e1[0][lane], self.e1[1][lane], self.e1[2][lane])
    }

    #[inline]
    fn lane_e2(&self, lane: usize) -> Vec3 {
        Vec3::new(self.e2[0][lane], self.e2[1][lane], self.e2[2][lane])
    }
}

impl Default for Triangle4 {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn xy_triangle(z: f32) -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(0.0, 1.0, z),
        )
    }

    fn down_ray(x: f32, y: f32) -> Ray {
        Ray::new(Point3::new(x, y, 10.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn test_triangle_hit() {
        let hit = xy_triangle(0.0).intersect(&down_ray(0.25, 0.5)).unwrap();
        assert_relative_eq!(hit.t, 10.0);
        assert_relative_eq!(hit.u, 0.25);
        assert_relative_eq!(hit.v, 0.5);
    }

    #[test]
    fn test_triangle_miss_outside() {
        assert!(xy_triangle(0.0).intersect(&down_ray(0.75, 0.75)).is_none());
        assert!(xy_triangle(0.0).intersect(&down_ray(-0.1, 0.5)).is_none());
    }

    #[test]
    fn test_triangle_window() {
        let tri = xy_triangle(0.0);
        assert!(tri.intersect(&down_ray(0.2, 0.2).with_range(0.0, 9.0)).is_none());
        assert!(tri.intersect(&down_ray(0.2, 0.2).with_range(10.0, 10.0)).is_some());
        // Triangle behind the origin
        assert!(xy_triangle(20.0).intersect(&down_ray(0.2, 0.2)).is_none());
    }

    #[test]
    fn test_parallel_ray_misses() {
        let ray = Ray::new(Point3::new(-1.0, 0.2, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(xy_triangle(0.0).intersect(&ray).is_none());
    }

    #[test]
    fn test_triangle4_roundtrip_lanes() {
        let batch =
            Triangle4::from_triangles(&[(xy_triangle(1.0), 3, 7), (xy_triangle(2.0), 3, 8)]);
        assert_eq!(batch.len(), 2);
        assert!(batch.is_valid(1));
        assert!(!batch.is_valid(2));
        assert_eq!(batch.ids(1), (3, 8));
        assert_eq!(batch.triangle(0), Some(xy_triangle(1.0)));
        assert_eq!(batch.triangle(3), None);

        let b = batch.bounds();
        assert_eq!(b.min.z, 1.0);
        assert_eq!(b.max.z, 2.0);
        assert!(Triangle4::empty().bounds().is_empty());
    }

    #[test]
    fn test_triangle4_closest_lane() {
        let batch = Triangle4::from_triangles(&[
            (xy_triangle(1.0), 0, 10),
            (xy_triangle(5.0), 0, 11),
            (xy_triangle(3.0), 0, 12),
        ]);
        let ray = down_ray(0.1, 0.1);
        let mut hit = Hit::new(&ray);
        assert!(batch.intersect(&ray, &mut hit));
        assert_eq!(hit.prim_id, 11);
        assert_relative_eq!(hit.t, 5.0);

        // A second pass finds nothing closer
        assert!(!batch.intersect(&ray, &mut hit));
    }

    #[test]
    fn test_triangle4_respects_current_hit() {
        let batch = Triangle4::from_triangles(&[(xy_triangle(0.0), 0, 1)]);
        let ray = down_ray(0.1, 0.1);
        let mut hit = Hit::with_far(5.0);
        assert!(!batch.intersect(&ray, &mut hit));
        assert!(!hit.is_hit());
    }

    #[test]
    fn test_triangle4_occluded() {
        let batch =
            Triangle4::from_triangles(&[(xy_triangle(0.0), 0, 1), (xy_triangle(4.0), 0, 2)]);
        let ray = down_ray(0.1, 0.1);
        assert!(batch.occluded(&ray));
        assert!(batch.occluded(&ray.with_range(0.0, 6.0)));
        assert!(!batch.occluded(&ray.with_range(0.0, 5.0)));
        assert!(!Triangle4::empty().occluded(&ray));
    }
}
