//! Ray and hit records.

use bvhtrace_math::{Aabb3, Point3, Vec3};

/// Id stored in a [`Hit`] (and in unused [`Triangle4`](crate::Triangle4)
/// lanes) when no primitive has been recorded.
pub const INVALID_ID: u32 = u32::MAX;

/// Number of rays in a [`RayPacket`].
pub const PACKET_WIDTH: usize = 4;

/// A ray with an inclusive `[near, far]` parameter window.
///
/// `rdir` caches `1 / dir` component-wise so slab tests multiply instead of
/// divide. [`Ray::new`] and [`Ray::set_dir`] keep the two consistent; code
/// writing `dir` directly must update `rdir` as well.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Direction of the ray. Need not be normalized.
    pub dir: Vec3,
    /// Reciprocal of `dir`, component-wise.
    pub rdir: Vec3,
    /// Inclusive lower bound on the ray parameter.
    pub near: f32,
    /// Inclusive upper bound on the ray parameter.
    pub far: f32,
}

impl Ray {
    /// Create a ray covering `[0, inf]`.
    ///
    /// A zero direction component yields an infinite reciprocal, which the
    /// slab test rejects or accepts the same way a vanishing component would.
    pub fn new(origin: Point3, dir: Vec3) -> Self {
        Self {
            origin,
            dir,
            rdir: reciprocal(&dir),
            near: 0.0,
            far: f32::INFINITY,
        }
    }

    /// Replace the parameter window.
    pub fn with_range(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Replace the direction, recomputing the reciprocal.
    pub fn set_dir(&mut self, dir: Vec3) {
        self.dir = dir;
        self.rdir = reciprocal(&dir);
    }

    /// Evaluate the ray at parameter `t`: `origin + t * dir`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + self.dir * t
    }

    /// Test ray-AABB intersection using the slab method.
    ///
    /// Returns `Some((t_enter, t_exit))` clamped to the ray window, or `None`
    /// if the box is missed inside that window.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f32, f32)> {
        let mut t_min = self.near;
        let mut t_max = self.far;

        for axis in 0..3 {
            let (lo, hi) = if self.rdir[axis] < 0.0 {
                (aabb.max[axis], aabb.min[axis])
            } else {
                (aabb.min[axis], aabb.max[axis])
            };
            t_min = t_min.max((lo - self.origin[axis]) * self.rdir[axis]);
            t_max = t_max.min((hi - self.origin[axis]) * self.rdir[axis]);
        }

        if t_min <= t_max {
            Some((t_min, t_max))
        } else {
            None
        }
    }
}

fn reciprocal(dir: &Vec3) -> Vec3 {
    Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z)
}

/// Closest intersection found so far along a ray.
///
/// `t` starts at the ray's far bound and only ever decreases. A hit whose ids
/// are still [`INVALID_ID`] means nothing was intersected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance along the ray.
    pub t: f32,
    /// First barycentric coordinate (weight of `v1`).
    pub u: f32,
    /// Second barycentric coordinate (weight of `v2`).
    pub v: f32,
    /// Id of the geometry (mesh) the triangle belongs to.
    pub geom_id: u32,
    /// Id of the triangle within its geometry.
    pub prim_id: u32,
}

impl Hit {
    /// An empty hit for `ray`, with `t` at the ray's far bound.
    pub fn new(ray: &Ray) -> Self {
        Self::with_far(ray.far)
    }

    /// An empty hit with `t` set to `far`.
    pub fn with_far(far: f32) -> Self {
        Self {
            t: far,
            u: 0.0,
            v: 0.0,
            geom_id: INVALID_ID,
            prim_id: INVALID_ID,
        }
    }

    /// True once a primitive has been recorded.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.prim_id != INVALID_ID
    }
}

/// Up to [`PACKET_WIDTH`] rays traced together.
#[derive(Debug, Clone, Copy)]
pub struct RayPacket {
    /// The rays.
    pub rays: [Ray; PACKET_WIDTH],
    /// Which lanes carry a ray to trace.
    pub active: [bool; PACKET_WIDTH],
}

impl RayPacket {
    /// A full packet.
    pub fn new(rays: [Ray; PACKET_WIDTH]) -> Self {
        Self {
            rays,
            active: [true; PACKET_WIDTH],
        }
    }

    /// Pack up to [`PACKET_WIDTH`] rays; missing lanes are inactive.
    pub fn from_slice(rays: &[Ray]) -> Self {
        let filler = Ray::new(Point3::origin(), Vec3::zeros()).with_range(1.0, 0.0);
        let mut packet = Self {
            rays: [filler; PACKET_WIDTH],
            active: [false; PACKET_WIDTH],
        };
        for (lane, ray) in rays.iter().take(PACKET_WIDTH).enumerate() {
            packet.rays[lane] = *ray;
            packet.active[lane] = true;
        }
        packet
    }
}

/// Per-lane results of a packet query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketHit {
    /// One hit record per lane.
    pub hits: [Hit; PACKET_WIDTH],
}

impl PacketHit {
    /// Empty hits matching each lane's far bound.
    pub fn new(packet: &RayPacket) -> Self {
        Self {
            hits: packet.rays.map(|ray| Hit::new(&ray)),
        }
    }
}
