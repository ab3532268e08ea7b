#![warn(missing_docs)]

//! Stack-based BVH traversal for triangle ray queries.
//!
//! Given an immutable bounding volume hierarchy over triangles, this crate
//! answers two queries without recursion: the closest intersection along a
//! ray (`traverse`) and whether anything blocks a ray segment (`occluded`).
//! Binary and quaternary hierarchies share one contract, [`Intersector`].
//!
//! # Architecture
//!
//! - [`Ray`], [`Hit`] - query inputs and the in-place result record
//! - [`Triangle`], [`Triangle4`] - single triangles and 4-wide leaf records
//! - [`node`] - packed child references and per-arity node layouts
//! - [`Bvh2`], [`Bvh4`] - validated, immutable hierarchy storage
//! - [`stack`] - fixed-capacity traversal stack and sort networks
//! - [`Bvh2Intersector`], [`Bvh4Intersector`] - the traversers
//! - [`Hierarchy`], [`AnyIntersector`] - arity chosen at runtime
//! - [`batch`] - tracing many rays on the rayon pool
//!
//! Hierarchies are produced by a builder (see the `bvhtrace-build` crate) and
//! handed over through [`Bvh::from_parts`], which rejects malformed input.
//!
//! # Example
//!
//! ```ignore
//! use bvhtrace::{Intersector, Ray};
//! use bvhtrace_build::{build_bvh4, BuildSettings};
//!
//! let bvh = build_bvh4(&triangles, &BuildSettings::default())?;
//! let isect = bvhtrace::Bvh4Intersector::new(&bvh);
//!
//! let ray = Ray::new(Point3::new(-1.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
//! let hit = isect.intersect(&ray);
//! let blocked = isect.occluded(&ray.with_range(0.0, 2.0));
//! ```

pub mod batch;
mod bvh2;
mod bvh4;
mod error;
mod hierarchy;
mod intersector;
pub mod node;
mod ray;
pub mod stack;
mod stats;
mod triangle;

#[cfg(test)]
mod test_util;

pub use bvh2::Bvh2Intersector;
pub use bvh4::Bvh4Intersector;
pub use error::{BvhError, Result};
pub use hierarchy::{Bvh, Bvh2, Bvh4};
pub use intersector::{AnyIntersector, Arity, Hierarchy, Intersector};
pub use node::{Node2, Node4, NodeRef, WideNode};
pub use ray::{Hit, PacketHit, Ray, RayPacket, INVALID_ID, PACKET_WIDTH};
pub use stack::MAX_DEPTH;
pub use stats::TraversalStats;
pub use triangle::{Triangle, Triangle4, TriangleHit};

pub use bvhtrace_math::{Aabb3, Point3, Vec3};
