#![warn(missing_docs)]

//! Math types for the bvhtrace ray traversal core.
//!
//! Thin wrappers around nalgebra providing single-precision types for
//! ray/box/triangle work: points, vectors, axis selection, bounding boxes
//! and tolerance constants.

mod aabb;

pub use aabb::Aabb3;

use nalgebra::Vector3;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f32>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f32>;

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y axis.
    Y,
    /// The Z axis.
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Index of this axis (0, 1 or 2).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Pick this axis' component out of a vector.
    #[inline]
    pub fn of(self, v: &Vec3) -> f32 {
        v[self.index()]
    }

    /// Pick this axis' coordinate out of a point.
    #[inline]
    pub fn of_point(self, p: &Point3) -> f32 {
        p[self.index()]
    }
}

/// Tolerance constants for ray and bounds comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Smallest triangle determinant treated as non-parallel.
    pub determinant: f32,
    /// Slack allowed when checking that primitives fit inside stored bounds.
    pub bounds: f32,
}

impl Tolerance {
    /// Default single-precision tolerances.
    pub const DEFAULT: Self = Self {
        determinant: 1e-12,
        bounds: 1e-4,
    };

    /// Check if a determinant is too small to divide by.
    pub fn is_degenerate(&self, det: f32) -> bool {
        det.abs() < self.determinant
    }

    /// Check if `inner` fits inside `outer`, allowing `self.bounds` slack
    /// scaled by the magnitude of the coordinates involved.
    pub fn contains(&self, outer: &Aabb3, inner: &Aabb3) -> bool {
        (0..3).all(|i| {
            let slack = self.bounds * (1.0 + outer.min[i].abs().max(outer.max[i].abs()));
            inner.min[i] >= outer.min[i] - slack && inner.max[i] <= outer.max[i] + slack
        })
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
