//! Parallel helpers for tracing many independent rays.

use rayon::prelude::*;

use crate::intersector::Intersector;
use crate::ray::{Hit, Ray};

/// Closest hit for every ray, traced across the rayon thread pool.
///
/// Output order matches `rays`.
pub fn intersect_all<I: Intersector + ?Sized>(intersector: &I, rays: &[Ray]) -> Vec<Hit> {
    rays.par_iter().map(|ray| intersector.intersect(ray)).collect()
}

/// Occlusion result for every ray, traced across the rayon thread pool.
pub fn occluded_all<I: Intersector + ?Sized>(intersector: &I, rays: &[Ray]) -> Vec<bool> {
    rays.par_iter().map(|ray| intersector.occluded(ray)).collect()
}
