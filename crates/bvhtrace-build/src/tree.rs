//! Binary build tree over triangle references.
//!
//! Construction recursively partitions the primitive references in place,
//! so each leaf ends up owning a contiguous range of the reordered slice.

use std::ops::Range;

use bvhtrace::MAX_DEPTH;
use bvhtrace_math::{Aabb3, Axis, Point3};

use crate::settings::{BuildSettings, SplitMethod};

/// Interior depth past which every split is a median split, keeping the
/// finished tree within [`MAX_DEPTH`] for any input that fits a leaf offset.
const MEDIAN_DEPTH: usize = MAX_DEPTH / 2;

/// A triangle reference being sorted into the tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuildPrim {
    /// Index of the triangle in build input order.
    pub index: usize,
    pub aabb: Aabb3,
    pub centroid: Point3,
}

/// A build tree node - either a leaf over a range of primitives or an
/// internal node with two children.
#[derive(Debug)]
pub(crate) enum BuildNode {
    Leaf {
        aabb: Aabb3,
        prims: Range<usize>,
    },
    Internal {
        aabb: Aabb3,
        left: Box<BuildNode>,
        right: Box<BuildNode>,
    },
}

impl BuildNode {
    pub fn aabb(&self) -> &Aabb3 {
        match self {
            BuildNode::Leaf { aabb, .. } | BuildNode::Internal { aabb, .. } => aabb,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BuildNode::Leaf { .. })
    }
}

/// Build the tree, reordering `prims` so leaves address contiguous ranges.
pub(crate) fn build_tree(prims: &mut [BuildPrim], settings: &BuildSettings) -> BuildNode {
    build_node(prims, 0, 1, settings)
}

fn build_node(
    prims: &mut [BuildPrim],
    first: usize,
    depth: usize,
    settings: &BuildSettings,
) -> BuildNode {
    let mut aabb = Aabb3::empty();
    let mut centroids = Aabb3::empty();
    for p in prims.iter() {
        aabb.include_aabb(&p.aabb);
        centroids.include_point(&p.centroid);
    }

    if prims.len() <= settings.max_leaf_triangles {
        return BuildNode::Leaf {
            aabb,
            prims: first..first + prims.len(),
        };
    }

    let sah_mid = match settings.split {
        SplitMethod::Sah if depth < MEDIAN_DEPTH => {
            find_best_split(prims, &aabb, &centroids, settings)
                .map(|split| partition(prims, |p| split.goes_left(p)))
        }
        _ => None,
    };

    // Fall back to the median if SAH found nothing or put everything on one side
    let mid = match sah_mid {
        Some(mid) if mid > 0 && mid < prims.len() => mid,
        _ => median_split(prims, &centroids),
    };

    let (left, right) = prims.split_at_mut(mid);
    BuildNode::Internal {
        aabb,
        left: Box::new(build_node(left, first, depth + 1, settings)),
        right: Box::new(build_node(right, first + mid, depth + 1, settings)),
    }
}

/// A candidate plane between centroid buckets.
#[derive(Debug, Clone, Copy)]
struct SahSplit {
    axis: Axis,
    bucket: usize,
    min: f32,
    extent: f32,
    buckets: usize,
}

impl SahSplit {
    fn goes_left(&self, p: &BuildPrim) -> bool {
        let c = self.axis.of_point(&p.centroid);
        bucket_index(c, self.min, self.extent, self.buckets) < self.bucket
    }
}

fn bucket_index(c: f32, min: f32, extent: f32, buckets: usize) -> usize {
    let b = ((c - min) / extent * buckets as f32) as usize;
    b.min(buckets - 1)
}

/// Find the cheapest bucket boundary on any axis using SAH.
///
/// Cost is `traversal_cost + (A_left * N_left + A_right * N_right) / A`, with
/// one unit per triangle test.
fn find_best_split(
    prims: &[BuildPrim],
    bounds: &Aabb3,
    centroids: &Aabb3,
    settings: &BuildSettings,
) -> Option<SahSplit> {
    let buckets = settings.sah_buckets;
    let total_area = bounds.surface_area();
    if total_area <= 0.0 {
        return None;
    }

    let extent = centroids.extent();
    let mut counts = vec![0usize; buckets];
    let mut boxes = vec![Aabb3::empty(); buckets];
    let mut right_counts = vec![0usize; buckets];
    let mut right_areas = vec![0.0f32; buckets];
    let mut best: Option<(f32, SahSplit)> = None;

    for axis in Axis::ALL {
        let axis_extent = axis.of(&extent);
        if axis_extent <= 0.0 {
            continue;
        }
        let axis_min = axis.of_point(&centroids.min);

        counts.fill(0);
        boxes.fill(Aabb3::empty());
        for p in prims {
            let b = bucket_index(axis.of_point(&p.centroid), axis_min, axis_extent, buckets);
            counts[b] += 1;
            boxes[b].include_aabb(&p.aabb);
        }

        // Sweep right to left for the right-hand side of every boundary
        let mut acc = Aabb3::empty();
        let mut n = 0;
        for i in (1..buckets).rev() {
            acc.include_aabb(&boxes[i]);
            n += counts[i];
            right_counts[i] = n;
            right_areas[i] = acc.surface_area();
        }

        let mut left_bounds = Aabb3::empty();
        let mut left_count = 0;
        for split in 1..buckets {
            left_bounds.include_aabb(&boxes[split - 1]);
            left_count += counts[split - 1];
            let right_count = right_counts[split];
            if left_count == 0 || right_count == 0 {
                continue;
            }

            let left_cost = left_bounds.surface_area() * left_count as f32;
            let right_cost = right_areas[split] * right_count as f32;
            let cost = settings.traversal_cost + (left_cost + right_cost) / total_area;

            if best.map_or(true, |(best_cost, _)| cost < best_cost) {
                best = Some((
                    cost,
                    SahSplit {
                        axis,
                        bucket: split,
                        min: axis_min,
                        extent: axis_extent,
                        buckets,
                    },
                ));
            }
        }
    }

    best.map(|(_, split)| split)
}

/// Partition so that every primitive for which `goes_left` holds comes first.
/// Returns the number of those primitives.
fn partition(prims: &mut [BuildPrim], goes_left: impl Fn(&BuildPrim) -> bool) -> usize {
    let mut left = 0;
    let mut right = prims.len();

    while left < right {
        if goes_left(&prims[left]) {
            left += 1;
        } else {
            right -= 1;
            prims.swap(left, right);
        }
    }

    left
}

/// Split at the centroid median along the widest centroid axis.
fn median_split(prims: &mut [BuildPrim], centroids: &Aabb3) -> usize {
    let extent = centroids.extent();
    let axis = Axis::ALL
        .into_iter()
        .fold(Axis::X, |best, axis| if axis.of(&extent) > best.of(&extent) { axis } else { best });
    let mid = prims.len() / 2;
    prims.select_nth_unstable_by(mid, |a, b| {
        axis.of_point(&a.centroid).total_cmp(&axis.of_point(&b.centroid))
    });
    mid
}
