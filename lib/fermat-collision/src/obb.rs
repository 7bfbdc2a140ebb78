//! OBB-tree bounding volume hierarchy over a set of leaf shapes.
//!
//! Leaves wrap a single placed shape; internal nodes hold an OBB fit
//! around their two children. Overlap queries descend into the child
//! with the larger volume first, on the heuristic that it is more likely
//! to prune a branch early.

use fermat_math::{Matrix3, Vector3};

use crate::sat::Obb;
use crate::shapes::{Pose, Shape};

pub enum ObbNode {
    Leaf { obb: Obb, shape_index: usize },
    Internal { obb: Obb, left: Box<ObbNode>, right: Box<ObbNode> },
}

impl ObbNode {
    pub fn obb(&self) -> &Obb {
        match self {
            ObbNode::Leaf { obb, .. } => obb,
            ObbNode::Internal { obb, .. } => obb,
        }
    }
}

/// How an internal node's orientation is chosen from the points of its
/// subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitMode {
    /// Principal axes of the point covariance (tight, but a single matrix
    /// eigendecomposition per node).
    Covariance,
    /// Samples `num_rot` candidate rotations per world axis around the
    /// covariance estimate and keeps whichever yields the smallest merged
    /// volume. Cheaper per node, no eigendecomposition, at the cost of
    /// being only as good as the sampled angles.
    Naive { num_rot: u32 },
}

/// Whether leaves are split top-down (recursive median partition) or
/// merged bottom-up (repeated minimum-volume pairing).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairOrder {
    TopDown,
    BottomUp,
}

/// Construction parameters for [`ObbTree::build_with_flags`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildFlags {
    pub fit: FitMode,
    pub order: PairOrder,
    /// Upper bound on worker threads `build_with_flags` may hand off to
    /// `rayon::join` while recursing a top-down split. Unused by the
    /// bottom-up builder, which is inherently sequential.
    pub threads: usize,
}

impl BuildFlags {
    pub fn new() -> BuildFlags {
        BuildFlags { fit: FitMode::Covariance, order: PairOrder::TopDown, threads: 1 }
    }
}

impl Default for BuildFlags {
    fn default() -> BuildFlags {
        BuildFlags::new()
    }
}

/// A BVH over a fixed set of `(shape, pose)` leaves. Construction is
/// single-threaded unless the `rayon` feature is active and
/// [`BuildFlags::threads`] requests more than one thread (top-down
/// builds only).
pub struct ObbTree {
    root: Option<ObbNode>,
    leaf_count: usize,
}

impl ObbTree {
    pub fn build(leaves: &[(Shape, Pose)]) -> ObbTree {
        ObbTree::build_with_flags(leaves, BuildFlags::default())
    }

    pub fn build_with_flags(leaves: &[(Shape, Pose)], flags: BuildFlags) -> ObbTree {
        if leaves.is_empty() {
            return ObbTree { root: None, leaf_count: 0 };
        }
        if flags.threads > 1 {
            log::debug!("OBB tree build: {} leaves across up to {} threads", leaves.len(), flags.threads);
        }

        let mut indices: Vec<usize> = (0..leaves.len()).collect();
        let root = match flags.order {
            PairOrder::TopDown => build_recursive(leaves, &mut indices, flags),
            PairOrder::BottomUp => build_bottom_up(leaves, &indices, flags),
        };
        ObbTree { root: Some(root), leaf_count: leaves.len() }
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    pub fn root_obb(&self) -> Option<&Obb> {
        self.root.as_ref().map(ObbNode::obb)
    }

    /// Traverses both trees together, invoking `on_leaf_pair` for every
    /// pair of leaves whose OBBs overlap. Descends into the larger-volume
    /// child first at every internal/internal split.
    pub fn traverse_pairs(a: &ObbTree, b: &ObbTree, on_leaf_pair: &mut dyn FnMut(usize, usize) -> bool) {
        if let (Some(ra), Some(rb)) = (&a.root, &b.root) {
            traverse_node_pair(ra, rb, on_leaf_pair);
        }
    }

    /// Visits every leaf whose OBB overlaps `obb`.
    pub fn query(&self, obb: &Obb, on_leaf: &mut dyn FnMut(usize)) {
        if let Some(root) = &self.root {
            query_node(root, obb, on_leaf);
        }
    }
}

/// Descends into whichever side has the larger OBB, on the heuristic that
/// splitting the bigger volume prunes the pair search faster. Returns
/// `false` once `on_leaf_pair` asks to stop.
fn traverse_node_pair(a: &ObbNode, b: &ObbNode, on_leaf_pair: &mut dyn FnMut(usize, usize) -> bool) -> bool {
    if !a.obb().overlaps(b.obb()) {
        return true;
    }

    match (a, b) {
        (ObbNode::Leaf { shape_index: ia, .. }, ObbNode::Leaf { shape_index: ib, .. }) => {
            on_leaf_pair(*ia, *ib)
        }
        (ObbNode::Internal { left, right, .. }, _) if matches!(b, ObbNode::Leaf { .. }) || a.obb().volume() >= b.obb().volume() => {
            traverse_node_pair(left, b, on_leaf_pair) && traverse_node_pair(right, b, on_leaf_pair)
        }
        (_, ObbNode::Internal { left, right, .. }) => {
            traverse_node_pair(a, left, on_leaf_pair) && traverse_node_pair(a, right, on_leaf_pair)
        }
        _ => unreachable!("both leaves handled above, and one side must be internal here"),
    }
}

fn query_node(node: &ObbNode, obb: &Obb, on_leaf: &mut dyn FnMut(usize)) {
    if !node.obb().overlaps(obb) {
        return;
    }
    match node {
        ObbNode::Leaf { shape_index, .. } => on_leaf(*shape_index),
        ObbNode::Internal { left, right, .. } => {
            query_node(left, obb, on_leaf);
            query_node(right, obb, on_leaf);
        }
    }
}

fn build_recursive(leaves: &[(Shape, Pose)], indices: &mut [usize], flags: BuildFlags) -> ObbNode {
    if indices.len() == 1 {
        let i = indices[0];
        return ObbNode::Leaf { obb: fit_leaf(&leaves[i].0, &leaves[i].1), shape_index: i };
    }

    let points = leaf_centers(leaves, indices);
    let axes = fit_axes_for_points(&points, flags.fit);
    let split = partition_by_longest_axis(leaves, indices, &axes);

    let (left_idx, right_idx) = indices.split_at_mut(split);

    #[cfg(feature = "rayon")]
    let (left, right) = if flags.threads > 1 && left_idx.len() > 64 {
        let half = flags.threads / 2;
        let left_flags = BuildFlags { threads: half.max(1), ..flags };
        let right_flags = BuildFlags { threads: (flags.threads - half).max(1), ..flags };
        rayon::join(
            || build_recursive(leaves, left_idx, left_flags),
            || build_recursive(leaves, right_idx, right_flags),
        )
    } else {
        let solo = BuildFlags { threads: 1, ..flags };
        (build_recursive(leaves, left_idx, solo), build_recursive(leaves, right_idx, solo))
    };

    #[cfg(not(feature = "rayon"))]
    let (left, right) = {
        let solo = BuildFlags { threads: 1, ..flags };
        (build_recursive(leaves, left_idx, solo), build_recursive(leaves, right_idx, solo))
    };

    let obb = Obb::merge(axes, left.obb(), right.obb());
    ObbNode::Internal { obb, left: Box::new(left), right: Box::new(right) }
}

/// Repeatedly merges whichever pair of nodes (leaf or already-merged
/// subtree) yields the smallest combined OBB volume, until one root
/// remains. Brute-force `O(n^2)` per merge; fine for the per-geom leaf
/// counts this tree is built over, and construction only happens when a
/// geom is marked dirty.
fn build_bottom_up(leaves: &[(Shape, Pose)], indices: &[usize], flags: BuildFlags) -> ObbNode {
    let mut nodes: Vec<ObbNode> = indices
        .iter()
        .map(|&i| ObbNode::Leaf { obb: fit_leaf(&leaves[i].0, &leaves[i].1), shape_index: i })
        .collect();

    while nodes.len() > 1 {
        let mut best: Option<(usize, usize, Obb, f64)> = None;
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let points: Vec<Vector3> = nodes[i].obb().corners().into_iter().chain(nodes[j].obb().corners()).collect();
                let axes = fit_axes_for_points(&points, flags.fit);
                let merged = Obb::merge(axes, nodes[i].obb(), nodes[j].obb());
                let volume = merged.volume();
                if best.as_ref().map_or(true, |b| volume < b.3) {
                    best = Some((i, j, merged, volume));
                }
            }
        }
        let (i, j, obb, _) = best.expect("at least two nodes remain in this branch");
        let right = nodes.remove(j);
        let left = nodes.remove(i);
        nodes.push(ObbNode::Internal { obb, left: Box::new(left), right: Box::new(right) });
    }

    nodes.pop().expect("indices is non-empty")
}

fn fit_leaf(shape: &Shape, pose: &Pose) -> Obb {
    let (inner, local_pose) = shape.resolve(pose);
    let half_extents = inner.local_half_extents();
    let center = local_pose.to_world(inner.local_center());
    Obb { center, axes: local_pose.rot, half_extents }
}

fn fit_axes_for_points(points: &[Vector3], fit: FitMode) -> Matrix3 {
    match fit {
        FitMode::Covariance => fit_axes_covariance(points),
        FitMode::Naive { num_rot } => fit_axes_naive(points, num_rot),
    }
}

/// Principal axes of the point covariance.
fn fit_axes_covariance(points: &[Vector3]) -> Matrix3 {
    Matrix3::covariance(points).symmetric_eigenvectors()
}

/// Starts from the covariance estimate and tries `num_rot` evenly spaced
/// extra rotations around each world axis, keeping whichever orientation
/// produces the smallest axis-aligned-in-that-frame bounding volume.
fn fit_axes_naive(points: &[Vector3], num_rot: u32) -> Matrix3 {
    let num_rot = num_rot.max(1);
    let mut best_axes = fit_axes_covariance(points);
    let mut best_volume = aabb_volume_in_frame(points, &best_axes);

    for axis in 0..3 {
        let unit = match axis {
            0 => Vector3::new(1.0, 0.0, 0.0),
            1 => Vector3::new(0.0, 1.0, 0.0),
            _ => Vector3::new(0.0, 0.0, 1.0),
        };
        for step in 0..num_rot {
            let angle = std::f64::consts::FRAC_PI_2 * (step as f64 + 1.0) / (num_rot as f64 + 1.0);
            let candidate = best_axes * Matrix3::from_axis_angle(unit, angle);
            let volume = aabb_volume_in_frame(points, &candidate);
            if volume < best_volume {
                best_volume = volume;
                best_axes = candidate;
            }
        }
    }

    best_axes
}

fn aabb_volume_in_frame(points: &[Vector3], axes: &Matrix3) -> f64 {
    let axes_t = axes.transpose();
    let mut min = Vector3::splat(f64::MAX);
    let mut max = Vector3::splat(f64::MIN);
    for &p in points {
        let local = axes_t.mul_vec(p);
        min = min.min(local);
        max = max.max(local);
    }
    let extent = max - min;
    (extent.x * extent.y * extent.z).max(0.0)
}

fn leaf_centers(leaves: &[(Shape, Pose)], indices: &[usize]) -> Vec<Vector3> {
    indices
        .iter()
        .map(|&i| {
            let (inner, pose) = leaves[i].0.resolve(&leaves[i].1);
            pose.to_world(inner.local_center())
        })
        .collect()
}

fn partition_by_longest_axis(leaves: &[(Shape, Pose)], indices: &mut [usize], axes: &Matrix3) -> usize {
    let axes_t = axes.transpose();
    indices.sort_by(|&a, &b| {
        let ca = project_center(leaves, a, &axes_t);
        let cb = project_center(leaves, b, &axes_t);
        ca.partial_cmp(&cb).unwrap()
    });
    indices.len() / 2
}

fn project_center(leaves: &[(Shape, Pose)], index: usize, axes_t: &Matrix3) -> f64 {
    let (inner, pose) = leaves[index].0.resolve(&leaves[index].1);
    let world = pose.to_world(inner.local_center());
    axes_t.mul_vec(world).x
}
