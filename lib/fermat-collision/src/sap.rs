//! Sweep-and-prune broad phase: geoms are hashed into `sap_size` buckets
//! along a chosen axis by their AABB span, and only pairs sharing a
//! bucket are passed on to an exact AABB overlap check. More buckets
//! means finer partitioning and fewer spurious candidates; too few
//! collapses towards the `O(n^2)` of testing every pair.

use std::collections::HashMap;

use fermat_math::Vector3;

/// Hashed sweep-and-prune state. The sweep axis (greatest spread of
/// centres) and bucket width are both recomputed from scratch on every
/// call, which is cheap enough for the geom counts this broad phase runs
/// over.
pub struct Sap {
    size: usize,
}

impl Sap {
    pub fn new(size: usize) -> Sap {
        Sap { size: size.max(1) }
    }

    /// Returns every pair of geoms (by index into `aabbs`) that share at
    /// least one hash bucket and whose AABBs exactly overlap. Candidate
    /// pairs still need a precise shape test; SAP only prunes the search.
    pub fn candidate_pairs(&self, aabbs: &[(Vector3, Vector3)]) -> Vec<(usize, usize)> {
        if aabbs.len() < 2 {
            return Vec::new();
        }

        let axis = widest_axis(aabbs);
        let (lo, hi) = axis_range(aabbs, axis);
        let width = ((hi - lo) / self.size as f64).max(1e-9);

        let mut buckets: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, (min, max)) in aabbs.iter().enumerate() {
            let a = bucket_of(component(*min, axis), lo, width, self.size);
            let b = bucket_of(component(*max, axis), lo, width, self.size);
            for bucket in a..=b {
                buckets.entry(bucket).or_default().push(i);
            }
        }

        let mut seen = std::collections::HashSet::new();
        let mut pairs = Vec::new();
        for members in buckets.values() {
            for x in 0..members.len() {
                for y in (x + 1)..members.len() {
                    let (i, j) = (members[x].min(members[y]), members[x].max(members[y]));
                    if seen.insert((i, j)) && aabb_overlap(aabbs[i], aabbs[j]) {
                        pairs.push((i, j));
                    }
                }
            }
        }
        pairs
    }
}

impl Default for Sap {
    fn default() -> Sap {
        Sap::new(1023)
    }
}

fn component(v: Vector3, axis: usize) -> f64 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

fn widest_axis(aabbs: &[(Vector3, Vector3)]) -> usize {
    let mut mean = Vector3::zero();
    for (min, max) in aabbs {
        mean = mean + (*min + *max) * 0.5;
    }
    mean = mean / aabbs.len() as f64;

    let mut variance = [0.0f64; 3];
    for (min, max) in aabbs {
        let c = (*min + *max) * 0.5;
        variance[0] += (c.x - mean.x).powi(2);
        variance[1] += (c.y - mean.y).powi(2);
        variance[2] += (c.z - mean.z).powi(2);
    }
    (0..3).max_by(|&a, &b| variance[a].partial_cmp(&variance[b]).unwrap()).unwrap()
}

fn axis_range(aabbs: &[(Vector3, Vector3)], axis: usize) -> (f64, f64) {
    let mut lo = f64::MAX;
    let mut hi = f64::MIN;
    for (min, max) in aabbs {
        lo = lo.min(component(*min, axis));
        hi = hi.max(component(*max, axis));
    }
    (lo, hi)
}

fn bucket_of(value: f64, lo: f64, width: f64, size: usize) -> i64 {
    (((value - lo) / width) as i64).clamp(0, size as i64 - 1)
}

fn aabb_overlap(a: (Vector3, Vector3), b: (Vector3, Vector3)) -> bool {
    let (a_min, a_max) = a;
    let (b_min, b_max) = b;
    a_min.x <= b_max.x
        && a_max.x >= b_min.x
        && a_min.y <= b_max.y
        && a_max.y >= b_min.y
        && a_min.z <= b_max.z
        && a_max.z >= b_min.z
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn overlapping_intervals_produce_a_pair() {
        let sap = Sap::new(16);
        let aabbs = vec![
            (Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 1.0, 1.0)),
            (Vector3::new(1.0, 0.0, 0.0), Vector3::new(3.0, 1.0, 1.0)),
        ];
        let pairs = sap.candidate_pairs(&aabbs);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn disjoint_intervals_produce_no_pair() {
        let sap = Sap::new(16);
        let aabbs = vec![
            (Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)),
            (Vector3::new(5.0, 0.0, 0.0), Vector3::new(6.0, 1.0, 1.0)),
        ];
        let pairs = sap.candidate_pairs(&aabbs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn a_single_bucket_still_finds_every_overlapping_pair() {
        let sap = Sap::new(1);
        let aabbs = vec![
            (Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)),
            (Vector3::new(0.5, 0.0, 0.0), Vector3::new(1.5, 1.0, 1.0)),
            (Vector3::new(10.0, 0.0, 0.0), Vector3::new(11.0, 1.0, 1.0)),
        ];
        let pairs = sap.candidate_pairs(&aabbs);
        assert_eq!(pairs, vec![(0, 1)]);
    }
}
