use super::{Dot, IsZero, Vector3};

/// The closest point on a shape together with the query's perpendicular
/// (or nearest-feature) direction to it — used by the sphere/box/capsule
/// separation routines in the collision dispatch table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Witness {
    pub point: Vector3,
    pub dist2: f64,
}

/// Squared distance from `p` to the segment `[a, b]`, with witness point.
pub fn dist2_point_segment(p: Vector3, a: Vector3, b: Vector3) -> Witness {
    let ab = b - a;
    let len2 = ab.magnitude_squared();
    let t = if len2.is_zero() { 0.0 } else { ((p - a).dot(ab) / len2).clamp(0.0, 1.0) };
    let closest = a + ab * t;
    Witness { point: closest, dist2: p.dist2(closest) }
}

/// Squared distance from `p` to the triangle `(a, b, c)`, with witness
/// point. Uses the classic Ericson-style region test against the
/// barycentric coordinates of the projection of `p` onto the triangle's
/// plane.
pub fn dist2_point_triangle(p: Vector3, a: Vector3, b: Vector3, c: Vector3) -> Witness {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return Witness { point: a, dist2: p.dist2(a) };
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return Witness { point: b, dist2: p.dist2(b) };
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        let closest = a + ab * v;
        return Witness { point: closest, dist2: p.dist2(closest) };
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return Witness { point: c, dist2: p.dist2(c) };
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        let closest = a + ac * w;
        return Witness { point: closest, dist2: p.dist2(closest) };
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        let closest = b + (c - b) * w;
        return Witness { point: closest, dist2: p.dist2(closest) };
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    let closest = a + ab * v + ac * w;
    Witness { point: closest, dist2: p.dist2(closest) }
}

/// Tests whether two triangles overlap, in the style of the
/// Guigue-Devillers predicate: each triangle is tested against the plane of
/// the other for a sign change across its three vertices, then (if both
/// straddle) the two segments formed by the plane intersections are
/// checked for 1-D overlap along their common line.
///
/// Returns `true` iff the intersection of the two triangles is a segment of
/// non-zero length (coplanar triangles are treated conservatively as
/// overlapping when their projections onto the shared normal overlap).
pub fn tri_tri_overlap(
    a: [Vector3; 3],
    b: [Vector3; 3],
) -> bool {
    let n1 = (a[1] - a[0]).cross(a[2] - a[0]);
    let d1 = -n1.dot(a[0]);
    let db = [
        n1.dot(b[0]) + d1,
        n1.dot(b[1]) + d1,
        n1.dot(b[2]) + d1,
    ];

    if same_sign_nonzero(db) {
        return false;
    }

    let n2 = (b[1] - b[0]).cross(b[2] - b[0]);
    let d2 = -n2.dot(b[0]);
    let da = [
        n2.dot(a[0]) + d2,
        n2.dot(a[1]) + d2,
        n2.dot(a[2]) + d2,
    ];

    if same_sign_nonzero(da) {
        return false;
    }

    // Both triangles straddle each other's plane (or lie in a degenerate
    // configuration); the separating-axis test along the cross product of
    // the two normals, restricted to the plane-intersection interval, is
    // the remaining discriminator. A coarse but correct fallback: project
    // all six vertices onto the line direction `n1 x n2` and check that the
    // [min,max] interval of one triangle's two "crossing" vertices overlaps
    // that of the other.
    let line_dir = n1.cross(n2);
    if line_dir.magnitude_squared().is_zero() {
        // Coplanar triangles: fall back to an edge/vertex separating-axis
        // test in 2D projected onto the shared plane's dominant axes.
        return coplanar_tri_tri_overlap(a, b, n1);
    }

    let interval_a = axis_interval(a, da, line_dir);
    let interval_b = axis_interval(b, db, line_dir);
    interval_a.0 <= interval_b.1 && interval_b.0 <= interval_a.1
}

fn same_sign_nonzero(d: [f64; 3]) -> bool {
    let all_pos = d.iter().all(|&v| v > 1e-9);
    let all_neg = d.iter().all(|&v| v < -1e-9);
    all_pos || all_neg
}

/// Projects the two triangle vertices whose plane-distance signs differ
/// from the third onto `line_dir`, returning the parametric interval where
/// the triangle crosses the intersection line.
fn axis_interval(tri: [Vector3; 3], signed_dist: [f64; 3], line_dir: Vector3) -> (f64, f64) {
    let proj: Vec<f64> = tri.iter().map(|&v| v.dot(line_dir)).collect();

    // Find the vertex on its own ("odd one out") side of the plane.
    let odd = if (signed_dist[0] > 0.0) == (signed_dist[1] > 0.0) {
        2
    } else if (signed_dist[0] > 0.0) == (signed_dist[2] > 0.0) {
        1
    } else {
        0
    };
    let others = [(odd + 1) % 3, (odd + 2) % 3];

    let t0 = proj[odd]
        + (proj[others[0]] - proj[odd]) * (signed_dist[odd] / (signed_dist[odd] - signed_dist[others[0]]));
    let t1 = proj[odd]
        + (proj[others[1]] - proj[odd]) * (signed_dist[odd] / (signed_dist[odd] - signed_dist[others[1]]));

    if t0 < t1 {
        (t0, t1)
    } else {
        (t1, t0)
    }
}

fn coplanar_tri_tri_overlap(a: [Vector3; 3], b: [Vector3; 3], normal: Vector3) -> bool {
    // Pick the two axes with the largest normal component to project onto.
    let n = [normal.x.abs(), normal.y.abs(), normal.z.abs()];
    let drop_axis = if n[0] >= n[1] && n[0] >= n[2] {
        0
    } else if n[1] >= n[2] {
        1
    } else {
        2
    };
    let proj = |v: Vector3| -> (f64, f64) {
        match drop_axis {
            0 => (v.y, v.z),
            1 => (v.x, v.z),
            _ => (v.x, v.y),
        }
    };
    let pa: Vec<(f64, f64)> = a.iter().map(|&v| proj(v)).collect();
    let pb: Vec<(f64, f64)> = b.iter().map(|&v| proj(v)).collect();

    for tri in [&pa, &pb] {
        for i in 0..3 {
            let (x1, y1) = tri[i];
            let (x2, y2) = tri[(i + 1) % 3];
            let edge = (x2 - x1, y2 - y1);
            let normal2 = (-edge.1, edge.0);
            let side = |p: (f64, f64)| normal2.0 * (p.0 - x1) + normal2.1 * (p.1 - y1);

            let other = if std::ptr::eq(tri, &pa) { &pb } else { &pa };
            if other.iter().all(|&p| side(p) < -1e-9) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dist2_point_segment_endpoint_case() {
        let w = dist2_point_segment(Vector3::new(-1.0, 0.0, 0.0), Vector3::zero(), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(w.point, Vector3::zero());
        assert_eq!(w.dist2, 1.0);
    }

    #[test]
    fn dist2_point_triangle_above_centroid() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(1.0, 0.0, 0.0);
        let c = Vector3::new(0.0, 1.0, 0.0);
        let p = Vector3::new(0.25, 0.25, 2.0);
        let w = dist2_point_triangle(p, a, b, c);
        assert!((w.dist2 - 4.0).abs() < 1e-9);
    }

    #[test]
    fn tri_tri_overlap_is_symmetric_for_intersecting() {
        let a = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ];
        let b = [
            Vector3::new(0.5, 0.5, -1.0),
            Vector3::new(0.5, 0.5, 1.0),
            Vector3::new(2.0, 0.5, 1.0),
        ];
        assert_eq!(tri_tri_overlap(a, b), tri_tri_overlap(b, a));
        assert!(tri_tri_overlap(a, b));
    }

    #[test]
    fn tri_tri_disjoint_far_apart() {
        let a = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let b = [
            Vector3::new(100.0, 100.0, 100.0),
            Vector3::new(101.0, 100.0, 100.0),
            Vector3::new(100.0, 101.0, 100.0),
        ];
        assert!(!tri_tri_overlap(a, b));
        assert!(!tri_tri_overlap(b, a));
    }
}
