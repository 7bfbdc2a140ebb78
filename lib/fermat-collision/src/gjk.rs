//! Generic convex-convex fallback for shape pairs with no specialised
//! dispatch entry (e.g. box-capsule, cylinder-anything). Implements a
//! boolean GJK overlap test over the Minkowski difference, support-driven
//! through [`Shape::support`].

use fermat_math::{Dot, IsZero, Vector3};

use crate::shapes::{Pose, Shape};

const MAX_ITERATIONS: usize = 32;

fn support_minkowski(sa: &Shape, pa: &Pose, sb: &Shape, pb: &Pose, dir: Vector3) -> Vector3 {
    sa.support(pa, dir) - sb.support(pb, -dir)
}

/// Returns `true` if the Minkowski difference of the two shapes contains
/// the origin, i.e. the shapes overlap.
pub fn gjk_overlap(sa: &Shape, pa: &Pose, sb: &Shape, pb: &Pose) -> bool {
    let mut dir = Vector3::new(1.0, 0.0, 0.0);
    let mut simplex = vec![support_minkowski(sa, pa, sb, pb, dir)];
    dir = -simplex[0];

    for _ in 0..MAX_ITERATIONS {
        if dir.is_zero() {
            return true;
        }
        let a = support_minkowski(sa, pa, sb, pb, dir.normalized());
        if a.dot(dir) < 0.0 {
            return false;
        }
        simplex.push(a);

        if let Some(new_dir) = do_simplex(&mut simplex) {
            dir = new_dir;
        } else {
            return true;
        }
    }
    // Ran out of iterations on a near-degenerate configuration; treat as
    // touching rather than risk a false negative.
    true
}

/// Reduces `simplex` to the minimal feature closest to the origin and
/// returns the next search direction, or `None` if the origin is enclosed.
fn do_simplex(simplex: &mut Vec<Vector3>) -> Option<Vector3> {
    match simplex.len() {
        2 => line_case(simplex),
        3 => triangle_case(simplex),
        4 => tetrahedron_case(simplex),
        _ => unreachable!("simplex grows by exactly one point per iteration"),
    }
}

fn line_case(simplex: &mut Vec<Vector3>) -> Option<Vector3> {
    let a = simplex[1];
    let b = simplex[0];
    let ab = b - a;
    let ao = -a;
    if ab.dot(ao) > 0.0 {
        Some(triple_product(ab, ao, ab))
    } else {
        *simplex = vec![a];
        Some(ao)
    }
}

fn triangle_case(simplex: &mut Vec<Vector3>) -> Option<Vector3> {
    let a = simplex[2];
    let b = simplex[1];
    let c = simplex[0];
    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            *simplex = vec![c, a];
            Some(triple_product(ac, ao, ac))
        } else {
            *simplex = vec![b, a];
            line_case(simplex)
        }
    } else if ab.cross(abc).dot(ao) > 0.0 {
        *simplex = vec![b, a];
        line_case(simplex)
    } else if abc.dot(ao) > 0.0 {
        Some(abc)
    } else {
        *simplex = vec![b, c, a];
        Some(-abc)
    }
}

fn tetrahedron_case(simplex: &mut Vec<Vector3>) -> Option<Vector3> {
    let a = simplex[3];
    let b = simplex[2];
    let c = simplex[1];
    let d = simplex[0];
    let ao = -a;

    let faces = [
        ([b, c, a], (b - a).cross(c - a)),
        ([c, d, a], (c - a).cross(d - a)),
        ([d, b, a], (d - a).cross(b - a)),
    ];

    for (pts, normal) in faces {
        if normal.dot(ao) > 0.0 {
            *simplex = vec![pts[1], pts[0], pts[2]];
            return triangle_case(simplex);
        }
    }
    None
}

fn triple_product(a: Vector3, b: Vector3, c: Vector3) -> Vector3 {
    a.cross(b).cross(c)
}

#[cfg(test)]
mod test {
    use super::*;
    use fermat_math::Matrix3;

    #[test]
    fn overlapping_spheres_detected_via_gjk() {
        let a = Shape::sphere(1.0).unwrap();
        let b = Shape::sphere(1.0).unwrap();
        let pa = Pose::identity();
        let pb = Pose::new(Matrix3::identity(), Vector3::new(1.5, 0.0, 0.0));
        assert!(gjk_overlap(&a, &pa, &b, &pb));
    }

    #[test]
    fn distant_spheres_not_overlapping_via_gjk() {
        let a = Shape::sphere(1.0).unwrap();
        let b = Shape::sphere(1.0).unwrap();
        let pa = Pose::identity();
        let pb = Pose::new(Matrix3::identity(), Vector3::new(10.0, 0.0, 0.0));
        assert!(!gjk_overlap(&a, &pa, &b, &pb));
    }

    #[test]
    fn gjk_agrees_with_sphere_sphere_boundary() {
        let a = Shape::sphere(1.0).unwrap();
        let b = Shape::sphere(1.0).unwrap();
        let pa = Pose::identity();
        let pb = Pose::new(Matrix3::identity(), Vector3::new(2.5, 0.0, 0.0));
        assert!(!gjk_overlap(&a, &pa, &b, &pb));
    }
}
