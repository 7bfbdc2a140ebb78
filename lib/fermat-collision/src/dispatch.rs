//! Pairwise collide/separate dispatch.
//!
//! Each shape pair is handled by a specialised routine where one is worth
//! writing (sphere-sphere, sphere-box, box-box via SAT, the `{capsule,
//! cylinder, triangle}`-plane family via the support function, ...);
//! anything else falls back to the generic GJK overlap test, and to a
//! crude support-sampled witness for separation. Routines are only ever
//! written for one ordering of `(kind1, kind2)`; [`collide`] and
//! [`separate`] canonicalise the order and flip the resulting direction
//! back when the caller's order was swapped.

use fermat_math::{dist2_point_segment, dist2_point_triangle, tri_tri_overlap, Dot, IsZero, Vector3};

use crate::gjk::gjk_overlap;
use crate::shapes::{Pose, Shape, ShapeKind};

/// A single contact point between two shapes: the midpoint, the
/// separating direction (pointing from the first shape towards the
/// second), and the penetration depth along that direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub pos: Vector3,
    pub dir: Vector3,
    pub depth: f64,
}

pub fn collide(s1: &Shape, p1: &Pose, s2: &Shape, p2: &Pose) -> bool {
    let (a, pa) = s1.resolve(p1);
    let (b, pb) = s2.resolve(p2);

    if (a.kind() as u8) <= (b.kind() as u8) {
        collide_ordered(a, &pa, b, &pb)
    } else {
        collide_ordered(b, &pb, a, &pa)
    }
}

pub fn separate(s1: &Shape, p1: &Pose, s2: &Shape, p2: &Pose) -> Option<Contact> {
    let (a, pa) = s1.resolve(p1);
    let (b, pb) = s2.resolve(p2);

    if (a.kind() as u8) <= (b.kind() as u8) {
        separate_ordered(a, &pa, b, &pb)
    } else {
        separate_ordered(b, &pb, a, &pa).map(|c| Contact { pos: c.pos, dir: -c.dir, depth: c.depth })
    }
}

fn collide_ordered(a: &Shape, pa: &Pose, b: &Shape, pb: &Pose) -> bool {
    use ShapeKind::*;
    match (a.kind(), b.kind()) {
        (Sphere, Sphere) => {
            let (ra, rb) = (sphere_radius(a), sphere_radius(b));
            pa.tr.dist2(pb.tr) < (ra + rb) * (ra + rb)
        }
        (Sphere, Box) => sphere_box_dist2(pa.tr, b, pb) < sphere_radius(a).powi(2),
        (Sphere, Plane) => sphere_plane_signed_dist(pa.tr, b, pb) < sphere_radius(a),
        (Sphere, Triangle) => {
            let tri = triangle_world(b, pb);
            dist2_point_triangle(pa.tr, tri[0], tri[1], tri[2]).dist2 < sphere_radius(a).powi(2)
        }
        (Sphere, Capsule) => {
            let (p0, p1) = capsule_segment_world(b, pb);
            let d2 = dist2_point_segment(pa.tr, p0, p1).dist2;
            let r = sphere_radius(a) + capsule_radius(b);
            d2 < r * r
        }
        (Box, Box) => box_box_sat(pa, a, pb, b),
        (Box, Plane) => box_plane_overlap(pa, a, pb, b),
        (Plane, Plane) => false,
        (Capsule, Plane) => shape_plane_signed_dist(a, pa, b, pb) < 0.0,
        (Cylinder, Plane) => shape_plane_signed_dist(a, pa, b, pb) < 0.0,
        (Plane, Triangle) => shape_plane_signed_dist(b, pb, a, pa) < 0.0,
        (Triangle, Triangle) => {
            let ta = triangle_world(a, pa);
            let tb = triangle_world(b, pb);
            tri_tri_overlap(ta, tb)
        }
        (Capsule, Capsule) => {
            let (a0, a1) = capsule_segment_world(a, pa);
            let (b0, b1) = capsule_segment_world(b, pb);
            let d2 = segment_segment_dist2(a0, a1, b0, b1);
            let r = capsule_radius(a) + capsule_radius(b);
            d2 < r * r
        }
        _ => gjk_overlap(a, pa, b, pb),
    }
}

fn separate_ordered(a: &Shape, pa: &Pose, b: &Shape, pb: &Pose) -> Option<Contact> {
    use ShapeKind::*;
    match (a.kind(), b.kind()) {
        (Sphere, Sphere) => separate_sphere_sphere(a, pa, b, pb),
        (Sphere, Box) => separate_sphere_box(a, pa, b, pb),
        (Sphere, Plane) => separate_sphere_plane(a, pa, b, pb),
        (Sphere, Capsule) => separate_sphere_capsule(a, pa, b, pb),
        (Sphere, Triangle) => separate_sphere_triangle(a, pa, b, pb),
        (Triangle, Triangle) => separate_triangle_triangle(a, pa, b, pb),
        _ => {
            if !collide_ordered(a, pa, b, pb) {
                return None;
            }
            // Generic fallback: approximate the separating direction from
            // centre to centre and the depth from the support functions
            // along that direction. Coarser than the specialised routines
            // but always produces a usable (if approximate) contact.
            let dir = (pb_center(b, pb) - pb_center(a, pa)).normalized();
            if dir.magnitude_squared() < 1e-16 {
                return Some(Contact { pos: pa.tr, dir: Vector3::new(1.0, 0.0, 0.0), depth: 0.0 });
            }
            let sa = a.support(pa, dir).dot(dir);
            let sb = b.support(pb, -dir).dot(-dir);
            let depth = (sa + sb - (pb_center(b, pb) - pb_center(a, pa)).dot(dir)).max(0.0);
            let pos = (a.support(pa, dir) + b.support(pb, -dir)) * 0.5;
            Some(Contact { pos, dir, depth })
        }
    }
}

fn pb_center(shape: &Shape, pose: &Pose) -> Vector3 {
    pose.to_world(shape.local_center())
}

fn sphere_radius(s: &Shape) -> f64 {
    match s {
        Shape::Sphere { radius } => *radius,
        _ => unreachable!(),
    }
}

fn capsule_radius(s: &Shape) -> f64 {
    match s {
        Shape::Capsule { radius, .. } => *radius,
        _ => unreachable!(),
    }
}

fn capsule_segment_world(s: &Shape, pose: &Pose) -> (Vector3, Vector3) {
    match s {
        Shape::Capsule { half_height, .. } => {
            let axis = pose.rot.column(2) * *half_height;
            (pose.tr - axis, pose.tr + axis)
        }
        _ => unreachable!(),
    }
}

fn triangle_world(s: &Shape, pose: &Pose) -> [Vector3; 3] {
    match s {
        Shape::Triangle { p } => [pose.to_world(p[0]), pose.to_world(p[1]), pose.to_world(p[2])],
        _ => unreachable!(),
    }
}

fn sphere_box_dist2(center: Vector3, b: &Shape, pb: &Pose) -> f64 {
    let half = match b {
        Shape::Box { half_extents } => *half_extents,
        _ => unreachable!(),
    };
    let local = pb.to_local(center);
    let clamped = Vector3::new(
        local.x.max(-half.x).min(half.x),
        local.y.max(-half.y).min(half.y),
        local.z.max(-half.z).min(half.z),
    );
    let closest_world = pb.to_world(clamped);
    center.dist2(closest_world)
}

fn sphere_plane_signed_dist(center: Vector3, plane: &Shape, pp: &Pose) -> f64 {
    let (normal, offset) = match plane {
        Shape::Plane { normal, offset } => (*normal, *offset),
        _ => unreachable!(),
    };
    let world_normal = pp.rot.mul_vec(normal);
    world_normal.dot(center) - offset
}

/// Signed distance from `shape`'s deepest point (along the plane's inward
/// normal) to the plane: negative once the shape has crossed to the far
/// side. Generalises [`sphere_plane_signed_dist`] to any convex shape via
/// its support function, for pairs with no cheaper closed form.
fn shape_plane_signed_dist(shape: &Shape, pose: &Pose, plane: &Shape, pp: &Pose) -> f64 {
    let (normal, offset) = match plane {
        Shape::Plane { normal, offset } => (*normal, *offset),
        _ => unreachable!(),
    };
    let world_normal = pp.rot.mul_vec(normal);
    let deepest = shape.support(pose, -world_normal);
    world_normal.dot(deepest) - offset
}

fn box_box_sat(pa: &Pose, a: &Shape, pb: &Pose, b: &Shape) -> bool {
    use crate::sat::Obb;
    let ha = match a {
        Shape::Box { half_extents } => *half_extents,
        _ => unreachable!(),
    };
    let hb = match b {
        Shape::Box { half_extents } => *half_extents,
        _ => unreachable!(),
    };
    Obb::new(pa.tr, pa.rot, ha).overlaps(&Obb::new(pb.tr, pb.rot, hb))
}

fn box_plane_overlap(pbox: &Pose, boxshape: &Shape, pplane: &Pose, plane: &Shape) -> bool {
    let half = match boxshape {
        Shape::Box { half_extents } => *half_extents,
        _ => unreachable!(),
    };
    let (normal, offset) = match plane {
        Shape::Plane { normal, offset } => (*normal, *offset),
        _ => unreachable!(),
    };
    let world_normal = pplane.rot.mul_vec(normal);
    let local_normal = pbox.rot.transpose().mul_vec(world_normal);
    let radius = half.x * local_normal.x.abs() + half.y * local_normal.y.abs() + half.z * local_normal.z.abs();
    let center_dist = world_normal.dot(pbox.tr) - offset;
    center_dist.abs() <= radius
}

fn segment_segment_dist2(p1: Vector3, q1: Vector3, p2: Vector3, q2: Vector3) -> f64 {
    // Closest distance between two segments, via clamped parametrisation
    // (Ericson, Real-Time Collision Detection, ยง5.1.9).
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    let (mut s, mut t);
    if a <= 1e-12 && e <= 1e-12 {
        return p1.dist2(p2);
    }
    if a <= 1e-12 {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= 1e-12 {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            s = if denom.abs() > 1e-12 { ((b * f - c * e) / denom).clamp(0.0, 1.0) } else { 0.0 };
            t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
        }
    }

    let c1 = p1 + d1 * s;
    let c2 = p2 + d2 * t;
    c1.dist2(c2)
}

fn separate_sphere_sphere(a: &Shape, pa: &Pose, b: &Shape, pb: &Pose) -> Option<Contact> {
    let (ra, rb) = (sphere_radius(a), sphere_radius(b));
    let sep = pb.tr - pa.tr;
    let len = sep.magnitude();
    let sum = ra + rb;
    if len >= sum {
        return None;
    }

    let depth = sum - len;
    if len.is_zero() {
        return Some(Contact { pos: pa.tr, dir: Vector3::new(1.0, 0.0, 0.0), depth });
    }
    let dir = sep / len;
    let pos = pa.tr + dir * (ra - depth * 0.5);
    Some(Contact { pos, dir, depth })
}

fn separate_sphere_plane(a: &Shape, pa: &Pose, b: &Shape, pb: &Pose) -> Option<Contact> {
    let radius = sphere_radius(a);
    let dist = sphere_plane_signed_dist(pa.tr, b, pb);
    if dist >= radius {
        return None;
    }
    let (normal, _) = match b {
        Shape::Plane { normal, offset } => (*normal, *offset),
        _ => unreachable!(),
    };
    let world_normal = pb.rot.mul_vec(normal);
    let depth = radius - dist;
    let pos = pa.tr - world_normal * radius;
    Some(Contact { pos, dir: -world_normal, depth })
}

fn separate_sphere_box(a: &Shape, pa: &Pose, b: &Shape, pb: &Pose) -> Option<Contact> {
    let radius = sphere_radius(a);
    let half = match b {
        Shape::Box { half_extents } => *half_extents,
        _ => unreachable!(),
    };
    let local = pb.to_local(pa.tr);
    let clamped = Vector3::new(
        local.x.max(-half.x).min(half.x),
        local.y.max(-half.y).min(half.y),
        local.z.max(-half.z).min(half.z),
    );
    let to_surface = local - clamped;
    let dist2 = to_surface.magnitude_squared();
    if dist2 >= radius * radius {
        return None;
    }

    if dist2 > 1e-18 {
        let dist = dist2.sqrt();
        let depth = radius - dist;
        let local_dir = -to_surface / dist;
        let world_dir = pb.rot.mul_vec(local_dir);
        let closest_world = pb.to_world(clamped);
        let pos = closest_world + world_dir * (depth * 0.5);
        return Some(Contact { pos, dir: world_dir, depth });
    }

    // Sphere centre sits inside the box: push out along whichever face is
    // nearest.
    let pen = Vector3::new(half.x - local.x.abs(), half.y - local.y.abs(), half.z - local.z.abs());
    let (local_dir, face_pen) = if pen.x <= pen.y && pen.x <= pen.z {
        (Vector3::new(if local.x < 0.0 { -1.0 } else { 1.0 }, 0.0, 0.0), pen.x)
    } else if pen.y <= pen.z {
        (Vector3::new(0.0, if local.y < 0.0 { -1.0 } else { 1.0 }, 0.0), pen.y)
    } else {
        (Vector3::new(0.0, 0.0, if local.z < 0.0 { -1.0 } else { 1.0 }), pen.z)
    };
    let world_dir = pb.rot.mul_vec(local_dir);
    Some(Contact { pos: pa.tr, dir: world_dir, depth: radius + face_pen })
}

fn separate_sphere_capsule(a: &Shape, pa: &Pose, b: &Shape, pb: &Pose) -> Option<Contact> {
    let (p0, p1) = capsule_segment_world(b, pb);
    let witness = dist2_point_segment(pa.tr, p0, p1);
    let r = sphere_radius(a) + capsule_radius(b);
    if witness.dist2 >= r * r {
        return None;
    }

    let dist = witness.dist2.sqrt();
    let depth = r - dist;
    if dist.is_zero() {
        return Some(Contact { pos: pa.tr, dir: Vector3::new(1.0, 0.0, 0.0), depth });
    }
    let dir = (witness.point - pa.tr) / dist;
    let pos = pa.tr + dir * (sphere_radius(a) - depth * 0.5);
    Some(Contact { pos, dir, depth })
}

fn separate_sphere_triangle(a: &Shape, pa: &Pose, b: &Shape, pb: &Pose) -> Option<Contact> {
    let tri = triangle_world(b, pb);
    let witness = dist2_point_triangle(pa.tr, tri[0], tri[1], tri[2]);
    let radius = sphere_radius(a);
    if witness.dist2 >= radius * radius {
        return None;
    }

    let dist = witness.dist2.sqrt();
    let depth = radius - dist;
    if dist.is_zero() {
        let normal = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalized();
        return Some(Contact { pos: pa.tr, dir: normal, depth });
    }
    let dir = (witness.point - pa.tr) / dist;
    let pos = pa.tr + dir * (radius - depth * 0.5);
    Some(Contact { pos, dir, depth })
}

/// Triangles are infinitely thin, so there is no volumetric penetration
/// depth to report; the witness is the closest vertex/edge pair between
/// the two (which sits on, or next to, their line of intersection) and
/// `dir` is that intersection line's direction rather than a push-apart
/// normal.
fn separate_triangle_triangle(a: &Shape, pa: &Pose, b: &Shape, pb: &Pose) -> Option<Contact> {
    let ta = triangle_world(a, pa);
    let tb = triangle_world(b, pb);
    if !tri_tri_overlap(ta, tb) {
        return None;
    }

    let mut best_pos = (ta[0] + tb[0]) * 0.5;
    let mut best_dist2 = f64::MAX;
    for &v in &ta {
        let w = dist2_point_triangle(v, tb[0], tb[1], tb[2]);
        if w.dist2 < best_dist2 {
            best_dist2 = w.dist2;
            best_pos = (v + w.point) * 0.5;
        }
    }
    for &v in &tb {
        let w = dist2_point_triangle(v, ta[0], ta[1], ta[2]);
        if w.dist2 < best_dist2 {
            best_dist2 = w.dist2;
            best_pos = (v + w.point) * 0.5;
        }
    }
    for i in 0..3 {
        let (a0, a1) = (ta[i], ta[(i + 1) % 3]);
        for j in 0..3 {
            let (b0, b1) = (tb[j], tb[(j + 1) % 3]);
            let d2 = segment_segment_dist2(a0, a1, b0, b1);
            if d2 < best_dist2 {
                best_dist2 = d2;
                best_pos = (a0 + a1 + b0 + b1) * 0.25;
            }
        }
    }

    let na = (ta[1] - ta[0]).cross(ta[2] - ta[0]);
    let nb = (tb[1] - tb[0]).cross(tb[2] - tb[0]);
    let line = na.cross(nb);
    let dir = if line.magnitude_squared() > 1e-16 { line.normalized() } else { na.normalized() };
    Some(Contact { pos: best_pos, dir, depth: 0.0 })
}

#[cfg(test)]
mod test {
    use super::*;
    use fermat_math::Matrix3;

    #[test]
    fn colliding_spheres_report_positive_depth() {
        let a = Shape::sphere(1.0).unwrap();
        let b = Shape::sphere(1.0).unwrap();
        let pa = Pose::identity();
        let pb = Pose::new(Matrix3::identity(), Vector3::new(1.5, 0.0, 0.0));

        assert!(collide(&a, &pa, &b, &pb));
        let c = separate(&a, &pa, &b, &pb).unwrap();
        assert!((c.depth - 0.5).abs() < 1e-9);
    }

    #[test]
    fn separation_direction_flips_with_argument_order() {
        let a = Shape::sphere(1.0).unwrap();
        let b = Shape::sphere(1.0).unwrap();
        let pa = Pose::identity();
        let pb = Pose::new(Matrix3::identity(), Vector3::new(1.5, 0.0, 0.0));

        let c1 = separate(&a, &pa, &b, &pb).unwrap();
        let c2 = separate(&b, &pb, &a, &pa).unwrap();
        assert!((c1.dir + c2.dir).magnitude() < 1e-9);
        assert!((c1.depth - c2.depth).abs() < 1e-9);
    }

    #[test]
    fn disjoint_boxes_do_not_collide() {
        let a = Shape::boxed(Vector3::splat(1.0)).unwrap();
        let b = Shape::boxed(Vector3::splat(1.0)).unwrap();
        let pa = Pose::identity();
        let pb = Pose::new(Matrix3::identity(), Vector3::new(10.0, 0.0, 0.0));
        assert!(!collide(&a, &pa, &b, &pb));
    }

    #[test]
    fn overlapping_boxes_at_45_degrees_collide() {
        let a = Shape::boxed(Vector3::splat(1.0)).unwrap();
        let b = Shape::boxed(Vector3::splat(1.0)).unwrap();
        let pa = Pose::identity();
        let pb = Pose::new(
            Matrix3::from_axis_angle(Vector3::new(0.0, 0.0, 1.0), std::f64::consts::FRAC_PI_4),
            Vector3::new(1.2, 0.0, 0.0),
        );
        assert!(collide(&a, &pa, &b, &pb));
    }
}
