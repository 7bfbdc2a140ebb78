//! Property and seed-scenario tests for the OBB/SAT collision core
//! (SAT symmetry, separation direction-sign symmetry, the sphere-sphere
//! and 45-degree OBB seed scenarios, tri-tri overlap symmetry).

use fermat_collision::{collide, separate, Obb, Pose, Shape};
use fermat_math::{tri_tri_overlap, Matrix3, Vector3};

#[test]
fn sat_overlap_is_symmetric() {
    let a = Obb::new(Vector3::zero(), Matrix3::identity(), Vector3::splat(1.0));
    let b = Obb::new(Vector3::new(1.5, 0.3, 0.0), Matrix3::identity(), Vector3::splat(1.0));
    assert_eq!(a.overlaps(&b), b.overlaps(&a));

    let far = Obb::new(Vector3::new(100.0, 0.0, 0.0), Matrix3::identity(), Vector3::splat(1.0));
    assert_eq!(a.overlaps(&far), far.overlaps(&a));
    assert!(!a.overlaps(&far));
}

#[test]
fn sphere_sphere_seed_scenario() {
    let s = Shape::sphere(1.0).unwrap();
    let pa = Pose::new(Matrix3::identity(), Vector3::new(0.0, 0.0, 0.0));
    let pb = Pose::new(Matrix3::identity(), Vector3::new(1.5, 0.0, 0.0));

    assert!(collide(&s, &pa, &s, &pb));
    let contact = separate(&s, &pa, &s, &pb).expect("overlapping spheres separate");
    assert!((contact.depth - 0.5).abs() < 1e-9);
    assert!((contact.dir - Vector3::new(1.0, 0.0, 0.0)).magnitude() < 1e-9);
}

#[test]
fn separation_direction_flips_with_operand_order() {
    let s = Shape::sphere(1.0).unwrap();
    let pa = Pose::new(Matrix3::identity(), Vector3::new(0.0, 0.0, 0.0));
    let pb = Pose::new(Matrix3::identity(), Vector3::new(1.5, 0.0, 0.0));

    let forward = separate(&s, &pa, &s, &pb).unwrap();
    let backward = separate(&s, &pb, &s, &pa).unwrap();

    assert!((forward.pos - backward.pos).magnitude() < 1e-9);
    assert!((forward.dir + backward.dir).magnitude() < 1e-9);
    assert!((forward.depth - backward.depth).abs() < 1e-9);
}

#[test]
fn obb_vs_obb_at_45_degrees_seed_scenario() {
    let rotated = Matrix3::from_euler(0.0, 0.0, std::f64::consts::FRAC_PI_4);
    let a = Obb::new(Vector3::zero(), Matrix3::identity(), Vector3::splat(1.0));
    let b = Obb::new(Vector3::new(2.0, 0.0, 0.0), rotated, Vector3::splat(1.0));
    assert!(!a.overlaps(&b));

    let b_close = Obb::new(Vector3::new(std::f64::consts::SQRT_2, 0.0, 0.0), rotated, Vector3::splat(1.0));
    assert!(a.overlaps(&b_close));
}

#[test]
fn tri_tri_overlap_is_symmetric() {
    let a = [Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)];
    let b = [Vector3::new(0.2, 0.2, -0.1), Vector3::new(0.2, 0.2, 0.5), Vector3::new(0.8, 0.2, -0.1)];
    assert_eq!(tri_tri_overlap(a, b), tri_tri_overlap(b, a));

    let far = [Vector3::new(10.0, 10.0, 10.0), Vector3::new(11.0, 10.0, 10.0), Vector3::new(10.0, 11.0, 10.0)];
    assert!(!tri_tri_overlap(a, far));
    assert_eq!(tri_tri_overlap(a, far), tri_tri_overlap(far, a));
}
