use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fermat_collision::{Obb, ObbTree, Pose, Shape};
use fermat_math::{Matrix3, Vector3};

fn boxes_at(spacing: f64, count: usize) -> Vec<(Shape, Pose)> {
    (0..count)
        .map(|i| {
            let shape = Shape::boxed(Vector3::splat(0.5)).unwrap();
            let pose = Pose::new(Matrix3::identity(), Vector3::new(i as f64 * spacing, 0.0, 0.0));
            (shape, pose)
        })
        .collect()
}

fn bench_sat_overlap(c: &mut Criterion) {
    let a = Obb::new(Vector3::zero(), Matrix3::identity(), Vector3::splat(0.5));
    let b_near = Obb::new(Vector3::new(0.2, 0.0, 0.0), Matrix3::identity(), Vector3::splat(0.5));
    let b_far = Obb::new(Vector3::new(100.0, 0.0, 0.0), Matrix3::identity(), Vector3::splat(0.5));

    c.bench_function("obb_sat_overlap_true", |bencher| {
        bencher.iter(|| black_box(a.overlaps(&b_near)));
    });
    c.bench_function("obb_sat_overlap_false", |bencher| {
        bencher.iter(|| black_box(a.overlaps(&b_far)));
    });
}

fn bench_tree_traversal(c: &mut Criterion) {
    let leaves_a = boxes_at(1.1, 200);
    let leaves_b = boxes_at(1.1, 200);
    let tree_a = ObbTree::build(&leaves_a);
    let tree_b = ObbTree::build(&leaves_b);

    c.bench_function("obb_tree_traverse_pairs_200x200", |bencher| {
        bencher.iter(|| {
            let mut hits = 0usize;
            ObbTree::traverse_pairs(&tree_a, &tree_b, &mut |_, _| {
                hits += 1;
                true
            });
            black_box(hits);
        });
    });
}

criterion_group!(benches, bench_sat_overlap, bench_tree_traversal);
criterion_main!(benches);
