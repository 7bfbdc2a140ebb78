//! Property and seed-scenario tests for the generalised uniform grid
//! (identity law, exact-nearest correctness, rehash-under-load).

use fermat_gug::{Gug, GugParams};
use fermat_math::CVec;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn brute_force_nearest(points: &[(u32, CVec)], q: &CVec, k: usize) -> Vec<(u32, f64)> {
    let mut all: Vec<(u32, f64)> = points.iter().map(|(id, p)| (*id, q.dist2(p))).collect();
    all.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
    all.truncate(k);
    all
}

#[test]
fn insert_then_remove_restores_cell_topology() {
    let params = GugParams::new(2, vec![-10.0, 10.0, -10.0, 10.0]);
    let mut gug: Gug<u32> = Gug::new(params).unwrap();

    let base = gug.add(CVec::from_slice(&[1.0, 1.0]), 1).unwrap();
    let probe = gug.add(CVec::from_slice(&[1.1, 1.1]), 2).unwrap();
    let before = gug.nearest(&CVec::from_slice(&[1.0, 1.0]), 5);

    gug.remove(probe);
    let reinserted = gug.add(CVec::from_slice(&[1.1, 1.1]), 2).unwrap();
    let after = gug.nearest(&CVec::from_slice(&[1.0, 1.0]), 5);

    assert_eq!(before.len(), after.len());
    assert!(gug.get(base).is_some());
    assert!(gug.get(reinserted).is_some());
}

#[test]
fn exact_nearest_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(7);
    let params = GugParams::new(3, vec![-20.0, 20.0, -20.0, 20.0, -20.0, 20.0]);
    let mut gug: Gug<u32> = Gug::new(params).unwrap();

    let mut reference = Vec::new();
    for id in 0..500u32 {
        let p = CVec::from_slice(&[
            rng.gen_range(-20.0..20.0),
            rng.gen_range(-20.0..20.0),
            rng.gen_range(-20.0..20.0),
        ]);
        gug.add(p.clone(), id).unwrap();
        reference.push((id, p));
    }

    let q = CVec::from_slice(&[1.0, -2.0, 3.0]);
    let got = gug.nearest(&q, 10);
    let want = brute_force_nearest(&reference, &q, 10);

    assert_eq!(got.len(), want.len());
    for ((_, got_d), (_, want_d)) in got.iter().zip(want.iter()) {
        assert!((got_d - want_d).abs() < 1e-9, "{got_d} vs {want_d}");
    }
}

#[test]
fn dense_insertion_triggers_rehash_and_stays_correct() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut params = GugParams::new(3, vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    params.initial_cells = 10;
    params.max_density = 1.0;
    params.expand_rate = 2.0;
    let mut gug: Gug<u32> = Gug::new(params).unwrap();

    let mut reference = Vec::new();
    for id in 0..10_000u32 {
        let p = CVec::from_slice(&[rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)]);
        gug.add(p.clone(), id).unwrap();
        reference.push((id, p));
    }

    let q = CVec::from_slice(&[0.5, 0.5, 0.5]);
    let got = gug.nearest(&q, 10);
    let want = brute_force_nearest(&reference, &q, 10);
    for ((_, got_d), (_, want_d)) in got.iter().zip(want.iter()) {
        assert!((got_d - want_d).abs() < 1e-9);
    }
}
