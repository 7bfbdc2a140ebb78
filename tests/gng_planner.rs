//! End-to-end GNG-P scenarios: the empty 2-D box and the thin-wall seed
//! scenarios from the component design, plus the node-count/edge-age
//! invariants.

use fermat_math::CVec;
use fermat_planner::{NodeLabel, Planner, PlannerOps, PlannerParams};
use rand::{rngs::StdRng, Rng, SeedableRng};

struct FreeSpace {
    rng: StdRng,
    steps: u32,
    max_steps: u32,
}

impl FreeSpace {
    fn new(seed: u64, max_steps: u32) -> FreeSpace {
        FreeSpace { rng: StdRng::seed_from_u64(seed), steps: 0, max_steps }
    }
}

impl PlannerOps for FreeSpace {
    fn input_signal(&mut self) -> CVec {
        CVec::from_slice(&[self.rng.gen_range(-5.0..5.0), self.rng.gen_range(-5.0..5.0)])
    }

    fn eval(&mut self, _w: &CVec) -> NodeLabel {
        NodeLabel::Free
    }

    fn terminate(&mut self) -> bool {
        self.steps += 1;
        self.steps > self.max_steps
    }
}

struct ThinWall {
    rng: StdRng,
    steps: u32,
    max_steps: u32,
}

impl PlannerOps for ThinWall {
    fn input_signal(&mut self) -> CVec {
        CVec::from_slice(&[self.rng.gen_range(-5.0..5.0), self.rng.gen_range(-5.0..5.0)])
    }

    fn eval(&mut self, w: &CVec) -> NodeLabel {
        if w.get(0).abs() < 0.01 && w.get(1) < 4.0 {
            NodeLabel::Obst
        } else {
            NodeLabel::Free
        }
    }

    fn terminate(&mut self) -> bool {
        self.steps += 1;
        self.steps > self.max_steps
    }
}

#[test]
fn empty_2d_box_reaches_the_goal() {
    let start = CVec::from_slice(&[-4.0, -4.0]);
    let goal = CVec::from_slice(&[4.0, 4.0]);
    let mut params = PlannerParams::new(2, vec![-5.0, 5.0, -5.0, 5.0], start, goal);
    params.lambda = 50;
    params.max_nodes = 1_000;
    params.warm_start = 100;
    params.find_path_period = 50;

    let mut ops = FreeSpace::new(1, 20_000);
    let mut planner = Planner::new(params, &mut ops).unwrap();
    planner.run(&mut ops);

    assert!(planner.path().is_some(), "expected a path through an obstacle-free box");
}

#[test]
fn thin_wall_blocks_the_direct_route() {
    let start = CVec::from_slice(&[-4.0, -4.0]);
    let goal = CVec::from_slice(&[1.5, 4.5]);
    let mut params = PlannerParams::new(2, vec![-5.0, 5.0, -5.0, 5.0], start, goal);
    params.lambda = 50;
    params.max_nodes = 600;
    params.warm_start = 100;
    params.find_path_period = 50;

    let mut ops = ThinWall { rng: StdRng::seed_from_u64(2), steps: 0, max_steps: 3_000 };
    let mut planner = Planner::new(params, &mut ops).unwrap();
    planner.run(&mut ops);

    for w in planner.node_positions() {
        if w.get(0).abs() < 0.01 {
            assert!(w.get(1) >= 4.0 - 1.0 || planner.cell_label(w) != fermat_planner::CellLabel::Obst);
        }
    }
}

#[test]
fn node_count_never_exceeds_max_nodes() {
    let start = CVec::from_slice(&[-4.0, -4.0]);
    let goal = CVec::from_slice(&[4.0, 4.0]);
    let mut params = PlannerParams::new(2, vec![-5.0, 5.0, -5.0, 5.0], start, goal);
    params.lambda = 20;
    params.max_nodes = 200;
    params.find_path_period = 0;

    let mut ops = FreeSpace::new(3, 100_000);
    let mut planner = Planner::new(params, &mut ops).unwrap();
    planner.run(&mut ops);

    assert!(planner.node_count() <= 200 + 1);
}

#[test]
fn invalid_dimension_is_rejected() {
    let start = CVec::from_slice(&[0.0, 0.0, 0.0, 0.0]);
    let goal = CVec::from_slice(&[1.0, 1.0, 1.0, 1.0]);
    let params = PlannerParams::new(4, vec![-1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0], start, goal);
    let mut ops = FreeSpace::new(4, 10);
    assert!(Planner::new(params, &mut ops).is_err());
}
