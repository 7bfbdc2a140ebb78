//! Precomputed powers of `beta`, the global error-decay rate, so that lazy
//! decay (applying `beta` to a node's error for every adaptation cycle it
//! missed) is a table lookup instead of a `cycle - err_cycle`-long loop of
//! multiplications.
//!
//! Mirrors the reference's `beta_n`/`beta_lambda_n` tables in `ferGNGInit`:
//! `beta_n[i] = beta^i` for `i` in `0..=lambda` (used for the winner's
//! per-step error increment), and `beta_lambda_n[i] = (beta^lambda)^(i+1)`
//! cached up to 1000 elapsed cycles, falling back to `powf` beyond that.

use crate::node::{NodeArena, NodeId};

const LAMBDA_N_CACHE: usize = 1000;

pub(crate) struct BetaTables {
    lambda: usize,
    beta_n: Vec<f64>,
    beta_lambda_n: Vec<f64>,
}

impl BetaTables {
    pub fn new(beta: f64, lambda: usize) -> BetaTables {
        let mut beta_n = Vec::with_capacity(lambda + 1);
        beta_n.push(1.0);
        for i in 1..=lambda {
            beta_n.push(beta_n[i - 1] * beta);
        }
        let max_beta = beta_n[lambda];

        let mut beta_lambda_n = Vec::with_capacity(LAMBDA_N_CACHE);
        beta_lambda_n.push(max_beta);
        for i in 1..LAMBDA_N_CACHE {
            beta_lambda_n.push(beta_lambda_n[i - 1] * max_beta);
        }

        BetaTables { lambda, beta_n, beta_lambda_n }
    }

    /// The weight applied to a winner's squared sampling distance at
    /// adaptation `step` of the current cycle of `lambda` (`step` in
    /// `1..=lambda`).
    pub fn winner_weight(&self, step: usize) -> f64 {
        self.beta_n[self.lambda - step]
    }

    /// `beta^(lambda * diff)`, for `diff` whole cycles elapsed since a
    /// node's error was last fixed up.
    pub fn decay_factor(&self, diff: u64) -> f64 {
        if diff == 0 {
            return 1.0;
        }
        let cached = self.beta_lambda_n.len();
        if diff as usize <= cached {
            self.beta_lambda_n[diff as usize - 1]
        } else {
            let max_beta = self.beta_lambda_n[cached - 1];
            let over = diff as usize - cached;
            self.beta_lambda_n[cached - 1] * max_beta.powi(over as i32)
        }
    }
}

/// Applies lazy decay to `id`'s error in place and returns the corrected
/// value, advancing its `err_cycle` to `cycle`. A no-op (beyond the
/// lookup) when the node was already fixed up this cycle.
pub(crate) fn fixup_error(arena: &mut NodeArena, beta: &BetaTables, cycle: u64, id: NodeId) -> f64 {
    match arena.get_mut(id) {
        Some(node) => {
            let diff = cycle.saturating_sub(node.err_cycle);
            if diff > 0 {
                node.err *= beta.decay_factor(diff);
                node.err_cycle = cycle;
            }
            node.err
        }
        None => f64::MIN,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn winner_weight_matches_beta_power() {
        let tables = BetaTables::new(0.5, 4);
        // step = lambda means the freshest sample: weight beta^0 = 1.
        assert!((tables.winner_weight(4) - 1.0).abs() < 1e-12);
        // step = 1: weight beta^(lambda-1) = 0.5^3.
        assert!((tables.winner_weight(1) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn decay_factor_matches_direct_power_within_cache() {
        let tables = BetaTables::new(0.9, 10);
        let diff = 37u64;
        let expected = 0.9f64.powi(10 * 37);
        assert!((tables.decay_factor(diff) - expected).abs() < 1e-6);
    }

    #[test]
    fn decay_factor_falls_back_beyond_cache() {
        let tables = BetaTables::new(0.999, 5);
        let diff = 5_000u64;
        let expected = 0.999f64.powi(5 * 5000);
        let got = tables.decay_factor(diff);
        assert!((got - expected).abs() / expected.max(1e-300) < 1e-6);
    }
}
