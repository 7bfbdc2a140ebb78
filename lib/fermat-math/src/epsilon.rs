//! Per-comparison-class epsilon configuration.
//!
//! The reference implementation hard-codes a single `FER_EPS` for every
//! equality check. Section 9 of the design calls that out as a point where
//! the rewrite should do better: positions, normals, and angles drift at
//! different rates, so a caller comparing a renormalized rotation axis
//! against its original shouldn't use the same tolerance as a caller
//! deduplicating mesh vertices.

/// Default tolerance used when no [`Epsilons`] is supplied, matching the
/// reference's `1e-10` for double precision.
pub const DEFAULT_EPS: f64 = 1e-10;

/// The class of quantity being compared, used to pick a tolerance out of
/// [`Epsilons`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpsilonClass {
    Position,
    Normal,
    Angle,
}

/// A bundle of tolerances, one per [`EpsilonClass`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epsilons {
    pub position: f64,
    pub normal: f64,
    pub angle: f64,
}

impl Default for Epsilons {
    fn default() -> Self {
        Epsilons {
            position: DEFAULT_EPS,
            normal: 1e-8,
            angle: 1e-8,
        }
    }
}

impl Epsilons {
    pub fn get(&self, class: EpsilonClass) -> f64 {
        match class {
            EpsilonClass::Position => self.position,
            EpsilonClass::Normal => self.normal,
            EpsilonClass::Angle => self.angle,
        }
    }
}
