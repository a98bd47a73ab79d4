use crate::enumerate::Assignment;
use crate::grid::Position;
use std::collections::{BTreeMap, BTreeSet};

/// Marginal mine probability per cell, iterated in row-major order.
pub type ProbabilityMap = BTreeMap<Position, f64>;

/// Probability given to every cell of a component that produced no
/// assignment. An explicit approximation, not a measurement.
pub const UNIFORM_FALLBACK: f64 = 0.5;

/// Default threshold for treating a probability as 0 or 1.
pub const DEFAULT_EPSILON: f64 = 1e-4;

pub struct ProbabilityCalculator;

impl ProbabilityCalculator {
    /// Fraction of `assignments` in which each variable is a mine.
    /// `assignments` are indexed like `variables`.
    pub fn probabilities(variables: &[Position], assignments: &[Assignment]) -> ProbabilityMap {
        if assignments.is_empty() {
            return Self::uniform(variables);
        }

        let mut counts = vec![0usize; variables.len()];
        for assignment in assignments {
            for (i, count) in counts.iter_mut().enumerate() {
                if assignment.is_mine(i) {
                    *count += 1;
                }
            }
        }

        let total = assignments.len() as f64;
        variables
            .iter()
            .zip(counts)
            .map(|(&v, count)| (v, count as f64 / total))
            .collect()
    }

    pub fn uniform(variables: &[Position]) -> ProbabilityMap {
        variables.iter().map(|&v| (v, UNIFORM_FALLBACK)).collect()
    }

    /// The least dangerous cell. Ties go to the first cell in row-major order.
    pub fn best_move(probabilities: &ProbabilityMap) -> Option<Position> {
        probabilities
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&position, _)| position)
    }

    /// Splits out cells that are safe (`p <= epsilon`) or mined
    /// (`p >= 1 - epsilon`).
    pub fn certain_cells(
        probabilities: &ProbabilityMap,
        epsilon: f64,
    ) -> (BTreeSet<Position>, BTreeSet<Position>) {
        let mut safe = BTreeSet::new();
        let mut mines = BTreeSet::new();
        for (&position, &p) in probabilities {
            if p <= epsilon {
                safe.insert(position);
            } else if p >= 1.0 - epsilon {
                mines.insert(position);
            }
        }
        (safe, mines)
    }
}
