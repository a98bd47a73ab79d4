use crate::components::Component;
use crate::error::{Result, SolverError};
use crate::grid::Position;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use varisat::{ExtendFormula, Lit, Solver};

/// The possible outcomes of the backbone analysis for a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeducedState {
    ForcedMine,   // Every consistent layout puts a mine here.
    ForcedSafe,   // No consistent layout puts a mine here.
    Undetermined, // Both occur.
}

impl DeducedState {
    /// The probability the hybrid selector reports for this state.
    pub fn probability(self) -> f64 {
        match self {
            DeducedState::ForcedMine => 1.0,
            DeducedState::ForcedSafe => 0.0,
            DeducedState::Undetermined => crate::probability::UNIFORM_FALLBACK,
        }
    }
}

pub type Backbone = BTreeMap<Position, DeducedState>;

/// Constraints up to this many literals are encoded by listing every
/// forbidden subset; longer ones get a sequential counter.
const NAIVE_ENCODING_LIMIT: usize = 10;

/// Finds the cells of a component whose value is the same in every
/// consistent layout, without enumerating layouts.
///
/// One solve yields a sample layout; each cell is then re-solved with its
/// sampled value flipped, and is forced exactly when the flip is impossible.
/// Cells not reached within `timeout` stay `Undetermined`.
/// Returns `Ok(None)` when the component has no consistent layout.
pub fn backbone(
    component: &Component,
    mine_budget: Option<usize>,
    timeout: Duration,
) -> Result<Option<Backbone>> {
    let started = Instant::now();
    let mut solver = Solver::new();

    // 1. One SAT variable per cell; a positive literal means "mine".
    let lits: Vec<Lit> = component
        .variables
        .iter()
        .map(|_| Lit::from_var(solver.new_var(), true))
        .collect();

    // 2. Encode the sums, and the budget when there is one.
    for c in &component.constraints {
        let scope: Vec<Lit> = c
            .variables
            .iter()
            .filter_map(|v| component.variables.binary_search(v).ok())
            .map(|i| lits[i])
            .collect();
        exactly(&mut solver, &scope, c.target);
    }
    if let Some(budget) = mine_budget {
        at_most(&mut solver, &lits, budget);
    }

    // 3. A sample layout, or nothing at all.
    if !solver.solve().map_err(sat_error)? {
        return Ok(None);
    }
    let model = solver
        .model()
        .ok_or_else(|| SolverError::Sat("satisfiable formula produced no model".into()))?;

    // 4. Try to flip every sampled value.
    let mut deductions = Backbone::new();
    let mut unchecked = 0;
    for (&position, &lit) in component.variables.iter().zip(&lits) {
        if started.elapsed() >= timeout {
            deductions.insert(position, DeducedState::Undetermined);
            unchecked += 1;
            continue;
        }

        let sampled_mine = model.contains(&lit);
        let flipped = if sampled_mine { !lit } else { lit };

        solver.assume(&[flipped]);
        let flippable = solver.solve().map_err(sat_error)?;

        let state = match (sampled_mine, flippable) {
            (_, true) => DeducedState::Undetermined,
            (true, false) => DeducedState::ForcedMine,
            (false, false) => DeducedState::ForcedSafe,
        };
        deductions.insert(position, state);
    }
    solver.assume(&[]);

    if unchecked > 0 {
        log::warn!(
            "backbone of {} variables ran out of time; {unchecked} left undetermined",
            component.len()
        );
    }
    Ok(Some(deductions))
}

fn sat_error(err: impl std::fmt::Display) -> SolverError {
    SolverError::Sat(err.to_string())
}

/// Exactly `k` of `lits` are true.
fn exactly(solver: &mut Solver, lits: &[Lit], k: usize) {
    if k > lits.len() {
        solver.add_clause(&[]);
        return;
    }
    at_most(solver, lits, k);
    // At least k true is at most n - k false.
    let negated: Vec<Lit> = lits.iter().map(|&lit| !lit).collect();
    at_most(solver, &negated, lits.len() - k);
}

/// At most `k` of `lits` are true.
fn at_most(solver: &mut Solver, lits: &[Lit], k: usize) {
    let n = lits.len();
    if k >= n {
        return;
    }
    if k == 0 {
        for &lit in lits {
            solver.add_clause(&[!lit]);
        }
        return;
    }

    if n <= NAIVE_ENCODING_LIMIT {
        // No k + 1 of them may be true together.
        for combo in lits.iter().copied().combinations(k + 1) {
            let clause: Vec<Lit> = combo.into_iter().map(|lit| !lit).collect();
            solver.add_clause(&clause);
        }
        return;
    }

    // Sinz sequential counter: reg[i][j] holds "at least j + 1 of lits[..=i]
    // are true", for i < n - 1.
    let reg: Vec<Vec<Lit>> = (0..n - 1)
        .map(|_| (0..k).map(|_| Lit::from_var(solver.new_var(), true)).collect())
        .collect();

    solver.add_clause(&[!lits[0], reg[0][0]]);
    for j in 1..k {
        solver.add_clause(&[!reg[0][j]]);
    }
    for i in 1..n - 1 {
        solver.add_clause(&[!lits[i], reg[i][0]]);
        solver.add_clause(&[!reg[i - 1][0], reg[i][0]]);
        for j in 1..k {
            solver.add_clause(&[!lits[i], !reg[i - 1][j - 1], reg[i][j]]);
            solver.add_clause(&[!reg[i - 1][j], reg[i][j]]);
        }
        solver.add_clause(&[!lits[i], !reg[i - 1][k - 1]]);
    }
    solver.add_clause(&[!lits[n - 1], !reg[n - 2][k - 1]]);
}
