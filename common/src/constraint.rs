use crate::error::{Result, SolverError};
use crate::grid::{CellState, Grid, Position};
use std::collections::BTreeSet;

/// "Exactly `target` of `variables` are mines."
///
/// `variables` is kept sorted and free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub variables: Vec<Position>,
    pub target: usize,
    /// The revealed cell this constraint was read from, if any.
    pub origin: Option<Position>,
}

impl Constraint {
    pub fn new(variables: impl IntoIterator<Item = Position>, target: usize) -> Self {
        let mut variables: Vec<Position> = variables.into_iter().collect();
        variables.sort_unstable();
        variables.dedup();
        Constraint {
            variables,
            target,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: Position) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn contains(&self, variable: Position) -> bool {
        self.variables.binary_search(&variable).is_ok()
    }

    /// Whether an assignment puts exactly `target` mines on this constraint.
    pub fn is_satisfied_by(&self, is_mine: impl Fn(Position) -> bool) -> bool {
        self.variables.iter().filter(|&&v| is_mine(v)).count() == self.target
    }
}

/// Unknowns and clues read off a grid snapshot.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    /// Every concealed (unmarked) cell, row-major.
    pub variables: Vec<Position>,
    pub constraints: Vec<Constraint>,
}

/// Output of [`ConstraintBuilder::simplify`].
#[derive(Debug, Clone, Default)]
pub struct Simplified {
    pub variables: Vec<Position>,
    pub constraints: Vec<Constraint>,
    pub certain_mines: BTreeSet<Position>,
    pub certain_safe: BTreeSet<Position>,
}

/// Turns a grid into sum constraints and strips out everything that local
/// logic alone can settle.
pub struct ConstraintBuilder<'a> {
    grid: &'a Grid,
}

impl<'a> ConstraintBuilder<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        ConstraintBuilder { grid }
    }

    /// One constraint per revealed number that still touches a concealed
    /// cell, with marked neighbours already subtracted from its target.
    pub fn build(&self) -> Result<ConstraintSet> {
        let grid = self.grid;
        let variables = grid.concealed_cells();
        let mut constraints = Vec::new();

        for at in grid.revealed_cells() {
            let Some(value) = grid.value(at) else {
                continue;
            };

            let mut hidden = Vec::new();
            let mut marked = 0usize;
            for n in grid.neighbors(at) {
                match grid.state(n) {
                    Some(CellState::Concealed) => hidden.push(n),
                    Some(CellState::Marked) => marked += 1,
                    _ => {}
                }
            }
            if hidden.is_empty() {
                continue;
            }

            let target = value as i64 - marked as i64;
            check_bounds(Some(at), target, hidden.len())?;
            constraints.push(Constraint::new(hidden, target as usize).with_origin(at));
        }

        Ok(ConstraintSet {
            variables,
            constraints,
        })
    }

    /// Runs the all-free-neighbours and all-mines-neighbours rules to a
    /// fixpoint. Settled variables are removed from every constraint, and
    /// targets drop by one for each removed mine.
    pub fn simplify(variables: Vec<Position>, constraints: Vec<Constraint>) -> Result<Simplified> {
        let mut working = constraints;
        for c in &working {
            check_bounds(c.origin, c.target as i64, c.variables.len())?;
        }

        let mut certain_mines = BTreeSet::new();
        let mut certain_safe = BTreeSet::new();

        loop {
            let mut safe = BTreeSet::new();
            let mut mines = BTreeSet::new();
            for c in working.iter().filter(|c| !c.variables.is_empty()) {
                if c.target == 0 {
                    safe.extend(c.variables.iter().copied());
                } else if c.target == c.variables.len() {
                    mines.extend(c.variables.iter().copied());
                }
            }
            if safe.is_empty() && mines.is_empty() {
                break;
            }
            if let Some(&position) = safe.intersection(&mines).next() {
                return Err(SolverError::Contradiction { position });
            }
            log::trace!(
                "simplify pass: {} safe, {} mines",
                safe.len(),
                mines.len()
            );

            for c in &mut working {
                let mut removed_mines = 0i64;
                c.variables.retain(|v| {
                    if mines.contains(v) {
                        removed_mines += 1;
                        false
                    } else {
                        !safe.contains(v)
                    }
                });
                let target = c.target as i64 - removed_mines;
                check_bounds(c.origin, target, c.variables.len())?;
                c.target = target as usize;
            }
            working.retain(|c| !c.variables.is_empty());

            certain_mines.extend(mines);
            certain_safe.extend(safe);
        }

        // Two clues over the same cells say the same thing; keep one.
        let mut constraints: Vec<Constraint> = Vec::with_capacity(working.len());
        for c in working {
            let duplicate = constraints
                .iter()
                .any(|kept| kept.variables == c.variables && kept.target == c.target);
            if !duplicate {
                constraints.push(c);
            }
        }

        let variables = variables
            .into_iter()
            .filter(|v| !certain_mines.contains(v) && !certain_safe.contains(v))
            .collect();

        Ok(Simplified {
            variables,
            constraints,
            certain_mines,
            certain_safe,
        })
    }
}

fn check_bounds(origin: Option<Position>, target: i64, variables: usize) -> Result<()> {
    if target < 0 || target > variables as i64 {
        return Err(SolverError::MalformedConstraint {
            origin,
            target,
            variables,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    /// Two mines on the top row of a 3x3, bottom row probed:
    ///   * ? *
    ///   1 2 1
    ///   0 0 0
    fn two_corner_grid() -> Grid {
        let mut grid = Grid::with_mines(3, 3, &[p(0, 0), p(0, 2)]).unwrap();
        grid.probe(p(2, 1));
        grid
    }

    #[test]
    fn test_constraint_building() {
        // Only numbers that touch concealed cells produce constraints.
        let grid = two_corner_grid();
        let set = ConstraintBuilder::new(&grid).build().unwrap();

        assert_eq!(set.variables, vec![p(0, 0), p(0, 1), p(0, 2)]);
        assert_eq!(set.constraints.len(), 3);

        let middle = set
            .constraints
            .iter()
            .find(|c| c.origin == Some(p(1, 1)))
            .unwrap();
        assert_eq!(middle.variables, vec![p(0, 0), p(0, 1), p(0, 2)]);
        assert_eq!(middle.target, 2);
    }

    #[test]
    fn test_marks_reduce_targets() {
        // A marked neighbour is subtracted from the clue and is no variable.
        let mut grid = two_corner_grid();
        grid.mark(p(0, 0));
        let set = ConstraintBuilder::new(&grid).build().unwrap();

        assert_eq!(set.variables, vec![p(0, 1), p(0, 2)]);
        let left = set
            .constraints
            .iter()
            .find(|c| c.origin == Some(p(1, 0)))
            .unwrap();
        assert_eq!(left.variables, vec![p(0, 1)]);
        assert_eq!(left.target, 0);

        let simplified = ConstraintBuilder::simplify(set.variables, set.constraints).unwrap();
        assert_eq!(simplified.certain_safe, BTreeSet::from([p(0, 1)]));
        assert_eq!(simplified.certain_mines, BTreeSet::from([p(0, 2)]));
        assert!(simplified.variables.is_empty());
        assert!(simplified.constraints.is_empty());
    }

    #[test]
    fn test_over_marked_clue_is_malformed() {
        // Three marks around a '2' that still touches concealed cells.
        //   ? 1 0
        //   M 2 1
        //   M M ?
        let mut grid = Grid::with_mines(3, 3, &[p(0, 0), p(2, 2)]).unwrap();
        grid.probe(p(0, 2));
        grid.mark(p(1, 0));
        grid.mark(p(2, 0));
        grid.mark(p(2, 1));
        let err = ConstraintBuilder::new(&grid).build().unwrap_err();
        assert_eq!(
            err,
            SolverError::MalformedConstraint {
                origin: Some(p(1, 1)),
                target: -1,
                variables: 2,
            }
        );
    }

    #[test]
    fn test_simplify_chains_rules() {
        // {a} = 0 frees a, which turns {a, b} = 1 into a forced mine on b,
        // which in turn frees c in {b, c} = 1.
        let (a, b, c, d) = (p(0, 0), p(0, 1), p(0, 2), p(5, 5));
        let constraints = vec![
            Constraint::new([a, b], 1),
            Constraint::new([a], 0),
            Constraint::new([b, c], 1),
        ];
        let simplified = ConstraintBuilder::simplify(vec![a, b, c, d], constraints).unwrap();

        assert_eq!(simplified.certain_safe, BTreeSet::from([a, c]));
        assert_eq!(simplified.certain_mines, BTreeSet::from([b]));
        assert_eq!(simplified.variables, vec![d]);
        assert!(simplified.constraints.is_empty());
    }

    #[test]
    fn test_simplify_is_idempotent() {
        // Re-running simplify on its own output settles nothing new.
        let (a, b, c, d, e) = (p(0, 0), p(0, 1), p(0, 2), p(0, 3), p(0, 4));
        let constraints = vec![
            Constraint::new([a, b, c], 1),
            Constraint::new([c, d], 1),
            Constraint::new([d, e], 2),
        ];
        let first = ConstraintBuilder::simplify(vec![a, b, c, d, e], constraints).unwrap();
        assert_eq!(first.certain_mines, BTreeSet::from([d, e]));
        assert_eq!(first.certain_safe, BTreeSet::from([c]));

        let second =
            ConstraintBuilder::simplify(first.variables.clone(), first.constraints.clone())
                .unwrap();
        assert!(second.certain_mines.is_empty());
        assert!(second.certain_safe.is_empty());
        assert_eq!(second.variables, first.variables);
        assert_eq!(second.constraints, first.constraints);
    }

    #[test]
    fn test_simplify_reports_inconsistency() {
        // {a} = 1 makes a a mine while {a, b} = 0 frees it in the same pass.
        let (a, b) = (p(0, 0), p(0, 1));
        let constraints = vec![Constraint::new([a], 1), Constraint::new([a, b], 0)];
        let err = ConstraintBuilder::simplify(vec![a, b], constraints).unwrap_err();
        assert_eq!(err, SolverError::Contradiction { position: a });
    }

    #[test]
    fn test_simplify_rejects_over_large_target() {
        let a = p(0, 0);
        let err = ConstraintBuilder::simplify(vec![a], vec![Constraint::new([a], 2)]).unwrap_err();
        assert!(matches!(
            err,
            SolverError::MalformedConstraint {
                target: 2,
                variables: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_constraint_normalizes_variables() {
        let c = Constraint::new([p(1, 1), p(0, 0), p(1, 1)], 1);
        assert_eq!(c.variables, vec![p(0, 0), p(1, 1)]);
        assert!(c.contains(p(1, 1)));
        assert!(c.is_satisfied_by(|v| v == p(0, 0)));
        assert!(!c.is_satisfied_by(|_| true));
    }
}
