use crate::components::Component;
use crate::grid::Position;
use std::time::{Duration, Instant};

/// How an enumeration ended. Only `Complete` and `Inconsistent` are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationOutcome {
    /// Every consistent assignment was collected.
    Complete,
    /// The search finished and no assignment satisfies the constraints.
    Inconsistent,
    /// The component exceeds the size threshold; nothing was enumerated.
    TooLarge,
    /// The wall-clock bound was hit; assignments are partial.
    TimedOut,
    /// The assignment cap was hit; assignments are partial.
    Truncated,
}

impl EnumerationOutcome {
    pub fn is_exact(self) -> bool {
        matches!(self, Self::Complete | Self::Inconsistent)
    }
}

/// One consistent mine layout for a component, indexed like
/// `Component::variables`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    mines: Vec<bool>,
}

impl Assignment {
    pub fn from_mines(mines: Vec<bool>) -> Self {
        Assignment { mines }
    }

    pub fn is_mine(&self, index: usize) -> bool {
        self.mines.get(index).copied().unwrap_or(false)
    }

    pub fn mine_count(&self) -> usize {
        self.mines.iter().filter(|&&m| m).count()
    }

    pub fn len(&self) -> usize {
        self.mines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mines.is_empty()
    }

    /// Pairs each mine flag with its variable.
    pub fn iter<'a>(
        &'a self,
        variables: &'a [Position],
    ) -> impl Iterator<Item = (Position, bool)> + 'a {
        variables.iter().copied().zip(self.mines.iter().copied())
    }
}

#[derive(Debug, Clone)]
pub struct Enumeration {
    pub assignments: Vec<Assignment>,
    pub outcome: EnumerationOutcome,
}

/// Exhaustive search over one component's assignments.
///
/// Variables are fixed one at a time in component order; a branch is cut as
/// soon as some constraint can no longer reach its target, or the running
/// mine total exceeds the budget. The survivors are exactly the assignments
/// a full `2^n` sweep would keep.
#[derive(Debug, Clone)]
pub struct Enumerator {
    pub max_component_size: usize,
    pub max_assignments: usize,
    pub timeout: Duration,
    /// Upper bound on mines inside the component, when known.
    pub mine_budget: Option<usize>,
}

impl Enumerator {
    pub fn new(max_component_size: usize, max_assignments: usize, timeout: Duration) -> Self {
        Enumerator {
            max_component_size,
            max_assignments,
            timeout,
            mine_budget: None,
        }
    }

    pub fn with_mine_budget(mut self, budget: Option<usize>) -> Self {
        self.mine_budget = budget;
        self
    }

    pub fn enumerate(&self, component: &Component) -> Enumeration {
        let n = component.variables.len();
        if n > self.max_component_size {
            log::warn!(
                "component of {n} variables exceeds the enumeration limit of {}",
                self.max_component_size
            );
            return Enumeration {
                assignments: Vec::new(),
                outcome: EnumerationOutcome::TooLarge,
            };
        }

        let mut incident = vec![Vec::new(); n];
        let mut targets = Vec::with_capacity(component.constraints.len());
        let mut open = Vec::with_capacity(component.constraints.len());
        for (ci, c) in component.constraints.iter().enumerate() {
            for v in &c.variables {
                if let Ok(i) = component.variables.binary_search(v) {
                    incident[i].push(ci);
                }
            }
            targets.push(c.target);
            open.push(c.variables.len());
        }

        let mut search = Search {
            mines: vec![0; targets.len()],
            targets,
            open,
            incident,
            current: vec![false; n],
            placed: 0,
            budget: self.mine_budget.unwrap_or(usize::MAX),
            found: Vec::new(),
            limit: self.max_assignments,
            started: Instant::now(),
            timeout: self.timeout,
            nodes: 0,
            stop: None,
        };
        search.descend(0);

        let outcome = match search.stop {
            Some(outcome) => outcome,
            None if search.found.is_empty() => EnumerationOutcome::Inconsistent,
            None => EnumerationOutcome::Complete,
        };
        match outcome {
            EnumerationOutcome::TimedOut => log::warn!(
                "enumeration of {n} variables timed out after {} assignments",
                search.found.len()
            ),
            EnumerationOutcome::Truncated => log::warn!(
                "enumeration of {n} variables stopped at {} assignments",
                search.found.len()
            ),
            _ => log::debug!(
                "enumerated {n} variables: {} assignments in {} nodes",
                search.found.len(),
                search.nodes
            ),
        }

        Enumeration {
            assignments: search.found,
            outcome,
        }
    }
}

struct Search {
    // Per constraint.
    targets: Vec<usize>,
    mines: Vec<usize>,
    open: Vec<usize>,
    // Per variable: the constraints it appears in.
    incident: Vec<Vec<usize>>,
    current: Vec<bool>,
    placed: usize,
    budget: usize,
    found: Vec<Assignment>,
    limit: usize,
    started: Instant,
    timeout: Duration,
    nodes: u64,
    stop: Option<EnumerationOutcome>,
}

impl Search {
    fn descend(&mut self, depth: usize) {
        // The clock is read at the root and every 256 nodes after it.
        if self.nodes % 256 == 0 && self.started.elapsed() >= self.timeout {
            self.stop = Some(EnumerationOutcome::TimedOut);
            return;
        }
        self.nodes += 1;

        if depth == self.current.len() {
            if self.found.len() >= self.limit {
                self.stop = Some(EnumerationOutcome::Truncated);
            } else {
                self.found.push(Assignment::from_mines(self.current.clone()));
            }
            return;
        }

        for mine in [false, true] {
            if mine && self.placed >= self.budget {
                continue;
            }
            if self.assign(depth, mine) {
                self.current[depth] = mine;
                self.descend(depth + 1);
            }
            self.unassign(depth, mine);
            if self.stop.is_some() {
                return;
            }
        }
        self.current[depth] = false;
    }

    /// Fixes a variable and reports whether every touched constraint can
    /// still be met.
    fn assign(&mut self, var: usize, mine: bool) -> bool {
        let mut feasible = true;
        for &ci in &self.incident[var] {
            self.open[ci] -= 1;
            if mine {
                self.mines[ci] += 1;
            }
            let (have, left, want) = (self.mines[ci], self.open[ci], self.targets[ci]);
            if have > want || have + left < want {
                feasible = false;
            }
        }
        if mine {
            self.placed += 1;
        }
        feasible
    }

    fn unassign(&mut self, var: usize, mine: bool) {
        for &ci in &self.incident[var] {
            self.open[ci] += 1;
            if mine {
                self.mines[ci] -= 1;
            }
        }
        if mine {
            self.placed -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ComponentDetector;
    use crate::constraint::Constraint;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    fn enumerator() -> Enumerator {
        Enumerator::new(20, 10_000, Duration::from_secs(5))
    }

    fn single_component(variables: &[Position], constraints: Vec<Constraint>) -> Component {
        let mut components = ComponentDetector::find_components(variables, &constraints);
        assert_eq!(components.len(), 1);
        components.remove(0)
    }

    fn assert_all_satisfy(component: &Component, enumeration: &Enumeration) {
        for assignment in &enumeration.assignments {
            assert_eq!(assignment.len(), component.variables.len());
            for c in &component.constraints {
                assert!(c.is_satisfied_by(|v| {
                    let i = component.variables.binary_search(&v).unwrap();
                    assignment.is_mine(i)
                }));
            }
        }
    }

    #[test]
    fn test_overlapping_constraints() {
        // {A,B,C} = 1 and {B,C,D} = 2 leave exactly {B,D} and {C,D}.
        // B and C together would break the first sum; D alone the second.
        let (a, b, c, d) = (p(0, 0), p(0, 1), p(0, 2), p(0, 3));
        let component = single_component(
            &[a, b, c, d],
            vec![Constraint::new([a, b, c], 1), Constraint::new([b, c, d], 2)],
        );
        let enumeration = enumerator().enumerate(&component);

        assert_eq!(enumeration.outcome, EnumerationOutcome::Complete);
        assert_eq!(
            enumeration.assignments,
            vec![
                Assignment::from_mines(vec![false, false, true, true]),
                Assignment::from_mines(vec![false, true, false, true]),
            ]
        );
        assert_all_satisfy(&component, &enumeration);
    }

    #[test]
    fn test_budget_caps_mines() {
        // Three free cells with room for only one mine.
        let vars = [p(0, 0), p(0, 1), p(0, 2)];
        let component = single_component(&vars, vec![Constraint::new(vars, 1)]);
        let unbounded = enumerator().enumerate(&component);
        assert_eq!(unbounded.assignments.len(), 3);

        let pair = [p(1, 0), p(1, 1)];
        let loose = Component {
            variables: pair.to_vec(),
            constraints: Vec::new(),
        };
        assert_eq!(enumerator().enumerate(&loose).assignments.len(), 4);
        let capped = enumerator().with_mine_budget(Some(1)).enumerate(&loose);
        assert_eq!(capped.assignments.len(), 3);
        assert!(capped.assignments.iter().all(|a| a.mine_count() <= 1));
    }

    #[test]
    fn test_inconsistent_component() {
        // The same cells cannot hold one and two mines at once.
        let vars = [p(0, 0), p(0, 1)];
        let component = single_component(
            &vars,
            vec![Constraint::new(vars, 1), Constraint::new(vars, 2)],
        );
        let enumeration = enumerator().enumerate(&component);
        assert_eq!(enumeration.outcome, EnumerationOutcome::Inconsistent);
        assert!(enumeration.assignments.is_empty());
    }

    #[test]
    fn test_budget_below_forced_mines_is_inconsistent() {
        let vars = [p(0, 0), p(0, 1)];
        let component = single_component(&vars, vec![Constraint::new(vars, 2)]);
        let enumeration = enumerator().with_mine_budget(Some(1)).enumerate(&component);
        assert_eq!(enumeration.outcome, EnumerationOutcome::Inconsistent);
    }

    #[test]
    fn test_oversized_component_is_skipped() {
        let vars: Vec<Position> = (0..8).map(|c| p(0, c)).collect();
        let component = single_component(&vars, vec![Constraint::new(vars.clone(), 4)]);
        let enumeration = Enumerator::new(5, 100, Duration::from_secs(1)).enumerate(&component);
        assert_eq!(enumeration.outcome, EnumerationOutcome::TooLarge);
        assert!(enumeration.assignments.is_empty());
    }

    #[test]
    fn test_assignment_cap_truncates() {
        // C(10, 5) = 252 layouts, capped at 100.
        let vars: Vec<Position> = (0..10).map(|c| p(0, c)).collect();
        let component = single_component(&vars, vec![Constraint::new(vars.clone(), 5)]);
        let enumeration = Enumerator::new(20, 100, Duration::from_secs(5)).enumerate(&component);
        assert_eq!(enumeration.outcome, EnumerationOutcome::Truncated);
        assert_eq!(enumeration.assignments.len(), 100);
        assert_all_satisfy(&component, &enumeration);
    }

    #[test]
    fn test_zero_timeout_aborts() {
        // 2^20 unconstrained layouts cannot finish inside a zero deadline.
        let component = Component {
            variables: (0..20).map(|c| p(0, c)).collect(),
            constraints: Vec::new(),
        };
        let enumeration =
            Enumerator::new(20, usize::MAX, Duration::ZERO).enumerate(&component);
        assert_eq!(enumeration.outcome, EnumerationOutcome::TimedOut);
        assert!(enumeration.assignments.len() < 1 << 20);
        assert!(!enumeration.outcome.is_exact());
    }

    #[test]
    fn test_every_assignment_satisfies_grid_constraints() {
        // A ring of overlapping clues around a 3x3 hole.
        let vars: Vec<Position> = (0..3).flat_map(|r| (0..3).map(move |c| p(r, c))).collect();
        let constraints = vec![
            Constraint::new([p(0, 0), p(0, 1), p(1, 0), p(1, 1)], 1),
            Constraint::new([p(0, 1), p(0, 2), p(1, 1), p(1, 2)], 2),
            Constraint::new([p(1, 0), p(1, 1), p(2, 0), p(2, 1)], 1),
            Constraint::new([p(1, 1), p(1, 2), p(2, 1), p(2, 2)], 2),
        ];
        let component = single_component(&vars, constraints);
        let enumeration = enumerator().enumerate(&component);
        assert_eq!(enumeration.outcome, EnumerationOutcome::Complete);
        assert!(!enumeration.assignments.is_empty());
        assert_all_satisfy(&component, &enumeration);
    }
}
