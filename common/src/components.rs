use crate::constraint::Constraint;
use crate::grid::Position;
use std::collections::HashMap;

/// An independent sub-problem: variables that are linked through shared
/// constraints, and the constraints that live entirely inside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Sorted row-major.
    pub variables: Vec<Position>,
    pub constraints: Vec<Constraint>,
}

impl Component {
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Size summary of a decomposition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentStats {
    pub count: usize,
    pub sizes: Vec<usize>,
    pub max: usize,
    pub min: usize,
    pub mean: f64,
}

impl ComponentStats {
    pub fn from_components(components: &[Component]) -> Self {
        let sizes: Vec<usize> = components.iter().map(Component::len).collect();
        let count = sizes.len();
        let mean = if count == 0 {
            0.0
        } else {
            sizes.iter().sum::<usize>() as f64 / count as f64
        };
        ComponentStats {
            count,
            max: sizes.iter().copied().max().unwrap_or(0),
            min: sizes.iter().copied().min().unwrap_or(0),
            mean,
            sizes,
        }
    }
}

/// Splits the constraint hypergraph into connected components.
pub struct ComponentDetector;

impl ComponentDetector {
    /// Every variable ends up in exactly one component; a variable that no
    /// constraint mentions forms a component on its own.
    ///
    /// Traversal walks variable → constraint → variable, so the cost is
    /// linear in the total size of the constraints rather than quadratic in
    /// their arity.
    pub fn find_components(variables: &[Position], constraints: &[Constraint]) -> Vec<Component> {
        let mut ordered: Vec<Position> = variables.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let slot: HashMap<Position, usize> =
            ordered.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        // Constraint ids touching each variable.
        let mut incident: Vec<Vec<usize>> = vec![Vec::new(); ordered.len()];
        for (ci, c) in constraints.iter().enumerate() {
            for v in &c.variables {
                if let Some(&i) = slot.get(v) {
                    incident[i].push(ci);
                }
            }
        }

        const UNSEEN: usize = usize::MAX;
        let mut component_of = vec![UNSEEN; ordered.len()];
        let mut constraint_seen = vec![false; constraints.len()];
        let mut groups: Vec<Vec<Position>> = Vec::new();

        for start in 0..ordered.len() {
            if component_of[start] != UNSEEN {
                continue;
            }
            let id = groups.len();
            let mut members = Vec::new();
            let mut stack = vec![start];
            component_of[start] = id;

            while let Some(i) = stack.pop() {
                members.push(ordered[i]);
                for &ci in &incident[i] {
                    if constraint_seen[ci] {
                        continue;
                    }
                    constraint_seen[ci] = true;
                    for v in &constraints[ci].variables {
                        if let Some(&j) = slot.get(v) {
                            if component_of[j] == UNSEEN {
                                component_of[j] = id;
                                stack.push(j);
                            }
                        }
                    }
                }
            }

            members.sort_unstable();
            groups.push(members);
        }

        let mut components: Vec<Component> = groups
            .into_iter()
            .map(|variables| Component {
                variables,
                constraints: Vec::new(),
            })
            .collect();

        for c in constraints {
            let ids: Option<Vec<usize>> = c
                .variables
                .iter()
                .map(|v| slot.get(v).map(|&i| component_of[i]))
                .collect();
            match ids.as_deref() {
                Some([first, rest @ ..]) if rest.iter().all(|id| id == first) => {
                    components[*first].constraints.push(c.clone());
                }
                _ => log::warn!("constraint {c:?} does not fit in a single component"),
            }
        }

        log::debug!(
            "{} variables split into {} components",
            ordered.len(),
            components.len()
        );
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn test_shared_variables_merge_components() {
        // {A,B,C} and {B,C,D} overlap; {E,F} stands apart; G is unconstrained.
        let (a, b, c, d) = (p(0, 0), p(0, 1), p(0, 2), p(0, 3));
        let (e, f, g) = (p(5, 0), p(5, 1), p(9, 9));
        let constraints = vec![
            Constraint::new([a, b, c], 1),
            Constraint::new([b, c, d], 2),
            Constraint::new([e, f], 1),
        ];
        let components =
            ComponentDetector::find_components(&[g, f, e, d, c, b, a], &constraints);

        assert_eq!(components.len(), 3);
        assert_eq!(components[0].variables, vec![a, b, c, d]);
        assert_eq!(components[0].constraints.len(), 2);
        assert_eq!(components[1].variables, vec![e, f]);
        assert_eq!(components[1].constraints, vec![constraints[2].clone()]);
        assert_eq!(components[2].variables, vec![g]);
        assert!(components[2].constraints.is_empty());
    }

    #[test]
    fn test_components_partition_variables() {
        // Union of the components is the input, with no variable repeated.
        let variables: Vec<Position> = (0..6).flat_map(|r| (0..6).map(move |c| p(r, c))).collect();
        let constraints: Vec<Constraint> = (0..5)
            .map(|r| Constraint::new([p(r, 0), p(r + 1, 1)], 1))
            .chain((0..3).map(|c| Constraint::new([p(3, c), p(3, c + 2), p(4, c + 3)], 2)))
            .collect();

        let components = ComponentDetector::find_components(&variables, &constraints);

        let mut seen = BTreeSet::new();
        let mut total = 0;
        for component in &components {
            for &v in &component.variables {
                assert!(seen.insert(v), "{v:?} appears twice");
                total += 1;
            }
            for c in &component.constraints {
                assert!(c.variables.iter().all(|v| component.variables.contains(v)));
            }
        }
        assert_eq!(total, variables.len());
        assert_eq!(seen, variables.iter().copied().collect());

        let placed: usize = components.iter().map(|c| c.constraints.len()).sum();
        assert_eq!(placed, constraints.len());
    }

    #[test]
    fn test_long_chain_is_one_component() {
        // A chain of pairwise constraints links every cell.
        let variables: Vec<Position> = (0..500).map(|c| p(0, c)).collect();
        let constraints: Vec<Constraint> = variables
            .windows(2)
            .map(|w| Constraint::new([w[0], w[1]], 1))
            .collect();
        let components = ComponentDetector::find_components(&variables, &constraints);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 500);
    }

    #[test]
    fn test_component_stats() {
        let components = ComponentDetector::find_components(
            &[p(0, 0), p(0, 1), p(0, 2), p(3, 3)],
            &[Constraint::new([p(0, 0), p(0, 1), p(0, 2)], 1)],
        );
        let stats = ComponentStats::from_components(&components);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.sizes, vec![3, 1]);
        assert_eq!(stats.max, 3);
        assert_eq!(stats.min, 1);
        assert!((stats.mean - 2.0).abs() < 1e-12);

        assert_eq!(ComponentStats::from_components(&[]), ComponentStats::default());
    }
}
