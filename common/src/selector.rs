use crate::components::{Component, ComponentDetector, ComponentStats};
use crate::config::SolverConfig;
use crate::constraint::ConstraintBuilder;
use crate::enumerate::{EnumerationOutcome, Enumerator};
use crate::error::Result;
use crate::grid::{CellState, Grid, Position};
use crate::probability::{ProbabilityCalculator, ProbabilityMap};
use crate::sat;
use std::collections::BTreeSet;
use std::time::Instant;

/// Counters shared by every selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub moves: usize,
    pub logical_deductions: usize,
    pub probability_guesses: usize,
}

impl SolverStats {
    pub fn reset(&mut self) {
        *self = SolverStats::default();
    }
}

/// Why a cell was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecisionKind {
    /// Nothing is known yet; a fixed opening cell.
    Opening,
    /// The cell is certainly safe.
    Deduced,
    /// The least dangerous cell, with some risk.
    Guess,
    /// No concealed cell is left, or the game is over.
    #[default]
    NoMove,
}

/// What happened to one component during a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentReport {
    pub size: usize,
    pub outcome: EnumerationOutcome,
    pub assignments: usize,
    /// The component's probabilities came from a SAT backbone.
    pub backbone: bool,
}

/// Diagnostics for the last decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundReport {
    pub kind: DecisionKind,
    /// Cells flagged as mines while deciding.
    pub marked: Vec<Position>,
    pub components: ComponentStats,
    pub enumerations: Vec<ComponentReport>,
}

#[derive(Debug, Clone, Default)]
pub struct Decision {
    pub target: Option<Position>,
    pub probabilities: ProbabilityMap,
    pub report: RoundReport,
}

impl Decision {
    fn none() -> Self {
        Decision::default()
    }

    fn opening(grid: &Grid) -> Self {
        let center = Position::new(grid.height() / 2, grid.width() / 2);
        let target = if grid.state(center) == Some(CellState::Concealed) {
            Some(center)
        } else {
            grid.concealed_cells().first().copied()
        };
        Decision {
            target,
            probabilities: ProbabilityMap::new(),
            report: RoundReport {
                kind: DecisionKind::Opening,
                ..RoundReport::default()
            },
        }
    }
}

/// A policy for picking the next probe.
///
/// Selectors may flag cells they prove to be mines, which is why they get
/// the grid mutably. Everything else is recomputed from the grid on each
/// call.
pub trait MoveSelector {
    fn name(&self) -> &'static str;

    fn select(&self, grid: &mut Grid, stats: &mut SolverStats) -> Result<Decision>;
}

/// Handles the cases every selector treats the same way: a finished game
/// and the opening move.
fn trivial_decision(grid: &Grid) -> Option<Decision> {
    if grid.is_over() || grid.concealed_cells().is_empty() {
        return Some(Decision::none());
    }
    if grid.is_first_probe() {
        return Some(Decision::opening(grid));
    }
    None
}

// --- Pure logic ---

/// Baseline: one pass of the clue rules, then naive per-clue probabilities.
///
/// A clue with nothing left to find frees its cells; a clue that needs all
/// its cells flags them. Otherwise every cell gets the mean of
/// `target / cells` over the clues that touch it, or the board's mine
/// density when no clue does. Clues are never combined.
#[derive(Debug, Clone, Default)]
pub struct LogicSelector;

impl MoveSelector for LogicSelector {
    fn name(&self) -> &'static str {
        "logic"
    }

    fn select(&self, grid: &mut Grid, stats: &mut SolverStats) -> Result<Decision> {
        if let Some(decision) = trivial_decision(grid) {
            return Ok(decision);
        }

        let set = ConstraintBuilder::new(grid).build()?;
        let mut safe = Vec::new();
        let mut mines = Vec::new();
        for c in &set.constraints {
            if c.target == 0 {
                safe.extend(c.variables.iter().copied());
            } else if c.target == c.variables.len() {
                mines.extend(c.variables.iter().copied());
            }
        }

        if let Some(&target) = safe.iter().min() {
            stats.logical_deductions += 1;
            return Ok(Decision {
                target: Some(target),
                probabilities: safe.iter().map(|&p| (p, 0.0)).collect(),
                report: RoundReport {
                    kind: DecisionKind::Deduced,
                    ..RoundReport::default()
                },
            });
        }

        mines.sort_unstable();
        mines.dedup();
        for &mine in &mines {
            grid.mark(mine);
        }

        // Clues again, now that the flags are down.
        let set = ConstraintBuilder::new(grid).build()?;
        let mut sums: std::collections::BTreeMap<Position, (f64, usize)> = set
            .variables
            .iter()
            .map(|&v| (v, (0.0, 0)))
            .collect();
        for c in &set.constraints {
            let local = (c.target as f64 / c.variables.len() as f64).clamp(0.0, 1.0);
            for v in &c.variables {
                if let Some(entry) = sums.get_mut(v) {
                    entry.0 += local;
                    entry.1 += 1;
                }
            }
        }

        let density = if set.variables.is_empty() {
            crate::probability::UNIFORM_FALLBACK
        } else {
            (grid.remaining_mines() as f64 / set.variables.len() as f64).min(1.0)
        };
        let probabilities: ProbabilityMap = sums
            .into_iter()
            .map(|(v, (sum, n))| (v, if n == 0 { density } else { sum / n as f64 }))
            .collect();

        let target = ProbabilityCalculator::best_move(&probabilities);
        if target.is_some() {
            stats.probability_guesses += 1;
        }
        log::debug!("logic selector: guessing {target:?}");

        let mut display = probabilities;
        display.extend(mines.iter().map(|&m| (m, 1.0)));
        Ok(Decision {
            target,
            probabilities: display,
            report: RoundReport {
                kind: if target.is_some() {
                    DecisionKind::Guess
                } else {
                    DecisionKind::NoMove
                },
                marked: mines,
                ..RoundReport::default()
            },
        })
    }
}

// --- Decomposition and enumeration ---

/// Simplification, then per-component exact enumeration.
///
/// Components that cannot be enumerated exactly get the uniform fallback.
#[derive(Debug, Clone)]
pub struct ExactSelector {
    config: SolverConfig,
}

impl ExactSelector {
    pub fn new(config: SolverConfig) -> Self {
        ExactSelector { config }
    }
}

impl MoveSelector for ExactSelector {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn select(&self, grid: &mut Grid, stats: &mut SolverStats) -> Result<Decision> {
        decide(grid, stats, &self.config, |component, enumerator| {
            Ok(enumerate_component(component, enumerator))
        })
    }
}

/// `ExactSelector`, except that a component too large or too slow to
/// enumerate is handed to the SAT backbone, so its forced cells still come
/// out as 0 or 1.
#[derive(Debug, Clone)]
pub struct HybridSelector {
    config: SolverConfig,
}

impl HybridSelector {
    pub fn new(config: SolverConfig) -> Self {
        HybridSelector { config }
    }
}

impl MoveSelector for HybridSelector {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn select(&self, grid: &mut Grid, stats: &mut SolverStats) -> Result<Decision> {
        decide(grid, stats, &self.config, |component, enumerator| {
            let started = Instant::now();
            let (probabilities, report) = enumerate_component(component, enumerator);
            if !matches!(
                report.outcome,
                EnumerationOutcome::TooLarge | EnumerationOutcome::TimedOut
            ) {
                return Ok((probabilities, report));
            }

            // The backbone shares the component's time bound with enumeration.
            let remaining = enumerator.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                log::warn!(
                    "no time left for the backbone of a {}-variable component",
                    component.len()
                );
                return Ok((probabilities, report));
            }

            match sat::backbone(component, enumerator.mine_budget, remaining)? {
                Some(deductions) => {
                    let probabilities = deductions
                        .into_iter()
                        .map(|(v, state)| (v, state.probability()))
                        .collect();
                    Ok((
                        probabilities,
                        ComponentReport {
                            backbone: true,
                            ..report
                        },
                    ))
                }
                None => {
                    log::warn!(
                        "component of {} variables has no consistent layout; using uniform fallback",
                        component.len()
                    );
                    Ok((ProbabilityCalculator::uniform(&component.variables), report))
                }
            }
        })
    }
}

fn enumerate_component(
    component: &Component,
    enumerator: &Enumerator,
) -> (ProbabilityMap, ComponentReport) {
    let enumeration = enumerator.enumerate(component);
    if enumeration.outcome == EnumerationOutcome::Inconsistent {
        log::warn!(
            "component of {} variables has no consistent layout; using uniform fallback",
            component.len()
        );
    }
    let probabilities =
        ProbabilityCalculator::probabilities(&component.variables, &enumeration.assignments);
    let report = ComponentReport {
        size: component.len(),
        outcome: enumeration.outcome,
        assignments: enumeration.assignments.len(),
        backbone: false,
    };
    (probabilities, report)
}

/// The shared decision pipeline of the exact and hybrid selectors.
fn decide<F>(
    grid: &mut Grid,
    stats: &mut SolverStats,
    config: &SolverConfig,
    resolve: F,
) -> Result<Decision>
where
    F: Fn(&Component, &Enumerator) -> Result<(ProbabilityMap, ComponentReport)>,
{
    if let Some(decision) = trivial_decision(grid) {
        return Ok(decision);
    }

    // 1. Clues and local logic.
    let set = ConstraintBuilder::new(grid).build()?;
    let simplified = ConstraintBuilder::simplify(set.variables, set.constraints)?;

    let mut display: ProbabilityMap = simplified
        .certain_safe
        .iter()
        .map(|&p| (p, 0.0))
        .chain(simplified.certain_mines.iter().map(|&p| (p, 1.0)))
        .collect();

    if let Some(&target) = simplified.certain_safe.first() {
        stats.logical_deductions += 1;
        log::debug!(
            "{} cells deduced safe, probing {target:?}",
            simplified.certain_safe.len()
        );
        return Ok(Decision {
            target: Some(target),
            probabilities: display,
            report: RoundReport {
                kind: DecisionKind::Deduced,
                ..RoundReport::default()
            },
        });
    }

    // 2. Flag what logic proved, and keep going.
    let marked: Vec<Position> = simplified.certain_mines.iter().copied().collect();
    for &mine in &marked {
        grid.mark(mine);
    }

    if simplified.constraints.is_empty() {
        let target = simplified.variables.first().copied();
        let kind = if target.is_some() {
            stats.probability_guesses += 1;
            DecisionKind::Guess
        } else {
            DecisionKind::NoMove
        };
        return Ok(Decision {
            target,
            probabilities: display,
            report: RoundReport {
                kind,
                marked,
                ..RoundReport::default()
            },
        });
    }

    // 3. Independent components, each enumerated on its own.
    let enumerator = Enumerator::new(
        config.max_component_size,
        config.max_assignments,
        config.timeout(),
    )
    .with_mine_budget(config.use_mine_budget.then(|| grid.remaining_mines()));

    let components =
        ComponentDetector::find_components(&simplified.variables, &simplified.constraints);
    let component_stats = ComponentStats::from_components(&components);

    let mut probabilities = ProbabilityMap::new();
    let mut enumerations = Vec::with_capacity(components.len());
    // Cells whose probability came from a sample rather than every layout.
    let mut sampled = BTreeSet::new();
    for component in &components {
        let (local, report) = resolve(component, &enumerator)?;
        if !report.outcome.is_exact() && !report.backbone {
            sampled.extend(component.variables.iter().copied());
        }
        probabilities.extend(local);
        enumerations.push(report);
    }

    // 4. The least dangerous cell.
    let target = ProbabilityCalculator::best_move(&probabilities);
    let kind = match target.map(|t| (t, probabilities[&t])) {
        Some((t, p)) if p <= config.epsilon && !sampled.contains(&t) => {
            stats.logical_deductions += 1;
            DecisionKind::Deduced
        }
        Some((t, p)) if p <= config.epsilon => {
            log::debug!("{t:?} looks safe only in a partial enumeration; counting a guess");
            stats.probability_guesses += 1;
            DecisionKind::Guess
        }
        Some(_) => {
            stats.probability_guesses += 1;
            DecisionKind::Guess
        }
        None => DecisionKind::NoMove,
    };
    log::debug!(
        "{} components (largest {}), chose {target:?} as {kind:?}",
        component_stats.count,
        component_stats.max
    );

    display.extend(probabilities);
    Ok(Decision {
        target,
        probabilities: display,
        report: RoundReport {
            kind,
            marked,
            components: component_stats,
            enumerations,
        },
    })
}
