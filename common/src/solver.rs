use crate::config::{SolverConfig, Strategy};
use crate::error::Result;
use crate::grid::{Grid, Position, Probe};
use crate::probability::ProbabilityMap;
use crate::selector::{
    ExactSelector, HybridSelector, LogicSelector, MoveSelector, RoundReport, SolverStats,
};

/// The public face of the decision core.
///
/// Holds the active selector, the move counters and the last probability
/// map. The grid stays with the caller and is lent for each call.
pub struct Solver {
    selector: Box<dyn MoveSelector>,
    stats: SolverStats,
    last_probabilities: ProbabilityMap,
    last_report: Option<RoundReport>,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let selector: Box<dyn MoveSelector> = match config.strategy {
            Strategy::Logic => Box::new(LogicSelector),
            Strategy::Exact => Box::new(ExactSelector::new(config)),
            Strategy::Hybrid => Box::new(HybridSelector::new(config)),
        };
        Ok(Self::with_selector(selector))
    }

    pub fn with_selector(selector: Box<dyn MoveSelector>) -> Self {
        Solver {
            selector,
            stats: SolverStats::default(),
            last_probabilities: ProbabilityMap::new(),
            last_report: None,
        }
    }

    pub fn selector_name(&self) -> &'static str {
        self.selector.name()
    }

    /// The cell to probe next, or `None` once the game is over or nothing is
    /// concealed. May flag cells that are proven mines.
    pub fn get_next_move(&mut self, grid: &mut Grid) -> Result<Option<Position>> {
        let decision = self.selector.select(grid, &mut self.stats)?;
        self.last_probabilities = decision.probabilities;
        self.last_report = Some(decision.report);
        Ok(decision.target)
    }

    /// The map computed by the last [`Solver::get_next_move`].
    pub fn get_probabilities(&self) -> &ProbabilityMap {
        &self.last_probabilities
    }

    /// Probes a cell. Returns `false` if it was a mine (or off the board).
    /// Only probes that touch a concealed cell count as moves.
    pub fn make_move(&mut self, grid: &mut Grid, row: usize, col: usize) -> bool {
        match grid.probe(Position::new(row, col)) {
            Probe::Revealed { .. } => {
                self.stats.moves += 1;
                true
            }
            Probe::Exploded => {
                self.stats.moves += 1;
                false
            }
            Probe::AlreadyHandled => true,
            Probe::OutOfBounds => false,
        }
    }

    /// Picks a move and plays it. Returns the probed cell and whether it
    /// was safe, or `None` when there was nothing to play.
    pub fn step(&mut self, grid: &mut Grid) -> Result<Option<(Position, bool)>> {
        let Some(at) = self.get_next_move(grid)? else {
            return Ok(None);
        };
        let safe = self.make_move(grid, at.row, at.col);
        Ok(Some((at, safe)))
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    pub fn last_report(&self) -> Option<&RoundReport> {
        self.last_report.as_ref()
    }
}
