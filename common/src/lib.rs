//! Decision core for a minesweeper solver.
//!
//! Revealed clues become sum constraints over concealed cells. Local logic
//! settles what it can; the rest is split into independent components whose
//! layouts are enumerated exactly, and the least dangerous cell is probed.

pub mod components;
pub mod config;
pub mod constraint;
pub mod enumerate;
pub mod error;
pub mod grid;
pub mod probability;
pub mod sat;
pub mod selector;
pub mod solver;

pub use components::{Component, ComponentDetector, ComponentStats};
pub use config::{SolverConfig, Strategy};
pub use constraint::{Constraint, ConstraintBuilder, ConstraintSet, Simplified};
pub use enumerate::{Assignment, Enumeration, EnumerationOutcome, Enumerator};
pub use error::{Result, SolverError};
pub use grid::{CellState, GameState, Grid, Position, Probe};
pub use probability::{ProbabilityCalculator, ProbabilityMap};
pub use selector::{
    ComponentReport, Decision, DecisionKind, ExactSelector, HybridSelector, LogicSelector,
    MoveSelector, RoundReport, SolverStats,
};
pub use solver::Solver;
