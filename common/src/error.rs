use crate::grid::Position;

/// Errors surfaced by the decision core.
///
/// Genuine game ambiguity (an inconsistent component, an enumeration that
/// ran out of time) is never an error: those degrade to a fallback
/// probability and are only logged. The variants here are reserved for
/// states the caller has to look at.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("{mines} mines do not fit on a board of {cells} cells")]
    TooManyMines { mines: usize, cells: usize },

    #[error("position {position:?} is outside the grid")]
    OutOfBounds { position: Position },

    #[error("mine at {position:?} is listed more than once")]
    DuplicateMine { position: Position },

    /// A constraint whose target is negative or larger than its variable set.
    /// This points at a bug in constraint construction (or a wrong mark),
    /// not at an ambiguous board.
    #[error("malformed constraint from {origin:?}: target {target} over {variables} variables")]
    MalformedConstraint {
        origin: Option<Position>,
        target: i64,
        variables: usize,
    },

    /// A variable was deduced both safe and a mine in the same pass.
    #[error("cell {position:?} was deduced both safe and mined")]
    Contradiction { position: Position },

    #[error("invalid solver configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("sat backend failed: {0}")]
    Sat(String),
}

pub type Result<T, E = SolverError> = std::result::Result<T, E>;
