use crate::error::{Result, SolverError};
use rand::SeedableRng;
use rand::prelude::IndexedRandom;
use rand::rngs::StdRng;

/// A cell coordinate on the board. Ordering is row-major, which is the
/// deterministic tie-break order used throughout the solver.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

/// The visible state of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CellState {
    Concealed,
    Revealed,
    /// Concealed, but flagged as a mine by the player or the solver.
    Marked,
}

/// Lifecycle of a game. `Won` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Ongoing,
    Won,
    Lost,
}

/// What a call to [`Grid::probe`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The probe was safe; `cells` counts everything revealed, cascade included.
    Revealed { cells: usize },
    /// The cell was not concealed, or the game is already over.
    AlreadyHandled,
    /// A mine was hit and the game is lost.
    Exploded,
    OutOfBounds,
}

/// The board: mine layout, adjacency counts and visible cell states, stored
/// as flat row-major arrays.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    total_mines: usize,
    seed: Option<u64>,
    mines: Vec<bool>,
    counts: Vec<u8>,
    states: Vec<CellState>,
    mines_placed: bool,
    /// Number of safe cells revealed so far.
    revealed: usize,
    game_state: GameState,
}

impl Grid {
    /// Creates an empty board. Mines are placed on the first probe.
    pub fn new(width: usize, height: usize, total_mines: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SolverError::InvalidDimensions { width, height });
        }
        let cells = width * height;
        if total_mines >= cells {
            return Err(SolverError::TooManyMines {
                mines: total_mines,
                cells,
            });
        }
        Ok(Grid {
            width,
            height,
            total_mines,
            seed: None,
            mines: vec![false; cells],
            counts: vec![0; cells],
            states: vec![CellState::Concealed; cells],
            mines_placed: false,
            revealed: 0,
            game_state: GameState::Ongoing,
        })
    }

    /// Fixes the seed used for mine placement, making the layout reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds a board with a fixed mine layout. The first probe will not
    /// move any mine, so it may be fatal.
    pub fn with_mines(width: usize, height: usize, mines: &[Position]) -> Result<Self> {
        let mut grid = Grid::new(width, height, mines.len())?;
        for &position in mines {
            let idx = grid
                .index(position)
                .ok_or(SolverError::OutOfBounds { position })?;
            if grid.mines[idx] {
                return Err(SolverError::DuplicateMine { position });
            }
            grid.mines[idx] = true;
        }
        grid.compute_counts();
        grid.mines_placed = true;
        Ok(grid)
    }

    /// Deserializes a grid from bytes.
    pub fn deserialize(bts: &[u8]) -> anyhow::Result<Self> {
        Ok(bcs::from_bytes(bts)?)
    }

    /// Serializes the grid to bytes.
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    // --- Queries ---

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn total_mines(&self) -> usize {
        self.total_mines
    }

    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    pub fn game_state(&self) -> GameState {
        self.game_state
    }

    pub fn is_over(&self) -> bool {
        self.game_state != GameState::Ongoing
    }

    /// True until some cell has been revealed.
    pub fn is_first_probe(&self) -> bool {
        !self.states.contains(&CellState::Revealed)
    }

    pub fn contains(&self, at: Position) -> bool {
        at.row < self.height && at.col < self.width
    }

    pub fn state(&self, at: Position) -> Option<CellState> {
        self.index(at).map(|idx| self.states[idx])
    }

    /// The adjacency count of a revealed safe cell. Concealed cells have no
    /// known value.
    pub fn value(&self, at: Position) -> Option<u8> {
        let idx = self.index(at)?;
        (self.states[idx] == CellState::Revealed && !self.mines[idx]).then_some(self.counts[idx])
    }

    /// Ground truth for renderers once the game is over. The solver never
    /// looks at this.
    pub fn has_mine(&self, at: Position) -> bool {
        self.index(at).is_some_and(|idx| self.mines[idx])
    }

    pub fn concealed_cells(&self) -> Vec<Position> {
        self.cells_in_state(CellState::Concealed)
    }

    pub fn revealed_cells(&self) -> Vec<Position> {
        self.cells_in_state(CellState::Revealed)
    }

    pub fn marked_cells(&self) -> Vec<Position> {
        self.cells_in_state(CellState::Marked)
    }

    /// Mines not yet accounted for by a mark or an explosion.
    pub fn remaining_mines(&self) -> usize {
        let accounted = self
            .states
            .iter()
            .zip(&self.mines)
            .filter(|&(&state, &mine)| {
                state == CellState::Marked || (state == CellState::Revealed && mine)
            })
            .count();
        self.total_mines.saturating_sub(accounted)
    }

    /// The up to 8 in-bounds neighbours of a cell, in row-major order.
    pub fn neighbors(&self, at: Position) -> impl Iterator<Item = Position> {
        let width = self.width;
        let height = self.height;

        (-1..=1isize).flat_map(move |dr| {
            (-1..=1isize).filter_map(move |dc| {
                if dr == 0 && dc == 0 {
                    return None;
                }
                let row = at.row.checked_add_signed(dr)?;
                let col = at.col.checked_add_signed(dc)?;
                (row < height && col < width).then_some(Position { row, col })
            })
        })
    }

    // --- Mutations ---

    /// Reveals a cell. The first probe of a game places the mines so that the
    /// probed cell and its neighbours are safe.
    pub fn probe(&mut self, at: Position) -> Probe {
        let Some(idx) = self.index(at) else {
            return Probe::OutOfBounds;
        };
        if self.is_over() || self.states[idx] != CellState::Concealed {
            return Probe::AlreadyHandled;
        }

        if !self.mines_placed {
            self.place_mines(at);
        }

        if self.mines[idx] {
            self.states[idx] = CellState::Revealed;
            self.game_state = GameState::Lost;
            log::debug!("probe at {at:?} hit a mine");
            return Probe::Exploded;
        }

        let cells = self.flood_reveal(idx);

        if self.revealed == self.cells() - self.total_mines {
            self.game_state = GameState::Won;
            log::debug!("all safe cells revealed");
        }

        Probe::Revealed { cells }
    }

    /// Flags a concealed cell. Returns whether anything changed.
    pub fn mark(&mut self, at: Position) -> bool {
        self.swap_state(at, CellState::Concealed, CellState::Marked)
    }

    /// Clears a flag. Returns whether anything changed.
    pub fn unmark(&mut self, at: Position) -> bool {
        self.swap_state(at, CellState::Marked, CellState::Concealed)
    }

    pub fn toggle_mark(&mut self, at: Position) -> bool {
        self.mark(at) || self.unmark(at)
    }

    // --- Internals ---

    fn index(&self, at: Position) -> Option<usize> {
        self.contains(at).then_some(at.row * self.width + at.col)
    }

    fn position(&self, idx: usize) -> Position {
        Position {
            row: idx / self.width,
            col: idx % self.width,
        }
    }

    fn cells_in_state(&self, wanted: CellState) -> Vec<Position> {
        (0..self.cells())
            .filter(|&idx| self.states[idx] == wanted)
            .map(|idx| self.position(idx))
            .collect()
    }

    fn swap_state(&mut self, at: Position, from: CellState, to: CellState) -> bool {
        match self.index(at) {
            Some(idx) if !self.is_over() && self.states[idx] == from => {
                self.states[idx] = to;
                true
            }
            _ => false,
        }
    }

    fn place_mines(&mut self, first: Position) {
        let seed = self.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut excluded: Vec<Position> = self.neighbors(first).collect();
        excluded.push(first);

        let mut available: Vec<usize> = (0..self.cells())
            .filter(|&idx| !excluded.contains(&self.position(idx)))
            .collect();
        if available.len() < self.total_mines {
            // Board too dense for a safe opening; only the probed cell is spared.
            available = (0..self.cells())
                .filter(|&idx| self.position(idx) != first)
                .collect();
        }

        let chosen: Vec<usize> = available
            .choose_multiple(&mut rng, self.total_mines)
            .copied()
            .collect();
        for idx in chosen {
            self.mines[idx] = true;
        }

        self.compute_counts();
        self.mines_placed = true;
        log::debug!(
            "placed {} mines on a {}x{} board (seed {seed})",
            self.total_mines,
            self.width,
            self.height
        );
    }

    fn compute_counts(&mut self) {
        for idx in 0..self.cells() {
            let at = self.position(idx);
            let count = self
                .neighbors(at)
                .filter(|&n| self.has_mine(n))
                .count();
            self.counts[idx] = count as u8;
        }
    }

    /// Reveals `start` and, through a worklist, every cell reachable across
    /// zero-count cells. Marked cells are left alone.
    fn flood_reveal(&mut self, start: usize) -> usize {
        let mut stack = vec![start];
        let mut revealed = 0;

        while let Some(idx) = stack.pop() {
            if self.states[idx] != CellState::Concealed || self.mines[idx] {
                continue;
            }
            self.states[idx] = CellState::Revealed;
            self.revealed += 1;
            revealed += 1;

            if self.counts[idx] == 0 {
                let at = self.position(idx);
                for n in self.neighbors(at) {
                    let n_idx = n.row * self.width + n.col;
                    if self.states[n_idx] == CellState::Concealed {
                        stack.push(n_idx);
                    }
                }
            }
        }

        revealed
    }
}
