use minesweeper_solver as ms;
use wasm_bindgen::prelude::*;

fn load(bts: &[u8]) -> Result<ms::Grid, String> {
    ms::Grid::deserialize(bts).map_err(|e| e.to_string())
}

fn store(grid: &ms::Grid) -> Result<Vec<u8>, String> {
    grid.serialize().map_err(|e| e.to_string())
}

fn solver(strategy: u8) -> Result<ms::Solver, String> {
    let strategy = match strategy {
        0 => ms::Strategy::Logic,
        2 => ms::Strategy::Hybrid,
        _ => ms::Strategy::Exact,
    };
    ms::Solver::new(ms::SolverConfig::default().with_strategy(strategy)).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn create_game(width: u8, height: u8, mines: u16, seed: u64) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let grid = ms::Grid::new(width as usize, height as usize, mines as usize)
        .map_err(|e| e.to_string())?
        .with_seed(seed);
    store(&grid)
}

/// Probes a cell. The new state is followed by one byte: 0 if the cell
/// was safe, 1 if it was a mine.
#[wasm_bindgen]
pub fn probe(bts: Vec<u8>, row: usize, col: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut grid = load(&bts)?;
    let exploded = matches!(
        grid.probe(ms::Position::new(row, col)),
        ms::Probe::Exploded
    );
    let mut xs = store(&grid)?;
    xs.push(if exploded { 1 } else { 0 });
    Ok(xs)
}

#[wasm_bindgen]
pub fn toggle_mark(bts: Vec<u8>, row: usize, col: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut grid = load(&bts)?;
    grid.toggle_mark(ms::Position::new(row, col));
    store(&grid)
}

/// Asks the solver for a move. Deciding may flag proven mines, so the
/// new state is returned, followed by `[1, row, col]` or `[0, 0, 0]`.
#[wasm_bindgen]
pub fn next_move(bts: Vec<u8>, strategy: u8) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut grid = load(&bts)?;
    let target = solver(strategy)?
        .get_next_move(&mut grid)
        .map_err(|e| e.to_string())?;
    let mut xs = store(&grid)?;
    xs.extend(encode_move(target)?);
    Ok(xs)
}

fn encode_move(target: Option<ms::Position>) -> Result<[u8; 3], String> {
    let Some(at) = target else {
        return Ok([0, 0, 0]);
    };
    let row = u8::try_from(at.row).map_err(|_| format!("row {} does not fit in a byte", at.row))?;
    let col = u8::try_from(at.col).map_err(|_| format!("column {} does not fit in a byte", at.col))?;
    Ok([1, row, col])
}

/// Row-major mine probabilities from a fresh decision on a copy of the
/// state. Cells without an estimate are -1.
#[wasm_bindgen]
pub fn probabilities(bts: Vec<u8>, strategy: u8) -> Result<Vec<f64>, String> {
    console_error_panic_hook::set_once();

    let mut grid = load(&bts)?;
    let mut solver = solver(strategy)?;
    solver.get_next_move(&mut grid).map_err(|e| e.to_string())?;

    let probs = solver.get_probabilities();
    Ok((0..grid.height())
        .flat_map(|row| (0..grid.width()).map(move |col| ms::Position::new(row, col)))
        .map(|at| probs.get(&at).copied().unwrap_or(-1.0))
        .collect())
}

/// Row-major cell view: the count for revealed cells, -1 concealed,
/// -2 marked, -3 an exploded mine.
#[wasm_bindgen]
pub fn get_cells(bts: Vec<u8>) -> Result<Vec<i8>, String> {
    console_error_panic_hook::set_once();

    let grid = load(&bts)?;
    Ok((0..grid.height())
        .flat_map(|row| (0..grid.width()).map(move |col| ms::Position::new(row, col)))
        .map(|at| match (grid.state(at), grid.value(at)) {
            (Some(ms::CellState::Revealed), Some(n)) => n as i8,
            (Some(ms::CellState::Revealed), None) => -3,
            (Some(ms::CellState::Marked), _) => -2,
            _ => -1,
        })
        .collect())
}

#[wasm_bindgen]
pub fn game_state(bts: Vec<u8>) -> Result<u8, String> {
    console_error_panic_hook::set_once();

    let grid = load(&bts)?;
    Ok(match grid.game_state() {
        ms::GameState::Ongoing => 0,
        ms::GameState::Won => 1,
        ms::GameState::Lost => 2,
    })
}
