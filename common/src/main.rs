use minesweeper_solver::*;
use std::thread;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    // --- 1. Initialization ---
    let mut args = std::env::args().skip(1);
    let strategy = match args.next().as_deref() {
        Some("logic") => Strategy::Logic,
        Some("hybrid") => Strategy::Hybrid,
        _ => Strategy::Exact,
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(7);

    let mut grid = Grid::new(16, 16, 40)?.with_seed(seed);
    let mut solver = Solver::new(SolverConfig::default().with_strategy(strategy))?;

    println!("--- Autonomous Minesweeper Bot ---");
    println!("Strategy: {} (seed {seed})", solver.selector_name());
    print_board(&grid);

    // --- 2. Game Loop ---
    let mut move_count = 0;
    while let Some(at) = solver.get_next_move(&mut grid)? {
        move_count += 1;
        let kind = solver
            .last_report()
            .map(|r| r.kind)
            .unwrap_or_default();
        let risk = solver.get_probabilities().get(&at).copied();

        println!("\n--- Move #{move_count} ---");
        match risk {
            Some(p) => println!("Bot reveals ({}, {}) [{kind:?}, p = {p:.3}]", at.row, at.col),
            None => println!("Bot reveals ({}, {}) [{kind:?}]", at.row, at.col),
        }

        solver.make_move(&mut grid, at.row, at.col);
        print_board(&grid);

        thread::sleep(Duration::from_millis(100));
    }

    // --- 3. Final Result ---
    println!("\n--- Game Over ---");
    match grid.game_state() {
        GameState::Won => println!("Result: The bot won!"),
        GameState::Lost => println!("Result: The bot hit a mine and lost."),
        GameState::Ongoing => println!("Result: The game ended unexpectedly."),
    }
    let stats = solver.stats();
    println!(
        "Moves: {}, deductions: {}, guesses: {}",
        stats.moves, stats.logical_deductions, stats.probability_guesses
    );

    Ok(())
}

fn print_board(grid: &Grid) {
    // Print header
    print!("   ");
    for col in 0..grid.width() {
        print!("{:^3}", col);
    }
    println!("\n  +{}", "---".repeat(grid.width()));

    // Print rows
    for row in 0..grid.height() {
        print!("{:^2}|", row);
        for col in 0..grid.width() {
            let at = Position::new(row, col);
            let display = match (grid.state(at), grid.value(at)) {
                (Some(CellState::Marked), _) => " F ".to_string(),
                (Some(CellState::Revealed), Some(0)) => " . ".to_string(),
                (Some(CellState::Revealed), Some(n)) => format!(" {} ", n),
                (Some(CellState::Revealed), None) => " * ".to_string(),
                _ => " ■ ".to_string(),
            };
            print!("{}", display);
        }
        println!();
    }
    println!();
}
