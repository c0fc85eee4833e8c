//! Basic example of using the Star Battle engine

use starbattle_core::{
    parse_puzzle, BoardState, CancelToken, HintOutcome, SolveOptions, Solver,
};

fn main() {
    // A 4x4 one-star puzzle with a unique solution
    let puzzle = "1 1 2 2\n1 2 2 2\n3 3 4 4\n3 4 4 4";
    let (def, marks) = parse_puzzle(puzzle, 1).expect("valid puzzle");
    let mut board = BoardState::new(def, marks).expect("valid board");

    println!("Puzzle:");
    println!("{}", board.to_puzzle_string());

    let solver = Solver::new();
    let options = SolveOptions::default();
    let cancel = CancelToken::new();

    // Ask for the first hint
    match solver.find_next_hint(&board, &options, &cancel) {
        HintOutcome::Hint(hint) => {
            println!("Technique: {}", hint.technique);
            println!("Explanation: {}", hint.explanation);
        }
        HintOutcome::NoHint => println!("No technique applies."),
        HintOutcome::Cancelled => println!("Cancelled."),
    }

    // Solve it step by step
    println!("\nSolving...");
    let outcome = solver.auto_solve(&mut board, &options, &cancel);
    println!("Outcome: {:?}\n", outcome);
    println!("{}", board.to_puzzle_string());
}
