//! Star Battle deduction engine.
//!
//! Given a grid partitioned into irregular regions and a star quota per
//! row, column, and region, the engine emits human-comprehensible deductive
//! steps: a single next hint, or an auto-solve loop that drives the board
//! to completion using only such steps. Every hint is sound — it follows
//! from the puzzle constraints plus the current board — and hints are
//! preferred in a strict priority order from simplest to most
//! sophisticated.
//!
//! # Example
//!
//! ```
//! use starbattle_core::{
//!     parse_puzzle, BoardState, CancelToken, SolveOptions, SolveOutcome, Solver,
//! };
//!
//! let (def, marks) = parse_puzzle("1 1 2 2\n1 2 2 2\n3 3 4 4\n3 4 4 4", 1).unwrap();
//! let mut board = BoardState::new(def, marks).unwrap();
//! let solver = Solver::new();
//! let outcome = solver.auto_solve(&mut board, &SolveOptions::default(), &CancelToken::new());
//! assert_eq!(outcome, SolveOutcome::Solved);
//! ```

pub mod board;
pub mod geometry;
pub mod puzzle;
pub mod solver;
pub mod validator;

pub use board::{BoardError, BoardState, CellDeduction, CellState, DeductionKind};
pub use geometry::{Band, BandAxis, Block};
pub use puzzle::{parse_puzzle, ParseError, PuzzleDefinition, RegionId};
pub use solver::entangle::loader::{
    FeatureContext, FeatureEvaluator, NullFeatureEvaluator, SpecError, SpecLibrary,
};
pub use solver::entangle::symmetry::D4;
pub use solver::{
    CancelToken, Hint, HintOutcome, SolveOptions, SolveOutcome, Solver, Step, Technique,
    TechniqueSet,
};
pub use validator::PlacementValidator;
