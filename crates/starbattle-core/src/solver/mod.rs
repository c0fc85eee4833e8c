//! Solver orchestrator.
//!
//! Owns the technique dispatch order, the per-board caches, and the loaded
//! entanglement specs. Techniques are pure functions over a per-step
//! `BoardFabric`; the dispatcher tries them in priority order and returns
//! the first actionable finding as a hint.

mod band_engine;
mod basic;
mod cache;
mod cage_engine;
mod counting;
pub(crate) mod explain;
mod fabric;
mod intersect;
mod quota;
mod stats_engine;
mod types;

pub mod entangle;

use std::cell::RefCell;

use crate::board::{BoardError, BoardState};
use crate::geometry::adjacent8;

use cache::SolveCaches;
use entangle::loader::{FeatureEvaluator, NullFeatureEvaluator, SpecError, SpecLibrary};
use explain::Finding;
use fabric::BoardFabric;

pub use entangle::loader::{FeatureContext, LoadedSpec, PairPattern, SpecMeta, TripleRule};
pub use explain::{Deduction, Step};
pub use stats_engine::{Constraint, ConstraintSource};
pub use types::{CancelToken, Hint, HintOutcome, SolveOptions, SolveOutcome, Technique, TechniqueSet};

/// Per-step context handed to every technique.
pub(crate) struct Ctx<'a> {
    pub board: &'a BoardState,
    pub fab: &'a BoardFabric,
    pub options: &'a SolveOptions,
    pub caches: &'a RefCell<SolveCaches>,
}

/// Check whether any two cells of a set touch (8-adjacency).
pub(crate) fn pairwise_adjacent(cells: &[usize], n: usize) -> bool {
    for (i, &a) in cells.iter().enumerate() {
        for &b in &cells[i + 1..] {
            if adjacent8(a, b, n) {
                return true;
            }
        }
    }
    false
}

/// The deduction engine. Construct once per session; all solve state is
/// per-call except the fingerprint-keyed caches and loaded specs.
pub struct Solver {
    library: SpecLibrary,
    evaluator: Box<dyn FeatureEvaluator>,
    caches: RefCell<SolveCaches>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// A solver with no entanglement specs and no feature evaluator.
    pub fn new() -> Self {
        Solver {
            library: SpecLibrary::new(),
            evaluator: Box::new(NullFeatureEvaluator),
            caches: RefCell::new(SolveCaches::new()),
        }
    }

    /// A solver with preloaded specs and a host feature evaluator.
    pub fn with_specs(library: SpecLibrary, evaluator: Box<dyn FeatureEvaluator>) -> Self {
        Solver {
            library,
            evaluator,
            caches: RefCell::new(SolveCaches::new()),
        }
    }

    /// Load one entanglement spec file; may be called lazily between solve
    /// calls. Returns whether the file was accepted (solutions dumps are
    /// skipped).
    pub fn load_spec(&mut self, id: &str, json: &str) -> Result<bool, SpecError> {
        self.library.load(id, json, self.evaluator.as_ref())
    }

    /// Loaded entanglement specs.
    pub fn spec_library(&self) -> &SpecLibrary {
        &self.library
    }

    /// Find the single next hint, or report that no enabled technique
    /// applies. Deterministic: the same board yields the same hint.
    pub fn find_next_hint(
        &self,
        board: &BoardState,
        options: &SolveOptions,
        cancel: &CancelToken,
    ) -> HintOutcome {
        if cancel.is_cancelled() {
            return HintOutcome::Cancelled;
        }
        self.caches.borrow_mut().ensure(board.fingerprint());
        let fab = BoardFabric::from_board(board);
        let ctx = Ctx {
            board,
            fab: &fab,
            options,
            caches: &self.caches,
        };
        match self.dispatch(&ctx) {
            Some(finding) => HintOutcome::Hint(finding.to_hint(fab.n)),
            None => HintOutcome::NoHint,
        }
    }

    /// Try every enabled technique in priority order; the first actionable
    /// finding wins. Meta-only findings are logged and skipped.
    fn dispatch(&self, ctx: &Ctx) -> Option<Finding> {
        for &technique in Technique::ALL {
            if !ctx.options.techniques.contains(technique) {
                continue;
            }
            let found = match technique {
                Technique::TwoByTwo => basic::find_two_by_two(ctx),
                Technique::FiveCrosses => basic::find_five_crosses(ctx),
                Technique::CandidateDeficit => counting::find_candidate_deficit(ctx),
                Technique::PartitionedCandidates => counting::find_partitioned_candidates(ctx),
                Technique::SharedLine => basic::find_shared_line(ctx),
                Technique::RowBandBudget => band_engine::find_row_band_budget(ctx),
                Technique::ColumnBandBudget => band_engine::find_column_band_budget(ctx),
                Technique::RegionRowPartition => band_engine::find_region_row_partition(ctx),
                Technique::RegionColumnPartition => band_engine::find_region_column_partition(ctx),
                Technique::ExclusiveRowBand => band_engine::find_exclusive_row_band(ctx),
                Technique::ExclusiveColumnBand => band_engine::find_exclusive_column_band(ctx),
                Technique::ExclusiveRegionRows => band_engine::find_exclusive_region_rows(ctx),
                Technique::ExclusiveRegionCols => band_engine::find_exclusive_region_cols(ctx),
                Technique::RegionBandSqueeze => band_engine::find_region_band_squeeze(ctx),
                Technique::BandCages => cage_engine::find_band_cages(ctx),
                Technique::CagesVsRegionQuota => cage_engine::find_cages_vs_region_quota(ctx),
                Technique::RegionCages => cage_engine::find_region_cages(ctx),
                Technique::CageExclusion => cage_engine::find_cage_exclusion(ctx),
                Technique::RowColumnSqueeze => intersect::find_row_column_squeeze(ctx),
                Technique::RegionBandIntersection => {
                    intersect::find_region_band_intersection(ctx)
                }
                Technique::RegionPairExclusion => intersect::find_region_pair_exclusion(ctx),
                Technique::PressuredTees => basic::find_pressured_tees(ctx),
                Technique::SubsetSqueeze => stats_engine::find_subset_squeeze(ctx),
                Technique::Entanglement => {
                    entangle::find_entanglement(ctx, &self.library, self.evaluator.as_ref())
                }
                Technique::Chains => None,
            };
            if let Some(finding) = found {
                if finding.is_actionable() {
                    log::debug!("technique {technique} produced a hint");
                    return Some(finding);
                }
                log::trace!("technique {technique} produced meta information only");
            }
        }
        None
    }

    /// Apply a hint's deductions. Deductions whose cells already hold the
    /// stated terminal state are no-ops.
    pub fn apply_hint(&self, board: &mut BoardState, hint: &Hint) -> Result<(), BoardError> {
        for &ded in &hint.deductions {
            board.apply(ded)?;
        }
        Ok(())
    }

    /// Request and apply hints until the board completes, no technique
    /// applies, a violation shows up, or the caller cancels. The iteration
    /// ceiling backstops runaway loops.
    pub fn auto_solve(
        &self,
        board: &mut BoardState,
        options: &SolveOptions,
        cancel: &CancelToken,
    ) -> SolveOutcome {
        for iteration in 0..options.iteration_ceiling {
            if cancel.is_cancelled() {
                return SolveOutcome::Cancelled;
            }
            if board.check_violation().is_some() {
                return SolveOutcome::Violation;
            }
            if board.is_complete() {
                log::debug!("auto-solve completed after {iteration} iterations");
                return SolveOutcome::Solved;
            }
            let hint = match self.find_next_hint(board, options, cancel) {
                HintOutcome::Hint(h) => h,
                HintOutcome::NoHint => return SolveOutcome::NoProgress,
                HintOutcome::Cancelled => return SolveOutcome::Cancelled,
            };
            if let Err(err) = self.apply_hint(board, &hint) {
                log::error!("hint application failed: {err}");
                return SolveOutcome::Violation;
            }
        }
        SolveOutcome::NoProgress
    }

    /// Build the stats-layer constraint list for the current board
    /// (diagnostics and host display).
    pub fn constraints(&self, board: &BoardState, options: &SolveOptions) -> Vec<Constraint> {
        self.caches.borrow_mut().ensure(board.fingerprint());
        let fab = BoardFabric::from_board(board);
        let ctx = Ctx {
            board,
            fab: &fab,
            options,
            caches: &self.caches,
        };
        stats_engine::build_constraints(&ctx)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{CellDeduction, CellState, DeductionKind};
    use crate::puzzle::parse_puzzle;

    fn board(text: &str, k: usize) -> BoardState {
        let (def, marks) = parse_puzzle(text, k).unwrap();
        BoardState::new(def, marks).unwrap()
    }

    /// Scenario: a 10x10 row with one star placed and one eligible cell
    /// left; candidate deficit stars the survivor.
    #[test]
    fn test_candidate_deficit_on_row() {
        let mut lines = vec!["1x 1x 1s 1x 1x 1x 1x 1x 1x 1".to_string()];
        for row in 1..10 {
            let digit = (row + 1) % 10;
            lines.push(vec![digit.to_string(); 10].join(" "));
        }
        let b = board(&lines.join("\n"), 2);
        let solver = Solver::new();
        let options = SolveOptions {
            techniques: TechniqueSet::only(&[Technique::CandidateDeficit]),
            ..SolveOptions::default()
        };
        let hint = match solver.find_next_hint(&b, &options, &CancelToken::new()) {
            HintOutcome::Hint(h) => h,
            other => panic!("expected a hint, got {other:?}"),
        };
        assert_eq!(hint.technique, Technique::CandidateDeficit);
        assert_eq!(hint.deductions.len(), 1);
        assert_eq!(hint.deductions[0].cell, 9);
        assert_eq!(hint.deductions[0].kind, DeductionKind::ForceStar);
        // The forced cell is clear of the placed star
        let mut probe = b.clone();
        solver.apply_hint(&mut probe, &hint).unwrap();
        assert!(probe.check_violation().is_none());
    }

    #[test]
    fn test_hint_is_deterministic() {
        let b = board("1 1 2 2\n1 2 2 2\n3 3 4 4\n3 4 4 4", 1);
        let solver = Solver::new();
        let options = SolveOptions::default();
        let first = solver.find_next_hint(&b, &options, &CancelToken::new());
        let second = solver.find_next_hint(&b, &options, &CancelToken::new());
        match (first, second) {
            (HintOutcome::Hint(a), HintOutcome::Hint(b)) => {
                assert_eq!(a.technique, b.technique);
                assert_eq!(a.deductions, b.deductions);
            }
            (a, b) => panic!("expected two hints, got {a:?} / {b:?}"),
        }
    }

    #[test]
    fn test_apply_hint_dedup_is_noop() {
        let mut b = board("1 1\n2 2", 1);
        let solver = Solver::new();
        let hint = Hint {
            technique: Technique::TwoByTwo,
            deductions: vec![CellDeduction::empty(1)],
            involved_cells: vec![1],
            explanation: String::new(),
            steps: Vec::new(),
        };
        solver.apply_hint(&mut b, &hint).unwrap();
        let fingerprint = b.fingerprint();
        // Applying the same hint again changes nothing
        solver.apply_hint(&mut b, &hint).unwrap();
        assert_eq!(b.fingerprint(), fingerprint);
    }

    #[test]
    fn test_auto_solve_puzzle_one() {
        // The 4x4 fixture with a unique solution at (0,1),(1,3),(2,0),(3,2).
        let mut b = board("1 1 2 2\n1 2 2 2\n3 3 4 4\n3 4 4 4", 1);
        let solver = Solver::new();
        let outcome = solver.auto_solve(&mut b, &SolveOptions::default(), &CancelToken::new());
        assert_eq!(outcome, SolveOutcome::Solved);
        assert!(b.is_complete());
        for cell in [1, 7, 8, 14] {
            assert_eq!(b.cell(cell), CellState::Star, "cell {cell}");
        }
    }

    #[test]
    fn test_auto_solve_respects_cancellation() {
        let mut b = board("1 1 2 2\n1 2 2 2\n3 3 4 4\n3 4 4 4", 1);
        let solver = Solver::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = solver.auto_solve(&mut b, &SolveOptions::default(), &cancel);
        assert_eq!(outcome, SolveOutcome::Cancelled);
        // State untouched
        assert!(b.cells().iter().all(|&c| c == CellState::Unknown));
    }

    #[test]
    fn test_priority_monotonicity() {
        // Both two-by-two and five-crosses apply here; the dispatcher must
        // prefer the lower-priority-number technique (two-by-two).
        let mut b = board("1 1 1 1\n1 1 1 1\n2 2 2 2\n2 2 2 2", 1);
        b.apply(CellDeduction::star(5)).unwrap();
        let solver = Solver::new();
        let hint = match solver.find_next_hint(&b, &SolveOptions::default(), &CancelToken::new())
        {
            HintOutcome::Hint(h) => h,
            other => panic!("expected hint, got {other:?}"),
        };
        assert_eq!(hint.technique, Technique::TwoByTwo);
    }

    /// Hints must stay sound across a whole solve: every applied deduction
    /// keeps the board violation-free.
    #[test]
    fn test_hint_soundness_through_solve() {
        let mut b = board("1 1 2 2\n1 2 2 2\n3 3 4 4\n3 4 4 4", 1);
        let solver = Solver::new();
        let options = SolveOptions::default();
        let cancel = CancelToken::new();
        let mut steps = 0;
        while steps < 100 {
            if b.is_complete() {
                break;
            }
            let hint = match solver.find_next_hint(&b, &options, &cancel) {
                HintOutcome::Hint(h) => h,
                HintOutcome::NoHint => break,
                HintOutcome::Cancelled => unreachable!(),
            };
            solver.apply_hint(&mut b, &hint).unwrap();
            assert!(
                b.check_violation().is_none(),
                "unsound hint from {} at step {steps}",
                hint.technique
            );
            steps += 1;
        }
        assert!(b.is_complete(), "solver stalled after {steps} steps");
    }
}
