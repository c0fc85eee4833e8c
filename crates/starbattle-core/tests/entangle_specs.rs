//! Entanglement engine end to end: spec loading, matching under symmetry,
//! and the symmetry-closure law.

use starbattle_core::{
    parse_puzzle, BoardState, CancelToken, CellDeduction, DeductionKind, FeatureContext,
    FeatureEvaluator, HintOutcome, SolveOptions, Solver, Technique, TechniqueSet, D4,
};

/// 10x10 grid, one region per row.
fn rows_as_regions() -> String {
    (0..10)
        .map(|row| vec![((row + 1) % 10).to_string(); 10].join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

fn empty_board() -> BoardState {
    let (def, marks) = parse_puzzle(&rows_as_regions(), 2).unwrap();
    BoardState::new(def, marks).unwrap()
}

const TRIPLE_FILE: &str = r#"{
    "board_size": 10,
    "initial_stars": 3,
    "unconstrained_rules": [
        {
            "canonical_stars": [[0,0],[0,3],[3,0]],
            "canonical_candidate": [3,3],
            "constraint_features": [],
            "forced": true,
            "occurrences": 12
        }
    ],
    "constrained_rules": []
}"#;

fn entangle_only() -> SolveOptions {
    SolveOptions {
        techniques: TechniqueSet::only(&[Technique::Entanglement]),
        ..SolveOptions::default()
    }
}

#[test]
fn scenario_five_triple_rule_forces_empty() {
    let mut solver = Solver::new();
    assert!(solver.load_spec("triples-10", TRIPLE_FILE).unwrap());

    let mut board = empty_board();
    for cell in [0, 3, 30] {
        board.apply(CellDeduction::star(cell)).unwrap();
    }
    let hint = match solver.find_next_hint(&board, &entangle_only(), &CancelToken::new()) {
        HintOutcome::Hint(h) => h,
        other => panic!("expected hint, got {other:?}"),
    };
    assert_eq!(hint.technique, Technique::Entanglement);
    assert_eq!(hint.deductions.len(), 1);
    assert_eq!(hint.deductions[0].cell, 33); // (3,3)
    assert_eq!(hint.deductions[0].kind, DeductionKind::ForceEmpty);
}

#[test]
fn scenario_five_symmetry_closure() {
    // Rotate the whole state 90°: the same rule fires on the rotated board
    // and targets the rotated candidate.
    let mut solver = Solver::new();
    solver.load_spec("triples-10", TRIPLE_FILE).unwrap();

    let mut board = empty_board();
    for &(r, c) in &[(0usize, 0usize), (0, 3), (3, 0)] {
        let (rr, rc) = D4::Rot90.apply((r, c), 10);
        board.apply(CellDeduction::star(rr * 10 + rc)).unwrap();
    }
    let hint = match solver.find_next_hint(&board, &entangle_only(), &CancelToken::new()) {
        HintOutcome::Hint(h) => h,
        other => panic!("expected hint, got {other:?}"),
    };
    let (er, ec) = D4::Rot90.apply((3, 3), 10);
    assert_eq!(hint.deductions[0].cell, er * 10 + ec);
}

#[test]
fn no_fire_stays_closed_under_symmetry() {
    // A configuration that does not match must not match any rotation of
    // itself either.
    let mut solver = Solver::new();
    solver.load_spec("triples-10", TRIPLE_FILE).unwrap();

    for transform in D4::ALL {
        let mut board = empty_board();
        for &(r, c) in &[(0usize, 0usize), (0, 4), (4, 0)] {
            let (tr, tc) = transform.apply((r, c), 10);
            board.apply(CellDeduction::star(tr * 10 + tc)).unwrap();
        }
        match solver.find_next_hint(&board, &entangle_only(), &CancelToken::new()) {
            HintOutcome::NoHint => {}
            other => panic!("{transform:?}: expected NoHint, got {other:?}"),
        }
    }
}

#[test]
fn pair_pattern_forces_cells() {
    let pair_file = r#"{
        "board_size": 10,
        "stars_per_row": 2,
        "stars_per_column": 2,
        "initial_star_count": 2,
        "total_solutions": 50,
        "patterns": [
            {
                "initial_stars": [[0,0],[0,3]],
                "compatible_solutions": 3,
                "forced_empty": [[1,1],[1,2]]
            }
        ]
    }"#;
    let mut solver = Solver::new();
    solver.load_spec("pairs-10", pair_file).unwrap();

    let mut board = empty_board();
    board.apply(CellDeduction::star(0)).unwrap();
    board.apply(CellDeduction::star(3)).unwrap();

    let hint = match solver.find_next_hint(&board, &entangle_only(), &CancelToken::new()) {
        HintOutcome::Hint(h) => h,
        other => panic!("expected hint, got {other:?}"),
    };
    let mut cells: Vec<usize> = hint.deductions.iter().map(|d| d.cell).collect();
    cells.sort_unstable();
    assert_eq!(cells, vec![11, 12]); // (1,1),(1,2)
    assert!(hint
        .deductions
        .iter()
        .all(|d| d.kind == DeductionKind::ForceEmpty));
}

/// A host evaluator supporting a single feature that requires the candidate
/// to sit on the main diagonal.
struct DiagonalFeature;

impl FeatureEvaluator for DiagonalFeature {
    fn supports(&self, name: &str) -> bool {
        name == "on-diagonal"
    }

    fn evaluate(&self, name: &str, ctx: &FeatureContext) -> bool {
        name == "on-diagonal" && ctx.candidate.0 == ctx.candidate.1
    }
}

#[test]
fn constrained_rule_consults_feature_evaluator() {
    let file = r#"{
        "board_size": 10,
        "initial_stars": 3,
        "unconstrained_rules": [],
        "constrained_rules": [
            {
                "canonical_stars": [[0,0],[0,3],[3,0]],
                "canonical_forced_empty": [3,3],
                "constraint_features": ["on-diagonal"],
                "forced": true,
                "occurrences": 2
            }
        ]
    }"#;
    let mut library = starbattle_core::SpecLibrary::new();
    library.load("con-10", file, &DiagonalFeature).unwrap();
    let solver = Solver::with_specs(library, Box::new(DiagonalFeature));

    // Identity placement: candidate (3,3) is on the diagonal, rule fires.
    let mut board = empty_board();
    for cell in [0, 3, 30] {
        board.apply(CellDeduction::star(cell)).unwrap();
    }
    let hint = match solver.find_next_hint(&board, &entangle_only(), &CancelToken::new()) {
        HintOutcome::Hint(h) => h,
        other => panic!("expected hint, got {other:?}"),
    };
    assert_eq!(hint.deductions[0].cell, 33);

    // Translated placement: candidate (4,6) is off the diagonal, rule must
    // not fire there.
    let mut board = empty_board();
    for cell in [13, 16, 43] {
        board.apply(CellDeduction::star(cell)).unwrap();
    }
    match solver.find_next_hint(&board, &entangle_only(), &CancelToken::new()) {
        HintOutcome::NoHint => {}
        other => panic!("expected NoHint, got {other:?}"),
    }
}
