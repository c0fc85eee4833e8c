//! Canonical pattern matching under the symmetry group.
//!
//! A canonical pattern maps onto the board through a D4 transform plus a
//! translation. The translation is derived from anchor pairings: the first
//! canonical star is pinned to each placed star in turn. A mapping is valid
//! when every transformed star lands on a placed star inside the board.

use crate::board::{BoardState, CellState};
use crate::geometry::cell_index;
use crate::validator::PlacementValidator;

use super::loader::{FeatureContext, FeatureEvaluator, LoadedSpec, PairPattern, TripleRule};
use super::symmetry::D4;

/// A concrete placement of a canonical pattern on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMapping {
    pub transform: D4,
    pub offset: (i32, i32),
    pub mapped_stars: Vec<(usize, usize)>,
}

/// Forced cells produced by matching one spec against the board.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub forced_empty: Vec<usize>,
    pub forced_star: Vec<usize>,
    /// Fingerprints of the patterns that fired, for the explanation.
    pub fired: Vec<String>,
}

/// Match every pattern and rule of a spec against the placed stars.
pub fn match_spec(
    board: &BoardState,
    spec: &LoadedSpec,
    stars: &[(usize, usize)],
    evaluator: &dyn FeatureEvaluator,
) -> MatchOutcome {
    let n = board.size();
    let mut out = MatchOutcome::default();

    for pattern in &spec.pair_patterns {
        for mapping in pair_mappings(pattern, stars, n) {
            let mut fired = false;
            for &cell in &project(&pattern.forced_empty, &mapping, n) {
                if board.cell(cell) == CellState::Unknown && !out.forced_empty.contains(&cell) {
                    out.forced_empty.push(cell);
                    fired = true;
                }
            }
            for &cell in &project(&pattern.forced_star, &mapping, n) {
                if board.cell(cell) == CellState::Unknown && !out.forced_star.contains(&cell) {
                    out.forced_star.push(cell);
                    fired = true;
                }
            }
            if fired {
                out.fired.push(pattern.fingerprint.clone());
            }
        }
    }

    for rule in &spec.triple_rules {
        for (mapping, candidate) in triple_mappings(rule, stars, n) {
            let cell = cell_index(candidate.0, candidate.1, n);
            if board.cell(cell) != CellState::Unknown {
                continue;
            }
            if !rule.constraint_features.is_empty() {
                let ctx = FeatureContext {
                    board,
                    candidate,
                    mapped_stars: &mapping.mapped_stars,
                };
                if !rule
                    .constraint_features
                    .iter()
                    .all(|f| evaluator.evaluate(f, &ctx))
                {
                    continue;
                }
            }
            if !out.forced_empty.contains(&cell) {
                out.forced_empty.push(cell);
                out.fired.push(rule.fingerprint.clone());
            }
        }
    }

    // Forced stars must stay mutually compatible and legal on the board.
    filter_forced_stars(board, &mut out.forced_star);
    out
}

/// All ways a pair pattern covers the placed stars exactly.
pub fn pair_mappings(
    pattern: &PairPattern,
    stars: &[(usize, usize)],
    n: usize,
) -> Vec<PatternMapping> {
    if pattern.initial_stars.len() != stars.len() || stars.is_empty() {
        return Vec::new();
    }
    mappings(&pattern.initial_stars, stars, n, true)
}

/// All ways a triple rule maps onto a subset of the placed stars, with the
/// transformed candidate cell.
pub fn triple_mappings(
    rule: &TripleRule,
    stars: &[(usize, usize)],
    n: usize,
) -> Vec<(PatternMapping, (usize, usize))> {
    if stars.len() < rule.canonical_stars.len() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for mapping in mappings(&rule.canonical_stars, stars, n, false) {
        let (tr, tc) = mapping.transform.apply_rel(rule.candidate);
        let r = tr + mapping.offset.0;
        let c = tc + mapping.offset.1;
        if r < 0 || c < 0 || r as usize >= n || c as usize >= n {
            continue;
        }
        out.push((mapping, (r as usize, c as usize)));
    }
    out
}

/// Core search: transforms × anchor pairings. With `exact`, the mapped set
/// must equal the placed stars; otherwise it must be a subset.
fn mappings(
    canonical: &[(i32, i32)],
    stars: &[(usize, usize)],
    n: usize,
    exact: bool,
) -> Vec<PatternMapping> {
    let mut out: Vec<PatternMapping> = Vec::new();
    for transform in D4::ALL {
        let transformed: Vec<(i32, i32)> =
            canonical.iter().map(|&p| transform.apply_rel(p)).collect();
        for &(ar, ac) in stars {
            let offset = (ar as i32 - transformed[0].0, ac as i32 - transformed[0].1);
            let mut mapped = Vec::with_capacity(transformed.len());
            let mut ok = true;
            for &(tr, tc) in &transformed {
                let r = tr + offset.0;
                let c = tc + offset.1;
                if r < 0 || c < 0 || r as usize >= n || c as usize >= n {
                    ok = false;
                    break;
                }
                let point = (r as usize, c as usize);
                if !stars.contains(&point) {
                    ok = false;
                    break;
                }
                mapped.push(point);
            }
            if !ok {
                continue;
            }
            if exact {
                let mut sorted = mapped.clone();
                sorted.sort_unstable();
                let mut actual = stars.to_vec();
                actual.sort_unstable();
                if sorted != actual {
                    continue;
                }
            }
            let mapping = PatternMapping {
                transform,
                offset,
                mapped_stars: mapped,
            };
            // Different transforms can yield the same star cover; keep one
            // per distinct cover to avoid duplicate deductions.
            if !out.iter().any(|m| same_cover(m, &mapping)) {
                out.push(mapping);
            }
        }
    }
    out
}

fn same_cover(a: &PatternMapping, b: &PatternMapping) -> bool {
    let mut sa = a.mapped_stars.clone();
    let mut sb = b.mapped_stars.clone();
    sa.sort_unstable();
    sb.sort_unstable();
    sa == sb && a.transform == b.transform && a.offset == b.offset
}

fn project(points: &[(i32, i32)], mapping: &PatternMapping, n: usize) -> Vec<usize> {
    let mut out = Vec::new();
    for &p in points {
        let (tr, tc) = mapping.transform.apply_rel(p);
        let r = tr + mapping.offset.0;
        let c = tc + mapping.offset.1;
        if r >= 0 && c >= 0 && (r as usize) < n && (c as usize) < n {
            out.push(cell_index(r as usize, c as usize, n));
        }
    }
    out
}

/// Drop forced stars that are illegal on the board or 8-adjacent to each
/// other; pattern data is advisory, the board constraints are not.
fn filter_forced_stars(board: &BoardState, forced: &mut Vec<usize>) {
    let mut validator = PlacementValidator::new(board);
    let mut kept = Vec::new();
    for &cell in forced.iter() {
        if validator.can_place(cell) {
            validator.place(cell);
            kept.push(cell);
        }
    }
    *forced = kept;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardState;
    use crate::puzzle::parse_puzzle;
    use crate::solver::entangle::loader::{NullFeatureEvaluator, SpecLibrary};

    fn empty_board(n: usize) -> BoardState {
        // One region per row, so star placement never trips region quotas.
        let text = (0..n)
            .map(|row| vec![((row + 1) % 10).to_string(); n].join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        let (def, marks) = parse_puzzle(&text, 2).unwrap();
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

    #[test]
    fn test_triple_rule_fires_at_identity() {
        let mut lib = SpecLibrary::new();
        lib.load("triples", TRIPLE_FILE, &NullFeatureEvaluator)
            .unwrap();
        let mut board = empty_board(10);
        for cell in [0, 3, 30] {
            board
                .apply(crate::board::CellDeduction::star(cell))
                .unwrap();
        }
        let stars: Vec<(usize, usize)> = vec![(0, 0), (0, 3), (3, 0)];
        let out = match_spec(&board, &lib.specs()[0], &stars, &NullFeatureEvaluator);
        assert_eq!(out.forced_empty, vec![33]); // (3,3)
    }

    #[test]
    fn test_triple_rule_fires_under_rotation() {
        // Rotate the configuration 90° clockwise: stars at (0,9),(3,9),(0,6)
        // on a 10x10; the candidate maps to (3,6).
        let mut lib = SpecLibrary::new();
        lib.load("triples", TRIPLE_FILE, &NullFeatureEvaluator)
            .unwrap();
        let mut board = empty_board(10);
        let stars: Vec<(usize, usize)> = vec![(0, 9), (3, 9), (0, 6)];
        for &(r, c) in &stars {
            board
                .apply(crate::board::CellDeduction::star(r * 10 + c))
                .unwrap();
        }
        let out = match_spec(&board, &lib.specs()[0], &stars, &NullFeatureEvaluator);
        assert_eq!(out.forced_empty, vec![36]); // (3,6)
    }

    #[test]
    fn test_no_fire_without_match() {
        let mut lib = SpecLibrary::new();
        lib.load("triples", TRIPLE_FILE, &NullFeatureEvaluator)
            .unwrap();
        let mut board = empty_board(10);
        let stars: Vec<(usize, usize)> = vec![(0, 0), (0, 4), (4, 0)];
        for &(r, c) in &stars {
            board
                .apply(crate::board::CellDeduction::star(r * 10 + c))
                .unwrap();
        }
        let out = match_spec(&board, &lib.specs()[0], &stars, &NullFeatureEvaluator);
        assert!(out.forced_empty.is_empty());
    }
}
