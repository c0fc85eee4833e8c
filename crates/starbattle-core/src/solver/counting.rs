//! Candidate counting: groups whose eligible cells exactly fill their
//! remaining quota.

use crate::board::CellDeduction;
use crate::geometry::adjacent8;

use super::explain::{Deduction, Finding, Step};
use super::fabric::{BoardFabric, Unit};
use super::types::Technique;
use super::Ctx;

/// Candidate Deficit: a group with `q - s` remaining stars and exactly
/// `q - s` eligible cells forces all of them to Star.
pub fn find_candidate_deficit(ctx: &Ctx) -> Option<Finding> {
    for unit in ctx.fab.all_units(ctx.board) {
        let remaining = ctx.fab.remaining(ctx.board, unit);
        if remaining == 0 {
            continue;
        }
        let cands = ctx.fab.candidates(unit);
        if cands.len() != remaining {
            continue;
        }
        // All of them must be stars; mutually adjacent forced stars would
        // mean the board is already contradictory, so leave that to the
        // violation check instead of emitting an unsound application.
        if pairwise_adjacent(cands, ctx.fab.n) {
            log::warn!("candidate deficit found adjacent forced stars; skipping");
            continue;
        }
        let steps = match unit {
            Unit::Region(region) => vec![
                Step::CountRemainingStars {
                    remaining_stars: remaining,
                    target_region: region,
                },
                Step::ApplyPigeonhole {
                    note: "only just enough eligible cells remain".into(),
                },
            ],
            _ => vec![
                Step::CountStarsInBand {
                    band: BoardFabric::line_band(unit).expect("line unit"),
                    stars_needed: remaining,
                },
                Step::ApplyPigeonhole {
                    note: "only just enough eligible cells remain".into(),
                },
            ],
        };
        return Some(Finding {
            technique: Technique::CandidateDeficit,
            deductions: cands
                .iter()
                .map(|&c| Deduction::Cell(CellDeduction::star(c)))
                .collect(),
            involved_cells: cands.to_vec(),
            steps,
        });
    }
    None
}

fn pairwise_adjacent(cells: &[usize], n: usize) -> bool {
    for (i, &a) in cells.iter().enumerate() {
        for &b in &cells[i + 1..] {
            if adjacent8(a, b, n) {
                return true;
            }
        }
    }
    false
}

/// Partitioned Candidates: the partition-decomposition variant of candidate
/// counting. The partition search itself is deliberately not implemented;
/// the technique id is reserved and this finder never produces applications.
pub fn find_partitioned_candidates(_ctx: &Ctx) -> Option<Finding> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardState, DeductionKind};
    use crate::puzzle::parse_puzzle;
    use crate::solver::test_ctx;

    fn board(text: &str, k: usize) -> BoardState {
        let (def, marks) = parse_puzzle(text, k).unwrap();
        BoardState::new(def, marks).unwrap()
    }

    #[test]
    fn test_deficit_forces_last_cell() {
        // Row 0 has its single eligible cell at (0,2)
        let b = board("1x 1x 2\n3 3 3\n3 3 3", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_candidate_deficit(&ctx).unwrap();
        let ded = f.cell_deductions();
        assert_eq!(ded.len(), 1);
        assert_eq!(ded[0].cell, 2);
        assert_eq!(ded[0].kind, DeductionKind::ForceStar);
    }

    #[test]
    fn test_no_application_when_quota_met() {
        let b = board("1s 1 2\n1 1 2\n3 3 3", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        // Row 0 has zero remaining quota: E1 must not fire on it. It may
        // still fire elsewhere, but never with a satisfied unit's cells.
        if let Some(f) = find_candidate_deficit(&ctx) {
            assert!(f.cell_deductions().iter().all(|d| d.cell > 2));
        }
    }

    #[test]
    fn test_partitioned_candidates_is_reserved() {
        let b = board("1 1\n2 2", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        assert!(find_partitioned_candidates(&ctx).is_none());
    }
}
