//! Intersection squeezes: per-cell row×column counting, direct region-band
//! quotas, and region-pair exclusion over a saturated band.

use crate::board::{CellDeduction, CellState};
use crate::geometry::{cell_pos, enumerate_bands, BandAxis};

use super::explain::{Deduction, Finding, Step};
use super::fabric::{BoardFabric, Unit};
use super::quota::quota_in_band;
use super::types::Technique;
use super::Ctx;

/// D1 — Row/Column Squeeze: per-cell counting. A cell that can no longer
/// hold a star is crossed out; a cell whose removal would starve its row or
/// column is starred.
pub fn find_row_column_squeeze(ctx: &Ctx) -> Option<Finding> {
    let n = ctx.fab.n;
    for cell in 0..n * n {
        if ctx.board.cell(cell) != CellState::Unknown {
            continue;
        }
        let (row, col) = cell_pos(cell, n);
        if !ctx.fab.eligible[cell] {
            // Adjacent star or a spent quota: the cell can never be a star.
            return Some(Finding {
                technique: Technique::RowColumnSqueeze,
                deductions: vec![Deduction::Cell(CellDeduction::empty(cell))],
                involved_cells: vec![cell],
                steps: vec![Step::ApplyPigeonhole {
                    note: "no star can be placed here any more".into(),
                }],
            });
        }
        for unit in [Unit::Row(row), Unit::Col(col)] {
            let remaining = ctx.fab.remaining(ctx.board, unit);
            let cands = ctx.fab.candidates(unit);
            if remaining > 0 && cands.len() - 1 < remaining {
                return Some(Finding {
                    technique: Technique::RowColumnSqueeze,
                    deductions: vec![Deduction::Cell(CellDeduction::star(cell))],
                    involved_cells: cands.to_vec(),
                    steps: vec![
                        Step::CountStarsInBand {
                            band: BoardFabric::line_band(unit).expect("line unit"),
                            stars_needed: remaining,
                        },
                        Step::ApplyPigeonhole {
                            note: "without this cell the line cannot fit its stars".into(),
                        },
                    ],
                });
            }
        }
    }
    None
}

/// D2 — Region-Band Intersection: a region whose band quota matches its
/// eligible cells in the band stars all of them.
pub fn find_region_band_intersection(ctx: &Ctx) -> Option<Finding> {
    let n = ctx.fab.n;
    for axis in [BandAxis::Rows, BandAxis::Cols] {
        for band in enumerate_bands(axis, n) {
            for &region in ctx.board.definition().regions() {
                let cands = ctx.fab.region_candidates_in_band(region, &band);
                if cands.is_empty() {
                    continue;
                }
                let q = quota_in_band(ctx.board, ctx.fab, ctx.caches, ctx.options, region, &band, 0);
                if !q.known {
                    continue;
                }
                let current = ctx.fab.region_stars_in_band(ctx.board, region, &band);
                let needed = q.min.saturating_sub(current);
                if needed == 0 || needed != cands.len() || super::pairwise_adjacent(&cands, n) {
                    continue;
                }
                return Some(Finding {
                    technique: Technique::RegionBandIntersection,
                    deductions: cands
                        .iter()
                        .map(|&c| Deduction::Cell(CellDeduction::star(c)))
                        .collect(),
                    involved_cells: cands.clone(),
                    steps: vec![
                        Step::FixRegionBandQuota {
                            region,
                            band,
                            quota: q.min,
                        },
                        Step::ApplyPigeonhole {
                            note: "the quota leaves no slack among the eligible cells".into(),
                        },
                    ],
                });
            }
        }
    }
    None
}

/// F1 — Region-Pair Exclusion: a region that must absorb a band's whole
/// remainder shuts every other region out of the band.
pub fn find_region_pair_exclusion(ctx: &Ctx) -> Option<Finding> {
    let n = ctx.fab.n;
    for axis in [BandAxis::Rows, BandAxis::Cols] {
        for band in enumerate_bands(axis, n) {
            let band_remaining = ctx.fab.band_remaining(&band);
            if band_remaining == 0 {
                continue;
            }
            for &saturating in ctx.board.definition().regions() {
                let q = quota_in_band(
                    ctx.board,
                    ctx.fab,
                    ctx.caches,
                    ctx.options,
                    saturating,
                    &band,
                    0,
                );
                let current = ctx
                    .fab
                    .region_stars_in_band(ctx.board, saturating, &band);
                if q.min.saturating_sub(current) != band_remaining {
                    continue;
                }
                for &other in ctx.board.definition().regions() {
                    if other == saturating {
                        continue;
                    }
                    let victims = ctx.fab.region_candidates_in_band(other, &band);
                    if victims.is_empty() {
                        continue;
                    }
                    return Some(Finding {
                        technique: Technique::RegionPairExclusion,
                        deductions: victims
                            .iter()
                            .map(|&c| Deduction::Cell(CellDeduction::empty(c)))
                            .collect(),
                        involved_cells: victims.clone(),
                        steps: vec![
                            Step::CountStarsInBand {
                                band,
                                stars_needed: band_remaining,
                            },
                            Step::FixRegionBandQuota {
                                region: saturating,
                                band,
                                quota: q.min,
                            },
                            Step::EliminateOtherRegionCells {
                                region: other,
                                cells: victims,
                            },
                        ],
                    });
                }
            }
        }
    }
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
    fn test_squeeze_crosses_blocked_cell() {
        // The star at (0,0) leaves (1,1) unplaceable but still Unknown.
        let b = board("1s 1 2\n1 1 2\n3 3 3", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_row_column_squeeze(&ctx).unwrap();
        let ded = f.cell_deductions();
        assert_eq!(ded[0].kind, DeductionKind::ForceEmpty);
        // First blocked Unknown in row-major order is (0,1)
        assert_eq!(ded[0].cell, 1);
    }

    #[test]
    fn test_squeeze_stars_last_line_cell() {
        // Row 0: two crosses leave one eligible cell.
        let b = board("1x 1x 2\n3 3 3\n3 3 3", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_row_column_squeeze(&ctx).unwrap();
        let ded = f.cell_deductions();
        assert_eq!(ded[0].cell, 2);
        assert_eq!(ded[0].kind, DeductionKind::ForceStar);
    }

    #[test]
    fn test_region_band_intersection() {
        // Region 1 spans rows 0..1 but the star at (2,1) confines its
        // candidates to row 0; its quota there is 1 and one cell remains.
        let b = board("1 1 2\n1 1 2\n3 3s 3", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_region_band_intersection(&ctx).unwrap();
        let ded = f.cell_deductions();
        assert!(ded.iter().all(|d| d.kind == DeductionKind::ForceStar));
        assert_eq!(ded[0].cell, 0);
    }

    #[test]
    fn test_region_pair_exclusion() {
        // Region 2 is confined to column 3 (its quota there is its whole
        // remaining star) and column 3 needs exactly one star: region 3's
        // column-3 candidates are crossed out.
        let b = board("1 1 1 2\n1 1 1 2\n3 3 3 3\n3 3 3 3", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_region_pair_exclusion(&ctx).unwrap();
        let cells: Vec<usize> = f.cell_deductions().iter().map(|d| d.cell).collect();
        assert_eq!(cells, vec![11, 15]);
    }
}
