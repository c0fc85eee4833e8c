//! 2×2 cage reasoning.
//!
//! When a band's remaining stars can be caged into that many disjoint 2×2
//! blocks covering every candidate, each block holds exactly one star. The
//! cage picture then plays against region quotas and against individual
//! groups intersecting a block.

use crate::board::{CellDeduction, CellState};
use crate::geometry::{enumerate_bands, Band, BandAxis, Block};

use super::explain::{Deduction, Finding, Step};
use super::fabric::Unit;
use super::quota::quota_in_band;
use super::types::Technique;
use super::Ctx;

/// A band caged into disjoint one-star blocks.
pub(crate) struct BandCage {
    pub band: Band,
    /// Disjoint blocks covering every candidate in the band, one star each.
    pub blocks: Vec<Block>,
}

/// Search one band for an exact cage: `band_remaining` disjoint starless
/// blocks fully inside the band that cover all its candidates.
pub(crate) fn band_cage(ctx: &Ctx, band: &Band) -> Option<BandCage> {
    let n = ctx.fab.n;
    let needed = ctx.fab.band_remaining(band);
    if needed == 0 {
        return None;
    }
    let cands: Vec<usize> = band
        .cells(n)
        .into_iter()
        .filter(|&c| ctx.fab.eligible[c])
        .collect();
    if cands.is_empty() {
        return None;
    }
    let pool: Vec<Block> = ctx
        .board
        .blocks()
        .iter()
        .filter(|b| {
            b.inside_band(band, n)
                && b.cells.iter().all(|&c| ctx.board.cell(c) != CellState::Star)
                && b.cells.iter().any(|&c| ctx.fab.eligible[c])
        })
        .copied()
        .collect();
    let mut chosen = Vec::new();
    let mut nodes = 0;
    if cover(&cands, &pool, needed, &mut chosen, &mut nodes) && chosen.len() == needed {
        Some(BandCage {
            band: *band,
            blocks: chosen,
        })
    } else {
        None
    }
}

/// Backtracking ceiling for the cover search. Running dry here just means
/// no cage is reported for the band.
const COVER_NODE_BUDGET: usize = 10_000;

/// Exact-cover search: pick disjoint blocks until every candidate is
/// covered, never using more than `limit` blocks.
fn cover(
    cands: &[usize],
    pool: &[Block],
    limit: usize,
    chosen: &mut Vec<Block>,
    nodes: &mut usize,
) -> bool {
    *nodes += 1;
    if *nodes > COVER_NODE_BUDGET {
        return false;
    }
    let uncovered = cands
        .iter()
        .find(|&&c| !chosen.iter().any(|b| b.cells.contains(&c)));
    let Some(&target) = uncovered else {
        return true;
    };
    if chosen.len() == limit {
        return false;
    }
    for block in pool {
        if !block.cells.contains(&target) {
            continue;
        }
        if chosen.iter().any(|b| b.overlaps(block)) {
            continue;
        }
        chosen.push(*block);
        if cover(cands, pool, limit, chosen, nodes) {
            return true;
        }
        chosen.pop();
    }
    false
}

/// C1 — Band Cages: meta finding only. The cage picture constrains each
/// block to exactly one star; it informs the cages-vs-quota schema but
/// fixes no single cell.
pub fn find_band_cages(ctx: &Ctx) -> Option<Finding> {
    for axis in [BandAxis::Rows, BandAxis::Cols] {
        for band in enumerate_bands(axis, ctx.fab.n) {
            let Some(cage) = band_cage(ctx, &band) else {
                continue;
            };
            let block_ids: Vec<usize> = cage.blocks.iter().map(|b| b.id).collect();
            return Some(Finding {
                technique: Technique::BandCages,
                deductions: cage
                    .blocks
                    .iter()
                    .map(|b| Deduction::ExclusiveSet {
                        cells: b.cells.to_vec(),
                        stars_required: 1,
                    })
                    .collect(),
                involved_cells: cage.blocks.iter().flat_map(|b| b.cells).collect(),
                steps: vec![
                    Step::CountStarsInBand {
                        band,
                        stars_needed: ctx.fab.band_remaining(&band),
                    },
                    Step::IdentifyCandidateBlocks {
                        block_count: block_ids.len(),
                        blocks: block_ids,
                    },
                    Step::ApplyPigeonhole {
                        note: "each block must hold exactly one of the remaining stars".into(),
                    },
                ],
            });
        }
    }
    None
}

/// C2 — Cages vs Region Quota: with a band caged, a region whose exact band
/// quota is met by the blocks lying fully inside it cannot star any other
/// cell in the band.
pub fn find_cages_vs_region_quota(ctx: &Ctx) -> Option<Finding> {
    let n = ctx.fab.n;
    for axis in [BandAxis::Rows, BandAxis::Cols] {
        for band in enumerate_bands(axis, n) {
            let Some(cage) = band_cage(ctx, &band) else {
                continue;
            };
            for &region in ctx.board.definition().regions() {
                let q = quota_in_band(ctx.board, ctx.fab, ctx.caches, ctx.options, region, &band, 0);
                if !q.is_exact() {
                    continue;
                }
                let current = ctx.fab.region_stars_in_band(ctx.board, region, &band);
                let Some(additional) = q.min.checked_sub(current) else {
                    continue;
                };
                if additional == 0 {
                    continue;
                }
                let own: Vec<&Block> = cage
                    .blocks
                    .iter()
                    .filter(|b| {
                        b.cells
                            .iter()
                            .all(|&c| ctx.board.definition().region_of(c) == region)
                    })
                    .collect();
                if own.len() != additional {
                    continue;
                }
                let victims: Vec<usize> = ctx
                    .fab
                    .region_candidates_in_band(region, &band)
                    .into_iter()
                    .filter(|&c| !own.iter().any(|b| b.cells.contains(&c)))
                    .collect();
                if victims.is_empty() {
                    continue;
                }
                let own_ids: Vec<usize> = own.iter().map(|b| b.id).collect();
                return Some(Finding {
                    technique: Technique::CagesVsRegionQuota,
                    deductions: victims
                        .iter()
                        .map(|&c| Deduction::Cell(CellDeduction::empty(c)))
                        .collect(),
                    involved_cells: victims.clone(),
                    steps: vec![
                        Step::FixRegionBandQuota {
                            region,
                            band,
                            quota: q.min,
                        },
                        Step::IdentifyCandidateBlocks {
                            block_count: own_ids.len(),
                            blocks: own_ids.clone(),
                        },
                        Step::AssignCageStars {
                            region,
                            blocks: own_ids,
                        },
                        Step::EliminateOtherRegionCells {
                            region,
                            cells: victims,
                        },
                    ],
                });
            }
        }
    }
    None
}

/// C3 — Region Cages: a region with q remaining stars whose candidates fit
/// into q disjoint in-region blocks pins one star to each (meta finding).
pub fn find_region_cages(ctx: &Ctx) -> Option<Finding> {
    for &region in ctx.board.definition().regions() {
        let remaining = ctx.fab.remaining(ctx.board, Unit::Region(region));
        if remaining == 0 {
            continue;
        }
        let cands = ctx.fab.candidates(Unit::Region(region));
        if cands.is_empty() {
            continue;
        }
        let pool: Vec<Block> = ctx
            .board
            .blocks()
            .iter()
            .filter(|b| {
                b.cells
                    .iter()
                    .all(|&c| ctx.board.definition().region_of(c) == region)
                    && b.cells.iter().all(|&c| ctx.board.cell(c) != CellState::Star)
                    && b.cells.iter().any(|&c| ctx.fab.eligible[c])
            })
            .copied()
            .collect();
        let mut chosen = Vec::new();
        let mut nodes = 0;
        if !cover(cands, &pool, remaining, &mut chosen, &mut nodes) || chosen.len() != remaining {
            continue;
        }
        let block_ids: Vec<usize> = chosen.iter().map(|b| b.id).collect();
        return Some(Finding {
            technique: Technique::RegionCages,
            deductions: chosen
                .iter()
                .map(|b| Deduction::ExclusiveSet {
                    cells: b.cells.to_vec(),
                    stars_required: 1,
                })
                .collect(),
            involved_cells: chosen.iter().flat_map(|b| b.cells).collect(),
            steps: vec![
                Step::CountRemainingStars {
                    remaining_stars: remaining,
                    target_region: region,
                },
                Step::IdentifyCandidateBlocks {
                    block_count: block_ids.len(),
                    blocks: block_ids.clone(),
                },
                Step::AssignCageStars {
                    region,
                    blocks: block_ids,
                },
            ],
        });
    }
    None
}

/// C4 — Cage Exclusion: a group forced to place stars inside a block with a
/// single candidate there gets a star; a group with no quota left crosses
/// out its block cells.
pub fn find_cage_exclusion(ctx: &Ctx) -> Option<Finding> {
    for block in ctx.board.blocks() {
        for unit in ctx.fab.all_units(ctx.board) {
            let cells = unit_cells(ctx, unit);
            let in_block: Vec<usize> = block
                .cells
                .iter()
                .filter(|&&c| cells.contains(&c))
                .copied()
                .collect();
            if in_block.is_empty() {
                continue;
            }
            let remaining = ctx.fab.remaining(ctx.board, unit);
            if remaining == 0 {
                let unknowns: Vec<usize> = in_block
                    .iter()
                    .filter(|&&c| ctx.board.cell(c) == CellState::Unknown)
                    .copied()
                    .collect();
                if unknowns.is_empty() {
                    continue;
                }
                return Some(cage_exclusion_finding(block, unknowns, false));
            }
            let cands = ctx.fab.candidates(unit);
            let cands_in_block: Vec<usize> = cands
                .iter()
                .filter(|&&c| in_block.contains(&c))
                .copied()
                .collect();
            let outside = cands.len() - cands_in_block.len();
            let must_in_block = remaining.saturating_sub(outside);
            if must_in_block >= 1 && cands_in_block.len() == 1 {
                return Some(cage_exclusion_finding(block, cands_in_block, true));
            }
        }
    }
    None
}

fn cage_exclusion_finding(block: &Block, cells: Vec<usize>, star: bool) -> Finding {
    let make = if star {
        CellDeduction::star
    } else {
        CellDeduction::empty
    };
    let note = if star {
        "the group must star this block and only one spot remains"
    } else {
        "the group has no star left to spend in this block"
    };
    Finding {
        technique: Technique::CageExclusion,
        deductions: cells.iter().map(|&c| Deduction::Cell(make(c))).collect(),
        involved_cells: block.cells.to_vec(),
        steps: vec![
            Step::IdentifyCandidateBlocks {
                blocks: vec![block.id],
                block_count: 1,
            },
            Step::ApplyPigeonhole { note: note.into() },
        ],
    }
}

fn unit_cells(ctx: &Ctx, unit: Unit) -> Vec<usize> {
    match unit {
        Unit::Row(r) => ctx.board.row_cells(r),
        Unit::Col(c) => ctx.board.col_cells(c),
        Unit::Region(r) => ctx.board.region_cells(r),
    }
}
