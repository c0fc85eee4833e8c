//! Band vs region budget reasoning.
//!
//! A band holds exactly `len * k` stars in any completion. Regions fully
//! inside contribute their whole requirement; partial regions contribute a
//! bounded share pinned down by the quota helper. Whatever is left over
//! squeezes the target region's candidates in the band, in both directions.
//!
//! The exclusive-area framings re-derive the same squeezes from a covering
//! premise (a few regions confined to the band, or a region confined to a
//! few lines) and carry the more emphatic explanation.

use crate::board::CellDeduction;
use crate::geometry::{adjacent8, cell_pos, enumerate_bands, Band, BandAxis};
use crate::puzzle::RegionId;

use super::explain::{Deduction, Finding, Step};
use super::fabric::Unit;
use super::quota::quota_in_band;
use super::types::Technique;
use super::Ctx;

/// Regions an exclusive-area premise may cover before the schema bails.
const EXCLUSIVE_COVER_CAP: usize = 4;

// ==================== A1 / A2: band budget squeeze ====================

pub fn find_row_band_budget(ctx: &Ctx) -> Option<Finding> {
    find_band_budget(ctx, BandAxis::Rows, Technique::RowBandBudget)
}

pub fn find_column_band_budget(ctx: &Ctx) -> Option<Finding> {
    find_band_budget(ctx, BandAxis::Cols, Technique::ColumnBandBudget)
}

fn find_band_budget(ctx: &Ctx, axis: BandAxis, technique: Technique) -> Option<Finding> {
    let n = ctx.fab.n;
    for band in enumerate_bands(axis, n) {
        let (full, partial) = ctx.fab.regions_by_band(ctx.board, &band);
        if partial.is_empty() {
            continue;
        }
        let capacity = (band.len() * ctx.fab.k) as isize;
        let full_sum: isize = full
            .iter()
            .map(|_| ctx.board.definition().stars_per_region() as isize)
            .sum();

        // Quota ranges for every partial region; at most one may be unknown.
        let quotas: Vec<(RegionId, super::cache::QuotaRange)> = partial
            .iter()
            .map(|&r| {
                (
                    r,
                    quota_in_band(ctx.board, ctx.fab, ctx.caches, ctx.options, r, &band, 0),
                )
            })
            .collect();
        let unknown_count = quotas.iter().filter(|(_, q)| !q.known).count();
        if unknown_count >= 2 {
            continue;
        }

        for (target, _) in &quotas {
            let target = *target;
            if unknown_count == 1 && quotas.iter().any(|(r, q)| *r == target && q.known) {
                // The one unknown region is the only admissible target.
                continue;
            }
            let mut sum_min = 0isize;
            let mut sum_max = 0isize;
            let mut others = Vec::new();
            for (r, q) in &quotas {
                if *r == target {
                    continue;
                }
                sum_min += q.min as isize;
                sum_max += q.max as isize;
                others.push(*r);
            }
            let upper = capacity - full_sum - sum_min;
            let lower = capacity - full_sum - sum_max;
            let current = ctx.fab.region_stars_in_band(ctx.board, target, &band) as isize;
            let cands = ctx.fab.region_candidates_in_band(target, &band);
            if cands.is_empty() {
                continue;
            }

            if upper <= current {
                return Some(band_budget_finding(
                    ctx, technique, &band, target, &full, &others, 0, &cands, false,
                ));
            }
            if lower - current == cands.len() as isize {
                if pairwise_adjacent(&cands, n) {
                    continue;
                }
                return Some(band_budget_finding(
                    ctx,
                    technique,
                    &band,
                    target,
                    &full,
                    &others,
                    (lower - current) as usize,
                    &cands,
                    true,
                ));
            }
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn band_budget_finding(
    ctx: &Ctx,
    technique: Technique,
    band: &Band,
    target: RegionId,
    full: &[RegionId],
    others: &[RegionId],
    stars_left: usize,
    cands: &[usize],
    force_star: bool,
) -> Finding {
    let mut accounted: Vec<RegionId> = full.to_vec();
    accounted.extend_from_slice(others);
    accounted.sort_unstable();
    let mut steps = vec![
        Step::CountStarsInBand {
            band: *band,
            stars_needed: ctx.fab.band_remaining(band),
        },
        Step::CountRegionQuota {
            regions: accounted,
            total_stars: (band.len() * ctx.fab.k)
                .saturating_sub(stars_left + ctx.fab.region_stars_in_band(ctx.board, target, band)),
        },
        Step::CountRemainingStars {
            remaining_stars: stars_left,
            target_region: target,
        },
    ];
    let deduction = if force_star {
        steps.push(Step::FixRegionBandQuota {
            region: target,
            band: *band,
            quota: stars_left,
        });
        CellDeduction::star
    } else {
        steps.push(Step::EliminateOtherRegionCells {
            region: target,
            cells: cands.to_vec(),
        });
        CellDeduction::empty
    };
    Finding {
        technique,
        deductions: cands.iter().map(|&c| Deduction::Cell(deduction(c))).collect(),
        involved_cells: cands.to_vec(),
        steps,
    }
}

// ==================== A3 / A4: region internal partition ====================

pub fn find_region_row_partition(ctx: &Ctx) -> Option<Finding> {
    find_region_partition(ctx, BandAxis::Rows, Technique::RegionRowPartition)
}

pub fn find_region_column_partition(ctx: &Ctx) -> Option<Finding> {
    find_region_partition(ctx, BandAxis::Cols, Technique::RegionColumnPartition)
}

/// A region's cells split across the maximal contiguous line-runs it
/// occupies. When every other run's quota is exact, the target run's quota
/// is the requirement minus their sum.
fn find_region_partition(ctx: &Ctx, axis: BandAxis, technique: Technique) -> Option<Finding> {
    let n = ctx.fab.n;
    for &region in ctx.board.definition().regions() {
        let runs = region_runs(ctx, region, axis);
        if runs.len() < 2 {
            continue;
        }
        for (ti, target) in runs.iter().enumerate() {
            let mut sum = 0usize;
            let mut exact = true;
            for (oi, other) in runs.iter().enumerate() {
                if oi == ti {
                    continue;
                }
                let q = quota_in_band(ctx.board, ctx.fab, ctx.caches, ctx.options, region, other, 0);
                if !q.is_exact() {
                    exact = false;
                    break;
                }
                sum += q.min;
            }
            if !exact {
                continue;
            }
            let required = ctx.board.definition().stars_per_region();
            let Some(quota) = required.checked_sub(sum) else {
                continue;
            };
            let current = ctx.fab.region_stars_in_band(ctx.board, region, target);
            let cands = ctx.fab.region_candidates_in_band(region, target);
            let needed = quota.saturating_sub(current);
            if needed == 0 || cands.len() != needed || pairwise_adjacent(&cands, n) {
                continue;
            }
            return Some(Finding {
                technique,
                deductions: cands
                    .iter()
                    .map(|&c| Deduction::Cell(CellDeduction::star(c)))
                    .collect(),
                involved_cells: cands.clone(),
                steps: vec![
                    Step::CountRemainingStars {
                        remaining_stars: required
                            .saturating_sub(ctx.fab.region_stars.get(&region).copied().unwrap_or(0)),
                        target_region: region,
                    },
                    Step::FixRegionBandQuota {
                        region,
                        band: *target,
                        quota,
                    },
                    Step::ApplyPigeonhole {
                        note: "the run has exactly as many eligible cells as stars to place".into(),
                    },
                ],
            });
        }
    }
    None
}

/// Maximal contiguous runs of lines occupied by a region, as bands.
fn region_runs(ctx: &Ctx, region: RegionId, axis: BandAxis) -> Vec<Band> {
    let n = ctx.fab.n;
    let mut occupied = vec![false; n];
    for &cell in &ctx.board.region_cells(region) {
        let (row, col) = cell_pos(cell, n);
        let line = match axis {
            BandAxis::Rows => row,
            BandAxis::Cols => col,
        };
        occupied[line] = true;
    }
    let mut runs = Vec::new();
    let mut start = None;
    for line in 0..=n {
        let on = line < n && occupied[line];
        match (start, on) {
            (None, true) => start = Some(line),
            (Some(s), false) => {
                runs.push(Band {
                    axis,
                    start: s,
                    end: line - 1,
                });
                start = None;
            }
            _ => {}
        }
    }
    runs
}

// ==================== B1 / B2: exclusive band framing ====================

pub fn find_exclusive_row_band(ctx: &Ctx) -> Option<Finding> {
    find_exclusive_band(ctx, BandAxis::Rows, Technique::ExclusiveRowBand)
}

pub fn find_exclusive_column_band(ctx: &Ctx) -> Option<Finding> {
    find_exclusive_band(ctx, BandAxis::Cols, Technique::ExclusiveColumnBand)
}

/// Regions whose candidates are confined to the band and whose remaining
/// stars add up to the band's remainder own the band exclusively: every
/// other region's candidate inside the band is crossed out.
fn find_exclusive_band(ctx: &Ctx, axis: BandAxis, technique: Technique) -> Option<Finding> {
    let n = ctx.fab.n;
    for band in enumerate_bands(axis, n) {
        let band_remaining = ctx.fab.band_remaining(&band);
        if band_remaining == 0 {
            continue;
        }
        let mut confined = Vec::new();
        let mut confined_sum = 0usize;
        for &region in ctx.board.definition().regions() {
            let remaining = ctx.fab.remaining(ctx.board, Unit::Region(region));
            if remaining == 0 {
                continue;
            }
            let cands = ctx.fab.candidates(Unit::Region(region));
            if !cands.is_empty() && cands.iter().all(|&c| band.contains(c, n)) {
                confined.push(region);
                confined_sum += remaining;
            }
        }
        if confined.is_empty() || confined.len() > EXCLUSIVE_COVER_CAP {
            continue;
        }
        if confined_sum != band_remaining {
            continue;
        }
        let victims: Vec<usize> = band
            .cells(n)
            .into_iter()
            .filter(|&c| {
                ctx.fab.eligible[c] && !confined.contains(&ctx.board.definition().region_of(c))
            })
            .collect();
        if victims.is_empty() {
            continue;
        }
        return Some(Finding {
            technique,
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
                Step::CountRegionQuota {
                    regions: confined.clone(),
                    total_stars: confined_sum,
                },
                Step::ApplyPigeonhole {
                    note: "those regions claim the band's remaining stars exclusively".into(),
                },
            ],
        });
    }
    None
}

// ==================== B3 / B4: exclusive region framing ====================

pub fn find_exclusive_region_rows(ctx: &Ctx) -> Option<Finding> {
    find_exclusive_region(ctx, BandAxis::Rows, Technique::ExclusiveRegionRows)
}

pub fn find_exclusive_region_cols(ctx: &Ctx) -> Option<Finding> {
    find_exclusive_region(ctx, BandAxis::Cols, Technique::ExclusiveRegionCols)
}

/// Dual framing: a region confined to a few lines that needs every star the
/// lines still take crosses out the lines' other candidates.
fn find_exclusive_region(ctx: &Ctx, axis: BandAxis, technique: Technique) -> Option<Finding> {
    let n = ctx.fab.n;
    for &region in ctx.board.definition().regions() {
        let remaining = ctx.fab.remaining(ctx.board, Unit::Region(region));
        if remaining == 0 {
            continue;
        }
        let cands = ctx.fab.candidates(Unit::Region(region));
        if cands.is_empty() {
            continue;
        }
        let lines: Vec<usize> = {
            let mut ls: Vec<usize> = cands
                .iter()
                .map(|&c| match axis {
                    BandAxis::Rows => c / n,
                    BandAxis::Cols => c % n,
                })
                .collect();
            ls.sort_unstable();
            ls.dedup();
            ls
        };
        if lines.len() > EXCLUSIVE_COVER_CAP {
            continue;
        }
        // The lines must be contiguous to form a band.
        if lines.last().unwrap() - lines[0] + 1 != lines.len() {
            continue;
        }
        let band = Band {
            axis,
            start: lines[0],
            end: *lines.last().unwrap(),
        };
        if ctx.fab.band_remaining(&band) != remaining {
            continue;
        }
        let victims: Vec<usize> = band
            .cells(n)
            .into_iter()
            .filter(|&c| ctx.fab.eligible[c] && ctx.board.definition().region_of(c) != region)
            .collect();
        if victims.is_empty() {
            continue;
        }
        return Some(Finding {
            technique,
            deductions: victims
                .iter()
                .map(|&c| Deduction::Cell(CellDeduction::empty(c)))
                .collect(),
            involved_cells: cands.iter().chain(victims.iter()).copied().collect(),
            steps: vec![
                Step::CountRemainingStars {
                    remaining_stars: remaining,
                    target_region: region,
                },
                Step::CountStarsInBand {
                    band,
                    stars_needed: ctx.fab.band_remaining(&band),
                },
                Step::ApplyPigeonhole {
                    note: "the region claims every star the lines still take".into(),
                },
            ],
        });
    }
    None
}

// ==================== D3: region-band squeeze ====================

/// For each (line, region) shape, the stars forced into the intersection are
/// `max(line_rem - outside_in_line, region_rem - outside_in_region)`; when
/// the shape has exactly that many eligible cells, all of them are stars.
pub fn find_region_band_squeeze(ctx: &Ctx) -> Option<Finding> {
    let n = ctx.fab.n;
    let mut lines: Vec<Unit> = (0..n).map(Unit::Row).collect();
    lines.extend((0..n).map(Unit::Col));
    for line in lines {
        let line_cands = ctx.fab.candidates(line);
        if line_cands.is_empty() {
            continue;
        }
        let line_rem = ctx.fab.remaining(ctx.board, line);
        for &region in ctx.board.definition().regions() {
            let shape: Vec<usize> = line_cands
                .iter()
                .filter(|&&c| ctx.board.definition().region_of(c) == region)
                .copied()
                .collect();
            if shape.is_empty() {
                continue;
            }
            let region_cands = ctx.fab.candidates(Unit::Region(region));
            let region_rem = ctx.fab.remaining(ctx.board, Unit::Region(region));
            let outside_line = line_cands.len() - shape.len();
            let outside_region = region_cands.len() - shape.len();
            let forced = line_rem
                .saturating_sub(outside_line)
                .max(region_rem.saturating_sub(outside_region));
            if forced == 0 || shape.len() != forced || pairwise_adjacent(&shape, n) {
                continue;
            }
            let band = super::fabric::BoardFabric::line_band(line).expect("line unit");
            return Some(Finding {
                technique: Technique::RegionBandSqueeze,
                deductions: shape
                    .iter()
                    .map(|&c| Deduction::Cell(CellDeduction::star(c)))
                    .collect(),
                involved_cells: shape.clone(),
                steps: vec![
                    Step::FixRegionBandQuota {
                        region,
                        band,
                        quota: forced,
                    },
                    Step::ApplyPigeonhole {
                        note: "the intersection has exactly as many eligible cells as forced stars"
                            .into(),
                    },
                ],
            });
        }
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
