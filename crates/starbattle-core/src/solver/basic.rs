//! Basic crossing techniques and small specialized rules.
//!
//! These fire before the band and cage machinery: crossing out the rest of a
//! starred 2×2 block, clearing satisfied units, region-confined-to-a-line
//! eliminations, and the one-ply pressure probe.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::board::{CellDeduction, CellState};
use crate::geometry::adjacent8;
use crate::validator::PlacementValidator;

use super::explain::{Deduction, Finding, Step};
use super::fabric::Unit;
use super::types::Technique;
use super::Ctx;

/// Two-by-Two: a 2×2 block already holding a star forces every other cell of
/// the block to Empty (stars can never be 8-adjacent).
pub fn find_two_by_two(ctx: &Ctx) -> Option<Finding> {
    for block in ctx.board.blocks() {
        let stars = block
            .cells
            .iter()
            .filter(|&&c| ctx.board.cell(c) == CellState::Star)
            .count();
        if stars != 1 {
            continue;
        }
        let unknowns: Vec<usize> = block
            .cells
            .iter()
            .filter(|&&c| ctx.board.cell(c) == CellState::Unknown)
            .copied()
            .collect();
        if unknowns.is_empty() {
            continue;
        }
        return Some(Finding {
            technique: Technique::TwoByTwo,
            deductions: unknowns
                .iter()
                .map(|&c| Deduction::Cell(CellDeduction::empty(c)))
                .collect(),
            involved_cells: block.cells.to_vec(),
            steps: vec![
                Step::IdentifyCandidateBlocks {
                    blocks: vec![block.id],
                    block_count: 1,
                },
                Step::ApplyPigeonhole {
                    note: "a 2\u{00d7}2 block can hold at most one star, and this one is taken"
                        .into(),
                },
            ],
        });
    }
    None
}

/// Five Crosses: a row, column, or region that already holds its full quota
/// forces every remaining Unknown cell to Empty.
pub fn find_five_crosses(ctx: &Ctx) -> Option<Finding> {
    for unit in ctx.fab.all_units(ctx.board) {
        if ctx.fab.remaining(ctx.board, unit) != 0 {
            continue;
        }
        let unknowns = ctx.fab.unknowns(unit);
        if unknowns.is_empty() {
            continue;
        }
        let steps = match unit {
            Unit::Region(region) => vec![
                Step::CountRemainingStars {
                    remaining_stars: 0,
                    target_region: region,
                },
                Step::EliminateOtherRegionCells {
                    region,
                    cells: unknowns.to_vec(),
                },
            ],
            _ => vec![
                Step::CountStarsInBand {
                    band: super::fabric::BoardFabric::line_band(unit).expect("line unit"),
                    stars_needed: 0,
                },
                Step::ApplyPigeonhole {
                    note: "its stars are all placed, so the rest is crossed out".into(),
                },
            ],
        };
        return Some(Finding {
            technique: Technique::FiveCrosses,
            deductions: unknowns
                .iter()
                .map(|&c| Deduction::Cell(CellDeduction::empty(c)))
                .collect(),
            involved_cells: unknowns.to_vec(),
            steps,
        });
    }
    None
}

/// Shared Row/Column: a region whose candidates all sit in one line claims
/// that many of the line's stars; when the claim consumes the line's whole
/// remainder, the line's other candidates are crossed out.
pub fn find_shared_line(ctx: &Ctx) -> Option<Finding> {
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
        for line in [shared_row(cands, n), shared_col(cands, n)]
            .into_iter()
            .flatten()
        {
            let line_remaining = ctx.fab.remaining(ctx.board, line);
            if line_remaining != remaining {
                continue;
            }
            let outside: Vec<usize> = ctx
                .fab
                .candidates(line)
                .iter()
                .filter(|&&c| ctx.board.definition().region_of(c) != region)
                .copied()
                .collect();
            if outside.is_empty() {
                continue;
            }
            let band = super::fabric::BoardFabric::line_band(line).expect("line unit");
            return Some(Finding {
                technique: Technique::SharedLine,
                deductions: outside
                    .iter()
                    .map(|&c| Deduction::Cell(CellDeduction::empty(c)))
                    .collect(),
                involved_cells: cands.iter().chain(outside.iter()).copied().collect(),
                steps: vec![
                    Step::CountRemainingStars {
                        remaining_stars: remaining,
                        target_region: region,
                    },
                    Step::FixRegionBandQuota {
                        region,
                        band,
                        quota: remaining,
                    },
                    Step::ApplyPigeonhole {
                        note: "the region's remaining stars use up the whole line".into(),
                    },
                ],
            });
        }
    }
    None
}

fn shared_row(cells: &[usize], n: usize) -> Option<Unit> {
    let row = cells[0] / n;
    cells.iter().all(|&c| c / n == row).then_some(Unit::Row(row))
}

fn shared_col(cells: &[usize], n: usize) -> Option<Unit> {
    let col = cells[0] % n;
    cells.iter().all(|&c| c % n == col).then_some(Unit::Col(col))
}

/// Pressured Tees: probe each candidate with a tentative star; if some unit
/// is left without room for its remaining stars, the probed cell is Empty.
/// Probe verdicts are memoized in the completion cache.
pub fn find_pressured_tees(ctx: &Ctx) -> Option<Finding> {
    let n = ctx.fab.n;
    for cell in 0..n * n {
        if !ctx.fab.eligible[cell] {
            continue;
        }
        let key = probe_key(cell);
        let cached = ctx.caches.borrow().completion_get(key);
        let feasible = match cached {
            Some(hit) => hit,
            None => {
                let verdict = probe_is_feasible(ctx, cell);
                ctx.caches.borrow_mut().completion_put(key, verdict);
                verdict
            }
        };
        if feasible {
            continue;
        }
        let starved = starved_unit_name(ctx, cell).unwrap_or_else(|| "a unit".into());
        return Some(Finding {
            technique: Technique::PressuredTees,
            deductions: vec![Deduction::Cell(CellDeduction::empty(cell))],
            involved_cells: vec![cell],
            steps: vec![Step::ApplyPigeonhole {
                note: format!("a star here would leave {} without room for its stars", starved),
            }],
        });
    }
    None
}

fn probe_key(cell: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    "pressure-probe".hash(&mut hasher);
    cell.hash(&mut hasher);
    hasher.finish()
}

/// Place a tentative star at `cell` and check that every unit can still
/// reach its quota from the cells that remain placeable.
fn probe_is_feasible(ctx: &Ctx, cell: usize) -> bool {
    let mut validator = PlacementValidator::new(ctx.board);
    if !validator.can_place(cell) {
        return true;
    }
    validator.place(cell);
    let ok = all_units_have_room(ctx, &validator);
    validator.remove(cell);
    ok
}

fn all_units_have_room(ctx: &Ctx, validator: &PlacementValidator) -> bool {
    let board = ctx.board;
    let def = board.definition();
    let n = ctx.fab.n;
    for unit in ctx.fab.all_units(board) {
        let (placed, quota, cells) = match unit {
            Unit::Row(r) => (validator.row_stars(r), def.stars_per_line(), board.row_cells(r)),
            Unit::Col(c) => (validator.col_stars(c), def.stars_per_line(), board.col_cells(c)),
            Unit::Region(r) => (
                validator.region_stars(r),
                def.stars_per_region(),
                board.region_cells(r),
            ),
        };
        let needed = quota.saturating_sub(placed);
        if needed == 0 {
            continue;
        }
        // Count placeable cells, greedily discounting mutual adjacency: a
        // run of pairwise-adjacent candidates can hold at most one star.
        let placeable: Vec<usize> = cells
            .iter()
            .filter(|&&c| validator.can_place(c))
            .copied()
            .collect();
        if independent_capacity(&placeable, n) < needed {
            return false;
        }
    }
    true
}

/// Upper bound on stars placeable in `cells`: greedy left-to-right skip of
/// 8-adjacent successors.
fn independent_capacity(cells: &[usize], n: usize) -> usize {
    let mut taken: Vec<usize> = Vec::new();
    for &c in cells {
        if taken.iter().all(|&t| !adjacent8(t, c, n)) {
            taken.push(c);
        }
    }
    taken.len()
}

fn starved_unit_name(ctx: &Ctx, cell: usize) -> Option<String> {
    let mut validator = PlacementValidator::new(ctx.board);
    if !validator.can_place(cell) {
        return None;
    }
    validator.place(cell);
    let board = ctx.board;
    let def = board.definition();
    let n = ctx.fab.n;
    let mut found = None;
    for unit in ctx.fab.all_units(board) {
        let (placed, quota, cells, name) = match unit {
            Unit::Row(r) => (
                validator.row_stars(r),
                def.stars_per_line(),
                board.row_cells(r),
                format!("row {}", r + 1),
            ),
            Unit::Col(c) => (
                validator.col_stars(c),
                def.stars_per_line(),
                board.col_cells(c),
                format!("column {}", c + 1),
            ),
            Unit::Region(r) => (
                validator.region_stars(r),
                def.stars_per_region(),
                board.region_cells(r),
                super::explain::region_label(r),
            ),
        };
        let needed = quota.saturating_sub(placed);
        if needed == 0 {
            continue;
        }
        let placeable: Vec<usize> = cells
            .iter()
            .filter(|&&c| validator.can_place(c))
            .copied()
            .collect();
        if independent_capacity(&placeable, n) < needed {
            found = Some(name);
            break;
        }
    }
    validator.remove(cell);
    found
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
    fn test_two_by_two_crosses_block() {
        let b = board(
            "1 1 1 1\n1 1s 1 1\n2 2 2 2\n2 2 2 2",
            1,
        );
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_two_by_two(&ctx).unwrap();
        // The first block containing the star is the top-left one
        let cells: Vec<usize> = f.cell_deductions().iter().map(|d| d.cell).collect();
        assert_eq!(cells, vec![0, 1, 4]);
        assert!(f
            .cell_deductions()
            .iter()
            .all(|d| d.kind == DeductionKind::ForceEmpty));
    }

    #[test]
    fn test_five_crosses_on_satisfied_row() {
        let b = board("1s 1 2\n1 1 2\n3 3 3", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_five_crosses(&ctx).unwrap();
        let cells: Vec<usize> = f.cell_deductions().iter().map(|d| d.cell).collect();
        assert_eq!(cells, vec![1, 2]);
    }

    #[test]
    fn test_shared_line() {
        // Region 2's only candidates are in column 3; the column needs one
        // star, so the column's cells outside region 2 are crossed out.
        let b = board(
            "1 1 1 2\n1 1 1 2\n3 3 3 3\n3 3 3 3",
            1,
        );
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_shared_line(&ctx).unwrap();
        let cells: Vec<usize> = f.cell_deductions().iter().map(|d| d.cell).collect();
        // Column 3 cells of region 3 (rows 2 and 3)
        assert_eq!(cells, vec![11, 15]);
    }

    #[test]
    fn test_pressured_tees() {
        // Region 2 is the pair (0,3),(1,3); a star at (0,2) touches both,
        // leaving the region without a placement.
        let b = board(
            "1 1 1 2\n1 1 1 2\n3 3 3 3\n3 3 3 3",
            1,
        );
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_pressured_tees(&ctx).unwrap();
        let ded = f.cell_deductions();
        assert_eq!(ded.len(), 1);
        assert_eq!(ded[0].kind, DeductionKind::ForceEmpty);
        // The probe scans row-major; (0,2) already starves region 2
        assert_eq!(ded[0].cell, 2);
    }
}
