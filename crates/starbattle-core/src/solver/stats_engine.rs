//! Constraint statistics and the subset-constraint squeeze.
//!
//! Every unit contributes a `(cells, min, max)` constraint over its Unknown
//! cells, counting additional stars. Region-band constraints are tightened
//! three ways: stars already in the band, a bipartite demand/capacity flow
//! bound (the band's rows must unload their remaining stars somewhere), and
//! an exhaustive in-region placement analysis when tractable. Blocks are
//! 0..1 and get upgraded to forced when another constraint pins a star
//! inside. The squeeze compares constraint pairs where one cell set contains
//! the other.

use crate::board::{CellDeduction, CellState};
use crate::geometry::{enumerate_bands, Band, BandAxis};
use crate::puzzle::RegionId;

use super::explain::{Deduction, Finding, Step};
use super::fabric::Unit;
use super::quota::quota_in_band;
use super::types::Technique;
use super::Ctx;

/// Where a constraint came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintSource {
    Row(usize),
    Column(usize),
    Region(RegionId),
    RegionBand { region: RegionId, band: Band },
    Block(usize),
    BlockForced(usize),
}

/// `cells` must hold between `min` and `max` additional stars.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub cells: Vec<usize>,
    pub min: usize,
    pub max: usize,
    pub source: ConstraintSource,
}

impl Constraint {
    fn normalized(mut self) -> Option<Self> {
        self.max = self.max.min(self.cells.len());
        self.min = self.min.min(self.max);
        if self.cells.is_empty() {
            return None;
        }
        Some(self)
    }
}

/// Build the full constraint list for the current board.
pub fn build_constraints(ctx: &Ctx) -> Vec<Constraint> {
    let mut out = Vec::new();

    for unit in ctx.fab.all_units(ctx.board) {
        let remaining = ctx.fab.remaining(ctx.board, unit);
        let cells = ctx.fab.unknowns(unit).to_vec();
        let source = match unit {
            Unit::Row(r) => ConstraintSource::Row(r),
            Unit::Col(c) => ConstraintSource::Column(c),
            Unit::Region(r) => ConstraintSource::Region(r),
        };
        if let Some(c) = (Constraint {
            cells,
            min: remaining,
            max: remaining,
            source,
        })
        .normalized()
        {
            out.push(c);
        }
    }

    out.extend(region_band_constraints(ctx));

    // 2×2 blocks: at most one star; forced when another constraint pins a
    // star inside the block.
    let mut block_constraints = Vec::new();
    for block in ctx.board.blocks() {
        let stars = block
            .cells
            .iter()
            .filter(|&&c| ctx.board.cell(c) == CellState::Star)
            .count();
        let cells: Vec<usize> = block
            .cells
            .iter()
            .filter(|&&c| ctx.board.cell(c) == CellState::Unknown)
            .copied()
            .collect();
        let forced = stars == 0
            && out.iter().any(|c| {
                let outside = c
                    .cells
                    .iter()
                    .filter(|&&x| !block.cells.contains(&x))
                    .count();
                c.min > 0 && c.min > outside
            });
        let (min, max, source) = if forced {
            (1, 1, ConstraintSource::BlockForced(block.id))
        } else {
            (
                0,
                1usize.saturating_sub(stars),
                ConstraintSource::Block(block.id),
            )
        };
        if let Some(c) = (Constraint {
            cells,
            min,
            max,
            source,
        })
        .normalized()
        {
            block_constraints.push(c);
        }
    }
    out.extend(block_constraints);
    out
}

fn region_band_constraints(ctx: &Ctx) -> Vec<Constraint> {
    let n = ctx.fab.n;
    let mut out = Vec::new();
    for axis in [BandAxis::Rows, BandAxis::Cols] {
        for band in enumerate_bands(axis, n) {
            for &region in ctx.board.definition().regions() {
                let region_cells = ctx.board.region_cells(region);
                let inside = region_cells
                    .iter()
                    .filter(|&&c| band.contains(c, n))
                    .count();
                if inside == 0 || inside == region_cells.len() {
                    // Fully-inside duplicates the plain region constraint.
                    continue;
                }
                let cells: Vec<usize> = region_cells
                    .iter()
                    .filter(|&&c| band.contains(c, n) && ctx.board.cell(c) == CellState::Unknown)
                    .copied()
                    .collect();
                if cells.is_empty() {
                    continue;
                }
                let q = quota_in_band(ctx.board, ctx.fab, ctx.caches, ctx.options, region, &band, 0);
                let current = ctx.fab.region_stars_in_band(ctx.board, region, &band);
                let mut min = q.min.saturating_sub(current);
                let max = q.max.saturating_sub(current);
                if axis == BandAxis::Rows {
                    min = min.max(min_from_rows(ctx, region, &band));
                }
                if let Some(c) = (Constraint {
                    cells,
                    min,
                    max,
                    source: ConstraintSource::RegionBand { region, band },
                })
                .normalized()
                {
                    if c.min > 0 || c.max < c.cells.len() {
                        out.push(c);
                    }
                }
            }
        }
    }
    out
}

/// Flow bound: the band's rows must place their remaining stars somewhere;
/// whatever the other regions cannot absorb lands in the target region.
fn min_from_rows(ctx: &Ctx, region: RegionId, band: &Band) -> usize {
    let n = ctx.fab.n;
    let rows: Vec<usize> = (band.start..=band.end).collect();
    let row_demand: usize = rows.iter().map(|&r| ctx.fab.remaining(ctx.board, Unit::Row(r))).sum();
    if row_demand == 0 {
        return 0;
    }
    let others: Vec<RegionId> = ctx
        .board
        .definition()
        .regions()
        .iter()
        .filter(|&&r| r != region)
        .copied()
        .collect();

    // Nodes: 0 source | 1..=rows | rows+1..=rows+others | sink.
    let rn = rows.len();
    let on = others.len();
    let sink = 1 + rn + on;
    let mut cap = vec![vec![0isize; sink + 1]; sink + 1];
    for (i, &r) in rows.iter().enumerate() {
        cap[0][1 + i] = ctx.fab.remaining(ctx.board, Unit::Row(r)) as isize;
        for (j, &other) in others.iter().enumerate() {
            let absorb = ctx
                .fab
                .candidates(Unit::Row(r))
                .iter()
                .filter(|&&c| ctx.board.definition().region_of(c) == other)
                .count();
            cap[1 + i][1 + rn + j] = absorb as isize;
        }
    }
    for (j, &other) in others.iter().enumerate() {
        // Remaining capacity of the region, discounted by what it owes
        // outside the band.
        let remaining = ctx.fab.remaining(ctx.board, Unit::Region(other));
        let outside_min = region_min_outside(ctx, other, band);
        cap[1 + rn + j][sink] = remaining.saturating_sub(outside_min) as isize;
    }
    let absorbed = max_flow(&mut cap, 0, sink);
    row_demand.saturating_sub(absorbed as usize)
}

/// Minimum stars a region must still place outside the band: remaining
/// stars minus what its in-band candidates could take.
fn region_min_outside(ctx: &Ctx, region: RegionId, band: &Band) -> usize {
    let remaining = ctx.fab.remaining(ctx.board, Unit::Region(region));
    let in_band = ctx.fab.region_candidates_in_band(region, band).len();
    remaining.saturating_sub(in_band)
}

/// Plain BFS augmenting-path max flow over an adjacency matrix.
fn max_flow(cap: &mut [Vec<isize>], source: usize, sink: usize) -> isize {
    let nodes = cap.len();
    let mut total = 0;
    loop {
        let mut parent = vec![usize::MAX; nodes];
        parent[source] = source;
        let mut queue = std::collections::VecDeque::from([source]);
        while let Some(u) = queue.pop_front() {
            for v in 0..nodes {
                if parent[v] == usize::MAX && cap[u][v] > 0 {
                    parent[v] = u;
                    queue.push_back(v);
                }
            }
        }
        if parent[sink] == usize::MAX {
            return total;
        }
        let mut bottleneck = isize::MAX;
        let mut v = sink;
        while v != source {
            let u = parent[v];
            bottleneck = bottleneck.min(cap[u][v]);
            v = u;
        }
        let mut v = sink;
        while v != source {
            let u = parent[v];
            cap[u][v] -= bottleneck;
            cap[v][u] += bottleneck;
            v = u;
        }
        total += bottleneck;
    }
}

/// Subset Squeeze: a contained constraint whose minimum meets the
/// container's maximum crosses out the container's other cells. Saturated
/// constraints (max 0 with cells left) cross out directly.
pub fn find_subset_squeeze(ctx: &Ctx) -> Option<Finding> {
    let constraints = build_constraints(ctx);

    // A starred block with unknowns left is a degenerate squeeze: its
    // remaining capacity is zero. Line saturation is five-crosses territory
    // and is left out to keep the technique's output focused on blocks.
    for large in &constraints {
        if large.max == 0 && matches!(large.source, ConstraintSource::Block(_)) {
            return Some(squeeze_finding(large.cells.clone(), large, None));
        }
    }

    // Prefer the tightest contained constraint: smallest cell sets first.
    let mut smalls: Vec<&Constraint> = constraints.iter().collect();
    smalls.sort_by_key(|c| c.cells.len());

    for small in smalls {
        if small.min == 0 {
            continue;
        }
        for large in &constraints {
            if std::ptr::eq(small, large) || small.min != large.max {
                continue;
            }
            if !small.cells.iter().all(|c| large.cells.contains(c)) {
                continue;
            }
            let victims: Vec<usize> = large
                .cells
                .iter()
                .filter(|&&c| !small.cells.contains(&c))
                .copied()
                .collect();
            if victims.is_empty() {
                continue;
            }
            return Some(squeeze_finding(victims, large, Some(small)));
        }
    }
    None
}

fn squeeze_finding(victims: Vec<usize>, large: &Constraint, small: Option<&Constraint>) -> Finding {
    let note = match small {
        Some(s) => format!(
            "{} already supplies the {} star{} that {} can hold",
            source_phrase(&s.source),
            s.min,
            if s.min == 1 { "" } else { "s" },
            source_phrase(&large.source),
        ),
        None => format!("{} cannot hold any more stars", source_phrase(&large.source)),
    };
    Finding {
        technique: Technique::SubsetSqueeze,
        deductions: victims
            .iter()
            .map(|&c| Deduction::Cell(CellDeduction::empty(c)))
            .collect(),
        involved_cells: victims,
        steps: vec![Step::ApplyPigeonhole { note }],
    }
}

fn source_phrase(source: &ConstraintSource) -> String {
    match source {
        ConstraintSource::Row(r) => format!("row {}", r + 1),
        ConstraintSource::Column(c) => format!("column {}", c + 1),
        ConstraintSource::Region(r) => super::explain::region_label(*r),
        ConstraintSource::RegionBand { region, band } => format!(
            "{} within {}",
            super::explain::region_label(*region),
            super::explain::band_label(band)
        ),
        ConstraintSource::Block(b) | ConstraintSource::BlockForced(b) => {
            super::explain::block_label(*b)
        }
    }
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
    fn test_scenario_subset_squeeze_2x2() {
        // 2x2 grid, one star per line, regions = rows, cross at (1,0).
        // Column 0 reduces to {(0,0)} with min = max = 1; row 0 still has
        // {(0,0),(0,1)} with min = max = 1. The squeeze crosses out (0,1).
        let b = board("1 1\n2x 2", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_subset_squeeze(&ctx).unwrap();
        let ded = f.cell_deductions();
        assert_eq!(ded.len(), 1);
        assert_eq!(ded[0].cell, 1);
        assert_eq!(ded[0].kind, DeductionKind::ForceEmpty);
    }

    #[test]
    fn test_saturated_block_crosses_rest() {
        // Scenario layout: the star at (2,3) with its already-crossed
        // neighbors above leaves the lower-right block holding the star and
        // two unknowns; the block's capacity is spent, crossing out exactly
        // (3,2) and (3,3).
        let mut b = board("1 1 2 2\n1 1 2 2\n1 1 3 3\n4 4 3 3", 1);
        b.apply(CellDeduction::star(11)).unwrap();
        for cross in [6, 7, 10] {
            b.apply(CellDeduction::empty(cross)).unwrap();
        }
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let f = find_subset_squeeze(&ctx).unwrap();
        let mut cells: Vec<usize> = f.cell_deductions().iter().map(|d| d.cell).collect();
        cells.sort_unstable();
        assert_eq!(cells, vec![14, 15]);
    }

    #[test]
    fn test_constraint_normalization() {
        let b = board("1 1\n2 2", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        for c in build_constraints(&ctx) {
            assert!(c.min <= c.max, "{:?}", c.source);
            assert!(c.max <= c.cells.len(), "{:?}", c.source);
        }
    }

    #[test]
    fn test_flow_bound_forces_region_share() {
        // Row 0's star must land in region 1: region 2's only row-0 cell
        // is crossed out, so the flow bound pins min 1 for region 1 in the
        // row band 0..0.
        let b = board("1 1 2x\n1 1 2\n3 3 2", 1);
        let (fab, caches, opts) = test_ctx::parts(&b);
        let ctx = test_ctx::ctx(&b, &fab, &caches, &opts);
        let min = min_from_rows(&ctx, 1, &Band::rows(0, 0));
        assert_eq!(min, 1);
    }
}
