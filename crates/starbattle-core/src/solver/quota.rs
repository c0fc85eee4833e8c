//! Region band quota: how many stars must a region place inside a band?
//!
//! The returned range counts the region's total stars in the band across all
//! legal completions that respect the region's requirement and the placement
//! constraints. Fast cases are deterministic; the general case enumerates
//! placements with the validator under a node budget. Exceeding the budget is
//! not an error — the trivial bounds come back with `known = false`.
//!
//! A region split by the target band can sometimes be pinned down through the
//! complement bands instead (the region's stars across disjoint bands must
//! sum to its requirement). That second look is capped at one level to keep
//! the mutual recursion with the band schemas finite.

use std::cell::RefCell;

use crate::board::BoardState;
use crate::geometry::{cell_pos, Band, BandAxis};
use crate::puzzle::RegionId;

use super::cache::{QuotaRange, SolveCaches};
use super::fabric::BoardFabric;
use super::types::SolveOptions;
use crate::validator::PlacementValidator;

/// Maximum complement-band tightening depth.
const MAX_DEPTH: u8 = 1;

/// Compute the star range of `region` inside `band`. Results are memoized
/// per board fingerprint in `caches`.
pub fn quota_in_band(
    board: &BoardState,
    fab: &BoardFabric,
    caches: &RefCell<SolveCaches>,
    options: &SolveOptions,
    region: RegionId,
    band: &Band,
    depth: u8,
) -> QuotaRange {
    let key = (region, band.key(), depth);
    if let Some(hit) = caches.borrow().quota_get(&key) {
        return hit;
    }
    let range = compute(board, fab, caches, options, region, band, depth);
    caches.borrow_mut().quota_put(key, range);
    range
}

fn compute(
    board: &BoardState,
    fab: &BoardFabric,
    caches: &RefCell<SolveCaches>,
    options: &SolveOptions,
    region: RegionId,
    band: &Band,
    depth: u8,
) -> QuotaRange {
    let n = fab.n;
    let required = board.definition().stars_per_region();
    let current_total = fab.region_stars.get(&region).copied().unwrap_or(0);
    let current_in = fab.region_stars_in_band(board, region, band);
    let remaining = required.saturating_sub(current_total);

    let region_cells = board.region_cells(region);
    let fully_inside = region_cells.iter().all(|&c| band.contains(c, n));
    if fully_inside {
        return QuotaRange {
            min: required,
            max: required,
            known: true,
        };
    }
    if remaining == 0 {
        return QuotaRange {
            min: current_in,
            max: current_in,
            known: true,
        };
    }

    let candidates: Vec<usize> = fab
        .region_candidates
        .get(&region)
        .cloned()
        .unwrap_or_default();
    let in_band = candidates
        .iter()
        .filter(|&&c| band.contains(c, n))
        .count();
    let out_band = candidates.len() - in_band;
    if out_band == 0 {
        // Every remaining star of the region must land inside the band.
        return QuotaRange {
            min: current_in + remaining,
            max: current_in + remaining,
            known: true,
        };
    }
    if in_band == 0 {
        return QuotaRange {
            min: current_in,
            max: current_in,
            known: true,
        };
    }

    let trivial = QuotaRange {
        min: current_in,
        max: current_in + remaining.min(in_band),
        known: false,
    };

    if candidates.len() > options.quota_candidate_cap {
        return fallback(board, fab, caches, options, region, band, depth, trivial, required);
    }

    // Enumerate assignments of the remaining stars over the region's
    // candidates, tracking how many land inside the band.
    let mut search = QuotaSearch {
        validator: PlacementValidator::new(board),
        band: *band,
        n,
        nodes: 0,
        budget: options.quota_node_budget,
        min_in: usize::MAX,
        max_in: 0,
    };
    let completed = search.run(&candidates, 0, remaining, 0);

    if !completed || search.min_in == usize::MAX {
        log::trace!(
            "quota_in_band: bail-out for region {} ({} nodes)",
            region,
            search.nodes
        );
        return fallback(board, fab, caches, options, region, band, depth, trivial, required);
    }

    QuotaRange {
        min: current_in + search.min_in,
        max: current_in + search.max_in,
        known: true,
    }
}

/// On bail-out, try once to pin the band through its complements before
/// settling for the trivial bounds.
#[allow(clippy::too_many_arguments)]
fn fallback(
    board: &BoardState,
    fab: &BoardFabric,
    caches: &RefCell<SolveCaches>,
    options: &SolveOptions,
    region: RegionId,
    band: &Band,
    depth: u8,
    trivial: QuotaRange,
    required: usize,
) -> QuotaRange {
    if depth >= MAX_DEPTH {
        return trivial;
    }
    let Some(complements) = complement_bands(board, fab, region, band) else {
        return trivial;
    };
    let mut sum_min = 0;
    let mut sum_max = 0;
    for comp in &complements {
        let q = quota_in_band(board, fab, caches, options, region, comp, depth + 1);
        if !q.known {
            return trivial;
        }
        sum_min += q.min;
        sum_max += q.max;
    }
    // Stars across the target band and its complements sum to the requirement.
    let min = required.saturating_sub(sum_max).max(trivial.min);
    let max = required.saturating_sub(sum_min).min(trivial.max);
    if min > max {
        return trivial;
    }
    QuotaRange {
        min,
        max,
        known: true,
    }
}

/// Bands on the same axis covering the region's lines outside the target
/// band: at most one run below and one above. `None` when the target band
/// does not slice the region on this axis.
fn complement_bands(
    board: &BoardState,
    fab: &BoardFabric,
    region: RegionId,
    band: &Band,
) -> Option<Vec<Band>> {
    let n = fab.n;
    let lines: Vec<usize> = board
        .region_cells(region)
        .iter()
        .map(|&c| {
            let (row, col) = cell_pos(c, n);
            match band.axis {
                BandAxis::Rows => row,
                BandAxis::Cols => col,
            }
        })
        .collect();
    let lo = *lines.iter().min()?;
    let hi = *lines.iter().max()?;
    if lo >= band.start && hi <= band.end {
        return None;
    }
    let mut out = Vec::new();
    if lo < band.start {
        out.push(Band {
            axis: band.axis,
            start: lo,
            end: band.start - 1,
        });
    }
    if hi > band.end {
        out.push(Band {
            axis: band.axis,
            start: band.end + 1,
            end: hi,
        });
    }
    Some(out)
}

struct QuotaSearch<'a> {
    validator: PlacementValidator<'a>,
    band: Band,
    n: usize,
    nodes: usize,
    budget: usize,
    min_in: usize,
    max_in: usize,
}

impl QuotaSearch<'_> {
    /// DFS over candidate cells, placing exactly `left` more stars starting
    /// at index `start`. Returns false when the node budget ran out.
    fn run(&mut self, candidates: &[usize], start: usize, left: usize, in_band: usize) -> bool {
        self.nodes += 1;
        if self.nodes > self.budget {
            return false;
        }
        if left == 0 {
            self.min_in = self.min_in.min(in_band);
            self.max_in = self.max_in.max(in_band);
            return true;
        }
        if candidates.len() - start < left {
            return true;
        }
        for i in start..candidates.len() {
            let cell = candidates[i];
            if !self.validator.can_place(cell) {
                continue;
            }
            self.validator.place(cell);
            let inside = self.band.contains(cell, self.n) as usize;
            let ok = self.run(candidates, i + 1, left - 1, in_band + inside);
            self.validator.remove(cell);
            if !ok {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardState;
    use crate::puzzle::parse_puzzle;

    fn setup(text: &str, k: usize) -> (BoardState, BoardFabric) {
        let (def, marks) = parse_puzzle(text, k).unwrap();
        let board = BoardState::new(def, marks).unwrap();
        let fab = BoardFabric::from_board(&board);
        (board, fab)
    }

    #[test]
    fn test_region_fully_inside_band() {
        let (board, fab) = setup("1 1 2\n1 1 2\n3 3 3", 1);
        let caches = RefCell::new(SolveCaches::new());
        caches.borrow_mut().ensure(board.fingerprint());
        let q = quota_in_band(
            &board,
            &fab,
            &caches,
            &SolveOptions::default(),
            1,
            &Band::rows(0, 1),
            0,
        );
        assert_eq!(
            q,
            QuotaRange {
                min: 1,
                max: 1,
                known: true
            }
        );
    }

    #[test]
    fn test_no_remaining_stars() {
        // Region 1 spans rows 0..1 and already holds its star.
        let (board, fab) = setup("1s 1 2\n1 3 2\n3 3 2", 1);
        let caches = RefCell::new(SolveCaches::new());
        caches.borrow_mut().ensure(board.fingerprint());
        let q = quota_in_band(
            &board,
            &fab,
            &caches,
            &SolveOptions::default(),
            1,
            &Band::rows(0, 0),
            0,
        );
        assert!(q.is_exact());
        assert_eq!(q.min, 1);
    }

    #[test]
    fn test_enumeration_pins_split_region() {
        // Region 2 spans rows 0..1 with open candidates on both sides of the
        // single-row band: the search finds min 0 / max 1 in row 0.
        let (board, fab) = setup("1 1 2 2\n1 1 2 2\n3 3 4 4\n3 3 4 4", 1);
        let caches = RefCell::new(SolveCaches::new());
        caches.borrow_mut().ensure(board.fingerprint());
        let q = quota_in_band(
            &board,
            &fab,
            &caches,
            &SolveOptions::default(),
            2,
            &Band::rows(0, 0),
            0,
        );
        assert!(q.known);
        assert_eq!((q.min, q.max), (0, 1));
    }

    #[test]
    fn test_all_candidates_inside_band() {
        // Region 1 spans rows 0..1 but the star at (2,1) knocks out its
        // row-1 cells, leaving every candidate inside the top row.
        let (board, fab) = setup("1 1 2\n1 1 2\n3 3s 3", 1);
        let caches = RefCell::new(SolveCaches::new());
        caches.borrow_mut().ensure(board.fingerprint());
        let q = quota_in_band(
            &board,
            &fab,
            &caches,
            &SolveOptions::default(),
            1,
            &Band::rows(0, 0),
            0,
        );
        assert!(q.is_exact());
        assert_eq!(q.min, 1);
    }
}
