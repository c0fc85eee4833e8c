//! BoardFabric: per-step derived state built from `BoardState`.
//!
//! Provides the unit indices every technique consumes: star/unknown counts
//! per row, column, and region, plus the eligible-candidate lists (Unknown
//! cells that pass the placement validator). Built once per solve step; all
//! techniques operate on `&BoardFabric`.

use std::collections::HashMap;

use crate::board::{BoardState, CellState};
use crate::geometry::{cell_pos, Band, BandAxis};
use crate::puzzle::RegionId;
use crate::validator::PlacementValidator;

/// A row, column, or region, by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Row(usize),
    Col(usize),
    Region(RegionId),
}

/// Derived per-unit state, rebuilt from the board each solve step.
pub struct BoardFabric {
    pub n: usize,
    pub k: usize,
    /// Placed stars, row-major.
    pub stars: Vec<usize>,
    pub row_stars: Vec<usize>,
    pub col_stars: Vec<usize>,
    pub region_stars: HashMap<RegionId, usize>,
    /// Unknown cells per unit, row-major.
    pub row_unknowns: Vec<Vec<usize>>,
    pub col_unknowns: Vec<Vec<usize>>,
    pub region_unknowns: HashMap<RegionId, Vec<usize>>,
    /// Eligible candidates per unit: Unknown cells passing the validator.
    pub row_candidates: Vec<Vec<usize>>,
    pub col_candidates: Vec<Vec<usize>>,
    pub region_candidates: HashMap<RegionId, Vec<usize>>,
    /// Per-cell eligibility, indexed by cell id.
    pub eligible: Vec<bool>,
}

impl BoardFabric {
    /// Build the fabric from a board snapshot. Call once per solve step.
    pub fn from_board(board: &BoardState) -> Self {
        let n = board.size();
        let k = board.definition().stars_per_line();
        let validator = PlacementValidator::new(board);

        let mut fab = BoardFabric {
            n,
            k,
            stars: Vec::new(),
            row_stars: vec![0; n],
            col_stars: vec![0; n],
            region_stars: HashMap::new(),
            row_unknowns: vec![Vec::new(); n],
            col_unknowns: vec![Vec::new(); n],
            region_unknowns: HashMap::new(),
            row_candidates: vec![Vec::new(); n],
            col_candidates: vec![Vec::new(); n],
            region_candidates: HashMap::new(),
            eligible: vec![false; n * n],
        };
        for &r in board.definition().regions() {
            fab.region_stars.insert(r, 0);
            fab.region_unknowns.insert(r, Vec::new());
            fab.region_candidates.insert(r, Vec::new());
        }

        for cell in 0..n * n {
            let (row, col) = cell_pos(cell, n);
            let region = board.definition().region_of(cell);
            match board.cell(cell) {
                CellState::Star => {
                    fab.stars.push(cell);
                    fab.row_stars[row] += 1;
                    fab.col_stars[col] += 1;
                    *fab.region_stars.get_mut(&region).expect("region known") += 1;
                }
                CellState::Unknown => {
                    fab.row_unknowns[row].push(cell);
                    fab.col_unknowns[col].push(cell);
                    fab.region_unknowns
                        .get_mut(&region)
                        .expect("region known")
                        .push(cell);
                    if validator.can_place(cell) {
                        fab.eligible[cell] = true;
                        fab.row_candidates[row].push(cell);
                        fab.col_candidates[col].push(cell);
                        fab.region_candidates
                            .get_mut(&region)
                            .expect("region known")
                            .push(cell);
                    }
                }
                CellState::Empty => {}
            }
        }
        fab
    }

    /// Quota of a unit.
    pub fn quota(&self, board: &BoardState, unit: Unit) -> usize {
        match unit {
            Unit::Row(_) | Unit::Col(_) => self.k,
            Unit::Region(_) => board.definition().stars_per_region(),
        }
    }

    /// Stars a unit still needs.
    pub fn remaining(&self, board: &BoardState, unit: Unit) -> usize {
        let placed = match unit {
            Unit::Row(r) => self.row_stars[r],
            Unit::Col(c) => self.col_stars[c],
            Unit::Region(r) => self.region_stars.get(&r).copied().unwrap_or(0),
        };
        self.quota(board, unit).saturating_sub(placed)
    }

    /// Eligible candidates of a unit.
    pub fn candidates(&self, unit: Unit) -> &[usize] {
        match unit {
            Unit::Row(r) => &self.row_candidates[r],
            Unit::Col(c) => &self.col_candidates[c],
            Unit::Region(r) => self
                .region_candidates
                .get(&r)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    /// Unknown cells of a unit.
    pub fn unknowns(&self, unit: Unit) -> &[usize] {
        match unit {
            Unit::Row(r) => &self.row_unknowns[r],
            Unit::Col(c) => &self.col_unknowns[c],
            Unit::Region(r) => self
                .region_unknowns
                .get(&r)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    /// Placed stars inside a band.
    pub fn stars_in_band(&self, band: &Band) -> usize {
        self.stars
            .iter()
            .filter(|&&c| band.contains(c, self.n))
            .count()
    }

    /// Stars a band still needs: band capacity minus stars placed inside.
    pub fn band_remaining(&self, band: &Band) -> usize {
        (band.len() * self.k).saturating_sub(self.stars_in_band(band))
    }

    /// Eligible candidates of a region that lie inside a band.
    pub fn region_candidates_in_band(&self, region: RegionId, band: &Band) -> Vec<usize> {
        self.candidates(Unit::Region(region))
            .iter()
            .filter(|&&c| band.contains(c, self.n))
            .copied()
            .collect()
    }

    /// Stars of a region already placed inside a band.
    pub fn region_stars_in_band(&self, board: &BoardState, region: RegionId, band: &Band) -> usize {
        board
            .region_cells(region)
            .iter()
            .filter(|&&c| band.contains(c, self.n) && board.cell(c) == CellState::Star)
            .count()
    }

    /// Regions intersecting a band, split into (fully inside, partial).
    /// Regions with no cell in the band appear in neither list.
    pub fn regions_by_band(&self, board: &BoardState, band: &Band) -> (Vec<RegionId>, Vec<RegionId>) {
        let mut full = Vec::new();
        let mut partial = Vec::new();
        for &region in board.definition().regions() {
            let cells = board.region_cells(region);
            let inside = cells.iter().filter(|&&c| band.contains(c, self.n)).count();
            if inside == 0 {
                continue;
            }
            if inside == cells.len() {
                full.push(region);
            } else {
                partial.push(region);
            }
        }
        (full, partial)
    }

    /// All units, rows then columns then regions, deterministic order.
    pub fn all_units(&self, board: &BoardState) -> Vec<Unit> {
        let mut units = Vec::with_capacity(2 * self.n + 8);
        for i in 0..self.n {
            units.push(Unit::Row(i));
        }
        for i in 0..self.n {
            units.push(Unit::Col(i));
        }
        for &r in board.definition().regions() {
            units.push(Unit::Region(r));
        }
        units
    }

    /// The single-line band containing a unit, for row/column units.
    pub fn line_band(unit: Unit) -> Option<Band> {
        match unit {
            Unit::Row(r) => Some(Band {
                axis: BandAxis::Rows,
                start: r,
                end: r,
            }),
            Unit::Col(c) => Some(Band {
                axis: BandAxis::Cols,
                start: c,
                end: c,
            }),
            Unit::Region(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::parse_puzzle;

    fn board(text: &str, k: usize) -> BoardState {
        let (def, marks) = parse_puzzle(text, k).unwrap();
        BoardState::new(def, marks).unwrap()
    }

    #[test]
    fn test_counts_and_candidates() {
        let b = board("1s 1 2\n1 1 2\n3 3 3", 1);
        let fab = BoardFabric::from_board(&b);
        assert_eq!(fab.stars, vec![0]);
        assert_eq!(fab.row_stars[0], 1);
        assert_eq!(fab.region_stars[&1], 1);
        // Region 1's other cells are all blocked (adjacency or quota)
        assert!(fab.candidates(Unit::Region(1)).is_empty());
        // Cell 5 (row 1, col 2) is the only eligible cell of region 2
        assert_eq!(fab.candidates(Unit::Region(2)), &[5]);
        assert_eq!(fab.remaining(&b, Unit::Region(2)), 1);
        assert_eq!(fab.remaining(&b, Unit::Row(0)), 0);
    }

    #[test]
    fn test_band_queries() {
        let b = board("1s 1 2\n1 1 2\n3 3 3", 1);
        let fab = BoardFabric::from_board(&b);
        let top = Band::rows(0, 1);
        assert_eq!(fab.stars_in_band(&top), 1);
        assert_eq!(fab.band_remaining(&top), 1);
        let (full, partial) = fab.regions_by_band(&b, &top);
        assert_eq!(full, vec![1, 2]);
        assert!(partial.is_empty());
    }

    #[test]
    fn test_regions_by_band_partial() {
        let b = board("1 1 2\n1 2 2\n3 3 3", 1);
        let fab = BoardFabric::from_board(&b);
        let top = Band::rows(0, 0);
        let (full, partial) = fab.regions_by_band(&b, &top);
        assert!(full.is_empty());
        assert_eq!(partial, vec![1, 2]);
    }
}
