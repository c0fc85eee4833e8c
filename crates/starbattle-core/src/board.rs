//! Mutable board state over an immutable puzzle definition.
//!
//! Cell states transition only Unknown→Star or Unknown→Empty; every other
//! transition is an engine bug surfaced as `InconsistentDeduction`. Derived
//! per-unit indices are rebuilt lazily and a stable fingerprint over the
//! cell-state array keys the solver caches.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{self, cell_index, cell_pos, Block};
use crate::puzzle::{PuzzleDefinition, RegionId};

/// State of a single cell. `Empty` is an explicit cross (known non-star),
/// not the absence of a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    Unknown,
    Star,
    Empty,
}

impl CellState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, CellState::Unknown)
    }
}

/// The two cell-level deduction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeductionKind {
    ForceStar,
    ForceEmpty,
}

impl DeductionKind {
    /// Terminal state this deduction drives the cell to.
    #[inline]
    pub fn target(self) -> CellState {
        match self {
            DeductionKind::ForceStar => CellState::Star,
            DeductionKind::ForceEmpty => CellState::Empty,
        }
    }
}

/// A single forced cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDeduction {
    pub cell: usize,
    pub kind: DeductionKind,
}

impl CellDeduction {
    pub fn star(cell: usize) -> Self {
        CellDeduction {
            cell,
            kind: DeductionKind::ForceStar,
        }
    }

    pub fn empty(cell: usize) -> Self {
        CellDeduction {
            cell,
            kind: DeductionKind::ForceEmpty,
        }
    }
}

/// Errors from board construction and deduction application.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("region map does not partition the grid")]
    InvalidRegionMap,
    #[error("cell count {found} does not match grid size {expected}")]
    CellCount { expected: usize, found: usize },
    #[error("inconsistent deduction: cell {cell} is already {current:?}, cannot force {target:?}")]
    InconsistentDeduction {
        cell: usize,
        current: CellState,
        target: CellState,
    },
    #[error("inconsistent deduction: star at cell {cell} would touch the star at cell {neighbor}")]
    AdjacentStar { cell: usize, neighbor: usize },
    #[error("inconsistent deduction: star at cell {cell} exceeds a unit quota")]
    QuotaExceeded { cell: usize },
}

/// Board state: definition + cell states + derived read-only indices.
#[derive(Debug, Clone)]
pub struct BoardState {
    def: PuzzleDefinition,
    cells: Vec<CellState>,
    blocks: Vec<Block>,
}

impl BoardState {
    /// Construct from a definition and initial cell marks. The definition
    /// is re-checked here because serde can produce one that bypassed
    /// `PuzzleDefinition::new`.
    pub fn new(def: PuzzleDefinition, marks: Vec<CellState>) -> Result<Self, BoardError> {
        let n = def.size();
        if def.regions().is_empty() || def.regions().iter().any(|&r| def.region_cells(r).is_empty())
        {
            return Err(BoardError::InvalidRegionMap);
        }
        if marks.len() != n * n {
            return Err(BoardError::CellCount {
                expected: n * n,
                found: marks.len(),
            });
        }
        Ok(BoardState {
            blocks: geometry::enumerate_blocks(n),
            def,
            cells: marks,
        })
    }

    /// Construct with every cell Unknown.
    pub fn empty(def: PuzzleDefinition) -> Self {
        let n = def.size();
        BoardState {
            blocks: geometry::enumerate_blocks(n),
            cells: vec![CellState::Unknown; n * n],
            def,
        }
    }

    #[inline]
    pub fn definition(&self) -> &PuzzleDefinition {
        &self.def
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.def.size()
    }

    #[inline]
    pub fn cell(&self, cell: usize) -> CellState {
        self.cells[cell]
    }

    #[inline]
    pub fn cell_at(&self, row: usize, col: usize) -> CellState {
        self.cells[cell_index(row, col, self.def.size())]
    }

    #[inline]
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// All 2×2 blocks of the grid.
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Cells of a row, left to right.
    pub fn row_cells(&self, row: usize) -> Vec<usize> {
        let n = self.def.size();
        (0..n).map(|col| cell_index(row, col, n)).collect()
    }

    /// Cells of a column, top to bottom.
    pub fn col_cells(&self, col: usize) -> Vec<usize> {
        let n = self.def.size();
        (0..n).map(|row| cell_index(row, col, n)).collect()
    }

    /// Cells of a region, row-major.
    pub fn region_cells(&self, region: RegionId) -> Vec<usize> {
        self.def.region_cells(region)
    }

    /// Count cells of a unit in a given state.
    pub fn count_in(&self, cells: &[usize], state: CellState) -> usize {
        cells.iter().filter(|&&c| self.cells[c] == state).count()
    }

    /// Ids of all placed stars, row-major.
    pub fn stars(&self) -> Vec<usize> {
        (0..self.cells.len())
            .filter(|&c| self.cells[c] == CellState::Star)
            .collect()
    }

    /// Stable hash over the cell-state array. Applying any deduction changes
    /// the fingerprint, which invalidates fingerprint-keyed caches.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.def.size().hash(&mut hasher);
        for &state in &self.cells {
            (state as u8).hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Apply one cell deduction. A no-op when the cell already holds the
    /// stated terminal state (deduplication); errors when the transition
    /// conflicts or a forced star touches an existing star.
    pub fn apply(&mut self, ded: CellDeduction) -> Result<(), BoardError> {
        let target = ded.kind.target();
        let current = self.cells[ded.cell];
        if current == target {
            return Ok(());
        }
        if current.is_terminal() {
            return Err(BoardError::InconsistentDeduction {
                cell: ded.cell,
                current,
                target,
            });
        }
        if ded.kind == DeductionKind::ForceStar {
            let n = self.def.size();
            for nb in geometry::neighbors8(ded.cell, n) {
                if self.cells[nb] == CellState::Star {
                    return Err(BoardError::AdjacentStar {
                        cell: ded.cell,
                        neighbor: nb,
                    });
                }
            }
            if self.star_would_exceed_quota(ded.cell) {
                return Err(BoardError::QuotaExceeded { cell: ded.cell });
            }
        }
        self.cells[ded.cell] = target;
        Ok(())
    }

    fn star_would_exceed_quota(&self, cell: usize) -> bool {
        let (row, col) = cell_pos(cell, self.def.size());
        let k = self.def.stars_per_line();
        if self.count_in(&self.row_cells(row), CellState::Star) >= k {
            return true;
        }
        if self.count_in(&self.col_cells(col), CellState::Star) >= k {
            return true;
        }
        let region = self.def.region_of(cell);
        self.count_in(&self.region_cells(region), CellState::Star)
            >= self.def.stars_per_region()
    }

    /// Whether every unit holds exactly its quota and no cell is Unknown.
    pub fn is_complete(&self) -> bool {
        if self.cells.iter().any(|&c| c == CellState::Unknown) {
            return false;
        }
        self.check_violation().is_none()
            && self.all_quotas_met()
    }

    fn all_quotas_met(&self) -> bool {
        let n = self.def.size();
        let k = self.def.stars_per_line();
        for line in 0..n {
            if self.count_in(&self.row_cells(line), CellState::Star) != k {
                return false;
            }
            if self.count_in(&self.col_cells(line), CellState::Star) != k {
                return false;
            }
        }
        self.def.regions().iter().all(|&r| {
            self.count_in(&self.region_cells(r), CellState::Star) == self.def.stars_per_region()
        })
    }

    /// First invariant violation on the current board, if any: two adjacent
    /// stars or a unit over quota.
    pub fn check_violation(&self) -> Option<BoardError> {
        let n = self.def.size();
        let stars = self.stars();
        for (i, &a) in stars.iter().enumerate() {
            for &b in &stars[i + 1..] {
                if geometry::adjacent8(a, b, n) {
                    return Some(BoardError::AdjacentStar {
                        cell: b,
                        neighbor: a,
                    });
                }
            }
        }
        let k = self.def.stars_per_line();
        for line in 0..n {
            if self.count_in(&self.row_cells(line), CellState::Star) > k
                || self.count_in(&self.col_cells(line), CellState::Star) > k
            {
                return Some(BoardError::QuotaExceeded {
                    cell: cell_index(line, 0, n),
                });
            }
        }
        for &r in self.def.regions() {
            let cells = self.region_cells(r);
            if self.count_in(&cells, CellState::Star) > self.def.stars_per_region() {
                return Some(BoardError::QuotaExceeded { cell: cells[0] });
            }
        }
        None
    }

    /// Render back to the text import format (diagnostics, fixtures).
    pub fn to_puzzle_string(&self) -> String {
        let n = self.def.size();
        let mut out = String::new();
        for row in 0..n {
            for col in 0..n {
                if col > 0 {
                    out.push(' ');
                }
                let cell = cell_index(row, col, n);
                let region = self.def.region_of(cell);
                let digit = if region == 10 { 0 } else { region as u32 };
                out.push_str(&digit.to_string());
                match self.cells[cell] {
                    CellState::Star => out.push('s'),
                    CellState::Empty => out.push('x'),
                    CellState::Unknown => {}
                }
            }
            out.push('\n');
        }
        out
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
    fn test_apply_and_dedup() {
        let mut b = board("1 1\n2 2", 1);
        b.apply(CellDeduction::star(0)).unwrap();
        assert_eq!(b.cell(0), CellState::Star);
        // Re-applying the same terminal state is a no-op
        b.apply(CellDeduction::star(0)).unwrap();
        // Conflicting terminal transition is fatal
        let err = b.apply(CellDeduction::empty(0)).unwrap_err();
        assert!(matches!(err, BoardError::InconsistentDeduction { .. }));
    }

    #[test]
    fn test_adjacent_star_rejected() {
        let mut b = board("1 1 1\n2 2 2\n3 3 3", 1);
        b.apply(CellDeduction::star(0)).unwrap();
        let err = b.apply(CellDeduction::star(4)).unwrap_err();
        assert!(matches!(err, BoardError::AdjacentStar { .. }));
    }

    #[test]
    fn test_quota_rejected() {
        let mut b = board("1 1 1\n2 2 2\n3 3 3", 1);
        b.apply(CellDeduction::star(0)).unwrap();
        // Second star in row 0 exceeds the 1-star line quota
        let err = b.apply(CellDeduction::star(2)).unwrap_err();
        assert!(matches!(err, BoardError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_fingerprint_changes_on_apply() {
        let mut b = board("1 1\n2 2", 1);
        let before = b.fingerprint();
        b.apply(CellDeduction::empty(1)).unwrap();
        assert_ne!(before, b.fingerprint());
    }

    #[test]
    fn test_completion() {
        // 2x2, one star per line: stars on the anti-diagonal violate
        // adjacency, so this family has no solution; use marks directly to
        // exercise the completion predicate on a 1-star 2x2 with regions as
        // rows — complete means quotas met and no unknowns.
        let mut b = board("1 1\n2 2", 1);
        assert!(!b.is_complete());
        b.apply(CellDeduction::star(0)).unwrap();
        b.apply(CellDeduction::empty(1)).unwrap();
        b.apply(CellDeduction::empty(2)).unwrap();
        // Cell 3 is adjacent to the star at 0, so region 2 can never meet
        // its quota; the board is terminal but not complete.
        b.apply(CellDeduction::empty(3)).unwrap();
        assert!(!b.is_complete());
    }

    #[test]
    fn test_round_trip_string() {
        let text = "1s 2\n1 2x\n";
        let b = board(text, 1);
        assert_eq!(b.to_puzzle_string(), text);
    }
}
