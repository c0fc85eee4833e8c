//! Puzzle definition and the text import format.
//!
//! A puzzle is an N×N grid partitioned into irregular regions, with a star
//! quota per row/column and per region. The definition is immutable for the
//! lifetime of a solve session; all mutable state lives in `BoardState`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::CellState;

/// Region identifier. Region ids are small positive integers; the text format
/// accepts digits `0..9` and canonically remaps `0` to region 10.
pub type RegionId = u8;

/// Errors produced while parsing a puzzle string or validating a definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} lines, found {found}")]
    LineCount { expected: usize, found: usize },
    #[error("line {line}: expected {expected} tokens, found {found}")]
    TokenCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}, token {token}: malformed token {text:?}")]
    BadToken {
        line: usize,
        token: usize,
        text: String,
    },
    #[error("region id {region} out of range (1..={max})")]
    RegionOutOfRange { region: u32, max: u32 },
    #[error("region map does not partition the grid: {0}")]
    InvalidRegionMap(String),
}

/// Immutable description of a puzzle: size, quotas, and the region map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleDefinition {
    size: usize,
    stars_per_line: usize,
    stars_per_region: usize,
    region_of: Vec<RegionId>,
    /// Sorted list of region ids appearing in `region_of`.
    regions: Vec<RegionId>,
}

impl PuzzleDefinition {
    /// Build a definition from a region map. Validates that the map covers
    /// exactly `size * size` cells and that every region id present maps to a
    /// non-empty cell set (the union trivially partitions the board).
    pub fn new(
        size: usize,
        stars_per_line: usize,
        stars_per_region: usize,
        region_of: Vec<RegionId>,
    ) -> Result<Self, ParseError> {
        if region_of.len() != size * size {
            return Err(ParseError::InvalidRegionMap(format!(
                "map covers {} cells, grid has {}",
                region_of.len(),
                size * size
            )));
        }
        if region_of.iter().any(|&r| r == 0) {
            return Err(ParseError::InvalidRegionMap(
                "region id 0 is reserved".into(),
            ));
        }
        let mut regions: Vec<RegionId> = region_of.to_vec();
        regions.sort_unstable();
        regions.dedup();
        Ok(Self {
            size,
            stars_per_line,
            stars_per_region,
            region_of,
            regions,
        })
    }

    /// Grid side length N.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Stars required in every row and every column.
    #[inline]
    pub fn stars_per_line(&self) -> usize {
        self.stars_per_line
    }

    /// Stars required in every region.
    #[inline]
    pub fn stars_per_region(&self) -> usize {
        self.stars_per_region
    }

    /// Region id of a cell (by linear cell id).
    #[inline]
    pub fn region_of(&self, cell: usize) -> RegionId {
        self.region_of[cell]
    }

    /// All region ids present in the map, sorted ascending.
    pub fn regions(&self) -> &[RegionId] {
        &self.regions
    }

    /// Cells belonging to a region, in row-major order.
    pub fn region_cells(&self, region: RegionId) -> Vec<usize> {
        (0..self.size * self.size)
            .filter(|&c| self.region_of[c] == region)
            .collect()
    }
}

/// Maximum region id accepted by the text format (digit 0 maps here).
const MAX_TEXT_REGION: u32 = 10;

/// Parse the text import format: N lines of N whitespace-separated tokens,
/// each token `<digit+>(s|x)?`. The digit is the region id (0 remaps to 10);
/// suffix `s` marks a star, `x` marks a cross, no suffix means unknown.
///
/// Returns the definition together with the initial cell marks.
pub fn parse_puzzle(
    text: &str,
    stars_per_line: usize,
) -> Result<(PuzzleDefinition, Vec<CellState>), ParseError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let size = lines.len();
    if size == 0 {
        return Err(ParseError::LineCount {
            expected: 1,
            found: 0,
        });
    }

    let mut region_of = Vec::with_capacity(size * size);
    let mut marks = Vec::with_capacity(size * size);

    for (li, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != size {
            return Err(ParseError::TokenCount {
                line: li + 1,
                expected: size,
                found: tokens.len(),
            });
        }
        for (ti, tok) in tokens.iter().enumerate() {
            let (region, mark) = parse_token(tok).ok_or_else(|| ParseError::BadToken {
                line: li + 1,
                token: ti + 1,
                text: tok.to_string(),
            })?;
            if region > MAX_TEXT_REGION {
                return Err(ParseError::RegionOutOfRange {
                    region,
                    max: MAX_TEXT_REGION,
                });
            }
            region_of.push(region as RegionId);
            marks.push(mark);
        }
    }

    let def = PuzzleDefinition::new(size, stars_per_line, stars_per_line, region_of)?;
    Ok((def, marks))
}

/// Split a token into (region id, initial mark). Digit 0 remaps to region 10.
fn parse_token(tok: &str) -> Option<(u32, CellState)> {
    let (digits, mark) = match tok.as_bytes().last()? {
        b's' => (&tok[..tok.len() - 1], CellState::Star),
        b'x' => (&tok[..tok.len() - 1], CellState::Empty),
        _ => (tok, CellState::Unknown),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let raw: u32 = digits.parse().ok()?;
    let region = if raw == 0 { 10 } else { raw };
    Some((region, mark))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let text = "1 1\n2 2";
        let (def, marks) = parse_puzzle(text, 1).unwrap();
        assert_eq!(def.size(), 2);
        assert_eq!(def.region_of(0), 1);
        assert_eq!(def.region_of(2), 2);
        assert_eq!(marks, vec![CellState::Unknown; 4]);
    }

    #[test]
    fn test_parse_marks() {
        let text = "1s 1\n2 2x";
        let (_, marks) = parse_puzzle(text, 1).unwrap();
        assert_eq!(marks[0], CellState::Star);
        assert_eq!(marks[1], CellState::Unknown);
        assert_eq!(marks[3], CellState::Empty);
    }

    #[test]
    fn test_zero_remaps_to_ten() {
        let text = "0 0\n1 1";
        let (def, _) = parse_puzzle(text, 1).unwrap();
        assert_eq!(def.region_of(0), 10);
        assert_eq!(def.regions(), &[1, 10]);
    }

    #[test]
    fn test_token_count_mismatch() {
        let text = "1 1\n2";
        let err = parse_puzzle(text, 1).unwrap_err();
        assert_eq!(
            err,
            ParseError::TokenCount {
                line: 2,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_bad_token() {
        let text = "1 1\n2 2y";
        assert!(matches!(
            parse_puzzle(text, 1),
            Err(ParseError::BadToken { line: 2, token: 2, .. })
        ));
    }

    #[test]
    fn test_region_cells() {
        let text = "1 2\n1 2";
        let (def, _) = parse_puzzle(text, 1).unwrap();
        assert_eq!(def.region_cells(1), vec![0, 2]);
        assert_eq!(def.region_cells(2), vec![1, 3]);
    }
}
