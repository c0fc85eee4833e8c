//! Finding → Hint conversion and explanation rendering.
//!
//! Techniques return `Finding` structs carrying typed reasoning steps; this
//! module is the only place that produces prose. Adding a step kind requires
//! extending the renderer exhaustively.

use crate::board::CellDeduction;
use crate::geometry::{cell_pos, Band, BandAxis};
use crate::puzzle::RegionId;

use super::types::{Hint, Technique};

/// What a technique concluded: forced cells, or a collective constraint that
/// fixes no single cell but informs downstream reasoning.
#[derive(Debug, Clone)]
pub enum Deduction {
    Cell(CellDeduction),
    /// These cells collectively hold exactly `stars_required` stars.
    ExclusiveSet {
        cells: Vec<usize>,
        stars_required: usize,
    },
}

/// One typed reasoning step. The closed set consumed by hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    CountStarsInBand {
        band: Band,
        stars_needed: usize,
    },
    CountRegionQuota {
        regions: Vec<RegionId>,
        total_stars: usize,
    },
    CountRemainingStars {
        remaining_stars: usize,
        target_region: RegionId,
    },
    IdentifyCandidateBlocks {
        blocks: Vec<usize>,
        block_count: usize,
    },
    ApplyPigeonhole {
        note: String,
    },
    FixRegionBandQuota {
        region: RegionId,
        band: Band,
        quota: usize,
    },
    AssignCageStars {
        region: RegionId,
        blocks: Vec<usize>,
    },
    EliminateOtherRegionCells {
        region: RegionId,
        cells: Vec<usize>,
    },
}

/// A technique's finding, ready to be converted to a public `Hint`.
#[derive(Debug, Clone)]
pub struct Finding {
    pub technique: Technique,
    pub deductions: Vec<Deduction>,
    pub involved_cells: Vec<usize>,
    pub steps: Vec<Step>,
}

impl Finding {
    /// Cell-level deductions only.
    pub fn cell_deductions(&self) -> Vec<CellDeduction> {
        self.deductions
            .iter()
            .filter_map(|d| match d {
                Deduction::Cell(c) => Some(*c),
                Deduction::ExclusiveSet { .. } => None,
            })
            .collect()
    }

    /// Whether the dispatcher can consume this finding (meta-only findings
    /// carry no cell deductions and do not drive the outer loop).
    pub fn is_actionable(&self) -> bool {
        !self.cell_deductions().is_empty()
    }

    /// Convert to a public hint, rendering the explanation for an n×n board.
    pub fn to_hint(&self, n: usize) -> Hint {
        Hint {
            technique: self.technique,
            deductions: self.cell_deductions(),
            involved_cells: self.involved_cells.clone(),
            explanation: render_steps(&self.steps, n),
            steps: self.steps.clone(),
        }
    }
}

// ==================== Phrasing dictionary ====================

/// "row 3" / "column 2" for a single line, 1-based.
fn line_label(axis: BandAxis, index: usize) -> String {
    match axis {
        BandAxis::Rows => format!("row {}", index + 1),
        BandAxis::Cols => format!("column {}", index + 1),
    }
}

/// "row 3" or "rows 3–5" for a band.
pub fn band_label(band: &Band) -> String {
    if band.start == band.end {
        line_label(band.axis, band.start)
    } else {
        match band.axis {
            BandAxis::Rows => format!("rows {}\u{2013}{}", band.start + 1, band.end + 1),
            BandAxis::Cols => format!("columns {}\u{2013}{}", band.start + 1, band.end + 1),
        }
    }
}

/// "region A" — region ids map to letters (1 → A).
pub fn region_label(region: RegionId) -> String {
    let letter = (b'A' + (region - 1) % 26) as char;
    format!("region {}", letter)
}

/// "C3" — letter row, 1-based column.
pub fn cell_label(cell: usize, n: usize) -> String {
    let (row, col) = cell_pos(cell, n);
    let letter = (b'A' + (row % 26) as u8) as char;
    format!("{}{}", letter, col + 1)
}

fn cell_list(cells: &[usize], n: usize) -> String {
    cells
        .iter()
        .map(|&c| cell_label(c, n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// "2×2 block 7".
pub fn block_label(block: usize) -> String {
    format!("2\u{00d7}2 block {}", block + 1)
}

fn block_list(blocks: &[usize]) -> String {
    blocks
        .iter()
        .map(|&b| block_label(b))
        .collect::<Vec<_>>()
        .join(", ")
}

fn region_list(regions: &[RegionId]) -> String {
    regions
        .iter()
        .map(|&r| region_label(r))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the step list into plain sentences, one per step.
pub fn render_steps(steps: &[Step], n: usize) -> String {
    let mut out = Vec::with_capacity(steps.len());
    for step in steps {
        let sentence = match step {
            Step::CountStarsInBand { band, stars_needed } => format!(
                "{} must still hold {} star{}.",
                capitalize(&band_label(band)),
                stars_needed,
                plural(*stars_needed)
            ),
            Step::CountRegionQuota {
                regions,
                total_stars,
            } => format!(
                "{} account{} for {} star{} there.",
                capitalize(&region_list(regions)),
                if regions.len() == 1 { "s" } else { "" },
                total_stars,
                plural(*total_stars)
            ),
            Step::CountRemainingStars {
                remaining_stars,
                target_region,
            } => format!(
                "That leaves {} star{} for {}.",
                remaining_stars,
                plural(*remaining_stars),
                region_label(*target_region)
            ),
            Step::IdentifyCandidateBlocks {
                blocks,
                block_count,
            } => format!(
                "Only {} candidate block{} remain: {}.",
                block_count,
                plural(*block_count),
                block_list(blocks)
            ),
            Step::ApplyPigeonhole { note } => format!("By pigeonhole, {}.", note),
            Step::FixRegionBandQuota {
                region,
                band,
                quota,
            } => format!(
                "{} must place exactly {} star{} in {}.",
                capitalize(&region_label(*region)),
                quota,
                plural(*quota),
                band_label(band)
            ),
            Step::AssignCageStars { region, blocks } => format!(
                "The stars of {} there are pinned to {}.",
                region_label(*region),
                block_list(blocks)
            ),
            Step::EliminateOtherRegionCells { region, cells } => format!(
                "Every other cell of {} is crossed out: {}.",
                region_label(*region),
                cell_list(cells, n)
            ),
        };
        out.push(sentence);
    }
    out.join(" ")
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::CellDeduction;

    #[test]
    fn test_labels() {
        assert_eq!(cell_label(22, 10), "C3"); // row 2, col 2 on a 10x10
        assert_eq!(region_label(1), "region A");
        assert_eq!(band_label(&Band::rows(2, 4)), "rows 3\u{2013}5");
        assert_eq!(band_label(&Band::rows(2, 2)), "row 3");
        assert_eq!(band_label(&Band::cols(0, 1)), "columns 1\u{2013}2");
        assert_eq!(block_label(6), "2\u{00d7}2 block 7");
    }

    #[test]
    fn test_render_band_count() {
        let steps = vec![
            Step::CountStarsInBand {
                band: Band::rows(0, 1),
                stars_needed: 4,
            },
            Step::CountRemainingStars {
                remaining_stars: 1,
                target_region: 2,
            },
        ];
        let text = render_steps(&steps, 10);
        assert_eq!(
            text,
            "Rows 1\u{2013}2 must still hold 4 stars. That leaves 1 star for region B."
        );
    }

    #[test]
    fn test_meta_finding_not_actionable() {
        let finding = Finding {
            technique: Technique::BandCages,
            deductions: vec![Deduction::ExclusiveSet {
                cells: vec![0, 1],
                stars_required: 1,
            }],
            involved_cells: vec![0, 1],
            steps: vec![],
        };
        assert!(!finding.is_actionable());
    }

    #[test]
    fn test_to_hint_collects_cell_deductions() {
        let finding = Finding {
            technique: Technique::CandidateDeficit,
            deductions: vec![
                Deduction::Cell(CellDeduction::star(9)),
                Deduction::ExclusiveSet {
                    cells: vec![1, 2],
                    stars_required: 1,
                },
            ],
            involved_cells: vec![9],
            steps: vec![Step::CountStarsInBand {
                band: Band::rows(0, 0),
                stars_needed: 1,
            }],
        };
        let hint = finding.to_hint(10);
        assert_eq!(hint.deductions, vec![CellDeduction::star(9)]);
        assert!(hint.explanation.starts_with("Row 1"));
    }
}
