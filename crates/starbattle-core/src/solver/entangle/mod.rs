//! Entanglement pattern engine: spec loading, canonical matching under the
//! D4 symmetry group, and the conservative constrained-unit search.

pub mod heuristic;
pub mod loader;
pub mod matcher;
pub mod symmetry;

use crate::board::CellDeduction;
use crate::geometry::cell_pos;

use super::explain::{Deduction, Finding, Step};
use super::types::Technique;
use super::Ctx;
use loader::{FeatureEvaluator, SpecLibrary};

/// Entanglement technique entry: canonical patterns first, then the
/// conservative heuristic path.
pub(crate) fn find_entanglement(
    ctx: &Ctx,
    library: &SpecLibrary,
    evaluator: &dyn FeatureEvaluator,
) -> Option<Finding> {
    if let Some(f) = find_canonical(ctx, library, evaluator) {
        return Some(f);
    }
    heuristic::find_heuristic_entanglement(ctx)
}

fn find_canonical(
    ctx: &Ctx,
    library: &SpecLibrary,
    evaluator: &dyn FeatureEvaluator,
) -> Option<Finding> {
    let n = ctx.fab.n;
    let stars: Vec<(usize, usize)> = ctx.fab.stars.iter().map(|&c| cell_pos(c, n)).collect();
    if stars.is_empty() {
        return None;
    }
    for spec in library.for_board(n, ctx.fab.k, stars.len()) {
        let outcome = matcher::match_spec(ctx.board, spec, &stars, evaluator);
        if outcome.forced_empty.is_empty() && outcome.forced_star.is_empty() {
            continue;
        }
        let mut deductions: Vec<Deduction> = outcome
            .forced_star
            .iter()
            .map(|&c| Deduction::Cell(CellDeduction::star(c)))
            .collect();
        deductions.extend(
            outcome
                .forced_empty
                .iter()
                .map(|&c| Deduction::Cell(CellDeduction::empty(c))),
        );
        let involved: Vec<usize> = outcome
            .forced_star
            .iter()
            .chain(outcome.forced_empty.iter())
            .copied()
            .collect();
        let mut fired = outcome.fired.clone();
        fired.sort_unstable();
        fired.dedup();
        return Some(Finding {
            technique: Technique::Entanglement,
            deductions,
            involved_cells: involved,
            steps: vec![Step::ApplyPigeonhole {
                note: format!(
                    "the placed stars match entanglement pattern{} {}",
                    if fired.len() == 1 { "" } else { "s" },
                    fired.join(", ")
                ),
            }],
        });
    }
    None
}
