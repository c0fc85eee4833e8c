//! Conservative entanglement search.
//!
//! Constrained units (one unfilled star, few placement candidates) that
//! share candidate cells are entangled: a probe on a shared cell ripples
//! through every unit of the group. Tentatively starring a shared cell that
//! starves any unit forces the cell Empty; tentatively crossing a shared
//! cell that leaves a unit with no placement forces it Star.

use crate::board::CellDeduction;
use crate::validator::PlacementValidator;

use super::super::explain::{Deduction, Finding, Step};
use super::super::fabric::Unit;
use super::super::types::Technique;
use super::super::Ctx;

/// A unit with one star left and a tight candidate list.
#[derive(Debug, Clone)]
struct ConstrainedUnit {
    unit: Unit,
    candidates: Vec<usize>,
}

pub(crate) fn find_heuristic_entanglement(ctx: &Ctx) -> Option<Finding> {
    let units = constrained_units(ctx);
    if units.len() < 2 {
        return None;
    }

    let mut forced_star: Vec<usize> = Vec::new();
    let mut forced_empty: Vec<usize> = Vec::new();

    // Pairs first, then triples, in enumeration order.
    for i in 0..units.len() {
        for j in i + 1..units.len() {
            probe_group(ctx, &[&units[i], &units[j]], &mut forced_star, &mut forced_empty);
        }
    }
    if forced_star.is_empty() && forced_empty.is_empty() {
        for i in 0..units.len() {
            for j in i + 1..units.len() {
                for k in j + 1..units.len() {
                    probe_group(
                        ctx,
                        &[&units[i], &units[j], &units[k]],
                        &mut forced_star,
                        &mut forced_empty,
                    );
                }
            }
        }
    }

    // Forced stars must be mutually compatible and clear of placed stars.
    let mut validator = PlacementValidator::new(ctx.board);
    forced_star.retain(|&cell| {
        if validator.can_place(cell) {
            validator.place(cell);
            true
        } else {
            false
        }
    });
    forced_empty.retain(|&cell| !forced_star.contains(&cell));

    if forced_star.is_empty() && forced_empty.is_empty() {
        return None;
    }

    let mut deductions: Vec<Deduction> = forced_star
        .iter()
        .map(|&c| Deduction::Cell(CellDeduction::star(c)))
        .collect();
    deductions.extend(
        forced_empty
            .iter()
            .map(|&c| Deduction::Cell(CellDeduction::empty(c))),
    );
    let involved: Vec<usize> = forced_star.iter().chain(forced_empty.iter()).copied().collect();
    Some(Finding {
        technique: Technique::Entanglement,
        deductions,
        involved_cells: involved,
        steps: vec![Step::ApplyPigeonhole {
            note: "entangled units sharing these cells leave only one consistent assignment"
                .into(),
        }],
    })
}

/// Rows, columns, and regions with exactly one star left and at most
/// `constrained_unit_cap` placement candidates.
fn constrained_units(ctx: &Ctx) -> Vec<ConstrainedUnit> {
    let mut out = Vec::new();
    for unit in ctx.fab.all_units(ctx.board) {
        if ctx.fab.remaining(ctx.board, unit) != 1 {
            continue;
        }
        let candidates = ctx.fab.candidates(unit).to_vec();
        if candidates.is_empty() || candidates.len() > ctx.options.constrained_unit_cap {
            continue;
        }
        out.push(ConstrainedUnit { unit, candidates });
    }
    out
}

/// Probe every cell shared by at least two units of the group.
fn probe_group(
    ctx: &Ctx,
    group: &[&ConstrainedUnit],
    forced_star: &mut Vec<usize>,
    forced_empty: &mut Vec<usize>,
) {
    let shared = shared_cells(group);
    if shared.is_empty() {
        return;
    }
    for &cell in &shared {
        if star_probe_contradicts(ctx, group, cell) && !forced_empty.contains(&cell) {
            forced_empty.push(cell);
        }
        if empty_probe_contradicts(ctx, group, cell) && !forced_star.contains(&cell) {
            forced_star.push(cell);
        }
    }
}

fn shared_cells(group: &[&ConstrainedUnit]) -> Vec<usize> {
    let mut out = Vec::new();
    for (i, unit) in group.iter().enumerate() {
        for &cell in &unit.candidates {
            let elsewhere = group
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.candidates.contains(&cell));
            if elsewhere && !out.contains(&cell) {
                out.push(cell);
            }
        }
    }
    out.sort_unstable();
    out
}

/// A tentative star at `cell` starves some unit of the group.
fn star_probe_contradicts(ctx: &Ctx, group: &[&ConstrainedUnit], cell: usize) -> bool {
    let mut validator = PlacementValidator::new(ctx.board);
    if !validator.can_place(cell) {
        return false;
    }
    validator.place(cell);
    let starved = group.iter().any(|u| {
        if unit_contains(ctx, u.unit, cell) {
            return false; // the probe satisfies this unit
        }
        !u.candidates
            .iter()
            .any(|&c| c != cell && validator.can_place(c))
    });
    validator.remove(cell);
    starved
}

/// Crossing `cell` leaves some unit of the group without any placement.
fn empty_probe_contradicts(ctx: &Ctx, group: &[&ConstrainedUnit], cell: usize) -> bool {
    let validator = PlacementValidator::new(ctx.board);
    group.iter().any(|u| {
        unit_contains(ctx, u.unit, cell)
            && !u
                .candidates
                .iter()
                .any(|&c| c != cell && validator.can_place(c))
    })
}

fn unit_contains(ctx: &Ctx, unit: Unit, cell: usize) -> bool {
    let n = ctx.fab.n;
    match unit {
        Unit::Row(r) => cell / n == r,
        Unit::Col(c) => cell % n == c,
        Unit::Region(r) => ctx.board.definition().region_of(cell) == r,
    }
}
