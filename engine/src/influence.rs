// influence.rs — Transitive influence closure over assignment edges
//
// Answers "which variables may change as a downstream consequence of the
// seed changing": forward reachability on the graph whose edges run from
// every externally read variable of an assignment to the variable it
// writes. Only direct assignment edges count; guards of conditionals and
// loops do not.
//
// Preconditions: the assignment set comes from a fully lowered tree.
// Postconditions: the result is the least fixed point (it may include the
//   seed itself when the seed is on a cycle).
// Failure modes: collecting assignments from a tree containing an
//   `Unlowered` node yields `UnsupportedActionKind`.
// Side effects: none.

use crate::error::{AnalysisError, AnalysisResult};
use crate::id::{VarId, VarSet};
use crate::model::{Action, Assignment};
use crate::rw;

/// Every assignment node in `action`, in pre-order.
pub fn collect_assignments(action: &Action) -> AnalysisResult<Vec<&Assignment>> {
    let mut assignments = Vec::new();
    let mut unsupported = None;
    action.walk(&mut |node| match node {
        Action::Assign(assignment) => assignments.push(assignment),
        Action::Unlowered(_) if unsupported.is_none() => {
            unsupported = Some(AnalysisError::unsupported(node));
        }
        _ => {}
    });
    match unsupported {
        Some(err) => Err(err),
        None => Ok(assignments),
    }
}

/// Variables reachable from `seed` along assignment edges.
pub fn all_influencing_variables(seed: VarId, assignments: &[&Assignment]) -> VarSet {
    all_influencing_variables_of_all(&VarSet::from([seed]), assignments)
}

/// Union of the closures of every seed, computed in one fixed point.
pub fn all_influencing_variables_of_all(seeds: &VarSet, assignments: &[&Assignment]) -> VarSet {
    // The read sets do not change between passes.
    let edges: Vec<(VarSet, VarId)> = assignments
        .iter()
        .map(|a| (rw::assignment_externally_read(a), rw::assignment_written(a)))
        .collect();

    let mut result = VarSet::new();
    let mut passes = 0usize;
    loop {
        passes += 1;
        let before = result.len();
        for (reads, target) in &edges {
            if reads.iter().any(|v| seeds.contains(v) || result.contains(v)) {
                result.insert(*target);
            }
        }
        if result.len() == before {
            break;
        }
    }
    log::debug!(
        "influence closure of {} seed(s): {} variable(s) after {} pass(es)",
        seeds.len(),
        result.len(),
        passes
    );
    result
}

/// Closure of `seed` over the assignments found in `action`.
pub fn influenced_in(seed: VarId, action: &Action) -> AnalysisResult<VarSet> {
    let assignments = collect_assignments(action)?;
    Ok(all_influencing_variables(seed, &assignments))
}
