// ortho.rs — Orthogonality of sibling actions
//
// Siblings are orthogonal when no child writes a variable another child
// reads (from its environment) or writes. Orthogonal children commute, so an
// unordered composite over them may be reordered, interleaved or merged.
// Any conflict means the caller must keep the sequential order.
//
// Preconditions: children are fully lowered.
// Postconditions: `Ok(true)` only if no conflicting pair exists.
// Failure modes: `UnsupportedActionKind` from the read/write analysis.
// Side effects: none.

use crate::error::AnalysisResult;
use crate::id::VarSet;
use crate::model::Action;
use crate::rw;

/// Orthogonality of the children of a sequential or unordered composite.
/// Any other action has no siblings and is trivially orthogonal.
pub fn are_orthogonal(action: &Action) -> AnalysisResult<bool> {
    match action.composite_children() {
        Some(children) => children_orthogonal(children),
        None => Ok(true),
    }
}

/// Pairwise check in child order, stopping at the first conflict.
pub fn children_orthogonal(children: &[Action]) -> AnalysisResult<bool> {
    // (written, read \ written) per visited child
    let mut visited: Vec<(VarSet, VarSet)> = Vec::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        let written = rw::written(child)?;
        let read: VarSet = rw::read(child)?.difference(&written).copied().collect();

        if let Some(j) = visited
            .iter()
            .position(|(prev_written, prev_read)| conflicts(&written, &read, prev_written, prev_read))
        {
            log::trace!("children {} and {} interfere", j, i);
            return Ok(false);
        }
        visited.push((written, read));
    }
    Ok(true)
}

fn conflicts(written: &VarSet, read: &VarSet, prev_written: &VarSet, prev_read: &VarSet) -> bool {
    !written.is_disjoint(prev_read)
        || !written.is_disjoint(prev_written)
        || !read.is_disjoint(prev_written)
}
