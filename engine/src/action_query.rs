// action_query.rs — Shared structural queries over action trees
//
// Helpers for if/else-if chains, composite slicing, the first atomic step
// of a subtree and small pattern checks used by optimizers.

use crate::error::{AnalysisError, AnalysisResult};
use crate::expr::{BinaryOp, Expr, Reference};
use crate::model::{Action, Assignment, IfAction, InvariantKind, TransitionSystem};

static EMPTY_BRANCH: Action = Action::Empty;

// ── If chains ───────────────────────────────────────────────────────────────

/// Branches of an if/else-if chain in order. A chain without a final else
/// ends with an `Empty` branch, so the result always has one more entry
/// than `conditions`.
pub fn branches(action: &IfAction) -> Vec<&Action> {
    let mut out = vec![action.then.as_ref()];
    match action.otherwise.as_deref() {
        Some(Action::If(nested)) => out.extend(branches(nested)),
        Some(otherwise) => out.push(otherwise),
        None => out.push(&EMPTY_BRANCH),
    }
    out
}

/// Guards of an if/else-if chain in order.
pub fn conditions(action: &IfAction) -> Vec<&Expr> {
    let mut out = vec![&action.condition];
    if let Some(Action::If(nested)) = action.otherwise.as_deref() {
        out.extend(conditions(nested));
    }
    out
}

/// Innermost if of an else-if chain.
pub fn last_if(action: &IfAction) -> &IfAction {
    match action.otherwise.as_deref() {
        Some(Action::If(nested)) => last_if(nested),
        _ => action,
    }
}

// ── Composites ──────────────────────────────────────────────────────────────

/// Children `from..to` of a composite; empty for non-composites or an
/// out-of-bounds range.
pub fn children_range(action: &Action, from: usize, to: usize) -> &[Action] {
    action
        .composite_children()
        .and_then(|children| children.get(from..to))
        .unwrap_or(&[])
}

pub fn children_skip_first(action: &Action) -> &[Action] {
    let len = action.composite_children().map_or(0, <[Action]>::len);
    children_range(action, 1.min(len), len)
}

/// First atomic step executed by `action`, descending into the first child
/// of composites.
pub fn first_atomic_action(action: &Action) -> AnalysisResult<&Action> {
    if action.is_atomic() {
        return Ok(action);
    }
    match action {
        Action::Sequential(children) | Action::Unordered(children) => {
            let first = children.first().ok_or(AnalysisError::EmptyComposite {
                kind: if matches!(action, Action::Sequential(_)) {
                    "sequential"
                } else {
                    "unordered"
                },
            })?;
            first_atomic_action(first)
        }
        _ => Err(AnalysisError::unsupported(action)),
    }
}

pub fn is_first_action_assume(action: &Action) -> bool {
    matches!(first_atomic_action(action), Ok(Action::Assume(_)))
}

// ── Patterns ────────────────────────────────────────────────────────────────

/// A sequence of exactly one `assume x == e` and one `x := e` (in either
/// order, possibly mixed with other node kinds), where the assignment
/// merely restates what the assumption already guarantees.
pub fn is_trivial_assignment(children: &[Action]) -> bool {
    let assumes: Vec<&Expr> = children
        .iter()
        .filter_map(|a| match a {
            Action::Assume(assume) => Some(&assume.condition),
            _ => None,
        })
        .collect();
    let assigns: Vec<&Assignment> = children
        .iter()
        .filter_map(|a| match a {
            Action::Assign(assign) => Some(assign),
            _ => None,
        })
        .collect();
    match (assumes.as_slice(), assigns.as_slice()) {
        ([condition], [assignment]) => restates(condition, assignment),
        _ => false,
    }
}

fn restates(condition: &Expr, assignment: &Assignment) -> bool {
    let Reference::Var(target) = &assignment.lhs else {
        return false;
    };
    let Expr::Binary(BinaryOp::Eq, lhs, rhs) = condition else {
        return false;
    };
    // region == state
    if lhs.as_direct_var() == Some(*target) && **rhs == assignment.rhs {
        return true;
    }
    // state == region
    rhs.as_direct_var() == Some(*target) && **lhs == assignment.rhs
}

// ── Invariants ──────────────────────────────────────────────────────────────

pub fn invariant_kind(action: &Action) -> Option<InvariantKind> {
    match action {
        Action::Assume(assume) => assume.invariant,
        _ => None,
    }
}

pub fn is_invariant(action: &Action) -> bool {
    invariant_kind(action).is_some()
}

/// True if any transition contains an invariant assumption.
pub fn has_invariants(ts: &TransitionSystem) -> bool {
    let mut found = false;
    ts.walk(&mut |action| found |= is_invariant(action));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::VarId;

    fn x() -> VarId {
        VarId(0)
    }

    fn chain() -> IfAction {
        let nested = Action::if_then(Expr::Bool(false), Action::assign_var(x(), Expr::Int(2)));
        match Action::if_else(
            Expr::Bool(true),
            Action::assign_var(x(), Expr::Int(1)),
            nested,
        ) {
            Action::If(i) => i,
            _ => unreachable!(),
        }
    }

    #[test]
    fn else_if_chain_is_flattened() {
        let chain = chain();
        let branches = branches(&chain);
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[2], &Action::Empty);
        assert_eq!(conditions(&chain), vec![&Expr::Bool(true), &Expr::Bool(false)]);
        assert_eq!(last_if(&chain).condition, Expr::Bool(false));
    }

    #[test]
    fn first_atomic_descends_into_composites() {
        let tree = Action::Sequential(vec![
            Action::Unordered(vec![Action::assume(Expr::Bool(true)), Action::Empty]),
            Action::assign_var(x(), Expr::Int(1)),
        ]);
        assert!(is_first_action_assume(&tree));
        assert_eq!(
            first_atomic_action(&Action::Sequential(vec![])),
            Err(AnalysisError::EmptyComposite { kind: "sequential" })
        );
        assert!(!is_first_action_assume(&Action::if_then(
            Expr::Bool(true),
            Action::Empty
        )));
    }

    #[test]
    fn composite_slices() {
        let tree = Action::Sequential(vec![Action::Empty, Action::assume(Expr::Bool(true))]);
        assert_eq!(children_skip_first(&tree).len(), 1);
        assert_eq!(children_range(&tree, 0, 5).len(), 0);
        assert!(children_skip_first(&Action::Empty).is_empty());
    }

    #[test]
    fn trivial_assignment_in_both_orientations() {
        let eq_lr = Expr::binary(BinaryOp::Eq, Expr::var(x()), Expr::Int(3));
        let eq_rl = Expr::binary(BinaryOp::Eq, Expr::Int(3), Expr::var(x()));
        let assign = Action::assign_var(x(), Expr::Int(3));
        assert!(is_trivial_assignment(&[Action::assume(eq_lr.clone()), assign.clone()]));
        assert!(is_trivial_assignment(&[Action::assume(eq_rl), assign]));
        assert!(!is_trivial_assignment(&[
            Action::assume(eq_lr),
            Action::assign_var(x(), Expr::Int(4)),
        ]));
    }
}
