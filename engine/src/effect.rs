// effect.rs — Classification of effectless action subtrees
//
// An action is effectless when executing it cannot change any observable
// state. The classifier is conservative: anything it cannot prove
// effectless (havoc, assume, declarations, unknown loop bounds with an
// effectful body, unlowered nodes) is reported as effectful. It only
// classifies; pruning is left to the caller.
//
// Preconditions: none; non-evaluable loop bounds are treated as opaque.
// Postconditions: `true` implies the subtree is a semantic no-op.
// Failure modes: none.
// Side effects: none.

use crate::eval::Evaluator;
use crate::expr::IntegerRange;
use crate::model::{Action, AssumeAction};

/// Missing or `Empty`.
pub fn is_null_or_empty(action: Option<&Action>) -> bool {
    action.map_or(true, Action::is_empty_action)
}

/// Number of iterations of `range`, if both bounds evaluate.
pub fn iteration_count(range: &IntegerRange, evaluator: &dyn Evaluator) -> Option<i64> {
    let left = evaluator.evaluate_integer(&range.left)?;
    let right = evaluator.evaluate_integer(&range.right)?;
    let start = if range.left_inclusive {
        left
    } else {
        left.checked_add(1)?
    };
    let end = if range.right_inclusive {
        right.checked_add(1)?
    } else {
        right
    };
    end.checked_sub(start)
}

pub fn is_effectless(action: &Action, evaluator: &dyn Evaluator) -> bool {
    match action {
        Action::Empty => true,
        Action::Assign(assignment) => assignment.rhs.is_reference_to(&assignment.lhs),
        Action::If(if_action) => {
            is_effectless(&if_action.then, evaluator)
                && if_action
                    .otherwise
                    .as_deref()
                    .map_or(true, |otherwise| is_effectless(otherwise, evaluator))
        }
        Action::Loop(loop_action) => {
            if iteration_count(&loop_action.range, evaluator).is_some_and(|n| n <= 0) {
                return true;
            }
            is_effectless(&loop_action.body, evaluator)
        }
        Action::Sequential(children) | Action::Unordered(children) => {
            children.iter().all(|child| is_effectless(child, evaluator))
        }
        Action::Assume(_) | Action::Havoc(_) | Action::Declare(_) | Action::Unlowered(_) => false,
    }
}

/// `is_effectless` lifted to an optional action; a missing action is a no-op.
pub fn is_effectless_opt(action: Option<&Action>, evaluator: &dyn Evaluator) -> bool {
    action.map_or(true, |a| is_effectless(a, evaluator))
}

pub fn is_definitely_true_assume(assume: &AssumeAction, evaluator: &dyn Evaluator) -> bool {
    evaluator.is_definitely_true(&assume.condition)
}

pub fn is_definitely_false_assume(assume: &AssumeAction, evaluator: &dyn Evaluator) -> bool {
    evaluator.is_definitely_false(&assume.condition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::ConstFolder;
    use crate::expr::{BinaryOp, Expr, Reference};
    use crate::id::VarId;
    use test_log::test;

    const X: VarId = VarId(0);
    const N: VarId = VarId(1);

    fn bump() -> Action {
        Action::assign_var(X, Expr::binary(BinaryOp::Add, Expr::var(X), Expr::Int(1)))
    }

    #[test]
    fn empty_and_self_assignment_are_effectless() {
        let ev = ConstFolder;
        assert!(is_effectless(&Action::Empty, &ev));
        assert!(is_effectless(
            &Action::Sequential(vec![Action::Empty, Action::Empty]),
            &ev
        ));
        assert!(is_effectless(&Action::assign_var(X, Expr::var(X)), &ev));
        assert!(!is_effectless(&bump(), &ev));
        assert!(is_null_or_empty(None));
        assert!(is_effectless_opt(None, &ev));
    }

    #[test]
    fn element_self_assignment_is_effectless() {
        let r = Reference::index(Reference::Var(X), Expr::Int(2));
        let a = Action::assign(r.clone(), Expr::Ref(r));
        assert!(is_effectless(&a, &ConstFolder));
    }

    #[test]
    fn if_requires_both_branches() {
        let ev = ConstFolder;
        assert!(is_effectless(
            &Action::if_then(Expr::var(N), Action::Empty),
            &ev
        ));
        assert!(!is_effectless(
            &Action::if_else(Expr::var(N), Action::Empty, bump()),
            &ev
        ));
    }

    #[test]
    fn loop_with_non_positive_count_is_effectless() {
        let ev = ConstFolder;
        let empty_range = IntegerRange::half_open(Expr::Int(5), Expr::Int(5));
        assert_eq!(iteration_count(&empty_range, &ev), Some(0));
        assert!(is_effectless(&Action::for_range(empty_range, bump()), &ev));

        let closed = IntegerRange::closed(Expr::Int(5), Expr::Int(5));
        assert_eq!(iteration_count(&closed, &ev), Some(1));
        assert!(!is_effectless(&Action::for_range(closed, bump()), &ev));
    }

    #[test]
    fn loop_with_unknown_bound_falls_back_to_body() {
        let ev = ConstFolder;
        let range = IntegerRange::half_open(Expr::Int(0), Expr::var(N));
        assert_eq!(iteration_count(&range, &ev), None);
        assert!(!is_effectless(&Action::for_range(range.clone(), bump()), &ev));
        assert!(is_effectless(&Action::for_range(range, Action::Empty), &ev));
    }

    #[test]
    fn conservative_default_for_other_kinds() {
        let ev = ConstFolder;
        assert!(!is_effectless(&Action::assume(Expr::Bool(true)), &ev));
        assert!(!is_effectless(&Action::havoc(Reference::Var(X)), &ev));
        assert!(!is_effectless(&Action::unlowered("choice"), &ev));
    }

    #[test]
    fn definite_assumptions() {
        let ev = ConstFolder;
        let t = AssumeAction {
            condition: Expr::binary(BinaryOp::Lt, Expr::Int(1), Expr::Int(2)),
            invariant: None,
        };
        assert!(is_definitely_true_assume(&t, &ev));
        assert!(!is_definitely_false_assume(&t, &ev));
    }
}
