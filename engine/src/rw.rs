// rw.rs — Read/write set analysis over action trees
//
// Computes, per action node, the variables it reads, writes, and reads from
// its environment ("externally read": reads not satisfied by the node's own
// assignments, so `x := x + 1` externally reads nothing but still reads x).
//
// Preconditions: the tree is fully lowered and every reference is resolved.
// Postconditions: results are fresh sets; repeated calls on the same tree
//   return equal sets.
// Failure modes: an `Unlowered` node anywhere in the analysed subtree
//   yields `UnsupportedActionKind`; no partial set is returned.
// Side effects: none.

use crate::error::{AnalysisError, AnalysisResult};
use crate::id::{VarId, VarSet};
use crate::model::{Action, Assignment, LocalDeclaration, TransitionSystem};

// ── Assignment primitives ───────────────────────────────────────────────────

/// The single variable written by an assignment (the array root for
/// element assignments).
pub fn assignment_written(assignment: &Assignment) -> VarId {
    assignment.lhs.accessed_var()
}

/// Variables read by an assignment: index operands of the left-hand side
/// (minus the written array itself) and everything on the right-hand side.
pub fn assignment_read(assignment: &Assignment) -> VarSet {
    let mut vars = assignment.lhs.referred_vars();
    vars.remove(&assignment_written(assignment));
    vars.extend(assignment.rhs.referred_vars());
    vars
}

/// `assignment_read` without the written variable.
pub fn assignment_externally_read(assignment: &Assignment) -> VarSet {
    let mut vars = assignment_read(assignment);
    vars.remove(&assignment_written(assignment));
    vars
}

fn declaration_read(decl: &LocalDeclaration) -> VarSet {
    decl.initializer
        .as_ref()
        .map(|init| init.referred_vars())
        .unwrap_or_default()
}

// ── Per-node analyses ───────────────────────────────────────────────────────

/// Variables read by `action`.
pub fn read(action: &Action) -> AnalysisResult<VarSet> {
    match action {
        Action::Empty | Action::Havoc(_) => Ok(VarSet::new()),
        Action::Assume(assume) => Ok(assume.condition.referred_vars()),
        Action::Assign(assignment) => Ok(assignment_read(assignment)),
        Action::Declare(decl) => Ok(declaration_read(decl)),
        Action::Sequential(children) | Action::Unordered(children) => union(children, read),
        Action::If(if_action) => {
            let mut vars = if_action.condition.referred_vars();
            vars.extend(read(&if_action.then)?);
            if let Some(otherwise) = &if_action.otherwise {
                vars.extend(read(otherwise)?);
            }
            Ok(vars)
        }
        Action::Loop(loop_action) => {
            let mut vars = loop_action.range.referred_vars();
            vars.extend(read(&loop_action.body)?);
            Ok(vars)
        }
        Action::Unlowered(_) => Err(AnalysisError::unsupported(action)),
    }
}

/// Variables written by `action`. Declaring a local is not a write.
pub fn written(action: &Action) -> AnalysisResult<VarSet> {
    match action {
        Action::Empty | Action::Assume(_) | Action::Declare(_) => Ok(VarSet::new()),
        Action::Assign(assignment) => Ok(VarSet::from([assignment_written(assignment)])),
        Action::Havoc(havoc) => Ok(VarSet::from([havoc.lhs.accessed_var()])),
        Action::Sequential(children) | Action::Unordered(children) => union(children, written),
        Action::If(if_action) => {
            let mut vars = written(&if_action.then)?;
            if let Some(otherwise) = &if_action.otherwise {
                vars.extend(written(otherwise)?);
            }
            Ok(vars)
        }
        Action::Loop(loop_action) => written(&loop_action.body),
        Action::Unlowered(_) => Err(AnalysisError::unsupported(action)),
    }
}

/// Variables `action` needs from its environment. Assignments drop their
/// own target; compound nodes recurse with this same analysis so guards and
/// range bounds are always kept.
pub fn externally_read(action: &Action) -> AnalysisResult<VarSet> {
    match action {
        Action::Assign(assignment) => Ok(assignment_externally_read(assignment)),
        Action::Empty | Action::Havoc(_) | Action::Assume(_) | Action::Declare(_) => read(action),
        Action::Sequential(children) | Action::Unordered(children) => {
            union(children, externally_read)
        }
        Action::If(if_action) => {
            let mut vars = if_action.condition.referred_vars();
            vars.extend(externally_read(&if_action.then)?);
            if let Some(otherwise) = &if_action.otherwise {
                vars.extend(externally_read(otherwise)?);
            }
            Ok(vars)
        }
        Action::Loop(loop_action) => {
            let mut vars = loop_action.range.referred_vars();
            vars.extend(externally_read(&loop_action.body)?);
            Ok(vars)
        }
        Action::Unlowered(_) => Err(AnalysisError::unsupported(action)),
    }
}

fn union(
    children: &[Action],
    analysis: fn(&Action) -> AnalysisResult<VarSet>,
) -> AnalysisResult<VarSet> {
    let mut vars = VarSet::new();
    for child in children {
        vars.extend(analysis(child)?);
    }
    Ok(vars)
}

/// Read or written.
pub fn referred(action: &Action) -> AnalysisResult<VarSet> {
    let mut vars = read(action)?;
    vars.extend(written(action)?);
    Ok(vars)
}

/// Written but never read by `action`.
pub fn written_only_of(action: &Action) -> AnalysisResult<VarSet> {
    let read_vars = read(action)?;
    Ok(written(action)?
        .into_iter()
        .filter(|v| !read_vars.contains(v))
        .collect())
}

/// Locals declared anywhere inside `action`.
pub fn locals(action: &Action) -> VarSet {
    let mut vars = VarSet::new();
    action.walk(&mut |node| {
        if let Action::Declare(decl) = node {
            vars.insert(decl.var);
        }
    });
    vars
}

pub fn written_and_local(action: &Action) -> AnalysisResult<VarSet> {
    let mut vars = written(action)?;
    vars.extend(locals(action));
    Ok(vars)
}

pub fn referred_and_local(action: &Action) -> AnalysisResult<VarSet> {
    let mut vars = referred(action)?;
    vars.extend(locals(action));
    Ok(vars)
}

/// `(read, written)` of each child of a composite, in child order. Empty
/// for non-composites.
pub fn read_and_written_of_children(action: &Action) -> AnalysisResult<Vec<(VarSet, VarSet)>> {
    action
        .composite_children()
        .unwrap_or(&[])
        .iter()
        .map(|child| Ok((read(child)?, written(child)?)))
        .collect()
}

// ── Collections ─────────────────────────────────────────────────────────────

pub fn read_all(actions: &[&Action]) -> AnalysisResult<VarSet> {
    union_refs(actions, read)
}

pub fn written_all(actions: &[&Action]) -> AnalysisResult<VarSet> {
    union_refs(actions, written)
}

pub fn externally_read_all(actions: &[&Action]) -> AnalysisResult<VarSet> {
    union_refs(actions, externally_read)
}

/// Read somewhere in `actions` and written nowhere in them.
pub fn read_only(actions: &[&Action]) -> AnalysisResult<VarSet> {
    let mut vars = read_all(actions)?;
    for action in actions {
        for var in written(action)? {
            vars.remove(&var);
        }
    }
    Ok(vars)
}

/// Written somewhere in `actions` and read nowhere in them.
pub fn written_only(actions: &[&Action]) -> AnalysisResult<VarSet> {
    let mut vars = written_all(actions)?;
    for action in actions {
        for var in read(action)? {
            vars.remove(&var);
        }
    }
    Ok(vars)
}

fn union_refs(
    actions: &[&Action],
    analysis: fn(&Action) -> AnalysisResult<VarSet>,
) -> AnalysisResult<VarSet> {
    let mut vars = VarSet::new();
    for action in actions {
        vars.extend(analysis(action)?);
    }
    Ok(vars)
}

// ── Transition systems ──────────────────────────────────────────────────────

pub fn system_read(ts: &TransitionSystem) -> AnalysisResult<VarSet> {
    read_all(&ts.all_actions())
}

pub fn system_written(ts: &TransitionSystem) -> AnalysisResult<VarSet> {
    written_all(&ts.all_actions())
}

pub fn system_externally_read(ts: &TransitionSystem) -> AnalysisResult<VarSet> {
    externally_read_all(&ts.all_actions())
}

pub fn system_written_only(ts: &TransitionSystem) -> AnalysisResult<VarSet> {
    written_only(&ts.all_actions())
}

/// Read-only variables, ignoring variable initialisation (which writes
/// every variable).
pub fn system_read_only(ts: &TransitionSystem) -> AnalysisResult<VarSet> {
    read_only(&ts.actions_after_variable_init())
}

/// Variables referenced from assume conditions, if guards and loop ranges.
pub fn variables_in_conditions(ts: &TransitionSystem) -> VarSet {
    let mut vars = VarSet::new();
    ts.walk(&mut |action| match action {
        Action::Assume(assume) => vars.extend(assume.condition.referred_vars()),
        Action::If(if_action) => vars.extend(if_action.condition.referred_vars()),
        Action::Loop(loop_action) => vars.extend(loop_action.range.referred_vars()),
        _ => {}
    });
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, Expr, IntegerRange, Reference};
    use crate::model::{Declarations, VarType};
    use pretty_assertions::assert_eq;

    fn vars() -> (Declarations, VarId, VarId, VarId) {
        let mut decls = Declarations::new();
        let x = decls.declare_global("x", VarType::Integer);
        let y = decls.declare_global("y", VarType::Integer);
        let i = decls.declare_global("i", VarType::Integer);
        (decls, x, y, i)
    }

    fn plus_one(v: VarId) -> Expr {
        Expr::binary(BinaryOp::Add, Expr::var(v), Expr::Int(1))
    }

    #[test]
    fn self_increment_reads_but_does_not_externally_read() {
        let (_, x, _, _) = vars();
        let a = Action::assign_var(x, plus_one(x));
        assert_eq!(written(&a).unwrap(), VarSet::from([x]));
        assert_eq!(read(&a).unwrap(), VarSet::from([x]));
        assert!(externally_read(&a).unwrap().is_empty());
    }

    #[test]
    fn element_assignment_reads_index_not_array() {
        let (_, x, y, i) = vars();
        let lhs = Reference::index(Reference::Var(x), Expr::var(i));
        let a = Action::assign(lhs, Expr::var(y));
        assert_eq!(written(&a).unwrap(), VarSet::from([x]));
        assert_eq!(read(&a).unwrap(), VarSet::from([y, i]));
    }

    #[test]
    fn havoc_writes_without_reading() {
        let (_, x, _, _) = vars();
        let a = Action::havoc(Reference::Var(x));
        assert_eq!(written(&a).unwrap(), VarSet::from([x]));
        assert!(read(&a).unwrap().is_empty());
    }

    #[test]
    fn declaration_reads_initializer_and_writes_nothing() {
        let (mut decls, x, _, _) = vars();
        let l = decls.declare_local("l", VarType::Integer);
        let a = Action::declare(l, Some(plus_one(x)));
        assert_eq!(read(&a).unwrap(), VarSet::from([x]));
        assert!(written(&a).unwrap().is_empty());
        assert_eq!(locals(&a), VarSet::from([l]));
        assert_eq!(referred_and_local(&a).unwrap(), VarSet::from([x, l]));
    }

    #[test]
    fn if_and_loop_keep_guard_reads() {
        let (_, x, y, i) = vars();
        let guarded = Action::if_then(
            Expr::binary(BinaryOp::Lt, Expr::var(y), Expr::Int(3)),
            Action::assign_var(x, plus_one(x)),
        );
        assert_eq!(read(&guarded).unwrap(), VarSet::from([x, y]));
        assert_eq!(externally_read(&guarded).unwrap(), VarSet::from([y]));
        assert_eq!(written(&guarded).unwrap(), VarSet::from([x]));

        let looped = Action::for_range(
            IntegerRange::half_open(Expr::Int(0), Expr::var(i)),
            guarded,
        );
        assert_eq!(read(&looped).unwrap(), VarSet::from([x, y, i]));
        assert_eq!(externally_read(&looped).unwrap(), VarSet::from([y, i]));
        assert_eq!(written(&looped).unwrap(), VarSet::from([x]));
    }

    #[test]
    fn unlowered_node_is_rejected_anywhere_in_the_tree() {
        let (_, x, _, _) = vars();
        let tree = Action::Sequential(vec![
            Action::assign_var(x, Expr::Int(1)),
            Action::unlowered("history_entry"),
        ]);
        for result in [read(&tree), written(&tree), externally_read(&tree)] {
            match result {
                Err(AnalysisError::UnsupportedActionKind { kind, node }) => {
                    assert_eq!(kind, "history_entry");
                    assert_eq!(*node, Action::unlowered("history_entry"));
                }
                other => panic!("expected UnsupportedActionKind, got {:?}", other),
            }
        }
    }

    #[test]
    fn collection_read_only_and_written_only() {
        let (_, x, y, i) = vars();
        let a = Action::assign_var(x, Expr::var(y));
        let b = Action::assign_var(i, Expr::var(x));
        assert_eq!(read_only(&[&a, &b]).unwrap(), VarSet::from([y]));
        assert_eq!(written_only(&[&a, &b]).unwrap(), VarSet::from([i]));
        assert_eq!(read_all(&[&a, &b]).unwrap(), VarSet::from([x, y]));
        assert_eq!(written_only_of(&a).unwrap(), VarSet::from([x]));
    }

    #[test]
    fn system_read_only_ignores_variable_initialisation() {
        let (decls, x, y, _) = vars();
        let mut ts = TransitionSystem::new(decls);
        ts.variable_init = Action::Sequential(vec![
            Action::assign_var(x, Expr::Int(0)),
            Action::assign_var(y, Expr::Int(0)),
        ]);
        ts.merged = Action::assign_var(x, Expr::var(y));
        assert_eq!(system_read_only(&ts).unwrap(), VarSet::from([y]));
        assert_eq!(system_written(&ts).unwrap(), VarSet::from([x, y]));
        assert!(read_only(&ts.all_actions()).unwrap().is_empty());
    }

    #[test]
    fn children_pairs_follow_child_order() {
        let (_, x, y, _) = vars();
        let tree = Action::Unordered(vec![
            Action::assign_var(x, Expr::var(y)),
            Action::assume(Expr::var(x)),
        ]);
        let pairs = read_and_written_of_children(&tree).unwrap();
        assert_eq!(
            pairs,
            vec![
                (VarSet::from([y]), VarSet::from([x])),
                (VarSet::from([x]), VarSet::new()),
            ]
        );
    }

    #[test]
    fn condition_variables_come_from_guards_only() {
        let (decls, x, y, i) = vars();
        let mut ts = TransitionSystem::new(decls);
        ts.merged = Action::Sequential(vec![
            Action::assume(Expr::var(x)),
            Action::for_range(
                IntegerRange::half_open(Expr::Int(0), Expr::var(i)),
                Action::assign_var(y, Expr::Int(1)),
            ),
        ]);
        assert_eq!(variables_in_conditions(&ts), VarSet::from([x, i]));
    }
}
