// expr.rs — Expressions and references embedded in action nodes
//
// The analyses only need two things from expressions: the set of variables
// they mention, and structural equality (for self-assignment detection).
// Evaluation is delegated to an `Evaluator` (see eval.rs).
//
// Preconditions: references are already resolved to `VarId`s.
// Postconditions: none (data + pure queries).
// Failure modes: none.
// Side effects: none.

use crate::id::{VarId, VarSet};

// ── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Implies,
}

// ── Reference ───────────────────────────────────────────────────────────────

/// Left-hand side of an assignment or havoc: a variable, or an element of an
/// array variable addressed by index expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Var(VarId),
    Index {
        array: Box<Reference>,
        index: Box<Expr>,
    },
}

impl Reference {
    pub fn index(array: Reference, index: Expr) -> Self {
        Reference::Index {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    /// The declaration actually written through this reference. For
    /// `a[i][j]` this is `a`, never `i` or `j`.
    pub fn accessed_var(&self) -> VarId {
        match self {
            Reference::Var(id) => *id,
            Reference::Index { array, .. } => array.accessed_var(),
        }
    }

    /// True for a plain variable reference (no indexing).
    pub fn is_direct(&self) -> bool {
        matches!(self, Reference::Var(_))
    }

    /// All variables mentioned by the reference, including index operands.
    pub fn referred_vars(&self) -> VarSet {
        let mut vars = VarSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, out: &mut VarSet) {
        match self {
            Reference::Var(id) => {
                out.insert(*id);
            }
            Reference::Index { array, index } => {
                array.collect_vars(out);
                index.collect_vars(out);
            }
        }
    }
}

// ── Expression ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Dec(f64),
    Bool(bool),
    Ref(Reference),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(id: VarId) -> Self {
        Expr::Ref(Reference::Var(id))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn ite(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Ite(Box::new(cond), Box::new(then), Box::new(otherwise))
    }

    /// `Some(v)` if the expression is exactly a direct variable reference.
    pub fn as_direct_var(&self) -> Option<VarId> {
        match self {
            Expr::Ref(Reference::Var(id)) => Some(*id),
            _ => None,
        }
    }

    /// True if this expression is the same reference as `lhs`.
    pub fn is_reference_to(&self, lhs: &Reference) -> bool {
        matches!(self, Expr::Ref(r) if r == lhs)
    }

    /// All variables referenced anywhere in the expression.
    pub fn referred_vars(&self) -> VarSet {
        let mut vars = VarSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    pub(crate) fn collect_vars(&self, out: &mut VarSet) {
        match self {
            Expr::Int(_) | Expr::Dec(_) | Expr::Bool(_) => {}
            Expr::Ref(r) => r.collect_vars(out),
            Expr::Unary(_, e) => e.collect_vars(out),
            Expr::Binary(_, l, r) => {
                l.collect_vars(out);
                r.collect_vars(out);
            }
            Expr::Ite(c, t, e) => {
                c.collect_vars(out);
                t.collect_vars(out);
                e.collect_vars(out);
            }
        }
    }
}

// ── Integer range ───────────────────────────────────────────────────────────

/// Iteration range of a loop action: `left .. right` with per-end
/// inclusiveness. The common form is half-open `[left, right)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegerRange {
    pub left: Expr,
    pub right: Expr,
    pub left_inclusive: bool,
    pub right_inclusive: bool,
}

impl IntegerRange {
    /// Half-open range `[left, right)`.
    pub fn half_open(left: Expr, right: Expr) -> Self {
        IntegerRange {
            left,
            right,
            left_inclusive: true,
            right_inclusive: false,
        }
    }

    /// Closed range `[left, right]`.
    pub fn closed(left: Expr, right: Expr) -> Self {
        IntegerRange {
            left,
            right,
            left_inclusive: true,
            right_inclusive: true,
        }
    }

    /// Variables referenced by either bound.
    pub fn referred_vars(&self) -> VarSet {
        let mut vars = VarSet::new();
        self.left.collect_vars(&mut vars);
        self.right.collect_vars(&mut vars);
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessed_var_is_array_root() {
        let a = VarId(0);
        let i = VarId(1);
        let r = Reference::index(Reference::Var(a), Expr::var(i));
        assert_eq!(r.accessed_var(), a);
        assert!(!r.is_direct());
        assert_eq!(r.referred_vars(), VarSet::from([a, i]));
    }

    #[test]
    fn expression_vars_cover_all_operands() {
        let (x, y, z) = (VarId(0), VarId(1), VarId(2));
        let e = Expr::ite(
            Expr::binary(BinaryOp::Lt, Expr::var(x), Expr::Int(3)),
            Expr::var(y),
            Expr::unary(UnaryOp::Neg, Expr::var(z)),
        );
        assert_eq!(e.referred_vars(), VarSet::from([x, y, z]));
        assert!(Expr::Int(4).referred_vars().is_empty());
    }

    #[test]
    fn self_reference_detection() {
        let x = VarId(0);
        assert!(Expr::var(x).is_reference_to(&Reference::Var(x)));
        assert!(!Expr::var(x).is_reference_to(&Reference::Var(VarId(1))));
        assert_eq!(Expr::var(x).as_direct_var(), Some(x));
    }
}
