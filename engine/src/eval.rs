// eval.rs — Expression evaluation capability consumed by the analyses
//
// The effect classifier and the codomain engine never evaluate expressions
// themselves; they ask an `Evaluator`. Anything the evaluator cannot fold is
// opaque to the analyses, never an error.
//
// `ConstFolder` is the reference implementation: it folds literals and
// operators over literals and treats every variable reference as unknown.
//
// Preconditions: none.
// Postconditions: `Some`/`true` answers are sound for every variable valuation.
// Failure modes: none (non-foldable input yields `None` / `false`).
// Side effects: none.

use crate::expr::{BinaryOp, Expr, UnaryOp};

// ── Capability ──────────────────────────────────────────────────────────────

/// Constant-evaluation services required by the analyses.
pub trait Evaluator {
    /// Integer value of `expr`, if it is statically known and integral.
    fn evaluate_integer(&self, expr: &Expr) -> Option<i64>;

    /// Numeric value of `expr`, if it is statically known.
    fn evaluate_decimal(&self, expr: &Expr) -> Option<f64>;

    /// True only if `expr` holds under every valuation.
    fn is_definitely_true(&self, expr: &Expr) -> bool;

    /// True only if `expr` fails under every valuation.
    fn is_definitely_false(&self, expr: &Expr) -> bool;

    /// True if `expr` is syntactically an integer or decimal literal.
    fn is_numeric_literal(&self, expr: &Expr) -> bool;
}

// ── Reference implementation ────────────────────────────────────────────────

/// A folded constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Const {
    Int(i64),
    Dec(f64),
    Bool(bool),
}

impl Const {
    fn as_f64(self) -> Option<f64> {
        match self {
            Const::Int(v) => Some(v as f64),
            Const::Dec(v) => Some(v),
            Const::Bool(_) => None,
        }
    }

    fn as_bool(self) -> Option<bool> {
        match self {
            Const::Bool(b) => Some(b),
            _ => None,
        }
    }
}

/// Folds closed expressions; variable references are never known.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstFolder;

impl ConstFolder {
    pub fn new() -> Self {
        ConstFolder
    }

    /// Fold `expr` to a constant, if possible.
    pub fn fold(&self, expr: &Expr) -> Option<Const> {
        match expr {
            Expr::Int(v) => Some(Const::Int(*v)),
            Expr::Dec(v) => Some(Const::Dec(*v)),
            Expr::Bool(b) => Some(Const::Bool(*b)),
            Expr::Ref(_) => None,
            Expr::Unary(op, operand) => fold_unary(*op, self.fold(operand)?),
            Expr::Binary(op, lhs, rhs) => self.fold_binary(*op, lhs, rhs),
            Expr::Ite(cond, then, otherwise) => {
                match self.fold(cond).and_then(Const::as_bool) {
                    Some(true) => self.fold(then),
                    Some(false) => self.fold(otherwise),
                    None => {
                        let t = self.fold(then)?;
                        let e = self.fold(otherwise)?;
                        (t == e).then_some(t)
                    }
                }
            }
        }
    }

    fn fold_binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<Const> {
        let l = self.fold(lhs);
        let r = self.fold(rhs);
        // Boolean connectives can be decided by one side alone.
        match op {
            BinaryOp::And => {
                let (lb, rb) = (l.and_then(Const::as_bool), r.and_then(Const::as_bool));
                return match (lb, rb) {
                    (Some(false), _) | (_, Some(false)) => Some(Const::Bool(false)),
                    (Some(true), Some(true)) => Some(Const::Bool(true)),
                    _ => None,
                };
            }
            BinaryOp::Or => {
                let (lb, rb) = (l.and_then(Const::as_bool), r.and_then(Const::as_bool));
                return match (lb, rb) {
                    (Some(true), _) | (_, Some(true)) => Some(Const::Bool(true)),
                    (Some(false), Some(false)) => Some(Const::Bool(false)),
                    _ => None,
                };
            }
            BinaryOp::Implies => {
                let (lb, rb) = (l.and_then(Const::as_bool), r.and_then(Const::as_bool));
                return match (lb, rb) {
                    (Some(false), _) | (_, Some(true)) => Some(Const::Bool(true)),
                    (Some(true), Some(false)) => Some(Const::Bool(false)),
                    _ => None,
                };
            }
            _ => {}
        }
        fold_arith(op, l?, r?)
    }
}

fn fold_unary(op: UnaryOp, value: Const) -> Option<Const> {
    match (op, value) {
        (UnaryOp::Neg, Const::Int(v)) => v.checked_neg().map(Const::Int),
        (UnaryOp::Neg, Const::Dec(v)) => Some(Const::Dec(-v)),
        (UnaryOp::Not, Const::Bool(b)) => Some(Const::Bool(!b)),
        _ => None,
    }
}

fn fold_arith(op: BinaryOp, l: Const, r: Const) -> Option<Const> {
    if let (Const::Int(a), Const::Int(b)) = (l, r) {
        return match op {
            BinaryOp::Add => a.checked_add(b).map(Const::Int),
            BinaryOp::Sub => a.checked_sub(b).map(Const::Int),
            BinaryOp::Mul => a.checked_mul(b).map(Const::Int),
            BinaryOp::Div => a.checked_div(b).map(Const::Int),
            BinaryOp::Mod => a.checked_rem(b).map(Const::Int),
            _ => compare(op, a as f64, b as f64),
        };
    }
    if let (Const::Bool(a), Const::Bool(b)) = (l, r) {
        return match op {
            BinaryOp::Eq => Some(Const::Bool(a == b)),
            BinaryOp::Neq => Some(Const::Bool(a != b)),
            _ => None,
        };
    }
    let (a, b) = (l.as_f64()?, r.as_f64()?);
    match op {
        BinaryOp::Add => Some(Const::Dec(a + b)),
        BinaryOp::Sub => Some(Const::Dec(a - b)),
        BinaryOp::Mul => Some(Const::Dec(a * b)),
        BinaryOp::Div if b != 0.0 => Some(Const::Dec(a / b)),
        BinaryOp::Div | BinaryOp::Mod => None,
        _ => compare(op, a, b),
    }
}

fn compare(op: BinaryOp, a: f64, b: f64) -> Option<Const> {
    let result = match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Neq => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => return None,
    };
    Some(Const::Bool(result))
}

impl Evaluator for ConstFolder {
    fn evaluate_integer(&self, expr: &Expr) -> Option<i64> {
        match self.fold(expr)? {
            Const::Int(v) => Some(v),
            Const::Dec(v) if v.fract() == 0.0 && v.is_finite() => Some(v as i64),
            _ => None,
        }
    }

    fn evaluate_decimal(&self, expr: &Expr) -> Option<f64> {
        self.fold(expr)?.as_f64()
    }

    fn is_definitely_true(&self, expr: &Expr) -> bool {
        self.fold(expr) == Some(Const::Bool(true))
    }

    fn is_definitely_false(&self, expr: &Expr) -> bool {
        self.fold(expr) == Some(Const::Bool(false))
    }

    fn is_numeric_literal(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::Int(_) | Expr::Dec(_))
    }
}
