// codomain.rs — Numeric value-range inference for bounded encodings
//
// Infers a sound [min, max] interval per variable from the assignments of a
// whole transition system:
//
//   1. partition every direct-variable assignment, havoc and local
//      declaration into literal, copy and opaque groups;
//   2. precise pass over variables that only ever receive literals;
//   3. widen intervals that leave the configured envelope;
//   4. propagate intervals along copy edges to a fixed point.
//
// Preconditions: every referenced variable is declared in `ts.decls`.
// Postconditions: a variable absent from the result has no inferable bound;
//   every interval contains every literal observed for its variable.
// Failure modes: `UnsupportedActionKind` on unlowered nodes,
//   `UnresolvedReference` for assignments to undeclared variables.
// Side effects: none.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::eval::Evaluator;
use crate::expr::{Expr, Reference};
use crate::id::{VarId, VarSet};
use crate::model::{Action, Declarations, TransitionSystem, VarType};

// ── Intervals ───────────────────────────────────────────────────────────────

/// Closed numeric interval; `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn point(value: f64) -> Self {
        Interval {
            min: value,
            max: value,
        }
    }

    /// Smallest interval containing both.
    pub fn hull(self, other: Interval) -> Self {
        Interval {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn contains(self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn is_point(self) -> bool {
        self.min == self.max
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Integer range of the target encoding. Intervals leaving it are widened
/// to cover it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    pub min: i64,
    pub max: i64,
}

impl Envelope {
    pub const fn signed_16bit() -> Self {
        Envelope {
            min: i16::MIN as i64,
            max: i16::MAX as i64,
        }
    }

    pub fn as_interval(self) -> Interval {
        Interval {
            min: self.min as f64,
            max: self.max as f64,
        }
    }

    pub fn is_exceeded_by(self, interval: Interval) -> bool {
        interval.min < self.min as f64 || interval.max > self.max as f64
    }

    /// `interval` unchanged if it fits, otherwise its hull with the envelope.
    pub fn widen(self, interval: Interval) -> Interval {
        if self.is_exceeded_by(interval) {
            interval.hull(self.as_interval())
        } else {
            interval
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope::signed_16bit()
    }
}

/// A constant value typed by its variable's declaration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Dec(f64),
}

impl Literal {
    /// `None` for non-numeric types and non-integral integer values.
    pub fn of(ty: VarType, value: f64) -> Option<Self> {
        match ty {
            VarType::Integer if value.fract() == 0.0 => Some(Literal::Int(value as i64)),
            VarType::Decimal => Some(Literal::Dec(value)),
            VarType::Integer | VarType::Boolean => None,
        }
    }

    pub fn as_expr(self) -> Expr {
        match self {
            Literal::Int(v) => Expr::Int(v),
            Literal::Dec(v) => Expr::Dec(v),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Dec(v) => write!(f, "{}", v),
        }
    }
}

// ── Assignment partition ────────────────────────────────────────────────────

/// Every variable the system assigns, by the shape of its assignments.
/// A variable may appear in both `literals` and `copies`; opaque variables
/// are excluded from resolution even if they also appear elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentGroups {
    /// Values of literal (or foldable) right-hand sides.
    pub literals: BTreeMap<VarId, Vec<f64>>,
    /// Sources of `v := w` assignments, self-copies excluded.
    pub copies: BTreeMap<VarId, VarSet>,
    /// Havocked, non-foldable, or non-numeric targets.
    pub opaque: VarSet,
}

impl AssignmentGroups {
    /// Variables only ever assigned literal values.
    pub fn literal_only(&self) -> impl Iterator<Item = (VarId, &[f64])> + '_ {
        self.literals
            .iter()
            .filter(|(var, _)| !self.copies.contains_key(var) && !self.opaque.contains(var))
            .map(|(var, values)| (*var, values.as_slice()))
    }

    /// Every variable appearing in any group.
    pub fn assigned(&self) -> VarSet {
        self.literals
            .keys()
            .chain(self.copies.keys())
            .chain(self.opaque.iter())
            .copied()
            .collect()
    }

    fn record(
        &mut self,
        action: &Action,
        decls: &Declarations,
        evaluator: &dyn Evaluator,
    ) -> AnalysisResult<()> {
        match action {
            Action::Assign(assignment) => {
                // Element assignments do not bound the whole variable.
                let Reference::Var(var) = &assignment.lhs else {
                    return Ok(());
                };
                let ty = var_type(decls, *var)?;
                if let Some(value) = literal_value(evaluator, ty, &assignment.rhs) {
                    self.literals.entry(*var).or_default().push(value);
                } else if let Some(source) = assignment.rhs.as_direct_var() {
                    if source != *var {
                        self.copies.entry(*var).or_default().insert(source);
                    }
                } else {
                    self.opaque.insert(*var);
                }
            }
            Action::Havoc(havoc) => {
                if let Reference::Var(var) = &havoc.lhs {
                    self.opaque.insert(*var);
                }
            }
            Action::Declare(decl) => {
                let ty = var_type(decls, decl.var)?;
                let value = match &decl.initializer {
                    Some(init) if ty.is_numeric() => {
                        evaluator.evaluate_decimal(init).filter(|v| v.is_finite())
                    }
                    Some(_) => None,
                    None => ty.default_numeric_value(),
                };
                match value {
                    Some(value) => self.literals.entry(decl.var).or_default().push(value),
                    None => {
                        self.opaque.insert(decl.var);
                    }
                }
            }
            Action::Unlowered(_) => return Err(AnalysisError::unsupported(action)),
            Action::Empty
            | Action::Assume(_)
            | Action::Sequential(_)
            | Action::Unordered(_)
            | Action::If(_)
            | Action::Loop(_) => {}
        }
        Ok(())
    }

    /// Interval of a copy target, once every source is resolved.
    fn resolve_copy(
        &self,
        var: VarId,
        sources: &VarSet,
        resolved: &BTreeMap<VarId, Interval>,
    ) -> Option<Interval> {
        let mut hull: Option<Interval> = None;
        for source in sources {
            let interval = *resolved.get(source)?;
            hull = Some(hull.map_or(interval, |h| h.hull(interval)));
        }
        for value in self.literals.get(&var).into_iter().flatten() {
            let point = Interval::point(*value);
            hull = Some(hull.map_or(point, |h| h.hull(point)));
        }
        hull
    }
}

fn var_type(decls: &Declarations, var: VarId) -> AnalysisResult<VarType> {
    decls
        .get(var)
        .map(|decl| decl.ty)
        .ok_or(AnalysisError::UnresolvedReference(var))
}

/// Numeric value of `rhs`: any numeric literal, or a foldable expression
/// assigned to a numeric variable. Non-finite values have no interval.
fn literal_value(evaluator: &dyn Evaluator, ty: VarType, rhs: &Expr) -> Option<f64> {
    if evaluator.is_numeric_literal(rhs) || ty.is_numeric() {
        evaluator.evaluate_decimal(rhs).filter(|v| v.is_finite())
    } else {
        None
    }
}

/// Partition the assignments of every transition of `ts`.
pub fn assignment_groups(
    ts: &TransitionSystem,
    evaluator: &dyn Evaluator,
) -> AnalysisResult<AssignmentGroups> {
    let mut groups = AssignmentGroups::default();
    let mut failure = None;
    ts.walk(&mut |action| {
        if failure.is_none() {
            if let Err(err) = groups.record(action, &ts.decls, evaluator) {
                failure = Some(err);
            }
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(groups),
    }
}

// ── Inference ───────────────────────────────────────────────────────────────

/// Full inference result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodomainReport {
    pub intervals: BTreeMap<VarId, Interval>,
    /// Variables whose interval was widened to the envelope.
    pub widened: VarSet,
    /// Assigned variables that received no interval.
    pub unresolved: VarSet,
}

fn precise_intervals(groups: &AssignmentGroups) -> BTreeMap<VarId, Interval> {
    groups
        .literal_only()
        .filter_map(|(var, values)| {
            let (first, rest) = values.split_first()?;
            let interval = rest
                .iter()
                .fold(Interval::point(*first), |acc, v| acc.hull(Interval::point(*v)));
            Some((var, interval))
        })
        .collect()
}

/// Run all inference steps and keep track of what was widened or left out.
pub fn infer(
    ts: &TransitionSystem,
    evaluator: &dyn Evaluator,
    envelope: &Envelope,
) -> AnalysisResult<CodomainReport> {
    let groups = assignment_groups(ts, evaluator)?;
    let mut report = CodomainReport {
        intervals: precise_intervals(&groups),
        ..CodomainReport::default()
    };

    for (var, interval) in report.intervals.iter_mut() {
        if envelope.is_exceeded_by(*interval) {
            *interval = envelope.widen(*interval);
            report.widened.insert(*var);
        }
    }

    let mut pending: Vec<(VarId, &VarSet)> = groups
        .copies
        .iter()
        .filter(|(var, _)| !groups.opaque.contains(var))
        .map(|(var, sources)| (*var, sources))
        .collect();
    let mut rounds = 0usize;
    loop {
        rounds += 1;
        let before = pending.len();
        let intervals = &mut report.intervals;
        let widened = &mut report.widened;
        pending.retain(|(var, sources)| {
            let Some(hull) = groups.resolve_copy(*var, sources, intervals) else {
                return true;
            };
            let interval = envelope.widen(hull);
            if interval != hull {
                widened.insert(*var);
            }
            log::trace!("copy target {} resolved to {}", var, interval);
            intervals.insert(*var, interval);
            false
        });
        if pending.len() == before {
            break;
        }
    }
    log::debug!(
        "codomain inference: {} interval(s), {} unresolved copy target(s), {} propagation round(s)",
        report.intervals.len(),
        pending.len(),
        rounds
    );

    report.unresolved = groups
        .assigned()
        .into_iter()
        .filter(|var| !report.intervals.contains_key(var))
        .collect();
    Ok(report)
}

/// Interval of every variable with an inferable bound.
pub fn codomains(
    ts: &TransitionSystem,
    evaluator: &dyn Evaluator,
    envelope: &Envelope,
) -> AnalysisResult<BTreeMap<VarId, Interval>> {
    infer(ts, evaluator, envelope).map(|report| report.intervals)
}

/// Variables that only ever receive one and the same literal value.
/// Derived from the precise pass alone, so copies never contribute.
pub fn one_value_codomains(
    ts: &TransitionSystem,
    evaluator: &dyn Evaluator,
) -> AnalysisResult<BTreeMap<VarId, Literal>> {
    let groups = assignment_groups(ts, evaluator)?;
    let mut constants = BTreeMap::new();
    for (var, interval) in precise_intervals(&groups) {
        if !interval.is_point() {
            continue;
        }
        if let Some(literal) = Literal::of(var_type(&ts.decls, var)?, interval.min) {
            constants.insert(var, literal);
        }
    }
    Ok(constants)
}
