// model.rs — Action tree model of the flattened transition-system IR
//
// A transition system is six distinguished top-level actions over a set of
// declarations. Actions form a closed sum type; composite nodes own their
// children by value. Declarations live in an arena indexed by `VarId`, and a
// primed variable stores an explicit edge to the declaration it primes.
//
// Preconditions: trees are built by the statechart compiler with every
//   reference resolved against the declaration arena.
// Postconditions: none (data-only module plus read-only traversal helpers).
// Failure modes: declaring a primed variable over an unknown base;
//   `check_references` reports references missing from the arena.
// Side effects: none. Nothing in this crate mutates a tree after construction.

use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::expr::{Expr, IntegerRange, Reference};
use crate::id::{IdAllocator, VarId, VarSet};

// ── Declarations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarType {
    Boolean,
    Integer,
    Decimal,
}

impl VarType {
    pub fn is_numeric(self) -> bool {
        matches!(self, VarType::Integer | VarType::Decimal)
    }

    /// Value an uninitialised local of this type starts with, if numeric.
    pub fn default_numeric_value(self) -> Option<f64> {
        match self {
            VarType::Integer | VarType::Decimal => Some(0.0),
            VarType::Boolean => None,
        }
    }
}

/// Where a declaration lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// Top-level variable of the transition system.
    Global,
    /// Introduced by a `Declare` action; scoped to the enclosing subtree.
    Local,
    /// Next-state copy of `base` (itself possibly primed).
    Primed { base: VarId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub id: VarId,
    pub name: String,
    pub ty: VarType,
    pub kind: DeclKind,
    /// Measures elapsed time; set for timeout counters of timed models.
    pub clock: bool,
}

impl Declaration {
    pub fn is_local(&self) -> bool {
        self.kind == DeclKind::Local
    }

    pub fn is_global(&self) -> bool {
        !self.is_local()
    }

    /// The declaration this one primes, if any.
    pub fn primed_base(&self) -> Option<VarId> {
        match self.kind {
            DeclKind::Primed { base } => Some(base),
            _ => None,
        }
    }
}

/// Arena of all declarations of a transition system, indexed by `VarId`.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    decls: Vec<Declaration>,
    ids: IdAllocator,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_global(&mut self, name: impl Into<String>, ty: VarType) -> VarId {
        self.push(name.into(), ty, DeclKind::Global)
    }

    pub fn declare_local(&mut self, name: impl Into<String>, ty: VarType) -> VarId {
        self.push(name.into(), ty, DeclKind::Local)
    }

    /// Declare the next primed copy of `base`. The base must already exist,
    /// so prime chains cannot form cycles.
    pub fn declare_primed(&mut self, base: VarId) -> AnalysisResult<VarId> {
        let base_decl = self
            .get(base)
            .ok_or(AnalysisError::UnresolvedReference(base))?;
        let name = format!("{}'", base_decl.name);
        let ty = base_decl.ty;
        Ok(self.push(name, ty, DeclKind::Primed { base }))
    }

    fn push(&mut self, name: String, ty: VarType, kind: DeclKind) -> VarId {
        let id = self.ids.alloc_var();
        self.decls.push(Declaration {
            id,
            name,
            ty,
            kind,
            clock: false,
        });
        id
    }

    /// Declare a global clock variable.
    pub fn declare_clock(&mut self, name: impl Into<String>, ty: VarType) -> VarId {
        let id = self.declare_global(name, ty);
        if let Some(decl) = self.decls.last_mut() {
            decl.clock = true;
        }
        id
    }

    pub fn get(&self, id: VarId) -> Option<&Declaration> {
        self.decls.get(id.index())
    }

    pub fn contains(&self, id: VarId) -> bool {
        id.index() < self.decls.len()
    }

    /// Name of `id`, or its numeric form if undeclared.
    pub fn name(&self, id: VarId) -> String {
        match self.get(id) {
            Some(decl) => decl.name.clone(),
            None => id.to_string(),
        }
    }

    pub fn is_local(&self, id: VarId) -> bool {
        self.get(id).is_some_and(Declaration::is_local)
    }

    pub fn is_global(&self, id: VarId) -> bool {
        self.get(id).is_some_and(Declaration::is_global)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Names of `vars` in `VarId` order.
    pub fn names(&self, vars: &VarSet) -> Vec<String> {
        vars.iter().map(|v| self.name(*v)).collect()
    }
}

// ── Actions ─────────────────────────────────────────────────────────────────

/// Marks an assumption that encodes a system invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantKind {
    Environmental,
    Internal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssumeAction {
    pub condition: Expr,
    pub invariant: Option<InvariantKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub lhs: Reference,
    pub rhs: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Havoc {
    pub lhs: Reference,
}

/// Introduction of a local variable, optionally initialised.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDeclaration {
    pub var: VarId,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfAction {
    pub condition: Expr,
    pub then: Box<Action>,
    pub otherwise: Option<Box<Action>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopAction {
    pub range: IntegerRange,
    pub body: Box<Action>,
}

/// A front-end construct that was never lowered to action IR.
#[derive(Debug, Clone, PartialEq)]
pub struct UnloweredAction {
    pub kind: String,
}

/// A node of the action tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Empty,
    Assume(AssumeAction),
    Assign(Assignment),
    Havoc(Havoc),
    Declare(LocalDeclaration),
    /// Children execute left to right.
    Sequential(Vec<Action>),
    /// Children execute in no fixed order (parallel composition).
    Unordered(Vec<Action>),
    If(IfAction),
    Loop(LoopAction),
    Unlowered(UnloweredAction),
}

impl Action {
    // ── Construction helpers ──

    pub fn assume(condition: Expr) -> Self {
        Action::Assume(AssumeAction {
            condition,
            invariant: None,
        })
    }

    pub fn invariant(condition: Expr, kind: InvariantKind) -> Self {
        Action::Assume(AssumeAction {
            condition,
            invariant: Some(kind),
        })
    }

    pub fn assign(lhs: Reference, rhs: Expr) -> Self {
        Action::Assign(Assignment { lhs, rhs })
    }

    /// `var := rhs`
    pub fn assign_var(var: VarId, rhs: Expr) -> Self {
        Action::assign(Reference::Var(var), rhs)
    }

    pub fn havoc(lhs: Reference) -> Self {
        Action::Havoc(Havoc { lhs })
    }

    pub fn declare(var: VarId, initializer: Option<Expr>) -> Self {
        Action::Declare(LocalDeclaration { var, initializer })
    }

    pub fn if_then(condition: Expr, then: Action) -> Self {
        Action::If(IfAction {
            condition,
            then: Box::new(then),
            otherwise: None,
        })
    }

    pub fn if_else(condition: Expr, then: Action, otherwise: Action) -> Self {
        Action::If(IfAction {
            condition,
            then: Box::new(then),
            otherwise: Some(Box::new(otherwise)),
        })
    }

    pub fn for_range(range: IntegerRange, body: Action) -> Self {
        Action::Loop(LoopAction {
            range,
            body: Box::new(body),
        })
    }

    pub fn unlowered(kind: impl Into<String>) -> Self {
        Action::Unlowered(UnloweredAction { kind: kind.into() })
    }

    // ── Queries ──

    /// Short name of the node kind, used in diagnostics.
    pub fn kind_name(&self) -> &str {
        match self {
            Action::Empty => "empty",
            Action::Assume(_) => "assume",
            Action::Assign(_) => "assignment",
            Action::Havoc(_) => "havoc",
            Action::Declare(_) => "declaration",
            Action::Sequential(_) => "sequential",
            Action::Unordered(_) => "unordered",
            Action::If(_) => "if",
            Action::Loop(_) => "loop",
            Action::Unlowered(u) => &u.kind,
        }
    }

    pub fn is_empty_action(&self) -> bool {
        matches!(self, Action::Empty)
    }

    /// True for leaf nodes that perform a single step.
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Action::Empty
                | Action::Assume(_)
                | Action::Assign(_)
                | Action::Havoc(_)
                | Action::Declare(_)
        )
    }

    /// Children of a sequential or unordered composite; `None` otherwise.
    pub fn composite_children(&self) -> Option<&[Action]> {
        match self {
            Action::Sequential(children) | Action::Unordered(children) => Some(children),
            _ => None,
        }
    }

    /// Pre-order traversal over this node and every nested action.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Action)) {
        visit(self);
        match self {
            Action::Sequential(children) | Action::Unordered(children) => {
                for child in children {
                    child.walk(visit);
                }
            }
            Action::If(if_action) => {
                if_action.then.walk(visit);
                if let Some(otherwise) = &if_action.otherwise {
                    otherwise.walk(visit);
                }
            }
            Action::Loop(loop_action) => loop_action.body.walk(visit),
            Action::Empty
            | Action::Assume(_)
            | Action::Assign(_)
            | Action::Havoc(_)
            | Action::Declare(_)
            | Action::Unlowered(_) => {}
        }
    }

    /// Every variable mentioned by this subtree, including declared locals.
    pub fn mentioned_vars(&self) -> VarSet {
        let mut vars = VarSet::new();
        self.walk(&mut |action| match action {
            Action::Assume(a) => a.condition.collect_vars(&mut vars),
            Action::Assign(a) => {
                vars.extend(a.lhs.referred_vars());
                a.rhs.collect_vars(&mut vars);
            }
            Action::Havoc(h) => vars.extend(h.lhs.referred_vars()),
            Action::Declare(d) => {
                vars.insert(d.var);
                if let Some(init) = &d.initializer {
                    init.collect_vars(&mut vars);
                }
            }
            Action::If(i) => i.condition.collect_vars(&mut vars),
            Action::Loop(l) => vars.extend(l.range.referred_vars()),
            Action::Empty | Action::Sequential(_) | Action::Unordered(_) | Action::Unlowered(_) => {}
        });
        vars
    }
}

// ── Transition system ───────────────────────────────────────────────────────

/// The six distinguished transitions of a flattened statechart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    VariableInit,
    ConfigurationInit,
    EntryEvent,
    InEvent,
    OutEvent,
    Merged,
}

impl TransitionKind {
    pub const ALL: [TransitionKind; 6] = [
        TransitionKind::VariableInit,
        TransitionKind::ConfigurationInit,
        TransitionKind::EntryEvent,
        TransitionKind::InEvent,
        TransitionKind::OutEvent,
        TransitionKind::Merged,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TransitionKind::VariableInit => "variable_init",
            TransitionKind::ConfigurationInit => "configuration_init",
            TransitionKind::EntryEvent => "entry_event",
            TransitionKind::InEvent => "in_event",
            TransitionKind::OutEvent => "out_event",
            TransitionKind::Merged => "merged",
        }
    }
}

/// Flattened transition system handed over by the statechart compiler.
#[derive(Debug, Clone)]
pub struct TransitionSystem {
    pub decls: Declarations,
    pub variable_init: Action,
    pub configuration_init: Action,
    pub entry_event: Action,
    pub in_event: Action,
    pub out_event: Action,
    pub merged: Action,
}

impl TransitionSystem {
    /// A system whose transitions are all `Empty`.
    pub fn new(decls: Declarations) -> Self {
        TransitionSystem {
            decls,
            variable_init: Action::Empty,
            configuration_init: Action::Empty,
            entry_event: Action::Empty,
            in_event: Action::Empty,
            out_event: Action::Empty,
            merged: Action::Empty,
        }
    }

    pub fn transition(&self, kind: TransitionKind) -> &Action {
        match kind {
            TransitionKind::VariableInit => &self.variable_init,
            TransitionKind::ConfigurationInit => &self.configuration_init,
            TransitionKind::EntryEvent => &self.entry_event,
            TransitionKind::InEvent => &self.in_event,
            TransitionKind::OutEvent => &self.out_event,
            TransitionKind::Merged => &self.merged,
        }
    }

    /// The six transition actions in canonical order.
    pub fn all_actions(&self) -> Vec<&Action> {
        TransitionKind::ALL
            .iter()
            .map(|kind| self.transition(*kind))
            .collect()
    }

    /// Every transition action except variable initialisation.
    pub fn actions_after_variable_init(&self) -> Vec<&Action> {
        TransitionKind::ALL
            .iter()
            .filter(|kind| **kind != TransitionKind::VariableInit)
            .map(|kind| self.transition(*kind))
            .collect()
    }

    /// Fresh sequence of the non-empty variable-init, configuration-init and
    /// entry-event actions.
    pub fn initializing_action(&self) -> Action {
        let parts = [
            &self.variable_init,
            &self.configuration_init,
            &self.entry_event,
        ];
        Action::Sequential(
            parts
                .into_iter()
                .filter(|a| !a.is_empty_action())
                .cloned()
                .collect(),
        )
    }

    /// Fresh sequence of the in-event and out-event actions.
    pub fn environmental_action(&self) -> Action {
        Action::Sequential(vec![self.in_event.clone(), self.out_event.clone()])
    }

    /// Pre-order traversal over all six transitions.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Action)) {
        for action in self.all_actions() {
            action.walk(visit);
        }
    }

    /// Global variables annotated as clocks.
    pub fn clock_variables(&self) -> VarSet {
        self.decls
            .iter()
            .filter(|decl| decl.clock && decl.is_global())
            .map(|decl| decl.id)
            .collect()
    }

    pub fn is_timed(&self) -> bool {
        !self.clock_variables().is_empty()
    }

    /// Report the first reference to a variable absent from the arena.
    pub fn check_references(&self) -> AnalysisResult<()> {
        for action in self.all_actions() {
            if let Some(missing) = action
                .mentioned_vars()
                .into_iter()
                .find(|v| !self.decls.contains(*v))
            {
                return Err(AnalysisError::UnresolvedReference(missing));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primed_declaration_requires_existing_base() {
        let mut decls = Declarations::new();
        let x = decls.declare_global("x", VarType::Integer);
        let x1 = decls.declare_primed(x).unwrap();
        assert_eq!(decls.name(x1), "x'");
        assert_eq!(decls.get(x1).unwrap().primed_base(), Some(x));
        assert_eq!(
            decls.declare_primed(VarId(42)),
            Err(AnalysisError::UnresolvedReference(VarId(42)))
        );
    }

    #[test]
    fn clock_variables_make_the_system_timed() {
        let mut decls = Declarations::new();
        decls.declare_global("x", VarType::Integer);
        let untimed = TransitionSystem::new(decls.clone());
        assert!(!untimed.is_timed());

        let t = decls.declare_clock("timeout", VarType::Integer);
        decls.declare_primed(t).unwrap();
        let ts = TransitionSystem::new(decls);
        assert!(ts.is_timed());
        assert_eq!(ts.clock_variables(), VarSet::from([t]));
    }

    #[test]
    fn locals_and_globals_are_classified() {
        let mut decls = Declarations::new();
        let g = decls.declare_global("g", VarType::Integer);
        let l = decls.declare_local("l", VarType::Integer);
        let g1 = decls.declare_primed(g).unwrap();
        assert!(decls.is_global(g));
        assert!(decls.is_local(l));
        assert!(decls.is_global(g1));
    }

    #[test]
    fn walk_visits_every_nested_action_in_preorder() {
        let x = VarId(0);
        let tree = Action::Sequential(vec![
            Action::if_else(
                Expr::Bool(true),
                Action::assign_var(x, Expr::Int(1)),
                Action::Empty,
            ),
            Action::for_range(
                IntegerRange::half_open(Expr::Int(0), Expr::Int(3)),
                Action::havoc(Reference::Var(x)),
            ),
        ]);
        let mut kinds = Vec::new();
        tree.walk(&mut |a| kinds.push(a.kind_name().to_string()));
        assert_eq!(
            kinds,
            ["sequential", "if", "assignment", "empty", "loop", "havoc"]
        );
    }

    #[test]
    fn initializing_action_skips_empty_parts() {
        let mut decls = Declarations::new();
        let x = decls.declare_global("x", VarType::Integer);
        let mut ts = TransitionSystem::new(decls);
        ts.variable_init = Action::assign_var(x, Expr::Int(0));
        ts.entry_event = Action::assign_var(x, Expr::Int(1));
        match ts.initializing_action() {
            Action::Sequential(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected sequential, got {:?}", other),
        }
        assert_eq!(ts.all_actions().len(), 6);
        assert_eq!(ts.actions_after_variable_init().len(), 5);
    }

    #[test]
    fn check_references_reports_undeclared_variable() {
        let mut decls = Declarations::new();
        let x = decls.declare_global("x", VarType::Integer);
        let mut ts = TransitionSystem::new(decls);
        ts.merged = Action::assign_var(x, Expr::var(VarId(7)));
        assert_eq!(
            ts.check_references(),
            Err(AnalysisError::UnresolvedReference(VarId(7)))
        );
        ts.merged = Action::assign_var(x, Expr::Int(1));
        assert_eq!(ts.check_references(), Ok(()));
    }
}
