// session.rs — Analysis session: pass orchestration over a transition system
//
// Runs the minimal set of analysis passes for a requested terminal pass,
// collects their artifacts into an `AnalysisSummary` keyed by variable name
// and accumulates diagnostics.
//
// Preconditions: the transition system is well formed; the configuration
//   has been validated.
// Postconditions: every pass in `required_passes(terminal)` contributed to
//   the summary, or `failing_pass` names the pass that raised an error.
// Failure modes: any pass producing an error-level diagnostic aborts the
//   remaining passes.
// Dependencies: the influence pass seeds its closures from the read set the
//   read/write pass computed.
// Side effects: per-pass timing is logged at debug level.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::Serialize;

use crate::codomain::{self, Interval, Literal};
use crate::config::AnalysisConfig;
use crate::diag::{codes, Diagnostic};
use crate::effect;
use crate::error::AnalysisResult;
use crate::eval::Evaluator;
use crate::id::VarSet;
use crate::influence;
use crate::model::{Action, Assignment, TransitionKind, TransitionSystem};
use crate::ortho;
use crate::pass::{descriptor, required_passes_for, PassId, ALL_PASSES};
use crate::rw;

// ── Summary ────────────────────────────────────────────────────────────────

/// Read/write classification of the system's variables, by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariableSummary {
    pub read: Vec<String>,
    pub written: Vec<String>,
    /// Read but never written after variable initialisation.
    pub read_only: Vec<String>,
    pub written_only: Vec<String>,
}

/// An unordered composite whose children interfere, located by the child
/// indices leading to it from the transition root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeLocation {
    pub transition: TransitionKind,
    pub path: Vec<usize>,
}

impl fmt::Display for CompositeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.transition.name())?;
        for index in &self.path {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// Artifacts of the passes that ran. Passes that did not run leave their
/// field `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<VariableSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effectless_transitions: Option<Vec<TransitionKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_orthogonal: Option<Vec<CompositeLocation>>,
    /// Variables transitively influenced by each global; empty sets omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influence: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codomains: Option<BTreeMap<String, Interval>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constants: Option<BTreeMap<String, Literal>>,
}

impl AnalysisSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(vars) = &self.variables {
            writeln!(f, "read: {}", vars.read.join(", "))?;
            writeln!(f, "written: {}", vars.written.join(", "))?;
            writeln!(f, "read-only: {}", vars.read_only.join(", "))?;
            writeln!(f, "written-only: {}", vars.written_only.join(", "))?;
        }
        if let Some(kinds) = &self.effectless_transitions {
            let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
            writeln!(f, "effectless: {}", names.join(", "))?;
        }
        if let Some(locations) = &self.non_orthogonal {
            let names: Vec<String> = locations.iter().map(|l| l.to_string()).collect();
            writeln!(f, "non-orthogonal: {}", names.join(", "))?;
        }
        if let Some(influence) = &self.influence {
            writeln!(f, "influence:")?;
            for (var, influenced) in influence {
                writeln!(f, "  {} -> {}", var, influenced.join(", "))?;
            }
        }
        if let Some(codomains) = &self.codomains {
            writeln!(f, "codomains:")?;
            for (var, interval) in codomains {
                writeln!(f, "  {}: {}", var, interval)?;
            }
        }
        if let Some(constants) = &self.constants {
            writeln!(f, "constants:")?;
            for (var, value) in constants {
                writeln!(f, "  {} = {}", var, value)?;
            }
        }
        Ok(())
    }
}

/// Outcome of a session run.
#[derive(Debug, Clone, Default)]
pub struct SessionResult {
    pub summary: AnalysisSummary,
    pub diagnostics: Vec<Diagnostic>,
    /// The pass that raised an error, if the run was aborted.
    pub failing_pass: Option<PassId>,
}

impl SessionResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

// ── Session ────────────────────────────────────────────────────────────────

/// Intermediate results handed from a pass to the passes that consume it.
#[derive(Debug, Default)]
struct PassArtifacts {
    /// Variables read anywhere in the system.
    read: Option<VarSet>,
}

pub struct AnalysisSession<'a> {
    ts: &'a TransitionSystem,
    config: &'a AnalysisConfig,
    evaluator: &'a dyn Evaluator,
}

impl<'a> AnalysisSession<'a> {
    pub fn new(
        ts: &'a TransitionSystem,
        config: &'a AnalysisConfig,
        evaluator: &'a dyn Evaluator,
    ) -> Self {
        AnalysisSession {
            ts,
            config,
            evaluator,
        }
    }

    /// Run the minimal set of passes to produce `terminal`.
    pub fn run(&self, terminal: PassId) -> SessionResult {
        self.run_passes(&[terminal])
    }

    pub fn run_all(&self) -> SessionResult {
        self.run_passes(&ALL_PASSES)
    }

    /// Run the passes needed by every terminal, in dependency order.
    pub fn run_passes(&self, terminals: &[PassId]) -> SessionResult {
        let mut result = SessionResult::default();
        let mut artifacts = PassArtifacts::default();
        for pass_id in required_passes_for(terminals) {
            let t = Instant::now();
            let outcome = self.execute(pass_id, &mut artifacts, &mut result);
            let elapsed = t.elapsed();
            log::debug!(
                "actir: {} complete, {:.1}ms",
                descriptor(pass_id).name,
                elapsed.as_secs_f64() * 1000.0
            );
            if let Err(err) = outcome {
                result.diagnostics.push(Diagnostic::from(&err).with_cause(
                    format!("raised by pass '{}'", descriptor(pass_id).name),
                    None,
                ));
                result.failing_pass = Some(pass_id);
                break;
            }
        }
        result
    }

    fn execute(
        &self,
        pass_id: PassId,
        artifacts: &mut PassArtifacts,
        result: &mut SessionResult,
    ) -> AnalysisResult<()> {
        let summary = &mut result.summary;
        let diagnostics = &mut result.diagnostics;
        match pass_id {
            PassId::ReadWrite => {
                let read = rw::system_read(self.ts)?;
                summary.variables = Some(self.variable_summary(&read)?);
                artifacts.read = Some(read);
            }
            PassId::Effects => summary.effectless_transitions = Some(self.effectless()),
            PassId::Orthogonality => {
                let locations = self.non_orthogonal()?;
                for location in &locations {
                    diagnostics.push(
                        Diagnostic::warning("children of unordered composite interfere")
                            .with_code(codes::NON_ORTHOGONAL_UNORDERED)
                            .with_subject(location.to_string())
                            .with_hint("keep the children in sequential order"),
                    );
                }
                summary.non_orthogonal = Some(locations);
            }
            PassId::Influence => {
                let read = match artifacts.read.take() {
                    Some(read) => read,
                    None => rw::system_read(self.ts)?,
                };
                summary.influence = Some(self.influence(&read)?);
                artifacts.read = Some(read);
            }
            PassId::Codomain => {
                let (codomains, constants) = self.codomains(diagnostics)?;
                summary.codomains = Some(codomains);
                summary.constants = Some(constants);
            }
        }
        Ok(())
    }

    // ── Passes ──

    fn variable_summary(&self, read: &VarSet) -> AnalysisResult<VariableSummary> {
        let decls = &self.ts.decls;
        Ok(VariableSummary {
            read: decls.names(read),
            written: decls.names(&rw::system_written(self.ts)?),
            read_only: decls.names(&rw::system_read_only(self.ts)?),
            written_only: decls.names(&rw::system_written_only(self.ts)?),
        })
    }

    fn effectless(&self) -> Vec<TransitionKind> {
        TransitionKind::ALL
            .into_iter()
            .filter(|kind| effect::is_effectless(self.ts.transition(*kind), self.evaluator))
            .collect()
    }

    fn non_orthogonal(&self) -> AnalysisResult<Vec<CompositeLocation>> {
        let mut locations = Vec::new();
        for kind in TransitionKind::ALL {
            let mut path = Vec::new();
            collect_non_orthogonal(self.ts.transition(kind), kind, &mut path, &mut locations)?;
        }
        Ok(locations)
    }

    /// A global that is never read cannot influence anything, so only read
    /// globals seed a closure.
    fn influence(&self, read: &VarSet) -> AnalysisResult<BTreeMap<String, Vec<String>>> {
        let mut assignments: Vec<&Assignment> = Vec::new();
        for action in self.ts.all_actions() {
            assignments.extend(influence::collect_assignments(action)?);
        }
        let decls = &self.ts.decls;
        let mut map = BTreeMap::new();
        for decl in decls
            .iter()
            .filter(|d| d.is_global() && read.contains(&d.id))
        {
            let influenced = influence::all_influencing_variables(decl.id, &assignments);
            if !influenced.is_empty() {
                map.insert(decl.name.clone(), decls.names(&influenced));
            }
        }
        Ok(map)
    }

    fn codomains(
        &self,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> AnalysisResult<(BTreeMap<String, Interval>, BTreeMap<String, Literal>)> {
        let decls = &self.ts.decls;
        let report = codomain::infer(self.ts, self.evaluator, &self.config.envelope)?;
        for var in &report.widened {
            diagnostics.push(
                Diagnostic::warning(format!(
                    "codomain widened to the envelope [{}, {}]",
                    self.config.envelope.min, self.config.envelope.max
                ))
                .with_code(codes::CODOMAIN_WIDENED)
                .with_subject(decls.name(*var)),
            );
        }
        for var in &report.unresolved {
            diagnostics.push(
                Diagnostic::warning("no codomain could be inferred")
                    .with_code(codes::NO_CODOMAIN)
                    .with_subject(decls.name(*var))
                    .with_hint("the variable is havocked, non-constant, or copied from such a variable"),
            );
        }
        let codomains = report
            .intervals
            .iter()
            .map(|(var, interval)| (decls.name(*var), *interval))
            .collect();
        let constants = codomain::one_value_codomains(self.ts, self.evaluator)?
            .into_iter()
            .map(|(var, literal)| (decls.name(var), literal))
            .collect();
        Ok((codomains, constants))
    }
}

/// Pre-order search for unordered composites with interfering children.
fn collect_non_orthogonal(
    action: &Action,
    transition: TransitionKind,
    path: &mut Vec<usize>,
    out: &mut Vec<CompositeLocation>,
) -> AnalysisResult<()> {
    if let Action::Unordered(children) = action {
        if !ortho::children_orthogonal(children)? {
            out.push(CompositeLocation {
                transition,
                path: path.clone(),
            });
        }
    }
    let nested: Vec<&Action> = match action {
        Action::Sequential(children) | Action::Unordered(children) => children.iter().collect(),
        Action::If(if_action) => std::iter::once(if_action.then.as_ref())
            .chain(if_action.otherwise.as_deref())
            .collect(),
        Action::Loop(loop_action) => vec![loop_action.body.as_ref()],
        _ => Vec::new(),
    };
    for (index, child) in nested.into_iter().enumerate() {
        path.push(index);
        collect_non_orthogonal(child, transition, path, out)?;
        path.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagLevel;
    use crate::eval::ConstFolder;
    use crate::expr::{BinaryOp, Expr, Reference};
    use crate::id::VarId;
    use crate::model::{Declarations, VarType};
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn system() -> TransitionSystem {
        let mut decls = Declarations::new();
        let a = decls.declare_global("a", VarType::Integer);
        let b = decls.declare_global("b", VarType::Integer);
        let c = decls.declare_global("c", VarType::Integer);
        let mut ts = TransitionSystem::new(decls);
        ts.variable_init = Action::Sequential(vec![
            Action::assign_var(a, Expr::Int(0)),
            Action::assign_var(b, Expr::Int(0)),
            Action::assign_var(c, Expr::Int(0)),
        ]);
        ts.merged = Action::Unordered(vec![
            Action::assign_var(a, Expr::var(b)),
            Action::assign_var(c, Expr::binary(BinaryOp::Add, Expr::var(a), Expr::Int(1))),
        ]);
        ts
    }

    #[test]
    fn terminal_pass_limits_what_runs() {
        let ts = system();
        let config = AnalysisConfig::default();
        let session = AnalysisSession::new(&ts, &config, &ConstFolder);
        let result = session.run(PassId::Effects);
        assert!(result.summary.variables.is_none());
        assert_eq!(
            result.summary.effectless_transitions,
            Some(vec![
                TransitionKind::ConfigurationInit,
                TransitionKind::EntryEvent,
                TransitionKind::InEvent,
                TransitionKind::OutEvent,
            ])
        );
    }

    #[test]
    fn interfering_unordered_children_are_reported() {
        let ts = system();
        let config = AnalysisConfig::default();
        let result = AnalysisSession::new(&ts, &config, &ConstFolder).run(PassId::Orthogonality);
        assert!(result.summary.variables.is_none());
        assert_eq!(
            result.summary.non_orthogonal,
            Some(vec![CompositeLocation {
                transition: TransitionKind::Merged,
                path: vec![],
            }])
        );
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some(codes::NON_ORTHOGONAL_UNORDERED));
        assert!(!result.has_errors());
    }

    #[test]
    fn influence_is_keyed_by_name() {
        let ts = system();
        let config = AnalysisConfig::default();
        let result = AnalysisSession::new(&ts, &config, &ConstFolder).run(PassId::Influence);
        assert!(result.summary.variables.is_some());
        let influence = result.summary.influence.unwrap();
        assert_eq!(influence["b"], vec!["a".to_string(), "c".to_string()]);
        assert_eq!(influence["a"], vec!["c".to_string()]);
        assert!(!influence.contains_key("c"));
    }

    #[test]
    fn codomain_run_skips_read_write_pass() {
        let mut decls = Declarations::new();
        let x = decls.declare_global("x", VarType::Integer);
        let mut ts = TransitionSystem::new(decls);
        ts.merged = Action::assign_var(x, Expr::Int(3));
        let config = AnalysisConfig::default();
        let result = AnalysisSession::new(&ts, &config, &ConstFolder).run(PassId::Codomain);
        assert!(result.summary.variables.is_none());
        assert!(result.summary.influence.is_none());
        assert_eq!(
            result.summary.codomains.unwrap()["x"],
            Interval::point(3.0)
        );
    }

    #[test]
    fn unread_globals_have_no_influence_entry() {
        let mut ts = system();
        let a = VarId(0);
        let c = VarId(2);
        // c is written in two transitions and read in none
        ts.out_event = Action::assign_var(c, Expr::var(a));
        let config = AnalysisConfig::default();
        let result = AnalysisSession::new(&ts, &config, &ConstFolder).run(PassId::Influence);
        let vars = result.summary.variables.unwrap();
        assert!(!vars.read.contains(&"c".to_string()));
        assert!(!result.summary.influence.unwrap().contains_key("c"));
    }

    #[test]
    fn unlowered_node_aborts_with_error() {
        let mut ts = system();
        ts.in_event = Action::unlowered("deep_history");
        let config = AnalysisConfig::default();
        let result = AnalysisSession::new(&ts, &config, &ConstFolder).run_all();
        assert_eq!(result.failing_pass, Some(PassId::ReadWrite));
        assert!(result.has_errors());
        let err = &result.diagnostics[0];
        assert_eq!(err.level, DiagLevel::Error);
        assert_eq!(err.code, Some(codes::UNSUPPORTED_ACTION_KIND));
        assert!(result.summary.codomains.is_none());
    }

    #[test]
    fn codomain_gaps_become_warnings() {
        let mut ts = system();
        let a = VarId(0);
        ts.in_event = Action::havoc(Reference::Var(a));
        let config = AnalysisConfig::default();
        let result = AnalysisSession::new(&ts, &config, &ConstFolder).run(PassId::Codomain);
        let subjects: Vec<&str> = result
            .diagnostics
            .iter()
            .filter(|d| d.code == Some(codes::NO_CODOMAIN))
            .filter_map(|d| d.subject.as_deref())
            .collect();
        // a is havocked, c is assigned a non-constant expression
        assert_eq!(subjects, vec!["a", "c"]);
    }
}
