// error.rs — Failure taxonomy of the analysis layer
//
// Analyses are total over lowered action trees. The only failures are
// invariant violations of the input (a node kind that was never lowered, a
// reference to an undeclared variable) and structural queries on empty
// composites. "No bound found" is never an error.

use thiserror::Error;

use crate::id::VarId;
use crate::model::Action;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A node outside the lowered action set reached an analysis.
    #[error("unsupported action kind '{kind}'")]
    UnsupportedActionKind { kind: String, node: Box<Action> },

    /// A reference to a variable missing from the declaration arena.
    #[error("unresolved reference to variable {0}")]
    UnresolvedReference(VarId),

    /// A structural query needed a child but the composite has none.
    #[error("composite '{kind}' has no children")]
    EmptyComposite { kind: &'static str },
}

impl AnalysisError {
    pub(crate) fn unsupported(node: &Action) -> Self {
        AnalysisError::UnsupportedActionKind {
            kind: node.kind_name().to_string(),
            node: Box::new(node.clone()),
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
