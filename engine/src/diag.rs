// diag.rs — Unified diagnostics model
//
// Shared diagnostic type reported by the analysis session. Errors of the
// analyses convert into error-level diagnostics; inference gaps and
// reordering hazards are reported as warnings.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::Serialize;

use crate::config::ConfigError;
use crate::error::AnalysisError;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `W0101`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    pub const UNSUPPORTED_ACTION_KIND: DiagCode = DiagCode("E0001");
    pub const UNRESOLVED_REFERENCE: DiagCode = DiagCode("E0002");
    pub const EMPTY_COMPOSITE: DiagCode = DiagCode("E0003");
    pub const INVALID_CONFIG: DiagCode = DiagCode("E0010");

    pub const NO_CODOMAIN: DiagCode = DiagCode("W0101");
    pub const CODOMAIN_WIDENED: DiagCode = DiagCode("W0102");
    pub const NON_ORTHOGONAL_UNORDERED: DiagCode = DiagCode("W0103");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Cause record ─────────────────────────────────────────────────────────

/// One link in a cause chain explaining why a diagnostic was raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseRecord {
    pub message: String,
    pub subject: Option<String>,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    /// What the diagnostic is about: a transition, a variable, a node kind.
    pub subject: Option<String>,
    pub message: String,
    pub hint: Option<String>,
    pub cause_chain: Vec<CauseRecord>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, subject, hint, or causes.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            subject: None,
            message: message.into(),
            hint: None,
            cause_chain: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a cause record to the chain.
    pub fn with_cause(mut self, message: impl Into<String>, subject: Option<String>) -> Self {
        self.cause_chain.push(CauseRecord {
            message: message.into(),
            subject,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(subject) = &self.subject {
            write!(f, "\n  --> {}", subject)?;
        }
        for cause in &self.cause_chain {
            match &cause.subject {
                Some(subject) => write!(f, "\n  cause: {} ({})", cause.message, subject)?,
                None => write!(f, "\n  cause: {}", cause.message)?,
            }
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Conversions ──────────────────────────────────────────────────────────

impl From<&AnalysisError> for Diagnostic {
    fn from(err: &AnalysisError) -> Self {
        let diag = Diagnostic::error(err.to_string());
        match err {
            AnalysisError::UnsupportedActionKind { kind, .. } => diag
                .with_code(codes::UNSUPPORTED_ACTION_KIND)
                .with_subject(kind.clone())
                .with_hint("lower the construct to assume/assign/havoc/if/loop actions first"),
            AnalysisError::UnresolvedReference(var) => diag
                .with_code(codes::UNRESOLVED_REFERENCE)
                .with_subject(var.to_string())
                .with_hint("declare the variable in the transition system"),
            AnalysisError::EmptyComposite { kind } => {
                diag.with_code(codes::EMPTY_COMPOSITE).with_subject(*kind)
            }
        }
    }
}

impl From<&ConfigError> for Diagnostic {
    fn from(err: &ConfigError) -> Self {
        Diagnostic::error(err.to_string()).with_code(codes::INVALID_CONFIG)
    }
}
