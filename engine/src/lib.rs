// actir — Action-IR analysis engine
//
// Library root. Read/write, effect, orthogonality, influence and codomain
// analyses over the flattened action trees of a statechart transition
// system, plus the session that orchestrates them.

pub mod action_query;
pub mod codomain;
pub mod config;
pub mod diag;
pub mod effect;
pub mod error;
pub mod eval;
pub mod expr;
pub mod id;
pub mod influence;
pub mod model;
pub mod ortho;
pub mod pass;
pub mod primed;
pub mod rw;
pub mod session;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult};
pub use eval::{ConstFolder, Evaluator};
pub use model::{Action, TransitionSystem};
pub use session::{AnalysisSession, AnalysisSummary, SessionResult};
