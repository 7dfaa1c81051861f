//! The run engine: phase controller, task dispatch, and the final report.

pub mod engine;
pub mod report;

use serde::{Deserialize, Serialize};

pub use engine::Engine;
pub use report::{EvaluationReport, RunReport};

/// Phase of a run. Transitions move strictly forward; `Aborted` can be
/// entered from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planning,
    Generating,
    Evaluating,
    Done,
    Aborted,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Generating => "generating",
            Self::Evaluating => "evaluating",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
