//! Typed error hierarchy for the conductor orchestrator.
//!
//! Two top-level enums cover the two failure domains:
//! - `GraphError` — structural task-graph failures, fatal before execution
//! - `WorkerError` — per-task execution failures, recoverable at run level
//!
//! Tool failures are deliberately *not* errors: they are structured
//! `ToolResult` values fed back into worker memory so the model can
//! self-correct.

use thiserror::Error;

use crate::task::TaskId;

/// Structural errors detected while building the task graph.
///
/// Any of these aborts the run before a single task reaches `Running`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Duplicate task id: {0}")]
    DuplicateId(TaskId),

    #[error("Task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: TaskId, dependency: TaskId },

    #[error("Cycle detected in task dependencies. Involved tasks: {tasks:?}")]
    CyclicDependency { tasks: Vec<TaskId> },
}

/// Errors from driving a single worker through its execution loop.
///
/// These are local to one task: the engine marks the task failed and
/// continues with the remaining graph.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Provider transport error: {0}")]
    Transport(String),

    #[error("Tool-call budget exhausted after {iterations} iterations with no artifact")]
    IterationBudgetExceeded { iterations: u32 },

    #[error("Worker produced no artifact and no content could be salvaged")]
    NoArtifact,

    #[error("Failed to write salvaged artifact: {0}")]
    ArtifactWrite(String),
}

impl WorkerError {
    /// Short stable kind label used in task records and the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::IterationBudgetExceeded { .. } => "iteration_budget_exceeded",
            Self::NoArtifact => "no_artifact",
            Self::ArtifactWrite(_) => "artifact_write",
        }
    }
}
