//! Task and plan definitions for the conductor orchestrator.
//!
//! This module provides:
//! - `Task` struct representing a single unit of deliverable work
//! - `Priority` levels with a total scheduling rank
//! - `Plan` struct matching the JSON a planning worker emits
//! - A built-in fallback plan used when planner output cannot be parsed

use serde::{Deserialize, Serialize};

/// Run-scoped task identifier.
pub type TaskId = u32;

/// Scheduling priority. `rank` gives the tie-break order: high before
/// medium before low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank used for ordering: lower runs first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// A single planned unit of work producing one artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique id within the run
    pub id: TaskId,
    /// Short human-readable title
    pub title: String,
    /// What the implementer worker should build
    #[serde(default)]
    pub description: String,
    /// Target artifact locator, relative to the output root
    #[serde(default)]
    pub file_path: String,
    /// Ids of tasks that must complete before this one
    #[serde(default, alias = "dependencies")]
    pub depends_on: Vec<TaskId>,
    /// Scheduling priority
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    /// Create a new task with all scheduling-relevant fields.
    pub fn new(
        id: TaskId,
        title: &str,
        description: &str,
        file_path: &str,
        depends_on: Vec<TaskId>,
        priority: Priority,
    ) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: description.to_string(),
            file_path: file_path.to_string(),
            depends_on,
            priority,
        }
    }
}

/// Which parse path produced the active plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// Strict structured parse of the planner response
    #[default]
    Model,
    /// Best-effort JSON substring salvaged from the planner response
    Salvaged,
    /// Built-in fallback plan; planner output was unusable
    Fallback,
}

/// A project plan as produced by the planning worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub technology_stack: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Plan {
    /// Fixed, always-valid plan substituted when the planner cannot
    /// produce a parsable one. Forward progress beats perfect output.
    pub fn fallback() -> Self {
        Self {
            project_name: "arxiv-cs-daily".to_string(),
            technology_stack: vec!["html".into(), "css".into(), "javascript".into()],
            tasks: vec![
                Task::new(
                    1,
                    "Create sample data",
                    "Create papers.json with sample arXiv papers",
                    "data/papers.json",
                    vec![],
                    Priority::High,
                ),
                Task::new(
                    2,
                    "Create homepage",
                    "Create index.html with navigation and category links",
                    "index.html",
                    vec![1],
                    Priority::High,
                ),
                Task::new(
                    3,
                    "Add styling",
                    "Create style.css with a responsive layout",
                    "css/style.css",
                    vec![2],
                    Priority::Medium,
                ),
                Task::new(
                    4,
                    "Add page scripting",
                    "Create script.js loading papers.json into the page",
                    "js/script.js",
                    vec![2],
                    Priority::Medium,
                ),
            ],
        }
    }
}
