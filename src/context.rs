//! Shared run progress: the engine's single-writer record of what has
//! completed, and the immutable snapshots workers see.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::task::{Plan, TaskId};

/// Result record for one attempted task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub title: String,
    pub success: bool,
    #[serde(default)]
    pub files_created: Vec<String>,
    pub message: String,
    /// Proximate error kind for failed tasks (`WorkerError::kind`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl TaskRecord {
    pub fn success(task_id: TaskId, title: &str, files_created: Vec<String>) -> Self {
        Self {
            task_id,
            title: title.to_string(),
            success: true,
            message: format!("Task '{title}' completed"),
            files_created,
            error_kind: None,
        }
    }

    pub fn failure(task_id: TaskId, title: &str, error_kind: &str, message: &str) -> Self {
        Self {
            task_id,
            title: title.to_string(),
            success: false,
            message: message.to_string(),
            files_created: Vec::new(),
            error_kind: Some(error_kind.to_string()),
        }
    }
}

/// The evolving shared memory of a run. Append-mostly; owned exclusively
/// by the engine. Workers only ever see `ContextSnapshot`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunContext {
    /// Completed task ids, ordered by completion time
    pub completed: Vec<TaskId>,
    /// Artifact locators produced so far, in creation order
    pub created_files: Vec<String>,
    /// Per-task result records, attempted tasks only
    pub records: BTreeMap<TaskId, TaskRecord>,
}

impl RunContext {
    /// Record a task outcome. Completion order is preserved; files are
    /// appended without deduplication across tasks.
    pub fn record(&mut self, record: TaskRecord) {
        if record.success {
            self.completed.push(record.task_id);
            self.created_files.extend(record.files_created.iter().cloned());
        }
        self.records.insert(record.task_id, record);
    }

    /// Immutable view handed to a worker for one execution.
    pub fn snapshot(&self, plan: &Plan) -> ContextSnapshot {
        ContextSnapshot {
            project_name: plan.project_name.clone(),
            technology_stack: plan.technology_stack.clone(),
            completed_tasks: self.completed.clone(),
            created_files: self.created_files.clone(),
        }
    }
}

/// Read-only view of run progress rendered into worker prompts.
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    pub project_name: String,
    pub technology_stack: Vec<String>,
    pub completed_tasks: Vec<TaskId>,
    pub created_files: Vec<String>,
}

impl ContextSnapshot {
    /// Render the snapshot as a prompt section.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.project_name.is_empty() {
            out.push_str(&format!("Project: {}\n", self.project_name));
        }
        if !self.technology_stack.is_empty() {
            out.push_str(&format!(
                "Technology stack: {}\n",
                self.technology_stack.join(", ")
            ));
        }
        if !self.created_files.is_empty() {
            out.push_str(&format!(
                "Files already created: {}\n",
                self.created_files.join(", ")
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_success_updates_completion_order() {
        let mut ctx = RunContext::default();
        ctx.record(TaskRecord::success(2, "b", vec!["b.html".into()]));
        ctx.record(TaskRecord::success(1, "a", vec!["a.html".into()]));
        assert_eq!(ctx.completed, vec![2, 1]);
        assert_eq!(ctx.created_files, vec!["b.html", "a.html"]);
    }

    #[test]
    fn test_record_failure_not_counted_completed() {
        let mut ctx = RunContext::default();
        ctx.record(TaskRecord::failure(1, "a", "transport", "timed out"));
        assert!(ctx.completed.is_empty());
        assert!(ctx.created_files.is_empty());
        assert_eq!(ctx.records[&1].error_kind.as_deref(), Some("transport"));
    }

    #[test]
    fn test_snapshot_renders_progress() {
        let mut ctx = RunContext::default();
        ctx.record(TaskRecord::success(1, "data", vec!["data/papers.json".into()]));
        let plan = Plan::fallback();
        let rendered = ctx.snapshot(&plan).render();
        assert!(rendered.contains("data/papers.json"));
        assert!(rendered.contains(&plan.project_name));
    }
}
