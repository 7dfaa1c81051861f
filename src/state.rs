//! Durable run state: a single JSON record per run directory, replaced
//! atomically on every commit so an interrupted run can resume.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{RunContext, TaskRecord};
use crate::orchestrator::report::EvaluationReport;
use crate::task::{Plan, PlanSource, TaskId};
use crate::worker::WorkerMemory;

/// The durable projection of a run: plan, progress, evaluation, and
/// per-worker memory blobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub plan_source: PlanSource,
    /// Completed task ids, ordered by completion time
    #[serde(default)]
    pub completed_tasks: Vec<TaskId>,
    #[serde(default)]
    pub created_files: Vec<String>,
    #[serde(default)]
    pub task_results: BTreeMap<TaskId, TaskRecord>,
    #[serde(default)]
    pub evaluation: Option<EvaluationReport>,
    /// Opaque worker memory blobs keyed by worker role
    #[serde(default)]
    pub workers: BTreeMap<String, WorkerMemory>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl PersistedState {
    /// Whether the record holds resumable progress.
    pub fn has_progress(&self) -> bool {
        self.plan.is_some() && !self.completed_tasks.is_empty()
    }
}

/// Single-writer store for the persisted record. The engine owns the only
/// instance for the lifetime of a run process.
pub struct StateStore {
    path: PathBuf,
    state: PersistedState,
}

impl StateStore {
    /// Open the store, loading any existing record. A missing or corrupt
    /// record degrades to a fresh default; it never fails the run.
    pub fn load(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory {}", parent.display())
            })?;
        }

        let state = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "state record unreadable, starting fresh"
                    );
                    PersistedState::default()
                }
            },
            Err(_) => PersistedState::default(),
        };

        Ok(Self { path, state })
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the current record: serialize to a temporary file next to
    /// the canonical path, then rename over it. A crash mid-write leaves
    /// the previous valid record intact.
    pub fn commit(&mut self) -> Result<()> {
        self.state.last_updated = Some(Utc::now());

        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&self.state)
            .context("Failed to serialize run state")?;
        std::fs::write(&tmp, body)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }

    /// Store the active plan and where it came from.
    pub fn set_plan(&mut self, plan: &Plan, source: PlanSource) {
        self.state.plan = Some(plan.clone());
        self.state.plan_source = source;
    }

    /// Mirror the in-memory run context into the record.
    pub fn sync_context(&mut self, ctx: &RunContext) {
        self.state.completed_tasks = ctx.completed.clone();
        self.state.created_files = ctx.created_files.clone();
        self.state.task_results = ctx.records.clone();
    }

    pub fn set_evaluation(&mut self, report: &EvaluationReport) {
        self.state.evaluation = Some(report.clone());
    }

    /// Round-trip a worker's opaque memory blob keyed by role.
    pub fn record_worker_memory(&mut self, role: &str, memory: &WorkerMemory) {
        self.state.workers.insert(role.to_string(), memory.clone());
    }

    pub fn restore_worker_memory(&self, role: &str) -> Option<WorkerMemory> {
        self.state.workers.get(role).cloned()
    }

    /// Delete the record, if any.
    pub fn reset(&mut self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        self.state = PersistedState::default();
        Ok(())
    }
}
