//! The phase controller: plans, drives the scheduler through the
//! generating loop, evaluates, and keeps the durable record current.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::config::RunConfig;
use crate::context::{RunContext, TaskRecord};
use crate::graph::{GraphBuilder, Scheduler};
use crate::llm::{build_provider, Provider};
use crate::orchestrator::report::{EvaluationReport, FailedTask, RunReport};
use crate::orchestrator::RunPhase;
use crate::parse::{parse_json_lenient, ParsePath};
use crate::prompts;
use crate::state::StateStore;
use crate::task::{Plan, PlanSource};
use crate::tools::{ArtifactStore, ToolRegistry};
use crate::worker::{drive_task, Worker, WorkerRole};

const PLAN_TEMPERATURE: f32 = 0.3;
const EVAL_TEMPERATURE: f32 = 0.3;

/// Owns one run end to end. Single-threaded over the task graph: one
/// task is in flight at a time, so the state record always reflects a
/// consistent prefix of the run.
pub struct Engine {
    config: RunConfig,
    provider: Arc<dyn Provider>,
    store: Arc<ArtifactStore>,
    registry: ToolRegistry,
    state: StateStore,
    phase: RunPhase,
    interrupted: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(config: RunConfig) -> Result<Self> {
        let provider = build_provider(
            config.provider,
            config.model.as_deref(),
            config.api_key.as_deref(),
        );
        Self::with_provider(config, provider)
    }

    /// Construct with an explicit provider (tests inject scripted ones).
    pub fn with_provider(config: RunConfig, provider: Arc<dyn Provider>) -> Result<Self> {
        let store = Arc::new(ArtifactStore::new(config.output_dir.clone())?);
        let registry = ToolRegistry::with_file_tools(store.clone());
        let mut state = StateStore::load(config.state_path())?;
        if config.fresh {
            state.reset().context("Failed to discard previous state")?;
        }
        Ok(Self {
            config,
            provider,
            store,
            registry,
            state,
            phase: RunPhase::Planning,
            interrupted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag checked at task boundaries; set from a signal handler to stop
    /// the run after the current task commits.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Execute the full run: plan (or resume), generate, evaluate.
    pub async fn run(&mut self) -> Result<RunReport> {
        let (plan, plan_source) = self.obtain_plan().await?;

        self.phase = RunPhase::Generating;
        let graph = GraphBuilder::new(plan.tasks.clone())
            .build()
            .context("Active plan has an invalid task graph")?;
        let mut scheduler = Scheduler::new(graph);

        let mut ctx = RunContext {
            completed: self.state.state().completed_tasks.clone(),
            created_files: self.state.state().created_files.clone(),
            records: self.state.state().task_results.clone(),
        };
        if !ctx.completed.is_empty() {
            tracing::info!(
                completed = ctx.completed.len(),
                "resuming from persisted progress"
            );
        }
        scheduler.restore_completed(&ctx.completed);

        let mut implementer = self.worker(WorkerRole::Implementer);
        let mut iterations = 0u32;
        let mut interrupted = false;

        while iterations < self.config.max_iterations {
            if self.interrupted.load(Ordering::SeqCst) {
                tracing::warn!("interrupt received, stopping at task boundary");
                interrupted = true;
                break;
            }

            scheduler.refresh_ready();
            let Some(task) = scheduler.next_ready().cloned() else {
                break;
            };
            iterations += 1;

            // Guard against drift between scheduler and run context (e.g.
            // a resumed record that no longer matches the plan). Deferral
            // counts against the global ceiling, so it cannot loop forever.
            if !task.depends_on.iter().all(|d| ctx.completed.contains(d)) {
                scheduler.mark_deferred(task.id);
                tracing::warn!(
                    task_id = task.id,
                    revisit = scheduler.defer_count(task.id),
                    "dependencies not yet in run context, deferring"
                );
                continue;
            }

            scheduler.mark_running(task.id);
            tracing::info!(task_id = task.id, title = %task.title, "dispatching task");

            let snapshot = ctx.snapshot(&plan);
            let outcome = drive_task(
                &mut implementer,
                self.provider.as_ref(),
                &self.registry,
                &self.store,
                &task,
                &snapshot,
                self.config.max_tool_iterations,
            )
            .await;

            match outcome {
                Ok(outcome) => {
                    tracing::info!(
                        task_id = task.id,
                        files = ?outcome.files_created,
                        iterations = outcome.iterations,
                        salvaged = outcome.salvage_used,
                        "task completed"
                    );
                    ctx.record(TaskRecord::success(task.id, &task.title, outcome.files_created));
                    scheduler.mark_completed(task.id);
                }
                Err(e) => {
                    tracing::error!(task_id = task.id, error = %e, "task failed");
                    ctx.record(TaskRecord::failure(task.id, &task.title, e.kind(), &e.to_string()));
                    scheduler.mark_failed(task.id);
                }
            }

            // One task per transcript; thoughts accumulate across tasks.
            implementer.clear_history();

            self.state.sync_context(&ctx);
            self.state
                .record_worker_memory(implementer.role().as_str(), implementer.memory());
            self.state.commit()?;
        }

        if iterations >= self.config.max_iterations && !scheduler.all_resolved() {
            tracing::warn!(
                max_iterations = self.config.max_iterations,
                "iteration ceiling reached with unresolved tasks"
            );
        }

        let evaluation = if !interrupted && !ctx.created_files.is_empty() {
            self.phase = RunPhase::Evaluating;
            let mut evaluator = self.worker(WorkerRole::Evaluator);
            let report = self.evaluate(&mut evaluator, &ctx).await;
            self.state.set_evaluation(&report);
            self.state
                .record_worker_memory(evaluator.role().as_str(), evaluator.memory());
            self.state.commit()?;
            Some(report)
        } else {
            None
        };

        self.phase = if interrupted {
            RunPhase::Aborted
        } else {
            RunPhase::Done
        };

        Ok(RunReport {
            phase: self.phase,
            provider: self.provider.name().to_string(),
            plan_source,
            project_name: plan.project_name.clone(),
            completed: ctx.completed.clone(),
            failed: scheduler
                .failed_ids()
                .into_iter()
                .map(|id| FailedTask {
                    task_id: id,
                    error_kind: ctx
                        .records
                        .get(&id)
                        .and_then(|r| r.error_kind.clone())
                        .unwrap_or_else(|| "unknown".to_string()),
                })
                .collect(),
            blocked: scheduler.blocked_ids(),
            never_attempted: scheduler.never_attempted_ids(),
            created_files: ctx.created_files,
            evaluation,
            iterations_used: iterations,
        })
    }

    /// Reuse the persisted plan when resuming, otherwise run the planner.
    async fn obtain_plan(&mut self) -> Result<(Plan, PlanSource)> {
        if !self.config.fresh {
            if let Some(plan) = self.state.state().plan.clone() {
                let source = self.state.state().plan_source;
                tracing::info!(project = %plan.project_name, "reusing persisted plan");
                return Ok((plan, source));
            }
        }

        self.phase = RunPhase::Planning;
        let mut planner = self.worker(WorkerRole::Planner);
        planner.push_user(prompts::planning_prompt(&self.config.requirement));
        planner.add_thought("Planning from requirement".to_string());

        let response = match self
            .provider
            .chat(&planner.messages(), PLAN_TEMPERATURE, None)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                // No plan means nothing downstream can run.
                self.phase = RunPhase::Aborted;
                return Err(anyhow!("Planning call failed: {e}"));
            }
        };
        planner.push_assistant(response.content.clone(), response.tool_calls);

        let (plan, source) = interpret_plan(&response.content);
        tracing::info!(
            project = %plan.project_name,
            tasks = plan.tasks.len(),
            source = ?source,
            "plan accepted"
        );

        self.state.set_plan(&plan, source);
        self.state
            .record_worker_memory(planner.role().as_str(), planner.memory());
        self.state.commit()?;

        Ok((plan, source))
    }

    /// Quality pass over the generated artifacts. Never fails the run:
    /// transport or parse trouble degrades to a heuristic report.
    async fn evaluate(&self, evaluator: &mut Worker, ctx: &RunContext) -> EvaluationReport {
        let mut files: Vec<(String, String)> = Vec::new();
        for path in &ctx.created_files {
            if files.iter().any(|(p, _)| p == path) {
                continue;
            }
            match self.store.read(path) {
                Ok(content) => files.push((path.clone(), content)),
                Err(e) => tracing::warn!(path = %path, error = %e, "skipping unreadable artifact"),
            }
        }

        evaluator.push_user(prompts::evaluation_prompt(&files, &self.config.requirement));

        match self
            .provider
            .chat(&evaluator.messages(), EVAL_TEMPERATURE, None)
            .await
        {
            Ok(response) => {
                evaluator.push_assistant(response.content.clone(), response.tool_calls);
                match parse_json_lenient::<EvaluationReport>(&response.content) {
                    Some((report, _)) => report,
                    None => {
                        tracing::warn!("evaluation output unparsable, using heuristic score");
                        EvaluationReport::heuristic(&response.content)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "evaluation call failed, using heuristic score");
                EvaluationReport::heuristic("")
            }
        }
    }

    fn worker(&self, role: WorkerRole) -> Worker {
        match self.state.restore_worker_memory(role.as_str()) {
            Some(memory) => Worker::with_memory(role, memory),
            None => Worker::new(role),
        }
    }
}

/// Turn raw planner output into a usable plan plus its provenance.
/// Structured parse first, then the salvage path; an empty or
/// structurally invalid plan falls back to the built-in one.
fn interpret_plan(content: &str) -> (Plan, PlanSource) {
    if let Some((plan, path)) = parse_json_lenient::<Plan>(content) {
        if plan.tasks.is_empty() {
            tracing::warn!("planner produced an empty task list");
        } else {
            match GraphBuilder::new(plan.tasks.clone()).build() {
                Ok(_) => {
                    let source = match path {
                        ParsePath::Strict => PlanSource::Model,
                        ParsePath::Salvaged => PlanSource::Salvaged,
                    };
                    return (plan, source);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "planner produced an invalid task graph");
                }
            }
        }
    } else {
        tracing::warn!("planner output is not parsable as a plan");
    }
    (Plan::fallback(), PlanSource::Fallback)
}
