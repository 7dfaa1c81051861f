//! The bounded tool-call loop that drives one task through the
//! implementer worker.

use serde_json::Value;

use crate::context::ContextSnapshot;
use crate::errors::WorkerError;
use crate::llm::Provider;
use crate::parse::extract_code_block;
use crate::prompts;
use crate::task::Task;
use crate::tools::{ArtifactStore, ToolRegistry};
use crate::worker::Worker;

const IMPLEMENT_TEMPERATURE: f32 = 0.7;

/// What one task execution produced.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Relative paths of files created for this task
    pub files_created: Vec<String>,
    /// Reasoning calls actually spent
    pub iterations: u32,
    /// True when the file came from a salvaged code block instead of a
    /// `create_file` call
    pub salvage_used: bool,
}

/// Drive one task to completion through `worker`.
///
/// Each iteration is one reasoning call. Tool calls are dispatched through
/// the registry and their results, errors included, are appended to worker
/// memory for the next iteration. A response with no tool calls ends the
/// loop. The loop never runs more than `max_tool_iterations` reasoning
/// calls.
///
/// If the loop ends with no file created, the final assistant text gets
/// one salvage pass: the largest fenced code block, if any, is written to
/// the task's target path.
pub async fn drive_task(
    worker: &mut Worker,
    provider: &dyn Provider,
    registry: &ToolRegistry,
    store: &ArtifactStore,
    task: &Task,
    snapshot: &ContextSnapshot,
    max_tool_iterations: u32,
) -> Result<LoopOutcome, WorkerError> {
    let schemas = registry.schemas();

    worker.push_user(prompts::implement_prompt(task, snapshot));
    worker.add_thought(format!("Starting task {}: {}", task.id, task.title));

    let mut files_created: Vec<String> = Vec::new();
    let mut last_content = String::new();
    let mut iterations = 0u32;
    let mut budget_exhausted = true;

    while iterations < max_tool_iterations {
        iterations += 1;

        let response = provider
            .chat(&worker.messages(), IMPLEMENT_TEMPERATURE, Some(&schemas))
            .await
            .map_err(|e| WorkerError::Transport(e.to_string()))?;

        let wants_tools = response.wants_tools();
        last_content = response.content.clone();
        worker.push_assistant(response.content, response.tool_calls.clone());

        if wants_tools {
            for call in &response.tool_calls {
                tracing::debug!(task_id = task.id, tool = %call.name, "dispatching tool call");
                let result = registry.invoke(&call.name, &call.arguments).await;
                if result.is_success() && call.name == "create_file" {
                    if let Some(path) = call.arguments.get("path").and_then(Value::as_str) {
                        files_created.push(path.to_string());
                    }
                }
                worker.push_tool_result(&call.id, &call.name, result.to_message_json());
            }
            continue;
        }

        budget_exhausted = false;
        break;
    }

    if files_created.is_empty() {
        // Salvage: the model may have answered with the file inline
        // instead of calling create_file.
        if let Some(block) = extract_code_block(&last_content) {
            store
                .create(&task.file_path, &block)
                .map_err(WorkerError::ArtifactWrite)?;
            worker.add_thought(format!(
                "Salvaged inline code block into {}",
                task.file_path
            ));
            tracing::warn!(task_id = task.id, path = %task.file_path, "recovered file from inline code block");
            return Ok(LoopOutcome {
                files_created: vec![task.file_path.clone()],
                iterations,
                salvage_used: true,
            });
        }
        if budget_exhausted {
            return Err(WorkerError::IterationBudgetExceeded { iterations });
        }
        return Err(WorkerError::NoArtifact);
    }

    worker.add_thought(format!(
        "Task {} produced {} file(s) in {} iteration(s)",
        task.id,
        files_created.len(),
        iterations
    ));

    Ok(LoopOutcome {
        files_created,
        iterations,
        salvage_used: false,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::llm::{ChatMessage, ChatResponse, MockProvider, ToolCall, TransportError};
    use crate::task::Priority;
    use crate::tools::ToolSchema;
    use crate::worker::WorkerRole;

    /// Provider that replays a fixed sequence of responses.
    struct ScriptedProvider {
        responses: Mutex<Vec<ChatResponse>>,
    }

    impl ScriptedProvider {
        fn new(mut responses: Vec<ChatResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _temperature: f32,
            _tools: Option<&[ToolSchema]>,
        ) -> Result<ChatResponse, TransportError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| TransportError("script exhausted".to_string()))
        }
    }

    fn fixture(dir: &tempfile::TempDir) -> (Arc<ArtifactStore>, ToolRegistry, Task) {
        let store = Arc::new(ArtifactStore::new(dir.path().join("out")).unwrap());
        let registry = ToolRegistry::with_file_tools(store.clone());
        let task = Task::new(
            1,
            "Homepage",
            "Build the landing page",
            "index.html",
            vec![],
            Priority::High,
        );
        (store, registry, task)
    }

    fn snapshot() -> ContextSnapshot {
        ContextSnapshot {
            project_name: "demo".into(),
            technology_stack: vec!["html".into()],
            completed_tasks: vec![],
            created_files: vec![],
        }
    }

    #[tokio::test]
    async fn test_mock_provider_creates_target_file() {
        let dir = tempdir().unwrap();
        let (store, registry, task) = fixture(&dir);
        let mut worker = Worker::new(WorkerRole::Implementer);

        let outcome = drive_task(
            &mut worker,
            &MockProvider::new(),
            &registry,
            &store,
            &task,
            &snapshot(),
            5,
        )
        .await
        .unwrap();

        assert_eq!(outcome.files_created, vec!["index.html"]);
        assert!(!outcome.salvage_used);
        assert_eq!(outcome.iterations, 2);
        assert!(store.read("index.html").is_ok());
    }

    #[tokio::test]
    async fn test_iteration_budget_bounds_tool_loop() {
        let dir = tempdir().unwrap();
        let (store, registry, task) = fixture(&dir);
        let mut worker = Worker::new(WorkerRole::Implementer);

        // Always asks for an unknown tool, never terminates on its own.
        let endless = |i: usize| ChatResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: format!("call_{i}"),
                name: "search_web".to_string(),
                arguments: json!({"query": "anything"}),
            }],
        };
        let provider = ScriptedProvider::new((0..10).map(endless).collect());

        let err = drive_task(&mut worker, &provider, &registry, &store, &task, &snapshot(), 3)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkerError::IterationBudgetExceeded { iterations: 3 }
        ));
        // The unknown-tool error was fed back to the worker each round.
        let tool_errors = worker
            .memory()
            .history
            .iter()
            .filter(|m| matches!(m, ChatMessage::Tool { .. }))
            .count();
        assert_eq!(tool_errors, 3);
        assert!(worker
            .memory()
            .history
            .iter()
            .any(|m| m.content().contains("Unknown tool: search_web")));
    }

    #[tokio::test]
    async fn test_inline_code_block_is_salvaged() {
        let dir = tempdir().unwrap();
        let (store, registry, task) = fixture(&dir);
        let mut worker = Worker::new(WorkerRole::Implementer);

        let provider = ScriptedProvider::new(vec![ChatResponse {
            content: "Here is the file:\n```html\n<html><body>hi</body></html>\n```".to_string(),
            tool_calls: vec![],
        }]);

        let outcome = drive_task(&mut worker, &provider, &registry, &store, &task, &snapshot(), 5)
            .await
            .unwrap();

        assert!(outcome.salvage_used);
        assert_eq!(outcome.files_created, vec!["index.html"]);
        assert_eq!(store.read("index.html").unwrap(), "<html><body>hi</body></html>");
    }

    #[tokio::test]
    async fn test_unwritable_salvage_target_reports_write_error() {
        let dir = tempdir().unwrap();
        let (store, registry, _) = fixture(&dir);
        let mut worker = Worker::new(WorkerRole::Implementer);

        // Target path escapes the output root, so the salvage write is
        // rejected by the store.
        let task = Task::new(
            1,
            "Escape",
            "bad target",
            "../escape.html",
            vec![],
            Priority::High,
        );
        let provider = ScriptedProvider::new(vec![ChatResponse {
            content: "```html\n<html></html>\n```".to_string(),
            tool_calls: vec![],
        }]);

        let err = drive_task(&mut worker, &provider, &registry, &store, &task, &snapshot(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::ArtifactWrite(_)));
        assert_eq!(err.kind(), "artifact_write");
    }

    #[tokio::test]
    async fn test_plain_refusal_yields_no_artifact() {
        let dir = tempdir().unwrap();
        let (store, registry, task) = fixture(&dir);
        let mut worker = Worker::new(WorkerRole::Implementer);

        let provider = ScriptedProvider::new(vec![ChatResponse {
            content: "I cannot complete this task.".to_string(),
            tool_calls: vec![],
        }]);

        let err = drive_task(&mut worker, &provider, &registry, &store, &task, &snapshot(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NoArtifact));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let dir = tempdir().unwrap();
        let (store, registry, task) = fixture(&dir);
        let mut worker = Worker::new(WorkerRole::Implementer);

        let provider = ScriptedProvider::new(vec![]);
        let err = drive_task(&mut worker, &provider, &registry, &store, &task, &snapshot(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Transport(_)));
    }
}
