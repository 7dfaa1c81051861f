//! Tool surface workers may invoke: schemas, structured results, and the
//! registry that dispatches calls by name.
//!
//! Unknown tool names are errors-as-data, never crashes: the registry
//! answers with an error `ToolResult` that flows back into worker memory
//! so the model can self-correct.

pub mod fs;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use fs::{ArtifactStore, CreateFileTool, ListDirectoryTool, ReadFileTool};

/// Description of one tool, in the JSON-schema shape providers expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON-schema object describing the arguments
    pub parameters: Value,
}

/// Outcome status of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Structured result of a tool invocation, success or error alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl ToolResult {
    pub fn success(message: impl Into<String>, payload: Value) -> Self {
        Self {
            status: ToolStatus::Success,
            message: message.into(),
            payload,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
            payload: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// Serialized form appended to worker memory as a tool message.
    pub fn to_message_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            json!({"status": "error", "message": "unserializable tool result"}).to_string()
        })
    }
}

/// A narrow, named side-effecting operation a worker may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    async fn invoke(&self, args: &Value) -> ToolResult;
}

/// Registry of the tools a worker is permitted to use.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    // BTreeMap keeps schema order stable across runs
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard file tools scoped to `store`.
    pub fn with_file_tools(store: Arc<ArtifactStore>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CreateFileTool::new(store.clone())));
        registry.register(Arc::new(ReadFileTool::new(store.clone())));
        registry.register(Arc::new(ListDirectoryTool::new(store)));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.schema().name, tool);
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schemas of every registered tool, in stable name order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Dispatch an invocation by name. Unregistered names yield an error
    /// result so the worker's own reasoning can recover.
    pub async fn invoke(&self, name: &str, args: &Value) -> ToolResult {
        match self.tools.get(name) {
            Some(tool) => tool.invoke(args).await,
            None => ToolResult::error(format!("Unknown tool: {name}")),
        }
    }
}
