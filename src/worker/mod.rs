//! Workers: role-scoped conversation holders whose memory survives
//! restarts through the state store.

pub mod runner;

use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, ToolCall};
use crate::prompts;

pub use runner::{drive_task, LoopOutcome};

/// The three worker roles in a run. Each carries its own system prompt
/// and its own persisted memory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    Planner,
    Implementer,
    Evaluator,
}

impl WorkerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Implementer => "implementer",
            Self::Evaluator => "evaluator",
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            Self::Planner => prompts::PLANNER_SYSTEM_PROMPT,
            Self::Implementer => prompts::IMPLEMENTER_SYSTEM_PROMPT,
            Self::Evaluator => prompts::EVALUATOR_SYSTEM_PROMPT,
        }
    }
}

/// Serializable slice of a worker: conversation history plus an
/// append-only thought log. The system prompt is NOT stored; it is
/// reattached from the role on every call, so prompt changes take effect
/// on resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerMemory {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub thoughts: Vec<String>,
}

/// One worker: a role plus its accumulated memory.
pub struct Worker {
    role: WorkerRole,
    memory: WorkerMemory,
}

impl Worker {
    pub fn new(role: WorkerRole) -> Self {
        Self {
            role,
            memory: WorkerMemory::default(),
        }
    }

    /// Rebuild a worker from persisted memory.
    pub fn with_memory(role: WorkerRole, memory: WorkerMemory) -> Self {
        Self { role, memory }
    }

    pub fn role(&self) -> WorkerRole {
        self.role
    }

    pub fn memory(&self) -> &WorkerMemory {
        &self.memory
    }

    /// Full message sequence for a provider call: system prompt first,
    /// then the recorded history.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.memory.history.len() + 1);
        messages.push(ChatMessage::System {
            content: self.role.system_prompt().to_string(),
        });
        messages.extend(self.memory.history.iter().cloned());
        messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.memory.history.push(ChatMessage::User {
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, tool_calls: Vec<ToolCall>) {
        self.memory.history.push(ChatMessage::Assistant {
            content: content.into(),
            tool_calls,
        });
    }

    pub fn push_tool_result(
        &mut self,
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.memory.history.push(ChatMessage::Tool {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
        });
    }

    /// Record a step in the thought log and emit it as a debug event.
    pub fn add_thought(&mut self, thought: impl Into<String>) {
        let thought = thought.into();
        tracing::debug!(role = self.role.as_str(), %thought);
        self.memory.thoughts.push(thought);
    }

    /// Drop conversation history, keeping the thought log. Used between
    /// tasks so one task's transcript does not bleed into the next.
    pub fn clear_history(&mut self) {
        self.memory.history.clear();
    }
}
