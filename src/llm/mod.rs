//! Reasoning-call surface: message types, typed tool calls, and the
//! `Provider` trait every backend implements.
//!
//! The engine depends only on this shape; which HTTP API backs it is a
//! constructor-time decision (`build_provider`).

pub mod mock;
pub mod openai;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::tools::ToolSchema;

pub use mock::MockProvider;
pub use openai::OpenAiProvider;

/// A single message in a worker's conversation history.
///
/// Tagged variants instead of a role string + optional fields: each kind
/// carries exactly the payload it needs, and the wire mapping happens at
/// the provider boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Result of a tool invocation, fed back for the next iteration
    Tool {
        call_id: String,
        name: String,
        content: String,
    },
}

impl ChatMessage {
    /// Text content of the message, whatever its kind.
    pub fn content(&self) -> &str {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::Assistant { content, .. }
            | Self::Tool { content, .. } => content,
        }
    }
}

/// A tool invocation requested by the model, validated at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Parsed argument object. Malformed argument strings surface here as a
    /// raw string value and fail tool-side with a structured error.
    pub arguments: Value,
}

/// One completed reasoning call.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    /// Whether the response requested any tool invocations.
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Transport or protocol failure talking to a provider.
///
/// Never retried inside the worker loop; retry policy belongs to the
/// engine.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// A reasoning backend. The only suspension point in the system besides
/// tool invocations.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend name for logs and the run summary.
    fn name(&self) -> &str;

    /// Send the conversation and optional tool definitions, returning the
    /// assistant turn.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatResponse, TransportError>;
}

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Deepseek,
    Openai,
    Mock,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deepseek" => Ok(Self::Deepseek),
            "openai" => Ok(Self::Openai),
            "mock" => Ok(Self::Mock),
            other => Err(format!(
                "unknown provider '{other}' (expected deepseek, openai, or mock)"
            )),
        }
    }
}

impl ProviderKind {
    /// Environment variable holding the API key for this backend.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Deepseek => Some("DEEPSEEK_API_KEY"),
            Self::Openai => Some("OPENAI_API_KEY"),
            Self::Mock => None,
        }
    }
}

/// Construct a provider from CLI-level settings.
///
/// A missing API key degrades to the mock provider rather than failing:
/// the run still exercises the whole pipeline offline.
pub fn build_provider(
    kind: ProviderKind,
    model: Option<&str>,
    api_key: Option<&str>,
) -> Arc<dyn Provider> {
    match kind {
        ProviderKind::Mock => Arc::new(MockProvider::new()),
        ProviderKind::Deepseek | ProviderKind::Openai => {
            let key = api_key
                .map(str::to_string)
                .or_else(|| kind.api_key_env().and_then(|v| std::env::var(v).ok()));
            match key {
                Some(key) => Arc::new(OpenAiProvider::new(kind, model, key)),
                None => {
                    tracing::warn!(
                        provider = ?kind,
                        "no API key available, falling back to mock provider"
                    );
                    Arc::new(MockProvider::new())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parses_known_names() {
        assert_eq!("deepseek".parse::<ProviderKind>().unwrap(), ProviderKind::Deepseek);
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::Openai);
        assert_eq!("mock".parse::<ProviderKind>().unwrap(), ProviderKind::Mock);
        assert!("gemini".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_chat_message_roundtrips_serde() {
        let msg = ChatMessage::Tool {
            call_id: "abc".into(),
            name: "create_file".into(),
            content: "{\"status\":\"success\"}".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_assistant_message_omits_empty_tool_calls() {
        let msg = ChatMessage::Assistant {
            content: "done".into(),
            tool_calls: Vec::new(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("tool_calls"));
    }

    #[test]
    fn test_wants_tools_reflects_tool_calls() {
        let mut response = ChatResponse::default();
        assert!(!response.wants_tools());
        response.tool_calls.push(ToolCall {
            id: "c1".into(),
            name: "create_file".into(),
            arguments: Value::Null,
        });
        assert!(response.wants_tools());
    }

    #[test]
    fn test_build_provider_without_key_degrades_to_mock() {
        std::env::remove_var("DEEPSEEK_API_KEY");
        let provider = build_provider(ProviderKind::Deepseek, None, None);
        assert_eq!(provider.name(), "mock");
    }
}
