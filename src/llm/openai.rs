//! OpenAI-compatible chat-completions client used for the deepseek and
//! openai backends.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{ChatMessage, ChatResponse, Provider, ProviderKind, ToolCall, TransportError};
use crate::tools::ToolSchema;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 4000;

/// Chat-completions client for any OpenAI-wire-compatible endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    name: &'static str,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiProvider {
    /// Create a client for the given backend with its default model and
    /// base URL unless overridden.
    pub fn new(kind: ProviderKind, model: Option<&str>, api_key: String) -> Self {
        let (name, base_url, default_model) = match kind {
            ProviderKind::Deepseek => ("deepseek", "https://api.deepseek.com", "deepseek-chat"),
            ProviderKind::Openai => ("openai", "https://api.openai.com/v1", "gpt-4o"),
            // build_provider never routes Mock here
            ProviderKind::Mock => ("mock", "", ""),
        };

        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            name,
            base_url: base_url.to_string(),
            model: model.unwrap_or(default_model).to_string(),
            api_key,
        }
    }

    /// Override the base URL (test servers, self-hosted gateways).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn wire_messages(messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| match msg {
                ChatMessage::System { content } => json!({"role": "system", "content": content}),
                ChatMessage::User { content } => json!({"role": "user", "content": content}),
                ChatMessage::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut obj = json!({"role": "assistant", "content": content});
                    if !tool_calls.is_empty() {
                        obj["tool_calls"] = tool_calls
                            .iter()
                            .map(|tc| {
                                json!({
                                    "id": tc.id,
                                    "type": "function",
                                    "function": {
                                        "name": tc.name,
                                        "arguments": tc.arguments.to_string(),
                                    },
                                })
                            })
                            .collect();
                    }
                    obj
                }
                ChatMessage::Tool {
                    call_id,
                    name,
                    content,
                } => json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "name": name,
                    "content": content,
                }),
            })
            .collect()
    }

    fn wire_tools(tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|schema| {
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters,
                    },
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatResponse, TransportError> {
        let mut payload = json!({
            "model": self.model,
            "messages": Self::wire_messages(messages),
            "temperature": temperature,
            "max_tokens": MAX_TOKENS,
        });
        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            payload["tools"] = Value::Array(Self::wire_tools(tools));
            payload["tool_choice"] = json!("auto");
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError(format!("HTTP {status}: {body}")));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| TransportError(format!("malformed response body: {e}")))?;

        let message = wire
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| TransportError("response contained no choices".to_string()))?;

        let tool_calls = message
            .tool_calls
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                // Keep malformed argument strings as raw values; the tool
                // reports the problem back to the worker as data.
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments)),
            })
            .collect();

        Ok(ChatResponse {
            content: message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(ProviderKind::Deepseek, None, "test-key".into())
    }

    #[test]
    fn test_defaults_per_backend() {
        let p = provider();
        assert_eq!(p.name(), "deepseek");
        assert_eq!(p.model, "deepseek-chat");
        assert!(p.base_url.contains("deepseek"));

        let p = OpenAiProvider::new(ProviderKind::Openai, Some("gpt-4o-mini"), "k".into());
        assert_eq!(p.model, "gpt-4o-mini");
    }

    #[test]
    fn test_wire_messages_map_roles() {
        let messages = vec![
            ChatMessage::System { content: "sys".into() },
            ChatMessage::Tool {
                call_id: "c1".into(),
                name: "create_file".into(),
                content: "{}".into(),
            },
        ];
        let wire = OpenAiProvider::wire_messages(&messages);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "tool");
        assert_eq!(wire[1]["tool_call_id"], "c1");
    }

    #[test]
    fn test_wire_response_parses_tool_calls() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "create_file", "arguments": "{\"path\": \"a.txt\"}"}
                    }]
                }
            }]
        }"#;
        let wire: WireResponse = serde_json::from_str(body).unwrap();
        let msg = &wire.choices[0].message;
        assert!(msg.content.is_none());
        assert_eq!(msg.tool_calls[0].function.name, "create_file");
    }
}
