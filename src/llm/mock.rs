//! Deterministic offline provider.
//!
//! Recognizes the three role prompts and answers with canned but
//! structurally realistic output, so the whole pipeline (plan, tool-call
//! loop, evaluation, persistence) runs without network access. Selected
//! with `--provider mock`, and the default when no API key is available.

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::llm::{ChatMessage, ChatResponse, Provider, ToolCall, TransportError};
use crate::tools::ToolSchema;

pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    fn plan_response() -> ChatResponse {
        let plan = json!({
            "project_name": "arxiv-cs-daily",
            "technology_stack": ["html", "css", "javascript"],
            "tasks": [
                {
                    "id": 1,
                    "title": "Create sample data",
                    "description": "Create papers.json with sample arXiv papers",
                    "file_path": "data/papers.json",
                    "dependencies": [],
                    "priority": "high"
                },
                {
                    "id": 2,
                    "title": "Create homepage",
                    "description": "Create index.html listing the latest papers",
                    "file_path": "index.html",
                    "dependencies": [1],
                    "priority": "high"
                },
                {
                    "id": 3,
                    "title": "Add styling",
                    "description": "Create style.css with a responsive layout",
                    "file_path": "css/style.css",
                    "dependencies": [1],
                    "priority": "medium"
                }
            ]
        });
        ChatResponse {
            content: plan.to_string(),
            tool_calls: Vec::new(),
        }
    }

    fn evaluation_response() -> ChatResponse {
        let report = json!({
            "overall_score": 86,
            "passed": true,
            "issues": [],
            "strengths": ["All planned files were generated", "Pages share a consistent structure"],
            "recommendations": ["Add accessibility attributes to navigation"]
        });
        ChatResponse {
            content: report.to_string(),
            tool_calls: Vec::new(),
        }
    }

    fn implement_response(prompt: &str) -> ChatResponse {
        let path = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Target file: "))
            .unwrap_or("index.html")
            .trim()
            .to_string();

        let content = Self::stub_content(&path);
        ChatResponse {
            content: format!("Creating {path} now."),
            tool_calls: vec![ToolCall {
                id: format!("call_{}", Uuid::new_v4().simple()),
                name: "create_file".to_string(),
                arguments: json!({"path": path, "content": content}),
            }],
        }
    }

    fn stub_content(path: &str) -> String {
        match path.rsplit('.').next().unwrap_or_default() {
            "html" => concat!(
                "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n",
                "  <meta charset=\"utf-8\">\n  <title>arXiv CS Daily</title>\n",
                "  <link rel=\"stylesheet\" href=\"css/style.css\">\n</head>\n",
                "<body>\n  <h1>arXiv CS Daily</h1>\n  <main id=\"papers\"></main>\n",
                "  <script src=\"js/script.js\"></script>\n</body>\n</html>\n"
            )
            .to_string(),
            "css" => "body {\n  margin: 0;\n  font-family: system-ui, sans-serif;\n}\n".to_string(),
            "js" => "fetch('data/papers.json')\n  .then((r) => r.json())\n  .then(render);\n"
                .to_string(),
            "json" => json!({
                "papers": [
                    {"id": "2401.00001", "title": "Sample Paper", "category": "cs.AI"}
                ]
            })
            .to_string(),
            _ => format!("Generated content for {path}\n"),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
        _tools: Option<&[ToolSchema]>,
    ) -> Result<ChatResponse, TransportError> {
        let last = messages
            .last()
            .ok_or_else(|| TransportError("empty conversation".to_string()))?;

        // A tool result means the previous canned tool call ran; end the loop.
        if let ChatMessage::Tool { .. } = last {
            return Ok(ChatResponse {
                content: "File created. Task complete.".to_string(),
                tool_calls: Vec::new(),
            });
        }

        let prompt = last.content();
        if prompt.contains("project plan") {
            Ok(Self::plan_response())
        } else if prompt.starts_with("Evaluate the following files") {
            Ok(Self::evaluation_response())
        } else if prompt.contains("Target file: ") {
            Ok(Self::implement_response(prompt))
        } else {
            Ok(ChatResponse {
                content: "Acknowledged.".to_string(),
                tool_calls: Vec::new(),
            })
        }
    }
}
