//! Artifact sink: file operations scoped beneath a single output root,
//! plus the tools exposing them to workers.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::{Tool, ToolResult, ToolSchema};

/// File store rooted at the run's output directory. Paths are treated as
/// opaque locators relative to the root; anything escaping it is rejected.
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    /// Create the store, making the output root if needed. Failure to
    /// create the root at all is the one run-fatal filesystem error.
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create output directory {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, String> {
        let relative = Path::new(path);
        if relative.is_absolute() {
            return Err(format!("Absolute paths are not allowed: {path}"));
        }
        for component in relative.components() {
            if matches!(component, Component::ParentDir) {
                return Err(format!("Path escapes the output root: {path}"));
            }
        }
        Ok(self.base_dir.join(relative))
    }

    /// Create (or overwrite) a file under the root, creating parents.
    pub fn create(&self, path: &str, content: &str) -> Result<(), String> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| format!("Failed to create {path}: {e}"))?;
        }
        std::fs::write(&full, content).map_err(|e| format!("Failed to create {path}: {e}"))
    }

    /// Read a file under the root.
    pub fn read(&self, path: &str) -> Result<String, String> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(format!("File not found: {path}"));
        }
        std::fs::read_to_string(&full).map_err(|e| format!("Failed to read {path}: {e}"))
    }

    /// List entries of a directory under the root. Directories carry a
    /// trailing slash. Entries are sorted for stable output.
    pub fn list(&self, path: &str) -> Result<Vec<String>, String> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(format!("Directory not found: {path}"));
        }
        let mut entries = Vec::new();
        let read_dir =
            std::fs::read_dir(&full).map_err(|e| format!("Failed to list {path}: {e}"))?;
        for entry in read_dir.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() {
                entries.push(format!("{name}/"));
            } else {
                entries.push(name);
            }
        }
        entries.sort();
        Ok(entries)
    }
}

fn require_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, String> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Missing required string argument '{field}'"))
}

/// `create_file` — write an artifact under the output root.
pub struct CreateFileTool {
    store: Arc<ArtifactStore>,
}

impl CreateFileTool {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "create_file".to_string(),
            description: "Create a file at the given relative path with the given content"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Relative path of the file"},
                    "content": {"type": "string", "description": "Full file content"}
                },
                "required": ["path", "content"]
            }),
        }
    }

    async fn invoke(&self, args: &Value) -> ToolResult {
        let path = match require_str(args, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };
        let content = args.get("content").and_then(Value::as_str).unwrap_or("");
        match self.store.create(path, content) {
            Ok(()) => ToolResult::success(format!("File created: {path}"), json!({"path": path})),
            Err(e) => ToolResult::error(e),
        }
    }
}

/// `read_file` — read a previously created artifact.
pub struct ReadFileTool {
    store: Arc<ArtifactStore>,
}

impl ReadFileTool {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "read_file".to_string(),
            description: "Read the content of a file at the given relative path".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Relative path of the file"}
                },
                "required": ["path"]
            }),
        }
    }

    async fn invoke(&self, args: &Value) -> ToolResult {
        let path = match require_str(args, "path") {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };
        match self.store.read(path) {
            Ok(content) => {
                ToolResult::success(format!("File read: {path}"), json!({"content": content}))
            }
            Err(e) => ToolResult::error(e),
        }
    }
}

/// `list_directory` — list artifacts under a relative directory.
pub struct ListDirectoryTool {
    store: Arc<ArtifactStore>,
}

impl ListDirectoryTool {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_directory".to_string(),
            description: "List files and directories under the given relative path".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Relative directory path, empty for the root"}
                }
            }),
        }
    }

    async fn invoke(&self, args: &Value) -> ToolResult {
        let path = args.get("path").and_then(Value::as_str).unwrap_or("");
        match self.store.list(path) {
            Ok(entries) => ToolResult::success(
                format!("Listed: {}", if path.is_empty() { "." } else { path }),
                json!({"entries": entries}),
            ),
            Err(e) => ToolResult::error(e),
        }
    }
}
