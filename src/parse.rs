//! Two-path parsing of worker output: strict structured parse first, then
//! an explicit best-effort salvage pass.
//!
//! Both paths are named outcomes rather than exception-driven control flow,
//! so callers always know which contract produced a value.

use serde::de::DeserializeOwned;

/// How a structured value was obtained from raw model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePath {
    /// The whole response body parsed as the expected type
    Strict,
    /// The outermost `{..}` substring parsed after trimming surrounding prose
    Salvaged,
}

/// Parse `text` as `T`, trying the full body first and falling back to the
/// outermost JSON object substring. Returns the value and the path taken.
pub fn parse_json_lenient<T: DeserializeOwned>(text: &str) -> Option<(T, ParsePath)> {
    if let Ok(value) = serde_json::from_str::<T>(text.trim()) {
        return Some((value, ParsePath::Strict));
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<T>(&text[start..=end])
        .ok()
        .map(|value| (value, ParsePath::Salvaged))
}

/// Extract the largest fenced code block from markdown-flavoured text.
///
/// Used by the worker loop's salvage pass when a response embedded the
/// artifact inline instead of invoking a tool. Language tags on the opening
/// fence are stripped.
pub fn extract_code_block(text: &str) -> Option<String> {
    if !text.contains("```") {
        return None;
    }

    let parts: Vec<&str> = text.split("```").collect();
    let mut blocks = Vec::new();
    for block in parts.iter().skip(1).step_by(2) {
        let body = match block.split_once('\n') {
            // First line is a language identifier (```html etc.)
            Some((_, rest)) => rest,
            None => block,
        };
        let body = body.trim();
        if !body.is_empty() {
            blocks.push(body.to_string());
        }
    }

    blocks.into_iter().max_by_key(|b| b.len())
}
