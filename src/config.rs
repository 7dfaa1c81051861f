//! Run configuration assembled from CLI arguments and environment.

use std::path::PathBuf;

use crate::llm::ProviderKind;

/// Ceiling on scheduling iterations across the whole generating phase.
/// Deferrals count against it, so a task re-queued forever still ends
/// the run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

/// Ceiling on reasoning calls inside one task's tool loop.
pub const DEFAULT_MAX_TOOL_ITERATIONS: u32 = 5;

pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

/// Everything the engine needs to know for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub requirement: String,
    /// Root under which all artifacts are created
    pub output_dir: PathBuf,
    pub max_iterations: u32,
    pub max_tool_iterations: u32,
    pub provider: ProviderKind,
    /// Provider-specific model override
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Discard any persisted state instead of resuming
    pub fresh: bool,
}

impl RunConfig {
    pub fn new(requirement: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            requirement: requirement.into(),
            output_dir: output_dir.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            provider: ProviderKind::Mock,
            model: None,
            api_key: None,
            fresh: false,
        }
    }

    /// Location of the durable run record, inside the output root so the
    /// whole run moves as one directory.
    pub fn state_path(&self) -> PathBuf {
        self.output_dir.join(".conductor").join("state.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("build a site", "outputs");
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.max_tool_iterations, DEFAULT_MAX_TOOL_ITERATIONS);
        assert_eq!(config.provider, ProviderKind::Mock);
        assert!(!config.fresh);
    }

    #[test]
    fn test_state_path_under_output_dir() {
        let config = RunConfig::new("x", "/tmp/out");
        assert!(config.state_path().starts_with("/tmp/out"));
        assert!(config.state_path().ends_with("state.json"));
    }
}
