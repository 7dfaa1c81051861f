//! System prompts for each worker role, user-prompt builders, and the
//! default requirement used when none is given.

use crate::context::ContextSnapshot;
use crate::task::Task;

/// Requirement used when the CLI is invoked without `--requirement`.
pub const DEFAULT_REQUIREMENT: &str = "\
Build a static website called 'arXiv CS Daily' that presents recent \
computer-science papers. It needs a homepage listing papers by category, \
a category page, simple styling, and a JSON data file with sample papers. \
Plain HTML, CSS and JavaScript only; no build step.";

pub const PLANNER_SYSTEM_PROMPT: &str = "\
You are a software project planner. You decompose a requirement into a \
small set of concrete file-producing tasks with explicit dependencies.

Respond with a single JSON object of the form:
{
  \"project_name\": string,
  \"technology_stack\": [string],
  \"tasks\": [
    {
      \"id\": number,
      \"title\": string,
      \"description\": string,
      \"file_path\": string,
      \"dependencies\": [number],
      \"priority\": \"high\" | \"medium\" | \"low\"
    }
  ]
}

Task ids start at 1. Dependencies must reference ids in the same list and \
must not form cycles. Output only the JSON object.";

pub const IMPLEMENTER_SYSTEM_PROMPT: &str = "\
You are a code generation worker. You implement exactly one task at a time \
by creating its target file with complete, production-ready content.

You MUST use the create_file tool to write the file. You may use read_file \
and list_directory to inspect files other tasks already produced. When the \
file has been created, reply without any tool call.";

pub const EVALUATOR_SYSTEM_PROMPT: &str = "\
You are a code reviewer. You assess generated files against the original \
requirement for functionality, structure, and completeness.

Respond with a single JSON object of the form:
{
  \"overall_score\": number,      // 0-100
  \"passed\": boolean,            // score >= 60
  \"issues\": [{\"severity\": string, \"description\": string}],
  \"strengths\": [string],
  \"recommendations\": [string]
}

Output only the JSON object.";

/// User prompt for the planning call.
pub fn planning_prompt(requirement: &str) -> String {
    format!(
        "Analyze the following requirement and create a detailed project plan.\n\n\
         Requirement:\n{requirement}\n\n\
         Output the plan in the JSON format specified in your system prompt."
    )
}

/// User prompt driving one task through the implementer.
pub fn implement_prompt(task: &Task, snapshot: &ContextSnapshot) -> String {
    let context = snapshot.render();
    let context_section = if context.is_empty() {
        String::new()
    } else {
        format!("\nContext:\n{context}")
    };

    format!(
        "Task: {title}\n\
         Target file: {file_path}\n\n\
         Description:\n{description}\n\
         {context_section}\n\
         Create the target file now using the create_file tool. Include the \
         complete file content.",
        title = task.title,
        file_path = task.file_path,
        description = task.description,
    )
}

/// User prompt for the evaluation call. `files` pairs each artifact
/// locator with its content.
pub fn evaluation_prompt(files: &[(String, String)], requirement: &str) -> String {
    let files_section = files
        .iter()
        .map(|(path, content)| format!("File: {path}\n```\n{content}\n```"))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Evaluate the following files:\n\n{files_section}\n\n\
         Original requirement:\n{requirement}\n\n\
         Output your evaluation in the JSON format specified in your system prompt."
    )
}
