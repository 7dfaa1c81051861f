//! Evaluation results and the end-of-run summary.

use console::style;
use serde::{Deserialize, Serialize};

use crate::orchestrator::RunPhase;
use crate::task::{PlanSource, TaskId};

/// One finding from the evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationIssue {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
}

/// Quality assessment of the generated artifacts.
///
/// `overall_score` and `passed` are deliberately required: an evaluator
/// response missing them fails the structured parse and is scored
/// heuristically instead, so a field-less JSON object can never pose as
/// a genuine assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub overall_score: u32,
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<EvaluationIssue>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// True when the structured evaluation could not be obtained and this
    /// report was derived heuristically from raw text
    #[serde(default)]
    pub fallback: bool,
}

impl EvaluationReport {
    /// Derive a coarse report from unstructured evaluator text. Always
    /// marked as a fallback so downstream consumers can tell it apart
    /// from a real structured assessment.
    pub fn heuristic(text: &str) -> Self {
        let lower = text.to_lowercase();
        let positive = ["good", "complete", "well", "correct", "passes"]
            .iter()
            .any(|w| lower.contains(w));
        let negative = ["error", "missing", "broken", "fail"]
            .iter()
            .any(|w| lower.contains(w));

        let mut score: i32 = if positive { 70 } else { 50 };
        if negative {
            score -= 20;
        }
        let score = score.max(0) as u32;

        Self {
            overall_score: score,
            passed: score >= 60,
            issues: Vec::new(),
            strengths: Vec::new(),
            recommendations: Vec::new(),
            fallback: true,
        }
    }
}

/// A failed task and the kind of error that failed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTask {
    pub task_id: TaskId,
    pub error_kind: String,
}

/// Everything the run produced, for the CLI summary and the exit code.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub phase: RunPhase,
    pub provider: String,
    pub plan_source: PlanSource,
    pub project_name: String,
    pub completed: Vec<TaskId>,
    pub failed: Vec<FailedTask>,
    /// Tasks unrunnable because a dependency failed
    pub blocked: Vec<TaskId>,
    /// Tasks still satisfiable when the run ended
    pub never_attempted: Vec<TaskId>,
    pub created_files: Vec<String>,
    pub evaluation: Option<EvaluationReport>,
    pub iterations_used: u32,
}

impl RunReport {
    /// A run succeeds when it finished its phases and every planned task
    /// completed.
    pub fn succeeded(&self) -> bool {
        self.phase == RunPhase::Done
            && self.failed.is_empty()
            && self.blocked.is_empty()
            && self.never_attempted.is_empty()
    }

    /// Human-readable summary block printed at the end of a run.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{}\n",
            style("run summary").bold().underlined()
        ));
        out.push_str(&format!("  project:   {}\n", self.project_name));
        out.push_str(&format!("  provider:  {}\n", self.provider));
        out.push_str(&format!("  phase:     {}\n", self.phase));
        out.push_str(&format!("  plan:      {:?}\n", self.plan_source));
        out.push_str(&format!(
            "  tasks:     {} completed",
            style(self.completed.len()).green()
        ));
        if !self.failed.is_empty() {
            out.push_str(&format!(", {} failed", style(self.failed.len()).red()));
        }
        if !self.blocked.is_empty() {
            out.push_str(&format!(", {} blocked", style(self.blocked.len()).yellow()));
        }
        if !self.never_attempted.is_empty() {
            out.push_str(&format!(
                ", {} not attempted",
                style(self.never_attempted.len()).yellow()
            ));
        }
        out.push('\n');
        for failed in &self.failed {
            out.push_str(&format!(
                "    task {} failed ({})\n",
                failed.task_id,
                style(&failed.error_kind).red()
            ));
        }
        if !self.created_files.is_empty() {
            out.push_str("  files:\n");
            for file in &self.created_files {
                out.push_str(&format!("    {file}\n"));
            }
        }
        if let Some(eval) = &self.evaluation {
            let verdict = if eval.passed {
                style("passed").green()
            } else {
                style("needs improvement").yellow()
            };
            let origin = if eval.fallback { " (heuristic)" } else { "" };
            out.push_str(&format!(
                "  score:     {}/100 {verdict}{origin}\n",
                eval.overall_score
            ));
        }
        out.push_str(&format!("  iterations: {}\n", self.iterations_used));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_positive_text_passes() {
        let report = EvaluationReport::heuristic("The site looks good and complete.");
        assert_eq!(report.overall_score, 70);
        assert!(report.passed);
        assert!(report.fallback);
    }

    #[test]
    fn test_heuristic_negative_text_fails() {
        let report = EvaluationReport::heuristic("Several files are missing.");
        assert_eq!(report.overall_score, 30);
        assert!(!report.passed);
    }

    #[test]
    fn test_heuristic_mixed_text_sits_at_pass_boundary() {
        let report = EvaluationReport::heuristic("Good overall but one link is broken.");
        assert_eq!(report.overall_score, 50);
        assert!(!report.passed);
    }

    #[test]
    fn test_object_without_score_fails_structured_parse() {
        // A JSON object that is not an assessment must not deserialize
        // into a zero-score non-fallback report.
        for body in [
            r#"{"assessment": "looks good"}"#,
            r#"{}"#,
            r#"{"overall_score": 50}"#,
        ] {
            assert!(
                serde_json::from_str::<EvaluationReport>(body).is_err(),
                "{body} must not parse as a structured report"
            );
        }
    }

    #[test]
    fn test_structured_report_parses_without_fallback_field() {
        let json = r#"{"overall_score": 86, "passed": true, "issues": [],
                       "strengths": ["clean layout"], "recommendations": []}"#;
        let report: EvaluationReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.overall_score, 86);
        assert!(!report.fallback);
    }

    #[test]
    fn test_succeeded_requires_done_and_no_leftovers() {
        let mut report = RunReport {
            phase: RunPhase::Done,
            provider: "mock".into(),
            plan_source: PlanSource::Model,
            project_name: "demo".into(),
            completed: vec![1, 2],
            failed: vec![],
            blocked: vec![],
            never_attempted: vec![],
            created_files: vec!["index.html".into()],
            evaluation: None,
            iterations_used: 2,
        };
        assert!(report.succeeded());

        report.never_attempted.push(3);
        assert!(!report.succeeded());
    }

    #[test]
    fn test_render_mentions_failures_and_files() {
        let report = RunReport {
            phase: RunPhase::Done,
            provider: "mock".into(),
            plan_source: PlanSource::Fallback,
            project_name: "demo".into(),
            completed: vec![1],
            failed: vec![FailedTask {
                task_id: 2,
                error_kind: "no_artifact".into(),
            }],
            blocked: vec![3],
            never_attempted: vec![],
            created_files: vec!["index.html".into()],
            evaluation: Some(EvaluationReport::heuristic("good")),
            iterations_used: 4,
        };
        let rendered = report.render();
        assert!(rendered.contains("no_artifact"));
        assert!(rendered.contains("index.html"));
        assert!(rendered.contains("heuristic"));
    }
}
