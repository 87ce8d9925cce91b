//! Run reports: what a verification run produced, for human inspection.

use serde::Serialize;
use std::path::PathBuf;

/// Outcome of a single content check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub label: String,
    pub passed: bool,
}

impl CheckResult {
    pub fn new(label: impl Into<String>, passed: bool) -> Self {
        Self {
            label: label.into(),
            passed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed { error: String },
}

/// Everything one verification run produced.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub outcome: RunOutcome,
    pub screenshots: Vec<PathBuf>,
    pub checks: Vec<CheckResult>,
    pub console_errors: usize,
}

impl RunReport {
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            outcome: RunOutcome::Completed,
            screenshots: Vec::new(),
            checks: Vec::new(),
            console_errors: 0,
        }
    }

    pub fn failed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Failed { .. })
    }

    fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for check in &self.checks {
            if check.passed {
                lines.push(format!("SUCCESS: '{}' found.", check.label));
            } else {
                lines.push(format!("FAILURE: '{}' NOT found.", check.label));
            }
        }
        for path in &self.screenshots {
            lines.push(format!("Screenshot saved to {}", path.display()));
        }
        if self.console_errors > 0 {
            lines.push(format!(
                "Captured {} console error(s).",
                self.console_errors
            ));
        }
        match &self.outcome {
            RunOutcome::Completed => lines.push(format!("Run '{}' completed.", self.scenario)),
            RunOutcome::Failed { error } => {
                lines.push(format!("Run '{}' failed: {error}", self.scenario));
            }
        }
        lines
    }

    /// Print the summary to stdout; the transcript is the deliverable.
    pub fn print(&self) {
        for line in self.summary_lines() {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckResult, RunOutcome, RunReport};
    use std::path::PathBuf;

    fn sample() -> RunReport {
        let mut report = RunReport::new("ui");
        report.checks.push(CheckResult::new("Location", true));
        report
            .checks
            .push(CheckResult::new("The Great Pyramid", false));
        report
            .screenshots
            .push(PathBuf::from("verification/experience_ui.png"));
        report
    }

    #[test]
    fn check_lines_use_verification_wording() {
        let lines = sample().summary_lines();
        assert_eq!(lines[0], "SUCCESS: 'Location' found.");
        assert_eq!(lines[1], "FAILURE: 'The Great Pyramid' NOT found.");
    }

    #[test]
    fn completed_run_summarized_last() {
        let lines = sample().summary_lines();
        assert_eq!(lines.last().unwrap(), "Run 'ui' completed.");
    }

    #[test]
    fn failure_carries_the_error_text() {
        let mut report = RunReport::new("visuals");
        report.outcome = RunOutcome::Failed {
            error: String::from("navigation to http://localhost:3000 failed"),
        };
        assert!(report.failed());
        let last = report.summary_lines().pop().unwrap();
        assert!(last.starts_with("Run 'visuals' failed:"));
        assert!(last.contains("localhost:3000"));
    }

    #[test]
    fn console_errors_only_mentioned_when_present() {
        let mut report = sample();
        assert!(!report
            .summary_lines()
            .iter()
            .any(|l| l.contains("console error")));
        report.console_errors = 3;
        assert!(report
            .summary_lines()
            .iter()
            .any(|l| l == "Captured 3 console error(s)."));
    }

    #[test]
    fn json_shape_is_stable() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["scenario"], "ui");
        assert_eq!(value["outcome"]["status"], "completed");
        assert_eq!(value["checks"][0]["passed"], true);
        assert_eq!(value["console_errors"], 0);
    }
}
