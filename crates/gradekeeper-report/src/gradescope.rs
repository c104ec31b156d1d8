//! Gradescope `results.json` export.
//!
//! Every topic, graded coverage and graded warning component becomes one
//! Gradescope test case; the submission score is the sum of project totals,
//! so the clamping already applied to each project carries over.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradekeeper_core::coverage::CoverageStatus;
use gradekeeper_core::report::{ProjectReport, Report};
use gradekeeper_core::warnings::WarningStatus;

use crate::text::project_text;

/// Visibility settings for the submission and its test cases.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradescopeVisibility {
    Hidden,
    AfterDueDate,
    AfterPublished,
    Visible,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradescopeStatus {
    Passed,
    Failed,
}

/// The overall submission data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GradescopeSubmission {
    /// Overall score. Overrides the total of the test cases.
    pub score: f64,

    /// Text shown for the whole submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<GradescopeVisibility>,

    pub tests: Vec<GradescopeTestCase>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GradescopeTestCase {
    pub score: f64,
    pub max_score: f64,
    pub status: GradescopeStatus,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<GradescopeVisibility>,
}

fn status(passing: bool) -> GradescopeStatus {
    if passing {
        GradescopeStatus::Passed
    } else {
        GradescopeStatus::Failed
    }
}

/// Build the Gradescope submission for a report.
pub fn to_gradescope(report: &Report) -> GradescopeSubmission {
    let tests = report.projects.iter().flat_map(project_cases).collect();
    let output = report
        .projects
        .iter()
        .map(project_text)
        .collect::<String>();

    GradescopeSubmission {
        score: report.projects.iter().map(|p| p.points).sum(),
        output: Some(output),
        visibility: Some(GradescopeVisibility::Visible),
        tests,
    }
}

fn project_cases(project: &ProjectReport) -> Vec<GradescopeTestCase> {
    let mut cases = Vec::new();

    for topic in &project.topics {
        let failures: Vec<String> = topic
            .failures()
            .map(|t| format!("{} (-{:.1})", t.test, t.deducted))
            .collect();
        cases.push(GradescopeTestCase {
            score: topic.earned,
            max_score: topic.max_points,
            status: status(topic.passing),
            name: format!("{}: {}", project.name, topic.name),
            output: (!failures.is_empty()).then(|| failures.join("\n")),
            visibility: None,
        });
    }

    let coverage = &project.coverage;
    if coverage.status != CoverageStatus::NotGraded {
        cases.push(GradescopeTestCase {
            score: coverage.earned,
            max_score: coverage.possible,
            status: status(coverage.passing),
            name: format!("{}: Coverage", project.name),
            output: Some(match coverage.status {
                CoverageStatus::NoData => "no coverage data".to_string(),
                _ => format!(
                    "{:.1}% {} coverage, {}% required",
                    coverage.ratio * 100.0,
                    coverage.method,
                    coverage.required_percentage
                ),
            }),
            visibility: None,
        });
    }

    let warnings = &project.warnings;
    if warnings.status != WarningStatus::NotGraded {
        cases.push(GradescopeTestCase {
            score: warnings.possible - warnings.deducted,
            max_score: warnings.possible,
            status: status(warnings.passing),
            name: format!("{}: Warnings", project.name),
            output: None,
            visibility: None,
        });
    }

    cases
}

/// Write `results.json` for Gradescope.
pub fn write_gradescope_results(report: &Report, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&to_gradescope(report))
        .context("failed to serialize Gradescope results")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write Gradescope results to {}", path.display()))?;
    Ok(())
}
