//! Grade report types with JSON persistence and regression detection.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::coverage::CoverageReport;
use crate::topics::TopicReport;
use crate::warnings::WarningReport;

/// A complete grade report: one entry per project, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub projects: Vec<ProjectReport>,
}

/// The score of one project and how it was composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Resolved maximum.
    pub max_points: f64,
    pub max_points_derived: bool,
    pub topics: Vec<TopicReport>,
    pub coverage: CoverageReport,
    pub warnings: WarningReport,
    /// Topic scores plus coverage minus warnings, before clamping.
    pub raw_points: f64,
    /// Final score in `[0, max_points]`.
    pub points: f64,
    /// True when every topic, coverage and warnings all pass.
    pub passing: bool,
}

impl ProjectReport {
    pub fn topic(&self, name: &str) -> Option<&TopicReport> {
        self.topics.iter().find(|t| t.name == name)
    }
}

impl Report {
    pub fn project(&self, name: &str) -> Option<&ProjectReport> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn all_passing(&self) -> bool {
        self.projects.iter().all(|p| p.passing)
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        json.push('\n');
        Ok(json)
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: Report =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Compare this report against a baseline, project by project.
    ///
    /// A project regresses when it lost more than `threshold` points.
    pub fn compare(&self, baseline: &Report, threshold: f64) -> RegressionReport {
        let points = |report: &Report| -> BTreeMap<String, f64> {
            report
                .projects
                .iter()
                .map(|p| (p.name.clone(), p.points))
                .collect()
        };

        let baseline_points = points(baseline);
        let current_points = points(self);

        let mut regressions = Vec::new();
        let mut improvements = Vec::new();
        let mut unchanged = 0usize;
        let mut new_projects = Vec::new();

        for (project, &current) in &current_points {
            let Some(&before) = baseline_points.get(project) else {
                new_projects.push(project.clone());
                continue;
            };
            let change = ProjectChange {
                project: project.clone(),
                baseline_points: before,
                current_points: current,
                delta: current - before,
            };
            if change.delta < -threshold {
                regressions.push(change);
            } else if change.delta > threshold {
                improvements.push(change);
            } else {
                unchanged += 1;
            }
        }

        let removed_projects = baseline_points
            .keys()
            .filter(|k| !current_points.contains_key(*k))
            .cloned()
            .collect();

        RegressionReport {
            regressions,
            improvements,
            unchanged,
            new_projects,
            removed_projects,
        }
    }
}

/// Result of comparing two reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Projects whose score went down.
    pub regressions: Vec<ProjectChange>,
    /// Projects whose score went up.
    pub improvements: Vec<ProjectChange>,
    /// Projects with no significant change.
    pub unchanged: usize,
    /// Projects in current but not baseline.
    pub new_projects: Vec<String>,
    /// Projects in baseline but not current.
    pub removed_projects: Vec<String>,
}

/// A score change for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectChange {
    pub project: String,
    pub baseline_points: f64,
    pub current_points: f64,
    pub delta: f64,
}

impl RegressionReport {
    /// Format the regression report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} regressions, {} improvements, {} unchanged\n\n",
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged
        ));

        for (title, changes) in [
            ("Regressions", &self.regressions),
            ("Improvements", &self.improvements),
        ] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Project | Baseline | Current | Delta |\n");
            md.push_str("|---------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {:.2} | {:.2} | {:+.2} |\n",
                    c.project, c.baseline_points, c.current_points, c.delta
                ));
            }
            md.push('\n');
        }

        if !self.new_projects.is_empty() {
            md.push_str(&format!("New: {}\n", self.new_projects.join(", ")));
        }
        if !self.removed_projects.is_empty() {
            md.push_str(&format!("Removed: {}\n", self.removed_projects.join(", ")));
        }

        md
    }

    /// Plain-text rendering for the console.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for r in &self.regressions {
            out.push_str(&format!(
                "REGRESSION  {}: {:.2} -> {:.2} ({:+.2})\n",
                r.project, r.baseline_points, r.current_points, r.delta
            ));
        }
        for i in &self.improvements {
            out.push_str(&format!(
                "IMPROVEMENT {}: {:.2} -> {:.2} ({:+.2})\n",
                i.project, i.baseline_points, i.current_points, i.delta
            ));
        }
        for p in &self.new_projects {
            out.push_str(&format!("NEW         {p}\n"));
        }
        for p in &self.removed_projects {
            out.push_str(&format!("REMOVED     {p}\n"));
        }
        out.push_str(&format!(
            "{} regressions, {} improvements, {} unchanged\n",
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged
        ));
        out
    }

    /// Returns true if there are any regressions.
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}
