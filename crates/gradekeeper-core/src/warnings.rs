//! Warning evaluation.
//!
//! Any enabled source with warnings costs the full `warning_points`, once.
//! An enabled source with no signal at all is treated as missing data, which
//! costs the same but is reported separately.

use serde::{Deserialize, Serialize};

use crate::model::{ProjectDecl, WarningSource};
use crate::results::WarningSignal;

/// Which sources count for a project, and what warnings cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningPolicy {
    pub points: f64,
    /// Enabled sources, in [`WarningSource`] order.
    pub sources: Vec<WarningSource>,
}

impl WarningPolicy {
    pub fn from_decl(decl: &ProjectDecl) -> Self {
        let sources = WarningSource::ALL
            .into_iter()
            .filter(|source| match source {
                WarningSource::Compiler => decl.use_compiler_warnings,
                WarningSource::Linter => decl.use_linter,
                WarningSource::Formatter => decl.use_formatter,
            })
            .collect();
        Self {
            points: decl.warning_points,
            sources,
        }
    }

    pub fn uses(&self, source: WarningSource) -> bool {
        self.sources.contains(&source)
    }

    pub fn is_graded(&self) -> bool {
        self.points != 0.0
    }
}

/// Outcome of the warning component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStatus {
    NotGraded,
    Passed,
    Failed,
    NoData,
}

/// What one enabled source reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Clean,
    Warned,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: WarningSource,
    pub status: SourceStatus,
    /// Sum of reported warning counts.
    pub count: u64,
    /// Labels of the sections that warned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningReport {
    pub possible: f64,
    pub deducted: f64,
    pub status: WarningStatus,
    pub passing: bool,
    pub sources: Vec<SourceReport>,
}

/// Decide the warning deduction for one project.
pub fn evaluate_warnings(
    project: &str,
    policy: &WarningPolicy,
    signals: &[WarningSignal],
) -> WarningReport {
    let sources: Vec<SourceReport> = policy
        .sources
        .iter()
        .map(|&source| source_report(project, source, signals))
        .collect();

    let status = if !policy.is_graded() {
        WarningStatus::NotGraded
    } else if sources.iter().any(|s| s.status == SourceStatus::Warned) {
        WarningStatus::Failed
    } else if sources.iter().any(|s| s.status == SourceStatus::Missing) {
        WarningStatus::NoData
    } else {
        WarningStatus::Passed
    };

    let deducted = match status {
        WarningStatus::Failed | WarningStatus::NoData => policy.points,
        WarningStatus::NotGraded | WarningStatus::Passed => 0.0,
    };

    if status == WarningStatus::NoData {
        tracing::warn!(project, "no warning signal for an enabled source");
    }

    WarningReport {
        possible: policy.points,
        deducted,
        passing: matches!(status, WarningStatus::NotGraded | WarningStatus::Passed),
        status,
        sources,
    }
}

fn source_report(project: &str, source: WarningSource, signals: &[WarningSignal]) -> SourceReport {
    let matching: Vec<&WarningSignal> = signals
        .iter()
        .filter(|s| s.source == source && s.applies_to(project))
        .collect();

    if matching.is_empty() {
        return SourceReport {
            source,
            status: SourceStatus::Missing,
            count: 0,
            labels: Vec::new(),
        };
    }

    let warned: Vec<&&WarningSignal> = matching.iter().filter(|s| s.warned()).collect();
    let mut labels: Vec<String> = warned.iter().filter_map(|s| s.label.clone()).collect();
    labels.sort();
    labels.dedup();

    SourceReport {
        source,
        status: if warned.is_empty() {
            SourceStatus::Clean
        } else {
            SourceStatus::Warned
        },
        count: matching
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.count)),
        labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(points: f64) -> WarningPolicy {
        WarningPolicy::from_decl(&ProjectDecl {
            warning_points: points,
            ..ProjectDecl::named("TP1")
        })
    }

    fn signal(source: WarningSource, count: u64) -> WarningSignal {
        WarningSignal {
            source,
            project: None,
            count,
            produced_output: false,
            label: None,
        }
    }

    fn all_clean() -> Vec<WarningSignal> {
        WarningSource::ALL.into_iter().map(|s| signal(s, 0)).collect()
    }

    #[test]
    fn clean_sources_cost_nothing() {
        let report = evaluate_warnings("TP1", &policy(1.0), &all_clean());
        assert_eq!(report.status, WarningStatus::Passed);
        assert_eq!(report.deducted, 0.0);
        assert!(report.passing);
    }

    #[test]
    fn one_warning_deducts_once() {
        let mut signals = all_clean();
        signals[1].count = 7;
        signals[2].produced_output = true;
        let report = evaluate_warnings("TP1", &policy(2.0), &signals);
        assert_eq!(report.status, WarningStatus::Failed);
        assert_eq!(report.deducted, 2.0);
        assert!(!report.passing);
    }

    #[test]
    fn huge_counts_saturate() {
        let mut signals = all_clean();
        signals[0].count = u64::MAX;
        signals.push(signal(WarningSource::Compiler, 3));
        let report = evaluate_warnings("TP1", &policy(1.0), &signals);
        assert_eq!(report.sources[0].count, u64::MAX);
        assert_eq!(report.status, WarningStatus::Failed);
    }

    #[test]
    fn zero_points_is_not_graded() {
        let mut signals = all_clean();
        signals[0].count = 1;
        let report = evaluate_warnings("TP1", &policy(0.0), &signals);
        assert_eq!(report.status, WarningStatus::NotGraded);
        assert_eq!(report.deducted, 0.0);
        assert!(report.passing);
    }

    #[test]
    fn disabled_source_is_ignored() {
        let decl = ProjectDecl {
            warning_points: 1.0,
            use_formatter: false,
            ..ProjectDecl::named("TP1")
        };
        let policy = WarningPolicy::from_decl(&decl);
        assert!(!policy.uses(WarningSource::Formatter));
        let signals = vec![
            signal(WarningSource::Compiler, 0),
            signal(WarningSource::Linter, 0),
            signal(WarningSource::Formatter, 12),
        ];
        let report = evaluate_warnings("TP1", &policy, &signals);
        assert_eq!(report.status, WarningStatus::Passed);
        assert_eq!(report.sources.len(), 2);
    }

    #[test]
    fn missing_source_is_no_data() {
        let signals = vec![signal(WarningSource::Compiler, 0)];
        let report = evaluate_warnings("TP1", &policy(1.0), &signals);
        assert_eq!(report.status, WarningStatus::NoData);
        assert_eq!(report.deducted, 1.0);
        assert_eq!(report.sources[1].status, SourceStatus::Missing);
    }

    #[test]
    fn warned_beats_missing() {
        let signals = vec![signal(WarningSource::Compiler, 3)];
        let report = evaluate_warnings("TP1", &policy(1.0), &signals);
        assert_eq!(report.status, WarningStatus::Failed);
    }

    #[test]
    fn signals_for_other_projects_do_not_count() {
        let mut signals = all_clean();
        signals.push(WarningSignal {
            project: Some("TP2".into()),
            ..signal(WarningSource::Linter, 4)
        });
        let report = evaluate_warnings("TP1", &policy(1.0), &signals);
        assert_eq!(report.status, WarningStatus::Passed);
    }

    #[test]
    fn labelled_sections_are_reported() {
        let mut signals = all_clean();
        signals[1].label = Some("main".into());
        signals.push(WarningSignal {
            label: Some("test".into()),
            ..signal(WarningSource::Linter, 2)
        });
        let report = evaluate_warnings("TP1", &policy(1.0), &signals);
        let linter = &report.sources[1];
        assert_eq!(linter.status, SourceStatus::Warned);
        assert_eq!(linter.count, 2);
        assert_eq!(linter.labels, vec!["test".to_string()]);
    }
}
