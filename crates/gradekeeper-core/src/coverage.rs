//! Coverage evaluation.
//!
//! The threshold is all-or-nothing and compared in integers, so a measured
//! ratio exactly equal to the required percentage passes.

use serde::{Deserialize, Serialize};

use crate::model::{CoverageMethod, ProjectDecl};
use crate::results::CoverageFeed;
use crate::scope::ScopeResolver;

/// A project's coverage requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveragePolicy {
    pub points: f64,
    pub percentage: u32,
    pub method: CoverageMethod,
}

impl CoveragePolicy {
    pub fn from_decl(decl: &ProjectDecl) -> Self {
        Self {
            points: decl.coverage_points,
            percentage: decl.coverage_percentage,
            method: decl.coverage_method,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.points != 0.0
    }

    /// `covered / total * 100 >= percentage`, exactly. An empty measurement
    /// has ratio zero.
    pub fn is_met(&self, covered: u64, total: u64) -> bool {
        if total == 0 {
            return self.percentage == 0;
        }
        u128::from(covered) * 100 >= u128::from(self.percentage) * u128::from(total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    NotGraded,
    Met,
    BelowThreshold,
    NoData,
}

/// Where a measurement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementSource {
    Totals,
    Units,
}

/// One included unit and its counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit: String,
    pub covered: u64,
    pub total: u64,
    /// The scope declaration that included this unit.
    pub declared_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub possible: f64,
    pub earned: f64,
    pub status: CoverageStatus,
    pub passing: bool,
    pub method: CoverageMethod,
    pub required_percentage: u32,
    pub covered: u64,
    pub total: u64,
    pub ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MeasurementSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<UnitReport>,
}

struct Measurement {
    covered: u64,
    total: u64,
    source: MeasurementSource,
    units: Vec<UnitReport>,
}

/// Decide the coverage score for one project.
pub fn evaluate_coverage(
    project: &str,
    policy: &CoveragePolicy,
    scopes: &ScopeResolver,
    feed: Option<&CoverageFeed>,
) -> CoverageReport {
    let measurement = feed.and_then(|feed| measure(project, policy.method, scopes, feed));

    let status = match &measurement {
        _ if !policy.is_graded() => CoverageStatus::NotGraded,
        None => CoverageStatus::NoData,
        Some(m) if policy.is_met(m.covered, m.total) => CoverageStatus::Met,
        Some(_) => CoverageStatus::BelowThreshold,
    };

    match status {
        CoverageStatus::NoData => {
            tracing::warn!(project, method = %policy.method, "no coverage data")
        }
        CoverageStatus::BelowThreshold => tracing::info!(
            project,
            required = policy.percentage,
            "coverage below threshold"
        ),
        _ => {}
    }

    let earned = if status == CoverageStatus::Met {
        policy.points
    } else {
        0.0
    };

    let (covered, total, source, units) = match measurement {
        Some(m) => (m.covered, m.total, Some(m.source), m.units),
        None => (0, 0, None, Vec::new()),
    };

    CoverageReport {
        possible: policy.points,
        earned,
        passing: matches!(status, CoverageStatus::NotGraded | CoverageStatus::Met),
        status,
        method: policy.method,
        required_percentage: policy.percentage,
        covered,
        total,
        ratio: if total == 0 {
            0.0
        } else {
            covered as f64 / total as f64
        },
        source,
        units,
    }
}

/// A per-project total takes precedence over unit data, unless it was
/// measured with a different method.
fn measure(
    project: &str,
    method: CoverageMethod,
    scopes: &ScopeResolver,
    feed: &CoverageFeed,
) -> Option<Measurement> {
    for total in feed.totals.iter().filter(|t| t.project == project) {
        if total.method == method {
            return Some(Measurement {
                covered: total.covered,
                total: total.total,
                source: MeasurementSource::Totals,
                units: Vec::new(),
            });
        }
        tracing::warn!(
            project,
            expected = %method,
            found = %total.method,
            "ignoring coverage total measured with a different method"
        );
    }

    let measured: Vec<_> = feed
        .normalized_units()
        .into_iter()
        .filter_map(|u| u.counter(method).map(|c| (u.unit, c)))
        .collect();
    if measured.is_empty() {
        return None;
    }

    let mut units: Vec<UnitReport> = measured
        .into_iter()
        .filter_map(|(unit, counter)| {
            let decision = scopes.resolve(&unit);
            match (decision.included, decision.declared_at) {
                (true, Some(declared_at)) => Some(UnitReport {
                    unit,
                    covered: counter.covered,
                    total: counter.total(),
                    declared_at,
                }),
                _ => None,
            }
        })
        .collect();
    units.sort_by(|a, b| a.unit.cmp(&b.unit));

    tracing::debug!(project, included = units.len(), "measured coverage from units");

    Some(Measurement {
        covered: units.iter().fold(0u64, |acc, u| acc.saturating_add(u.covered)),
        total: units.iter().fold(0u64, |acc, u| acc.saturating_add(u.total)),
        source: MeasurementSource::Units,
        units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CoverageDecl;
    use crate::results::{Counter, CoverageTotal, UnitCoverage};

    fn policy(points: f64, percentage: u32) -> CoveragePolicy {
        CoveragePolicy {
            points,
            percentage,
            method: CoverageMethod::Lines,
        }
    }

    fn scopes(decls: &[(&str, bool)]) -> ScopeResolver {
        let decls: Vec<CoverageDecl> = decls
            .iter()
            .map(|(unit, exclude)| CoverageDecl {
                project: "P".into(),
                unit: unit.to_string(),
                exclude: *exclude,
            })
            .collect();
        ScopeResolver::new("P", &decls).unwrap()
    }

    fn unit(name: &str, covered: u64, missed: u64) -> UnitCoverage {
        UnitCoverage {
            unit: name.into(),
            lines: Some(Counter { covered, missed }),
            instructions: None,
        }
    }

    fn totals(covered: u64, total: u64) -> CoverageFeed {
        CoverageFeed {
            units: vec![],
            totals: vec![CoverageTotal {
                project: "P".into(),
                method: CoverageMethod::Lines,
                covered,
                total,
            }],
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let p = policy(1.0, 80);
        assert!(p.is_met(80, 100));
        assert!(p.is_met(4, 5));
        assert!(!p.is_met(79_999, 100_000));
        assert!(p.is_met(80_000, 100_000));
    }

    #[test]
    fn empty_measurement_has_zero_ratio() {
        assert!(!policy(1.0, 1).is_met(0, 0));
        assert!(policy(1.0, 0).is_met(0, 0));
    }

    #[test]
    fn just_below_threshold_earns_nothing() {
        let feed = totals(79_999, 100_000);
        let report = evaluate_coverage("P", &policy(3.0, 80), &scopes(&[]), Some(&feed));
        assert_eq!(report.status, CoverageStatus::BelowThreshold);
        assert_eq!(report.earned, 0.0);
        assert!(!report.passing);
    }

    #[test]
    fn exact_threshold_earns_full_points() {
        let feed = totals(80_000, 100_000);
        let report = evaluate_coverage("P", &policy(3.0, 80), &scopes(&[]), Some(&feed));
        assert_eq!(report.status, CoverageStatus::Met);
        assert_eq!(report.earned, 3.0);
        assert_eq!(report.source, Some(MeasurementSource::Totals));
    }

    #[test]
    fn huge_unit_counters_saturate() {
        let feed = CoverageFeed {
            units: vec![unit("a.B", u64::MAX, 1), unit("a.C", 5, 5)],
            totals: vec![],
        };
        let report = evaluate_coverage("P", &policy(1.0, 50), &scopes(&[("a", false)]), Some(&feed));
        assert_eq!(report.covered, u64::MAX);
        assert_eq!(report.total, u64::MAX);
        assert_eq!(report.units[0].total, u64::MAX);
        assert_eq!(report.status, CoverageStatus::Met);
    }

    #[test]
    fn missing_feed_is_no_data() {
        let report = evaluate_coverage("P", &policy(1.0, 50), &scopes(&[]), None);
        assert_eq!(report.status, CoverageStatus::NoData);
        assert_eq!(report.earned, 0.0);
        assert!(!report.passing);
    }

    #[test]
    fn zero_points_is_not_graded() {
        let feed = totals(0, 10);
        let report = evaluate_coverage("P", &policy(0.0, 80), &scopes(&[]), Some(&feed));
        assert_eq!(report.status, CoverageStatus::NotGraded);
        assert!(report.passing);
        assert_eq!(report.total, 10);
    }

    #[test]
    fn units_are_filtered_by_scope() {
        let feed = CoverageFeed {
            units: vec![
                unit("edu.rice.sort.HeapSort", 9, 1),
                unit("edu/rice/sort/PatienceSort$Pile", 0, 10),
                unit("edu.rice.regex.Patterns", 0, 50),
            ],
            totals: vec![],
        };
        let scopes = scopes(&[("edu.rice.sort", false), ("edu.rice.sort.PatienceSort", true)]);
        let report = evaluate_coverage("P", &policy(1.0, 90), &scopes, Some(&feed));
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.units[0].declared_at, "edu.rice.sort");
        assert_eq!((report.covered, report.total), (9, 10));
        assert_eq!(report.status, CoverageStatus::Met);
        assert_eq!(report.source, Some(MeasurementSource::Units));
    }

    #[test]
    fn nothing_included_is_zero_ratio() {
        let feed = CoverageFeed {
            units: vec![unit("a.B", 5, 5)],
            totals: vec![],
        };
        let report = evaluate_coverage("P", &policy(1.0, 10), &scopes(&[]), Some(&feed));
        assert_eq!(report.status, CoverageStatus::BelowThreshold);
        assert_eq!(report.ratio, 0.0);
    }

    #[test]
    fn total_with_other_method_falls_back_to_units() {
        let feed = CoverageFeed {
            units: vec![unit("a.B", 1, 1)],
            totals: vec![CoverageTotal {
                project: "P".into(),
                method: CoverageMethod::Instructions,
                covered: 100,
                total: 100,
            }],
        };
        let report = evaluate_coverage("P", &policy(1.0, 60), &scopes(&[("a", false)]), Some(&feed));
        assert_eq!(report.source, Some(MeasurementSource::Units));
        assert_eq!(report.status, CoverageStatus::BelowThreshold);
    }

    #[test]
    fn units_without_the_method_counter_are_no_data() {
        let feed = CoverageFeed {
            units: vec![UnitCoverage {
                unit: "a.B".into(),
                lines: None,
                instructions: Some(Counter {
                    covered: 1,
                    missed: 0,
                }),
            }],
            totals: vec![],
        };
        let report = evaluate_coverage("P", &policy(1.0, 60), &scopes(&[("a", false)]), Some(&feed));
        assert_eq!(report.status, CoverageStatus::NoData);
    }
}
