//! Result feeds consumed by the grading engine.
//!
//! Test outcomes, coverage counters and warning signals are produced by
//! external tools; these types are their structured form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{normalize_unit, CoverageMethod, WarningSource};

/// Everything measured for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsFeed {
    #[serde(default)]
    pub tests: Vec<TestRun>,
    #[serde(default)]
    pub coverage: Option<CoverageFeed>,
    #[serde(default)]
    pub warnings: Vec<WarningSignal>,
}

/// Pass or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
}

/// The outcome(s) recorded for one test unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRun {
    /// Fully qualified test name.
    pub test: String,
    /// Outcome of a plain test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Outcomes of dynamically generated sub-cases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cases: Vec<SubCase>,
}

/// One generated sub-case of a test factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCase {
    #[serde(default)]
    pub name: String,
    pub outcome: Outcome,
}

impl TestRun {
    /// All recorded outcomes, the plain outcome first.
    pub fn outcomes(&self) -> impl Iterator<Item = Outcome> + '_ {
        self.outcome
            .into_iter()
            .chain(self.cases.iter().map(|c| c.outcome))
    }
}

/// Covered/missed pair for one counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub covered: u64,
    pub missed: u64,
}

impl Counter {
    pub fn total(&self) -> u64 {
        self.covered.saturating_add(self.missed)
    }
}

/// Raw coverage counters for one code unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCoverage {
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<Counter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Counter>,
}

impl UnitCoverage {
    /// The counter for the given method, if it was measured.
    pub fn counter(&self, method: CoverageMethod) -> Option<Counter> {
        match method {
            CoverageMethod::Lines => self.lines,
            CoverageMethod::Instructions => self.instructions,
        }
    }
}

/// A pre-aggregated coverage measurement for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageTotal {
    pub project: String,
    pub method: CoverageMethod,
    pub covered: u64,
    pub total: u64,
}

/// The coverage section of a results feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageFeed {
    #[serde(default)]
    pub units: Vec<UnitCoverage>,
    #[serde(default)]
    pub totals: Vec<CoverageTotal>,
}

/// Whether a warning source produced output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningSignal {
    pub source: WarningSource,
    /// Restricts the signal to one project; applies to all when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub produced_output: bool,
    /// Section label, e.g. "main" or "test".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl WarningSignal {
    /// A count collapses to a boolean: any warning at all counts.
    pub fn warned(&self) -> bool {
        self.produced_output || self.count > 0
    }

    pub fn applies_to(&self, project: &str) -> bool {
        self.project.as_deref().is_none_or(|p| p == project)
    }
}

/// Test runs indexed by test name.
///
/// Several runs for the same test are merged: their outcomes are appended.
#[derive(Debug, Clone, Default)]
pub struct TestIndex {
    runs: BTreeMap<String, Vec<Outcome>>,
}

impl TestIndex {
    pub fn build(runs: &[TestRun]) -> Self {
        let mut index = TestIndex::default();
        for run in runs {
            index
                .runs
                .entry(run.test.trim().to_string())
                .or_default()
                .extend(run.outcomes());
        }
        index
    }

    /// Outcomes recorded for a test; `None` if the test never ran.
    pub fn get(&self, test: &str) -> Option<&[Outcome]> {
        self.runs.get(test).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

impl CoverageFeed {
    /// Units with their paths normalized.
    pub fn normalized_units(&self) -> Vec<UnitCoverage> {
        self.units
            .iter()
            .map(|u| UnitCoverage {
                unit: normalize_unit(&u.unit),
                ..u.clone()
            })
            .collect()
    }
}
