//! Core data model types for gradekeeper.
//!
//! These are the declaration records a grading manifest is made of: projects,
//! topics, per-test grade entries, and coverage scope declarations. They are
//! plain lists; repeated declarations are merged later by
//! [`crate::resolve::resolve_manifest`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A complete grading manifest, as extracted from annotated test code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub projects: Vec<ProjectDecl>,
    #[serde(default)]
    pub topics: Vec<TopicDecl>,
    #[serde(default)]
    pub grades: Vec<GradeDecl>,
    #[serde(default)]
    pub coverage: Vec<CoverageDecl>,
}

/// A top-level gradable unit (an assignment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDecl {
    /// Unique project name (e.g. "Week1").
    pub name: String,
    /// Description shown in the report header.
    #[serde(default)]
    pub description: String,
    /// Explicit maximum; derived from the topics when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<f64>,
    /// Deducted once if any enabled warning source reports warnings.
    #[serde(default)]
    pub warning_points: f64,
    /// Whether compiler warnings count toward the warning deduction.
    #[serde(default = "default_true")]
    pub use_compiler_warnings: bool,
    /// Whether linter (checkstyle-like) findings count.
    #[serde(default = "default_true")]
    pub use_linter: bool,
    /// Whether formatter (google-java-format-like) findings count.
    #[serde(default = "default_true")]
    pub use_formatter: bool,
    /// Awarded when the coverage threshold is met.
    #[serde(default)]
    pub coverage_points: f64,
    /// Required coverage, as an integer percentage.
    #[serde(default)]
    pub coverage_percentage: u32,
    /// Which coverage counter the threshold applies to.
    #[serde(default)]
    pub coverage_method: CoverageMethod,
}

fn default_true() -> bool {
    true
}

impl ProjectDecl {
    /// A project with the given name and every other setting at its default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            max_points: None,
            warning_points: 0.0,
            use_compiler_warnings: true,
            use_linter: true,
            use_formatter: true,
            coverage_points: 0.0,
            coverage_percentage: 0,
            coverage_method: CoverageMethod::default(),
        }
    }
}

/// A named sub-category of a project's points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDecl {
    pub project: String,
    pub topic: String,
    /// Explicit maximum; derived from the bound grade entries when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<f64>,
}

/// Binds one test unit to a project topic with a point value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDecl {
    /// Fully qualified test name, e.g. `edu.rice.TestProject1.test1`.
    pub test: String,
    #[serde(default)]
    pub kind: TestKind,
    pub project: String,
    pub topic: String,
    /// Deduction per failing test (or per failing factory sub-case).
    pub points: f64,
    /// Cap on the total deduction of a test factory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<f64>,
}

impl GradeDecl {
    /// What this entry contributes to a derived topic maximum.
    pub fn weight(&self) -> f64 {
        match self.kind {
            TestKind::Test => self.points,
            TestKind::Factory => self.max_points.unwrap_or(0.0),
        }
    }
}

/// Marks a code unit (package or type) as in or out of coverage scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageDecl {
    pub project: String,
    /// Package or (possibly nested) type path.
    pub unit: String,
    #[serde(default)]
    pub exclude: bool,
}

/// Plain test or dynamic test factory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    #[default]
    Test,
    Factory,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::Test => write!(f, "test"),
            TestKind::Factory => write!(f, "factory"),
        }
    }
}

/// The counter a coverage threshold is measured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageMethod {
    #[default]
    Lines,
    Instructions,
}

impl fmt::Display for CoverageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageMethod::Lines => write!(f, "lines"),
            CoverageMethod::Instructions => write!(f, "instructions"),
        }
    }
}

impl FromStr for CoverageMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lines" | "line" => Ok(CoverageMethod::Lines),
            "instructions" | "instruction" => Ok(CoverageMethod::Instructions),
            other => Err(format!("unknown coverage method: {other}")),
        }
    }
}

/// An external checker whose output can trigger the warning deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSource {
    Compiler,
    Linter,
    Formatter,
}

impl WarningSource {
    pub const ALL: [WarningSource; 3] = [
        WarningSource::Compiler,
        WarningSource::Linter,
        WarningSource::Formatter,
    ];
}

impl fmt::Display for WarningSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningSource::Compiler => write!(f, "compiler"),
            WarningSource::Linter => write!(f, "linter"),
            WarningSource::Formatter => write!(f, "formatter"),
        }
    }
}

impl FromStr for WarningSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compiler" | "javac" => Ok(WarningSource::Compiler),
            "linter" | "checkstyle" => Ok(WarningSource::Linter),
            "formatter" | "google-java-format" => Ok(WarningSource::Formatter),
            other => Err(format!("unknown warning source: {other}")),
        }
    }
}

/// Normalize a code unit path: bytecode separators (`/`, `$`) become `.`.
pub fn normalize_unit(unit: &str) -> String {
    unit.trim().replace(['/', '$'], ".")
}
