//! Configuration error types.
//!
//! These errors are raised while resolving a grading manifest, before any
//! scoring runs. A manifest that produces one of them is never graded.

use thiserror::Error;

/// Fatal problems found while resolving a grading manifest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A topic, grade entry, or coverage declaration names a project that was
    /// never declared.
    #[error("{context} references unknown project '{project}'")]
    UnknownProject { context: String, project: String },

    /// A grade entry names a topic that was never declared for its project.
    #[error("test '{test}' references unknown topic '{topic}' in project '{project}'")]
    UnknownTopic {
        project: String,
        topic: String,
        test: String,
    },

    /// The same project name was declared twice with different settings.
    #[error("project '{0}' is declared more than once with conflicting settings")]
    ConflictingProject(String),

    /// The same topic was declared twice with different explicit maxima.
    #[error("topic '{topic}' in project '{project}' is declared more than once with conflicting max_points")]
    ConflictingTopic { project: String, topic: String },

    /// `coverage_percentage` outside of 0..=100.
    #[error("project '{project}' has coverage_percentage {percentage}, which must be between 0 and 100")]
    InvalidPercentage { project: String, percentage: u32 },

    /// A point value that is NaN or infinite.
    #[error("{context} in project '{project}' is not a finite number")]
    NonFinitePoints { context: String, project: String },

    /// A test factory entry without a cap on its total deduction.
    #[error("test factory '{test}' in project '{project}' needs a positive max_points")]
    FactoryWithoutCap { project: String, test: String },

    /// The same test is graded twice for one project.
    #[error("test '{test}' has more than one grade entry for project '{project}'")]
    DuplicateGrade { project: String, test: String },

    /// A test is declared as a plain test in one entry and a factory in another.
    #[error("test '{0}' is declared both as a plain test and as a test factory")]
    ConflictingTestKind(String),

    /// Two coverage declarations on the same unit disagree about exclusion.
    #[error("unit '{unit}' has conflicting coverage declarations for project '{project}'")]
    ConflictingScope { project: String, unit: String },
}

impl ConfigError {
    /// The project this error is about, if it names one.
    pub fn project(&self) -> Option<&str> {
        match self {
            ConfigError::UnknownProject { project, .. }
            | ConfigError::UnknownTopic { project, .. }
            | ConfigError::ConflictingTopic { project, .. }
            | ConfigError::InvalidPercentage { project, .. }
            | ConfigError::NonFinitePoints { project, .. }
            | ConfigError::FactoryWithoutCap { project, .. }
            | ConfigError::DuplicateGrade { project, .. }
            | ConfigError::ConflictingScope { project, .. } => Some(project),
            ConfigError::ConflictingProject(project) => Some(project),
            ConfigError::ConflictingTestKind(_) => None,
        }
    }
}
