//! Manifest resolution.
//!
//! Turns the flat declaration lists of a [`Manifest`] into resolved projects:
//! repeated declarations merged, references checked, coverage scopes indexed,
//! and missing maxima derived. Derived maxima are computed once here, from
//! the declarations alone, and never change during grading.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::coverage::CoveragePolicy;
use crate::error::ConfigError;
use crate::model::{
    CoverageDecl, GradeDecl, Manifest, ProjectDecl, TestKind, TopicDecl, WarningSource,
};
use crate::results::ResultsFeed;
use crate::scope::ScopeResolver;
use crate::warnings::WarningPolicy;

/// All projects of a manifest, resolved and sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedManifest {
    pub projects: Vec<ResolvedProject>,
}

/// A project with every reference checked and every maximum known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProject {
    pub name: String,
    pub description: String,
    pub max_points: f64,
    /// True when `max_points` was derived from the topics.
    pub max_points_derived: bool,
    pub warnings: WarningPolicy,
    pub coverage: CoveragePolicy,
    pub scopes: ScopeResolver,
    pub topics: Vec<ResolvedTopic>,
}

/// A topic with its resolved maximum and bound tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTopic {
    pub name: String,
    pub max_points: f64,
    pub max_points_derived: bool,
    /// Bound tests, sorted by test name.
    pub tests: Vec<GradedTest>,
}

/// One grade entry as seen from its topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedTest {
    pub test: String,
    pub kind: TestKind,
    pub points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<f64>,
}

impl ResolvedManifest {
    pub fn project(&self, name: &str) -> Option<&ResolvedProject> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn project_names(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.name.as_str()).collect()
    }

    /// Keep only the named project. Returns false if it does not exist.
    pub fn retain_project(&mut self, name: &str) -> bool {
        self.projects.retain(|p| p.name == name);
        !self.projects.is_empty()
    }

    /// Reject feed entries tagged with a project the manifest never declared.
    pub fn check_feed(&self, feed: &ResultsFeed) -> Result<(), ConfigError> {
        let unknown = |project: &str| self.project(project).is_none();
        for signal in &feed.warnings {
            if let Some(project) = signal.project.as_deref().filter(|p| unknown(*p)) {
                return Err(ConfigError::UnknownProject {
                    context: format!("{} warning signal", signal.source),
                    project: project.to_string(),
                });
            }
        }
        for total in feed.coverage.iter().flat_map(|c| &c.totals) {
            if unknown(&total.project) {
                return Err(ConfigError::UnknownProject {
                    context: format!("{} coverage total", total.method),
                    project: total.project.clone(),
                });
            }
        }
        Ok(())
    }

    /// Write the resolved policy back out as a manifest, with every derived
    /// maximum made explicit. Resolving the result yields the same policy.
    pub fn to_manifest(&self) -> Manifest {
        let mut manifest = Manifest::default();
        for project in &self.projects {
            manifest.projects.push(ProjectDecl {
                name: project.name.clone(),
                description: project.description.clone(),
                max_points: Some(project.max_points),
                warning_points: project.warnings.points,
                use_compiler_warnings: project.warnings.uses(WarningSource::Compiler),
                use_linter: project.warnings.uses(WarningSource::Linter),
                use_formatter: project.warnings.uses(WarningSource::Formatter),
                coverage_points: project.coverage.points,
                coverage_percentage: project.coverage.percentage,
                coverage_method: project.coverage.method,
            });
            for topic in &project.topics {
                manifest.topics.push(TopicDecl {
                    project: project.name.clone(),
                    topic: topic.name.clone(),
                    max_points: Some(topic.max_points),
                });
                for test in &topic.tests {
                    manifest.grades.push(GradeDecl {
                        test: test.test.clone(),
                        kind: test.kind,
                        project: project.name.clone(),
                        topic: topic.name.clone(),
                        points: test.points,
                        max_points: test.max_points,
                    });
                }
            }
            for (unit, exclude) in project.scopes.declarations() {
                manifest.coverage.push(CoverageDecl {
                    project: project.name.clone(),
                    unit: unit.to_string(),
                    exclude,
                });
            }
        }
        manifest
    }
}

impl ResolvedProject {
    pub fn topic(&self, name: &str) -> Option<&ResolvedTopic> {
        self.topics.iter().find(|t| t.name == name)
    }
}

/// Resolve a manifest, failing on the first configuration error.
pub fn resolve_manifest(manifest: &Manifest) -> Result<ResolvedManifest, ConfigError> {
    let projects = merge_projects(&manifest.projects)?;
    let topics = merge_topics(&manifest.topics, &projects)?;
    let grades = bind_grades(&manifest.grades, &projects, &topics)?;

    let mut scopes: BTreeMap<&str, Vec<&CoverageDecl>> = BTreeMap::new();
    for decl in &manifest.coverage {
        if !projects.contains_key(decl.project.as_str()) {
            return Err(ConfigError::UnknownProject {
                context: format!("coverage declaration on '{}'", decl.unit),
                project: decl.project.clone(),
            });
        }
        scopes.entry(decl.project.as_str()).or_default().push(decl);
    }

    let mut resolved = Vec::with_capacity(projects.len());
    for (name, decl) in &projects {
        let resolved_topics: Vec<ResolvedTopic> = topics
            .iter()
            .filter(|((project, _), _)| project.as_str() == *name)
            .map(|((_, topic), max_points)| {
                let entries = grades
                    .get(&(*name, topic.as_str()))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let mut tests: Vec<GradedTest> = entries
                    .iter()
                    .map(|g| GradedTest {
                        test: g.test.trim().to_string(),
                        kind: g.kind,
                        points: g.points,
                        max_points: g.max_points,
                    })
                    .collect();
                tests.sort_by(|a, b| a.test.cmp(&b.test));

                let (max_points, derived) = match max_points {
                    Some(explicit) => (*explicit, false),
                    None => (entries.iter().map(|g| g.weight()).sum::<f64>(), true),
                };
                ResolvedTopic {
                    name: topic.clone(),
                    max_points: max_points.max(0.0),
                    max_points_derived: derived,
                    tests,
                }
            })
            .collect();

        let (max_points, max_points_derived) = match decl.max_points {
            Some(explicit) => (explicit, false),
            None => (resolved_topics.iter().map(|t| t.max_points).sum::<f64>(), true),
        };

        let scope_resolver = ScopeResolver::new(
            name,
            scopes.get(name).into_iter().flatten().copied(),
        )?;

        tracing::debug!(
            project = %name,
            max_points,
            max_points_derived,
            topics = resolved_topics.len(),
            "resolved project"
        );

        resolved.push(ResolvedProject {
            name: name.to_string(),
            description: decl.description.clone(),
            max_points: max_points.max(0.0),
            max_points_derived,
            warnings: WarningPolicy::from_decl(decl),
            coverage: CoveragePolicy::from_decl(decl),
            scopes: scope_resolver,
            topics: resolved_topics,
        });
    }

    Ok(ResolvedManifest { projects: resolved })
}

fn ensure_finite(
    value: Option<f64>,
    context: impl FnOnce() -> String,
    project: &str,
) -> Result<(), ConfigError> {
    match value {
        Some(v) if !v.is_finite() => Err(ConfigError::NonFinitePoints {
            context: context(),
            project: project.to_string(),
        }),
        _ => Ok(()),
    }
}

fn merge_projects(decls: &[ProjectDecl]) -> Result<BTreeMap<&str, &ProjectDecl>, ConfigError> {
    let mut projects: BTreeMap<&str, &ProjectDecl> = BTreeMap::new();
    for decl in decls {
        ensure_finite(decl.max_points, || "max_points".into(), &decl.name)?;
        ensure_finite(Some(decl.warning_points), || "warning_points".into(), &decl.name)?;
        ensure_finite(Some(decl.coverage_points), || "coverage_points".into(), &decl.name)?;
        if decl.coverage_percentage > 100 {
            return Err(ConfigError::InvalidPercentage {
                project: decl.name.clone(),
                percentage: decl.coverage_percentage,
            });
        }
        match projects.get(decl.name.as_str()) {
            Some(existing) if *existing != decl => {
                return Err(ConfigError::ConflictingProject(decl.name.clone()));
            }
            Some(_) => {}
            None => {
                projects.insert(decl.name.as_str(), decl);
            }
        }
    }
    Ok(projects)
}

type TopicKey = (String, String);

fn merge_topics(
    decls: &[TopicDecl],
    projects: &BTreeMap<&str, &ProjectDecl>,
) -> Result<BTreeMap<TopicKey, Option<f64>>, ConfigError> {
    let mut topics: BTreeMap<TopicKey, Option<f64>> = BTreeMap::new();
    for decl in decls {
        if !projects.contains_key(decl.project.as_str()) {
            return Err(ConfigError::UnknownProject {
                context: format!("topic '{}'", decl.topic),
                project: decl.project.clone(),
            });
        }
        ensure_finite(
            decl.max_points,
            || format!("max_points of topic '{}'", decl.topic),
            &decl.project,
        )?;
        let slot = topics
            .entry((decl.project.clone(), decl.topic.clone()))
            .or_insert(None);
        match (*slot, decl.max_points) {
            (Some(a), Some(b)) if a != b => {
                return Err(ConfigError::ConflictingTopic {
                    project: decl.project.clone(),
                    topic: decl.topic.clone(),
                });
            }
            (None, Some(b)) => *slot = Some(b),
            _ => {}
        }
    }
    Ok(topics)
}

fn bind_grades<'a>(
    decls: &'a [GradeDecl],
    projects: &BTreeMap<&str, &ProjectDecl>,
    topics: &BTreeMap<TopicKey, Option<f64>>,
) -> Result<HashMap<(&'a str, &'a str), Vec<&'a GradeDecl>>, ConfigError> {
    let mut kinds: HashMap<&str, TestKind> = HashMap::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut bound: HashMap<(&str, &str), Vec<&GradeDecl>> = HashMap::new();

    for grade in decls {
        let test = grade.test.trim();
        if !projects.contains_key(grade.project.as_str()) {
            return Err(ConfigError::UnknownProject {
                context: format!("test '{test}'"),
                project: grade.project.clone(),
            });
        }
        if !topics.contains_key(&(grade.project.clone(), grade.topic.clone())) {
            return Err(ConfigError::UnknownTopic {
                project: grade.project.clone(),
                topic: grade.topic.clone(),
                test: test.to_string(),
            });
        }
        ensure_finite(Some(grade.points), || format!("points of test '{test}'"), &grade.project)?;
        ensure_finite(grade.max_points, || format!("max_points of test '{test}'"), &grade.project)?;
        if grade.kind == TestKind::Factory && !grade.max_points.is_some_and(|m| m > 0.0) {
            return Err(ConfigError::FactoryWithoutCap {
                project: grade.project.clone(),
                test: test.to_string(),
            });
        }
        if *kinds.entry(test).or_insert(grade.kind) != grade.kind {
            return Err(ConfigError::ConflictingTestKind(test.to_string()));
        }
        if !seen.insert((grade.project.as_str(), test)) {
            return Err(ConfigError::DuplicateGrade {
                project: grade.project.clone(),
                test: test.to_string(),
            });
        }
        bound
            .entry((grade.project.as_str(), grade.topic.as_str()))
            .or_default()
            .push(grade);
    }
    Ok(bound)
}
