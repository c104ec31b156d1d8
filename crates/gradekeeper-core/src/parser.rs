//! Manifest and results feed parsing.
//!
//! Manifests are TOML and may be split across the files of a directory.
//! Results feeds are TOML or JSON, chosen by file extension.

use std::path::Path;

use anyhow::{Context, Result};

use crate::model::Manifest;
use crate::resolve::ResolvedManifest;
use crate::results::ResultsFeed;

/// Parse a manifest file, or every `.toml` file under a directory.
pub fn parse_manifest(path: &Path) -> Result<Manifest> {
    if path.is_dir() {
        return load_manifest_directory(path);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest file: {}", path.display()))?;
    parse_manifest_str(&content, path)
}

/// Parse a manifest from a TOML string.
pub fn parse_manifest_str(content: &str, source_path: &Path) -> Result<Manifest> {
    toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))
}

/// Recursively load and concatenate all `.toml` manifests in a directory.
///
/// Files are read in path order so the merged declaration lists are stable.
pub fn load_manifest_directory(dir: &Path) -> Result<Manifest> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        paths.push(entry?.path());
    }
    paths.sort();

    let mut manifest = Manifest::default();
    for path in paths {
        let part = if path.is_dir() {
            load_manifest_directory(&path)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            parse_manifest(&path)?
        } else {
            continue;
        };
        tracing::debug!(path = %path.display(), "loaded manifest part");
        manifest.projects.extend(part.projects);
        manifest.topics.extend(part.topics);
        manifest.grades.extend(part.grades);
        manifest.coverage.extend(part.coverage);
    }
    Ok(manifest)
}

/// Serialization format of a results feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Toml,
    Json,
}

impl FeedFormat {
    /// `.json` files are JSON; everything else is TOML.
    pub fn from_path(path: &Path) -> Self {
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            FeedFormat::Json
        } else {
            FeedFormat::Toml
        }
    }
}

/// Parse a results feed file.
pub fn parse_results(path: &Path) -> Result<ResultsFeed> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read results file: {}", path.display()))?;
    parse_results_str(&content, FeedFormat::from_path(path), path)
}

pub fn parse_results_str(
    content: &str,
    format: FeedFormat,
    source_path: &Path,
) -> Result<ResultsFeed> {
    match format {
        FeedFormat::Toml => toml::from_str(content)
            .with_context(|| format!("failed to parse TOML: {}", source_path.display())),
        FeedFormat::Json => serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON: {}", source_path.display())),
    }
}

/// A non-fatal problem found in a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// The project (if applicable).
    pub project: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a manifest that resolved cleanly for likely authoring mistakes.
pub fn validate_manifest(manifest: &Manifest, resolved: &ResolvedManifest) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for grade in &manifest.grades {
        if grade.points <= 0.0 {
            warnings.push(ValidationWarning {
                project: Some(grade.project.clone()),
                message: format!("test '{}' has non-positive points {}", grade.test, grade.points),
            });
        }
    }

    for project in &resolved.projects {
        let warn = |message: String| ValidationWarning {
            project: Some(project.name.clone()),
            message,
        };

        if project.topics.is_empty() {
            warnings.push(warn("project has no topics".into()));
        }
        for topic in &project.topics {
            if topic.tests.is_empty() {
                warnings.push(warn(format!("topic '{}' has no graded tests", topic.name)));
            }
            if topic.max_points == 0.0 {
                warnings.push(warn(format!("topic '{}' is worth zero points", topic.name)));
            }
        }

        if project.coverage.is_graded() && project.scopes.is_empty() {
            warnings.push(warn(
                "coverage is graded but no coverage scope is declared".into(),
            ));
        }
        if !project.coverage.is_graded() && !project.scopes.is_empty() {
            warnings.push(warn(
                "coverage scopes are declared but coverage_points is zero".into(),
            ));
        }
    }

    warnings
}
