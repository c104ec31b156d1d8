//! Grading engine.
//!
//! Each project is an independent pipeline: topics, then coverage, then
//! warnings, then the project total. Projects share only read-only inputs, so
//! they can be graded concurrently; the report is sorted by project name
//! either way and is identical to the sequential one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::coverage::evaluate_coverage;
use crate::report::{ProjectReport, Report};
use crate::resolve::{ResolvedManifest, ResolvedProject};
use crate::results::{ResultsFeed, TestIndex};
use crate::topics::{accumulate_topic, TopicReport};
use crate::warnings::evaluate_warnings;

/// Configuration for the grading engine.
#[derive(Debug, Clone)]
pub struct GradingEngineConfig {
    /// Maximum projects graded at once.
    pub parallelism: usize,
}

impl Default for GradingEngineConfig {
    fn default() -> Self {
        Self { parallelism: 4 }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_project_start(&self, project: &str);
    fn on_project_complete(&self, report: &ProjectReport);
    fn on_run_complete(&self, total: usize, passing: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_project_start(&self, _: &str) {}
    fn on_project_complete(&self, _: &ProjectReport) {}
    fn on_run_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// Grades resolved projects against one results feed.
pub struct GradingEngine {
    manifest: Arc<ResolvedManifest>,
    config: GradingEngineConfig,
}

impl GradingEngine {
    pub fn new(manifest: ResolvedManifest, config: GradingEngineConfig) -> Self {
        Self {
            manifest: Arc::new(manifest),
            config,
        }
    }

    pub fn manifest(&self) -> &ResolvedManifest {
        &self.manifest
    }

    /// Grade every project, one after another.
    pub fn grade(&self, feed: &ResultsFeed, progress: &dyn ProgressReporter) -> Report {
        let start = Instant::now();
        let index = TestIndex::build(&feed.tests);

        let projects: Vec<ProjectReport> = self
            .manifest
            .projects
            .iter()
            .map(|project| {
                progress.on_project_start(&project.name);
                let report = grade_project(project, &index, feed);
                progress.on_project_complete(&report);
                report
            })
            .collect();

        finish(projects, start, progress)
    }

    /// Grade every project as a separate task, at most `parallelism` at once.
    pub async fn grade_concurrently(
        &self,
        feed: Arc<ResultsFeed>,
        progress: &dyn ProgressReporter,
    ) -> Result<Report> {
        let start = Instant::now();
        let index = Arc::new(TestIndex::build(&feed.tests));
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));

        let mut futures = FuturesUnordered::new();
        for position in 0..self.manifest.projects.len() {
            let manifest = Arc::clone(&self.manifest);
            let index = Arc::clone(&index);
            let feed = Arc::clone(&feed);
            let semaphore = Arc::clone(&semaphore);

            futures.push(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                progress.on_project_start(&manifest.projects[position].name);
                tokio::task::spawn_blocking(move || {
                    grade_project(&manifest.projects[position], &index, &feed)
                })
                .await
                .map_err(|e| anyhow::anyhow!("grading task failed: {e}"))
            });
        }

        let mut projects = Vec::with_capacity(self.manifest.projects.len());
        while let Some(result) = futures.next().await {
            let report = result?;
            progress.on_project_complete(&report);
            projects.push(report);
        }
        projects.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(finish(projects, start, progress))
    }
}

fn finish(projects: Vec<ProjectReport>, start: Instant, progress: &dyn ProgressReporter) -> Report {
    let passing = projects.iter().filter(|p| p.passing).count();
    progress.on_run_complete(projects.len(), passing, start.elapsed());
    tracing::info!(projects = projects.len(), passing, "grading complete");
    Report { projects }
}

/// Run the full pipeline for one project.
pub fn grade_project(project: &ResolvedProject, index: &TestIndex, feed: &ResultsFeed) -> ProjectReport {
    let topics: Vec<TopicReport> = project
        .topics
        .iter()
        .map(|topic| accumulate_topic(topic, index))
        .collect();

    let coverage = evaluate_coverage(
        &project.name,
        &project.coverage,
        &project.scopes,
        feed.coverage.as_ref(),
    );
    let warnings = evaluate_warnings(&project.name, &project.warnings, &feed.warnings);

    let raw_points =
        topics.iter().map(|t| t.earned).sum::<f64>() + coverage.earned - warnings.deducted;
    let points = raw_points.clamp(0.0, project.max_points);
    let passing = topics.iter().all(|t| t.passing) && coverage.passing && warnings.passing;

    tracing::debug!(
        project = %project.name,
        raw_points,
        points,
        max_points = project.max_points,
        "graded project"
    );

    ProjectReport {
        name: project.name.clone(),
        description: project.description.clone(),
        max_points: project.max_points,
        max_points_derived: project.max_points_derived,
        topics,
        coverage,
        warnings,
        raw_points,
        points,
        passing,
    }
}
