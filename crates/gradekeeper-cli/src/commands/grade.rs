//! The `gradekeeper grade` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use gradekeeper_core::config::load_config_from;
use gradekeeper_core::engine::{
    GradingEngine, GradingEngineConfig, NoopReporter, ProgressReporter,
};
use gradekeeper_core::parser;
use gradekeeper_core::report::{ProjectReport, Report};
use gradekeeper_core::resolve::resolve_manifest;
use gradekeeper_report::gradescope::write_gradescope_results;
use gradekeeper_report::html::write_html_report;
use gradekeeper_report::text::{generate_text, write_text_report};

const ALL_FORMATS: [&str; 4] = ["json", "text", "html", "gradescope"];

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_project_start(&self, project: &str) {
        tracing::info!("grading {project}");
    }

    fn on_project_complete(&self, report: &ProjectReport) {
        eprintln!(
            "  Graded: {} {:.1}/{:.1} [{}]",
            report.name,
            report.points,
            report.max_points,
            if report.passing { "PASS" } else { "FAIL" }
        );
    }

    fn on_run_complete(&self, total: usize, passing: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {passing}/{total} projects fully passing ({:.2}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub struct GradeArgs {
    pub manifest: Option<PathBuf>,
    pub results: Option<PathBuf>,
    pub project: Option<String>,
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub parallelism: Option<usize>,
    pub config: Option<PathBuf>,
    pub quiet: bool,
    pub strict: bool,
}

pub async fn execute(args: GradeArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let manifest_path = args.manifest.or(config.manifest).context(
        "no manifest given (use --manifest or set `manifest` in gradekeeper.toml)",
    )?;
    let results_path = args.results.or(config.results).context(
        "no results feed given (use --results or set `results` in gradekeeper.toml)",
    )?;
    let output = args.output.unwrap_or(config.output_dir);
    let parallelism = args.parallelism.unwrap_or(config.parallelism);
    let quiet = args.quiet || config.quiet;
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");

    let formats = parse_formats(args.format.as_deref(), &config.formats)?;

    let manifest = parser::parse_manifest(&manifest_path)?;
    let mut resolved = resolve_manifest(&manifest)
        .with_context(|| format!("invalid grading manifest: {}", manifest_path.display()))?;

    let feed = parser::parse_results(&results_path)?;
    resolved
        .check_feed(&feed)
        .with_context(|| format!("invalid results feed: {}", results_path.display()))?;

    if let Some(project) = &args.project {
        let available = resolved.project_names().join(", ");
        anyhow::ensure!(
            resolved.retain_project(project),
            "project '{project}' not found in manifest. Available: {available}"
        );
    }

    tracing::info!(
        projects = resolved.projects.len(),
        tests = feed.tests.len(),
        "grading"
    );

    let engine = GradingEngine::new(resolved, GradingEngineConfig { parallelism });
    let report = if quiet {
        engine.grade_concurrently(Arc::new(feed), &NoopReporter).await?
    } else {
        engine
            .grade_concurrently(Arc::new(feed), &ConsoleReporter)
            .await?
    };

    if !quiet {
        print_summary(&report);
        print!("{}", generate_text(&report));
    }

    write_outputs(&report, &output, &formats)?;

    if args.strict && !report.all_passing() {
        std::process::exit(1);
    }

    Ok(())
}

fn parse_formats(flag: Option<&str>, configured: &[String]) -> Result<Vec<String>> {
    let requested: Vec<String> = match flag {
        Some(f) => f.split(',').map(|s| s.trim().to_lowercase()).collect(),
        None => configured.iter().map(|s| s.to_lowercase()).collect(),
    };
    if requested.iter().any(|f| f == "all") {
        return Ok(ALL_FORMATS.iter().map(|f| f.to_string()).collect());
    }
    for f in &requested {
        anyhow::ensure!(
            ALL_FORMATS.contains(&f.as_str()),
            "unknown format '{f}' (expected one of: {}, all)",
            ALL_FORMATS.join(", ")
        );
    }
    Ok(requested)
}

fn write_outputs(report: &Report, output: &std::path::Path, formats: &[String]) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;

    for fmt in formats {
        match fmt.as_str() {
            "json" => {
                let path = output.join("report.json");
                report.save_json(&path)?;
                eprintln!("Report saved to: {}", path.display());
            }
            "text" => {
                let path = output.join("report.txt");
                write_text_report(report, &path)?;
                eprintln!("Text report: {}", path.display());
            }
            "html" => {
                let path = output.join("report.html");
                write_html_report(report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            "gradescope" => {
                let path = output.join("results.json");
                write_gradescope_results(report, &path)?;
                eprintln!("Gradescope results: {}", path.display());
            }
            other => tracing::warn!("unknown format: {other}"),
        }
    }
    Ok(())
}

fn print_summary(report: &Report) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Project", "Points", "Max", "Topics", "Coverage", "Warnings", "Status",
    ]);

    for p in &report.projects {
        let topics: f64 = p.topics.iter().map(|t| t.earned).sum();
        let topics_max: f64 = p.topics.iter().map(|t| t.max_points).sum();
        table.add_row(vec![
            Cell::new(&p.name),
            Cell::new(format!("{:.1}", p.points)),
            Cell::new(format!("{:.1}", p.max_points)),
            Cell::new(format!("{topics:.1}/{topics_max:.1}")),
            Cell::new(format!(
                "{:.1}/{:.1}",
                p.coverage.earned, p.coverage.possible
            )),
            Cell::new(format!("-{:.1}", p.warnings.deducted)),
            Cell::new(if p.passing { "PASS" } else { "FAIL" }),
        ]);
    }

    eprintln!("\n{table}");
}
