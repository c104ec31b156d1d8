//! The `gradekeeper validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use gradekeeper_core::parser::{parse_manifest, validate_manifest};
use gradekeeper_core::resolve::resolve_manifest;

pub fn execute(manifest_path: PathBuf) -> Result<()> {
    let manifest = parse_manifest(&manifest_path)?;
    let resolved = resolve_manifest(&manifest)
        .with_context(|| format!("invalid grading manifest: {}", manifest_path.display()))?;

    for project in &resolved.projects {
        let tests: usize = project.topics.iter().map(|t| t.tests.len()).sum();
        println!(
            "Project: {} (max {:.1} points{}, {} topics, {} tests)",
            project.name,
            project.max_points,
            if project.max_points_derived {
                ", derived"
            } else {
                ""
            },
            project.topics.len(),
            tests
        );
    }

    let warnings = validate_manifest(&manifest, &resolved);
    for w in &warnings {
        let prefix = w
            .project
            .as_ref()
            .map(|p| format!("  [{p}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Manifest valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
