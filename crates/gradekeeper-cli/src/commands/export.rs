//! The `gradekeeper export` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use gradekeeper_core::parser::parse_manifest;
use gradekeeper_core::resolve::resolve_manifest;

pub fn execute(
    manifest_path: PathBuf,
    project: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let manifest = parse_manifest(&manifest_path)?;
    let mut resolved = resolve_manifest(&manifest)
        .with_context(|| format!("invalid grading manifest: {}", manifest_path.display()))?;

    if let Some(project) = &project {
        let available = resolved.project_names().join(", ");
        anyhow::ensure!(
            resolved.retain_project(project),
            "project '{project}' not found in manifest. Available: {available}"
        );
    }

    let policy = toml::to_string_pretty(&resolved.to_manifest())
        .context("failed to serialize grading policy")?;
    let policy = format!(
        "# Resolved grading policy for {}\n# Derived maxima are written out explicitly.\n\n{policy}",
        manifest_path.display()
    );

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, policy)
                .with_context(|| format!("failed to write policy to {}", path.display()))?;
            eprintln!("Policy written to: {}", path.display());
        }
        None => print!("{policy}"),
    }

    Ok(())
}
