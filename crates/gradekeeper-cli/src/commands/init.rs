//! The `gradekeeper init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("gradekeeper.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("grading").context("failed to create grading/")?;
    write_if_missing(Path::new("grading/manifest.toml"), EXAMPLE_MANIFEST)?;

    println!("\nNext steps:");
    println!("  1. Describe your projects, topics and graded tests in grading/manifest.toml");
    println!("  2. Run: gradekeeper validate --manifest grading/manifest.toml");
    println!("  3. Run: gradekeeper grade --results <test results feed>");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradekeeper configuration

manifest = "grading/manifest.toml"
# results = "${RESULTS_DIR}/results.toml"
output_dir = "./gradekeeper-results"
formats = ["json", "text"]
parallelism = 4
quiet = false
"#;

const EXAMPLE_MANIFEST: &str = r#"# Projects are graded independently. Omit max_points to derive it from the topics.
[[projects]]
name = "Week1"
description = "Warm-up exercises"
warning_points = 1.0
coverage_points = 1.0
coverage_percentage = 70
coverage_method = "lines"

[[topics]]
project = "Week1"
topic = "Correctness"
max_points = 5.0

[[topics]]
project = "Week1"
topic = "Style"

# A failing test deducts its points from the topic.
[[grades]]
test = "edu.example.week1.TestAdder.addsPositives"
project = "Week1"
topic = "Correctness"
points = 2.0

[[grades]]
test = "edu.example.week1.TestAdder.addsNegatives"
project = "Week1"
topic = "Correctness"
points = 2.0

# A test factory deducts per failing case, capped at max_points.
[[grades]]
test = "edu.example.week1.TestAdder.generatedCases"
kind = "factory"
project = "Week1"
topic = "Style"
points = 0.5
max_points = 2.0

# The nearest declared enclosing package or type decides coverage scope.
[[coverage]]
project = "Week1"
unit = "edu.example.week1"

[[coverage]]
project = "Week1"
unit = "edu.example.week1.Generated"
exclude = true
"#;
