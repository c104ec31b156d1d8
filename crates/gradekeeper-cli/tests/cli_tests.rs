//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MANIFEST: &str = "../../samples/manifest.toml";
const RESULTS: &str = "../../samples/results.toml";

fn gradekeeper() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("gradekeeper").unwrap();
    cmd.env_remove("HOME")
        .env_remove("RUST_LOG")
        .env_remove("GRADEKEEPER_OUTPUT_DIR")
        .env_remove("GRADEKEEPER_PARALLELISM");
    cmd
}

fn grade_into(output: &TempDir) -> Command {
    let mut cmd = gradekeeper();
    cmd.arg("grade")
        .arg("--manifest")
        .arg(MANIFEST)
        .arg("--results")
        .arg(RESULTS)
        .arg("--output")
        .arg(output.path());
    cmd
}

fn load_report(dir: &TempDir) -> serde_json::Value {
    let content = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn project<'a>(report: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
    report["projects"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == name)
        .unwrap()
}

#[test]
fn test_help() {
    gradekeeper()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deterministic point scores"));
}

#[test]
fn test_version() {
    gradekeeper()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gradekeeper"));
}

#[test]
fn test_validate_sample_manifest() {
    gradekeeper()
        .arg("validate")
        .arg("--manifest")
        .arg(MANIFEST)
        .assert()
        .success()
        .stdout(predicate::str::contains("Project: TP1 (max 10.0 points, 2 topics, 4 tests)"))
        .stdout(predicate::str::contains("Project: TP3 (max 8.0 points, derived"))
        .stdout(predicate::str::contains("Manifest valid."));
}

#[test]
fn test_validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("manifest.toml");
    std::fs::write(
        &path,
        r#"
[[projects]]
name = "Empty"
coverage_points = 1.0
coverage_percentage = 50
"#,
    )
    .unwrap();

    gradekeeper()
        .arg("validate")
        .arg("--manifest")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[Empty] WARNING: project has no topics"))
        .stdout(predicate::str::contains(
            "coverage is graded but no coverage scope is declared",
        ))
        .stdout(predicate::str::contains("2 warning(s) found."));
}

#[test]
fn test_validate_rejects_unknown_topic() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("manifest.toml");
    std::fs::write(
        &path,
        r#"
[[projects]]
name = "TP1"

[[grades]]
test = "a.B.c"
project = "TP1"
topic = "Nowhere"
points = 1.0
"#,
    )
    .unwrap();

    gradekeeper()
        .arg("validate")
        .arg("--manifest")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid grading manifest"))
        .stderr(predicate::str::contains("Nowhere"));
}

#[test]
fn test_validate_nonexistent_manifest() {
    gradekeeper()
        .arg("validate")
        .arg("--manifest")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_grade_writes_json_and_breakdown() {
    let dir = TempDir::new().unwrap();

    grade_into(&dir)
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("Grades for TP1"))
        .stdout(predicate::str::contains("2.0/5.0"))
        .stdout(predicate::str::contains("TestProject1.test1: failed"))
        .stderr(predicate::str::contains("Report saved to:"));

    let report = load_report(&dir);
    let names: Vec<&str> = report["projects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Sorting", "TP1", "TP3"]);

    let tp1 = project(&report, "TP1");
    assert_eq!(tp1["points"], 6.0);
    assert_eq!(tp1["passing"], false);

    let tp3 = project(&report, "TP3");
    assert_eq!(tp3["max_points"], 8.0);
    assert_eq!(tp3["points"], 4.0);

    let sorting = project(&report, "Sorting");
    assert_eq!(sorting["points"], 5.0);
    assert_eq!(sorting["coverage"]["covered"], 8);
    assert_eq!(sorting["coverage"]["total"], 10);
    assert_eq!(sorting["passing"], true);
}

#[test]
fn test_grade_all_formats() {
    let dir = TempDir::new().unwrap();

    grade_into(&dir)
        .arg("--format")
        .arg("all")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    for file in ["report.json", "report.txt", "report.html", "results.json"] {
        assert!(dir.path().join(file).exists(), "missing {file}");
    }

    let gradescope: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(gradescope["score"], 15.0);
}

#[test]
fn test_grade_single_project() {
    let dir = TempDir::new().unwrap();

    grade_into(&dir)
        .arg("--project")
        .arg("TP3")
        .arg("--format")
        .arg("json")
        .arg("--quiet")
        .assert()
        .success();

    let report = load_report(&dir);
    assert_eq!(report["projects"].as_array().unwrap().len(), 1);
    assert_eq!(report["projects"][0]["name"], "TP3");
}

#[test]
fn test_grade_unknown_project() {
    let dir = TempDir::new().unwrap();

    grade_into(&dir)
        .arg("--project")
        .arg("TP9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("project 'TP9' not found"))
        .stderr(predicate::str::contains("Available: Sorting, TP1, TP3"));
}

#[test]
fn test_grade_unknown_format() {
    let dir = TempDir::new().unwrap();

    grade_into(&dir)
        .arg("--format")
        .arg("sarif")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format 'sarif'"));
}

#[test]
fn test_grade_strict_fails_when_not_passing() {
    let dir = TempDir::new().unwrap();

    grade_into(&dir).arg("--quiet").arg("--strict").assert().failure();

    let passing = TempDir::new().unwrap();
    grade_into(&passing)
        .arg("--project")
        .arg("Sorting")
        .arg("--quiet")
        .arg("--strict")
        .assert()
        .success();
}

#[test]
fn test_grade_is_deterministic() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    for (dir, parallelism) in [(&first, "1"), (&second, "8")] {
        grade_into(dir)
            .arg("--format")
            .arg("json,text")
            .arg("--parallelism")
            .arg(parallelism)
            .arg("--quiet")
            .assert()
            .success();
    }

    for file in ["report.json", "report.txt"] {
        let a = std::fs::read(first.path().join(file)).unwrap();
        let b = std::fs::read(second.path().join(file)).unwrap();
        assert_eq!(a, b, "{file} differs between runs");
    }
}

#[test]
fn test_grade_without_results_feed() {
    let dir = TempDir::new().unwrap();

    gradekeeper()
        .current_dir(dir.path())
        .arg("grade")
        .arg("--manifest")
        .arg("manifest.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no results feed given"));
}

#[test]
fn test_grade_rejects_feed_for_undeclared_project() {
    let dir = TempDir::new().unwrap();
    let feed = dir.path().join("results.toml");
    std::fs::write(
        &feed,
        r#"
[[warnings]]
source = "compiler"
project = "TP01"
count = 0
"#,
    )
    .unwrap();

    gradekeeper()
        .arg("grade")
        .arg("--manifest")
        .arg(MANIFEST)
        .arg("--results")
        .arg(&feed)
        .arg("--output")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid results feed"))
        .stderr(predicate::str::contains("unknown project 'TP01'"));

    assert!(!dir.path().join("report.json").exists());
}

#[test]
fn test_grade_rejects_zero_parallelism() {
    let dir = TempDir::new().unwrap();

    grade_into(&dir)
        .arg("--parallelism")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("parallelism must be at least 1"));
}

#[test]
fn test_export_writes_explicit_maxima() {
    gradekeeper()
        .arg("export")
        .arg("--manifest")
        .arg(MANIFEST)
        .arg("--project")
        .arg("TP3")
        .assert()
        .success()
        .stdout(predicate::str::contains("# Resolved grading policy"))
        .stdout(predicate::str::contains("name = \"TP3\""))
        .stdout(predicate::str::contains("max_points = 8.0"))
        .stdout(predicate::str::contains("TP1").not());
}

#[test]
fn test_export_to_file_regrades_identically() {
    let dir = TempDir::new().unwrap();
    let policy = dir.path().join("policy.toml");

    gradekeeper()
        .arg("export")
        .arg("--manifest")
        .arg(MANIFEST)
        .arg("--output")
        .arg(&policy)
        .assert()
        .success()
        .stderr(predicate::str::contains("Policy written to:"));

    let from_sample = TempDir::new().unwrap();
    grade_into(&from_sample)
        .arg("--format")
        .arg("json")
        .arg("--quiet")
        .assert()
        .success();

    let from_policy = TempDir::new().unwrap();
    gradekeeper()
        .arg("grade")
        .arg("--manifest")
        .arg(&policy)
        .arg("--results")
        .arg(RESULTS)
        .arg("--output")
        .arg(from_policy.path())
        .arg("--format")
        .arg("json")
        .arg("--quiet")
        .assert()
        .success();

    let a = load_report(&from_sample);
    let b = load_report(&from_policy);
    for name in ["Sorting", "TP1", "TP3"] {
        assert_eq!(project(&a, name)["points"], project(&b, name)["points"]);
        assert_eq!(
            project(&a, name)["max_points"],
            project(&b, name)["max_points"]
        );
    }
}

#[test]
fn test_compare_detects_regression() {
    let dir = TempDir::new().unwrap();

    // Baseline: test1 passes, so TP1 is worth one more point.
    let improved = std::fs::read_to_string(RESULTS).unwrap().replacen(
        "test = \"edu.rice.autogradertest.TestProject1.test1\"\noutcome = \"failed\"",
        "test = \"edu.rice.autogradertest.TestProject1.test1\"\noutcome = \"passed\"",
        1,
    );
    let improved_path = dir.path().join("improved.toml");
    std::fs::write(&improved_path, improved).unwrap();

    let baseline = TempDir::new().unwrap();
    gradekeeper()
        .arg("grade")
        .arg("--manifest")
        .arg(MANIFEST)
        .arg("--results")
        .arg(&improved_path)
        .arg("--output")
        .arg(baseline.path())
        .arg("--format")
        .arg("json")
        .arg("--quiet")
        .assert()
        .success();

    let current = TempDir::new().unwrap();
    grade_into(&current)
        .arg("--format")
        .arg("json")
        .arg("--quiet")
        .assert()
        .success();

    let baseline_json = baseline.path().join("report.json");
    let current_json = current.path().join("report.json");

    gradekeeper()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline_json)
        .arg("--current")
        .arg(&current_json)
        .assert()
        .success()
        .stdout(predicate::str::contains("REGRESSION  TP1: 7.00 -> 6.00 (-1.00)"))
        .stdout(predicate::str::contains("1 regressions, 0 improvements, 2 unchanged"));

    gradekeeper()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline_json)
        .arg("--current")
        .arg(&current_json)
        .arg("--format")
        .arg("markdown")
        .assert()
        .success()
        .stdout(predicate::str::contains("| TP1 | 7.00 | 6.00 | -1.00 |"));

    gradekeeper()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline_json)
        .arg("--current")
        .arg(&current_json)
        .arg("--fail-on-regression")
        .assert()
        .failure();

    gradekeeper()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline_json)
        .arg("--current")
        .arg(&current_json)
        .arg("--threshold")
        .arg("1.5")
        .arg("--fail-on-regression")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 regressions, 0 improvements, 3 unchanged"));
}

#[test]
fn test_init_creates_starter_files() {
    let dir = TempDir::new().unwrap();

    gradekeeper()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created gradekeeper.toml"))
        .stdout(predicate::str::contains("Created grading/manifest.toml"));

    assert!(dir.path().join("gradekeeper.toml").exists());
    assert!(dir.path().join("grading/manifest.toml").exists());

    gradekeeper()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("gradekeeper.toml already exists, skipping."));

    gradekeeper()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--manifest")
        .arg("grading/manifest.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest valid."));
}
