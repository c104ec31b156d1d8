//! Human-readable report.
//!
//! A boxed breakdown per project: one `earned/max` line per component with a
//! pass mark, and beneath it whatever cost points. Passing tests and clean
//! warning sources are left out so the report mostly says what went wrong.
//!
//! Only the top, left and bottom of the box are drawn. The marks are wide
//! glyphs whose rendered width varies between terminals, so a right border
//! would not line up.

use std::path::Path;

use anyhow::{Context, Result};

use gradekeeper_core::coverage::{CoverageReport, CoverageStatus};
use gradekeeper_core::model::TestKind;
use gradekeeper_core::report::{ProjectReport, Report};
use gradekeeper_core::topics::{TestDeduction, TestStatus, TopicReport};
use gradekeeper_core::warnings::{SourceStatus, WarningReport};

const LINE_LENGTH: usize = 78;
const RIGHT_COLUMN: usize = 8;
const LEFT_COLUMN: usize = LINE_LENGTH - RIGHT_COLUMN - 6;
const GOOD_MARK: &str = "✅";
const FAIL_MARK: &str = "❌";
const BLANK_LINE: &str = "│";

/// One printed deduction: text (may contain forced line breaks) and cost.
struct Line {
    text: String,
    cost: f64,
}

/// Render every project of a report.
pub fn generate_text(report: &Report) -> String {
    report.projects.iter().map(project_text).collect()
}

/// Write the text report to a file.
pub fn write_text_report(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_text(report))
        .with_context(|| format!("failed to write text report to {}", path.display()))
}

/// Render one project.
pub fn project_text(project: &ProjectReport) -> String {
    let mut out = String::new();
    let rule = "─".repeat(LINE_LENGTH - 1);

    out.push_str(&format!("┌{rule}\n"));
    out.push_str(&format!("{BLANK_LINE} Grades for {}\n", project.name));
    if !project.description.trim().is_empty() {
        for line in word_wrap(&project.description, LINE_LENGTH - 2) {
            out.push_str(&format!("{BLANK_LINE} {line}\n"));
        }
    }
    out.push_str(&format!("├{rule}\n"));
    out.push_str(&format!("{BLANK_LINE}\n"));

    for topic in &project.topics {
        component(
            &mut out,
            &topic.name,
            topic.earned,
            topic.max_points,
            topic.passing,
            topic_lines(topic),
        );
    }

    let coverage = &project.coverage;
    if coverage.status != CoverageStatus::NotGraded {
        component(
            &mut out,
            &format!(
                "Coverage ({}, {}% required)",
                coverage.method, coverage.required_percentage
            ),
            coverage.earned,
            coverage.possible,
            coverage.passing,
            coverage_lines(coverage),
        );
    }

    let warnings = &project.warnings;
    if warnings.possible != 0.0 {
        component(
            &mut out,
            "Warnings",
            warnings.possible - warnings.deducted,
            warnings.possible,
            warnings.passing,
            warning_lines(warnings),
        );
    }

    out.push_str(&format!("├{rule}\n"));
    out.push_str(&fraction_line(
        "Total points:",
        project.points,
        project.max_points,
        project.passing,
    ));
    out.push_str(&format!("└{rule}\n"));
    out
}

fn component(out: &mut String, title: &str, earned: f64, max: f64, passing: bool, lines: Vec<Line>) {
    out.push_str(&fraction_line(title, earned, max, passing));
    for line in lines {
        let wrapped: Vec<String> = line
            .text
            .split('\n')
            .flat_map(|part| word_wrap(part, LEFT_COLUMN - 2))
            .collect();
        let mut wrapped = wrapped.into_iter();
        let first = wrapped.next().unwrap_or_default();
        let cost = right_column(-line.cost);
        out.push_str(
            format!(
                "{BLANK_LINE} - {first:<width$} {cost}",
                width = LEFT_COLUMN - 2
            )
            .trim_end(),
        );
        out.push('\n');
        for rest in wrapped {
            out.push_str(&format!("{BLANK_LINE}   {rest}\n"));
        }
    }
    out.push_str(&format!("{BLANK_LINE}\n"));
}

fn fraction_line(title: &str, earned: f64, max: f64, passing: bool) -> String {
    let mark = if passing { GOOD_MARK } else { FAIL_MARK };
    let fraction = format!("{earned:.1}/{max:.1}");
    format!(
        "{BLANK_LINE} {title:<left$} {fraction:>right$} {mark}\n",
        left = LEFT_COLUMN - RIGHT_COLUMN - 2,
        right = RIGHT_COLUMN * 2 + 1
    )
}

fn right_column(value: f64) -> String {
    if value == 0.0 {
        String::new()
    } else {
        format!("{:>width$}", format!("({value:.1})"), width = RIGHT_COLUMN)
    }
}

fn topic_lines(topic: &TopicReport) -> Vec<Line> {
    topic
        .tests
        .iter()
        .filter(|t| worth_printing(t))
        .map(|t| Line {
            text: match (t.kind, t.status, t.num_passed, t.num_checked) {
                (_, TestStatus::Missing, _, _) => format!("{}: no result", t.test),
                (TestKind::Factory, _, Some(passed), Some(checked)) => {
                    format!("{}: {passed}/{checked} cases passed", t.test)
                }
                _ => format!("{}: failed", t.test),
            },
            cost: t.deducted,
        })
        .collect()
}

fn worth_printing(test: &TestDeduction) -> bool {
    match (test.kind, test.status) {
        (_, TestStatus::Passed) => false,
        (TestKind::Test, TestStatus::Failed) => test.deducted != 0.0,
        _ => true,
    }
}

fn coverage_lines(coverage: &CoverageReport) -> Vec<Line> {
    match coverage.status {
        CoverageStatus::NoData => vec![Line {
            text: "no coverage data".into(),
            cost: coverage.possible,
        }],
        CoverageStatus::BelowThreshold => vec![Line {
            text: format!(
                "measured {:.1}% ({}/{} {})",
                coverage.ratio * 100.0,
                coverage.covered,
                coverage.total,
                coverage.method
            ),
            cost: coverage.possible,
        }],
        CoverageStatus::Met | CoverageStatus::NotGraded => Vec::new(),
    }
}

fn warning_lines(warnings: &WarningReport) -> Vec<Line> {
    let mut cost = warnings.deducted;
    warnings
        .sources
        .iter()
        .filter_map(|s| {
            let text = match s.status {
                SourceStatus::Clean => return None,
                SourceStatus::Missing => format!("{}: no data", s.source),
                SourceStatus::Warned if s.labels.is_empty() => {
                    format!("{}: {} warning(s)", s.source, s.count)
                }
                SourceStatus::Warned => format!(
                    "{} ({}): {} warning(s)",
                    s.source,
                    s.labels.join(", "),
                    s.count
                ),
            };
            // the deduction is applied once, so only the first line carries it
            Some(Line {
                text,
                cost: std::mem::take(&mut cost),
            })
        })
        .collect()
}

/// Greedy word wrap. Words longer than the width are split.
pub fn word_wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_report;

    #[test]
    fn wrap_short_text_is_one_line() {
        assert_eq!(word_wrap("a fairly basic project", 40), vec!["a fairly basic project"]);
        assert_eq!(word_wrap("", 10), vec![String::new()]);
    }

    #[test]
    fn wrap_breaks_on_words() {
        let lines = word_wrap("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 9));
    }

    #[test]
    fn wrap_splits_long_words() {
        let lines = word_wrap("x edu.rice.autogradertest.TestProject", 10);
        assert_eq!(lines[0], "x");
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.concat(), "xedu.rice.autogradertest.TestProject");
    }

    #[test]
    fn boxed_report_layout() {
        let text = generate_text(&sample_report());
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with('┌'));
        assert_eq!(lines[0].chars().count(), LINE_LENGTH);
        assert_eq!(lines[1], "│ Grades for TP1");
        assert!(lines.last().unwrap().starts_with('└'));
        assert!(text.contains("2.0/5.0 ❌"));
        assert!(text.contains("Total points:"));
    }

    #[test]
    fn only_failures_are_listed() {
        let text = generate_text(&sample_report());
        assert!(text.contains("t.TestProject1.test1: failed"));
        assert!(text.contains("(-1.0)"));
        assert!(!text.contains("t.TestProject1.test4"));
    }

    #[test]
    fn warnings_deduction_printed_once() {
        let text = generate_text(&sample_report());
        assert!(text.contains("linter (main): 3 warning(s)"));
        assert_eq!(text.matches("formatter: no data").count(), 1);
        let warning_block: Vec<&str> = text
            .lines()
            .skip_while(|l| !l.contains("Warnings"))
            .take(3)
            .collect();
        assert_eq!(warning_block[1].matches("(-1.0)").count(), 1);
        assert!(!warning_block[2].contains("(-1.0)"));
    }

    #[test]
    fn render_is_deterministic() {
        let report = sample_report();
        assert_eq!(generate_text(&report), generate_text(&report));
    }

    #[test]
    fn write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.txt");
        write_text_report(&sample_report(), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Grades for TP1"));
    }
}
