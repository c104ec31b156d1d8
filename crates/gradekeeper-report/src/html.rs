//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use gradekeeper_core::coverage::CoverageStatus;
use gradekeeper_core::report::{ProjectReport, Report};
use gradekeeper_core::topics::TestStatus;
use gradekeeper_core::warnings::{SourceStatus, WarningStatus};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn status_class(passing: bool) -> &'static str {
    if passing {
        "pass"
    } else {
        "fail"
    }
}

/// Generate an HTML report from a grade report.
pub fn generate_html(report: &Report) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let names: Vec<String> = report.projects.iter().map(|p| html_escape(&p.name)).collect();
    html.push_str(&format!(
        "<title>gradekeeper report: {}</title>\n",
        names.join(", ")
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str("<h1>gradekeeper report</h1>\n");
    let passing = report.projects.iter().filter(|p| p.passing).count();
    html.push_str(&format!(
        "<p class=\"meta\">{} projects | {} fully passing</p>\n",
        report.projects.len(),
        passing
    ));
    html.push_str("</header>\n");

    // Summary
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\" id=\"summary\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Project</th><th onclick=\"sortTable(1)\">Points</th><th onclick=\"sortTable(2)\">Max</th><th onclick=\"sortTable(3)\">Score %</th><th onclick=\"sortTable(4)\">Status</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for p in &report.projects {
        let percent = if p.max_points > 0.0 {
            p.points / p.max_points * 100.0
        } else {
            0.0
        };
        html.push_str(&format!(
            "<tr class=\"{}\"><td><a href=\"#{}\">{}</a></td><td>{:.1}</td><td>{:.1}</td><td>{:.1}%</td><td>{}</td></tr>\n",
            status_class(p.passing),
            anchor(&p.name),
            html_escape(&p.name),
            p.points,
            p.max_points,
            percent,
            if p.passing { "PASS" } else { "FAIL" },
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    for p in &report.projects {
        html.push_str(&project_section(p));
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>\n");
    html
}

fn anchor(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("project-{slug}")
}

fn project_section(p: &ProjectReport) -> String {
    let mut html = String::new();
    html.push_str(&format!(
        "<section class=\"project\" id=\"{}\">\n<h2>{}: {:.1}/{:.1}</h2>\n",
        anchor(&p.name),
        html_escape(&p.name),
        p.points,
        p.max_points
    ));
    if !p.description.is_empty() {
        html.push_str(&format!("<p>{}</p>\n", html_escape(&p.description)));
    }
    if p.max_points_derived {
        html.push_str("<p class=\"meta\">Maximum derived from topic maxima.</p>\n");
    }

    html.push_str("<table class=\"components\">\n");
    html.push_str("<thead><tr><th>Component</th><th>Earned</th><th>Possible</th><th>Details</th></tr></thead>\n<tbody>\n");

    for topic in &p.topics {
        let details: Vec<String> = topic
            .failures()
            .map(|t| {
                let what = match (t.status, t.num_passed, t.num_checked) {
                    (TestStatus::Missing, _, _) => "no result".to_string(),
                    (_, Some(passed), Some(checked)) => format!("{passed}/{checked} cases passed"),
                    _ => "failed".to_string(),
                };
                format!(
                    "<code>{}</code> {} (-{:.1})",
                    html_escape(&t.test),
                    what,
                    t.deducted
                )
            })
            .collect();
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{:.1}</td><td>{:.1}</td><td>{}</td></tr>\n",
            status_class(topic.passing),
            html_escape(&topic.name),
            topic.earned,
            topic.max_points,
            details.join("<br>")
        ));
    }

    let c = &p.coverage;
    if c.status != CoverageStatus::NotGraded {
        let details = match c.status {
            CoverageStatus::NoData => "no coverage data".to_string(),
            _ => format!(
                "{:.1}% of {} ({}/{}), {}% required",
                c.ratio * 100.0,
                c.method,
                c.covered,
                c.total,
                c.required_percentage
            ),
        };
        html.push_str(&format!(
            "<tr class=\"{}\"><td>Coverage</td><td>{:.1}</td><td>{:.1}</td><td>{}</td></tr>\n",
            status_class(c.passing),
            c.earned,
            c.possible,
            details
        ));
    }

    let w = &p.warnings;
    if w.status != WarningStatus::NotGraded {
        let details: Vec<String> = w
            .sources
            .iter()
            .map(|s| {
                let status = match s.status {
                    SourceStatus::Clean => "clean".to_string(),
                    SourceStatus::Warned => format!("{} warning(s)", s.count),
                    SourceStatus::Missing => "no data".to_string(),
                };
                format!("{}: {}", s.source, status)
            })
            .collect();
        html.push_str(&format!(
            "<tr class=\"{}\"><td>Warnings</td><td>{:.1}</td><td>{:.1}</td><td>{}</td></tr>\n",
            status_class(w.passing),
            w.possible - w.deducted,
            w.possible,
            details.join("<br>")
        ));
    }

    html.push_str("</tbody></table>\n");

    if !c.units.is_empty() {
        html.push_str("<details>\n<summary>Covered units</summary>\n<table class=\"units\">\n");
        html.push_str("<thead><tr><th>Unit</th><th>Covered</th><th>Total</th><th>Included by</th></tr></thead>\n<tbody>\n");
        for u in &c.units {
            html.push_str(&format!(
                "<tr><td><code>{}</code></td><td>{}</td><td>{}</td><td><code>{}</code></td></tr>\n",
                html_escape(&u.unit),
                u.covered,
                u.total,
                html_escape(&u.declared_at)
            ));
        }
        html.push_str("</tbody></table>\n</details>\n");
    }

    html.push_str("</section>\n");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &Report, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; vertical-align: top; }
th { background: var(--border); }
#summary th { cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('summary');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    const cmp = isNaN(na) || isNaN(nb) ? va.localeCompare(vb) : na - nb;
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
