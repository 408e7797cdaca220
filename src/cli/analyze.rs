//! Analyze command - batch scan with text or JSON output

use crate::config::ModscopeConfig;
use crate::models::{Diagnostic, Severity};
use crate::pipeline::{self, ScanReport};
use anyhow::Result;
use console::style;
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub fn run(
    path: &Path,
    config: Option<ModscopeConfig>,
    format: &str,
    fail_under: Option<u8>,
) -> Result<()> {
    let report = pipeline::scan(path, config)?;

    let output = match format {
        "json" => serde_json::to_string_pretty(&report)?,
        _ => render_text(&report),
    };
    println!("{}", output);

    if let Some(threshold) = fail_under {
        if report.score.value < threshold {
            eprintln!(
                "{} Score {} is below --fail-under {}",
                style("✗").red(),
                report.score.value,
                threshold
            );
            std::process::exit(1);
        }
    }
    Ok(())
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Error => style("error").red().bold().to_string(),
        Severity::Warning => style("warning").yellow().to_string(),
        Severity::Info => style("info").blue().to_string(),
    }
}

fn score_style(value: u8) -> console::StyledObject<u8> {
    match value {
        90.. => style(value).green().bold(),
        75..=89 => style(value).green(),
        50..=74 => style(value).yellow(),
        _ => style(value).red().bold(),
    }
}

/// Diagnostics grouped by file in first-seen order; project findings without a file come last
fn group_by_file(diagnostics: &[Diagnostic]) -> IndexMap<PathBuf, Vec<&Diagnostic>> {
    let mut groups: IndexMap<PathBuf, Vec<&Diagnostic>> = IndexMap::new();
    for d in diagnostics.iter().filter(|d| !d.file_path.as_os_str().is_empty()) {
        groups.entry(d.file_path.clone()).or_default().push(d);
    }
    let unplaced: Vec<&Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.file_path.as_os_str().is_empty())
        .collect();
    if !unplaced.is_empty() {
        groups.insert(PathBuf::new(), unplaced);
    }
    groups
}

pub fn render_text(report: &ScanReport) -> String {
    let mut out = String::new();
    let project = &report.project;

    let _ = writeln!(out, "\n{}", style("Modscope Analysis").bold());
    let _ = writeln!(out, "{}", style("──────────────────────────────────────").dim());
    if let Some(name) = &project.name {
        let _ = write!(out, "Project: {}  ", style(name).cyan());
    }
    if let Some(version) = &project.framework_version {
        let _ = write!(out, "Framework: {}  ", version);
    }
    if let Some(orm) = &project.orm {
        let _ = write!(out, "ORM: {}", orm);
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Files: {}  Modules: {}  Providers: {}  Controllers: {}",
        project.file_count, project.module_count, project.provider_count, project.controller_count
    );
    if !project.projects.is_empty() {
        let _ = writeln!(out, "Projects: {}", project.projects.join(", "));
    }
    let _ = writeln!(out);

    for (file, diagnostics) in group_by_file(&report.diagnostics) {
        let heading = if file.as_os_str().is_empty() {
            "(project)".to_string()
        } else {
            file.display().to_string()
        };
        let _ = writeln!(out, "{}", style(heading).underlined());
        for d in diagnostics {
            let _ = writeln!(
                out,
                "  {:>5}:{:<3} {:<7} {}  {}",
                d.line,
                d.column,
                severity_label(d.severity),
                d.message,
                style(&d.rule_id).dim()
            );
            let _ = writeln!(out, "             {} {}", style("help:").dim(), d.help);
        }
        let _ = writeln!(out);
    }

    let s = &report.summary;
    if s.total == 0 {
        let _ = writeln!(out, "{} No issues found", style("✓").green());
    } else {
        let _ = writeln!(
            out,
            "{} ({} errors, {} warnings, {} info)",
            style(format!("{} diagnostics", s.total)).bold(),
            s.errors,
            s.warnings,
            s.info
        );
    }
    for e in &report.rule_errors {
        let location = e
            .file_path
            .as_ref()
            .map(|p| format!(" on {}", p.display()))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{} rule {} failed{}: {}",
            style("!").yellow(),
            e.rule_id,
            location,
            e.error
        );
    }

    let _ = writeln!(
        out,
        "\nScore: {}/100 {}  {}",
        score_style(report.score.value),
        style(&report.score.label).bold(),
        style(format!("({}ms)", report.elapsed_ms)).dim()
    );
    out
}
