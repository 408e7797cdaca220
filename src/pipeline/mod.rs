//! Batch analysis pipeline
//!
//! Orchestrates one full scan:
//! 1. Open the workspace (config, sub-projects, exclusions)
//! 2. Walk and parse source files
//! 3. Build the module graph and provider map
//! 4. Run rules
//! 5. Score and summarize
//!
//! Parsing fans out over rayon; everything after it is sequential and works
//! on path-ordered units so repeated scans produce identical reports.

mod metadata;
mod workspace;

pub use metadata::{detect_metadata, ProjectMetadata, FRAMEWORK_PACKAGE};
pub use workspace::{discover_projects, SubProject, Workspace, NEST_CLI_CONFIG};

use crate::config::ModscopeConfig;
use crate::error::ScanError;
use crate::models::{Diagnostic, Score, SummaryCounts};
use crate::rules::{RuleEngine, RuleError};
use crate::scoring;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Everything a renderer needs from one scan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub score: Score,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: SummaryCounts,
    pub project: ProjectMetadata,
    #[serde(default)]
    pub rule_errors: Vec<RuleError>,
    pub elapsed_ms: u64,
    pub generated_at: DateTime<Utc>,
}

/// Scan a project. `config_override` replaces the discovered configuration.
///
/// Rule faults and unparsable files never fail the scan; only a root that
/// cannot be loaded does.
pub fn scan(root: &Path, config_override: Option<ModscopeConfig>) -> Result<ScanReport, ScanError> {
    let start = Instant::now();
    let workspace = Workspace::open(root, config_override)?;

    let files = workspace.collect_source_files();
    let units = workspace.parse_all(&files);
    let (graph, providers) = workspace.analyze_structure(&units);

    let engine = RuleEngine::new(&workspace.rule_set(), workspace.config().clone());
    let outcome = engine.run(&units, &graph, &providers);

    let score = scoring::score(&outcome.diagnostics, units.len());
    let summary = SummaryCounts::from_diagnostics(&outcome.diagnostics);
    let project = detect_metadata(
        workspace.root(),
        &units,
        &graph,
        &providers,
        workspace.projects(),
    );
    let elapsed_ms = start.elapsed().as_millis() as u64;

    info!(
        "Scanned {} files in {}ms: {} diagnostics, score {} ({})",
        units.len(),
        elapsed_ms,
        outcome.diagnostics.len(),
        score.value,
        score.label
    );

    Ok(ScanReport {
        score,
        diagnostics: outcome.diagnostics,
        summary,
        project,
        rule_errors: outcome.rule_errors,
        elapsed_ms,
        generated_at: Utc::now(),
    })
}

/// Module graph of a project without running any rules
pub fn module_graph(
    root: &Path,
    config_override: Option<ModscopeConfig>,
) -> Result<crate::graph::ModuleGraph, ScanError> {
    let workspace = Workspace::open(root, config_override)?;
    let files = workspace.collect_source_files();
    let units = workspace.parse_all(&files);
    let (graph, _) = workspace.analyze_structure(&units);
    Ok(graph)
}
