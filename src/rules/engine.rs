//! Rule execution engine
//!
//! Runs every enabled rule against a snapshot of the project:
//!
//! ```text
//! for rule in registration order:
//!     File rule    -> once per source file (file order)
//!     Project rule -> once over units + graph + providers
//! ```
//!
//! Each invocation is isolated. An `Err` or a panic is recorded as a
//! `RuleError` and the run continues; reports made before the failure are
//! kept. Diagnostics are not sorted here.

use super::base::{FileContext, ProjectContext, Report, RuleError, RuleUnit};
use super::RuleSet;
use crate::config::ModscopeConfig;
use crate::graph::ModuleGraph;
use crate::models::{ContextLine, Diagnostic, Scope, SourceContext};
use crate::parsers::SourceUnit;
use crate::providers::ProviderMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, warn};

/// Default context window: lines shown before and after the reported line
pub const CONTEXT_BEFORE: u32 = 5;
pub const CONTEXT_AFTER: u32 = 4;

/// Output of a rule run
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub diagnostics: Vec<Diagnostic>,
    pub rule_errors: Vec<RuleError>,
}

impl RunOutcome {
    pub fn extend(&mut self, other: RunOutcome) {
        self.diagnostics.extend(other.diagnostics);
        self.rule_errors.extend(other.rule_errors);
    }
}

/// Orchestrates rule execution
pub struct RuleEngine {
    rules: Vec<RuleUnit>,
    config: ModscopeConfig,
}

impl RuleEngine {
    /// Keep the rules the configuration enables, in registration order
    pub fn new(rules: &RuleSet, config: ModscopeConfig) -> Self {
        let rules: Vec<RuleUnit> = rules
            .units()
            .iter()
            .filter(|unit| {
                let meta = unit.meta();
                let enabled = config.is_rule_enabled(&meta.id, meta.category);
                if !enabled {
                    debug!("Rule {} disabled by configuration", meta.id);
                }
                enabled
            })
            .cloned()
            .collect();
        Self { rules, config }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn config(&self) -> &ModscopeConfig {
        &self.config
    }

    /// Run every rule: registration order, then file order within a file rule
    pub fn run(
        &self,
        units: &[SourceUnit],
        graph: &ModuleGraph,
        providers: &ProviderMap,
    ) -> RunOutcome {
        let start = Instant::now();
        let mut outcome = RunOutcome::default();

        for rule in &self.rules {
            match rule {
                RuleUnit::File(_) => {
                    for unit in units {
                        outcome.extend(self.invoke_file(rule, unit));
                    }
                }
                RuleUnit::Project(_) => {
                    outcome.extend(self.invoke_project(rule, units, graph, providers));
                }
            }
        }

        debug!(
            "Ran {} rules over {} files in {}ms: {} diagnostics, {} failures",
            self.rules.len(),
            units.len(),
            start.elapsed().as_millis(),
            outcome.diagnostics.len(),
            outcome.rule_errors.len()
        );
        outcome
    }

    /// Run only the file rules against one file
    pub fn run_file_rules(&self, unit: &SourceUnit) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        for rule in &self.rules {
            if matches!(rule, RuleUnit::File(_)) {
                outcome.extend(self.invoke_file(rule, unit));
            }
        }
        outcome
    }

    /// Run only the project rules
    pub fn run_project_rules(
        &self,
        units: &[SourceUnit],
        graph: &ModuleGraph,
        providers: &ProviderMap,
    ) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        for rule in &self.rules {
            if matches!(rule, RuleUnit::Project(_)) {
                outcome.extend(self.invoke_project(rule, units, graph, providers));
            }
        }
        outcome
    }

    fn invoke_file(&self, rule: &RuleUnit, unit: &SourceUnit) -> RunOutcome {
        let RuleUnit::File(file_rule) = rule else {
            return RunOutcome::default();
        };
        let mut ctx = FileContext::new(unit, &self.config);
        let result = catch_unwind(AssertUnwindSafe(|| file_rule.check(&mut ctx)));
        let failure = failure_message(result).map(|error| {
            warn!(
                "Rule {} failed on {}: {}",
                rule.id(),
                unit.path.display(),
                error
            );
            RuleError {
                rule_id: rule.id().to_string(),
                file_path: Some(unit.path.clone()),
                error,
            }
        });

        let lines = unit.lines();
        let diagnostics = ctx
            .reports
            .into_iter()
            .filter(|report| !is_suppressed(&lines, report.line))
            .map(|report| {
                let context = source_context(&lines, report.line, CONTEXT_BEFORE, CONTEXT_AFTER);
                self.stamp(rule, report, unit.path.clone(), Scope::File, context)
            })
            .collect();

        RunOutcome {
            diagnostics,
            rule_errors: failure.into_iter().collect(),
        }
    }

    fn invoke_project(
        &self,
        rule: &RuleUnit,
        units: &[SourceUnit],
        graph: &ModuleGraph,
        providers: &ProviderMap,
    ) -> RunOutcome {
        let RuleUnit::Project(project_rule) = rule else {
            return RunOutcome::default();
        };
        let mut ctx = ProjectContext::new(units, graph, providers, &self.config);
        let result = catch_unwind(AssertUnwindSafe(|| project_rule.check(&mut ctx)));
        let failure = failure_message(result).map(|error| {
            warn!("Rule {} failed: {}", rule.id(), error);
            RuleError {
                rule_id: rule.id().to_string(),
                file_path: None,
                error,
            }
        });

        let diagnostics = ctx
            .reports
            .into_iter()
            .map(|mut report| {
                let file = report.file.take().unwrap_or_default();
                self.stamp(rule, report, file, Scope::Project, None)
            })
            .collect();

        RunOutcome {
            diagnostics,
            rule_errors: failure.into_iter().collect(),
        }
    }

    fn stamp(
        &self,
        rule: &RuleUnit,
        report: Report,
        file_path: std::path::PathBuf,
        scope: Scope,
        source_context: Option<SourceContext>,
    ) -> Diagnostic {
        let meta = rule.meta();
        Diagnostic {
            file_path,
            rule_id: meta.id.clone(),
            category: meta.category,
            severity: meta.severity,
            message: report.message,
            help: meta.help.clone(),
            line: report.line,
            column: report.column,
            scope,
            source_context,
        }
    }
}

/// `None` on success, otherwise the error or panic message
fn failure_message(
    result: std::thread::Result<anyhow::Result<()>>,
) -> Option<String> {
    match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{:#}", e)),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            Some(format!("Panic: {}", panic_msg))
        }
    }
}

/// Lines `line - before ..= line + after`, clipped to the file. `None` for an empty file.
pub fn source_context(lines: &[&str], line: u32, before: u32, after: u32) -> Option<SourceContext> {
    if lines.is_empty() {
        return None;
    }
    let last = lines.len() as u32;
    let line = line.clamp(1, last);
    let start_line = line.saturating_sub(before).max(1);
    let end_line = line.saturating_add(after).min(last);

    let lines = (start_line..=end_line)
        .map(|number| ContextLine {
            number,
            text: lines[(number - 1) as usize].to_string(),
        })
        .collect();

    Some(SourceContext {
        start_line,
        end_line,
        lines,
    })
}

const SUPPRESSION_MARKER: &str = "modscope-ignore";

/// A `modscope-ignore` comment on the reported line, or alone on the line above
pub fn is_suppressed(lines: &[&str], line: u32) -> bool {
    let Some(index) = (line as usize).checked_sub(1) else {
        return false;
    };
    if let Some(current) = lines.get(index) {
        if current.contains(SUPPRESSION_MARKER) {
            return true;
        }
    }
    if let Some(prev) = index.checked_sub(1).and_then(|i| lines.get(i)) {
        let prev = prev.trim();
        if (prev.starts_with("//") || prev.starts_with("/*")) && prev.contains(SUPPRESSION_MARKER) {
            return true;
        }
    }
    false
}
