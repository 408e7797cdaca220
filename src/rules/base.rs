//! Base rule traits and types
//!
//! This module defines the core abstractions for rule evaluation:
//! - `FileRule` / `ProjectRule`, the two rule shapes
//! - `RuleUnit`, the opaque handle the engine iterates over
//! - `Report`, the only thing a rule can hand back
//! - `RuleError`, a captured per-invocation failure

use crate::config::ModscopeConfig;
use crate::graph::ModuleGraph;
use crate::models::{Category, Scope, Severity};
use crate::parsers::SourceUnit;
use crate::providers::ProviderMap;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Fixed metadata of a rule. The engine stamps id, category and severity
/// onto every diagnostic; rules cannot override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    /// Namespaced `category/name`
    pub id: String,
    pub category: Category,
    pub severity: Severity,
    pub description: String,
    /// Remediation text
    pub help: String,
    pub scope: Scope,
}

impl RuleMeta {
    pub fn new(
        id: impl Into<String>,
        category: Category,
        severity: Severity,
        description: impl Into<String>,
        help: impl Into<String>,
        scope: Scope,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            severity,
            description: description.into(),
            help: help.into(),
            scope,
        }
    }
}

/// The partial diagnostic a rule reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Target file for project rules; ignored for file rules
    pub file: Option<PathBuf>,
    pub message: String,
    /// 1-based
    pub line: u32,
    /// 1-based
    pub column: u32,
}

impl Report {
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: None,
            message: message.into(),
            line,
            column,
        }
    }

    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Input to a file rule: one parsed file
pub struct FileContext<'a> {
    pub unit: &'a SourceUnit,
    pub config: &'a ModscopeConfig,
    pub(crate) reports: Vec<Report>,
}

impl<'a> FileContext<'a> {
    pub fn new(unit: &'a SourceUnit, config: &'a ModscopeConfig) -> Self {
        Self {
            unit,
            config,
            reports: Vec::new(),
        }
    }

    pub fn report(&mut self, report: Report) {
        self.reports.push(report);
    }
}

/// Input to a project rule: the whole snapshot
pub struct ProjectContext<'a> {
    pub units: &'a [SourceUnit],
    pub graph: &'a ModuleGraph,
    pub providers: &'a ProviderMap,
    pub config: &'a ModscopeConfig,
    pub(crate) reports: Vec<Report>,
}

impl<'a> ProjectContext<'a> {
    pub fn new(
        units: &'a [SourceUnit],
        graph: &'a ModuleGraph,
        providers: &'a ProviderMap,
        config: &'a ModscopeConfig,
    ) -> Self {
        Self {
            units,
            graph,
            providers,
            config,
            reports: Vec::new(),
        }
    }

    pub fn report(&mut self, report: Report) {
        self.reports.push(report);
    }
}

/// A check over one source file
pub trait FileRule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    fn check(&self, ctx: &mut FileContext<'_>) -> Result<()>;
}

/// A check over the whole project snapshot
pub trait ProjectRule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    fn check(&self, ctx: &mut ProjectContext<'_>) -> Result<()>;
}

/// An opaque rule of either shape
#[derive(Clone)]
pub enum RuleUnit {
    File(Arc<dyn FileRule>),
    Project(Arc<dyn ProjectRule>),
}

impl RuleUnit {
    pub fn file(rule: impl FileRule + 'static) -> Self {
        RuleUnit::File(Arc::new(rule))
    }

    pub fn project(rule: impl ProjectRule + 'static) -> Self {
        RuleUnit::Project(Arc::new(rule))
    }

    pub fn meta(&self) -> &RuleMeta {
        match self {
            RuleUnit::File(rule) => rule.meta(),
            RuleUnit::Project(rule) => rule.meta(),
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }
}

impl std::fmt::Debug for RuleUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = match self {
            RuleUnit::File(_) => "File",
            RuleUnit::Project(_) => "Project",
        };
        f.debug_tuple(shape).field(&self.meta().id).finish()
    }
}

/// A rule invocation that returned an error or panicked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleError {
    pub rule_id: String,
    /// The file being checked, for file rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    pub error: String,
}
