//! Core data models for modscope
//!
//! These models are shared by the rule engine, the scorer, the batch
//! pipeline and the scan session. Everything here serializes to camelCase
//! JSON because the same shapes travel over the editor transport.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity levels for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Penalty weight used by the scorer
    pub fn weight(self) -> f64 {
        match self {
            Severity::Error => 3.0,
            Severity::Warning => 1.5,
            Severity::Info => 0.5,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// What kind of problem a rule looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Correctness,
    Architecture,
    Performance,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Security,
        Category::Correctness,
        Category::Architecture,
        Category::Performance,
    ];

    /// Scoring multiplier. Security outweighs structure, structure outweighs performance.
    pub fn multiplier(self) -> f64 {
        match self {
            Category::Security => 1.5,
            Category::Correctness | Category::Architecture => 1.0,
            Category::Performance => 0.75,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Security => "security",
            Category::Correctness => "correctness",
            Category::Architecture => "architecture",
            Category::Performance => "performance",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a diagnostic came from a per-file or a whole-project rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    File,
    Project,
}

/// One numbered source line inside a context window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLine {
    pub number: u32,
    pub text: String,
}

/// Source lines surrounding a diagnostic (1-based, inclusive bounds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContext {
    pub start_line: u32,
    pub end_line: u32,
    pub lines: Vec<ContextLine>,
}

/// A single reported finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub file_path: PathBuf,
    pub rule_id: String,
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    pub help: String,
    pub line: u32,
    pub column: u32,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<SourceContext>,
}

/// Bounded health score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub value: u8,
    pub label: String,
}

/// Diagnostic counts by severity and by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub security: usize,
    pub correctness: usize,
    pub architecture: usize,
    pub performance: usize,
    pub total: usize,
}

impl SummaryCounts {
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let mut summary = Self::default();
        for d in diagnostics {
            match d.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.info += 1,
            }
            match d.category {
                Category::Security => summary.security += 1,
                Category::Correctness => summary.correctness += 1,
                Category::Architecture => summary.architecture += 1,
                Category::Performance => summary.performance += 1,
            }
            summary.total += 1;
        }
        summary
    }
}
