//! Modules declaring too many providers

use super::base::{ProjectContext, ProjectRule, Report, RuleMeta};
use crate::models::{Category, Scope, Severity};
use anyhow::Result;

pub const ID: &str = "architecture/max-providers-per-module";

/// Provider count above which a module is reported
pub const DEFAULT_MAX: i64 = 10;

pub struct MaxProvidersRule {
    meta: RuleMeta,
}

impl MaxProvidersRule {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                ID,
                Category::Architecture,
                Severity::Warning,
                "Module declares more providers than the configured maximum",
                "Split the module by feature so each one owns a small, cohesive set of providers.",
                Scope::Project,
            ),
        }
    }
}

impl Default for MaxProvidersRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRule for MaxProvidersRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, ctx: &mut ProjectContext<'_>) -> Result<()> {
        let max = ctx.config.threshold_i64(ID, "max").unwrap_or(DEFAULT_MAX).max(0) as usize;

        for node in ctx.graph.modules.values() {
            let count = node.providers.len();
            if count > max {
                let message = format!(
                    "Module '{}' declares {} providers (max {})",
                    node.name, count, max
                );
                ctx.report(Report::new(message, node.line, 1).in_file(node.file_path.clone()));
            }
        }
        Ok(())
    }
}
