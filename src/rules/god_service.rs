//! Injectables exposing too many public methods
//!
//! A service with a wide public surface usually owns several
//! responsibilities. Counts come from the provider resolver: methods with no
//! visibility keyword or an explicit `public`.

use super::base::{ProjectContext, ProjectRule, Report, RuleMeta};
use crate::models::{Category, Scope, Severity};
use anyhow::Result;

pub const ID: &str = "architecture/god-service";

pub const DEFAULT_MAX_PUBLIC_METHODS: i64 = 10;

pub struct GodServiceRule {
    meta: RuleMeta,
}

impl GodServiceRule {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                ID,
                Category::Architecture,
                Severity::Warning,
                "Injectable exposes too many public methods",
                "Split the service along its responsibilities and inject the smaller services instead.",
                Scope::Project,
            ),
        }
    }
}

impl Default for GodServiceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRule for GodServiceRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, ctx: &mut ProjectContext<'_>) -> Result<()> {
        let max = ctx
            .config
            .threshold_i64(ID, "max_public_methods")
            .unwrap_or(DEFAULT_MAX_PUBLIC_METHODS)
            .max(0) as usize;

        for provider in ctx.providers.values() {
            if provider.public_methods > max {
                let message = format!(
                    "Service '{}' exposes {} public methods (max {})",
                    provider.name, provider.public_methods, max
                );
                ctx.report(
                    Report::new(message, provider.line, 1).in_file(provider.file_path.clone()),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModscopeConfig;
    use crate::graph::ModuleGraph;
    use crate::parsers::typescript::parse_source;
    use crate::providers;
    use std::path::Path;

    fn service_with(public: usize, private: usize) -> String {
        let mut source = String::from("@Injectable()\nexport class BigService {\n");
        for i in 0..public {
            source.push_str(&format!("  op{i}() {{}}\n"));
        }
        for i in 0..private {
            source.push_str(&format!("  private helper{i}() {{}}\n"));
        }
        source.push_str("}\n");
        source
    }

    fn run(source: &str) -> Vec<Report> {
        let units = vec![parse_source(source, Path::new("big.service.ts")).unwrap()];
        let providers = providers::resolve(&units);
        let graph = ModuleGraph::default();
        let config = ModscopeConfig::default();
        let mut ctx = ProjectContext::new(&units, &graph, &providers, &config);
        GodServiceRule::new().check(&mut ctx).unwrap();
        ctx.reports
    }

    #[test]
    fn test_reports_wide_service() {
        let reports = run(&service_with(11, 0));
        assert_eq!(reports.len(), 1);
        assert!(reports[0].message.contains("11 public methods"));
    }

    #[test]
    fn test_private_methods_do_not_count() {
        assert!(run(&service_with(10, 5)).is_empty());
    }
}
