//! Circular module imports
//!
//! Reports every cycle the module graph's DFS finds. The same loop may be
//! reported once per entry point.

use super::base::{ProjectContext, ProjectRule, Report, RuleMeta};
use crate::models::{Category, Scope, Severity};
use anyhow::Result;

pub const ID: &str = "architecture/no-circular-module-deps";

pub struct CircularModuleDepsRule {
    meta: RuleMeta,
}

impl CircularModuleDepsRule {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                ID,
                Category::Architecture,
                Severity::Error,
                "Modules import each other in a cycle",
                "Extract the shared providers into a separate module both can import, \
                 or break the loop with forwardRef() as a last resort.",
                Scope::Project,
            ),
        }
    }
}

impl Default for CircularModuleDepsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRule for CircularModuleDepsRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, ctx: &mut ProjectContext<'_>) -> Result<()> {
        for cycle in ctx.graph.find_cycles() {
            let Some(first) = cycle.first().and_then(|name| ctx.graph.module(name)) else {
                continue;
            };
            let mut path = cycle.clone();
            path.push(first.name.clone());
            let message = format!("Circular module dependency: {}", path.join(" -> "));
            ctx.report(Report::new(message, first.line, 1).in_file(first.file_path.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModscopeConfig;
    use crate::graph;
    use crate::parsers::typescript::parse_source;
    use crate::providers::ProviderMap;
    use std::path::Path;

    #[test]
    fn test_reports_mutual_imports() {
        let units = vec![
            parse_source("@Module({ imports: [BModule] })\nexport class AModule {}\n", Path::new("a.module.ts")).unwrap(),
            parse_source("@Module({ imports: [AModule] })\nexport class BModule {}\n", Path::new("b.module.ts")).unwrap(),
        ];
        let graph = graph::build(&units);
        let config = ModscopeConfig::default();
        let providers = ProviderMap::new();
        let mut ctx = ProjectContext::new(&units, &graph, &providers, &config);

        CircularModuleDepsRule::new().check(&mut ctx).unwrap();

        assert_eq!(ctx.reports.len(), 1);
        let report = &ctx.reports[0];
        assert!(report.message.contains("AModule"));
        assert!(report.message.contains("BModule"));
        assert_eq!(report.file.as_deref(), Some(Path::new("a.module.ts")));
        assert_eq!(report.line, 2);
    }
}
