//! Injectables that depend on each other through their constructors

use super::base::{ProjectContext, ProjectRule, Report, RuleMeta};
use crate::models::{Category, Scope, Severity};
use crate::providers::find_provider_cycles;
use anyhow::Result;

pub const ID: &str = "correctness/no-circular-provider-deps";

pub struct CircularProviderDepsRule {
    meta: RuleMeta,
}

impl CircularProviderDepsRule {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                ID,
                Category::Correctness,
                Severity::Warning,
                "Providers inject each other in a cycle",
                "Move the shared logic into a third provider, or use forwardRef() on both sides \
                 if the cycle is intentional.",
                Scope::Project,
            ),
        }
    }
}

impl Default for CircularProviderDepsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRule for CircularProviderDepsRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, ctx: &mut ProjectContext<'_>) -> Result<()> {
        for cycle in find_provider_cycles(ctx.providers) {
            let Some(first) = cycle.first().and_then(|name| ctx.providers.get(name)) else {
                continue;
            };
            let mut path = cycle.clone();
            path.push(first.name.clone());
            let message = format!("Circular provider dependency: {}", path.join(" -> "));
            ctx.report(Report::new(message, first.line, 1).in_file(first.file_path.clone()));
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

    #[test]
    fn test_reports_constructor_cycle() {
        let units = vec![parse_source(
            "@Injectable()\nexport class OrdersService { constructor(private users: UsersService) {} }\n@Injectable()\nexport class UsersService { constructor(private orders: OrdersService) {} }\n",
            Path::new("services.ts"),
        )
        .unwrap()];
        let providers = providers::resolve(&units);
        let graph = ModuleGraph::default();
        let config = ModscopeConfig::default();
        let mut ctx = ProjectContext::new(&units, &graph, &providers, &config);

        CircularProviderDepsRule::new().check(&mut ctx).unwrap();

        assert_eq!(ctx.reports.len(), 1);
        assert_eq!(
            ctx.reports[0].message,
            "Circular provider dependency: OrdersService -> UsersService -> OrdersService"
        );
    }
}
