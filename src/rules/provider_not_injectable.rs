//! Providers listed in a module that are not marked `@Injectable`
//!
//! Only classes declared in the analyzed sources are checked; string
//! tokens and library classes are unknown here and skipped.

use super::base::{ProjectContext, ProjectRule, Report, RuleMeta};
use crate::classifier::{has_marker, INJECTABLE_MARKER};
use crate::models::{Category, Scope, Severity};
use crate::parsers::ClassInfo;
use anyhow::Result;
use std::collections::HashMap;

pub const ID: &str = "correctness/provider-not-injectable";

pub struct ProviderNotInjectableRule {
    meta: RuleMeta,
}

impl ProviderNotInjectableRule {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                ID,
                Category::Correctness,
                Severity::Error,
                "Class registered as a provider is not decorated with @Injectable()",
                "Add @Injectable() to the class so the container can resolve its constructor dependencies.",
                Scope::Project,
            ),
        }
    }
}

impl Default for ProviderNotInjectableRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRule for ProviderNotInjectableRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, ctx: &mut ProjectContext<'_>) -> Result<()> {
        let classes: HashMap<&str, &ClassInfo> = ctx
            .units
            .iter()
            .flat_map(|unit| unit.classes.iter())
            .map(|class| (class.name.as_str(), class))
            .collect();

        for node in ctx.graph.modules.values() {
            for provider in &node.providers {
                // Merged graphs namespace providers as `<project>/<name>`
                let bare = provider.rsplit('/').next().unwrap_or(provider);
                let Some(class) = classes.get(bare) else {
                    continue;
                };
                if has_marker(class, INJECTABLE_MARKER) {
                    continue;
                }
                let message = format!(
                    "Provider '{}' in module '{}' is not decorated with @Injectable()",
                    bare, node.name
                );
                ctx.report(Report::new(message, node.line, 1).in_file(node.file_path.clone()));
            }
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
    use crate::providers;
    use std::path::Path;

    #[test]
    fn test_reports_plain_class_provider() {
        let units = vec![parse_source(
            "export class PlainHelper {}\n@Injectable()\nexport class GoodService {}\n@Module({ providers: [PlainHelper, GoodService, ExternalThing] })\nexport class AppModule {}\n",
            Path::new("app.module.ts"),
        )
        .unwrap()];
        let graph = graph::build(&units);
        let providers = providers::resolve(&units);
        let config = ModscopeConfig::default();
        let mut ctx = ProjectContext::new(&units, &graph, &providers, &config);

        ProviderNotInjectableRule::new().check(&mut ctx).unwrap();

        assert_eq!(ctx.reports.len(), 1);
        assert!(ctx.reports[0].message.contains("PlainHelper"));
        assert!(ctx.reports[0].message.contains("AppModule"));
    }
}
