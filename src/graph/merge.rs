//! Multi-project graph merge
//!
//! Each sub-project's graph is namespaced as `<project>/<name>`. References
//! that resolve inside their own project are prefixed with it; anything else
//! keeps its bare name, so cross-project imports never resolve by accident.

use super::{ModuleGraph, ModuleNode};

pub fn merge_graphs(projects: &[(String, ModuleGraph)]) -> ModuleGraph {
    let mut merged = ModuleGraph::default();

    for (project, graph) in projects {
        let prefix = |name: &str| format!("{project}/{name}");
        let local = |name: &String| {
            if graph.modules.contains_key(name) || graph.provider_to_module.contains_key(name) {
                prefix(name)
            } else {
                name.clone()
            }
        };

        for (name, node) in &graph.modules {
            let renamed = ModuleNode {
                name: prefix(name),
                file_path: node.file_path.clone(),
                line: node.line,
                imports: node
                    .imports
                    .iter()
                    .map(|import| {
                        if graph.modules.contains_key(import) {
                            prefix(import)
                        } else {
                            import.clone()
                        }
                    })
                    .collect(),
                exports: node.exports.iter().map(&local).collect(),
                providers: node.providers.iter().map(|p| prefix(p)).collect(),
                controllers: node.controllers.iter().map(|c| prefix(c)).collect(),
            };
            merged.modules.insert(renamed.name.clone(), renamed);
        }
    }

    merged.rebuild_edges();
    merged.rebuild_provider_index();
    merged
}
