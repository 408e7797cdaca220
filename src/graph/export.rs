//! Graph export (Graphviz DOT and JSON)

use super::ModuleGraph;
use anyhow::Result;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Convert the module graph into a petgraph `DiGraph`
pub fn to_petgraph(graph: &ModuleGraph) -> DiGraph<&str, &str> {
    let mut dg = DiGraph::with_capacity(graph.modules.len(), graph.edge_count());
    let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(graph.modules.len());

    for name in graph.modules.keys() {
        index.insert(name.as_str(), dg.add_node(name.as_str()));
    }
    for (from, targets) in &graph.edges {
        let Some(&src) = index.get(from.as_str()) else {
            continue;
        };
        for target in targets {
            if let Some(&dst) = index.get(target.as_str()) {
                dg.add_edge(src, dst, "");
            }
        }
    }
    dg
}

pub fn to_dot(graph: &ModuleGraph) -> String {
    let dg = to_petgraph(graph);
    format!("{}", Dot::with_config(&dg, &[Config::EdgeNoLabel]))
}

pub fn to_json(graph: &ModuleGraph) -> Result<String> {
    Ok(serde_json::to_string_pretty(graph)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ModuleNode;

    fn sample() -> ModuleGraph {
        let mut graph = ModuleGraph::default();
        for (name, imports) in [("AppModule", vec!["UsersModule"]), ("UsersModule", vec![])] {
            graph.modules.insert(
                name.to_string(),
                ModuleNode {
                    name: name.to_string(),
                    imports: imports.into_iter().map(String::from).collect(),
                    ..Default::default()
                },
            );
        }
        graph.rebuild_edges();
        graph
    }

    #[test]
    fn test_dot_contains_nodes_and_edge() {
        let dot = to_dot(&sample());
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("AppModule"));
        assert!(dot.contains("UsersModule"));
        assert!(dot.contains("0 -> 1"));
    }

    #[test]
    fn test_json_shape() {
        let json = to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["edges"]["AppModule"][0], "UsersModule");
        assert!(value["providerToModule"].is_object());
        assert_eq!(value["modules"]["UsersModule"]["filePath"], "");
    }
}
