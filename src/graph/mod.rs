//! Module graph
//!
//! One node per `@Module` declaration, with the symbol lists read from its
//! metadata and an adjacency map restricted to known modules. The graph is
//! rebuilt wholesale on every scan; nothing mutates a node after `build`.

pub mod builder;
pub mod cycles;
pub mod export;
pub mod merge;
pub mod metadata;

pub use builder::build;
pub use export::{to_dot, to_json};
pub use merge::merge_graphs;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Graph representation of one module declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleNode {
    /// Class name, or `<project>/<name>` in a merged graph
    pub name: String,
    pub file_path: PathBuf,
    pub line: u32,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub providers: Vec<String>,
    pub controllers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleGraph {
    pub modules: IndexMap<String, ModuleNode>,
    /// module -> imported modules that exist in `modules`
    pub edges: IndexMap<String, IndexSet<String>>,
    /// provider -> declaring module (last declaration wins)
    pub provider_to_module: IndexMap<String, String>,
}

impl ModuleGraph {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleNode> {
        self.modules.get(name)
    }

    pub fn module_for_provider(&self, provider: &str) -> Option<&ModuleNode> {
        self.provider_to_module
            .get(provider)
            .and_then(|m| self.modules.get(m))
    }

    /// Recompute adjacency from the node map. Dangling imports are dropped.
    pub fn rebuild_edges(&mut self) {
        let mut edges = IndexMap::with_capacity(self.modules.len());
        for (name, node) in &self.modules {
            let targets: IndexSet<String> = node
                .imports
                .iter()
                .filter(|target| self.modules.contains_key(target.as_str()))
                .cloned()
                .collect();
            edges.insert(name.clone(), targets);
        }
        self.edges = edges;
    }

    pub fn rebuild_provider_index(&mut self) {
        self.provider_to_module.clear();
        for (name, node) in &self.modules {
            for provider in &node.providers {
                self.provider_to_module
                    .insert(provider.clone(), name.clone());
            }
        }
    }

    /// Every import cycle reachable by DFS. The same cycle may be reported
    /// from more than one entry point.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        cycles::find_cycles(&self.edges)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|targets| targets.len()).sum()
    }
}
