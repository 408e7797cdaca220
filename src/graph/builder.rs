//! Module graph construction
//!
//! Three passes over the parsed files:
//! 1. every class classified as a module becomes a node
//! 2. edges are computed once all nodes exist, so file order is irrelevant
//! 3. the provider -> module index is filled

use super::metadata::parse_module_metadata;
use super::{ModuleGraph, ModuleNode};
use crate::classifier::{classify, Role, MODULE_MARKER};
use crate::parsers::SourceUnit;
use tracing::debug;

pub fn build(units: &[SourceUnit]) -> ModuleGraph {
    let mut graph = ModuleGraph::default();

    for unit in units {
        for class in &unit.classes {
            if classify(class) != Role::Module {
                continue;
            }
            let argument = class
                .decorators
                .iter()
                .find(|d| d.name == MODULE_MARKER)
                .and_then(|d| d.argument.as_deref());
            let metadata = parse_module_metadata(argument);

            let node = ModuleNode {
                name: class.name.clone(),
                file_path: unit.path.clone(),
                line: class.line,
                imports: metadata.imports,
                exports: metadata.exports,
                providers: metadata.providers,
                controllers: metadata.controllers,
            };
            if graph.modules.insert(class.name.clone(), node).is_some() {
                debug!("Module {} declared more than once, keeping {}", class.name, unit.path.display());
            }
        }
    }

    graph.rebuild_edges();
    graph.rebuild_provider_index();

    debug!(
        "Built module graph: {} modules, {} edges",
        graph.modules.len(),
        graph.edge_count()
    );
    graph
}
