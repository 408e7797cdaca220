//! Provider / dependency resolver
//!
//! Resolution is purely lexical: a dependency is whatever bare name the
//! constructor parameter's type annotation spells. Two classes with the same
//! name collide and the later one wins.

use crate::classifier::{has_marker, INJECTABLE_MARKER};
use crate::graph::cycles;
use crate::parsers::{ClassInfo, SourceUnit, Visibility};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: String,
    pub file_path: PathBuf,
    pub line: u32,
    pub dependencies: Vec<String>,
    pub public_methods: usize,
}

pub type ProviderMap = IndexMap<String, ProviderInfo>;

/// Build injectable name -> provider info for every `@Injectable` class
pub fn resolve(units: &[SourceUnit]) -> ProviderMap {
    let mut providers = ProviderMap::new();
    for unit in units {
        for class in &unit.classes {
            if !has_marker(class, INJECTABLE_MARKER) {
                continue;
            }
            providers.insert(
                class.name.clone(),
                ProviderInfo {
                    name: class.name.clone(),
                    file_path: unit.path.clone(),
                    line: class.line,
                    dependencies: dependencies(class),
                    public_methods: public_method_count(class),
                },
            );
        }
    }
    providers
}

fn dependencies(class: &ClassInfo) -> Vec<String> {
    class
        .constructor_params
        .iter()
        .filter_map(|p| p.type_text.as_deref())
        .filter_map(bare_type_name)
        .collect()
}

/// `Repository<User>` -> `Repository`, `ns.Service` -> `Service`
pub fn bare_type_name(type_text: &str) -> Option<String> {
    let head = type_text.split('<').next().unwrap_or(type_text);
    let name = head.rsplit('.').next().unwrap_or(head).trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Methods without a visibility keyword or with an explicit `public`
pub fn public_method_count(class: &ClassInfo) -> usize {
    class
        .methods
        .iter()
        .filter(|m| matches!(m.visibility, None | Some(Visibility::Public)))
        .count()
}

/// Provider dependency cycles, restricted to known providers
pub fn find_provider_cycles(providers: &ProviderMap) -> Vec<Vec<String>> {
    let adjacency: IndexMap<String, IndexSet<String>> = providers
        .iter()
        .map(|(name, info)| {
            let deps = info
                .dependencies
                .iter()
                .filter(|d| providers.contains_key(d.as_str()))
                .cloned()
                .collect();
            (name.clone(), deps)
        })
        .collect();
    cycles::find_cycles(&adjacency)
}

/// Namespace per-project provider maps the same way the module graph is merged
pub fn merge_providers(projects: &[(String, ProviderMap)]) -> ProviderMap {
    let mut merged = ProviderMap::new();
    for (project, providers) in projects {
        for (name, info) in providers {
            let key = format!("{project}/{name}");
            let dependencies = info
                .dependencies
                .iter()
                .map(|d| {
                    if providers.contains_key(d) {
                        format!("{project}/{d}")
                    } else {
                        d.clone()
                    }
                })
                .collect();
            merged.insert(
                key.clone(),
                ProviderInfo {
                    name: key,
                    dependencies,
                    ..info.clone()
                },
            );
        }
    }
    merged
}
