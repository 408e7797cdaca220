//! Project metadata for reports
//!
//! Read from `package.json` and from the analyzed structure. A missing or
//! malformed manifest only leaves the manifest fields empty.

use super::workspace::SubProject;
use crate::classifier::{classify, Role};
use crate::graph::ModuleGraph;
use crate::parsers::SourceUnit;
use crate::providers::ProviderMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Framework package whose version is reported
pub const FRAMEWORK_PACKAGE: &str = "@nestjs/core";

/// ORM name -> packages that indicate it
const ORM_PACKAGES: &[(&str, &[&str])] = &[
    ("typeorm", &["typeorm", "@nestjs/typeorm"]),
    ("prisma", &["@prisma/client", "prisma"]),
    ("mongoose", &["mongoose", "@nestjs/mongoose"]),
    ("sequelize", &["sequelize", "@nestjs/sequelize"]),
    ("mikro-orm", &["@mikro-orm/core", "@mikro-orm/nestjs"]),
    ("drizzle", &["drizzle-orm"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub name: Option<String>,
    pub framework_version: Option<String>,
    pub orm: Option<String>,
    pub file_count: usize,
    pub module_count: usize,
    pub provider_count: usize,
    pub controller_count: usize,
    /// Sub-project names for multi-project workspaces
    pub projects: Vec<String>,
}

#[derive(Debug, Default)]
struct PackageManifest {
    name: Option<String>,
    dependencies: Vec<(String, String)>,
}

fn read_manifest(root: &Path) -> PackageManifest {
    let path = root.join("package.json");
    let Ok(content) = std::fs::read_to_string(&path) else {
        return PackageManifest::default();
    };
    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            debug!("Ignoring malformed {}: {}", path.display(), e);
            return PackageManifest::default();
        }
    };

    let mut dependencies = Vec::new();
    for section in ["dependencies", "devDependencies", "peerDependencies"] {
        if let Some(deps) = value.get(section).and_then(|d| d.as_object()) {
            for (name, version) in deps {
                dependencies.push((name.clone(), version.as_str().unwrap_or("").to_string()));
            }
        }
    }

    PackageManifest {
        name: value.get("name").and_then(|n| n.as_str()).map(String::from),
        dependencies,
    }
}

pub fn detect_metadata(
    root: &Path,
    units: &[SourceUnit],
    graph: &ModuleGraph,
    providers: &ProviderMap,
    projects: &[SubProject],
) -> ProjectMetadata {
    let manifest = read_manifest(root);
    let has = |package: &str| manifest.dependencies.iter().any(|(name, _)| name == package);

    let framework_version = manifest
        .dependencies
        .iter()
        .find(|(name, _)| name == FRAMEWORK_PACKAGE)
        .map(|(_, version)| version.clone());

    let orm = ORM_PACKAGES
        .iter()
        .find(|(_, packages)| packages.iter().any(|p| has(p)))
        .map(|(orm, _)| orm.to_string());

    let controller_count = units
        .iter()
        .flat_map(|u| u.classes.iter())
        .filter(|c| classify(c) == Role::Controller)
        .count();

    ProjectMetadata {
        name: manifest.name,
        framework_version,
        orm,
        file_count: units.len(),
        module_count: graph.modules.len(),
        provider_count: providers.len(),
        controller_count,
        projects: projects.iter().map(|p| p.name.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_manifest() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{ "name": "shop-api", "dependencies": { "@nestjs/core": "^10.3.0", "@nestjs/typeorm": "^10.0.0" } }"#,
        )
        .unwrap();
        let meta = detect_metadata(dir.path(), &[], &ModuleGraph::default(), &ProviderMap::new(), &[]);
        assert_eq!(meta.name.as_deref(), Some("shop-api"));
        assert_eq!(meta.framework_version.as_deref(), Some("^10.3.0"));
        assert_eq!(meta.orm.as_deref(), Some("typeorm"));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempdir().unwrap();
        let meta = detect_metadata(dir.path(), &[], &ModuleGraph::default(), &ProviderMap::new(), &[]);
        assert_eq!(meta, ProjectMetadata::default());
    }
}
