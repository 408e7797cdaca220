//! Workspace discovery
//!
//! A workspace is the analyzed root plus everything needed to turn it into
//! source units: configuration, sub-project layout, exclusion globs and the
//! rule set. Both the batch scan and the scan session drive one of these.

use crate::config::{load_project_config, ModscopeConfig};
use crate::error::ScanError;
use crate::graph::{self, ModuleGraph};
use crate::parsers::{self, SourceUnit};
use crate::providers::{self, ProviderMap};
use crate::rules::RuleSet;
use globset::GlobSet;
use ignore::gitignore::GitignoreBuilder;
use ignore::{Match, WalkBuilder};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", "coverage"];

/// Ignore files honored by the walker, in precedence order
const IGNORE_FILES: &[&str] = &[".gitignore", ".modscopeignore"];

pub const NEST_CLI_CONFIG: &str = "nest-cli.json";

/// One sub-project of a multi-project workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubProject {
    pub name: String,
    /// Relative to the workspace root
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct NestCliConfig {
    #[serde(default)]
    monorepo: bool,
    #[serde(default)]
    projects: IndexMap<String, NestCliProject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NestCliProject {
    root: Option<PathBuf>,
    source_root: Option<PathBuf>,
}

pub struct Workspace {
    root: PathBuf,
    config: ModscopeConfig,
    projects: Vec<SubProject>,
    exclude: GlobSet,
}

impl Workspace {
    /// Open a workspace. A missing or non-directory root is the only failure.
    pub fn open(root: &Path, config_override: Option<ModscopeConfig>) -> Result<Self, ScanError> {
        if !root.exists() {
            return Err(ScanError::ProjectNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        let root = root.canonicalize().map_err(|source| ScanError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let config = config_override.unwrap_or_else(|| load_project_config(&root));
        let projects = discover_projects(&root, &config);
        let exclude = config.exclude_set();

        if !projects.is_empty() {
            info!(
                "Multi-project workspace: {}",
                projects
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(Self {
            root,
            config,
            projects,
            exclude,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ModscopeConfig {
        &self.config
    }

    pub fn projects(&self) -> &[SubProject] {
        &self.projects
    }

    /// Re-check that the root is still there
    pub fn ensure_present(&self) -> Result<(), ScanError> {
        if !self.root.is_dir() {
            return Err(ScanError::ProjectNotFound(self.root.clone()));
        }
        Ok(())
    }

    /// Built-in rules plus configured plugins. A broken plugin is logged and skipped.
    pub fn rule_set(&self) -> RuleSet {
        let mut rules = RuleSet::builtin();
        for plugin in &self.config.plugins {
            let path = self.root.join(plugin);
            if let Err(e) = rules.register_plugin(&path) {
                warn!("Skipping plugin {}: {}", path.display(), e);
            }
        }
        rules
    }

    /// Path relative to the workspace root, as recorded on source units.
    /// `None` when the path lies outside the root.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        let rel = if path.is_relative() {
            normalize(path)
        } else if let Ok(rel) = path.strip_prefix(&self.root) {
            rel.to_path_buf()
        } else {
            // The host may hand us a non-canonical spelling of the root
            path.canonicalize()
                .ok()?
                .strip_prefix(&self.root)
                .ok()?
                .to_path_buf()
        };
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        (!escapes).then_some(rel)
    }

    /// Whether a relative path is a source file this workspace analyzes
    pub fn is_source(&self, rel_path: &Path) -> bool {
        parsers::is_analyzable(rel_path)
            && !self.exclude.is_match(rel_path)
            && !rel_path.components().any(|c| match c {
                Component::Normal(name) => SKIPPED_DIRS.iter().any(|d| name == *d),
                _ => false,
            })
    }

    /// Whether the walker in [`Self::collect_source_files`] would reach this
    /// file: a source, not hidden, not matched by an ignore file
    pub fn admits(&self, rel_path: &Path) -> bool {
        self.is_source(rel_path) && !is_hidden(rel_path) && !self.is_ignored(rel_path)
    }

    /// `.gitignore` / `.modscopeignore` from the root down to the file's
    /// directory; the deepest match decides
    fn is_ignored(&self, rel_path: &Path) -> bool {
        let abs = self.root.join(rel_path);
        let mut dirs = vec![self.root.clone()];
        if let Some(parent) = rel_path.parent() {
            let mut dir = self.root.clone();
            for component in parent.components() {
                dir.push(component);
                dirs.push(dir.clone());
            }
        }

        for dir in dirs.iter().rev() {
            let mut builder = GitignoreBuilder::new(dir);
            let mut any = false;
            for name in IGNORE_FILES {
                let file = dir.join(name);
                if file.is_file() {
                    if let Some(e) = builder.add(&file) {
                        debug!("Ignore file {}: {}", file.display(), e);
                    }
                    any = true;
                }
            }
            if !any {
                continue;
            }
            let matcher = match builder.build() {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping ignore rules in {}: {}", dir.display(), e);
                    continue;
                }
            };
            match matcher.matched_path_or_any_parents(&abs, false) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }
        false
    }

    /// All analyzable files, relative to the root, sorted
    pub fn collect_source_files(&self) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .add_custom_ignore_filename(IGNORE_FILES[1])
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !SKIPPED_DIRS.iter().any(|d| name == *d)
            });

        let mut files: Vec<PathBuf> = builder
            .build()
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let rel = entry.path().strip_prefix(&self.root).ok()?.to_path_buf();
                self.is_source(&rel).then_some(rel)
            })
            .collect();
        files.sort();
        debug!("Found {} source files under {}", files.len(), self.root.display());
        files
    }

    /// Parse one file. `None` when it cannot be read or parsed.
    pub fn parse(&self, rel_path: &Path) -> Option<SourceUnit> {
        match parsers::parse_file(&self.root.join(rel_path), rel_path) {
            Ok(unit) => Some(unit),
            Err(e) => {
                warn!("Failed to parse {}: {:#}", rel_path.display(), e);
                None
            }
        }
    }

    /// Parse files in parallel; the result is ordered by path
    pub fn parse_all(&self, files: &[PathBuf]) -> Vec<SourceUnit> {
        let mut units: Vec<SourceUnit> = files.par_iter().filter_map(|f| self.parse(f)).collect();
        units.sort_by(|a, b| a.path.cmp(&b.path));
        units
    }

    /// Module graph and provider map, merged per sub-project when there are several
    pub fn analyze_structure(&self, units: &[SourceUnit]) -> (ModuleGraph, ProviderMap) {
        if self.projects.is_empty() {
            return (graph::build(units), providers::resolve(units));
        }

        let mut graphs = Vec::with_capacity(self.projects.len());
        let mut provider_maps = Vec::with_capacity(self.projects.len());
        for project in &self.projects {
            let members: Vec<SourceUnit> = units
                .iter()
                .filter(|u| u.path.starts_with(&project.root))
                .cloned()
                .collect();
            debug!("Project {}: {} files", project.name, members.len());
            graphs.push((project.name.clone(), graph::build(&members)));
            provider_maps.push((project.name.clone(), providers::resolve(&members)));
        }
        (
            graph::merge_graphs(&graphs),
            providers::merge_providers(&provider_maps),
        )
    }
}

/// Sub-projects from configuration, else from a monorepo `nest-cli.json`
pub fn discover_projects(root: &Path, config: &ModscopeConfig) -> Vec<SubProject> {
    if !config.projects.is_empty() {
        return config
            .projects
            .iter()
            .map(|p| SubProject {
                name: p.name.clone(),
                root: normalize(&p.root),
            })
            .collect();
    }

    let path = root.join(NEST_CLI_CONFIG);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return vec![];
    };
    let cli: NestCliConfig = match serde_json::from_str(&content) {
        Ok(cli) => cli,
        Err(e) => {
            warn!("Failed to parse {}: {}", path.display(), e);
            return vec![];
        }
    };
    if !cli.monorepo {
        return vec![];
    }

    cli.projects
        .into_iter()
        .filter_map(|(name, project)| {
            let root = project.root.or(project.source_root)?;
            Some(SubProject {
                name,
                root: normalize(&root),
            })
        })
        .collect()
}

fn is_hidden(rel_path: &Path) -> bool {
    rel_path.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Drop `./` components so prefix checks work on relative paths
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_root() {
        let err = Workspace::open(Path::new("/definitely/not/here"), None).err().unwrap();
        assert!(err.is_missing());

        let dir = tempdir().unwrap();
        write(dir.path(), "file.ts", "");
        let err = Workspace::open(&dir.path().join("file.ts"), None).err().unwrap();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[test]
    fn test_collects_only_sources() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/app.module.ts", "");
        write(dir.path(), "src/app.service.spec.ts", "");
        write(dir.path(), "src/types.d.ts", "");
        write(dir.path(), "src/main.js", "");
        write(dir.path(), "node_modules/lib/index.ts", "");
        write(dir.path(), "dist/app.module.ts", "");
        write(dir.path(), "src/generated/client.ts", "");
        write(
            dir.path(),
            "modscope.toml",
            "[exclude]\npaths = [\"**/generated/**\"]\n",
        );

        let ws = Workspace::open(dir.path(), None).unwrap();
        assert_eq!(ws.collect_source_files(), vec![PathBuf::from("src/app.module.ts")]);
    }

    #[test]
    fn test_nest_cli_monorepo() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            NEST_CLI_CONFIG,
            r#"{ "monorepo": true, "projects": {
                "api": { "type": "application", "root": "apps/api" },
                "worker": { "type": "application", "root": "./apps/worker" },
                "shared": { "type": "library", "sourceRoot": "libs/shared/src" }
            } }"#,
        );
        let projects = discover_projects(dir.path(), &ModscopeConfig::default());
        assert_eq!(projects.len(), 3);
        assert_eq!(projects[1].root, PathBuf::from("apps/worker"));
        assert_eq!(projects[2].root, PathBuf::from("libs/shared/src"));
    }

    #[test]
    fn test_non_monorepo_is_single_project() {
        let dir = tempdir().unwrap();
        write(dir.path(), NEST_CLI_CONFIG, r#"{ "sourceRoot": "src" }"#);
        assert!(discover_projects(dir.path(), &ModscopeConfig::default()).is_empty());
    }

    #[test]
    fn test_relative_paths() {
        let dir = tempdir().unwrap();
        let ws = Workspace::open(dir.path(), None).unwrap();
        assert_eq!(ws.relative(Path::new("./src/a.ts")), Some(PathBuf::from("src/a.ts")));
        assert_eq!(ws.relative(&ws.root().join("src/a.ts")), Some(PathBuf::from("src/a.ts")));
        assert_eq!(ws.relative(Path::new("../other/a.ts")), None);
        assert_eq!(ws.relative(Path::new("/elsewhere/a.ts")), None);
    }

    #[test]
    fn test_admits_matches_walker() {
        let dir = tempdir().unwrap();
        write(dir.path(), ".gitignore", "generated/\n*.local.ts\n");
        write(dir.path(), "src/.modscopeignore", "legacy.ts\n");
        write(dir.path(), "src/app.ts", "");
        write(dir.path(), "src/app.local.ts", "");
        write(dir.path(), "src/legacy.ts", "");
        write(dir.path(), "generated/client.ts", "");
        write(dir.path(), ".hidden/a.ts", "");

        let ws = Workspace::open(dir.path(), None).unwrap();
        let walked = ws.collect_source_files();
        assert_eq!(walked, vec![PathBuf::from("src/app.ts")]);
        for rel in ["src/app.ts", "src/app.local.ts", "src/legacy.ts", "generated/client.ts", ".hidden/a.ts"] {
            let rel = Path::new(rel);
            assert_eq!(ws.admits(rel), walked.iter().any(|w| w == rel), "{}", rel.display());
        }
    }
}
