//! Incremental scan session
//!
//! Keeps one pipeline warm for an editor:
//!
//! ```text
//! Uninitialized ──initialize──▶ Ready ◀──▶ Scanning
//!        │                        │
//!        └──── project missing ───┴──▶ Terminated
//! ```
//!
//! The session owns the per-file diagnostic cache and the parsed units.
//! `file_changed` reparses one file, reruns file rules for it only, then
//! reruns every project rule; `full_rescan` rebuilds the whole cache. Each
//! call returns a freshly materialized diagnostic list.
//!
//! [`spawn`] runs a session on a tokio worker that talks to the host only
//! through [`HostMessage`] / [`WorkerMessage`].

mod worker;

pub use worker::{spawn, SessionHandle};

use crate::config::ModscopeConfig;
use crate::error::ScanError;
use crate::models::Diagnostic;
use crate::parsers::SourceUnit;
use crate::pipeline::Workspace;
use crate::rules::{RuleEngine, RuleError, RunOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Ready,
    Scanning,
    Terminated,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready => "ready",
            SessionState::Scanning => "scanning",
            SessionState::Terminated => "terminated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    Incremental,
    Full,
}

/// Host -> worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    FileChanged {
        #[serde(rename = "filePath")]
        file_path: PathBuf,
    },
    FullScan,
}

/// Worker -> host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    Ready,
    Result {
        diagnostics: Vec<Diagnostic>,
        #[serde(rename = "elapsedMs")]
        elapsed_ms: u64,
        #[serde(rename = "scanType")]
        scan_type: ScanType,
    },
    Error {
        message: String,
    },
    Missing,
}

/// Output of one session operation
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub diagnostics: Vec<Diagnostic>,
    pub rule_errors: Vec<RuleError>,
    pub elapsed_ms: u64,
    pub scan_type: ScanType,
}

impl From<ScanResult> for WorkerMessage {
    fn from(result: ScanResult) -> Self {
        WorkerMessage::Result {
            diagnostics: result.diagnostics,
            elapsed_ms: result.elapsed_ms,
            scan_type: result.scan_type,
        }
    }
}

/// Workspace and engine, present once the session is initialized
struct Pipeline {
    workspace: Workspace,
    engine: RuleEngine,
}

pub struct ScanSession {
    root: PathBuf,
    config_override: Option<ModscopeConfig>,
    state: SessionState,
    pipeline: Option<Pipeline>,
    /// Parsed files, ordered by path
    units: Vec<SourceUnit>,
    /// file -> file-rule diagnostics
    file_cache: BTreeMap<PathBuf, Vec<Diagnostic>>,
    project_diagnostics: Vec<Diagnostic>,
}

impl ScanSession {
    pub fn new(root: impl Into<PathBuf>, config_override: Option<ModscopeConfig>) -> Self {
        Self {
            root: root.into(),
            config_override,
            state: SessionState::Uninitialized,
            pipeline: None,
            units: Vec::new(),
            file_cache: BTreeMap::new(),
            project_diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files with a cache entry
    pub fn cached_files(&self) -> usize {
        self.file_cache.len()
    }

    pub fn cached_diagnostics(&self, rel_path: &Path) -> Option<&[Diagnostic]> {
        self.file_cache.get(rel_path).map(Vec::as_slice)
    }

    /// Open the workspace and run the first full scan
    pub fn initialize(&mut self) -> Result<ScanResult, ScanError> {
        if self.state != SessionState::Uninitialized {
            return Err(ScanError::InvalidState(self.state.as_str()));
        }

        let workspace = match Workspace::open(&self.root, self.config_override.clone()) {
            Ok(ws) => ws,
            Err(e) => {
                self.state = SessionState::Terminated;
                return Err(e);
            }
        };
        let engine = RuleEngine::new(&workspace.rule_set(), workspace.config().clone());
        info!(
            "Scan session for {} with {} rules",
            workspace.root().display(),
            engine.rule_count()
        );
        self.pipeline = Some(Pipeline { workspace, engine });
        self.state = SessionState::Ready;

        self.full_rescan()
    }

    /// Rescan one file, then rerun every project rule. Paths the full scan
    /// would not collect are dropped from the cache instead.
    pub fn file_changed(&mut self, path: &Path) -> Result<ScanResult, ScanError> {
        let start = self.begin()?;
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Err(ScanError::InvalidState(SessionState::Uninitialized.as_str()));
        };

        let Some(rel) = pipeline.workspace.relative(path) else {
            debug!("Ignoring {}: outside the workspace", path.display());
            return Ok(self.finish(start, ScanType::Incremental, Vec::new()));
        };
        let abs = pipeline.workspace.root().join(&rel);
        let unit = if pipeline.workspace.admits(&rel) && abs.is_file() {
            pipeline.workspace.parse(&rel)
        } else {
            None
        };

        let mut rule_errors = Vec::new();
        match unit {
            Some(unit) => {
                let outcome = pipeline.engine.run_file_rules(&unit);
                debug!(
                    "Rescanned {}: {} file diagnostics",
                    rel.display(),
                    outcome.diagnostics.len()
                );
                self.file_cache.insert(rel.clone(), outcome.diagnostics);
                rule_errors.extend(outcome.rule_errors);
                match self.units.binary_search_by(|u| u.path.as_path().cmp(&rel)) {
                    Ok(i) => self.units[i] = unit,
                    Err(i) => self.units.insert(i, unit),
                }
            }
            None => {
                debug!("Dropping {} from the session cache", rel.display());
                self.file_cache.remove(&rel);
                self.units.retain(|u| u.path != rel);
            }
        }

        rule_errors.extend(self.rerun_project_rules());
        Ok(self.finish(start, ScanType::Incremental, rule_errors))
    }

    /// Discard the cache and rebuild it file by file
    pub fn full_rescan(&mut self) -> Result<ScanResult, ScanError> {
        let start = self.begin()?;
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Err(ScanError::InvalidState(SessionState::Uninitialized.as_str()));
        };

        self.file_cache.clear();
        let files = pipeline.workspace.collect_source_files();
        self.units = pipeline.workspace.parse_all(&files);

        let mut rule_errors = Vec::new();
        for unit in &self.units {
            let outcome = pipeline.engine.run_file_rules(unit);
            self.file_cache.insert(unit.path.clone(), outcome.diagnostics);
            rule_errors.extend(outcome.rule_errors);
        }

        rule_errors.extend(self.rerun_project_rules());
        Ok(self.finish(start, ScanType::Full, rule_errors))
    }

    /// Return to `Ready` after a scan was abandoned by a panic
    pub fn recover(&mut self) {
        if self.state == SessionState::Scanning {
            self.state = SessionState::Ready;
        }
    }

    fn begin(&mut self) -> Result<Instant, ScanError> {
        if self.state != SessionState::Ready {
            return Err(ScanError::InvalidState(self.state.as_str()));
        }
        if let Some(pipeline) = &self.pipeline {
            if let Err(e) = pipeline.workspace.ensure_present() {
                self.state = SessionState::Terminated;
                return Err(e);
            }
        }
        self.state = SessionState::Scanning;
        Ok(Instant::now())
    }

    fn rerun_project_rules(&mut self) -> Vec<RuleError> {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Vec::new();
        };
        let (graph, providers) = pipeline.workspace.analyze_structure(&self.units);
        let RunOutcome {
            diagnostics,
            rule_errors,
        } = pipeline.engine.run_project_rules(&self.units, &graph, &providers);
        self.project_diagnostics = diagnostics;
        rule_errors
    }

    /// Cached file diagnostics in path order, then project diagnostics
    fn merged_diagnostics(&self) -> Vec<Diagnostic> {
        self.file_cache
            .values()
            .flatten()
            .chain(self.project_diagnostics.iter())
            .cloned()
            .collect()
    }

    fn finish(&mut self, start: Instant, scan_type: ScanType, rule_errors: Vec<RuleError>) -> ScanResult {
        self.state = SessionState::Ready;
        let result = ScanResult {
            diagnostics: self.merged_diagnostics(),
            rule_errors,
            elapsed_ms: start.elapsed().as_millis() as u64,
            scan_type,
        };
        debug!(
            "{:?} scan: {} diagnostics in {}ms",
            scan_type,
            result.diagnostics.len(),
            result.elapsed_ms
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MODULES: &str = "@Module({ imports: [BModule] })\nexport class AModule {}\n";
    const B_MODULE: &str = "@Module({ imports: [AModule] })\nexport class BModule {}\n";
    const LEAKY: &str = "export const jwt = { secret: 'hunter2hunter2' };\n";

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn count(result: &ScanResult, rule_id: &str) -> usize {
        result.diagnostics.iter().filter(|d| d.rule_id == rule_id).count()
    }

    #[test]
    fn test_initialize_then_incremental() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/a.module.ts", MODULES);
        write(dir.path(), "src/b.module.ts", B_MODULE);
        write(dir.path(), "src/config.ts", LEAKY);

        let mut session = ScanSession::new(dir.path(), None);
        assert_eq!(session.state(), SessionState::Uninitialized);

        let init = session.initialize().unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(init.scan_type, ScanType::Full);
        assert_eq!(count(&init, "security/hardcoded-secret"), 1);
        assert_eq!(count(&init, "architecture/no-circular-module-deps"), 1);
        assert_eq!(session.cached_files(), 3);

        // Fix the secret: the file entry is replaced, the cycle is still reported
        write(dir.path(), "src/config.ts", "export const jwt = { secret: process.env.JWT };\n");
        let result = session.file_changed(Path::new("src/config.ts")).unwrap();
        assert_eq!(result.scan_type, ScanType::Incremental);
        assert_eq!(count(&result, "security/hardcoded-secret"), 0);
        assert_eq!(count(&result, "architecture/no-circular-module-deps"), 1);

        // Break the cycle: project rules rerun on every change
        write(dir.path(), "src/b.module.ts", "@Module({})\nexport class BModule {}\n");
        let result = session.file_changed(&dir.path().join("src/b.module.ts")).unwrap();
        assert_eq!(count(&result, "architecture/no-circular-module-deps"), 0);
    }

    #[test]
    fn test_unchanged_files_come_from_cache() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/config.ts", LEAKY);
        write(dir.path(), "src/other.ts", "export const x = 1;\n");

        let mut session = ScanSession::new(dir.path(), None);
        session.initialize().unwrap();

        // Changing the file on disk without notifying keeps the cached entry
        write(dir.path(), "src/config.ts", "export const clean = true;\n");
        let result = session.file_changed(Path::new("src/other.ts")).unwrap();
        assert_eq!(count(&result, "security/hardcoded-secret"), 1);

        let result = session.full_rescan().unwrap();
        assert_eq!(result.scan_type, ScanType::Full);
        assert_eq!(count(&result, "security/hardcoded-secret"), 0);
    }

    #[test]
    fn test_deleted_file_drops_entry() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/config.ts", LEAKY);

        let mut session = ScanSession::new(dir.path(), None);
        session.initialize().unwrap();
        assert!(session.cached_diagnostics(Path::new("src/config.ts")).is_some());

        std::fs::remove_file(dir.path().join("src/config.ts")).unwrap();
        let result = session.file_changed(Path::new("src/config.ts")).unwrap();
        assert!(result.diagnostics.is_empty());
        assert!(session.cached_diagnostics(Path::new("src/config.ts")).is_none());
    }

    #[test]
    fn test_outside_and_ignored_files_stay_out() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write(&root, "src/a.ts", "export const a = 1;\n");
        write(&root, ".gitignore", "scratch/\n");
        write(&root, "scratch/leak.ts", LEAKY);
        write(dir.path(), "other/leak.ts", LEAKY);

        let mut session = ScanSession::new(&root, None);
        let init = session.initialize().unwrap();
        assert!(init.diagnostics.is_empty());
        assert_eq!(session.cached_files(), 1);

        let outside = session.file_changed(&dir.path().join("other/leak.ts")).unwrap();
        assert!(outside.diagnostics.is_empty());
        let escaping = session.file_changed(Path::new("../other/leak.ts")).unwrap();
        assert!(escaping.diagnostics.is_empty());

        let ignored = session.file_changed(Path::new("scratch/leak.ts")).unwrap();
        assert!(ignored.diagnostics.is_empty());
        assert_eq!(session.cached_files(), 1);
        assert_eq!(session.state(), SessionState::Ready);

        let full = session.full_rescan().unwrap();
        assert_eq!(full.diagnostics, ignored.diagnostics);
    }

    #[test]
    fn test_missing_project_terminates() {
        let mut session = ScanSession::new("/no/such/project", None);
        let err = session.initialize().unwrap_err();
        assert!(err.is_missing());
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(matches!(session.full_rescan(), Err(ScanError::InvalidState("terminated"))));
    }

    #[test]
    fn test_root_removed_after_init() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write(&root, "src/a.ts", "export const a = 1;\n");

        let mut session = ScanSession::new(&root, None);
        session.initialize().unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        let err = session.file_changed(Path::new("src/a.ts")).unwrap_err();
        assert!(err.is_missing());
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[test]
    fn test_message_shapes() {
        let msg: HostMessage =
            serde_json::from_str(r#"{"type":"FileChanged","filePath":"src/a.ts"}"#).unwrap();
        assert_eq!(msg, HostMessage::FileChanged { file_path: PathBuf::from("src/a.ts") });
        let msg: HostMessage = serde_json::from_str(r#"{"type":"FullScan"}"#).unwrap();
        assert_eq!(msg, HostMessage::FullScan);

        let out = serde_json::to_value(WorkerMessage::Result {
            diagnostics: vec![],
            elapsed_ms: 3,
            scan_type: ScanType::Incremental,
        })
        .unwrap();
        assert_eq!(out["type"], "Result");
        assert_eq!(out["elapsedMs"], 3);
        assert_eq!(out["scanType"], "incremental");
        assert_eq!(serde_json::to_value(WorkerMessage::Missing).unwrap()["type"], "Missing");
    }
}
