//! Watch command - re-analyze on file changes
//!
//! A debounced watcher feeds changed source files into a scan session.
//! Every reply is printed as the diagnostics of the changed file plus the
//! running totals.

use crate::config::ModscopeConfig;
use crate::models::Diagnostic;
use crate::parsers::is_analyzable;
use crate::session::{self, WorkerMessage};
use anyhow::{Context, Result};
use console::style;
use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use std::collections::{BTreeSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Directories whose changes never reach the session
const IGNORED_DIRS: &[&str] = &["node_modules", "dist", "coverage", ".git"];

pub fn run(path: &Path, config: Option<ModscopeConfig>) -> Result<()> {
    let root = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(watch(root, config))
}

async fn watch(root: PathBuf, config: Option<ModscopeConfig>) -> Result<()> {
    println!(
        "\nWatching {} for changes...",
        style(root.display()).cyan()
    );
    println!("  {} Save a file to trigger analysis", style("→").dim());
    println!("  {} Press Ctrl+C to stop\n", style("→").dim());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
        match result {
            Ok(events) => {
                let paths: Vec<PathBuf> = events
                    .into_iter()
                    .flat_map(|event| event.event.paths)
                    .collect();
                let _ = event_tx.send(paths);
            }
            Err(errors) => {
                for e in errors {
                    warn!("Watch error: {}", e);
                }
            }
        }
    })?;
    debouncer.watch(&root, RecursiveMode::Recursive)?;

    let (handle, mut replies) = session::spawn(root.clone(), config);
    // Files whose reply has not arrived yet, in request order
    let mut in_flight: VecDeque<PathBuf> = VecDeque::new();

    loop {
        tokio::select! {
            paths = event_rx.recv() => {
                let Some(paths) = paths else { break };
                for rel in changed_sources(&root, paths) {
                    handle.file_changed(rel.clone())?;
                    in_flight.push_back(rel);
                }
            }
            reply = replies.recv() => {
                let Some(reply) = reply else { break };
                match reply {
                    WorkerMessage::Ready => {
                        println!("{} Session ready", style("✓").green());
                    }
                    WorkerMessage::Result { diagnostics, elapsed_ms, .. } => {
                        let file = in_flight.pop_front();
                        print_result(file.as_deref(), &diagnostics, elapsed_ms);
                    }
                    WorkerMessage::Error { message } => {
                        in_flight.pop_front();
                        eprintln!("{} {}", style("error:").red().bold(), message);
                    }
                    WorkerMessage::Missing => {
                        eprintln!(
                            "{} {} is no longer available",
                            style("✗").red(),
                            root.display()
                        );
                        break;
                    }
                }
            }
        }
    }

    drop(debouncer);
    handle.shutdown().await
}

/// Unique analyzable paths relative to `root`, outside ignored directories
fn changed_sources(root: &Path, paths: Vec<PathBuf>) -> BTreeSet<PathBuf> {
    paths
        .into_iter()
        .filter_map(|p| p.strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|rel| {
            is_analyzable(rel)
                && !rel.components().any(|c| match c {
                    Component::Normal(name) => IGNORED_DIRS.iter().any(|d| name == *d),
                    _ => false,
                })
        })
        .collect()
}

fn print_result(file: Option<&Path>, diagnostics: &[Diagnostic], elapsed_ms: u64) {
    let Some(file) = file else {
        return;
    };
    let own: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.file_path == file).collect();
    let header = style(file.display()).bold();
    if own.is_empty() {
        println!("{} {}", style("✓").green(), header);
    } else {
        println!("{} {} ({} issues)", style("●").yellow(), header, own.len());
        for d in own {
            println!(
                "    {}:{} {} {}",
                d.line,
                d.column,
                style(&d.rule_id).dim(),
                d.message
            );
        }
    }
    println!(
        "  {} {} diagnostics in project ({}ms)",
        style("→").dim(),
        diagnostics.len(),
        elapsed_ms
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changed_sources_filters() {
        let root = Path::new("/repo");
        let paths = vec![
            PathBuf::from("/repo/src/app.service.ts"),
            PathBuf::from("/repo/src/app.service.ts"),
            PathBuf::from("/repo/node_modules/x/index.ts"),
            PathBuf::from("/repo/README.md"),
            PathBuf::from("/elsewhere/a.ts"),
        ];
        let changed: Vec<_> = changed_sources(root, paths).into_iter().collect();
        assert_eq!(changed, vec![PathBuf::from("src/app.service.ts")]);
    }
}
