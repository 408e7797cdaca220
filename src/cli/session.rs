//! Session command - scan session over stdio
//!
//! One JSON message per line in both directions:
//!
//! ```text
//! stdin  {"type":"FileChanged","filePath":"src/users/users.service.ts"}
//!        {"type":"FullScan"}
//! stdout {"type":"Ready"}
//!        {"type":"Result","diagnostics":[...],"elapsedMs":12,"scanType":"incremental"}
//!        {"type":"Error","message":"..."}
//!        {"type":"Missing"}
//! ```
//!
//! Logs go to stderr. The command exits once stdin closes and queued scans
//! have been answered, or after `Missing`.

use crate::config::ModscopeConfig;
use crate::session::{self, HostMessage, WorkerMessage};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

pub fn run(path: &std::path::Path, config: Option<ModscopeConfig>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(serve(path.to_path_buf(), config));
    // A pending stdin read would otherwise block runtime shutdown
    runtime.shutdown_background();
    result
}

async fn serve(root: std::path::PathBuf, config: Option<ModscopeConfig>) -> Result<()> {
    let (handle, mut replies) = session::spawn(root, config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed, draining session");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<HostMessage>(line) {
                    Ok(message) => {
                        if handle.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Ignoring malformed message: {}", e);
                        write_message(&mut stdout, &WorkerMessage::Error {
                            message: format!("malformed message: {}", e),
                        }).await?;
                    }
                }
            }
            reply = replies.recv() => {
                let Some(reply) = reply else { break };
                let missing = reply == WorkerMessage::Missing;
                write_message(&mut stdout, &reply).await?;
                if missing {
                    break;
                }
            }
        }
    }

    handle.shutdown().await?;
    while let Some(reply) = replies.recv().await {
        write_message(&mut stdout, &reply).await?;
    }
    Ok(())
}

async fn write_message(stdout: &mut tokio::io::Stdout, message: &WorkerMessage) -> Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
