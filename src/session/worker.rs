//! Session worker
//!
//! Runs a [`ScanSession`] on a tokio task. Scans are CPU-bound, so each one
//! moves onto the blocking pool and the session travels with it. Messages
//! that arrive while the session is initializing are queued and replayed
//! in arrival order once it is ready.

use super::{HostMessage, ScanResult, ScanSession, SessionState, WorkerMessage};
use crate::config::ModscopeConfig;
use crate::error::ScanError;
use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Host side of a running session worker
pub struct SessionHandle {
    tx: UnboundedSender<HostMessage>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn send(&self, message: HostMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| anyhow!("scan session has terminated"))
    }

    pub fn file_changed(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.send(HostMessage::FileChanged {
            file_path: path.into(),
        })
    }

    pub fn full_scan(&self) -> Result<()> {
        self.send(HostMessage::FullScan)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Close the inbox and wait for queued scans to drain
    pub async fn shutdown(self) -> Result<()> {
        drop(self.tx);
        self.task
            .await
            .map_err(|e| anyhow!("session worker failed: {}", e))
    }
}

/// Start a session worker for `root`
pub fn spawn(
    root: impl Into<PathBuf>,
    config: Option<ModscopeConfig>,
) -> (SessionHandle, UnboundedReceiver<WorkerMessage>) {
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let (worker_tx, worker_rx) = mpsc::unbounded_channel();
    let session = ScanSession::new(root, config);
    let task = tokio::spawn(run_worker(session, host_rx, worker_tx));
    (SessionHandle { tx: host_tx, task }, worker_rx)
}

enum Step {
    Continue(ScanSession),
    Stop,
}

async fn run_worker(
    session: ScanSession,
    mut inbox: UnboundedReceiver<HostMessage>,
    outbox: UnboundedSender<WorkerMessage>,
) {
    let mut pending = VecDeque::new();
    let mut inbox_open = true;

    let init = tokio::task::spawn_blocking(move || {
        let mut session = session;
        let result = catch_unwind(AssertUnwindSafe(|| session.initialize()));
        (session, result)
    });
    tokio::pin!(init);

    let joined = loop {
        tokio::select! {
            joined = &mut init => break joined,
            message = inbox.recv(), if inbox_open => match message {
                Some(message) => {
                    debug!("Queued {:?} until the session is ready", message);
                    pending.push_back(message);
                }
                None => inbox_open = false,
            },
        }
    };

    let mut session = match joined {
        Ok((session, Ok(Ok(_)))) => session,
        Ok((_, Ok(Err(e)))) => {
            let _ = outbox.send(failure(&e));
            return;
        }
        Ok((_, Err(_))) => {
            error!("Session initialization panicked");
            let _ = outbox.send(WorkerMessage::Error {
                message: "initialization panicked".to_string(),
            });
            return;
        }
        Err(e) => {
            error!("Session initialization task failed: {}", e);
            let _ = outbox.send(WorkerMessage::Error {
                message: e.to_string(),
            });
            return;
        }
    };

    if outbox.send(WorkerMessage::Ready).is_err() {
        return;
    }

    loop {
        let message = match pending.pop_front() {
            Some(message) => message,
            None if inbox_open => match inbox.recv().await {
                Some(message) => message,
                None => break,
            },
            None => break,
        };

        match handle(session, message, &outbox).await {
            Step::Continue(next) => session = next,
            Step::Stop => return,
        }
    }

    debug!("Session worker for {} stopped", session.root().display());
}

/// Run one message on the blocking pool. `Stop` once the project is gone.
async fn handle(
    session: ScanSession,
    message: HostMessage,
    outbox: &UnboundedSender<WorkerMessage>,
) -> Step {
    let joined = tokio::task::spawn_blocking(move || {
        let mut session = session;
        let result = catch_unwind(AssertUnwindSafe(|| match &message {
            HostMessage::FileChanged { file_path } => session.file_changed(file_path),
            HostMessage::FullScan => session.full_rescan(),
        }));
        (session, result)
    })
    .await;

    let (mut session, result) = match joined {
        Ok(pair) => pair,
        Err(e) => {
            error!("Scan task failed: {}", e);
            let _ = outbox.send(WorkerMessage::Error {
                message: e.to_string(),
            });
            return Step::Stop;
        }
    };

    let reply = match result {
        Ok(Ok(scan)) => report(scan),
        Ok(Err(e)) => failure(&e),
        Err(_) => {
            warn!("Scan panicked; session returns to ready");
            session.recover();
            WorkerMessage::Error {
                message: "scan panicked".to_string(),
            }
        }
    };

    let terminated = session.state() == SessionState::Terminated;
    if outbox.send(reply).is_err() || terminated {
        return Step::Stop;
    }
    Step::Continue(session)
}

fn report(scan: ScanResult) -> WorkerMessage {
    for e in &scan.rule_errors {
        debug!("Rule {} failed: {}", e.rule_id, e.error);
    }
    scan.into()
}

fn failure(e: &ScanError) -> WorkerMessage {
    if e.is_missing() {
        warn!("{}", e);
        WorkerMessage::Missing
    } else {
        WorkerMessage::Error {
            message: e.to_string(),
        }
    }
}
