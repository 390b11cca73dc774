//! Engine adapter that runs an external executable.
//!
//! The executable receives the job as command-line arguments and reports
//! progress by writing one JSON [`EngineEvent`] per line on stdout. Anything
//! else on stdout is ignored; stderr is forwarded to the debug log.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::config::EngineConfig;
use super::error::{SessionError, StartError};
use super::traits::ReconstructionEngine;
use super::types::{
    event_channel, EngineEvent, EventReceiver, EventSender, ProcessRequest, SessionConfig,
};

/// Parses one line of engine output.
///
/// Returns `None` for blank lines and lines that are not a known event.
pub fn parse_event_line(line: &str) -> Option<EngineEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// A session backed by one engine process.
#[derive(Debug)]
pub struct ProcessSession {
    id: u64,
    input_folder: PathBuf,
    config: SessionConfig,
    events_tx: Option<EventSender>,
    events_rx: Option<EventReceiver>,
    stop: CancellationToken,
}

impl ProcessSession {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Runs the configured engine executable, one process per session.
pub struct ProcessEngine {
    config: EngineConfig,
    next_session_id: AtomicU64,
}

impl ProcessEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Job arguments appended after the configured ones.
    fn job_args(session: &ProcessSession, request: &ProcessRequest) -> Vec<OsString> {
        vec![
            "--input".into(),
            session.input_folder.clone().into_os_string(),
            "--output".into(),
            request.output.clone().into_os_string(),
            "--detail".into(),
            request.detail.as_str().into(),
            "--sample-ordering".into(),
            session.config.sample_ordering.as_str().into(),
            "--feature-sensitivity".into(),
            session.config.feature_sensitivity.as_str().into(),
        ]
    }

    /// Reads events from the process until it exits or is stopped.
    async fn pump(
        session_id: u64,
        mut child: Child,
        stdout: ChildStdout,
        tx: EventSender,
        stop: CancellationToken,
    ) {
        let mut lines = BufReader::new(stdout).lines();
        let mut terminal_seen = false;

        loop {
            tokio::select! {
                _ = stop.cancelled() => {
                    Self::kill(session_id, &mut child).await;
                    if !terminal_seen {
                        let _ = tx.send(EngineEvent::ProcessingCancelled);
                    }
                    return;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match parse_event_line(&line) {
                        Some(event) => {
                            terminal_seen |= event.is_terminal();
                            if tx.send(event).is_err() {
                                debug!(session_id, "Event receiver dropped, stopping engine");
                                Self::kill(session_id, &mut child).await;
                                return;
                            }
                        }
                        None => trace!(session_id, line = %line, "Ignoring engine output"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!(session_id, "Failed to read engine output: {}", e);
                        break;
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = stop.cancelled() => {
                Self::kill(session_id, &mut child).await;
                if !terminal_seen {
                    let _ = tx.send(EngineEvent::ProcessingCancelled);
                }
                return;
            }
            status = child.wait() => status,
        };

        match status {
            Ok(status) if status.success() => {
                debug!(session_id, "Engine process exited");
            }
            Ok(status) => {
                if !terminal_seen {
                    let _ = tx.send(EngineEvent::RequestError {
                        reason: format!("engine exited with {}", status),
                    });
                }
            }
            Err(e) => {
                if !terminal_seen {
                    let _ = tx.send(EngineEvent::RequestError {
                        reason: format!("failed to wait for engine: {}", e),
                    });
                }
            }
        }
    }

    async fn kill(session_id: u64, child: &mut Child) {
        debug!(session_id, "Killing engine process");
        if let Err(e) = child.kill().await {
            warn!(session_id, "Failed to kill engine process: {}", e);
        }
    }

    async fn forward_stderr(session_id: u64, stderr: ChildStderr) {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(session_id, "engine: {}", line);
        }
    }
}

#[async_trait]
impl ReconstructionEngine for ProcessEngine {
    type Session = ProcessSession;

    fn name(&self) -> &str {
        "process"
    }

    async fn create_session(
        &self,
        input_folder: &Path,
        config: &SessionConfig,
    ) -> Result<ProcessSession, SessionError> {
        let meta = match tokio::fs::metadata(input_folder).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::InvalidInput {
                    path: input_folder.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        if !meta.is_dir() {
            return Err(SessionError::InvalidInput {
                path: input_folder.to_path_buf(),
            });
        }

        let (events_tx, events_rx) = event_channel();
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        debug!(session_id = id, input = ?input_folder, "Created engine session");

        Ok(ProcessSession {
            id,
            input_folder: input_folder.to_path_buf(),
            config: *config,
            events_tx: Some(events_tx),
            events_rx: Some(events_rx),
            stop: CancellationToken::new(),
        })
    }

    async fn start_processing(
        &self,
        session: &mut ProcessSession,
        request: ProcessRequest,
    ) -> Result<(), StartError> {
        if session.events_tx.is_none() {
            return Err(StartError::AlreadyStarted);
        }

        let args = Self::job_args(session, &request);
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| StartError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StartError::rejected("engine stdout was not captured"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(Self::forward_stderr(session.id, stderr));
        }

        let tx = session
            .events_tx
            .take()
            .ok_or(StartError::AlreadyStarted)?;
        debug!(
            session_id = session.id,
            output = ?request.output,
            detail = %request.detail,
            "Engine process started"
        );
        tokio::spawn(Self::pump(
            session.id,
            child,
            stdout,
            tx,
            session.stop.clone(),
        ));

        Ok(())
    }

    fn events(&self, session: &mut ProcessSession) -> Option<EventReceiver> {
        session.events_rx.take()
    }

    async fn cancel(&self, session: &ProcessSession) {
        debug!(session_id = session.id, "Cancelling engine session");
        session.stop.cancel();
    }

    async fn release(&self, session: ProcessSession) {
        session.stop.cancel();
        trace!(session_id = session.id, "Released engine session");
    }
}
