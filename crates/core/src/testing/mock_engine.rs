//! Mock reconstruction engine for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::engine::{
    event_channel, EngineEvent, EventReceiver, EventSender, ProcessRequest, ReconstructionEngine,
    SessionConfig, SessionError, StartError,
};

/// A recorded session creation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSession {
    pub id: u64,
    pub input_folder: PathBuf,
    pub config: SessionConfig,
}

/// Session handle handed out by [`MockEngine`].
#[derive(Debug)]
pub struct MockSession {
    id: u64,
    input_folder: PathBuf,
    events_rx: Option<EventReceiver>,
}

impl MockSession {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Mock implementation of the ReconstructionEngine trait.
///
/// Provides controllable behavior for testing:
/// - Scripted events sent as soon as processing starts
/// - Events pushed by the test while a job runs
/// - Injected session and start failures
/// - Recorded sessions, requests, cancels and releases
///
/// # Example
///
/// ```rust,ignore
/// let engine = MockEngine::new();
/// engine.set_script(vec![
///     EngineEvent::RequestProgress { fraction: 0.5 },
///     EngineEvent::ProcessingComplete,
/// ]).await;
///
/// // Keep the stream open after the script and drive it by hand
/// engine.set_hold_open(true).await;
/// engine.emit(EngineEvent::ProcessingComplete).await;
/// ```
#[derive(Debug, Clone)]
pub struct MockEngine {
    /// Events sent right after `start_processing`.
    script: Arc<RwLock<Vec<EngineEvent>>>,
    /// Keep the stream open once the script is sent.
    hold_open: Arc<RwLock<bool>>,
    /// Events sent when a session is cancelled.
    cancel_events: Arc<RwLock<Vec<EngineEvent>>>,
    /// Close the stream after cancel events are sent.
    close_on_cancel: Arc<RwLock<bool>>,
    /// Bytes written to the request output on start, simulating the engine.
    output_content: Arc<RwLock<Option<Vec<u8>>>>,
    /// Per input folder overrides of `output_content`.
    output_content_by_input: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
    next_session_error: Arc<RwLock<Option<SessionError>>>,
    next_start_error: Arc<RwLock<Option<StartError>>>,
    /// Open event streams by session id.
    senders: Arc<RwLock<HashMap<u64, EventSender>>>,
    last_session_id: Arc<RwLock<Option<u64>>>,
    session_counter: Arc<RwLock<u64>>,
    sessions: Arc<RwLock<Vec<RecordedSession>>>,
    requests: Arc<RwLock<Vec<ProcessRequest>>>,
    cancels: Arc<RwLock<usize>>,
    releases: Arc<RwLock<usize>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine with an empty script.
    pub fn new() -> Self {
        Self {
            script: Arc::new(RwLock::new(Vec::new())),
            hold_open: Arc::new(RwLock::new(false)),
            cancel_events: Arc::new(RwLock::new(vec![EngineEvent::ProcessingCancelled])),
            close_on_cancel: Arc::new(RwLock::new(true)),
            output_content: Arc::new(RwLock::new(None)),
            output_content_by_input: Arc::new(RwLock::new(HashMap::new())),
            next_session_error: Arc::new(RwLock::new(None)),
            next_start_error: Arc::new(RwLock::new(None)),
            senders: Arc::new(RwLock::new(HashMap::new())),
            last_session_id: Arc::new(RwLock::new(None)),
            session_counter: Arc::new(RwLock::new(0)),
            sessions: Arc::new(RwLock::new(Vec::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            cancels: Arc::new(RwLock::new(0)),
            releases: Arc::new(RwLock::new(0)),
        }
    }

    /// Set the events sent when processing starts.
    pub async fn set_script(&self, events: Vec<EngineEvent>) {
        *self.script.write().await = events;
    }

    /// Keep the event stream open after the script.
    pub async fn set_hold_open(&self, hold_open: bool) {
        *self.hold_open.write().await = hold_open;
    }

    /// Set the events sent on cancel. Defaults to `ProcessingCancelled`.
    pub async fn set_cancel_events(&self, events: Vec<EngineEvent>) {
        *self.cancel_events.write().await = events;
    }

    /// Whether cancel closes the event stream. Defaults to true.
    pub async fn set_close_on_cancel(&self, close: bool) {
        *self.close_on_cancel.write().await = close;
    }

    /// Write these bytes to the request output when processing starts.
    pub async fn set_output_content(&self, content: Vec<u8>) {
        *self.output_content.write().await = Some(content);
    }

    /// Write these bytes instead for sessions over the given input folder.
    pub async fn set_output_content_for(
        &self,
        input_folder: impl Into<PathBuf>,
        content: Vec<u8>,
    ) {
        self.output_content_by_input
            .write()
            .await
            .insert(input_folder.into(), content);
    }

    /// Configure the next `create_session` to fail.
    pub async fn fail_next_session(&self, error: SessionError) {
        *self.next_session_error.write().await = Some(error);
    }

    /// Configure the next `start_processing` to fail.
    pub async fn fail_next_start(&self, error: StartError) {
        *self.next_start_error.write().await = Some(error);
    }

    /// Push an event to the most recent session.
    pub async fn emit(&self, event: EngineEvent) {
        if let Some(id) = *self.last_session_id.read().await {
            self.emit_to(id, event).await;
        }
    }

    /// Push an event to a specific session.
    pub async fn emit_to(&self, session_id: u64, event: EngineEvent) {
        if let Some(tx) = self.senders.read().await.get(&session_id) {
            let _ = tx.send(event);
        }
    }

    /// End the event stream of the most recent session.
    pub async fn close(&self) {
        if let Some(id) = *self.last_session_id.read().await {
            self.senders.write().await.remove(&id);
        }
    }

    pub async fn recorded_sessions(&self) -> Vec<RecordedSession> {
        self.sessions.read().await.clone()
    }

    pub async fn recorded_requests(&self) -> Vec<ProcessRequest> {
        self.requests.read().await.clone()
    }

    pub async fn cancel_count(&self) -> usize {
        *self.cancels.read().await
    }

    pub async fn release_count(&self) -> usize {
        *self.releases.read().await
    }

    /// Wait until at least one cancel was received.
    pub async fn wait_for_cancel(&self) {
        while self.cancel_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Wait until at least one request was submitted.
    pub async fn wait_for_start(&self) {
        self.wait_for_requests(1).await;
    }

    /// Wait until `count` requests were submitted.
    pub async fn wait_for_requests(&self, count: usize) {
        while self.requests.read().await.len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Session id recorded for an input folder, most recent first.
    pub async fn session_for(&self, input_folder: &Path) -> Option<u64> {
        self.sessions
            .read()
            .await
            .iter()
            .rev()
            .find(|s| s.input_folder == input_folder)
            .map(|s| s.id)
    }

    async fn write_output(&self, input_folder: &Path, output: &Path) {
        let content = match self.output_content_by_input.read().await.get(input_folder) {
            Some(content) => Some(content.clone()),
            None => self.output_content.read().await.clone(),
        };
        if let Some(content) = content {
            if !output.is_dir() {
                if let Err(e) = tokio::fs::write(output, content).await {
                    tracing::warn!("Mock engine failed to write {:?}: {}", output, e);
                }
            }
        }
    }
}

#[async_trait]
impl ReconstructionEngine for MockEngine {
    type Session = MockSession;

    fn name(&self) -> &str {
        "mock"
    }

    async fn create_session(
        &self,
        input_folder: &Path,
        config: &SessionConfig,
    ) -> Result<MockSession, SessionError> {
        if let Some(err) = self.next_session_error.write().await.take() {
            return Err(err);
        }

        let id = {
            let mut counter = self.session_counter.write().await;
            *counter += 1;
            *counter
        };
        self.sessions.write().await.push(RecordedSession {
            id,
            input_folder: input_folder.to_path_buf(),
            config: *config,
        });

        let (tx, rx) = event_channel();
        self.senders.write().await.insert(id, tx);
        *self.last_session_id.write().await = Some(id);

        Ok(MockSession {
            id,
            input_folder: input_folder.to_path_buf(),
            events_rx: Some(rx),
        })
    }

    async fn start_processing(
        &self,
        session: &mut MockSession,
        request: ProcessRequest,
    ) -> Result<(), StartError> {
        if let Some(err) = self.next_start_error.write().await.take() {
            return Err(err);
        }

        self.write_output(&session.input_folder, &request.output).await;
        self.requests.write().await.push(request);

        let script = self.script.read().await.clone();
        for event in script {
            self.emit_to(session.id, event).await;
        }
        if !*self.hold_open.read().await {
            self.senders.write().await.remove(&session.id);
        }
        Ok(())
    }

    fn events(&self, session: &mut MockSession) -> Option<EventReceiver> {
        session.events_rx.take()
    }

    async fn cancel(&self, session: &MockSession) {
        *self.cancels.write().await += 1;

        let events = self.cancel_events.read().await.clone();
        for event in events {
            self.emit_to(session.id, event).await;
        }
        if *self.close_on_cancel.read().await {
            self.senders.write().await.remove(&session.id);
        }
    }

    async fn release(&self, session: MockSession) {
        *self.releases.write().await += 1;
        self.senders.write().await.remove(&session.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Detail;

    fn request() -> ProcessRequest {
        ProcessRequest {
            output: PathBuf::from("/nonexistent/model.usdz"),
            detail: Detail::Medium,
        }
    }

    #[tokio::test]
    async fn test_script_is_sent_and_stream_closes() {
        let engine = MockEngine::new();
        engine
            .set_script(vec![
                EngineEvent::RequestProgress { fraction: 0.5 },
                EngineEvent::ProcessingComplete,
            ])
            .await;

        let mut session = engine
            .create_session(Path::new("/photos"), &SessionConfig::default())
            .await
            .unwrap();
        engine.start_processing(&mut session, request()).await.unwrap();
        let mut events = engine.events(&mut session).unwrap();

        assert_eq!(
            events.recv().await,
            Some(EngineEvent::RequestProgress { fraction: 0.5 })
        );
        assert_eq!(events.recv().await, Some(EngineEvent::ProcessingComplete));
        assert_eq!(events.recv().await, None);
        assert_eq!(engine.recorded_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_sends_cancelled_and_closes() {
        let engine = MockEngine::new();
        engine.set_hold_open(true).await;

        let mut session = engine
            .create_session(Path::new("/photos"), &SessionConfig::default())
            .await
            .unwrap();
        engine.start_processing(&mut session, request()).await.unwrap();
        let mut events = engine.events(&mut session).unwrap();

        engine.cancel(&session).await;
        assert_eq!(events.recv().await, Some(EngineEvent::ProcessingCancelled));
        assert_eq!(events.recv().await, None);
        assert_eq!(engine.cancel_count().await, 1);

        engine.release(session).await;
        assert_eq!(engine.release_count().await, 1);
    }

    #[tokio::test]
    async fn test_injected_failures_are_one_shot() {
        let engine = MockEngine::new();
        engine
            .fail_next_session(SessionError::configuration_rejected("nope"))
            .await;

        let first = engine
            .create_session(Path::new("/photos"), &SessionConfig::default())
            .await;
        assert!(matches!(
            first,
            Err(SessionError::ConfigurationRejected { .. })
        ));

        let second = engine
            .create_session(Path::new("/photos"), &SessionConfig::default())
            .await;
        assert!(second.is_ok());
        assert_eq!(engine.recorded_sessions().await.len(), 1);
    }
}
