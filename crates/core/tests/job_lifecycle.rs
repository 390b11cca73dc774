//! Job lifecycle integration tests.
//!
//! These tests run jobs through the supervisor against the mock engine:
//! idle -> starting -> running -> completed | failed | cancelled

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tempfile::TempDir;

use calcifer_core::{
    scan_input_folder, suggested_file_name,
    testing::{fixtures, MockEngine},
    Detail, EngineEvent, JobError, JobOutcome, JobParameters, JobState, JobSupervisor,
    JobsConfig, OutputFormat, SlotId,
};

/// Test helper holding the engine, the supervisor and scratch directories.
struct TestHarness {
    engine: Arc<MockEngine>,
    supervisor: JobSupervisor<MockEngine>,
    out_dir: TempDir,
    staging_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let out_dir = TempDir::new().expect("Failed to create output dir");
        let staging_dir = TempDir::new().expect("Failed to create staging dir");
        let engine = Arc::new(MockEngine::new());
        let config = JobsConfig {
            staging_dir: Some(staging_dir.path().to_path_buf()),
            outcome_buffer: 8,
        };

        Self {
            supervisor: JobSupervisor::new(Arc::clone(&engine), config),
            engine,
            out_dir,
            staging_dir,
        }
    }

    fn out(&self, name: &str) -> PathBuf {
        self.out_dir.path().join(name)
    }

    /// True once every per-job staging directory was cleaned up.
    fn staging_is_empty(&self) -> bool {
        std::fs::read_dir(self.staging_dir.path()).unwrap().count() == 0
    }

    fn params(&self, destination: PathBuf) -> JobParameters {
        JobParameters::new("/photos/teapot", destination)
    }
}

#[tokio::test]
async fn test_single_file_output_is_staged_and_relocated() {
    let harness = TestHarness::new();
    let destination = harness.out("model.usdz");
    harness.engine.set_output_content(b"usdz-bytes".to_vec()).await;
    harness
        .engine
        .set_script(vec![
            EngineEvent::RequestProgress { fraction: 0.5 },
            EngineEvent::RequestProgress { fraction: 1.0 },
            EngineEvent::ProcessingComplete,
        ])
        .await;

    let handle = harness
        .supervisor
        .start(harness.params(destination.clone()))
        .await
        .unwrap();
    let (outcomes, state) = handle.collect().await;

    assert_eq!(state, JobState::Completed);
    assert_eq!(
        outcomes,
        vec![
            JobOutcome::Progress(0.5),
            JobOutcome::Progress(1.0),
            JobOutcome::Completed(destination.clone()),
        ]
    );

    let staged = harness.engine.recorded_requests().await.remove(0).output;
    assert_eq!(staged.file_name().unwrap(), "model.usdz");
    assert_eq!(
        staged.parent().unwrap().parent().unwrap(),
        harness.staging_dir.path()
    );
    assert_eq!(std::fs::read(&destination).unwrap(), b"usdz-bytes");
    assert!(!staged.exists());
    assert!(harness.staging_is_empty());
}

#[tokio::test]
async fn test_directory_output_is_written_in_place() {
    let harness = TestHarness::new();
    let destination = harness.out("scene_dir");
    std::fs::create_dir(&destination).unwrap();
    harness
        .engine
        .set_script(vec![
            EngineEvent::RequestProgress { fraction: 0.25 },
            EngineEvent::ProcessingComplete,
        ])
        .await;

    let handle = harness
        .supervisor
        .start(harness.params(destination.clone()))
        .await
        .unwrap();
    let (outcomes, state) = handle.collect().await;

    assert_eq!(state, JobState::Completed);
    assert_eq!(
        outcomes,
        vec![
            JobOutcome::Progress(0.25),
            JobOutcome::Completed(destination.clone()),
        ]
    );
    assert_eq!(harness.engine.recorded_requests().await[0].output, destination);
    assert!(harness.staging_is_empty());
}

#[tokio::test]
async fn test_relocation_failure_still_removes_temp_file() {
    let harness = TestHarness::new();
    let destination = harness.out("missing").join("model.usdz");
    harness.engine.set_output_content(b"usdz-bytes".to_vec()).await;
    harness
        .engine
        .set_script(vec![EngineEvent::ProcessingComplete])
        .await;

    let handle = harness
        .supervisor
        .start(harness.params(destination.clone()))
        .await
        .unwrap();
    let (outcomes, state) = handle.collect().await;

    assert_eq!(state, JobState::Failed);
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], JobOutcome::Failed(JobError::IoFailure(_))));
    assert!(harness.staging_is_empty());
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_completion_without_written_output_fails() {
    let harness = TestHarness::new();
    harness
        .engine
        .set_script(vec![EngineEvent::ProcessingComplete])
        .await;

    let handle = harness
        .supervisor
        .start(harness.params(harness.out("model.usdz")))
        .await
        .unwrap();
    let (outcomes, state) = handle.collect().await;

    assert_eq!(state, JobState::Failed);
    assert!(matches!(
        outcomes.as_slice(),
        [JobOutcome::Failed(JobError::IoFailure(_))]
    ));
}

#[tokio::test]
async fn test_only_one_terminal_outcome_and_it_is_last() {
    let harness = TestHarness::new();
    harness
        .engine
        .set_script(vec![
            EngineEvent::RequestProgress { fraction: 0.2 },
            EngineEvent::RequestError {
                reason: "not enough overlap".to_string(),
            },
            EngineEvent::ProcessingComplete,
            EngineEvent::RequestProgress { fraction: 0.9 },
        ])
        .await;

    let handle = harness
        .supervisor
        .start(harness.params(harness.out("model.usdz")))
        .await
        .unwrap();
    let (outcomes, _) = handle.collect().await;

    let terminal: Vec<_> = outcomes.iter().filter(|o| o.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(
        outcomes.last(),
        Some(&JobOutcome::Failed(JobError::EngineReported(
            "not enough overlap".to_string()
        )))
    );
}

#[tokio::test]
async fn test_concurrent_jobs_with_same_file_name_do_not_collide() {
    let harness = TestHarness::new();
    let out_a = TempDir::new().unwrap();
    let out_b = TempDir::new().unwrap();
    let dest_a = out_a.path().join("model.usdz");
    let dest_b = out_b.path().join("model.usdz");
    harness
        .engine
        .set_output_content_for("/photos/a", b"AAAA".to_vec())
        .await;
    harness
        .engine
        .set_output_content_for("/photos/b", b"BBBB".to_vec())
        .await;
    harness.engine.set_hold_open(true).await;

    let first = harness
        .supervisor
        .start_in(
            SlotId::from("a"),
            JobParameters::new("/photos/a", dest_a.clone()),
        )
        .await
        .unwrap();
    let second = harness
        .supervisor
        .start_in(
            SlotId::from("b"),
            JobParameters::new("/photos/b", dest_b.clone()),
        )
        .await
        .unwrap();
    harness.engine.wait_for_requests(2).await;

    let requests = harness.engine.recorded_requests().await;
    assert_ne!(requests[0].output, requests[1].output);
    assert_eq!(requests[0].output.file_name(), requests[1].output.file_name());

    for input in ["/photos/a", "/photos/b"] {
        let session = harness
            .engine
            .session_for(Path::new(input))
            .await
            .unwrap();
        harness
            .engine
            .emit_to(session, EngineEvent::ProcessingComplete)
            .await;
    }

    let (outcomes_a, state_a) = first.collect().await;
    let (outcomes_b, state_b) = second.collect().await;
    assert_eq!(state_a, JobState::Completed);
    assert_eq!(state_b, JobState::Completed);
    assert_eq!(outcomes_a, vec![JobOutcome::Completed(dest_a.clone())]);
    assert_eq!(outcomes_b, vec![JobOutcome::Completed(dest_b.clone())]);
    assert_eq!(std::fs::read(&dest_a).unwrap(), b"AAAA");
    assert_eq!(std::fs::read(&dest_b).unwrap(), b"BBBB");
    assert!(harness.staging_is_empty());
}

#[tokio::test]
async fn test_busy_slot_does_not_disturb_running_job() {
    let harness = TestHarness::new();
    let destination = harness.out("scene_dir");
    std::fs::create_dir(&destination).unwrap();
    harness.engine.set_hold_open(true).await;

    let mut first = harness
        .supervisor
        .start(harness.params(destination.clone()))
        .await
        .unwrap();
    harness.engine.wait_for_start().await;

    let second = harness
        .supervisor
        .start(harness.params(destination.clone()))
        .await;
    assert!(matches!(second, Err(JobError::SlotBusy { .. })));

    harness
        .engine
        .emit(EngineEvent::RequestProgress { fraction: 0.7 })
        .await;
    assert_eq!(first.next_outcome().await, Some(JobOutcome::Progress(0.7)));

    harness.engine.emit(EngineEvent::ProcessingComplete).await;
    assert_eq!(
        first.next_outcome().await,
        Some(JobOutcome::Completed(destination))
    );
    assert_eq!(first.next_outcome().await, None);
    assert_eq!(harness.engine.recorded_sessions().await.len(), 1);
}

#[tokio::test]
async fn test_complete_after_cancel_request_finalizes() {
    let harness = TestHarness::new();
    let destination = harness.out("model.usdz");
    harness.engine.set_output_content(b"done".to_vec()).await;
    harness.engine.set_hold_open(true).await;
    harness.engine.set_cancel_events(vec![]).await;
    harness.engine.set_close_on_cancel(false).await;

    let handle = harness
        .supervisor
        .start(harness.params(destination.clone()))
        .await
        .unwrap();
    harness.engine.wait_for_start().await;

    harness.supervisor.cancel(&handle.id()).await;
    harness.engine.wait_for_cancel().await;
    harness.engine.emit(EngineEvent::ProcessingComplete).await;

    let (outcomes, state) = handle.collect().await;
    assert_eq!(state, JobState::Completed);
    assert_eq!(outcomes, vec![JobOutcome::Completed(destination.clone())]);
    assert_eq!(std::fs::read(&destination).unwrap(), b"done");
}

#[tokio::test]
async fn test_cancel_after_terminal_is_noop() {
    let harness = TestHarness::new();
    let destination = harness.out("scene_dir");
    std::fs::create_dir(&destination).unwrap();
    harness
        .engine
        .set_script(vec![EngineEvent::ProcessingComplete])
        .await;

    let handle = harness
        .supervisor
        .start(harness.params(destination))
        .await
        .unwrap();
    let id = handle.id();
    let mut state = handle.watch_state();
    let (outcomes, _) = handle.collect().await;
    assert_eq!(outcomes.len(), 1);

    harness.supervisor.cancel(&id).await;
    assert_eq!(*state.borrow_and_update(), JobState::Completed);
    assert_eq!(harness.engine.cancel_count().await, 0);
}

#[tokio::test]
async fn test_cancelled_job_emits_no_terminal_outcome() {
    let harness = TestHarness::new();
    harness
        .engine
        .set_script(vec![EngineEvent::RequestProgress { fraction: 0.1 }])
        .await;
    harness.engine.set_hold_open(true).await;
    harness.engine.set_output_content(b"partial".to_vec()).await;

    let handle = harness
        .supervisor
        .start(harness.params(harness.out("model.usdz")))
        .await
        .unwrap();
    let id = handle.id();
    let mut stream = Box::pin(handle.into_stream());

    assert_eq!(stream.next().await, Some(JobOutcome::Progress(0.1)));
    harness.supervisor.cancel(&id).await;
    assert_eq!(
        tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap(),
        None
    );

    assert!(harness.staging_is_empty());
    assert!(!harness.out("model.usdz").exists());
    assert_eq!(harness.engine.release_count().await, 1);
}

#[tokio::test]
async fn test_scanned_folder_with_suggested_name() {
    let harness = TestHarness::new();
    let photos = fixtures::photo_folder(harness.out_dir.path(), "Teapot", 3).unwrap();
    let input = scan_input_folder(&photos).await.unwrap();
    assert_eq!(input.image_count, 3);

    let name = suggested_file_name(&input, Detail::Reduced, OutputFormat::Usdz).unwrap();
    assert_eq!(name, "Teapot_reduced.usdz");

    let destination = harness.out(&name);
    harness.engine.set_output_content(b"teapot".to_vec()).await;
    harness
        .engine
        .set_script(vec![EngineEvent::ProcessingComplete])
        .await;

    let params = JobParameters::new(&input.path, &destination).with_detail(Detail::Reduced);
    let handle = harness.supervisor.start(params).await.unwrap();
    assert_eq!(handle.wait().await, JobState::Completed);

    let sessions = harness.engine.recorded_sessions().await;
    assert_eq!(sessions[0].input_folder, photos);
    assert_eq!(std::fs::read(&destination).unwrap(), b"teapot");
}
