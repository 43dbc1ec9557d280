//! Orchestrator integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookreel_models::{
    validate_scene_sequence, Character, RunEvent, RunEventType, RunStatus, Scene, SessionId, Stage,
};
use bookreel_pipeline::{
    ContentProvider, LocalStages, PipelineConfig, PipelineError, PipelineRunner, ProviderError,
    ProviderResult, RunHandle, RunRegistry, StaticContentProvider,
};
use tokio::sync::{broadcast, Notify};

fn runner_with(provider: Arc<dyn ContentProvider>, config: PipelineConfig) -> PipelineRunner {
    let stages = LocalStages::new(provider, &config);
    PipelineRunner::new(Arc::new(stages), config)
}

fn demo_runner() -> PipelineRunner {
    runner_with(Arc::new(StaticContentProvider::new()), PipelineConfig::default())
}

async fn collect_until_terminal(mut rx: broadcast::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event stream stalled")
            .expect("event stream closed");
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

/// Demo provider that fails at one stage.
struct FailingProvider {
    fail_at: Stage,
    demo: StaticContentProvider,
}

impl FailingProvider {
    fn new(fail_at: Stage) -> Self {
        Self {
            fail_at,
            demo: StaticContentProvider::new(),
        }
    }

    fn check(&self, stage: Stage) -> ProviderResult<()> {
        if stage == self.fail_at {
            Err(ProviderError::generation("model offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn screenplay(&self, title: &str) -> ProviderResult<String> {
        self.check(Stage::Screenplay)?;
        self.demo.screenplay(title).await
    }

    async fn characters(&self, title: &str, screenplay: &str) -> ProviderResult<Vec<Character>> {
        self.check(Stage::Characters)?;
        self.demo.characters(title, screenplay).await
    }

    async fn scenes(&self, screenplay: &str) -> ProviderResult<Vec<Scene>> {
        self.check(Stage::Scenes)?;
        self.demo.scenes(screenplay).await
    }

    async fn assemble(&self, title: &str, scenes: &[Scene], duration_secs: u32) -> ProviderResult<String> {
        self.check(Stage::Assembly)?;
        self.demo.assemble(title, scenes, duration_secs).await
    }
}

/// Demo provider whose first scenes call blocks until released.
struct GatedProvider {
    gated: AtomicBool,
    dispatched: Notify,
    release: Notify,
    demo: StaticContentProvider,
}

impl GatedProvider {
    fn new() -> Self {
        Self {
            gated: AtomicBool::new(true),
            dispatched: Notify::new(),
            release: Notify::new(),
            demo: StaticContentProvider::new(),
        }
    }
}

#[async_trait]
impl ContentProvider for GatedProvider {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn screenplay(&self, title: &str) -> ProviderResult<String> {
        self.demo.screenplay(title).await
    }

    async fn characters(&self, title: &str, screenplay: &str) -> ProviderResult<Vec<Character>> {
        self.demo.characters(title, screenplay).await
    }

    async fn scenes(&self, screenplay: &str) -> ProviderResult<Vec<Scene>> {
        if self.gated.swap(false, Ordering::SeqCst) {
            self.dispatched.notify_one();
            self.release.notified().await;
        }
        self.demo.scenes(screenplay).await
    }

    async fn assemble(&self, title: &str, scenes: &[Scene], duration_secs: u32) -> ProviderResult<String> {
        self.demo.assemble(title, scenes, duration_secs).await
    }
}

/// Provider that never finishes a screenplay in time.
struct SlowProvider;

#[async_trait]
impl ContentProvider for SlowProvider {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn screenplay(&self, _title: &str) -> ProviderResult<String> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok("too late".to_string())
    }

    async fn characters(&self, _t: &str, _s: &str) -> ProviderResult<Vec<Character>> {
        unreachable!("no stage runs after a timeout")
    }

    async fn scenes(&self, _s: &str) -> ProviderResult<Vec<Scene>> {
        unreachable!("no stage runs after a timeout")
    }

    async fn assemble(&self, _t: &str, _s: &[Scene], _d: u32) -> ProviderResult<String> {
        unreachable!("no stage runs after a timeout")
    }
}

#[tokio::test]
async fn test_end_to_end_1984() {
    let run = demo_runner()
        .run(SessionId::generate(), "1984")
        .await
        .unwrap();

    assert_eq!(run.current_stage(), RunStatus::Complete);
    assert!(run.failed_stage().is_none());

    let screenplay = run.screenplay.as_deref().unwrap();
    assert!(!screenplay.trim().is_empty());
    assert!(screenplay.to_lowercase().contains("1984"));

    let characters = run.characters.as_ref().unwrap();
    assert_eq!(characters.len(), 5);
    let mut names: Vec<_> = characters.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 5);

    let scenes = run.scenes.as_ref().unwrap();
    assert_eq!(scenes.len(), 8);
    assert!(validate_scene_sequence(scenes).is_ok());
    let numbers: Vec<u32> = scenes.iter().map(|s| s.number).collect();
    assert_eq!(numbers, (1..=8).collect::<Vec<_>>());

    let artifact = run.artifact.as_ref().unwrap();
    assert!(!artifact.video_url.is_empty());
    assert_eq!(artifact.scene_count, 8);
    assert_eq!(artifact.duration_secs, 240);
}

#[tokio::test]
async fn test_events_follow_stage_order() {
    let runner = demo_runner();
    let handle = runner.start(SessionId::generate(), "Dune").unwrap();
    let rx = handle.subscribe();

    let run = runner.drive(&handle).await.unwrap();
    let events = collect_until_terminal(rx).await;

    let types: Vec<RunEventType> = events.iter().map(RunEvent::event_type).collect();
    assert_eq!(
        types,
        vec![
            RunEventType::StageStarted,
            RunEventType::ScreenplayReady,
            RunEventType::StageStarted,
            RunEventType::CharactersReady,
            RunEventType::StageStarted,
            RunEventType::ScenesReady,
            RunEventType::StageStarted,
            RunEventType::ArtifactReady,
            RunEventType::Completed,
        ]
    );

    let started: Vec<Stage> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::StageStarted { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(started, Stage::ALL.to_vec());

    let seqs: Vec<u64> = events
        .iter()
        .map(|e| match e {
            RunEvent::StageStarted { seq, .. }
            | RunEvent::ScreenplayReady { seq, .. }
            | RunEvent::CharactersReady { seq, .. }
            | RunEvent::ScenesReady { seq, .. }
            | RunEvent::ArtifactReady { seq, .. }
            | RunEvent::Completed { seq, .. }
            | RunEvent::Failed { seq, .. } => *seq,
        })
        .collect();
    assert!(seqs.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*seqs.last().unwrap(), run.progress.seq);
    assert!(events.iter().all(|e| e.run_id() == handle.run_id()));
}

#[tokio::test]
async fn test_characters_failure_keeps_screenplay() {
    let runner = runner_with(
        Arc::new(FailingProvider::new(Stage::Characters)),
        PipelineConfig::default(),
    );
    let handle = runner.start(SessionId::generate(), "1984").unwrap();
    let rx = handle.subscribe();

    let run = runner.drive(&handle).await.unwrap();
    assert_eq!(run.current_stage(), RunStatus::Failed);
    assert_eq!(run.failed_stage(), Some(Stage::Characters));
    assert!(run.screenplay.is_some());
    assert!(run.characters.is_none());
    assert!(run.scenes.is_none());
    assert!(run.artifact.is_none());
    assert!(run.last_message().contains("characters"));

    assert!(run.progress.is_stage_completed(Stage::Screenplay));
    assert!(!run.progress.is_stage_completed(Stage::Characters));
    assert!(!run.progress.is_stage_active(Stage::Characters));
    assert!(run.progress.has_failed());

    let events = collect_until_terminal(rx).await;
    match events.last().unwrap() {
        RunEvent::Failed {
            stage, retryable, ..
        } => {
            assert_eq!(*stage, Stage::Characters);
            assert!(*retryable);
        }
        other => panic!("expected a failed event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_stops_later_stages() {
    for stage in Stage::ALL {
        let run = runner_with(Arc::new(FailingProvider::new(stage)), PipelineConfig::default())
            .run(SessionId::generate(), "Emma")
            .await
            .unwrap();

        assert_eq!(run.failed_stage(), Some(stage));
        assert_eq!(run.screenplay.is_some(), stage > Stage::Screenplay);
        assert_eq!(run.characters.is_some(), stage > Stage::Characters);
        assert_eq!(run.scenes.is_some(), stage > Stage::Scenes);
        assert!(run.artifact.is_none());
    }
}

#[tokio::test]
async fn test_stage_timeout_fails_the_run() {
    let config = PipelineConfig::default().with_stage_timeout(Duration::from_millis(50));
    let run = runner_with(Arc::new(SlowProvider), config)
        .run(SessionId::generate(), "Dune")
        .await
        .unwrap();

    assert_eq!(run.current_stage(), RunStatus::Failed);
    assert_eq!(run.failed_stage(), Some(Stage::Screenplay));
    assert!(run.last_message().contains("timed out"));
    assert!(run.screenplay.is_none());
}

#[tokio::test]
async fn test_blank_title_is_rejected_synchronously() {
    let err = demo_runner()
        .run(SessionId::generate(), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
    assert!(!err.is_retryable());
}

async fn wait_until_finished(handle: &RunHandle) {
    for _ in 0..400 {
        if handle.finished_at().await.is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("run did not finish");
}

#[tokio::test]
async fn test_abandoned_scenes_result_is_discarded() {
    let provider = Arc::new(GatedProvider::new());
    let runner = Arc::new(runner_with(provider.clone(), PipelineConfig::default()));
    let registry = RunRegistry::new(Arc::clone(&runner));
    let session = SessionId::generate();

    let first = registry.start(session.clone(), "Dune").await.unwrap();
    let mut first_events = first.subscribe();
    provider.dispatched.notified().await;
    assert_eq!(first.snapshot().await.current_stage(), RunStatus::ScenesInProgress);
    while first_events.try_recv().is_ok() {}

    // A fresh run for the same session abandons the first one
    let second = registry.start(session.clone(), "Emma").await.unwrap();
    assert!(first.is_abandoned());
    wait_until_finished(&second).await;

    provider.release.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stale = first.snapshot().await;
    assert_eq!(stale.current_stage(), RunStatus::ScenesInProgress);
    assert!(stale.scenes.is_none());
    assert!(stale.artifact.is_none());
    assert!(first_events.try_recv().is_err());

    let fresh = registry.current(&session).await.unwrap().snapshot().await;
    assert_eq!(fresh.id, *second.run_id());
    assert_ne!(fresh.id, stale.id);
    assert_eq!(fresh.title, "Emma");
    assert_eq!(fresh.current_stage(), RunStatus::Complete);
    assert!(fresh.screenplay.as_deref().unwrap().contains("Emma"));
    assert!(!fresh.screenplay.as_deref().unwrap().contains("Dune"));
}

#[tokio::test]
async fn test_abandon_while_stage_in_flight() {
    let provider = Arc::new(GatedProvider::new());
    let runner = Arc::new(runner_with(provider.clone(), PipelineConfig::default()));
    let handle = runner.start(SessionId::generate(), "Dune").unwrap();

    let driver = {
        let runner = Arc::clone(&runner);
        let handle = handle.clone();
        tokio::spawn(async move { runner.drive(&handle).await })
    };

    provider.dispatched.notified().await;
    handle.abandon();

    let err = driver.await.unwrap().unwrap_err();
    assert!(err.is_abandoned());
    provider.release.notify_one();

    let run = handle.snapshot().await;
    assert_eq!(run.current_stage(), RunStatus::ScenesInProgress);
    assert!(run.characters.is_some());
    assert!(run.scenes.is_none());
}
