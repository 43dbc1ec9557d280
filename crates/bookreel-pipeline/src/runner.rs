//! Pipeline orchestrator.
//!
//! Runs the four stages strictly in order against a [`StageBackend`],
//! threading each output into the next request. Every transition is applied
//! to the shared run and published to observers under the same write lock,
//! so a stage's result is always visible before the next stage starts.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use bookreel_models::{
    estimated_duration_secs, AssembleRequest, CharactersRequest, PipelineRun, RunEvent, RunId,
    ScenesRequest, ScreenplayRequest, SessionId, Stage,
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, RwLock};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, StageError, StageResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::stages::{
    check_artifact, check_characters, check_scenes, check_screenplay, StageBackend,
};

const COMPLETE_MESSAGE: &str = "The movie is ready!";

/// Status message shown while `stage` is in flight.
fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Screenplay => "Writing the screenplay...",
        Stage::Characters => "Creating the characters...",
        Stage::Scenes => "Building the scenes...",
        Stage::Assembly => "Assembling the movie...",
    }
}

/// Terminal message for a failed run. Runs cannot resume, only restart.
fn failure_message(stage: Stage, err: &StageError) -> String {
    format!(
        "The {} stage failed: {}. Start a new run to try again.",
        stage, err
    )
}

/// Await a stage call and hold its output to the stage contract.
///
/// Backends are not trusted to enforce it themselves.
async fn checked<T>(
    call: impl Future<Output = StageResult<T>>,
    check: impl FnOnce(&T) -> StageResult<()>,
) -> StageResult<T> {
    let response = call.await?;
    check(&response)?;
    Ok(response)
}

struct RunShared {
    id: RunId,
    session_id: SessionId,
    title: String,
    run: RwLock<PipelineRun>,
    events: broadcast::Sender<RunEvent>,
    abandon: watch::Sender<bool>,
    logger: RunLogger,
}

/// Shared handle to one run.
///
/// Cloning is cheap. Observers take snapshots and subscribe to events; the
/// owner may abandon the run at any time.
#[derive(Clone)]
pub struct RunHandle {
    inner: Arc<RunShared>,
}

impl RunHandle {
    fn new(run: PipelineRun, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        let (abandon, _) = watch::channel(false);
        let logger = RunLogger::new(&run.id, &run.session_id);

        Self {
            inner: Arc::new(RunShared {
                id: run.id.clone(),
                session_id: run.session_id.clone(),
                title: run.title.clone(),
                run: RwLock::new(run),
                events,
                abandon,
                logger,
            }),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.inner.id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    /// Copy of the run as it stands now.
    pub async fn snapshot(&self) -> PipelineRun {
        self.inner.run.read().await.clone()
    }

    /// Receive every event published from now on.
    ///
    /// Subscribe before taking a snapshot to avoid missing a transition
    /// that lands in between.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.inner.events.subscribe()
    }

    /// Discard the run. In-flight stage results are dropped and no further
    /// events are published. Returns false if it was already abandoned.
    pub fn abandon(&self) -> bool {
        let was_abandoned = self.inner.abandon.send_replace(true);
        if !was_abandoned {
            metrics::record_run_abandoned();
        }
        !was_abandoned
    }

    pub fn is_abandoned(&self) -> bool {
        *self.inner.abandon.borrow()
    }

    /// Resolve once the run is abandoned.
    pub async fn abandoned(&self) {
        let mut rx = self.inner.abandon.subscribe();
        let _ = rx.wait_for(|gone| *gone).await;
    }

    /// When the run reached a terminal state, if it has.
    pub async fn finished_at(&self) -> Option<DateTime<Utc>> {
        let run = self.inner.run.read().await;
        run.is_terminal().then_some(run.progress.updated_at)
    }

    pub(crate) fn logger(&self) -> &RunLogger {
        &self.inner.logger
    }

    /// Mutate the run and publish the resulting events atomically.
    ///
    /// Nothing is touched once the run is abandoned.
    async fn apply<T>(
        &self,
        update: impl FnOnce(&mut PipelineRun) -> PipelineResult<(T, Vec<RunEvent>)>,
    ) -> PipelineResult<T> {
        let mut run = self.inner.run.write().await;
        if self.is_abandoned() {
            return Err(PipelineError::Abandoned);
        }

        let (value, events) = update(&mut run)?;
        for event in events {
            // No receivers is fine
            let _ = self.inner.events.send(event);
        }
        Ok(value)
    }
}

/// Sequential orchestrator for pipeline runs.
pub struct PipelineRunner {
    backend: Arc<dyn StageBackend>,
    config: PipelineConfig,
}

impl PipelineRunner {
    pub fn new(backend: Arc<dyn StageBackend>, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate the title and create an idle run.
    ///
    /// A blank title is rejected here, before any run or progress state
    /// exists.
    pub fn start(&self, session_id: SessionId, title: &str) -> PipelineResult<RunHandle> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PipelineError::invalid_input("Book title is required"));
        }

        let handle = RunHandle::new(PipelineRun::new(session_id, title), self.config.event_buffer);
        metrics::record_run_started();
        Ok(handle)
    }

    /// Start a run and drive it to completion.
    pub async fn run(&self, session_id: SessionId, title: &str) -> PipelineResult<PipelineRun> {
        let handle = self.start(session_id, title)?;
        self.drive(&handle).await
    }

    /// Execute every stage of a started run.
    ///
    /// A stage failure is part of the run's outcome: the final snapshot is
    /// returned with status `failed` and earlier results intact. An
    /// abandoned run yields [`PipelineError::Abandoned`].
    pub async fn drive(&self, handle: &RunHandle) -> PipelineResult<PipelineRun> {
        match self.execute(handle).await {
            Ok(()) | Err(PipelineError::StageFailed { .. }) => Ok(handle.snapshot().await),
            Err(PipelineError::Abandoned) => {
                handle.logger().log_abandoned();
                Err(PipelineError::Abandoned)
            }
            Err(e) => {
                handle.logger().log_warning(&e.to_string());
                Err(e)
            }
        }
    }

    async fn execute(&self, handle: &RunHandle) -> PipelineResult<()> {
        let title = handle.title().to_string();
        handle.logger().log_start(&title);

        handle
            .apply(|run| {
                let stage = run.progress.begin(stage_message(Stage::Screenplay))?;
                let event = RunEvent::stage_started(
                    &run.id,
                    run.progress.seq,
                    stage,
                    run.progress.message.clone(),
                );
                Ok(((), vec![event]))
            })
            .await?;
        handle
            .logger()
            .log_stage(Stage::Screenplay, stage_message(Stage::Screenplay));

        // Screenplay
        let screenplay = self
            .dispatch(
                handle,
                Stage::Screenplay,
                checked(
                    self.backend.screenplay(ScreenplayRequest::new(title.clone())),
                    |r| check_screenplay(&r.screenplay),
                ),
            )
            .await?
            .screenplay;
        self.complete_stage(handle, |run| {
            run.screenplay = Some(screenplay.clone());
            RunEvent::ScreenplayReady {
                run_id: run.id.clone(),
                seq: run.progress.seq,
                screenplay: screenplay.clone(),
            }
        })
        .await?;

        // Characters
        let characters = self
            .dispatch(
                handle,
                Stage::Characters,
                checked(
                    self.backend
                        .characters(CharactersRequest::new(title.clone(), screenplay.clone())),
                    |r| check_characters(&r.characters),
                ),
            )
            .await?
            .characters;
        self.complete_stage(handle, |run| {
            run.characters = Some(characters.clone());
            RunEvent::CharactersReady {
                run_id: run.id.clone(),
                seq: run.progress.seq,
                characters,
            }
        })
        .await?;

        // Scenes
        let scenes = self
            .dispatch(
                handle,
                Stage::Scenes,
                checked(self.backend.scenes(ScenesRequest::new(screenplay)), |r| {
                    check_scenes(&r.scenes)
                }),
            )
            .await?
            .scenes;
        self.complete_stage(handle, |run| {
            run.scenes = Some(scenes.clone());
            RunEvent::ScenesReady {
                run_id: run.id.clone(),
                seq: run.progress.seq,
                scenes: scenes.clone(),
            }
        })
        .await?;

        // Assembly
        let scene_count = scenes.len();
        let backend = Arc::clone(&self.backend);
        let assembly = async move {
            let request = AssembleRequest::new(&scenes, title).map_err(|e| {
                StageError::provider_failure(Stage::Assembly, format!("cannot encode scenes: {}", e))
            })?;
            backend.assemble(request).await
        };
        let mut artifact = self
            .dispatch(
                handle,
                Stage::Assembly,
                checked(assembly, |r| check_artifact(&r.artifact)),
            )
            .await?
            .artifact;
        // Length always follows the local per-scene setting
        artifact.scene_count = scene_count as u32;
        artifact.duration_secs = estimated_duration_secs(scene_count, self.config.seconds_per_scene);
        let duration_secs = artifact.duration_secs;
        self.complete_stage(handle, |run| {
            run.artifact = Some(artifact.clone());
            RunEvent::ArtifactReady {
                run_id: run.id.clone(),
                seq: run.progress.seq,
                artifact,
            }
        })
        .await?;

        handle.logger().log_completion(duration_secs);
        metrics::record_run_completed();
        Ok(())
    }

    /// Run one stage call, racing it against the timeout and abandonment.
    async fn dispatch<T>(
        &self,
        handle: &RunHandle,
        stage: Stage,
        call: impl Future<Output = StageResult<T>>,
    ) -> PipelineResult<T> {
        let started = Instant::now();

        let outcome = tokio::select! {
            result = tokio::time::timeout(self.config.stage_timeout, call) => result,
            _ = handle.abandoned() => return Err(PipelineError::Abandoned),
        };

        // A late result for a discarded run is dropped here
        if handle.is_abandoned() {
            return Err(PipelineError::Abandoned);
        }

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(StageError::Timeout {
                stage,
                after: self.config.stage_timeout,
            }),
        };

        match result {
            Ok(value) => {
                handle
                    .logger()
                    .log_stage_done(stage, started.elapsed().as_millis());
                Ok(value)
            }
            Err(err) => Err(self.fail(handle, stage, err).await),
        }
    }

    /// Store a stage result, publish it, then move to the next stage.
    async fn complete_stage(
        &self,
        handle: &RunHandle,
        store: impl FnOnce(&mut PipelineRun) -> RunEvent,
    ) -> PipelineResult<Option<Stage>> {
        let next = handle
            .apply(|run| {
                let ready = store(run);
                let upcoming = run.progress.status.active_stage().and_then(|s| s.next());
                let message = upcoming.map_or(COMPLETE_MESSAGE, stage_message);
                let next = run.progress.advance(message)?;

                let followup = match next {
                    Some(stage) => RunEvent::stage_started(&run.id, run.progress.seq, stage, message),
                    None => RunEvent::completed(&run.id, run.progress.seq, message),
                };
                Ok((next, vec![ready, followup]))
            })
            .await?;

        if let Some(stage) = next {
            handle.logger().log_stage(stage, stage_message(stage));
        }
        Ok(next)
    }

    /// Move the run to `failed` and turn the stage error into the run error.
    async fn fail(&self, handle: &RunHandle, stage: Stage, err: StageError) -> PipelineError {
        let message = failure_message(stage, &err);
        let retryable = err.is_retryable();

        let applied = handle
            .apply(|run| {
                let failed = run.progress.fail(message.clone())?;
                let event = RunEvent::failed(&run.id, run.progress.seq, failed, message, retryable);
                Ok(((), vec![event]))
            })
            .await;
        if let Err(e) = applied {
            return e;
        }

        handle
            .logger()
            .log_failure(stage, err.kind(), &err.to_string());
        metrics::record_run_failed(stage, err.kind());
        PipelineError::StageFailed { stage, source: err }
    }
}
