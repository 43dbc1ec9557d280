//! Stage contracts.
//!
//! Each stage validates its input, calls the content provider under a
//! timeout and checks the result against the stage contract. Stages keep no
//! state between calls; a failure leaves nothing behind.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bookreel_models::{
    estimated_duration_secs, validate_scene_sequence, Artifact, AssembleRequest, AssembleResponse,
    Character, CharactersRequest, CharactersResponse, Scene, ScenesRequest, ScenesResponse, ScreenplayRequest,
    ScreenplayResponse, Stage,
};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::{ProviderResult, StageError, StageResult};
use crate::metrics;
use crate::provider::ContentProvider;

/// Title used when the assembly request carries none.
const UNTITLED: &str = "Untitled";

/// Request/response boundary for the four stages.
///
/// The orchestrator drives a run through this trait, so stages can run
/// in-process or behind the HTTP endpoints.
#[async_trait]
pub trait StageBackend: Send + Sync {
    async fn screenplay(&self, request: ScreenplayRequest) -> StageResult<ScreenplayResponse>;

    async fn characters(&self, request: CharactersRequest) -> StageResult<CharactersResponse>;

    async fn scenes(&self, request: ScenesRequest) -> StageResult<ScenesResponse>;

    async fn assemble(&self, request: AssembleRequest) -> StageResult<AssembleResponse>;
}

/// Require a text field with visible content.
pub fn require_text<'a>(label: &str, value: Option<&'a str>) -> StageResult<&'a str> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(StageError::invalid_input(format!("{} is required", label))),
    }
}

/// Require a non-empty, contiguously numbered scene list.
pub fn require_scenes(value: Option<&serde_json::Value>) -> StageResult<Vec<Scene>> {
    let raw = match value {
        Some(v) if v.is_array() => v,
        _ => return Err(StageError::invalid_input("Scenes array is required")),
    };
    let scenes: Vec<Scene> = serde_json::from_value(raw.clone())
        .map_err(|e| StageError::invalid_input(format!("Invalid scene list: {}", e)))?;
    validate_scene_sequence(&scenes)
        .map_err(|e| StageError::invalid_input(format!("Invalid scene list: {}", e)))?;
    Ok(scenes)
}

/// A screenplay must have visible content.
pub fn check_screenplay(screenplay: &str) -> StageResult<()> {
    if screenplay.trim().is_empty() {
        return Err(StageError::provider_failure(
            Stage::Screenplay,
            "stage returned an empty screenplay",
        ));
    }
    Ok(())
}

/// The cast must not be empty.
pub fn check_characters(characters: &[Character]) -> StageResult<()> {
    if characters.is_empty() {
        return Err(StageError::provider_failure(
            Stage::Characters,
            "stage returned no characters",
        ));
    }
    Ok(())
}

/// Scenes must be numbered 1..N without gaps or repeats.
pub fn check_scenes(scenes: &[Scene]) -> StageResult<()> {
    validate_scene_sequence(scenes)
        .map_err(|e| StageError::provider_failure(Stage::Scenes, e.to_string()))
}

/// The assembled movie needs a locator.
pub fn check_artifact(artifact: &Artifact) -> StageResult<()> {
    if artifact.video_url.trim().is_empty() {
        return Err(StageError::provider_failure(
            Stage::Assembly,
            "stage returned no video locator",
        ));
    }
    Ok(())
}

/// Stages executed in-process against a content provider.
#[derive(Clone)]
pub struct LocalStages {
    provider: Arc<dyn ContentProvider>,
    stage_timeout: Duration,
    seconds_per_scene: u32,
}

impl LocalStages {
    pub fn new(provider: Arc<dyn ContentProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            stage_timeout: config.stage_timeout,
            seconds_per_scene: config.seconds_per_scene,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn seconds_per_scene(&self) -> u32 {
        self.seconds_per_scene
    }

    /// Run a provider call under the stage timeout.
    async fn call<T: Send>(
        &self,
        stage: Stage,
        generation: impl Future<Output = ProviderResult<T>> + Send,
    ) -> StageResult<T> {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.stage_timeout, generation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StageError::provider_failure(stage, e.to_string())),
            Err(_) => Err(StageError::Timeout {
                stage,
                after: self.stage_timeout,
            }),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(StageError::Timeout { .. }) => "timeout",
            Err(_) => "error",
        };
        metrics::record_stage_duration(stage, outcome, start.elapsed().as_secs_f64());
        debug!(
            stage = %stage,
            provider = self.provider.name(),
            outcome,
            "Provider call finished"
        );

        result
    }
}

#[async_trait]
impl StageBackend for LocalStages {
    async fn screenplay(&self, request: ScreenplayRequest) -> StageResult<ScreenplayResponse> {
        let title = require_text("Book title", request.title.as_deref())?;

        let screenplay = self
            .call(Stage::Screenplay, self.provider.screenplay(title))
            .await?;
        check_screenplay(&screenplay)?;

        Ok(ScreenplayResponse { screenplay })
    }

    async fn characters(&self, request: CharactersRequest) -> StageResult<CharactersResponse> {
        let title = require_text("Book title", request.book_title.as_deref())?;
        let screenplay = require_text("Screenplay", request.screenplay.as_deref())?;

        let characters = self
            .call(Stage::Characters, self.provider.characters(title, screenplay))
            .await?;
        check_characters(&characters)?;

        Ok(CharactersResponse { characters })
    }

    async fn scenes(&self, request: ScenesRequest) -> StageResult<ScenesResponse> {
        let screenplay = require_text("Screenplay", request.screenplay.as_deref())?;

        let scenes = self
            .call(Stage::Scenes, self.provider.scenes(screenplay))
            .await?;
        check_scenes(&scenes)?;

        Ok(ScenesResponse { scenes })
    }

    async fn assemble(&self, request: AssembleRequest) -> StageResult<AssembleResponse> {
        let scenes = require_scenes(request.scenes.as_ref())?;
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED);

        let duration_secs = estimated_duration_secs(scenes.len(), self.seconds_per_scene);
        let video_url = self
            .call(
                Stage::Assembly,
                self.provider.assemble(title, &scenes, duration_secs),
            )
            .await?;

        let artifact = Artifact {
            video_url,
            scene_count: scenes.len() as u32,
            duration_secs,
        };
        check_artifact(&artifact)?;

        Ok(AssembleResponse { artifact })
    }
}
