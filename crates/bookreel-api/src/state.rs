//! Application state.

use std::sync::Arc;

use bookreel_pipeline::{
    ContentProvider, HttpStageBackend, LocalStages, PipelineConfig, PipelineRunner, RunRegistry,
    StageBackend, StaticContentProvider,
};
use tracing::info;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: PipelineConfig,
    /// In-process stages behind the stage endpoints
    pub stages: Arc<LocalStages>,
    /// Current run of every session
    pub runs: Arc<RunRegistry>,
}

impl AppState {
    /// Create application state backed by the static demo provider.
    pub fn new(config: ApiConfig, pipeline: PipelineConfig) -> Result<Self, reqwest::Error> {
        Self::with_provider(config, pipeline, Arc::new(StaticContentProvider::new()))
    }

    /// Create application state around a content provider.
    ///
    /// Runs use the in-process stages unless a stage base URL is configured,
    /// in which case they go through the HTTP stage endpoints.
    pub fn with_provider(
        config: ApiConfig,
        pipeline: PipelineConfig,
        provider: Arc<dyn ContentProvider>,
    ) -> Result<Self, reqwest::Error> {
        let stages = Arc::new(LocalStages::new(provider, &pipeline));

        let backend: Arc<dyn StageBackend> = match &pipeline.stage_base_url {
            Some(base_url) => {
                info!("Runs will call stage endpoints at {}", base_url);
                Arc::new(HttpStageBackend::new(base_url.clone(), pipeline.stage_timeout)?)
            }
            None => Arc::clone(&stages) as Arc<dyn StageBackend>,
        };

        let runner = Arc::new(PipelineRunner::new(backend, pipeline.clone()));
        let runs = Arc::new(RunRegistry::new(runner));

        Ok(Self {
            config,
            pipeline,
            stages,
            runs,
        })
    }
}
