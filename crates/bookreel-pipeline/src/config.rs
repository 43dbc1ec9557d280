//! Pipeline configuration.

use std::time::Duration;

use bookreel_models::DEFAULT_SECONDS_PER_SCENE;
use tracing::warn;
use url::Url;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on a single stage call
    pub stage_timeout: Duration,
    /// Per-scene duration used for the movie length estimate
    pub seconds_per_scene: u32,
    /// Capacity of each run's event channel
    pub event_buffer: usize,
    /// When set, stages are driven over HTTP against this base URL
    pub stage_base_url: Option<Url>,
    /// How long finished runs are kept around for late observers
    pub finished_run_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(30),
            seconds_per_scene: DEFAULT_SECONDS_PER_SCENE,
            event_buffer: 64,
            stage_base_url: None,
            finished_run_ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            stage_timeout: Duration::from_secs(
                std::env::var("PIPELINE_STAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            seconds_per_scene: std::env::var("PIPELINE_SECONDS_PER_SCENE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SECONDS_PER_SCENE),
            event_buffer: std::env::var("PIPELINE_EVENT_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
            stage_base_url: std::env::var("PIPELINE_STAGE_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .and_then(|s| match Url::parse(s.trim()) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!("Ignoring invalid PIPELINE_STAGE_BASE_URL {:?}: {}", s, e);
                        None
                    }
                }),
            finished_run_ttl: Duration::from_secs(
                std::env::var("PIPELINE_FINISHED_RUN_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }

    /// Override the per-scene duration.
    pub fn with_seconds_per_scene(mut self, seconds: u32) -> Self {
        self.seconds_per_scene = seconds;
        self
    }

    /// Override the stage timeout.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }
}
