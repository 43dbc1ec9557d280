//! Background service that forgets finished runs.
//!
//! Finished runs stay queryable for a while so late observers can fetch
//! the result. After the TTL they are dropped from the registry.

use std::sync::Arc;
use std::time::Duration;

use bookreel_pipeline::RunRegistry;
use tokio::time::interval;
use tracing::{debug, info};

/// Interval between sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Finished-run janitor.
pub struct RunJanitor {
    runs: Arc<RunRegistry>,
    ttl: Duration,
    enabled: bool,
}

impl RunJanitor {
    pub fn new(runs: Arc<RunRegistry>, ttl: Duration) -> Self {
        let enabled = std::env::var("ENABLE_RUN_JANITOR")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true); // Enabled by default

        Self { runs, ttl, enabled }
    }

    /// Start the sweep loop. Runs forever; spawn it as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Run janitor is disabled");
            return;
        }

        info!(
            "Starting run janitor (interval: {:?}, ttl: {:?})",
            SWEEP_INTERVAL, self.ttl
        );

        let mut ticker = interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// Run a single sweep. Returns how many runs were dropped.
    pub async fn sweep(&self) -> usize {
        let evicted = self.runs.evict_finished(self.ttl).await;
        let remaining = self.runs.len().await;
        debug!(evicted, remaining, "Run janitor sweep finished");
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookreel_models::SessionId;
    use bookreel_pipeline::{LocalStages, PipelineConfig, PipelineRunner, StaticContentProvider};

    #[tokio::test]
    async fn test_sweep_drops_finished_runs() {
        let config = PipelineConfig::default();
        let stages = LocalStages::new(Arc::new(StaticContentProvider::new()), &config);
        let runner = Arc::new(PipelineRunner::new(Arc::new(stages), config));
        let runs = Arc::new(RunRegistry::new(runner));

        let handle = runs.start(SessionId::generate(), "Dune").await.unwrap();
        for _ in 0..200 {
            if handle.finished_at().await.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let janitor = RunJanitor::new(Arc::clone(&runs), Duration::from_millis(1));
        assert_eq!(janitor.sweep().await, 1);
        assert!(runs.is_empty().await);
    }
}
