//! Per-session run registry.
//!
//! Each session owns at most one current run. Starting a new run abandons
//! the previous one, so its late results can never leak into the new run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bookreel_models::SessionId;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::PipelineResult;
use crate::runner::{PipelineRunner, RunHandle};

/// Registry of the current run of every session.
pub struct RunRegistry {
    runner: Arc<PipelineRunner>,
    runs: RwLock<HashMap<SessionId, RunHandle>>,
}

impl RunRegistry {
    pub fn new(runner: Arc<PipelineRunner>) -> Self {
        Self {
            runner,
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub fn runner(&self) -> &PipelineRunner {
        &self.runner
    }

    /// Start a run for `session_id` and drive it in the background.
    ///
    /// Title validation happens before anything is registered; a rejected
    /// title leaves the session's current run in place.
    pub async fn start(&self, session_id: SessionId, title: &str) -> PipelineResult<RunHandle> {
        let handle = self.runner.start(session_id.clone(), title)?;

        let previous = self
            .runs
            .write()
            .await
            .insert(session_id.clone(), handle.clone());
        if let Some(previous) = previous {
            if previous.abandon() {
                debug!(
                    session_id = %session_id,
                    run_id = %previous.run_id(),
                    "Abandoned previous run"
                );
            }
        }

        let runner = Arc::clone(&self.runner);
        let driven = handle.clone();
        tokio::spawn(async move {
            // Outcomes are logged and published by the runner
            let _ = runner.drive(&driven).await;
        });

        Ok(handle)
    }

    /// The session's current run, if any.
    pub async fn current(&self, session_id: &SessionId) -> Option<RunHandle> {
        self.runs.read().await.get(session_id).cloned()
    }

    /// Abandon and forget the session's current run.
    pub async fn abandon(&self, session_id: &SessionId) -> bool {
        let removed = self.runs.write().await.remove(session_id);
        match removed {
            Some(handle) => {
                handle.abandon();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }

    /// Drop runs that finished more than `ttl` ago. Returns how many were
    /// removed.
    pub async fn evict_finished(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;

        let handles: Vec<(SessionId, RunHandle)> = self
            .runs
            .read()
            .await
            .iter()
            .map(|(session, handle)| (session.clone(), handle.clone()))
            .collect();

        let mut expired = Vec::new();
        for (session, handle) in handles {
            if let Some(finished) = handle.finished_at().await {
                if finished < cutoff {
                    expired.push((session, handle));
                }
            }
        }

        let mut runs = self.runs.write().await;
        let mut evicted = 0;
        for (session, handle) in expired {
            // The session may have started a new run meanwhile
            let unchanged = runs
                .get(&session)
                .is_some_and(|current| current.run_id() == handle.run_id());
            if unchanged {
                runs.remove(&session);
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!("Evicted {} finished runs", evicted);
        }
        evicted
    }
}
