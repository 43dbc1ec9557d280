//! Structured run logging.

use bookreel_models::{RunId, SessionId, Stage};
use tracing::{debug, error, info, warn};

/// Per-run logger that stamps every line with the run and session IDs.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    session_id: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId, session_id: &SessionId) -> Self {
        Self {
            run_id: run_id.to_string(),
            session_id: session_id.to_string(),
        }
    }

    pub fn log_start(&self, title: &str) {
        info!(
            run_id = %self.run_id,
            session_id = %self.session_id,
            title = %title,
            "Run started"
        );
    }

    /// Log a stage being dispatched.
    pub fn log_stage(&self, stage: Stage, message: &str) {
        info!(
            run_id = %self.run_id,
            session_id = %self.session_id,
            stage = %stage,
            "Stage started: {}", message
        );
    }

    /// Log a stage result with its duration.
    pub fn log_stage_done(&self, stage: Stage, duration_ms: u128) {
        info!(
            run_id = %self.run_id,
            session_id = %self.session_id,
            stage = %stage,
            duration_ms = %duration_ms,
            "Stage completed"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            session_id = %self.session_id,
            "Run warning: {}", message
        );
    }

    pub fn log_failure(&self, stage: Stage, kind: &str, message: &str) {
        error!(
            run_id = %self.run_id,
            session_id = %self.session_id,
            stage = %stage,
            kind = %kind,
            "Run failed: {}", message
        );
    }

    /// Abandoned runs are routine, not errors.
    pub fn log_abandoned(&self) {
        debug!(
            run_id = %self.run_id,
            session_id = %self.session_id,
            "Run abandoned, dropping results"
        );
    }

    pub fn log_completion(&self, duration_secs: u32) {
        info!(
            run_id = %self.run_id,
            session_id = %self.session_id,
            movie_duration_secs = %duration_secs,
            "Run completed"
        );
    }
}
