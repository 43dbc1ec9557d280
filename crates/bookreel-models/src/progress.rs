//! Progress state machine for a pipeline run.
//!
//! The machine only moves forward:
//! `idle → screenplay → characters → scenes → assembly → complete`,
//! with `failed` reachable from any in-progress state. `complete` and
//! `failed` are terminal; a new run starts a fresh machine.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::Stage;

/// Current position of a run in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Created, no stage dispatched yet
    #[default]
    Idle,
    ScreenplayInProgress,
    CharactersInProgress,
    ScenesInProgress,
    AssemblyInProgress,
    /// Every stage succeeded
    Complete,
    /// A stage failed; see `ProgressState::failed_stage`
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::ScreenplayInProgress => "screenplay-in-progress",
            RunStatus::CharactersInProgress => "characters-in-progress",
            RunStatus::ScenesInProgress => "scenes-in-progress",
            RunStatus::AssemblyInProgress => "assembly-in-progress",
            RunStatus::Complete => "complete",
            RunStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Failed)
    }

    /// The stage in flight, if any.
    pub fn active_stage(&self) -> Option<Stage> {
        match self {
            RunStatus::ScreenplayInProgress => Some(Stage::Screenplay),
            RunStatus::CharactersInProgress => Some(Stage::Characters),
            RunStatus::ScenesInProgress => Some(Stage::Scenes),
            RunStatus::AssemblyInProgress => Some(Stage::Assembly),
            RunStatus::Idle | RunStatus::Complete | RunStatus::Failed => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} a run that is {from}")]
pub struct TransitionError {
    pub from: RunStatus,
    pub action: &'static str,
}

/// Observable progress of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressState {
    /// Current state
    pub status: RunStatus,
    /// Stage that was in flight when the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    /// Human-readable message attached to the last transition
    pub message: String,
    /// Transition counter, bumped by exactly one per transition
    pub seq: u64,
    /// When the last transition happened
    pub updated_at: DateTime<Utc>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    /// Create a fresh machine in the `idle` state.
    pub fn new() -> Self {
        Self {
            status: RunStatus::Idle,
            failed_stage: None,
            message: String::new(),
            seq: 0,
            updated_at: Utc::now(),
        }
    }

    /// `idle → screenplay-in-progress`.
    pub fn begin(&mut self, message: impl Into<String>) -> Result<Stage, TransitionError> {
        if self.status != RunStatus::Idle {
            return Err(self.rejected("begin"));
        }
        let first = Stage::Screenplay;
        self.transition(first.in_progress_status(), message);
        Ok(first)
    }

    /// Move past the stage in flight: to the next stage's in-progress state,
    /// or to `complete` after assembly. Returns the new active stage.
    pub fn advance(&mut self, message: impl Into<String>) -> Result<Option<Stage>, TransitionError> {
        let current = self.status.active_stage().ok_or_else(|| self.rejected("advance"))?;
        match current.next() {
            Some(next) => {
                self.transition(next.in_progress_status(), message);
                Ok(Some(next))
            }
            None => {
                self.transition(RunStatus::Complete, message);
                Ok(None)
            }
        }
    }

    /// Fail the stage in flight. Returns the stage that failed.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<Stage, TransitionError> {
        let current = self.status.active_stage().ok_or_else(|| self.rejected("fail"))?;
        self.failed_stage = Some(current);
        self.transition(RunStatus::Failed, message);
        Ok(current)
    }

    /// Is `stage` the one currently in flight?
    pub fn is_stage_active(&self, stage: Stage) -> bool {
        self.status == stage.in_progress_status()
    }

    /// Has `stage` produced its result?
    pub fn is_stage_completed(&self, stage: Stage) -> bool {
        match self.status {
            RunStatus::Idle => false,
            RunStatus::Complete => true,
            RunStatus::Failed => self.failed_stage.is_some_and(|failed| stage < failed),
            in_progress => in_progress.active_stage().is_some_and(|active| stage < active),
        }
    }

    pub fn has_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, status: RunStatus, message: impl Into<String>) {
        self.status = status;
        self.message = message.into();
        self.updated_at = Utc::now();
        self.seq += 1;
    }

    fn rejected(&self, action: &'static str) -> TransitionError {
        TransitionError {
            from: self.status,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_completion() -> ProgressState {
        let mut state = ProgressState::new();
        state.begin("screenplay").unwrap();
        for _ in 0..4 {
            state.advance("next").unwrap();
        }
        state
    }

    #[test]
    fn test_new_machine_is_idle() {
        let state = ProgressState::new();
        assert_eq!(state.status, RunStatus::Idle);
        assert_eq!(state.seq, 0);
        assert!(!state.is_terminal());
        assert!(Stage::ALL.iter().all(|s| !state.is_stage_active(*s)));
        assert!(Stage::ALL.iter().all(|s| !state.is_stage_completed(*s)));
    }

    #[test]
    fn test_forward_transitions() {
        let mut state = ProgressState::new();
        assert_eq!(state.begin("start").unwrap(), Stage::Screenplay);
        assert_eq!(state.status, RunStatus::ScreenplayInProgress);

        assert_eq!(state.advance("a").unwrap(), Some(Stage::Characters));
        assert_eq!(state.advance("b").unwrap(), Some(Stage::Scenes));
        assert_eq!(state.advance("c").unwrap(), Some(Stage::Assembly));
        assert!(state.is_stage_active(Stage::Assembly));
        assert!(state.is_stage_completed(Stage::Scenes));
        assert!(!state.is_stage_completed(Stage::Assembly));

        assert_eq!(state.advance("done").unwrap(), None);
        assert_eq!(state.status, RunStatus::Complete);
        assert_eq!(state.message, "done");
        assert_eq!(state.seq, 5);
        assert!(Stage::ALL.iter().all(|s| state.is_stage_completed(*s)));
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut state = run_to_completion();
        assert!(state.advance("again").is_err());
        assert!(state.fail("late").is_err());
        assert!(state.begin("restart").is_err());
        assert_eq!(state.seq, 5);
    }

    #[test]
    fn test_idle_cannot_advance_or_fail() {
        let mut state = ProgressState::new();
        let err = state.advance("skip").unwrap_err();
        assert_eq!(err.from, RunStatus::Idle);
        assert!(state.fail("nope").is_err());
    }

    #[test]
    fn test_fail_records_stage() {
        let mut state = ProgressState::new();
        state.begin("start").unwrap();
        state.advance("characters").unwrap();

        let failed = state.fail("characters broke").unwrap();
        assert_eq!(failed, Stage::Characters);
        assert!(state.has_failed());
        assert_eq!(state.failed_stage, Some(Stage::Characters));
        assert!(state.is_stage_completed(Stage::Screenplay));
        assert!(!state.is_stage_completed(Stage::Characters));
        assert!(!state.is_stage_active(Stage::Characters));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&RunStatus::ScenesInProgress).unwrap();
        assert_eq!(json, "\"scenes-in-progress\"");
    }
}
