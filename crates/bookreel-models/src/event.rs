//! Progress events pushed to run observers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::content::{Artifact, Character, Scene};
use crate::run::RunId;
use crate::stage::Stage;

/// Event kinds, used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunEventType {
    StageStarted,
    ScreenplayReady,
    CharactersReady,
    ScenesReady,
    ArtifactReady,
    Completed,
    Failed,
}

impl RunEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunEventType::StageStarted => "stage_started",
            RunEventType::ScreenplayReady => "screenplay_ready",
            RunEventType::CharactersReady => "characters_ready",
            RunEventType::ScenesReady => "scenes_ready",
            RunEventType::ArtifactReady => "artifact_ready",
            RunEventType::Completed => "completed",
            RunEventType::Failed => "failed",
        }
    }
}

/// Event envelope. `seq` is the progress sequence number at emission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A stage was dispatched
    StageStarted {
        run_id: RunId,
        seq: u64,
        stage: Stage,
        message: String,
        timestamp: DateTime<Utc>,
    },

    ScreenplayReady {
        run_id: RunId,
        seq: u64,
        screenplay: String,
    },

    CharactersReady {
        run_id: RunId,
        seq: u64,
        characters: Vec<Character>,
    },

    ScenesReady {
        run_id: RunId,
        seq: u64,
        scenes: Vec<Scene>,
    },

    ArtifactReady {
        run_id: RunId,
        seq: u64,
        artifact: Artifact,
    },

    /// Every stage finished
    Completed {
        run_id: RunId,
        seq: u64,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A stage failed and the run stopped
    Failed {
        run_id: RunId,
        seq: u64,
        stage: Stage,
        message: String,
        retryable: bool,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn stage_started(run_id: &RunId, seq: u64, stage: Stage, message: impl Into<String>) -> Self {
        RunEvent::StageStarted {
            run_id: run_id.clone(),
            seq,
            stage,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn completed(run_id: &RunId, seq: u64, message: impl Into<String>) -> Self {
        RunEvent::Completed {
            run_id: run_id.clone(),
            seq,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        run_id: &RunId,
        seq: u64,
        stage: Stage,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        RunEvent::Failed {
            run_id: run_id.clone(),
            seq,
            stage,
            message: message.into(),
            retryable,
            timestamp: Utc::now(),
        }
    }

    /// Get the event type.
    pub fn event_type(&self) -> RunEventType {
        match self {
            RunEvent::StageStarted { .. } => RunEventType::StageStarted,
            RunEvent::ScreenplayReady { .. } => RunEventType::ScreenplayReady,
            RunEvent::CharactersReady { .. } => RunEventType::CharactersReady,
            RunEvent::ScenesReady { .. } => RunEventType::ScenesReady,
            RunEvent::ArtifactReady { .. } => RunEventType::ArtifactReady,
            RunEvent::Completed { .. } => RunEventType::Completed,
            RunEvent::Failed { .. } => RunEventType::Failed,
        }
    }

    pub fn run_id(&self) -> &RunId {
        match self {
            RunEvent::StageStarted { run_id, .. }
            | RunEvent::ScreenplayReady { run_id, .. }
            | RunEvent::CharactersReady { run_id, .. }
            | RunEvent::ScenesReady { run_id, .. }
            | RunEvent::ArtifactReady { run_id, .. }
            | RunEvent::Completed { run_id, .. }
            | RunEvent::Failed { run_id, .. } => run_id,
        }
    }

    /// No events follow a terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Completed { .. } | RunEvent::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let run_id = RunId("run-1".to_string());
        let event = RunEvent::stage_started(&run_id, 1, Stage::Screenplay, "Writing");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stage_started");
        assert_eq!(json["stage"], "screenplay");
        assert_eq!(json["run_id"], "run-1");
        assert_eq!(json["seq"], 1);
    }

    #[test]
    fn test_failed_event_is_terminal() {
        let run_id = RunId::new();
        let event = RunEvent::failed(&run_id, 3, Stage::Characters, "boom", true);
        assert!(event.is_terminal());
        assert_eq!(event.event_type(), RunEventType::Failed);
        assert_eq!(event.run_id(), &run_id);

        let started = RunEvent::stage_started(&run_id, 1, Stage::Screenplay, "go");
        assert!(!started.is_terminal());
    }
}
