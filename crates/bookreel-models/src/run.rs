//! Pipeline run aggregate.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::content::{Artifact, Character, Scene};
use crate::progress::{ProgressState, RunStatus};
use crate::stage::Stage;

/// Unique identifier for a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the client session that owns runs.
///
/// Only constructed through [`SessionId::parse`] or [`SessionId::generate`],
/// deserialization included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Parse a session ID: 8-64 ASCII alphanumerics or hyphens.
    pub fn parse(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.len() < 8 || id.len() > 64 {
            return None;
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return None;
        }
        Some(Self(id))
    }

    /// Generate a fresh session ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        SessionId::parse(id).ok_or_else(|| {
            de::Error::custom("session ID must be 8-64 ASCII letters, digits or hyphens")
        })
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One title-to-artifact execution, owned by a single session.
///
/// Stage outputs are filled in as stages complete and stay visible when a
/// later stage fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineRun {
    pub id: RunId,
    pub session_id: SessionId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenplay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<Vec<Character>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<Scene>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    pub progress: ProgressState,
    pub created_at: DateTime<Utc>,
}

impl PipelineRun {
    /// Create an idle run for a title. The title is expected to be validated.
    pub fn new(session_id: SessionId, title: impl Into<String>) -> Self {
        Self {
            id: RunId::new(),
            session_id,
            title: title.into(),
            screenplay: None,
            characters: None,
            scenes: None,
            artifact: None,
            progress: ProgressState::new(),
            created_at: Utc::now(),
        }
    }

    pub fn current_stage(&self) -> RunStatus {
        self.progress.status
    }

    pub fn last_message(&self) -> &str {
        &self.progress.message
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        self.progress.failed_stage
    }

    pub fn is_terminal(&self) -> bool {
        self.progress.is_terminal()
    }
}
