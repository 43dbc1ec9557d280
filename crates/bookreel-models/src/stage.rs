//! Pipeline stages.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::progress::RunStatus;

/// One of the four sequential units of work in a run.
///
/// Declaration order is execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Book title to screenplay text
    Screenplay,
    /// Screenplay to cast of characters
    Characters,
    /// Screenplay to numbered scene list
    Scenes,
    /// Scenes to the final artifact
    Assembly,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [
        Stage::Screenplay,
        Stage::Characters,
        Stage::Scenes,
        Stage::Assembly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Screenplay => "screenplay",
            Stage::Characters => "characters",
            Stage::Scenes => "scenes",
            Stage::Assembly => "assembly",
        }
    }

    /// The stage that runs after this one, if any.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Screenplay => Some(Stage::Characters),
            Stage::Characters => Some(Stage::Scenes),
            Stage::Scenes => Some(Stage::Assembly),
            Stage::Assembly => None,
        }
    }

    /// The run status while this stage is in flight.
    pub fn in_progress_status(&self) -> RunStatus {
        match self {
            Stage::Screenplay => RunStatus::ScreenplayInProgress,
            Stage::Characters => RunStatus::CharactersInProgress,
            Stage::Scenes => RunStatus::ScenesInProgress,
            Stage::Assembly => RunStatus::AssemblyInProgress,
        }
    }

    /// Zero-based position in the pipeline.
    pub fn index(&self) -> usize {
        match self {
            Stage::Screenplay => 0,
            Stage::Characters => 1,
            Stage::Scenes => 2,
            Stage::Assembly => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
