//! Shared data models for the BookReel backend.
//!
//! This crate provides Serde-serializable types for:
//! - Stage artifacts (characters, scenes, the assembled movie)
//! - The per-session pipeline run aggregate
//! - The progress state machine observed by clients
//! - Progress events pushed to subscribers
//! - Request/response payloads of the four stage endpoints

pub mod api;
pub mod content;
pub mod event;
pub mod progress;
pub mod run;
pub mod stage;

// Re-export common types
pub use api::{
    AssembleRequest, AssembleResponse, CharactersRequest, CharactersResponse, ErrorBody,
    ScenesRequest, ScenesResponse, ScreenplayRequest, ScreenplayResponse,
};
pub use content::{
    estimated_duration_secs, validate_scene_sequence, Artifact, Character, Scene, SceneSequenceError,
    DEFAULT_SECONDS_PER_SCENE,
};
pub use event::{RunEvent, RunEventType};
pub use progress::{ProgressState, RunStatus, TransitionError};
pub use run::{PipelineRun, RunId, SessionId};
pub use stage::Stage;
