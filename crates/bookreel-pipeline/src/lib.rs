//! Book-to-movie generation pipeline.
//!
//! This crate provides:
//! - The content provider interface and the static demo provider
//! - Stage contracts with input validation and provider timeouts
//! - In-process and HTTP stage backends
//! - The sequential run orchestrator with progress events and abandonment
//! - A per-session run registry

pub mod config;
pub mod demo;
pub mod error;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod provider;
pub mod runner;
pub mod sessions;
pub mod stages;

pub use config::PipelineConfig;
pub use demo::StaticContentProvider;
pub use error::{PipelineError, PipelineResult, ProviderError, ProviderResult, StageError, StageResult};
pub use http::HttpStageBackend;
pub use logging::RunLogger;
pub use provider::ContentProvider;
pub use runner::{PipelineRunner, RunHandle};
pub use sessions::RunRegistry;
pub use stages::{
    check_artifact, check_characters, check_scenes, check_screenplay, LocalStages, StageBackend,
};
