//! Pipeline error types.

use std::time::Duration;

use bookreel_models::{Stage, TransitionError};
use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;
pub type StageResult<T> = Result<T, StageError>;
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure reported by a content provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Failure of a single stage call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// Caller-supplied data failed validation. Not retried.
    #[error("{0}")]
    InvalidInput(String),

    /// The provider errored or broke the stage contract. Retryable.
    #[error("{stage} generation failed: {message}")]
    ProviderFailure { stage: Stage, message: String },

    /// The provider did not answer in time. Handled like a provider failure.
    #[error("{stage} generation timed out after {}s", .after.as_secs())]
    Timeout { stage: Stage, after: Duration },
}

impl StageError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn provider_failure(stage: Stage, msg: impl Into<String>) -> Self {
        Self::ProviderFailure {
            stage,
            message: msg.into(),
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StageError::ProviderFailure { .. } | StageError::Timeout { .. }
        )
    }

    /// Short kind label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::InvalidInput(_) => "invalid_input",
            StageError::ProviderFailure { .. } | StageError::Timeout { .. } => "provider_failure",
        }
    }
}

/// Failure of a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run was rejected before any stage started.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: StageError,
    },

    /// The owner discarded the run; results are dropped silently.
    #[error("run was abandoned")]
    Abandoned,

    #[error("Invalid progress transition: {0}")]
    Transition(#[from] TransitionError),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, PipelineError::Abandoned)
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::StageFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_kinds() {
        let invalid = StageError::invalid_input("Book title is required");
        assert!(!invalid.is_retryable());
        assert_eq!(invalid.kind(), "invalid_input");
        assert_eq!(invalid.to_string(), "Book title is required");

        let failure = StageError::provider_failure(Stage::Scenes, "model offline");
        assert!(failure.is_retryable());
        assert_eq!(failure.to_string(), "scenes generation failed: model offline");

        let timeout = StageError::Timeout {
            stage: Stage::Assembly,
            after: Duration::from_secs(30),
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.kind(), "provider_failure");
        assert_eq!(timeout.to_string(), "assembly generation timed out after 30s");
    }

    #[test]
    fn test_pipeline_error_retryable() {
        let err = PipelineError::StageFailed {
            stage: Stage::Characters,
            source: StageError::provider_failure(Stage::Characters, "down"),
        };
        assert!(err.is_retryable());
        assert!(!PipelineError::Abandoned.is_retryable());
        assert!(PipelineError::Abandoned.is_abandoned());
        assert!(!PipelineError::invalid_input("empty").is_retryable());
    }
}
