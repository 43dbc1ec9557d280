//! Content provider interface.
//!
//! A provider generates the artifact of each stage. The static demo
//! provider and a model-backed one are interchangeable behind this trait;
//! stage validation, timeouts and ordering live outside of it.

use async_trait::async_trait;
use bookreel_models::{Character, Scene};

use crate::error::ProviderResult;

/// Generator behind the four pipeline stages.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Get the name of this provider for logging.
    fn name(&self) -> &'static str;

    /// Write a screenplay for a book title.
    async fn screenplay(&self, title: &str) -> ProviderResult<String>;

    /// Derive the cast from the screenplay.
    async fn characters(&self, title: &str, screenplay: &str) -> ProviderResult<Vec<Character>>;

    /// Break the screenplay into numbered scenes.
    async fn scenes(&self, screenplay: &str) -> ProviderResult<Vec<Scene>>;

    /// Assemble the movie and return a locator for it.
    async fn assemble(&self, title: &str, scenes: &[Scene], duration_secs: u32) -> ProviderResult<String>;
}
