//! HTTP stage backend.
//!
//! Drives the stage endpoints over the network. Any non-2xx answer is a
//! stage failure: client errors map to `InvalidInput` with the server's
//! message, everything else to `ProviderFailure`.

use std::time::Duration;

use async_trait::async_trait;
use bookreel_models::{
    AssembleRequest, AssembleResponse, CharactersRequest, CharactersResponse, ErrorBody,
    ScenesRequest, ScenesResponse, ScreenplayRequest, ScreenplayResponse, Stage,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{StageError, StageResult};
use crate::stages::StageBackend;

pub const SCREENPLAY_PATH: &str = "api/generate-screenplay";
pub const CHARACTERS_PATH: &str = "api/generate-characters";
pub const SCENES_PATH: &str = "api/generate-scenes";
pub const ASSEMBLE_PATH: &str = "api/assemble-movie";

/// Stage backend calling the JSON endpoints of a BookReel server.
#[derive(Clone)]
pub struct HttpStageBackend {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpStageBackend {
    /// Create a backend for `base_url` with a per-request timeout.
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post<Req, Resp>(&self, stage: Stage, path: &str, request: &Req) -> StageResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| StageError::provider_failure(stage, format!("invalid endpoint: {}", e)))?;

        debug!(stage = %stage, url = %url, "Calling stage endpoint");

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(stage, e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Resp>()
                .await
                .map_err(|e| self.transport_error(stage, e));
        }

        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        warn!(stage = %stage, status = %status, "Stage endpoint returned an error: {}", detail);

        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            Err(StageError::invalid_input(detail))
        } else {
            Err(StageError::provider_failure(stage, detail))
        }
    }

    fn transport_error(&self, stage: Stage, err: reqwest::Error) -> StageError {
        if err.is_timeout() {
            StageError::Timeout {
                stage,
                after: self.timeout,
            }
        } else {
            StageError::provider_failure(stage, err.to_string())
        }
    }
}

#[async_trait]
impl StageBackend for HttpStageBackend {
    async fn screenplay(&self, request: ScreenplayRequest) -> StageResult<ScreenplayResponse> {
        self.post(Stage::Screenplay, SCREENPLAY_PATH, &request).await
    }

    async fn characters(&self, request: CharactersRequest) -> StageResult<CharactersResponse> {
        self.post(Stage::Characters, CHARACTERS_PATH, &request).await
    }

    async fn scenes(&self, request: ScenesRequest) -> StageResult<ScenesResponse> {
        self.post(Stage::Scenes, SCENES_PATH, &request).await
    }

    async fn assemble(&self, request: AssembleRequest) -> StageResult<AssembleResponse> {
        self.post(Stage::Assembly, ASSEMBLE_PATH, &request).await
    }
}
