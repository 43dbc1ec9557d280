//! Stage endpoints.
//!
//! Each endpoint runs one stage in-process. Missing or blank fields are a
//! 400, provider failures and timeouts a 500.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use bookreel_models::{
    AssembleRequest, AssembleResponse, CharactersRequest, CharactersResponse, ScenesRequest,
    ScenesResponse, ScreenplayRequest, ScreenplayResponse,
};
use bookreel_pipeline::StageBackend;

use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/generate-screenplay
pub async fn generate_screenplay(
    State(state): State<AppState>,
    payload: Result<Json<ScreenplayRequest>, JsonRejection>,
) -> ApiResult<Json<ScreenplayResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.stages.screenplay(request).await?))
}

/// POST /api/generate-characters
pub async fn generate_characters(
    State(state): State<AppState>,
    payload: Result<Json<CharactersRequest>, JsonRejection>,
) -> ApiResult<Json<CharactersResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.stages.characters(request).await?))
}

/// POST /api/generate-scenes
pub async fn generate_scenes(
    State(state): State<AppState>,
    payload: Result<Json<ScenesRequest>, JsonRejection>,
) -> ApiResult<Json<ScenesResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.stages.scenes(request).await?))
}

/// POST /api/assemble-movie
pub async fn assemble_movie(
    State(state): State<AppState>,
    payload: Result<Json<AssembleRequest>, JsonRejection>,
) -> ApiResult<Json<AssembleResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.stages.assemble(request).await?))
}
