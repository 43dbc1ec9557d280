//! Session run handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bookreel_models::{PipelineRun, SessionId, Stage};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for starting a run.
#[derive(Debug, Default, Deserialize)]
pub struct StartRunRequest {
    #[serde(default, alias = "bookTitle")]
    pub title: Option<String>,
}

/// Progress of one stage, derived from the run's state.
#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    pub stage: Stage,
    pub active: bool,
    pub completed: bool,
}

/// Run snapshot with the observer predicates spelled out.
#[derive(Debug, Clone, Serialize)]
pub struct RunView {
    #[serde(flatten)]
    pub run: PipelineRun,
    pub stages: Vec<StageView>,
    pub failed: bool,
}

impl From<PipelineRun> for RunView {
    fn from(run: PipelineRun) -> Self {
        let stages = Stage::ALL
            .iter()
            .map(|&stage| StageView {
                stage,
                active: run.progress.is_stage_active(stage),
                completed: run.progress.is_stage_completed(stage),
            })
            .collect();
        let failed = run.progress.has_failed();

        Self { run, stages, failed }
    }
}

/// Validate a session ID path segment.
pub fn parse_session_id(raw: &str) -> ApiResult<SessionId> {
    SessionId::parse(raw).ok_or_else(|| ApiError::bad_request("Invalid session ID"))
}

/// POST /api/sessions/:session_id/runs
///
/// Starts a run in the background and abandons the session's previous run.
pub async fn start_run(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<StartRunRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RunView>)> {
    let session_id = parse_session_id(&session_id)?;
    let Json(request) = payload?;
    let title = request.title.unwrap_or_default();

    let handle = state.runs.start(session_id, &title).await?;
    info!(
        session_id = %handle.session_id(),
        run_id = %handle.run_id(),
        "Run accepted"
    );

    let run = handle.snapshot().await;
    Ok((StatusCode::ACCEPTED, Json(run.into())))
}

/// GET /api/sessions/:session_id/runs/current
pub async fn get_current_run(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<RunView>> {
    let session_id = parse_session_id(&session_id)?;
    let handle = state
        .runs
        .current(&session_id)
        .await
        .ok_or_else(|| ApiError::not_found("No run for this session"))?;

    Ok(Json(handle.snapshot().await.into()))
}

/// DELETE /api/sessions/:session_id/runs/current
pub async fn abandon_run(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    let session_id = parse_session_id(&session_id)?;
    if state.runs.abandon(&session_id).await {
        info!(session_id = %session_id, "Run abandoned by its owner");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("No run for this session"))
    }
}
