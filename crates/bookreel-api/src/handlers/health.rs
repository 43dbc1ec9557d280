//! Health check handlers.

use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub provider: String,
    pub active_runs: usize,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub stages: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    /// `local` or the remote stage server
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(backend: impl Into<String>, latency_ms: Option<u64>) -> Self {
        Self {
            status: "ok".to_string(),
            backend: backend.into(),
            error: None,
            latency_ms,
        }
    }

    fn error(backend: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            backend: backend.into(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }
}

/// Readiness check endpoint (readiness probe).
/// When runs go through a remote stage server, its health endpoint must answer.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let stages_check = match &state.pipeline.stage_base_url {
        None => CheckStatus::ok("local", None),
        Some(base_url) => {
            let backend = base_url.to_string();
            let start = Instant::now();
            let probe = async {
                let url = base_url.join("health").map_err(|e| e.to_string())?;
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(2))
                    .build()
                    .map_err(|e| e.to_string())?;
                let response = client.get(url).send().await.map_err(|e| e.to_string())?;
                if response.status().is_success() {
                    Ok::<(), String>(())
                } else {
                    Err(format!("stage server answered {}", response.status()))
                }
            };
            match probe.await {
                Ok(()) => CheckStatus::ok(backend, Some(start.elapsed().as_millis() as u64)),
                Err(e) => CheckStatus::error(backend, e),
            }
        }
    };

    let all_ok = stages_check.status == "ok";
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        provider: state.stages.provider_name().to_string(),
        active_runs: state.runs.len().await,
        checks: ReadinessChecks {
            stages: stages_check,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
