//! Axum HTTP API server.
//!
//! This crate provides:
//! - The four stage endpoints
//! - Session-scoped runs with a WebSocket progress stream
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::RunJanitor;
pub use state::AppState;
