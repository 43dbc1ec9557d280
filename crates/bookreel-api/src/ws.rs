//! WebSocket progress stream with backpressure support.
//!
//! A client connects to `/ws/sessions/:session_id` and receives a snapshot
//! of the session's current run, then every run event until the run
//! completes, fails or is abandoned.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use bookreel_models::RunId;
use bookreel_pipeline::RunHandle;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::handlers::runs::{parse_session_id, RunView};
use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_ENDPOINT: &str = "session";
const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Messages generated by the server itself; run events go out as-is.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionMessage {
    Snapshot { run: RunView },
    Abandoned { run_id: RunId },
}

impl SessionMessage {
    fn kind(&self) -> &'static str {
        match self {
            SessionMessage::Snapshot { .. } => "snapshot",
            SessionMessage::Abandoned { .. } => "abandoned",
        }
    }
}

/// Send a JSON message with backpressure handling.
async fn send_json<T: Serialize>(tx: &mpsc::Sender<Message>, msg: &T, kind: &str) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(j) => j,
        Err(_) => return false,
    };
    metrics::record_ws_message_sent(WS_ENDPOINT, kind);

    match tx.try_send(Message::Text(json)) {
        Ok(_) => true,
        Err(mpsc::error::TrySendError::Full(msg)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(msg).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Send a fresh snapshot. Returns false when the stream should end.
async fn send_snapshot(tx: &mpsc::Sender<Message>, handle: &RunHandle) -> bool {
    let run = handle.snapshot().await;
    let finished = run.is_terminal();
    let msg = SessionMessage::Snapshot { run: run.into() };
    send_json(tx, &msg, msg.kind()).await && !finished
}

/// WebSocket endpoint for a session's run progress.
pub async fn ws_session(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    let session_id = parse_session_id(&session_id)?;
    let handle = state
        .runs
        .current(&session_id)
        .await
        .ok_or_else(|| ApiError::not_found("No run for this session"))?;

    Ok(ws.on_upgrade(|socket| async move {
        connection_opened();
        handle_session_socket(socket, handle).await;
        connection_closed();
    }))
}

/// Count a socket once the handshake has completed.
fn connection_opened() -> i64 {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection(WS_ENDPOINT);
    count
}

fn connection_closed() -> i64 {
    let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
    metrics::set_ws_active_connections(count);
    count
}

async fn handle_session_socket(socket: WebSocket, handle: RunHandle) {
    let (ws_sender, mut receiver) = socket.split();

    // Bounded channel for backpressure
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    info!(run_id = %handle.run_id(), "WebSocket progress stream started");

    // Subscribe before the snapshot so no transition falls in between
    let mut events = handle.subscribe();

    if send_snapshot(&tx, &handle).await {
        let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            last_activity = Instant::now();
                            let terminal = event.is_terminal();
                            if !send_json(&tx, &event, event.event_type().as_str()).await {
                                warn!("WebSocket send failed, client disconnected");
                                break;
                            }
                            if terminal {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            // Resync from a snapshot instead of replaying
                            warn!(run_id = %handle.run_id(), skipped, "WebSocket observer lagged");
                            if !send_snapshot(&tx, &handle).await {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = handle.abandoned() => {
                    let msg = SessionMessage::Abandoned { run_id: handle.run_id().clone() };
                    let _ = send_json(&tx, &msg, msg.kind()).await;
                    break;
                }
                _ = heartbeat.tick() => {
                    if last_activity.elapsed() > WS_HEARTBEAT_INTERVAL / 2
                        && tx.send(Message::Ping(vec![])).await.is_err()
                    {
                        warn!("Heartbeat failed, client disconnected");
                        break;
                    }
                }
                client_msg = receiver.next() => {
                    match client_msg {
                        Some(Ok(Message::Pong(_))) => {
                            last_activity = Instant::now();
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Client closed connection");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    info!(run_id = %handle.run_id(), "WebSocket progress stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookreel_models::{PipelineRun, SessionId};

    #[test]
    fn test_snapshot_message_shape() {
        let run = PipelineRun::new(SessionId::generate(), "Dune");
        let run_id = run.id.clone();
        let msg = SessionMessage::Snapshot { run: run.into() };
        assert_eq!(msg.kind(), "snapshot");

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "snapshot");
        assert_eq!(json["run"]["id"], run_id.as_str());
        assert_eq!(json["run"]["failed"], false);
    }

    #[test]
    fn test_connection_gauge_balances() {
        let opened = connection_opened();
        assert!(opened >= 1);
        assert!(connection_closed() < opened);
    }

    #[test]
    fn test_abandoned_message_shape() {
        let msg = SessionMessage::Abandoned {
            run_id: RunId("run-1".to_string()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "abandoned");
        assert_eq!(json["run_id"], "run-1");
    }
}
