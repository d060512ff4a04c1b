//! WebSocket endpoints.
//!
//! - `/ws/suggestions`: the client sends its input text as text frames, the
//!   server pushes debounced `SuggestionUpdate`s back.
//! - `/ws/downloads`: the server pushes every monitor view as it is
//!   published, with the per-task changes since the previous snapshot.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use curator_core::{monitor::TaskChange, DownloadSnapshot, MonitorView, SuggestionUpdate};

use super::downloads::DownloadsResponse;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_SENT};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Message pushed on the downloads socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadsMessage {
    /// A newly published monitor view.
    View {
        view: DownloadsResponse,
        /// Empty unless both this and the previous view carried a snapshot.
        changes: Vec<TaskChange>,
    },
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl DownloadsMessage {
    fn view(view: &MonitorView, previous: Option<&DownloadSnapshot>) -> Self {
        let changes = match (view.snapshot(), previous) {
            (Some(current), Some(previous)) => current.changes_since(previous),
            _ => Vec::new(),
        };
        DownloadsMessage::View {
            view: DownloadsResponse::from(view),
            changes,
        }
    }

    fn message_type(&self) -> &'static str {
        match self {
            DownloadsMessage::View { .. } => "downloads_view",
            DownloadsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

type WsSender = SplitSink<WebSocket, Message>;

/// Serialize and send one message. Returns false once the client is gone.
async fn send_json<T: Serialize>(sender: &mut WsSender, msg_type: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                return false;
            }
            WS_MESSAGES_SENT.with_label_values(&[msg_type]).inc();
            true
        }
        Err(e) => {
            error!("Failed to serialize {} message: {}", msg_type, e);
            true
        }
    }
}

/// Drain client frames until close, handing text frames to `on_text`.
async fn read_frames(
    receiver: &mut futures::stream::SplitStream<WebSocket>,
    connection_id: Uuid,
    mut on_text: impl FnMut(&str),
) {
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => on_text(text.as_str()),
            Ok(Message::Close(_)) => {
                debug!(%connection_id, "WebSocket client requested close");
                break;
            }
            Ok(_) => {
                // Ping/pong is handled by axum; binary frames are ignored.
            }
            Err(e) => {
                warn!(%connection_id, "WebSocket receive error: {}", e);
                break;
            }
        }
    }
}

// ============================================================================
// Suggestions
// ============================================================================

/// GET /api/v1/ws/suggestions
pub async fn suggestions_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_suggestions(socket, state))
}

async fn handle_suggestions(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (debouncer, mut updates) = state.suggestion_debouncer();

    WS_CONNECTIONS_TOTAL.with_label_values(&["suggestions"]).inc();
    WS_CONNECTIONS_ACTIVE.with_label_values(&["suggestions"]).inc();
    info!(%connection_id, "Suggestion socket connected");

    let send_task = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            let msg_type = match &update {
                SuggestionUpdate::Show { .. } => "suggestions_show",
                SuggestionUpdate::Hide => "suggestions_hide",
            };
            if !send_json(&mut sender, msg_type, &update).await {
                break;
            }
        }
    });

    read_frames(&mut receiver, connection_id, |text| debouncer.on_input(text)).await;

    debouncer.cancel();
    drop(debouncer);
    send_task.abort();
    WS_CONNECTIONS_ACTIVE.with_label_values(&["suggestions"]).dec();
    info!(%connection_id, "Suggestion socket disconnected");
}

// ============================================================================
// Downloads
// ============================================================================

/// GET /api/v1/ws/downloads
pub async fn downloads_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_downloads(socket, state))
}

async fn handle_downloads(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let mut views = state.monitor().subscribe();

    WS_CONNECTIONS_TOTAL.with_label_values(&["downloads"]).inc();
    WS_CONNECTIONS_ACTIVE.with_label_values(&["downloads"]).inc();
    info!(%connection_id, "Downloads socket connected");

    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        // The current view first, then every replacement.
        let current = views.borrow_and_update().clone();
        let message = DownloadsMessage::view(&current, None);
        if !send_json(&mut sender, message.message_type(), &message).await {
            return;
        }
        let mut previous = current.snapshot().cloned();

        loop {
            tokio::select! {
                changed = views.changed() => {
                    if changed.is_err() {
                        debug!("Monitor channel closed");
                        break;
                    }
                    let view = views.borrow_and_update().clone();
                    let message = DownloadsMessage::view(&view, previous.as_deref());
                    if let Some(snapshot) = view.snapshot() {
                        previous = Some(snapshot.clone());
                    }
                    if !send_json(&mut sender, message.message_type(), &message).await {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    let message = DownloadsMessage::Heartbeat {
                        timestamp: chrono::Utc::now().timestamp(),
                    };
                    if !send_json(&mut sender, message.message_type(), &message).await {
                        break;
                    }
                }
            }
        }
    });

    read_frames(&mut receiver, connection_id, |text| {
        debug!(%connection_id, "Ignoring client message: {}", text);
    })
    .await;

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.with_label_values(&["downloads"]).dec();
    info!(%connection_id, "Downloads socket disconnected");
}
