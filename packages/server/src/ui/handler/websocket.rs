//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, UserId},
    ui::{dispatcher::dispatch_frame, error::ApiError, state::AppState},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Optional access token; without it the connection starts unauthenticated
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = match query.token.as_deref() {
        Some(token) => Some(state.authenticator.verify(token).map_err(|e| {
            tracing::warn!(error = %e, "Rejecting WebSocket handshake with invalid token");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?),
        None => None,
    };

    let connection_id = ConnectionId::generate();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, connection_id, user_id)))
}

/// Spawns a task that receives frames from the rx channel and pushes them to the WebSocket sender.
///
/// This is the outbound half of a connection: every event the hub emits to
/// this connection arrives on `rx` already encoded.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    user_id: Option<UserId>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    state
        .connection_usecase
        .connect(connection_id.clone(), user_id, tx)
        .await;

    let (sender, mut receiver) = socket.split();

    let recv_state = state.clone();
    let recv_connection_id = connection_id.clone();

    // Spawn a task to receive events from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(conn_id = %recv_connection_id, "WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    dispatch_frame(&recv_state, &recv_connection_id, text.as_str()).await;
                }
                Message::Ping(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                    tracing::trace!(conn_id = %recv_connection_id, "Received ping");
                }
                Message::Close(_) => {
                    tracing::debug!(conn_id = %recv_connection_id, "Client requested close");
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to forward hub events to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.connection_usecase.disconnect(&connection_id).await;
}
