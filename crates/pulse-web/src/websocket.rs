//! WebSocket push endpoint.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use pulse_core::UserId;
use pulse_dispatch::{ChannelId, CHANNEL_BUFFER};

use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    pub user_id: String,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let user = UserId::new(query.user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Handle one live connection.
///
/// Pushes arrive on a bounded per-channel queue so dispatch never waits
/// on this socket. Missed pushes are not replayed; the client's refresh
/// call is the recovery path. Disconnecting touches only the registry,
/// never counters.
async fn handle_socket(socket: WebSocket, state: AppState, user: UserId) {
    let (mut sender, mut receiver) = socket.split();
    let channel = ChannelId::new();
    let (tx, mut rx) = mpsc::channel(CHANNEL_BUFFER);

    state.registry.register(user.clone(), channel, tx).await;
    info!(%user, %channel, "push channel connected");

    // Forward queued envelopes to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let json = match serde_json::to_string(&envelope) {
                Ok(json) => json,
                Err(e) => {
                    debug!(error = %e, "failed to serialize push envelope");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // Watch for the client closing the connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => {
                    debug!("WebSocket client sent close frame");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.registry.unregister(&channel).await;
    info!(%user, %channel, "push channel disconnected");
}
