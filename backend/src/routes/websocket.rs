use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info};
use uuid::Uuid;

use crate::{models::tracking::WsQueryParams, services::auth::AuthService, AppState};

/// GET /ws/tracking?token=...: streams the account's tracking snapshots.
///
/// Browsers can't set headers on a WebSocket handshake, hence the query token.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsQueryParams>,
) -> Response {
    let auth = AuthService::resolve_session(state.store.as_ref(), &state.config, &params.token).await;

    ws.on_upgrade(move |socket| async move {
        match auth {
            Ok(auth) => {
                info!("Tracking WebSocket connected: account={}", auth.account_id);
                handle_socket(socket, state, auth.account_id).await;
            }
            Err(e) => {
                error!("Tracking WebSocket auth failed: {}", e);
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: AppState, account_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.tracking.subscribe(account_id).await;

    // Spawn task: tracking snapshots → WebSocket
    let mut push_task = tokio::spawn(async move {
        loop {
            let payload = {
                let snapshot = updates.borrow_and_update();
                serde_json::json!({ "type": "tracking", "payload": &*snapshot }).to_string()
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
            // Err means the account's loop was discarded.
            if updates.changed().await.is_err() {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    // Receive messages from the client
    let mut client_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut push_task) => client_task.abort(),
        _ = (&mut client_task) => push_task.abort(),
    }

    info!("Tracking WebSocket disconnected: account={}", account_id);
}
