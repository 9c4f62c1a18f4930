use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};

use crate::db::accounts;
use crate::error::AppResult;
use crate::realtime::connections::ConnId;
use crate::realtime::events::{AuthenticatePayload, ClientEvent, ServerEvent};
use crate::realtime::interactions;
use crate::realtime::presence::PresenceEntry;
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection lifecycle: register an outbox, run the read loop, then
/// tear down presence on the way out.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (conn_id, mut outbox) = state.connections.register().await;
    let (mut sink, mut stream) = socket.split();

    // Writer task: drains this connection's outbox onto the socket.
    let writer = tokio::spawn(async move {
        while let Some(event) = outbox.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("event serialization failed: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => {
                // Failure boundary: an event error reaches the initiating
                // connection only and never ends the read loop.
                if let Err(err) = dispatch(&state, conn_id, event).await {
                    if err.status().is_server_error() {
                        tracing::error!("socket event failed: {}", err);
                    }
                    state
                        .connections
                        .send(
                            conn_id,
                            ServerEvent::Error {
                                message: err.public_message(),
                            },
                        )
                        .await;
                }
            }
            Err(e) => {
                tracing::debug!("unrecognized socket frame: {}", e);
                state
                    .connections
                    .send(
                        conn_id,
                        ServerEvent::Error {
                            message: "unrecognized event".to_string(),
                        },
                    )
                    .await;
            }
        }
    }

    disconnect(&state, conn_id).await;
    state.connections.unregister(conn_id).await;
    writer.abort();
}

async fn dispatch(state: &AppState, conn_id: ConnId, event: ClientEvent) -> AppResult<()> {
    match event {
        ClientEvent::Authenticate(payload) => authenticate(state, conn_id, payload).await,
        ClientEvent::GetConnectedUsers => send_connected_users(state, conn_id).await,
        ClientEvent::LikePost(payload) => interactions::like(state, payload).await,
        ClientEvent::AddComment(payload) => interactions::comment(state, payload).await,
        ClientEvent::SharePost(payload) => interactions::share(state, conn_id, payload).await,
    }
}

/// Bind this connection to an account: flag it connected, track it in the
/// presence registry, tell everyone else, and reply with the full list.
async fn authenticate(
    state: &AppState,
    conn_id: ConnId,
    payload: AuthenticatePayload,
) -> AppResult<()> {
    // A payload without an account id leaves the connection unauthenticated.
    let Some(account_id) = payload.user_id else {
        return Ok(());
    };
    let Some(display) = accounts::find_display(&state.db, account_id)? else {
        tracing::warn!("authenticate for unknown account {}", account_id);
        return Ok(());
    };

    accounts::set_connected(&state.db, account_id, true)?;
    state
        .presence
        .insert(PresenceEntry {
            account_id,
            name: display.name.clone(),
            conn: conn_id,
        })
        .await;

    state
        .connections
        .broadcast_except(
            conn_id,
            ServerEvent::UserConnected {
                id: account_id,
                name: display.name,
            },
        )
        .await;

    send_connected_users(state, conn_id).await
}

/// Reply with the connected list. The credential store is the source of
/// truth, not the presence map; a read failure degrades to an empty list.
async fn send_connected_users(state: &AppState, conn_id: ConnId) -> AppResult<()> {
    let users = accounts::connected_accounts(&state.db).unwrap_or_else(|e| {
        tracing::error!("connected-users lookup failed: {}", e);
        Vec::new()
    });
    state
        .connections
        .send(conn_id, ServerEvent::ConnectedUsers(users))
        .await;
    Ok(())
}

/// A connection that never authenticated owns no presence entry; its
/// disconnect mutates nothing and broadcasts nothing.
async fn disconnect(state: &AppState, conn_id: ConnId) {
    let Some(entry) = state.presence.remove_by_conn(conn_id).await else {
        return;
    };

    if let Err(e) = accounts::set_connected(&state.db, entry.account_id, false) {
        tracing::error!(
            "failed to clear connection flag for account {}: {}",
            entry.account_id,
            e
        );
    }

    state
        .connections
        .broadcast_except(
            conn_id,
            ServerEvent::UserDisconnected {
                id: entry.account_id,
                name: entry.name,
            },
        )
        .await;
}
