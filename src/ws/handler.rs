//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::PlayerInput;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outbound messages buffered per connection
const OUTBOX_CAPACITY: usize = 256;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let user_id = Uuid::new_v4();
    debug!(user_id = %user_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: Uuid, state: AppState) {
    info!(user_id = %user_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        user_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(user_id = %user_id, error = %e, "Failed to send welcome");
        return;
    }

    let (outbox, mut outbox_rx) = mpsc::channel::<ServerMsg>(OUTBOX_CAPACITY);

    // Spawn writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(user_id = %user_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let rate_limiter = PlayerRateLimiter::new(state.config.shot_rate_limit);

    // Reader loop: WebSocket -> matchmaking / match loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_message() {
                    warn!(user_id = %user_id, "Rate limited message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => {
                        handle_client_msg(&state, user_id, &outbox, &rate_limiter, client_msg).await;
                    }
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "Failed to parse client message");
                        let _ = outbox.try_send(ServerMsg::error("bad_message", e.to_string()));
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(user_id = %user_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(user_id = %user_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Leave queue or match; the opponent gets opponentLeft
    state.matchmaking.leave(user_id).await;

    // Abort writer task
    writer_handle.abort();

    info!(user_id = %user_id, "WebSocket connection closed");
}

/// Dispatch one parsed client message
async fn handle_client_msg(
    state: &AppState,
    user_id: Uuid,
    outbox: &mpsc::Sender<ServerMsg>,
    rate_limiter: &PlayerRateLimiter,
    msg: ClientMsg,
) {
    match msg {
        ClientMsg::FindMatch => {
            match state.matchmaking.find_match(user_id, outbox.clone()).await {
                Ok(Some(match_id)) => {
                    debug!(user_id = %user_id, match_id = %match_id, "Matched");
                }
                Ok(None) => {}
                Err(e) => {
                    let _ = outbox.try_send(ServerMsg::error(e.code(), e.to_string()));
                }
            }
        }
        ClientMsg::Ping { t } => {
            let _ = outbox.try_send(ServerMsg::Pong { t });
        }
        ClientMsg::LeaveMatch => {
            state.matchmaking.leave(user_id).await;
        }
        ClientMsg::ShotIntent { .. } => {
            if !rate_limiter.check_shot() {
                warn!(user_id = %user_id, "Rate limited shot");
                return;
            }

            let input = PlayerInput {
                user_id,
                msg,
                received_at: unix_millis(),
            };
            if let Err(e) = state.matchmaking.route_input(input).await {
                debug!(user_id = %user_id, error = %e, "Shot outside a match");
                let _ = outbox.try_send(ServerMsg::error(e.code(), e.to_string()));
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
