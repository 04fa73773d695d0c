use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use snakepit_core::net::messages::{
    ClientMessage, ErrorMsg, RoomCreatedMsg, RoomJoinedMsg, ServerMessage,
};
use snakepit_core::net::protocol::{
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION, decode_client_message, encode_server_message,
};
use snakepit_core::player::PlayerId;
use snakepit_core::room::is_valid_room_code;

use crate::registry::PlayerSender;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The first frame must establish a room membership: CreateRoom or
    // JoinRoom. Anything else ends the connection.
    let first = match ws_receiver.next().await {
        Some(Ok(Message::Binary(data))) => data,
        _ => return,
    };
    let Ok(first_msg) = decode_client_message(&first) else {
        return;
    };

    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);

    let (room_code, player_id) = match first_msg {
        ClientMessage::CreateRoom(create) => {
            if !protocol_version_ok(create.protocol_version, &mut ws_sender).await {
                return;
            }
            let (code, player_id) = state.rooms.create_room(tx.clone()).await;
            let msg = ServerMessage::RoomCreated(RoomCreatedMsg {
                room_code: code.clone(),
                player_id,
            });
            let Ok(data) = encode_server_message(&msg) else {
                state.rooms.leave(player_id).await;
                return;
            };
            if ws_sender.send(Message::Binary(data.into())).await.is_err() {
                state.rooms.leave(player_id).await;
                return;
            }
            (code, player_id)
        },
        ClientMessage::JoinRoom(join) => {
            if !protocol_version_ok(join.protocol_version, &mut ws_sender).await {
                return;
            }
            // Format check before lookup keeps garbage out of the registry
            if !is_valid_room_code(&join.room_code) {
                send_error(&mut ws_sender, "Invalid room code").await;
                return;
            }
            match state.rooms.join_room(&join.room_code, tx.clone()).await {
                Ok(player_id) => {
                    let msg = ServerMessage::RoomJoined(RoomJoinedMsg {
                        room_code: join.room_code.clone(),
                        player_id,
                    });
                    let Ok(data) = encode_server_message(&msg) else {
                        state.rooms.leave(player_id).await;
                        return;
                    };
                    if ws_sender.send(Message::Binary(data.into())).await.is_err() {
                        state.rooms.leave(player_id).await;
                        return;
                    }
                    (join.room_code, player_id)
                },
                Err(e) => {
                    send_error(&mut ws_sender, &e.to_string()).await;
                    return;
                },
            }
        },
        _ => return,
    };

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, &room_code, player_id, &tx).await;

    // Connection gone (close frame, error, or explicit leave): implicit
    // leave of whatever room the connection belonged to.
    state.rooms.leave(player_id).await;
    tracing::info!(player_id, room = %room_code, "Player disconnected");
}

async fn protocol_version_ok(
    version: u8,
    ws_sender: &mut futures::stream::SplitSink<WebSocket, Message>,
) -> bool {
    if version != PROTOCOL_VERSION {
        send_error(
            ws_sender,
            &format!("Protocol version mismatch: client={version}, server={PROTOCOL_VERSION}"),
        )
        .await;
        return false;
    }
    true
}

/// Send an error reply on a socket that has no writer task yet.
async fn send_error(ws_sender: &mut futures::stream::SplitSink<WebSocket, Message>, error: &str) {
    let msg = ServerMessage::Error(ErrorMsg {
        message: error.to_string(),
    });
    if let Ok(data) = encode_server_message(&msg)
        && let Err(e) = ws_sender.send(Message::Binary(data.into())).await
    {
        tracing::warn!(error = %e, "Failed to send error reply");
    }
}

/// Queue an error reply through the player's outbound channel. Used once
/// the writer task owns the socket; errors only ever go to the requesting
/// connection.
fn send_error_via(tx: &PlayerSender, error: &str) {
    let msg = ServerMessage::Error(ErrorMsg {
        message: error.to_string(),
    });
    if let Ok(data) = encode_server_message(&msg)
        && tx.try_send(Bytes::from(data)).is_err()
    {
        tracing::debug!("Dropped error reply to slow client");
    }
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    room_code: &str,
    player_id: PlayerId,
    tx: &PlayerSender,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(player_id, room_code, "Rate limited");
            continue;
        }
        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }
        let Ok(msg) = decode_client_message(&data) else {
            continue;
        };

        match msg {
            ClientMessage::StartGame(m) => {
                if m.room_code != room_code {
                    tracing::debug!(player_id, room_code, "Start for another room, ignoring");
                    continue;
                }
                if let Err(e) = state.rooms.start_game(room_code, player_id).await {
                    tracing::warn!(
                        player_id, room_code, error = %e,
                        "Failed to start game"
                    );
                    send_error_via(tx, &e.to_string());
                }
            },

            ClientMessage::Move(m) => {
                // Stale room codes and spoofed player ids both reduce to
                // "not a member here": dropped without an error reply.
                if m.room_code != room_code || m.player_id != player_id {
                    tracing::debug!(player_id, room_code, "Mismatched move, ignoring");
                    continue;
                }
                state
                    .rooms
                    .report_move(room_code, player_id, m.cells, m.score)
                    .await;
            },

            ClientMessage::Death(m) => {
                if m.room_code != room_code || m.player_id != player_id {
                    tracing::debug!(player_id, room_code, "Mismatched death report, ignoring");
                    continue;
                }
                state.rooms.report_death(room_code, player_id).await;
            },

            ClientMessage::LeaveRoom(_) => break,

            ClientMessage::CreateRoom(_) | ClientMessage::JoinRoom(_) => {
                tracing::warn!(
                    player_id,
                    room_code,
                    "Connection already has a room, ignoring join/create"
                );
            },
        }
    }
}
