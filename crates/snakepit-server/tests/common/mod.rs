use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use snakepit_core::net::messages::{
    ClientMessage, CreateRoomMsg, DeathMsg, JoinRoomMsg, MoveMsg, RoomCreatedMsg, ServerMessage,
    StartGameMsg,
};
use snakepit_core::net::protocol::{
    PROTOCOL_VERSION, decode_server_message, encode_client_message,
};
use snakepit_core::player::PlayerId;

use snakepit_server::build_app;
use snakepit_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default config on an ephemeral port.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send any client message over the stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Create a room and return the server's ack.
pub async fn ws_create_room(stream: &mut WsStream) -> RoomCreatedMsg {
    ws_send_client_msg(
        stream,
        &ClientMessage::CreateRoom(CreateRoomMsg {
            protocol_version: PROTOCOL_VERSION,
        }),
    )
    .await;

    match ws_read_server_msg(stream).await {
        ServerMessage::RoomCreated(created) => created,
        other => panic!("Expected RoomCreated, got: {other:?}"),
    }
}

/// Send a JoinRoom and return whatever the server replies with
/// (RoomJoined on success, Error otherwise).
pub async fn ws_join_room(stream: &mut WsStream, room_code: &str) -> ServerMessage {
    ws_send_client_msg(
        stream,
        &ClientMessage::JoinRoom(JoinRoomMsg {
            room_code: room_code.to_string(),
            protocol_version: PROTOCOL_VERSION,
        }),
    )
    .await;
    ws_read_server_msg(stream).await
}

/// Join a room, asserting success; returns the assigned player id after
/// consuming the joiner's own roster broadcast.
pub async fn ws_join_room_ok(stream: &mut WsStream, room_code: &str) -> PlayerId {
    let player_id = match ws_join_room(stream, room_code).await {
        ServerMessage::RoomJoined(joined) => {
            assert_eq!(joined.room_code, room_code);
            joined.player_id
        },
        other => panic!("Expected RoomJoined, got: {other:?}"),
    };
    match ws_read_server_msg(stream).await {
        ServerMessage::Roster(_) => {},
        other => panic!("Expected Roster after join, got: {other:?}"),
    }
    player_id
}

pub async fn ws_start_game(stream: &mut WsStream, room_code: &str) {
    ws_send_client_msg(
        stream,
        &ClientMessage::StartGame(StartGameMsg {
            room_code: room_code.to_string(),
        }),
    )
    .await;
}

pub async fn ws_send_move(stream: &mut WsStream, msg: MoveMsg) {
    ws_send_client_msg(stream, &ClientMessage::Move(msg)).await;
}

pub async fn ws_send_death(stream: &mut WsStream, room_code: &str, player_id: PlayerId) {
    ws_send_client_msg(
        stream,
        &ClientMessage::Death(DeathMsg {
            room_code: room_code.to_string(),
            player_id,
        }),
    )
    .await;
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read and decode the next server message.
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).expect("Failed to decode server message")
}
