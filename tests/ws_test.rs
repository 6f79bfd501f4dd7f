//! End-to-end tests over a real WebSocket connection

use futures::{SinkExt, StreamExt};
use quizroom::config::ServerConfig;
use quizroom::state::AppState;
use quizroom::types::RoomId;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn serve(config: ServerConfig) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::new(config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = quizroom::app(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    socket
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Next frame that is not a ping or pong
async fn next_frame(socket: &mut Socket) -> Option<Message> {
    loop {
        let frame = timeout(WAIT, socket.next())
            .await
            .expect("Timed out waiting for a frame");
        match frame {
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(msg)) => return Some(msg),
            Some(Err(_)) | None => return None,
        }
    }
}

async fn next_json(socket: &mut Socket) -> Value {
    match next_frame(socket).await {
        Some(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("Expected a text frame, got {:?}", other),
    }
}

fn quiz() -> Value {
    json!({
        "type": "createRoom",
        "questions": [{
            "question": "Fish?",
            "choices": ["foo", "bar"],
            "answer": 0,
            "time": 30
        }]
    })
}

/// Host socket with a fresh room, returns the room id
async fn open_room(addr: SocketAddr) -> (Socket, u64) {
    let mut host = connect(addr).await;
    send_json(&mut host, quiz()).await;

    let created = next_json(&mut host).await;
    assert_eq!(created["type"], "roomCreated");
    let room_id = created["roomId"].as_u64().unwrap();
    (host, room_id)
}

#[tokio::test]
async fn test_binary_frame_gets_error_frame() {
    let (addr, _state) = serve(ServerConfig::default()).await;
    let mut socket = connect(addr).await;

    socket
        .send(Message::Binary(vec![1, 2, 3].into()))
        .await
        .unwrap();

    let error = next_json(&mut socket).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "UNSUPPORTED_FRAME");

    // the connection stays usable
    send_json(&mut socket, quiz()).await;
    let created = next_json(&mut socket).await;
    assert_eq!(created["type"], "roomCreated");
}

#[tokio::test]
async fn test_malformed_text_gets_error_frame() {
    let (addr, _state) = serve(ServerConfig::default()).await;
    let mut socket = connect(addr).await;

    socket
        .send(Message::Text("{not json".to_string().into()))
        .await
        .unwrap();

    let error = next_json(&mut socket).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "PARSE_ERROR");
}

#[tokio::test]
async fn test_ping_is_answered_with_pong() {
    let (addr, _state) = serve(ServerConfig::default()).await;
    let mut socket = connect(addr).await;

    socket
        .send(Message::Ping(b"hi".to_vec().into()))
        .await
        .unwrap();

    let payload = timeout(WAIT, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Pong(payload))) => return payload,
                Some(Ok(_)) => continue,
                other => panic!("Socket ended before pong: {:?}", other),
            }
        }
    })
    .await
    .expect("Timed out waiting for pong");
    assert_eq!(&payload[..], b"hi");
}

#[tokio::test]
async fn test_server_sends_heartbeat_pings() {
    let (addr, _state) = serve(ServerConfig {
        heartbeat: Duration::from_secs(1),
        ..Default::default()
    })
    .await;
    let mut socket = connect(addr).await;

    let pinged = timeout(WAIT, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Ping(_))) => return true,
                Some(Ok(_)) => continue,
                _ => return false,
            }
        }
    })
    .await
    .expect("Timed out waiting for heartbeat");
    assert!(pinged);
}

#[tokio::test]
async fn test_host_disconnect_ends_game_and_closes_players() {
    let (addr, state) = serve(ServerConfig::default()).await;
    let (mut host, room_id) = open_room(addr).await;

    let mut player = connect(addr).await;
    send_json(
        &mut player,
        json!({ "type": "joinRoom", "roomId": room_id, "username": "alice" }),
    )
    .await;
    assert_eq!(next_json(&mut player).await, json!({ "type": "joined" }));
    assert_eq!(
        next_json(&mut host).await,
        json!({ "type": "userJoined", "username": "alice" })
    );

    host.close(None).await.unwrap();

    assert_eq!(next_json(&mut player).await, json!({ "type": "gameEnd" }));
    assert!(matches!(
        next_frame(&mut player).await,
        Some(Message::Close(_)) | None
    ));

    // the session released its room before closing the player's outbox
    let room_id = RoomId(u32::try_from(room_id).unwrap());
    assert!(state.registry.lookup(room_id).await.is_none());
}

#[tokio::test]
async fn test_player_disconnect_leaves_room() {
    let (addr, state) = serve(ServerConfig::default()).await;
    let (mut host, room_id) = open_room(addr).await;

    let mut player = connect(addr).await;
    send_json(
        &mut player,
        json!({ "type": "joinRoom", "roomId": room_id, "username": "bob" }),
    )
    .await;
    assert_eq!(next_json(&mut player).await, json!({ "type": "joined" }));
    assert_eq!(
        next_json(&mut host).await,
        json!({ "type": "userJoined", "username": "bob" })
    );

    drop(player);

    assert_eq!(
        next_json(&mut host).await,
        json!({ "type": "userLeft", "username": "bob" })
    );
    let room_id = RoomId(u32::try_from(room_id).unwrap());
    assert!(state.registry.lookup(room_id).await.is_some());
}
