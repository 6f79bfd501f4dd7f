pub mod connection;
pub mod handlers;
mod host;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{CoordinatorError, ProtocolError};
use crate::protocol::ServerMessage;
use crate::state::AppState;
use connection::Connection;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match msg.to_json() {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize {:?}: {}", msg, e);
            Ok(())
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (outbox, mut inbox) = mpsc::channel(state.config.channel_capacity);
    let mut conn = Connection::new(outbox);

    let mut heartbeat = tokio::time::interval(state.config.heartbeat);
    // the first tick completes immediately
    heartbeat.tick().await;

    tracing::info!("WebSocket connected: {}", conn.id());

    loop {
        tokio::select! {
            // Session events
            event = inbox.recv() => {
                match event {
                    Some(msg) => {
                        if send_json(&mut sender, &msg).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        // The session is gone and dropped our outbox
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            // Client frames
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("{}: received {}", conn.id(), text.as_str());
                        if let Some(reply) =
                            handlers::handle_text(text.as_str(), &mut conn, &state).await
                        {
                            if send_json(&mut sender, &reply).await.is_err() {
                                tracing::error!("{}: failed to send reply", conn.id());
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let err = ProtocolError::BinaryFrame;
                        tracing::warn!("{}: {}", conn.id(), err);
                        if send_json(&mut sender, &ServerMessage::from(&err)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("{}: closed by client", conn.id());
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("{}: {} ({})", conn.id(), CoordinatorError::ConnectionLost, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    if let Err(e) = conn.disconnect().await {
        tracing::debug!("{}: {}", conn.id(), e);
    }
    tracing::info!("WebSocket connection closed: {}", conn.id());
}
