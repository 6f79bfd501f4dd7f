//! Host message handlers
//!
//! Room creation binds the connection as host. Everything else a host sends
//! is forwarded to its session; phase checks happen there.

use super::connection::Connection;
use crate::protocol::ServerMessage;
use crate::session::SessionCommand;
use crate::state::AppState;
use crate::types::{Question, Quiz};
use std::sync::Arc;

pub async fn handle_create_room(
    state: &Arc<AppState>,
    conn: &mut Connection,
    questions: Vec<Question>,
) -> Option<ServerMessage> {
    let quiz = match Quiz::new(questions) {
        Ok(quiz) => quiz,
        Err(e) => {
            tracing::warn!("{}: rejected quiz: {}", conn.id(), e);
            return Some(ServerMessage::error("INVALID_QUIZ", e.to_string()));
        }
    };

    let outbox = conn.outbox()?.clone();
    match state.registry.create_session(quiz, outbox).await {
        Ok(session) => {
            // `roomCreated` arrives through the outbox
            conn.bind_host(session);
            None
        }
        Err(e) => {
            tracing::error!("Failed to create room: {}", e);
            Some(ServerMessage::error("ROOM_UNAVAILABLE", e.to_string()))
        }
    }
}

/// Pass a control command to the host's session
pub async fn forward(conn: &Connection, cmd: SessionCommand) -> Option<ServerMessage> {
    let session = conn.session()?;
    match session.send(cmd).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("{}: {}", conn.id(), e);
            Some(ServerMessage::error("SESSION_CLOSED", e.to_string()))
        }
    }
}
