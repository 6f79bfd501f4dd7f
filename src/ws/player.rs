//! Player message handlers

use super::connection::Connection;
use super::host::forward;
use crate::error::{CoordinatorError, JoinRejected};
use crate::protocol::{PlayerEvent, ServerMessage};
use crate::session::SessionCommand;
use crate::state::AppState;
use crate::types::RoomId;
use std::sync::Arc;

fn join_failed(reason: JoinRejected) -> Option<ServerMessage> {
    Some(ServerMessage::from(PlayerEvent::JoinFailed {
        reason: reason.to_string(),
    }))
}

pub async fn handle_join_room(
    state: &Arc<AppState>,
    conn: &mut Connection,
    room_id: RoomId,
    username: String,
) -> Option<ServerMessage> {
    tracing::info!("{}: join room {} as `{}`", conn.id(), room_id, username);

    let Some(session) = state.registry.lookup(room_id).await else {
        return join_failed(JoinRejected::RoomNotFound);
    };

    let outbox = conn.outbox()?.clone();
    match session.join(conn.id().to_string(), username, outbox).await {
        Ok(username) => {
            // `joined` arrives through the outbox
            conn.bind_player(session, username);
            None
        }
        Err(CoordinatorError::Join(reason)) => {
            tracing::info!("{}: join refused: {}", conn.id(), reason);
            join_failed(reason)
        }
        Err(e) => {
            // the session ended while we were asking
            tracing::debug!("{}: {}", conn.id(), e);
            join_failed(JoinRejected::RoomNotFound)
        }
    }
}

pub async fn handle_answer(conn: &Connection, choice: usize) -> Option<ServerMessage> {
    tracing::debug!(
        "{}: `{}` answers {}",
        conn.id(),
        conn.username().unwrap_or_default(),
        choice
    );
    forward(
        conn,
        SessionCommand::Answer {
            conn: conn.id().to_string(),
            choice,
        },
    )
    .await
}
