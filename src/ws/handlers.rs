//! WebSocket message dispatch
//!
//! Decodes a text frame, checks the message against the connection's role and
//! hands it to the role-specific handler module. Phase checks are left to the
//! session itself.

use crate::error::ProtocolError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::SessionCommand;
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::connection::Connection;
use super::{host, player};

/// Return an `error` frame unless the connection has the expected role
macro_rules! check_role {
    ($conn:expr, $action:expr, $expected:pat) => {
        if !matches!($conn.role(), $expected) {
            let err = ProtocolError::WrongRole {
                action: $action,
                role: role_name($conn.role()),
            };
            tracing::warn!("{}: {}", $conn.id(), err);
            return Some(ServerMessage::from(&err));
        }
    };
}

fn role_name(role: Option<Role>) -> &'static str {
    role.map_or("unbound", Role::as_str)
}

/// Decode and handle one text frame
pub async fn handle_text(
    text: &str,
    conn: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match ClientMessage::parse(text) {
        Ok(msg) => handle_message(msg, conn, state).await,
        Err(e) => {
            tracing::warn!("{}: {}", conn.id(), e);
            Some(ServerMessage::from(&e))
        }
    }
}

/// Handle a decoded client message and return an optional direct reply
pub async fn handle_message(
    msg: ClientMessage,
    conn: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    let action = msg.name();
    tracing::debug!("{}: {}", conn.id(), action);

    match msg {
        // Unbound connections pick their role
        ClientMessage::CreateRoom { questions } => {
            check_role!(conn, action, None);
            host::handle_create_room(state, conn, questions).await
        }

        ClientMessage::JoinRoom { room_id, username } => {
            check_role!(conn, action, None);
            player::handle_join_room(state, conn, room_id, username).await
        }

        // Player
        ClientMessage::Answer { choice } => {
            check_role!(conn, action, Some(Role::Player));
            player::handle_answer(conn, choice).await
        }

        // Host
        ClientMessage::BeginRound {} => {
            check_role!(conn, action, Some(Role::Host));
            host::forward(conn, SessionCommand::BeginRound).await
        }

        ClientMessage::EndRound {} => {
            check_role!(conn, action, Some(Role::Host));
            host::forward(conn, SessionCommand::EndRound).await
        }

        ClientMessage::ShowLeaderboard {} => {
            check_role!(conn, action, Some(Role::Host));
            host::forward(conn, SessionCommand::ShowLeaderboard).await
        }
    }
}
