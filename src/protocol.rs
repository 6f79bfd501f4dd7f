use crate::error::ProtocolError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Messages sent by clients. Unknown types and unknown or missing fields are
/// rejected during decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", deny_unknown_fields)]
pub enum ClientMessage {
    // First message of a host connection
    CreateRoom {
        questions: Vec<Question>,
    },
    // First message of a player connection
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        username: String,
    },

    // Player only
    Answer {
        choice: usize,
    },

    // Host only. Empty struct variants so extra keys are rejected too.
    BeginRound {},
    EndRound {},
    ShowLeaderboard {},
}

impl ClientMessage {
    /// Decode a text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Wire name of the message type
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::CreateRoom { .. } => "createRoom",
            ClientMessage::JoinRoom { .. } => "joinRoom",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::BeginRound {} => "beginRound",
            ClientMessage::EndRound {} => "endRound",
            ClientMessage::ShowLeaderboard {} => "showLeaderboard",
        }
    }
}

/// Question as shown to the host while the round runs (no answer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionInfo {
    pub question: String,
    pub choices: Vec<String>,
    pub time: u16,
}

impl From<&Question> for QuestionInfo {
    fn from(q: &Question) -> Self {
        Self {
            question: q.question.clone(),
            choices: q.choices.clone(),
            time: q.time,
        }
    }
}

/// Events sent to the room host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    /// Sent once the room exists
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: RoomId },

    UserJoined { username: Username },
    UserLeft { username: Username },
    /// Sent once per player per round, repeated answers are dropped
    UserAnswered { username: Username },

    #[serde(rename_all = "camelCase")]
    RoundBegin {
        question: QuestionInfo,
        question_index: usize,
        question_count: usize,
    },
    /// Countdown, once per elapsed second
    Tick { remaining: u16 },
    /// Every roster member is listed, wrong or missing answers with 0
    #[serde(rename_all = "camelCase")]
    RoundEnd {
        point_gains: BTreeMap<Username, u32>,
        answer: usize,
    },
    Leaderboard { standings: Vec<Standing> },
    /// The connection closes after this
    GameEnd {
        #[serde(default)]
        standings: Vec<Standing>,
    },
}

/// Events sent to a single player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    Joined,
    JoinFailed { reason: String },

    /// Players only see the choices, never the prompt's answer
    RoundBegin { choices: Vec<String>, time: u16 },
    #[serde(rename_all = "camelCase")]
    RoundEnd {
        point_gain: u32,
        correct: bool,
        total: u32,
    },
    Leaderboard { rank: usize, points: u32 },
    /// The connection closes after this
    GameEnd,
}

/// Sent to any connection whose message was dropped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "error")]
pub struct ErrorMessage {
    pub code: String,
    pub msg: String,
}

impl From<&ProtocolError> for ErrorMessage {
    fn from(e: &ProtocolError) -> Self {
        Self {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}

/// Anything written to a client socket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Host(HostEvent),
    Player(PlayerEvent),
    Error(ErrorMessage),
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.to_string(),
            msg: msg.into(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<HostEvent> for ServerMessage {
    fn from(event: HostEvent) -> Self {
        ServerMessage::Host(event)
    }
}

impl From<PlayerEvent> for ServerMessage {
    fn from(event: PlayerEvent) -> Self {
        ServerMessage::Player(event)
    }
}

impl From<&ProtocolError> for ServerMessage {
    fn from(e: &ProtocolError) -> Self {
        ServerMessage::Error(e.into())
    }
}

/// Outbound event queue of one connection
pub type Outbox = mpsc::Sender<ServerMessage>;

/// Queue an event without waiting. A full or closed outbox only affects its
/// own connection, so the event is logged and dropped.
pub fn deliver(outbox: &Outbox, msg: impl Into<ServerMessage>) {
    match outbox.try_send(msg.into()) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(msg)) => {
            tracing::warn!("Outbox full, dropping event: {:?}", msg);
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!("Outbox closed, recipient already gone");
        }
    }
}
