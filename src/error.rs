//! Error taxonomy of the session coordinator
//!
//! None of these are fatal to the process. Protocol errors are reported to the
//! sender and the offending message is dropped, join rejections go to the joining
//! client only, and configuration errors stop a room from being created.

use crate::types::{Phase, RoomId};

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// A message that is malformed or not allowed for the sender right now
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid message: {0}")]
    Malformed(String),

    #[error("binary frames are not supported")]
    BinaryFrame,

    #[error("`{action}` is not allowed for a {role} connection")]
    WrongRole {
        action: &'static str,
        role: &'static str,
    },

    #[error("`{action}` is not allowed while the session is in {phase:?}")]
    OutOfPhase { action: &'static str, phase: Phase },

    #[error("choice {0} does not reference an answer of the current question")]
    InvalidChoice(usize),

    #[error("already answered this round")]
    AlreadyAnswered,

    #[error("connection is not part of this session")]
    UnknownConnection,

    #[error("at least one player must join before the game can start")]
    NoPlayers,
}

impl ProtocolError {
    /// Stable code sent to clients in `error` frames
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(_) => "PARSE_ERROR",
            ProtocolError::BinaryFrame => "UNSUPPORTED_FRAME",
            ProtocolError::WrongRole { .. } => "UNAUTHORIZED",
            ProtocolError::OutOfPhase { .. } => "OUT_OF_PHASE",
            ProtocolError::InvalidChoice(_) => "INVALID_CHOICE",
            ProtocolError::AlreadyAnswered => "ALREADY_ANSWERED",
            ProtocolError::UnknownConnection => "UNKNOWN_CONNECTION",
            ProtocolError::NoPlayers => "NO_PLAYERS",
        }
    }
}

/// Why a `joinRoom` request was refused. The `Display` text is the wire reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinRejected {
    #[error("room not found")]
    RoomNotFound,

    #[error("username taken")]
    UsernameTaken,

    #[error("game already started")]
    GameAlreadyStarted,

    #[error("invalid username")]
    InvalidUsername,
}

/// A quiz that cannot be played
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("question {question} has an empty prompt")]
    EmptyPrompt { question: usize },

    #[error("question {question} has {count} choices, at least 2 are required")]
    TooFewChoices { question: usize, count: usize },

    #[error("question {question} has {count} choices, at most 4 are allowed")]
    TooManyChoices { question: usize, count: usize },

    #[error("question {question} leaves mandatory choice {choice} empty")]
    EmptyChoice { question: usize, choice: usize },

    #[error("question {question} marks answer {answer} which does not exist")]
    AnswerOutOfRange { question: usize, answer: usize },

    #[error("question {question} marks the empty choice {answer} as correct")]
    AnswerIsEmpty { question: usize, answer: usize },

    #[error("question {question} has no time limit")]
    ZeroTime { question: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("join rejected: {0}")]
    Join(#[from] JoinRejected),

    #[error("invalid quiz: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("connection lost")]
    ConnectionLost,

    #[error("no free room id after {0} attempts")]
    RoomIdsExhausted(u32),

    #[error("session {0} is no longer running")]
    SessionClosed(RoomId),
}
