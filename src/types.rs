use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque ID types for type safety
pub type ConnectionId = String;
pub type Username = String;

/// Numeric room identifier shown to players as the game PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl RoomId {
    /// Smallest issued id (six digits, no leading zero)
    pub const MIN: u32 = 100_000;
    pub const MAX: u32 = 999_999;

    pub fn get(self) -> u32 {
        self.0
    }

    /// Render the id split into 3-digit groups, e.g. `123 456`
    pub fn grouped(self) -> String {
        let digits = self.0.to_string();
        digits
            .as_bytes()
            .chunks(3)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RoomId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Lobby,
    RoundActive,
    RoundEnded,
    Leaderboard,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Player,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Player => "player",
        }
    }
}

pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = 4;

/// A quiz question as sent by the host in `createRoom`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    /// First two are mandatory, the optional ones may be empty strings
    pub choices: Vec<String>,
    /// Index of the correct choice
    pub answer: usize,
    /// Time limit in seconds
    pub time: u16,
}

impl Question {
    /// Check the invariants for the question at position `index` in its quiz
    pub fn validate(&self, index: usize) -> Result<(), ConfigurationError> {
        if self.question.trim().is_empty() {
            return Err(ConfigurationError::EmptyPrompt { question: index });
        }

        let count = self.choices.len();
        if count < MIN_CHOICES {
            return Err(ConfigurationError::TooFewChoices {
                question: index,
                count,
            });
        }
        if count > MAX_CHOICES {
            return Err(ConfigurationError::TooManyChoices {
                question: index,
                count,
            });
        }

        if let Some(choice) = self.choices[..MIN_CHOICES]
            .iter()
            .position(|c| c.trim().is_empty())
        {
            return Err(ConfigurationError::EmptyChoice {
                question: index,
                choice,
            });
        }

        if self.answer >= count {
            return Err(ConfigurationError::AnswerOutOfRange {
                question: index,
                answer: self.answer,
            });
        }
        if !self.is_valid_choice(self.answer) {
            return Err(ConfigurationError::AnswerIsEmpty {
                question: index,
                answer: self.answer,
            });
        }

        if self.time == 0 {
            return Err(ConfigurationError::ZeroTime { question: index });
        }

        Ok(())
    }

    /// Whether `choice` references a non-empty choice
    pub fn is_valid_choice(&self, choice: usize) -> bool {
        self.choices
            .get(choice)
            .is_some_and(|c| !c.trim().is_empty())
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(u64::from(self.time))
    }
}

/// Validated, immutable question list owned by a session
#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    questions: Vec<Question>,
}

impl Quiz {
    pub fn new(questions: Vec<Question>) -> Result<Self, ConfigurationError> {
        if questions.is_empty() {
            return Err(ConfigurationError::NoQuestions);
        }
        for (index, question) in questions.iter().enumerate() {
            question.validate(index)?;
        }
        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

/// One line of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based, tied scores share a rank
    pub rank: usize,
    pub username: Username,
    pub points: u32,
}
