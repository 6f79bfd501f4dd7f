use crate::error::ProtocolError;
use crate::types::Username;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A player's answer within one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answer {
    pub choice: usize,
    /// Time since the round began
    pub elapsed: Duration,
    /// Arrival order within the round, starting at 0
    pub seq: usize,
}

/// Answer log of the round in progress
#[derive(Debug)]
pub struct RoundRecord {
    question_index: usize,
    started_at: Instant,
    entries: HashMap<Username, Option<Answer>>,
    answered: usize,
}

impl RoundRecord {
    /// Start a round for everyone on the roster at this moment
    pub fn new(
        question_index: usize,
        started_at: Instant,
        players: impl IntoIterator<Item = Username>,
    ) -> Self {
        Self {
            question_index,
            started_at,
            entries: players.into_iter().map(|name| (name, None)).collect(),
            answered: 0,
        }
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    /// Record the first answer of `username`; later ones are refused
    pub fn record(
        &mut self,
        username: &str,
        choice: usize,
        now: Instant,
    ) -> Result<Answer, ProtocolError> {
        let seq = self.answered;
        let slot = self
            .entries
            .get_mut(username)
            .ok_or(ProtocolError::UnknownConnection)?;

        if slot.is_some() {
            return Err(ProtocolError::AlreadyAnswered);
        }

        let answer = Answer {
            choice,
            elapsed: now.saturating_duration_since(self.started_at),
            seq,
        };
        *slot = Some(answer);
        self.answered += 1;
        Ok(answer)
    }

    /// Forget a player who left mid-round
    pub fn remove(&mut self, username: &str) {
        if let Some(Some(_)) = self.entries.remove(username) {
            self.answered -= 1;
        }
    }

    /// True once nobody is left waiting to answer (also when nobody is left at all)
    pub fn all_answered(&self) -> bool {
        self.answered == self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn answer_of(&self, username: &str) -> Option<&Answer> {
        self.entries.get(username).and_then(Option::as_ref)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&Answer>)> {
        self.entries
            .iter()
            .map(|(name, answer)| (name.as_str(), answer.as_ref()))
    }
}
