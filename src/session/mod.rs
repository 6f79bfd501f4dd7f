//! Session state machine
//!
//! A `Session` holds everything about one running game: the quiz, the roster,
//! the round in progress and the phase. It is plain synchronous state and is
//! only ever touched by its actor task (see [`actor`]), which serializes every
//! mutation of a room in the order the commands arrived.

pub mod actor;
pub mod roster;
pub mod round;
pub mod timer;

use crate::error::{JoinRejected, ProtocolError};
use crate::protocol::{deliver, HostEvent, Outbox, PlayerEvent, QuestionInfo};
use crate::scoring::{score_round, ScoringPolicy};
use crate::types::*;
use chrono::{DateTime, Utc};
use roster::Roster;
use round::RoundRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Per-session knobs, derived from the server config
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Size of the session command queue
    pub channel_capacity: usize,
    /// Send a `tick` to the host every second of a round
    pub send_ticks: bool,
    pub max_username_len: usize,
    pub scoring: ScoringPolicy,
    pub room_id_attempts: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            send_ticks: true,
            max_username_len: 24,
            scoring: ScoringPolicy::default(),
            room_id_attempts: 64,
        }
    }
}

/// Input to a session actor
#[derive(Debug)]
pub enum SessionCommand {
    BeginRound,
    EndRound,
    ShowLeaderboard,
    Join {
        conn: ConnectionId,
        username: String,
        outbox: Outbox,
        reply: oneshot::Sender<Result<Username, JoinRejected>>,
    },
    Answer {
        conn: ConnectionId,
        choice: usize,
    },
    Leave {
        conn: ConnectionId,
    },
    HostLeft,
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// Registry-initiated teardown
    Shutdown,
}

/// Read-only view of a session, served by the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub room_id: RoomId,
    pub display_id: String,
    pub phase: Phase,
    pub players: Vec<Username>,
    pub question_index: Option<usize>,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful `beginRound`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    Started { question_index: usize, limit: Duration },
    /// No questions were left, the session is now `Ended`
    GameOver,
}

#[derive(Debug)]
pub struct Session {
    room_id: RoomId,
    quiz: Quiz,
    phase: Phase,
    host: Outbox,
    roster: Roster,
    /// Index of the most recently started question
    current: Option<usize>,
    round: Option<RoundRecord>,
    scoring: ScoringPolicy,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(room_id: RoomId, quiz: Quiz, host: Outbox, settings: &SessionSettings) -> Self {
        Self {
            room_id,
            quiz,
            phase: Phase::Lobby,
            host,
            roster: Roster::new(settings.max_username_len),
            current: None,
            round: None,
            scoring: settings.scoring,
            created_at: Utc::now(),
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn host(&self) -> &Outbox {
        &self.host
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Index of the question whose round is running right now
    pub fn active_question(&self) -> Option<usize> {
        self.round.as_ref().map(RoundRecord::question_index)
    }

    /// Tell the host which room it got
    pub fn announce(&self) {
        deliver(
            &self.host,
            HostEvent::RoomCreated {
                room_id: self.room_id,
            },
        );
    }

    pub fn join(
        &mut self,
        conn: ConnectionId,
        username: &str,
        outbox: Outbox,
    ) -> Result<Username, JoinRejected> {
        if self.phase != Phase::Lobby {
            return Err(JoinRejected::GameAlreadyStarted);
        }

        let username = self.roster.join(conn, username, outbox.clone())?;
        tracing::info!("Room {}: `{}` joined", self.room_id, username);

        deliver(&outbox, PlayerEvent::Joined);
        deliver(
            &self.host,
            HostEvent::UserJoined {
                username: username.clone(),
            },
        );
        Ok(username)
    }

    /// Drop a player. Leaving twice is a no-op.
    pub fn leave(&mut self, conn: &str) -> Option<Username> {
        let entry = self.roster.remove_by_conn(conn)?;
        if let Some(round) = self.round.as_mut() {
            round.remove(&entry.username);
        }

        tracing::info!("Room {}: `{}` left", self.room_id, entry.username);
        deliver(
            &self.host,
            HostEvent::UserLeft {
                username: entry.username.clone(),
            },
        );
        Some(entry.username)
    }

    /// True while a round runs that nobody is still answering
    pub fn round_complete(&self) -> bool {
        self.phase == Phase::RoundActive && self.round.as_ref().is_some_and(|r| r.all_answered())
    }

    pub fn begin_round(&mut self, now: Instant) -> Result<BeginOutcome, ProtocolError> {
        match self.phase {
            Phase::Lobby if self.roster.is_empty() => return Err(ProtocolError::NoPlayers),
            Phase::Lobby | Phase::RoundEnded | Phase::Leaderboard => {}
            phase => {
                return Err(ProtocolError::OutOfPhase {
                    action: "beginRound",
                    phase,
                })
            }
        }

        let question_index = self.current.map_or(0, |i| i + 1);
        let Some(question) = self.quiz.get(question_index) else {
            self.finish();
            return Ok(BeginOutcome::GameOver);
        };

        let limit = question.time_limit();
        tracing::info!(
            "Room {}: round {}/{} begins ({}s)",
            self.room_id,
            question_index + 1,
            self.quiz.len(),
            question.time
        );

        deliver(
            &self.host,
            HostEvent::RoundBegin {
                question: QuestionInfo::from(question),
                question_index,
                question_count: self.quiz.len(),
            },
        );
        for player in self.roster.iter() {
            deliver(
                &player.outbox,
                PlayerEvent::RoundBegin {
                    choices: question.choices.clone(),
                    time: question.time,
                },
            );
        }

        self.round = Some(RoundRecord::new(
            question_index,
            now,
            self.roster.usernames(),
        ));
        self.current = Some(question_index);
        self.phase = Phase::RoundActive;

        Ok(BeginOutcome::Started {
            question_index,
            limit,
        })
    }

    /// Record a player's answer. Returns whether every player has now answered.
    pub fn record_answer(
        &mut self,
        conn: &str,
        choice: usize,
        now: Instant,
    ) -> Result<bool, ProtocolError> {
        let username = self
            .roster
            .find_by_conn(conn)
            .map(|e| e.username.clone())
            .ok_or(ProtocolError::UnknownConnection)?;

        let (Phase::RoundActive, Some(round)) = (self.phase, self.round.as_mut()) else {
            return Err(ProtocolError::OutOfPhase {
                action: "answer",
                phase: self.phase,
            });
        };

        let valid = self
            .quiz
            .get(round.question_index())
            .is_some_and(|q| q.is_valid_choice(choice));
        if !valid {
            return Err(ProtocolError::InvalidChoice(choice));
        }

        let answer = round.record(&username, choice, now)?;
        tracing::debug!(
            "Room {}: `{}` answered #{} after {:?}",
            self.room_id,
            username,
            answer.seq,
            answer.elapsed
        );

        deliver(&self.host, HostEvent::UserAnswered { username });
        Ok(round.all_answered())
    }

    /// Score the running round and report the results
    pub fn end_round(&mut self) -> Result<BTreeMap<Username, u32>, ProtocolError> {
        if self.phase != Phase::RoundActive {
            return Err(ProtocolError::OutOfPhase {
                action: "endRound",
                phase: self.phase,
            });
        }
        let round = self.round.take().ok_or(ProtocolError::OutOfPhase {
            action: "endRound",
            phase: self.phase,
        })?;
        let Some(question) = self.quiz.get(round.question_index()) else {
            self.phase = Phase::RoundEnded;
            return Ok(BTreeMap::new());
        };

        let gains = score_round(&round, question.answer, question.time_limit(), &self.scoring);

        for player in self.roster.iter_mut() {
            let point_gain = gains.get(&player.username).copied().unwrap_or(0);
            player.points = player.points.saturating_add(point_gain);
            let correct = round
                .answer_of(&player.username)
                .is_some_and(|a| a.choice == question.answer);

            deliver(
                &player.outbox,
                PlayerEvent::RoundEnd {
                    point_gain,
                    correct,
                    total: player.points,
                },
            );
        }

        deliver(
            &self.host,
            HostEvent::RoundEnd {
                point_gains: gains.clone(),
                answer: question.answer,
            },
        );

        self.phase = Phase::RoundEnded;
        tracing::info!(
            "Room {}: round {} ended, {} of {} answered",
            self.room_id,
            round.question_index() + 1,
            round.entries().filter(|(_, a)| a.is_some()).count(),
            round.len()
        );
        Ok(gains)
    }

    pub fn show_leaderboard(&mut self) -> Result<(), ProtocolError> {
        if self.phase != Phase::RoundEnded {
            return Err(ProtocolError::OutOfPhase {
                action: "showLeaderboard",
                phase: self.phase,
            });
        }

        let standings = self.roster.standings();
        for standing in &standings {
            if let Some(player) = self.roster.get(&standing.username) {
                deliver(
                    &player.outbox,
                    PlayerEvent::Leaderboard {
                        rank: standing.rank,
                        points: standing.points,
                    },
                );
            }
        }
        deliver(&self.host, HostEvent::Leaderboard { standings });

        self.phase = Phase::Leaderboard;
        Ok(())
    }

    /// Out of questions: final standings to the host, `gameEnd` to everyone
    pub fn finish(&mut self) {
        self.end_for_all();
        tracing::info!("Room {}: game over", self.room_id);
    }

    /// The host is gone, nobody is left to drive the game
    pub fn host_left(&mut self) {
        self.round = None;
        self.phase = Phase::Ended;
        for player in self.roster.iter() {
            deliver(&player.outbox, PlayerEvent::GameEnd);
        }
        tracing::info!("Room {}: host left, closing", self.room_id);
    }

    /// Teardown requested from outside
    pub fn shutdown(&mut self) {
        if self.phase != Phase::Ended {
            self.end_for_all();
        }
        tracing::info!("Room {}: shut down", self.room_id);
    }

    fn end_for_all(&mut self) {
        self.round = None;
        self.phase = Phase::Ended;
        for player in self.roster.iter() {
            deliver(&player.outbox, PlayerEvent::GameEnd);
        }
        deliver(
            &self.host,
            HostEvent::GameEnd {
                standings: self.roster.standings(),
            },
        );
    }

    /// Send an `error` frame to the host
    pub fn reject_host(&self, err: &ProtocolError) {
        tracing::warn!("Room {}: host message dropped: {}", self.room_id, err);
        deliver(&self.host, err);
    }

    /// Send an `error` frame to the player on `conn`, if it is still here
    pub fn reject_player(&self, conn: &str, err: &ProtocolError) {
        tracing::warn!("Room {}: player message dropped: {}", self.room_id, err);
        if let Some(player) = self.roster.find_by_conn(conn) {
            deliver(&player.outbox, err);
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            room_id: self.room_id,
            display_id: self.room_id.grouped(),
            phase: self.phase,
            players: self.roster.usernames().collect(),
            question_index: self.current,
            question_count: self.quiz.len(),
            created_at: self.created_at,
        }
    }
}
