//! Room registry
//!
//! Maps live room ids to the command queue of their session actor. The map is
//! the only state shared between rooms and is held only for brief lookups and
//! inserts. All per-room work happens in the room's own actor task.

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::protocol::Outbox;
use crate::session::{actor, Session, SessionCommand, SessionSettings, SessionSnapshot};
use crate::types::{ConnectionId, Quiz, RoomId, Username};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use ulid::Ulid;

/// Cloneable address of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    room_id: RoomId,
    /// Distinguishes this session from a later one that reuses the room id
    key: Ulid,
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Queue a command, waiting for room in the queue
    pub async fn send(&self, cmd: SessionCommand) -> CoordinatorResult<()> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| CoordinatorError::SessionClosed(self.room_id))
    }

    /// Ask the session to add a player and wait for its decision
    pub async fn join(
        &self,
        conn: ConnectionId,
        username: String,
        outbox: Outbox,
    ) -> CoordinatorResult<Username> {
        let (reply, decision) = oneshot::channel();
        self.send(SessionCommand::Join {
            conn,
            username,
            outbox,
            reply,
        })
        .await?;

        let username = decision
            .await
            .map_err(|_| CoordinatorError::SessionClosed(self.room_id))??;
        Ok(username)
    }

    pub async fn snapshot(&self) -> CoordinatorResult<SessionSnapshot> {
        let (reply, snapshot) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        snapshot
            .await
            .map_err(|_| CoordinatorError::SessionClosed(self.room_id))
    }

    /// True once the actor has exited
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

#[derive(Debug)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, SessionHandle>>,
    settings: SessionSettings,
}

impl RoomRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            settings,
        }
    }

    /// Start a session for `quiz` under a fresh room id
    pub async fn create_session(
        self: &Arc<Self>,
        quiz: Quiz,
        host: Outbox,
    ) -> CoordinatorResult<SessionHandle> {
        let attempts = self.settings.room_id_attempts;
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity.max(1));

        let handle = {
            let mut rooms = self.rooms.write().await;
            let room_id = pick_room_id(&mut rand::rng(), &rooms, attempts)
                .ok_or(CoordinatorError::RoomIdsExhausted(attempts))?;

            let handle = SessionHandle {
                room_id,
                key: Ulid::new(),
                commands: tx,
            };
            rooms.insert(room_id, handle.clone());
            handle
        };

        let session = Session::new(handle.room_id, quiz, host, &self.settings);
        tokio::spawn(actor::run(
            session,
            rx,
            Arc::clone(self),
            handle.key,
            self.settings.send_ticks,
        ));

        tracing::info!(
            "Created room {} ({})",
            handle.room_id,
            handle.room_id.grouped()
        );
        Ok(handle)
    }

    pub async fn lookup(&self, room_id: RoomId) -> Option<SessionHandle> {
        self.rooms.read().await.get(&room_id).cloned()
    }

    /// Remove a room and tell its session to shut down
    pub async fn destroy(&self, room_id: RoomId) -> bool {
        let removed = self.rooms.write().await.remove(&room_id);
        match removed {
            Some(handle) => {
                tracing::info!("Destroying room {}", room_id);
                if handle.send(SessionCommand::Shutdown).await.is_err() {
                    tracing::debug!("Room {} was already closed", room_id);
                }
                true
            }
            None => false,
        }
    }

    /// Called by a session actor on exit. Only removes the entry if it still
    /// belongs to that session.
    pub async fn release(&self, room_id: RoomId, key: Ulid) {
        let mut rooms = self.rooms.write().await;
        if rooms.get(&room_id).is_some_and(|h| h.key == key) {
            rooms.remove(&room_id);
            tracing::debug!("Released room {}", room_id);
        }
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    /// Drop entries whose actor is gone, returns how many were removed
    pub async fn reap_closed(&self) -> usize {
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();
        rooms.retain(|_, handle| !handle.is_closed());
        before - rooms.len()
    }
}

/// Draw random six-digit ids until one is free
fn pick_room_id<R: Rng>(
    rng: &mut R,
    taken: &HashMap<RoomId, SessionHandle>,
    attempts: u32,
) -> Option<RoomId> {
    (0..attempts)
        .map(|_| RoomId(rng.random_range(RoomId::MIN..=RoomId::MAX)))
        .find(|id| !taken.contains_key(id))
}

/// Spawn a background task that periodically removes dead rooms
pub fn spawn_reaper(registry: Arc<RoomRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // first tick fires immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let reaped = registry.reap_closed().await;
            if reaped > 0 {
                tracing::info!("Reaped {} dead room(s)", reaped);
            }
        }
    })
}
