use crate::error::CoordinatorResult;
use crate::protocol::Outbox;
use crate::registry::SessionHandle;
use crate::session::SessionCommand;
use crate::types::{ConnectionId, Role, Username};

/// What a connection has turned into
#[derive(Debug)]
pub enum Binding {
    Unbound,
    Host(SessionHandle),
    Player {
        session: SessionHandle,
        username: Username,
    },
}

/// Per-socket state owned by the socket loop
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    binding: Binding,
    /// Kept until the connection binds. From then on the session holds the
    /// only sender, so the outbox closes when the session goes away.
    outbox: Option<Outbox>,
}

impl Connection {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            binding: Binding::Unbound,
            outbox: Some(outbox),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `None` while unbound
    pub fn role(&self) -> Option<Role> {
        match self.binding {
            Binding::Unbound => None,
            Binding::Host(_) => Some(Role::Host),
            Binding::Player { .. } => Some(Role::Player),
        }
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        match &self.binding {
            Binding::Unbound => None,
            Binding::Host(session) | Binding::Player { session, .. } => Some(session),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match &self.binding {
            Binding::Player { username, .. } => Some(username),
            _ => None,
        }
    }

    /// Outbox to hand to a session, only available while unbound
    pub fn outbox(&self) -> Option<&Outbox> {
        self.outbox.as_ref()
    }

    pub fn bind_host(&mut self, session: SessionHandle) {
        tracing::info!("{} is host of room {}", self.id, session.room_id());
        self.binding = Binding::Host(session);
        self.outbox = None;
    }

    pub fn bind_player(&mut self, session: SessionHandle, username: Username) {
        tracing::info!(
            "{} joined room {} as `{}`",
            self.id,
            session.room_id(),
            username
        );
        self.binding = Binding::Player { session, username };
        self.outbox = None;
    }

    /// Tell the session this connection is gone
    pub async fn disconnect(&mut self) -> CoordinatorResult<()> {
        match std::mem::replace(&mut self.binding, Binding::Unbound) {
            Binding::Unbound => Ok(()),
            Binding::Host(session) => session.send(SessionCommand::HostLeft).await,
            Binding::Player { session, .. } => {
                session
                    .send(SessionCommand::Leave {
                        conn: self.id.clone(),
                    })
                    .await
            }
        }
    }
}
