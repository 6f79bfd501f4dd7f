use crate::error::JoinRejected;
use crate::protocol::Outbox;
use crate::types::{ConnectionId, Standing, Username};

#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub username: Username,
    pub points: u32,
    pub conn: ConnectionId,
    pub outbox: Outbox,
}

/// Joined players in join order
#[derive(Debug, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    max_username_len: usize,
}

impl Roster {
    pub fn new(max_username_len: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_username_len,
        }
    }

    /// Add a player, returning the username as stored (trimmed)
    pub fn join(
        &mut self,
        conn: ConnectionId,
        username: &str,
        outbox: Outbox,
    ) -> Result<Username, JoinRejected> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > self.max_username_len {
            return Err(JoinRejected::InvalidUsername);
        }
        if self.get(username).is_some() {
            return Err(JoinRejected::UsernameTaken);
        }
        if self.find_by_conn(&conn).is_some() {
            // a connection is bound to at most one roster entry
            return Err(JoinRejected::UsernameTaken);
        }

        self.entries.push(RosterEntry {
            username: username.to_string(),
            points: 0,
            conn,
            outbox,
        });
        Ok(username.to_string())
    }

    pub fn remove_by_conn(&mut self, conn: &str) -> Option<RosterEntry> {
        let index = self.entries.iter().position(|e| e.conn == conn)?;
        Some(self.entries.remove(index))
    }

    pub fn find_by_conn(&self, conn: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.conn == conn)
    }

    pub fn get(&self, username: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.username == username)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RosterEntry> {
        self.entries.iter_mut()
    }

    pub fn usernames(&self) -> impl Iterator<Item = Username> + '_ {
        self.entries.iter().map(|e| e.username.clone())
    }

    /// Standings by points descending, ties share a rank and are listed by name
    pub fn standings(&self) -> Vec<Standing> {
        let mut sorted: Vec<&RosterEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.username.cmp(&b.username))
        });

        let mut standings: Vec<Standing> = Vec::with_capacity(sorted.len());
        for (index, entry) in sorted.into_iter().enumerate() {
            let rank = match standings.last() {
                Some(prev) if prev.points == entry.points => prev.rank,
                _ => index + 1,
            };
            standings.push(Standing {
                rank,
                username: entry.username.clone(),
                points: entry.points,
            });
        }
        standings
    }
}
