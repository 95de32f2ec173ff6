use std::collections::HashMap;

use tracing::debug;

use crate::session::model::{ConnId, Outbound, OutboundSender, Session};

/// Table of live connections and their authenticated sessions.
///
/// Owns each connection's outbound sender (registered at accept time) and
/// enforces at-most-one session per uid: attaching over an existing uid
/// returns the displaced session so the caller can finish force-logout
/// handling (the displaced frame/close must already have been pushed).
///
/// Guarded by the `sessions` lock in [`crate::app::App`]; when the `data`
/// lock is also needed it is always taken first.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnId, Session>,
    by_uid: HashMap<u32, ConnId>,
    senders: HashMap<ConnId, OutboundSender>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- connection senders ----

    pub fn register_sender(&mut self, conn: ConnId, tx: OutboundSender) {
        self.senders.insert(conn, tx);
    }

    pub fn remove_sender(&mut self, conn: &ConnId) {
        self.senders.remove(conn);
    }

    pub fn sender(&self, conn: &ConnId) -> Option<&OutboundSender> {
        self.senders.get(conn)
    }

    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }

    /// Pushes one frame to a connection. A gone receiver is not an error;
    /// the writer task's teardown handles the disconnect.
    pub fn push(&self, conn: &ConnId, frame: String) {
        if let Some(tx) = self.senders.get(conn) {
            if tx.send(Outbound::Frame(frame)).is_err() {
                debug!(conn_id = %conn, "outbound channel closed; frame dropped");
            }
        }
    }

    /// Schedules a connection's socket for shutdown.
    pub fn push_close(&self, conn: &ConnId) {
        if let Some(tx) = self.senders.get(conn) {
            let _ = tx.send(Outbound::Close);
        }
    }

    // ---- sessions ----

    pub fn session_for_conn(&self, conn: &ConnId) -> Option<&Session> {
        self.sessions.get(conn)
    }

    pub fn session_for_uid(&self, uid: u32) -> Option<&Session> {
        self.by_uid.get(&uid).and_then(|c| self.sessions.get(c))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Inserts the session for a freshly authenticated connection. Any prior
    /// session for the uid must have been removed first (see `remove`); a
    /// leftover here would break the single-session invariant.
    pub fn attach(&mut self, session: Session) {
        debug_assert!(
            !self.by_uid.contains_key(&session.uid),
            "attach over a live session for uid {}",
            session.uid
        );
        self.by_uid.insert(session.uid, session.conn);
        self.sessions.insert(session.conn, session);
    }

    /// Removes a connection's session, returning it. Idempotent.
    pub fn remove(&mut self, conn: &ConnId) -> Option<Session> {
        let session = self.sessions.remove(conn)?;
        self.by_uid.remove(&session.uid);
        Some(session)
    }

    pub fn set_room(&mut self, conn: &ConnId, room_id: u32) {
        if let Some(s) = self.sessions.get_mut(conn) {
            s.current_room_id = room_id;
        }
    }

    /// Live sessions currently in `room_id`, optionally excluding one
    /// connection (typically the actor who caused the notification).
    pub fn room_members(&self, room_id: u32, exclude: Option<ConnId>) -> Vec<&Session> {
        self.sessions
            .values()
            .filter(|s| s.current_room_id == room_id && Some(s.conn) != exclude)
            .collect()
    }

    pub fn all_sessions(&self, exclude: Option<ConnId>) -> Vec<&Session> {
        self.sessions
            .values()
            .filter(|s| Some(s.conn) != exclude)
            .collect()
    }
}
