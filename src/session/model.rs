use tokio::sync::mpsc;

pub type ConnId = uuid::Uuid;

/// One logged-in connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub conn: ConnId,
    pub uid: u32,
    pub username: String,
    pub login_time: i64,
    /// Zero when the session is not in a room.
    pub current_room_id: u32,
}

impl Session {
    pub fn in_room(&self) -> bool {
        self.current_room_id != 0
    }
}

/// Items consumed by a connection's writer task. `Frame` carries one wire
/// line without its trailing newline; `Close` shuts the socket down.
#[derive(Debug)]
pub enum Outbound {
    Frame(String),
    Close,
}

pub type OutboundSender = mpsc::UnboundedSender<Outbound>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;
