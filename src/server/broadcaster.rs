use tracing::trace;

use crate::protocol::event::Event;
use crate::session::model::ConnId;
use crate::session::registry::SessionRegistry;

/// Fan-out of push notifications.
///
/// Delivery enqueues onto per-connection channels and never blocks; the
/// actual socket write happens in each connection's writer task. Callers
/// enqueue inside the critical section that performed the mutation, so
/// room notifications preserve the acceptance order of the underlying bids.
pub fn to_room(reg: &SessionRegistry, room_id: u32, exclude: Option<ConnId>, event: &Event) {
    let frame = event.to_string();
    let mut delivered = 0usize;
    for member in reg.room_members(room_id, exclude) {
        reg.push(&member.conn, frame.clone());
        delivered += 1;
    }
    trace!(room_id, delivered, frame = %frame, "room broadcast");
}

pub fn to_all(reg: &SessionRegistry, exclude: Option<ConnId>, event: &Event) {
    let frame = event.to_string();
    for s in reg.all_sessions(exclude) {
        reg.push(&s.conn, frame.clone());
    }
}

pub fn to_session(reg: &SessionRegistry, conn: ConnId, event: &Event) {
    reg.push(&conn, event.to_string());
}
