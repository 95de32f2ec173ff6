//! Room lifecycle and membership.
//!
//! Rooms scope auction visibility and broadcast. A user occupies at most one
//! room at a time; the creator is joined atomically with creation. Membership
//! counts and session room pointers move together under the `data` +
//! `sessions` locks so the participant invariant holds at every observation
//! point.

use tracing::info;

use crate::domain::model::{Room, RoomStatus};
use crate::domain::store::DomainStore;
use crate::error::CommandError;
use crate::protocol::event::Event;
use crate::protocol::reply::{Reply, RoomRecord};
use crate::server::broadcaster;
use crate::session::model::Session;
use crate::session::registry::SessionRegistry;

/// Creates a room and joins the creator to it. Pushes `NEW_ROOM` to every
/// other live session.
pub fn create_room(
    data: &mut DomainStore,
    sessions: &mut SessionRegistry,
    sess: &Session,
    name: &str,
    description: &str,
    max_participants: u32,
    duration_min: u64,
    now: i64,
) -> Result<(u32, String), CommandError> {
    if sess.in_room() {
        return Err(CommandError::AlreadyInRoom);
    }
    if max_participants == 0 || duration_min == 0 {
        return Err(CommandError::InvalidNumber);
    }
    let taken = data
        .rooms()
        .any(|r| r.status != RoomStatus::Ended && r.name == name);
    if taken {
        return Err(CommandError::RoomNameTaken);
    }

    let room_id = data.append_room(Room {
        room_id: 0,
        name: name.to_string(),
        description: description.to_string(),
        max_participants,
        current_participants: 0,
        status: RoomStatus::Waiting,
        start_time: now,
        end_time: now + duration_min as i64 * 60,
        creator_uid: sess.uid,
        total_auctions: 0,
    })?;

    // Creator joins atomically with creation; this observes waiting -> active.
    join_room(data, sessions, sess, room_id)?;

    broadcaster::to_all(
        sessions,
        Some(sess.conn),
        &Event::NewRoom {
            id: room_id,
            name: name.to_string(),
            creator: sess.username.clone(),
            max: max_participants,
        },
    );

    info!(room_id, creator = %sess.username, "room created");
    Ok((room_id, name.to_string()))
}

/// Adds the session to a room. Pushes `USER_JOINED` to the other members.
pub fn join_room(
    data: &mut DomainStore,
    sessions: &mut SessionRegistry,
    sess: &Session,
    room_id: u32,
) -> Result<(u32, String), CommandError> {
    if sess.in_room() {
        return Err(CommandError::AlreadyInRoom);
    }

    let name = {
        let room = data.find_room_mut(room_id).ok_or(CommandError::RoomNotFound)?;
        if room.status == RoomStatus::Ended {
            return Err(CommandError::RoomEnded);
        }
        if room.is_full() {
            return Err(CommandError::RoomFull);
        }
        room.current_participants += 1;
        if room.status == RoomStatus::Waiting {
            room.status = RoomStatus::Active;
        }
        room.name.clone()
    };

    sessions.set_room(&sess.conn, room_id);

    broadcaster::to_room(
        sessions,
        room_id,
        Some(sess.conn),
        &Event::UserJoined {
            username: sess.username.clone(),
            room_id,
        },
    );

    Ok((room_id, name))
}

/// Removes the session from its current room. Pushes `USER_LEFT` to the
/// remaining members. Also runs implicitly on disconnect and force-logout.
pub fn leave_room(
    data: &mut DomainStore,
    sessions: &mut SessionRegistry,
    sess: &Session,
) -> Result<u32, CommandError> {
    if !sess.in_room() {
        return Err(CommandError::NotInRoom);
    }
    let room_id = sess.current_room_id;

    if let Some(room) = data.find_room_mut(room_id) {
        room.current_participants = room.current_participants.saturating_sub(1);
    }

    sessions.set_room(&sess.conn, 0);

    broadcaster::to_room(
        sessions,
        room_id,
        Some(sess.conn),
        &Event::UserLeft {
            username: sess.username.clone(),
            room_id,
        },
    );

    Ok(room_id)
}

/// Rooms that have not ended, in id order.
pub fn list_rooms(data: &DomainStore, now: i64) -> Reply {
    let records = data
        .rooms()
        .filter(|r| r.status != RoomStatus::Ended)
        .map(|r| RoomRecord {
            id: r.room_id,
            name: r.name.clone(),
            description: r.description.clone(),
            current: r.current_participants,
            max: r.max_participants,
            status: r.status,
            time_left: r.time_left(now),
            auctions: r.total_auctions,
        })
        .collect();
    Reply::RoomList(records)
}

/// Detail for any room, ended ones included (ids are retained for history).
pub fn room_detail(data: &DomainStore, room_id: u32, now: i64) -> Result<Reply, CommandError> {
    let room = data.find_room(room_id).ok_or(CommandError::RoomNotFound)?;
    Ok(Reply::RoomDetail {
        id: room.room_id,
        name: room.name.clone(),
        description: room.description.clone(),
        creator: data.username_of(room.creator_uid),
        current: room.current_participants,
        max: room.max_participants,
        status: room.status,
        time_left: room.time_left(now),
        auctions: room.total_auctions,
    })
}

pub fn my_room(data: &DomainStore, sess: &Session) -> Reply {
    match data.find_room(sess.current_room_id) {
        Some(room) if sess.in_room() => Reply::MyRoom {
            id: room.room_id,
            name: room.name.clone(),
            participants: room.current_participants,
            auctions: room.total_auctions,
        },
        _ => Reply::MyRoomNone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{User, UserStatus};
    use crate::domain::money::Money;
    use crate::domain::store::Limits;
    use crate::session::model::{ConnId, Outbound};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn mk_store() -> DomainStore {
        DomainStore::new(Limits::default())
    }

    fn add_user(data: &mut DomainStore, name: &str) -> u32 {
        data.append_user(User {
            uid: 0,
            username: name.into(),
            email: format!("{name}@x"),
            credential: "pw".into(),
            balance: Money::from_cents(100_000_000),
            status: UserStatus::Active,
            created_at: 0,
        })
        .unwrap()
    }

    fn attach(
        reg: &mut SessionRegistry,
        uid: u32,
        name: &str,
    ) -> (Session, mpsc::UnboundedReceiver<Outbound>) {
        let conn: ConnId = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        reg.register_sender(conn, tx);
        let sess = Session {
            conn,
            uid,
            username: name.into(),
            login_time: 0,
            current_room_id: 0,
        };
        reg.attach(sess.clone());
        (sess, rx)
    }

    fn frames(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(Outbound::Frame(f)) = rx.try_recv() {
            out.push(f);
        }
        out
    }

    #[test]
    fn create_room_auto_joins_the_creator() {
        let mut data = mk_store();
        let mut reg = SessionRegistry::new();
        let uid = add_user(&mut data, "alice");
        let (sess, _rx) = attach(&mut reg, uid, "alice");

        let (room_id, name) =
            create_room(&mut data, &mut reg, &sess, "Vintage", "Old stuff", 5, 60, 1_000).unwrap();
        assert_eq!((room_id, name.as_str()), (1, "Vintage"));

        let room = data.find_room(1).unwrap();
        assert_eq!(room.status, RoomStatus::Active);
        assert_eq!(room.current_participants, 1);
        assert_eq!(room.end_time, 1_000 + 3_600);
        assert_eq!(
            reg.session_for_uid(uid).unwrap().current_room_id,
            room_id
        );
    }

    #[test]
    fn create_room_rejects_duplicate_live_names() {
        let mut data = mk_store();
        let mut reg = SessionRegistry::new();
        let alice = add_user(&mut data, "alice");
        let bob = add_user(&mut data, "bob");
        let (a, _arx) = attach(&mut reg, alice, "alice");
        let (b, _brx) = attach(&mut reg, bob, "bob");

        create_room(&mut data, &mut reg, &a, "Vintage", "d", 5, 60, 0).unwrap();
        let err = create_room(&mut data, &mut reg, &b, "Vintage", "d", 5, 60, 0).unwrap_err();
        assert_eq!(err, CommandError::RoomNameTaken);
    }

    #[test]
    fn join_notifies_existing_members_and_counts_them() {
        let mut data = mk_store();
        let mut reg = SessionRegistry::new();
        let alice = add_user(&mut data, "alice");
        let bob = add_user(&mut data, "bob");
        let (a, mut arx) = attach(&mut reg, alice, "alice");
        let (b, _brx) = attach(&mut reg, bob, "bob");

        create_room(&mut data, &mut reg, &a, "Vintage", "d", 5, 60, 0).unwrap();
        let _ = frames(&mut arx);

        join_room(&mut data, &mut reg, &b, 1).unwrap();

        assert_eq!(data.find_room(1).unwrap().current_participants, 2);
        assert_eq!(frames(&mut arx), vec!["USER_JOINED|bob|1".to_string()]);
    }

    #[test]
    fn join_rejects_full_ended_and_double_membership() {
        let mut data = mk_store();
        let mut reg = SessionRegistry::new();
        let alice = add_user(&mut data, "alice");
        let bob = add_user(&mut data, "bob");
        let carol = add_user(&mut data, "carol");
        let (a, _arx) = attach(&mut reg, alice, "alice");
        let (b, _brx) = attach(&mut reg, bob, "bob");
        let (c, _crx) = attach(&mut reg, carol, "carol");

        create_room(&mut data, &mut reg, &a, "Tiny", "d", 1, 60, 0).unwrap();

        assert_eq!(
            join_room(&mut data, &mut reg, &b, 1).unwrap_err(),
            CommandError::RoomFull
        );
        assert_eq!(
            join_room(&mut data, &mut reg, &b, 9).unwrap_err(),
            CommandError::RoomNotFound
        );

        create_room(&mut data, &mut reg, &b, "Other", "d", 5, 60, 0).unwrap();
        let b_in_room = reg.session_for_uid(bob).unwrap().clone();
        assert_eq!(
            join_room(&mut data, &mut reg, &b_in_room, 1).unwrap_err(),
            CommandError::AlreadyInRoom
        );

        data.find_room_mut(1).unwrap().status = RoomStatus::Ended;
        assert_eq!(
            join_room(&mut data, &mut reg, &c, 1).unwrap_err(),
            CommandError::RoomEnded
        );
    }

    #[test]
    fn leave_decrements_and_notifies() {
        let mut data = mk_store();
        let mut reg = SessionRegistry::new();
        let alice = add_user(&mut data, "alice");
        let bob = add_user(&mut data, "bob");
        let (a, mut arx) = attach(&mut reg, alice, "alice");
        let (b, _brx) = attach(&mut reg, bob, "bob");

        create_room(&mut data, &mut reg, &a, "Vintage", "d", 5, 60, 0).unwrap();
        join_room(&mut data, &mut reg, &b, 1).unwrap();
        let _ = frames(&mut arx);

        let b_in_room = reg.session_for_uid(bob).unwrap().clone();
        leave_room(&mut data, &mut reg, &b_in_room).unwrap();

        assert_eq!(data.find_room(1).unwrap().current_participants, 1);
        assert_eq!(reg.session_for_uid(bob).unwrap().current_room_id, 0);
        assert_eq!(frames(&mut arx), vec!["USER_LEFT|bob|1".to_string()]);

        let b_out = reg.session_for_uid(bob).unwrap().clone();
        assert_eq!(
            leave_room(&mut data, &mut reg, &b_out).unwrap_err(),
            CommandError::NotInRoom
        );
    }

    #[test]
    fn list_rooms_skips_ended_rooms() {
        let mut data = mk_store();
        let mut reg = SessionRegistry::new();
        let alice = add_user(&mut data, "alice");
        let (a, _arx) = attach(&mut reg, alice, "alice");

        create_room(&mut data, &mut reg, &a, "Vintage", "d", 5, 60, 0).unwrap();
        data.find_room_mut(1).unwrap().status = RoomStatus::Ended;

        match list_rooms(&data, 0) {
            Reply::RoomList(records) => assert!(records.is_empty()),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn my_room_reports_the_sentinel_when_roomless() {
        let data = mk_store();
        let sess = Session {
            conn: Uuid::new_v4(),
            uid: 1,
            username: "alice".into(),
            login_time: 0,
            current_room_id: 0,
        };
        assert_eq!(my_room(&data, &sess).to_string(), "MY_ROOM|0|Not in any room|0|0");
    }
}
