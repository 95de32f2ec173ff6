//! Command routing.
//!
//! Parses one frame, enforces the per-command preconditions (session
//! required, uid must match the session, room membership), hands off to the
//! engines, and persists after every mutating operation. Validation failures
//! answer with a `<CMD>_FAIL` frame and never tear down the connection.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, error, instrument};

use crate::app::App;
use crate::domain::model::{MAX_USERNAME_LEN, User, UserStatus};
use crate::engine::{auctions, rooms};
use crate::error::CommandError;
use crate::protocol::event::Event;
use crate::protocol::reply::Reply;
use crate::protocol::request::{self, FrameError, Request};
use crate::server::broadcaster;
use crate::session::model::{ConnId, Session};
use crate::session::registry::SessionRegistry;
use crate::time::now_ts;

/// What the reader loop does after one frame.
#[derive(Debug)]
pub enum Action {
    Reply(String),
    Close,
}

#[instrument(skip(app, raw), target = "dispatcher", fields(conn_id = %conn))]
pub async fn handle_line(app: &Arc<App>, conn: ConnId, raw: &str) -> Action {
    app.counters.frames_in.fetch_add(1, Ordering::Relaxed);

    let req = match request::parse(raw) {
        Ok(r) => r,
        Err(FrameError::InvalidNumber { cmd }) => {
            return Action::Reply(
                Reply::Fail {
                    prefix: cmd,
                    reason: CommandError::InvalidNumber.to_string(),
                }
                .to_string(),
            );
        }
        Err(FrameError::UnknownCommand) => {
            return Action::Reply(
                Reply::Error {
                    reason: "Unknown command",
                }
                .to_string(),
            );
        }
        Err(FrameError::Parse) => {
            return Action::Reply(Reply::Error { reason: "Parse" }.to_string());
        }
        Err(FrameError::TooLarge) => {
            return Action::Reply(
                Reply::Error {
                    reason: "Frame too large",
                }
                .to_string(),
            );
        }
    };

    let prefix = req.reply_prefix();
    match dispatch(app, conn, req).await {
        Ok(Some(reply)) => Action::Reply(reply.to_string()),
        Ok(None) => Action::Close,
        Err(e) => {
            debug!(prefix, reason = %e, "command failed");
            Action::Reply(
                Reply::Fail {
                    prefix,
                    reason: e.to_string(),
                }
                .to_string(),
            )
        }
    }
}

/// Resolves the caller's session and cross-checks the uid the payload
/// carries (`Request::embedded_uid`). The uid in a request is never trusted
/// on its own.
fn require_session(
    sessions: &SessionRegistry,
    conn: ConnId,
    embedded_uid: Option<u32>,
) -> Result<Session, CommandError> {
    let sess = sessions
        .session_for_conn(&conn)
        .cloned()
        .ok_or(CommandError::NotLoggedIn)?;
    if let Some(uid) = embedded_uid {
        if uid != sess.uid {
            return Err(CommandError::SessionMismatch);
        }
    }
    Ok(sess)
}

/// Snapshot after a mutating command; failure is surfaced as `Internal`
/// while the in-memory state stands.
async fn persist(app: &App) -> Result<(), CommandError> {
    app.persist().await.map_err(|e| {
        app.counters
            .snapshot_failures
            .fetch_add(1, Ordering::Relaxed);
        error!(error = ?e, "snapshot after command failed");
        CommandError::Internal
    })
}

/// `Ok(None)` means close the connection without a reply (QUIT).
async fn dispatch(
    app: &Arc<App>,
    conn: ConnId,
    req: Request,
) -> Result<Option<Reply>, CommandError> {
    let now = now_ts();
    let embedded_uid = req.embedded_uid();

    match req {
        Request::Register {
            username,
            password,
            email,
        } => register(app, username, password, email, now).await.map(Some),

        Request::Login { username, password } => {
            login(app, conn, username, password, now).await.map(Some)
        }

        Request::Quit => Ok(None),

        Request::CreateRoom {
            name,
            description,
            max_participants,
            duration_min,
            ..
        } => {
            let (room_id, name) = {
                let mut data = app.data.lock();
                let mut sessions = app.sessions.lock();
                let sess = require_session(&sessions, conn, embedded_uid)?;
                rooms::create_room(
                    &mut data,
                    &mut sessions,
                    &sess,
                    &name,
                    &description,
                    max_participants,
                    duration_min,
                    now,
                )?
            };
            persist(app).await?;
            Ok(Some(Reply::CreateRoomSuccess { room_id, name }))
        }

        Request::ListRooms => {
            let data = app.data.lock();
            let sessions = app.sessions.lock();
            require_session(&sessions, conn, embedded_uid)?;
            Ok(Some(rooms::list_rooms(&data, now)))
        }

        Request::JoinRoom { room_id, .. } => {
            let (room_id, name) = {
                let mut data = app.data.lock();
                let mut sessions = app.sessions.lock();
                let sess = require_session(&sessions, conn, embedded_uid)?;
                rooms::join_room(&mut data, &mut sessions, &sess, room_id)?
            };
            persist(app).await?;
            Ok(Some(Reply::JoinRoomSuccess { room_id, name }))
        }

        Request::LeaveRoom { .. } => {
            {
                let mut data = app.data.lock();
                let mut sessions = app.sessions.lock();
                let sess = require_session(&sessions, conn, embedded_uid)?;
                rooms::leave_room(&mut data, &mut sessions, &sess)?;
            }
            persist(app).await?;
            Ok(Some(Reply::LeaveRoomSuccess))
        }

        Request::RoomDetail { room_id } => {
            let data = app.data.lock();
            let sessions = app.sessions.lock();
            require_session(&sessions, conn, embedded_uid)?;
            rooms::room_detail(&data, room_id, now).map(Some)
        }

        Request::MyRoom { .. } => {
            let data = app.data.lock();
            let sessions = app.sessions.lock();
            let sess = require_session(&sessions, conn, embedded_uid)?;
            Ok(Some(rooms::my_room(&data, &sess)))
        }

        Request::ListAuctions { .. } => {
            let data = app.data.lock();
            let sessions = app.sessions.lock();
            let sess = require_session(&sessions, conn, embedded_uid)?;
            if !sess.in_room() {
                return Err(CommandError::NotInRoom);
            }
            Ok(Some(auctions::list_auctions(&data, sess.current_room_id, now)))
        }

        Request::MyAuctions { .. } => {
            let data = app.data.lock();
            let sessions = app.sessions.lock();
            let sess = require_session(&sessions, conn, embedded_uid)?;
            Ok(Some(auctions::my_auctions(&data, sess.uid, now)))
        }

        Request::AuctionDetail { auction_id, .. } => {
            let data = app.data.lock();
            let sessions = app.sessions.lock();
            let sess = require_session(&sessions, conn, embedded_uid)?;
            auctions::auction_detail(&data, &sess, auction_id, now).map(Some)
        }

        Request::CreateAuction {
            room_id,
            title,
            description,
            start_price,
            buy_now_price,
            min_increment,
            duration_min,
            ..
        } => {
            let (auction_id, title) = {
                let mut data = app.data.lock();
                let sessions = app.sessions.lock();
                let sess = require_session(&sessions, conn, embedded_uid)?;
                auctions::create_auction(
                    &mut data,
                    &sessions,
                    &sess,
                    room_id,
                    &title,
                    &description,
                    start_price,
                    buy_now_price,
                    min_increment,
                    duration_min,
                    now,
                )?
            };
            persist(app).await?;
            Ok(Some(Reply::CreateAuctionSuccess { auction_id, title }))
        }

        Request::PlaceBid {
            auction_id, amount, ..
        } => {
            let accepted = {
                let mut data = app.data.lock();
                let sessions = app.sessions.lock();
                let sess = require_session(&sessions, conn, embedded_uid)?;
                auctions::place_bid(
                    &mut data,
                    &sessions,
                    &sess,
                    auction_id,
                    amount,
                    now,
                    app.cfg.snipe_window_secs,
                )
            };

            match accepted {
                Ok(bid) => {
                    app.counters.bids_accepted.fetch_add(1, Ordering::Relaxed);
                    persist(app).await?;
                    Ok(Some(Reply::BidSuccess {
                        auction_id: bid.auction_id,
                        amount: bid.amount,
                        total_bids: bid.total_bids,
                        time_left: bid.time_left,
                    }))
                }
                Err(e) => {
                    app.counters.bids_rejected.fetch_add(1, Ordering::Relaxed);
                    Err(e)
                }
            }
        }

        Request::BuyNow { auction_id, .. } => {
            let auction_id = {
                let mut data = app.data.lock();
                let sessions = app.sessions.lock();
                let sess = require_session(&sessions, conn, embedded_uid)?;
                auctions::buy_now(&mut data, &sessions, &sess, auction_id, now)?
            };
            app.counters.buy_nows.fetch_add(1, Ordering::Relaxed);
            persist(app).await?;
            Ok(Some(Reply::BuyNowSuccess { auction_id }))
        }

        Request::BidHistory { auction_id, .. } => {
            let data = app.data.lock();
            let sessions = app.sessions.lock();
            let sess = require_session(&sessions, conn, embedded_uid)?;
            auctions::bid_history(&data, &sess, auction_id).map(Some)
        }

        Request::AuctionHistory { .. } => {
            let data = app.data.lock();
            let sessions = app.sessions.lock();
            let sess = require_session(&sessions, conn, embedded_uid)?;
            Ok(Some(auctions::auction_history(&data, sess.uid)))
        }
    }
}

async fn register(
    app: &Arc<App>,
    username: String,
    password: String,
    email: String,
    now: i64,
) -> Result<Reply, CommandError> {
    if username.len() > MAX_USERNAME_LEN {
        return Err(CommandError::UsernameTooLong);
    }

    let uid = {
        let mut data = app.data.lock();
        if data.find_user_by_name(&username).is_some() {
            return Err(CommandError::UsernameTaken);
        }
        let credential = app.verifier.enroll(&password);
        data.append_user(User {
            uid: 0,
            username: username.clone(),
            email,
            credential,
            balance: app.cfg.starting_balance,
            status: UserStatus::Active,
            created_at: now,
        })?
    };

    persist(app).await?;
    Ok(Reply::RegisterSuccess { uid, username })
}

async fn login(
    app: &Arc<App>,
    conn: ConnId,
    username: String,
    password: String,
    now: i64,
) -> Result<Reply, CommandError> {
    {
        let sessions = app.sessions.lock();
        if sessions.session_for_conn(&conn).is_some() {
            return Err(CommandError::AlreadyLoggedIn);
        }
    }

    let (uid, stored, status) = {
        let data = app.data.lock();
        let u = data
            .find_user_by_name(&username)
            .ok_or(CommandError::UserNotFound)?;
        (u.uid, u.credential.clone(), u.status)
    };
    if status == UserStatus::Disabled {
        return Err(CommandError::AccountDisabled);
    }
    if !app.verifier.verify(&stored, &password).await {
        return Err(CommandError::WrongPassword);
    }

    let (balance, displaced_left_room) = {
        let mut data = app.data.lock();
        let mut sessions = app.sessions.lock();

        // Single-session rule: the prior login is pushed out before the new
        // session appears, so no observer ever sees two sessions per uid.
        let mut displaced_left_room = false;
        if let Some(old) = sessions.session_for_uid(uid).cloned() {
            app.counters.forced_logouts.fetch_add(1, Ordering::Relaxed);
            broadcaster::to_session(
                &sessions,
                old.conn,
                &Event::ForceLogout {
                    reason: "Another login detected",
                },
            );
            sessions.push_close(&old.conn);
            if old.in_room() {
                let _ = rooms::leave_room(&mut data, &mut sessions, &old);
                displaced_left_room = true;
            }
            sessions.remove(&old.conn);
        }

        sessions.attach(Session {
            conn,
            uid,
            username: username.clone(),
            login_time: now,
            current_room_id: 0,
        });

        let balance = data.find_user(uid).ok_or(CommandError::UserNotFound)?.balance;
        (balance, displaced_left_room)
    };

    if displaced_left_room {
        persist(app).await?;
    }

    Ok(Reply::LoginSuccess {
        uid,
        username,
        balance,
    })
}
