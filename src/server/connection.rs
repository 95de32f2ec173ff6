//! Per-connection worker pair.
//!
//! Each accepted socket gets a reader task (this function) and a writer task
//! fed by an unbounded channel. The reader parses line frames and drives the
//! dispatcher; the writer is the only place the socket is written, so slow
//! clients never stall a lock holder. Reader EOF or error triggers orderly
//! detach: auto-leave, `USER_LEFT` to the room, snapshot.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::app::App;
use crate::engine::rooms;
use crate::protocol::MAX_FRAME_BYTES;
use crate::server::dispatcher::{self, Action};
use crate::session::model::{ConnId, Outbound, OutboundReceiver};

pub async fn serve(app: Arc<App>, stream: TcpStream, peer: SocketAddr) {
    let conn: ConnId = Uuid::new_v4();
    info!(conn_id = %conn, %peer, "connection opened");

    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    app.sessions.lock().register_sender(conn, tx.clone());

    let writer = tokio::spawn(write_loop(write_half, rx));

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if line.len() > MAX_FRAME_BYTES {
                    // Oversized frames get the generic rejection; the
                    // connection itself stays up.
                    if tx
                        .send(Outbound::Frame("ERROR|Frame too large".to_string()))
                        .is_err()
                    {
                        break;
                    }
                    continue;
                }
                match dispatcher::handle_line(&app, conn, &line).await {
                    Action::Reply(frame) => {
                        if tx.send(Outbound::Frame(frame)).is_err() {
                            break;
                        }
                    }
                    Action::Close => break,
                }
            }
            Err(e) => {
                debug!(conn_id = %conn, error = %e, "read failed");
                break;
            }
        }
    }

    detach(&app, conn).await;
    let _ = tx.send(Outbound::Close);
    let _ = writer.await;
    info!(conn_id = %conn, %peer, "connection closed");
}

/// Drains the outbound channel onto the socket. `Close` (or the last sender
/// going away) shuts the write side down, which also signals the peer.
async fn write_loop(mut write_half: OwnedWriteHalf, mut rx: OutboundReceiver) {
    while let Some(out) = rx.recv().await {
        match out {
            Outbound::Frame(mut frame) => {
                frame.push('\n');
                if write_half.write_all(frame.as_bytes()).await.is_err() {
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = write_half.shutdown().await;
}

/// Orderly teardown of whatever state the connection still holds. Idempotent:
/// a force-logged-out connection has no session left by the time its reader
/// exits.
async fn detach(app: &Arc<App>, conn: ConnId) {
    let left_room = {
        let mut data = app.data.lock();
        let mut sessions = app.sessions.lock();

        let left_room = match sessions.session_for_conn(&conn).cloned() {
            Some(sess) if sess.in_room() => {
                let _ = rooms::leave_room(&mut data, &mut sessions, &sess);
                true
            }
            _ => false,
        };

        sessions.remove(&conn);
        sessions.remove_sender(&conn);
        left_room
    };

    if left_room {
        if let Err(e) = app.persist().await {
            error!(error = ?e, "snapshot after disconnect failed");
        }
    }
}
