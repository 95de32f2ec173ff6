//! Listener loop: accepts sockets, enforces the connection cap, and spawns
//! one worker pair per connection.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Result;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::app::App;
use crate::server::connection;

pub async fn run(app: Arc<App>, listener: TcpListener) -> Result<()> {
    info!(addr = %listener.local_addr()?, "accepting connections");

    loop {
        let (mut stream, peer) = listener.accept().await?;

        if app.sessions.lock().connection_count() >= app.cfg.max_connections {
            app.counters.conns_rejected.fetch_add(1, Ordering::Relaxed);
            warn!(%peer, "connection cap reached; rejecting");
            let _ = stream.write_all(b"ERROR|Server full\n").await;
            continue;
        }

        app.counters.conns_accepted.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(connection::serve(app.clone(), stream, peer));
    }
}
