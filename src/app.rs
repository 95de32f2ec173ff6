use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::info;

use crate::auth::CredentialVerifier;
use crate::config::AppConfig;
use crate::domain::snapshot::SnapshotWriter;
use crate::domain::store::DomainStore;
use crate::metrics::counters::Counters;
use crate::session::model::Outbound;
use crate::session::registry::SessionRegistry;

/// Shared server state.
///
/// Lock order: `data` before `sessions`, at every call site that needs both.
/// Neither lock is ever held across an `.await`; socket writes happen only in
/// per-connection writer tasks fed through the registry's channels.
pub struct App {
    pub cfg: AppConfig,
    pub data: Mutex<DomainStore>,
    pub sessions: Mutex<SessionRegistry>,
    pub snapshots: SnapshotWriter,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub counters: Counters,
}

impl App {
    pub fn new(
        cfg: AppConfig,
        store: DomainStore,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Arc<Self> {
        let snapshots = SnapshotWriter::new(cfg.data_dir.clone());
        Arc::new(Self {
            cfg,
            data: Mutex::new(store),
            sessions: Mutex::new(SessionRegistry::new()),
            snapshots,
            verifier,
            counters: Counters::default(),
        })
    }

    /// Persists a point-in-time copy of the domain state. Called after every
    /// mutating operation; the copy is taken under a short `data` lock and
    /// written with no lock held.
    pub async fn persist(&self) -> Result<()> {
        let state = self.data.lock().clone_state();
        self.snapshots.save(state).await
    }

    /// Stops serving: closes every outbound channel and flushes a final
    /// snapshot.
    pub async fn shutdown(&self) {
        {
            let sessions = self.sessions.lock();
            for s in sessions.all_sessions(None) {
                if let Some(tx) = sessions.sender(&s.conn) {
                    let _ = tx.send(Outbound::Close);
                }
            }
        }

        if let Err(e) = self.persist().await {
            tracing::error!(error = ?e, "final snapshot failed");
        } else {
            info!("final snapshot flushed");
        }
    }
}
