use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::domain::store::DomainState;

const USERS_FILE: &str = "users.dat";
const ROOMS_FILE: &str = "rooms.dat";
const AUCTIONS_FILE: &str = "auctions.dat";
const BIDS_FILE: &str = "bids.dat";

/// Durable snapshot of the domain collections: one JSON file per collection
/// under the data directory, each written to a sibling temp path and renamed
/// in place so readers see either the pre-op or the post-op state.
#[derive(Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Persists a point-in-time state copy. File I/O runs on the blocking
    /// pool; callers must not hold the domain lock across this await.
    pub async fn save(&self, state: DomainState) -> Result<()> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || write_state(&dir, &state))
            .await
            .context("snapshot worker panicked")?
    }
}

pub fn write_state(dir: &Path, state: &DomainState) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create snapshot dir {}", dir.display()))?;

    write_collection(dir, USERS_FILE, &state.users)?;
    write_collection(dir, ROOMS_FILE, &state.rooms)?;
    write_collection(dir, AUCTIONS_FILE, &state.auctions)?;
    write_collection(dir, BIDS_FILE, &state.bids)?;

    debug!(
        users = state.users.len(),
        rooms = state.rooms.len(),
        auctions = state.auctions.len(),
        bids = state.bids.len(),
        "snapshot written"
    );
    Ok(())
}

fn write_collection<T: Serialize>(dir: &Path, name: &str, items: &[T]) -> Result<()> {
    let bytes = serde_json::to_vec(items).with_context(|| format!("serialize {name}"))?;

    let tmp = dir.join(format!("{name}.tmp"));
    let dst = dir.join(name);

    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &dst).with_context(|| format!("rename into {}", dst.display()))?;
    Ok(())
}

/// Restores the persisted state, or an empty one when no snapshot exists yet.
pub fn load_state(dir: &Path) -> Result<DomainState> {
    if !dir.join(USERS_FILE).exists() {
        info!(dir = %dir.display(), "no snapshot found; starting fresh");
        return Ok(DomainState::default());
    }

    let state = DomainState {
        users: read_collection(dir, USERS_FILE)?,
        rooms: read_collection(dir, ROOMS_FILE)?,
        auctions: read_collection(dir, AUCTIONS_FILE)?,
        bids: read_collection(dir, BIDS_FILE)?,
    };

    info!(
        dir = %dir.display(),
        users = state.users.len(),
        rooms = state.rooms.len(),
        auctions = state.auctions.len(),
        bids = state.bids.len(),
        "snapshot restored"
    );
    Ok(state)
}

fn read_collection<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}
