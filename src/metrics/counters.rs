use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub conns_accepted: Arc<AtomicU64>,
    pub conns_rejected: Arc<AtomicU64>,
    pub frames_in: Arc<AtomicU64>,

    pub forced_logouts: Arc<AtomicU64>,
    pub bids_accepted: Arc<AtomicU64>,
    pub bids_rejected: Arc<AtomicU64>,
    pub buy_nows: Arc<AtomicU64>,

    pub auctions_closed: Arc<AtomicU64>,
    pub rooms_closed: Arc<AtomicU64>,
    pub snapshot_failures: Arc<AtomicU64>,
}
