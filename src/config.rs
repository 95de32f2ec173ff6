use std::path::PathBuf;
use std::time::Duration;

use crate::domain::money::Money;
use crate::domain::store::Limits;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// TCP listen address.
    pub bind_addr: String,

    /// Directory holding the snapshot files (`users.dat`, `rooms.dat`,
    /// `auctions.dat`, `bids.dat`).
    pub data_dir: PathBuf,

    /// Maximum simultaneous connections. Connections accepted beyond this
    /// are told `ERROR|Server full` and closed immediately.
    pub max_connections: usize,

    /// Capacity limits for the domain collections. Appends beyond a limit
    /// fail with `Database full`.
    pub limits: Limits,

    /// Balance granted to every newly registered account.
    pub starting_balance: Money,

    /// Cadence of the lifecycle sweeper (auction/room closure, warnings).
    pub sweep_interval: Duration,

    /// Anti-snipe window in seconds. A bid accepted with less than this much
    /// time remaining pushes the auction end out to now + window.
    pub snipe_window_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("GAVEL_ADDR").unwrap_or_else(|_| "0.0.0.0:8888".to_string());
        let data_dir = std::env::var("GAVEL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        Self {
            bind_addr,
            data_dir,
            max_connections: 100,
            limits: Limits::default(),
            starting_balance: Money::from_cents(100_000_000),
            sweep_interval: Duration::from_secs(5),
            snipe_window_secs: 30,
        }
    }
}
