//! Periodic lifecycle driver.
//!
//! Wakes on a fixed cadence and, under the domain lock, closes auctions past
//! their end time, emits the one-shot closing warning, and ends rooms whose
//! time has run out (force-leaving members and closing their remaining
//! auctions). Timing logic takes `now` as a parameter so it is testable
//! without a clock.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{error, info, instrument};

use crate::app::App;
use crate::domain::model::{AuctionStatus, RoomStatus};
use crate::domain::store::DomainStore;
use crate::engine::auctions::close_auction;
use crate::metrics::counters::Counters;
use crate::protocol::event::Event;
use crate::server::broadcaster;
use crate::session::registry::SessionRegistry;
use crate::time::now_ts;

/// Seconds before closure inside which the single `AUCTION_WARNING` fires.
/// Bounded below so one sweep cadence cannot emit it twice.
const WARN_UPPER_SECS: i64 = 30;
const WARN_LOWER_SECS: i64 = 25;

pub async fn run(app: Arc<App>) {
    let mut ticker = tokio::time::interval(app.cfg.sweep_interval);

    loop {
        ticker.tick().await;

        let changed = {
            let mut data = app.data.lock();
            let mut sessions = app.sessions.lock();
            tick(&mut data, &mut sessions, now_ts(), &app.counters)
        };

        if changed {
            if let Err(e) = app.persist().await {
                app.counters
                    .snapshot_failures
                    .fetch_add(1, Ordering::Relaxed);
                error!(error = ?e, "sweeper snapshot failed");
            }
        }
    }
}

/// One sweep pass. Returns whether domain state changed.
#[instrument(skip_all, target = "sweeper", fields(now))]
pub fn tick(
    data: &mut DomainStore,
    sessions: &mut SessionRegistry,
    now: i64,
    counters: &Counters,
) -> bool {
    let mut changed = false;

    // Auctions first: a room-close below must not re-close what we end here.
    for auction_id in data.auction_ids() {
        let (due, warn) = match data.find_auction(auction_id) {
            Some(a) if a.status == AuctionStatus::Active => {
                let left = a.end_time - now;
                (
                    now >= a.end_time,
                    left > WARN_LOWER_SECS && left <= WARN_UPPER_SECS && !a.warning_sent,
                )
            }
            _ => continue,
        };

        if due {
            if let Some(closed) = close_auction(data, auction_id) {
                counters.auctions_closed.fetch_add(1, Ordering::Relaxed);
                info!(
                    auction_id,
                    winner = %closed.winner,
                    final_price = %closed.final_price,
                    "auction closed by timer"
                );
                broadcaster::to_room(
                    sessions,
                    closed.room_id,
                    None,
                    &Event::AuctionEnded {
                        id: closed.auction_id,
                        title: closed.title,
                        winner: closed.winner,
                        final_price: closed.final_price,
                        total_bids: closed.total_bids,
                    },
                );
                changed = true;
            }
        } else if warn {
            let (room_id, title, current_price, time_left) = {
                // Active and present per the check above.
                match data.find_auction_mut(auction_id) {
                    Some(a) => {
                        a.warning_sent = true;
                        (a.room_id, a.title.clone(), a.current_price, a.time_left(now))
                    }
                    None => continue,
                }
            };
            broadcaster::to_room(
                sessions,
                room_id,
                None,
                &Event::AuctionWarning {
                    id: auction_id,
                    title,
                    current_price,
                    time_left,
                },
            );
            changed = true;
        }
    }

    // Rooms whose time ran out: close leftovers, eject members.
    for room_id in data.room_ids() {
        let due = matches!(
            data.find_room(room_id),
            Some(r) if r.status != RoomStatus::Ended && now >= r.end_time
        );
        if !due {
            continue;
        }

        let leftover: Vec<u32> = data
            .auctions()
            .filter(|a| a.room_id == room_id && a.status == AuctionStatus::Active)
            .map(|a| a.auction_id)
            .collect();
        for auction_id in leftover {
            if let Some(closed) = close_auction(data, auction_id) {
                counters.auctions_closed.fetch_add(1, Ordering::Relaxed);
                broadcaster::to_room(
                    sessions,
                    room_id,
                    None,
                    &Event::AuctionEnded {
                        id: closed.auction_id,
                        title: closed.title,
                        winner: closed.winner,
                        final_price: closed.final_price,
                        total_bids: closed.total_bids,
                    },
                );
            }
        }

        let name = match data.find_room_mut(room_id) {
            Some(r) => {
                r.status = RoomStatus::Ended;
                r.current_participants = 0;
                r.name.clone()
            }
            None => continue,
        };

        let members: Vec<_> = sessions
            .room_members(room_id, None)
            .iter()
            .map(|s| s.conn)
            .collect();
        for conn in members {
            broadcaster::to_session(sessions, conn, &Event::RoomEnded {
                room_id,
                name: name.clone(),
            });
            sessions.set_room(&conn, 0);
        }

        counters.rooms_closed.fetch_add(1, Ordering::Relaxed);
        info!(room_id, name = %name, "room ended by timer");
        changed = true;
    }

    changed
}
