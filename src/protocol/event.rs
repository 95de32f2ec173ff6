use std::fmt;

use crate::domain::money::Money;

/// An unsolicited server→client push frame. Rendered without the trailing
/// newline; the writer task appends it.
#[derive(Debug, Clone)]
pub enum Event {
    ForceLogout {
        reason: &'static str,
    },
    NewRoom {
        id: u32,
        name: String,
        creator: String,
        max: u32,
    },
    UserJoined {
        username: String,
        room_id: u32,
    },
    UserLeft {
        username: String,
        room_id: u32,
    },
    NewAuction {
        id: u32,
        title: String,
        start_price: Money,
        buy_now_price: Money,
        min_increment: Money,
        time_left: u64,
    },
    NewBid {
        auction_id: u32,
        bidder: String,
        amount: Money,
        total_bids: u32,
    },
    NewBidWarning {
        auction_id: u32,
        bidder: String,
        amount: Money,
        total_bids: u32,
        time_left: u64,
    },
    AuctionWarning {
        id: u32,
        title: String,
        current_price: Money,
        time_left: u64,
    },
    AuctionEnded {
        id: u32,
        title: String,
        /// Winner username, or `No bids`.
        winner: String,
        final_price: Money,
        total_bids: u32,
    },
    RoomEnded {
        room_id: u32,
        name: String,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ForceLogout { reason } => write!(f, "FORCE_LOGOUT|{reason}"),
            Event::NewRoom {
                id,
                name,
                creator,
                max,
            } => write!(f, "NEW_ROOM|{id}|{name}|{creator}|{max}"),
            Event::UserJoined { username, room_id } => {
                write!(f, "USER_JOINED|{username}|{room_id}")
            }
            Event::UserLeft { username, room_id } => write!(f, "USER_LEFT|{username}|{room_id}"),
            Event::NewAuction {
                id,
                title,
                start_price,
                buy_now_price,
                min_increment,
                time_left,
            } => write!(
                f,
                "NEW_AUCTION|{id}|{title}|{start_price}|{buy_now_price}|{min_increment}|{time_left}"
            ),
            Event::NewBid {
                auction_id,
                bidder,
                amount,
                total_bids,
            } => write!(f, "NEW_BID|{auction_id}|{bidder}|{amount}|{total_bids}"),
            Event::NewBidWarning {
                auction_id,
                bidder,
                amount,
                total_bids,
                time_left,
            } => write!(
                f,
                "NEW_BID_WARNING|{auction_id}|{bidder}|{amount}|{total_bids}|{time_left}"
            ),
            Event::AuctionWarning {
                id,
                title,
                current_price,
                time_left,
            } => write!(
                f,
                "AUCTION_WARNING|{id}|{title}|{current_price}|{time_left}"
            ),
            Event::AuctionEnded {
                id,
                title,
                winner,
                final_price,
                total_bids,
            } => write!(
                f,
                "AUCTION_ENDED|{id}|{title}|{winner}|{final_price}|{total_bids}"
            ),
            Event::RoomEnded { room_id, name } => write!(f, "ROOM_ENDED|{room_id}|{name}"),
        }
    }
}
