use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::money::Money;
use crate::time::secs_left;

pub const MAX_USERNAME_LEN: usize = 49;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uid: u32,
    pub username: String,
    pub email: String,
    /// Opaque stored credential; only the verifier interprets it.
    pub credential: String,
    pub balance: Money,
    pub status: UserStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Active,
    Ended,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Active => "active",
            RoomStatus::Ended => "ended",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: u32,
    pub name: String,
    pub description: String,
    pub max_participants: u32,
    pub current_participants: u32,
    pub status: RoomStatus,
    pub start_time: i64,
    pub end_time: i64,
    pub creator_uid: u32,
    pub total_auctions: u32,
}

impl Room {
    pub fn time_left(&self, now: i64) -> u64 {
        match self.status {
            RoomStatus::Ended => 0,
            _ => secs_left(self.end_time, now),
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Active,
    Ended,
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuctionStatus::Active => "active",
            AuctionStatus::Ended => "ended",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub auction_id: u32,
    pub seller_uid: u32,
    pub room_id: u32,
    pub title: String,
    pub description: String,
    pub start_price: Money,
    /// Monotonically non-decreasing; equals the latest accepted bid, or
    /// `start_price` while no bid has landed.
    pub current_price: Money,
    /// Zero means buy-now is disabled.
    pub buy_now_price: Money,
    pub min_bid_increment: Money,
    pub start_time: i64,
    pub end_time: i64,
    pub status: AuctionStatus,
    /// Zero means no winner yet.
    pub winner_uid: u32,
    pub total_bids: u32,
    /// Set when the terminal state came from an immediate purchase.
    #[serde(default)]
    pub sold_by_buy_now: bool,
    /// Guards the one-shot closing warning against sweeper tick drift.
    #[serde(default)]
    pub warning_sent: bool,
}

impl Auction {
    pub fn time_left(&self, now: i64) -> u64 {
        match self.status {
            AuctionStatus::Ended => 0,
            AuctionStatus::Active => secs_left(self.end_time, now),
        }
    }

    pub fn has_winner(&self) -> bool {
        self.winner_uid != 0
    }
}

/// How an ended auction reached its terminal price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleMethod {
    BuyNow,
    Bid,
    NoBids,
}

impl fmt::Display for SaleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaleMethod::BuyNow => "buy_now",
            SaleMethod::Bid => "bid",
            SaleMethod::NoBids => "no_bids",
        };
        f.write_str(s)
    }
}

impl Auction {
    pub fn sale_method(&self) -> SaleMethod {
        if !self.has_winner() {
            SaleMethod::NoBids
        } else if self.sold_by_buy_now {
            SaleMethod::BuyNow
        } else {
            SaleMethod::Bid
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub bid_id: u32,
    pub auction_id: u32,
    pub bidder_uid: u32,
    pub amount: Money,
    pub timestamp: i64,
}
