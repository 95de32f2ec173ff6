use std::fmt;

use crate::domain::model::{AuctionStatus, RoomStatus, SaleMethod};
use crate::domain::money::Money;

/// One record in a `ROOM_LIST` reply.
#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub current: u32,
    pub max: u32,
    pub status: RoomStatus,
    pub time_left: u64,
    pub auctions: u32,
}

impl fmt::Display for RoomRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{};{};{}",
            self.id,
            self.name,
            self.description,
            self.current,
            self.max,
            self.status,
            self.time_left,
            self.auctions
        )
    }
}

/// One record in an `AUCTION_LIST` reply.
#[derive(Debug, Clone)]
pub struct AuctionRecord {
    pub id: u32,
    pub title: String,
    pub current_price: Money,
    pub buy_now_price: Money,
    pub time_left: u64,
    pub bids: u32,
}

impl fmt::Display for AuctionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{}",
            self.id, self.title, self.current_price, self.buy_now_price, self.time_left, self.bids
        )
    }
}

/// One record in a `MY_AUCTIONS` reply.
#[derive(Debug, Clone)]
pub struct MyAuctionRecord {
    pub id: u32,
    pub title: String,
    pub current_price: Money,
    pub buy_now_price: Money,
    pub time_left: u64,
    pub status: AuctionStatus,
    pub bids: u32,
}

impl fmt::Display for MyAuctionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{};{}",
            self.id,
            self.title,
            self.current_price,
            self.buy_now_price,
            self.time_left,
            self.status,
            self.bids
        )
    }
}

/// One record in an `AUCTION_HISTORY` reply.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: u32,
    pub title: String,
    pub final_price: Money,
    /// Winner username, or `No bids`.
    pub winner: String,
    pub method: SaleMethod,
}

impl fmt::Display for HistoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{}",
            self.id, self.title, self.final_price, self.winner, self.method
        )
    }
}

/// One record in a `BID_HISTORY` reply.
#[derive(Debug, Clone)]
pub struct BidRecord {
    pub bidder: String,
    pub amount: Money,
    pub timestamp: String,
}

impl fmt::Display for BidRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.bidder, self.amount, self.timestamp)
    }
}

/// A response frame to the request currently being processed, as opposed to
/// the unsolicited pushes in [`crate::protocol::event`]. Rendered without the
/// trailing newline; the writer task appends it.
#[derive(Debug, Clone)]
pub enum Reply {
    RegisterSuccess {
        uid: u32,
        username: String,
    },
    LoginSuccess {
        uid: u32,
        username: String,
        balance: Money,
    },
    CreateRoomSuccess {
        room_id: u32,
        name: String,
    },
    JoinRoomSuccess {
        room_id: u32,
        name: String,
    },
    LeaveRoomSuccess,
    RoomList(Vec<RoomRecord>),
    RoomDetail {
        id: u32,
        name: String,
        description: String,
        creator: String,
        current: u32,
        max: u32,
        status: RoomStatus,
        time_left: u64,
        auctions: u32,
    },
    MyRoom {
        id: u32,
        name: String,
        participants: u32,
        auctions: u32,
    },
    /// `MY_ROOM` when the session holds no room.
    MyRoomNone,
    AuctionList(Vec<AuctionRecord>),
    AuctionDetail {
        id: u32,
        title: String,
        description: String,
        seller: String,
        start_price: Money,
        current_price: Money,
        buy_now_price: Money,
        min_increment: Money,
        time_left: u64,
        status: AuctionStatus,
        bids: u32,
    },
    CreateAuctionSuccess {
        auction_id: u32,
        title: String,
    },
    MyAuctions(Vec<MyAuctionRecord>),
    AuctionHistory(Vec<HistoryRecord>),
    BidHistory(Vec<BidRecord>),
    BidSuccess {
        auction_id: u32,
        amount: Money,
        total_bids: u32,
        time_left: u64,
    },
    BuyNowSuccess {
        auction_id: u32,
    },
    /// `<CMD>_FAIL|<reason>`.
    Fail {
        prefix: &'static str,
        reason: String,
    },
    /// Frame-level rejection, not tied to a command.
    Error {
        reason: &'static str,
    },
}

fn join<T: fmt::Display>(records: &[T]) -> String {
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::RegisterSuccess { uid, username } => {
                write!(f, "REGISTER_SUCCESS|{uid}|{username}")
            }
            Reply::LoginSuccess {
                uid,
                username,
                balance,
            } => write!(f, "LOGIN_SUCCESS|{uid}|{username}|{balance}"),
            Reply::CreateRoomSuccess { room_id, name } => {
                write!(f, "CREATE_ROOM_SUCCESS|{room_id}|{name}")
            }
            Reply::JoinRoomSuccess { room_id, name } => {
                write!(f, "JOIN_ROOM_SUCCESS|{room_id}|{name}")
            }
            Reply::LeaveRoomSuccess => write!(f, "LEAVE_ROOM_SUCCESS|"),
            Reply::RoomList(records) => write!(f, "ROOM_LIST|{}", join(records)),
            Reply::RoomDetail {
                id,
                name,
                description,
                creator,
                current,
                max,
                status,
                time_left,
                auctions,
            } => write!(
                f,
                "ROOM_DETAIL|{id}|{name}|{description}|{creator}|{current}|{max}|{status}|{time_left}|{auctions}"
            ),
            Reply::MyRoom {
                id,
                name,
                participants,
                auctions,
            } => write!(f, "MY_ROOM|{id}|{name}|{participants}|{auctions}"),
            Reply::MyRoomNone => write!(f, "MY_ROOM|0|Not in any room|0|0"),
            Reply::AuctionList(records) => write!(f, "AUCTION_LIST|{}", join(records)),
            Reply::AuctionDetail {
                id,
                title,
                description,
                seller,
                start_price,
                current_price,
                buy_now_price,
                min_increment,
                time_left,
                status,
                bids,
            } => write!(
                f,
                "AUCTION_DETAIL|{id}|{title}|{description}|{seller}|{start_price}|{current_price}|{buy_now_price}|{min_increment}|{time_left}|{status}|{bids}"
            ),
            Reply::CreateAuctionSuccess { auction_id, title } => {
                write!(f, "CREATE_AUCTION_SUCCESS|{auction_id}|{title}")
            }
            Reply::MyAuctions(records) => write!(f, "MY_AUCTIONS|{}", join(records)),
            Reply::AuctionHistory(records) => write!(f, "AUCTION_HISTORY|{}", join(records)),
            Reply::BidHistory(records) => write!(f, "BID_HISTORY|{}", join(records)),
            Reply::BidSuccess {
                auction_id,
                amount,
                total_bids,
                time_left,
            } => write!(f, "BID_SUCCESS|{auction_id}|{amount}|{total_bids}|{time_left}"),
            Reply::BuyNowSuccess { auction_id } => write!(f, "BUY_NOW_SUCCESS|{auction_id}"),
            Reply::Fail { prefix, reason } => write!(f, "{prefix}_FAIL|{reason}"),
            Reply::Error { reason } => write!(f, "ERROR|{reason}"),
        }
    }
}
