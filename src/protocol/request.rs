use std::str::FromStr;

use thiserror::Error;

use crate::domain::money::Money;

/// One parsed client request frame.
///
/// The first token up to the first `|` selects the command. `REGISTER` and
/// `LOGIN` carry whitespace-separated arguments; every other command is
/// pipe-separated. Embedded uids are carried through so the dispatcher can
/// reject any that disagree with the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Register {
        username: String,
        password: String,
        email: String,
    },
    Login {
        username: String,
        password: String,
    },
    CreateRoom {
        uid: u32,
        name: String,
        description: String,
        max_participants: u32,
        duration_min: u64,
    },
    ListRooms,
    JoinRoom {
        uid: u32,
        room_id: u32,
    },
    LeaveRoom {
        uid: u32,
    },
    RoomDetail {
        room_id: u32,
    },
    MyRoom {
        uid: u32,
    },
    ListAuctions {
        uid: u32,
    },
    MyAuctions {
        uid: u32,
    },
    AuctionDetail {
        auction_id: u32,
        uid: u32,
    },
    CreateAuction {
        uid: u32,
        room_id: u32,
        title: String,
        description: String,
        start_price: Money,
        buy_now_price: Money,
        min_increment: Money,
        duration_min: u64,
    },
    PlaceBid {
        auction_id: u32,
        uid: u32,
        amount: Money,
    },
    BuyNow {
        auction_id: u32,
        uid: u32,
    },
    BidHistory {
        auction_id: u32,
        uid: u32,
    },
    AuctionHistory {
        uid: u32,
    },
    Quit,
}

impl Request {
    /// Prefix used in this command's `_SUCCESS`/`_FAIL` reply frames.
    pub fn reply_prefix(&self) -> &'static str {
        match self {
            Request::Register { .. } => "REGISTER",
            Request::Login { .. } => "LOGIN",
            Request::CreateRoom { .. } => "CREATE_ROOM",
            Request::ListRooms => "LIST_ROOMS",
            Request::JoinRoom { .. } => "JOIN_ROOM",
            Request::LeaveRoom { .. } => "LEAVE_ROOM",
            Request::RoomDetail { .. } => "ROOM_DETAIL",
            Request::MyRoom { .. } => "MY_ROOM",
            Request::ListAuctions { .. } => "LIST_AUCTIONS",
            Request::MyAuctions { .. } => "MY_AUCTIONS",
            Request::AuctionDetail { .. } => "AUCTION_DETAIL",
            Request::CreateAuction { .. } => "CREATE_AUCTION",
            Request::PlaceBid { .. } => "BID",
            Request::BuyNow { .. } => "BUY_NOW",
            Request::BidHistory { .. } => "BID_HISTORY",
            Request::AuctionHistory { .. } => "AUCTION_HISTORY",
            Request::Quit => "QUIT",
        }
    }

    /// Uid embedded in the request payload, where the grammar carries one.
    pub fn embedded_uid(&self) -> Option<u32> {
        match *self {
            Request::CreateRoom { uid, .. }
            | Request::JoinRoom { uid, .. }
            | Request::LeaveRoom { uid }
            | Request::MyRoom { uid }
            | Request::ListAuctions { uid }
            | Request::MyAuctions { uid }
            | Request::AuctionDetail { uid, .. }
            | Request::CreateAuction { uid, .. }
            | Request::PlaceBid { uid, .. }
            | Request::BuyNow { uid, .. }
            | Request::BidHistory { uid, .. }
            | Request::AuctionHistory { uid } => Some(uid),
            _ => None,
        }
    }
}

/// Frame-level rejections, distinct from command failures: these surface as
/// `ERROR|...` (or `<CMD>_FAIL|Invalid number` for numeric fields).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Unknown command")]
    UnknownCommand,
    #[error("Parse")]
    Parse,
    #[error("Invalid number")]
    InvalidNumber { cmd: &'static str },
    #[error("Frame too large")]
    TooLarge,
}

fn num<T: FromStr>(s: &str, cmd: &'static str) -> Result<T, FrameError> {
    s.parse().map_err(|_| FrameError::InvalidNumber { cmd })
}

fn money(s: &str, cmd: &'static str) -> Result<Money, FrameError> {
    s.parse().map_err(|_| FrameError::InvalidNumber { cmd })
}

fn fields<'a>(blob: &'a str, expect: usize) -> Result<Vec<&'a str>, FrameError> {
    let parts: Vec<&str> = blob.split('|').collect();
    if parts.len() != expect {
        return Err(FrameError::Parse);
    }
    Ok(parts)
}

/// Parses one frame. The caller strips nothing: one trailing newline (and a
/// preceding carriage return) are tolerated here.
pub fn parse(raw: &str) -> Result<Request, FrameError> {
    if raw.len() > super::MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge);
    }

    let line = raw.strip_suffix('\n').unwrap_or(raw);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let (cmd, blob) = line.split_once('|').ok_or(FrameError::UnknownCommand)?;

    match cmd {
        "REGISTER" => {
            let mut it = blob.split_whitespace();
            match (it.next(), it.next(), it.next(), it.next()) {
                (Some(username), Some(password), Some(email), None) => Ok(Request::Register {
                    username: username.to_string(),
                    password: password.to_string(),
                    email: email.to_string(),
                }),
                _ => Err(FrameError::Parse),
            }
        }
        "LOGIN" => {
            let mut it = blob.split_whitespace();
            match (it.next(), it.next(), it.next()) {
                (Some(username), Some(password), None) => Ok(Request::Login {
                    username: username.to_string(),
                    password: password.to_string(),
                }),
                _ => Err(FrameError::Parse),
            }
        }
        "CREATE_ROOM" => {
            let p = fields(blob, 5)?;
            Ok(Request::CreateRoom {
                uid: num(p[0], "CREATE_ROOM")?,
                name: p[1].to_string(),
                description: p[2].to_string(),
                max_participants: num(p[3], "CREATE_ROOM")?,
                duration_min: num(p[4], "CREATE_ROOM")?,
            })
        }
        "LIST_ROOMS" => {
            if !blob.is_empty() {
                return Err(FrameError::Parse);
            }
            Ok(Request::ListRooms)
        }
        "JOIN_ROOM" => {
            let p = fields(blob, 2)?;
            Ok(Request::JoinRoom {
                uid: num(p[0], "JOIN_ROOM")?,
                room_id: num(p[1], "JOIN_ROOM")?,
            })
        }
        "LEAVE_ROOM" => {
            let p = fields(blob, 1)?;
            Ok(Request::LeaveRoom {
                uid: num(p[0], "LEAVE_ROOM")?,
            })
        }
        "ROOM_DETAIL" => {
            let p = fields(blob, 1)?;
            Ok(Request::RoomDetail {
                room_id: num(p[0], "ROOM_DETAIL")?,
            })
        }
        "MY_ROOM" => {
            let p = fields(blob, 1)?;
            Ok(Request::MyRoom {
                uid: num(p[0], "MY_ROOM")?,
            })
        }
        "LIST_AUCTIONS" => {
            let p = fields(blob, 1)?;
            Ok(Request::ListAuctions {
                uid: num(p[0], "LIST_AUCTIONS")?,
            })
        }
        "MY_AUCTIONS" => {
            let p = fields(blob, 1)?;
            Ok(Request::MyAuctions {
                uid: num(p[0], "MY_AUCTIONS")?,
            })
        }
        "AUCTION_DETAIL" => {
            let p = fields(blob, 2)?;
            Ok(Request::AuctionDetail {
                auction_id: num(p[0], "AUCTION_DETAIL")?,
                uid: num(p[1], "AUCTION_DETAIL")?,
            })
        }
        "CREATE_AUCTION" => {
            let p = fields(blob, 8)?;
            Ok(Request::CreateAuction {
                uid: num(p[0], "CREATE_AUCTION")?,
                room_id: num(p[1], "CREATE_AUCTION")?,
                title: p[2].to_string(),
                description: p[3].to_string(),
                start_price: money(p[4], "CREATE_AUCTION")?,
                buy_now_price: money(p[5], "CREATE_AUCTION")?,
                min_increment: money(p[6], "CREATE_AUCTION")?,
                duration_min: num(p[7], "CREATE_AUCTION")?,
            })
        }
        "PLACE_BID" => {
            let p = fields(blob, 3)?;
            Ok(Request::PlaceBid {
                auction_id: num(p[0], "BID")?,
                uid: num(p[1], "BID")?,
                amount: money(p[2], "BID")?,
            })
        }
        "BUY_NOW" => {
            let p = fields(blob, 2)?;
            Ok(Request::BuyNow {
                auction_id: num(p[0], "BUY_NOW")?,
                uid: num(p[1], "BUY_NOW")?,
            })
        }
        "BID_HISTORY" => {
            let p = fields(blob, 2)?;
            Ok(Request::BidHistory {
                auction_id: num(p[0], "BID_HISTORY")?,
                uid: num(p[1], "BID_HISTORY")?,
            })
        }
        "AUCTION_HISTORY" => {
            let p = fields(blob, 1)?;
            Ok(Request::AuctionHistory {
                uid: num(p[0], "AUCTION_HISTORY")?,
            })
        }
        "QUIT" => {
            if !blob.is_empty() {
                return Err(FrameError::Parse);
            }
            Ok(Request::Quit)
        }
        _ => Err(FrameError::UnknownCommand),
    }
}
