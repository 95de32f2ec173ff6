//! Auction lifecycle: creation, bidding, immediate purchase, closure.
//!
//! Settlement is escrow-on-acceptance: an accepted bid debits the bidder at
//! once and refunds the previously leading bidder, so balances never go
//! negative and closure only has to credit the seller. A bidder raising
//! their own leading bid is charged the difference.

use tracing::info;

use crate::domain::model::{Auction, AuctionStatus, Bid, RoomStatus};
use crate::domain::money::Money;
use crate::domain::store::DomainStore;
use crate::error::CommandError;
use crate::protocol::event::Event;
use crate::protocol::reply::{
    AuctionRecord, BidRecord, HistoryRecord, MyAuctionRecord, Reply,
};
use crate::server::broadcaster;
use crate::session::model::Session;
use crate::session::registry::SessionRegistry;
use crate::time::format_ts;

/// Bids shown per `BID_HISTORY` reply, newest first.
const BID_HISTORY_LIMIT: usize = 20;

/// Creates an auction inside a room the caller created. Pushes `NEW_AUCTION`
/// to the other members.
pub fn create_auction(
    data: &mut DomainStore,
    sessions: &SessionRegistry,
    sess: &Session,
    room_id: u32,
    title: &str,
    description: &str,
    start_price: Money,
    buy_now_price: Money,
    min_increment: Money,
    duration_min: u64,
    now: i64,
) -> Result<(u32, String), CommandError> {
    if sess.current_room_id != room_id {
        return Err(CommandError::NotInThisRoom);
    }
    if min_increment.is_zero() || duration_min == 0 {
        return Err(CommandError::InvalidNumber);
    }

    {
        let room = data.find_room(room_id).ok_or(CommandError::RoomNotFound)?;
        if room.status == RoomStatus::Ended {
            return Err(CommandError::RoomEnded);
        }
        if room.creator_uid != sess.uid {
            return Err(CommandError::NotRoomCreator);
        }
    }

    let end_time = now + duration_min as i64 * 60;
    let auction_id = data.append_auction(Auction {
        auction_id: 0,
        seller_uid: sess.uid,
        room_id,
        title: title.to_string(),
        description: description.to_string(),
        start_price,
        current_price: start_price,
        buy_now_price,
        min_bid_increment: min_increment,
        start_time: now,
        end_time,
        status: AuctionStatus::Active,
        winner_uid: 0,
        total_bids: 0,
        sold_by_buy_now: false,
        warning_sent: false,
    })?;

    if let Some(room) = data.find_room_mut(room_id) {
        room.total_auctions += 1;
    }

    broadcaster::to_room(
        sessions,
        room_id,
        Some(sess.conn),
        &Event::NewAuction {
            id: auction_id,
            title: title.to_string(),
            start_price,
            buy_now_price,
            min_increment,
            time_left: (end_time - now).max(0) as u64,
        },
    );

    info!(auction_id, room_id, seller = %sess.username, "auction created");
    Ok((auction_id, title.to_string()))
}

/// A bid that cleared validation and was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedBid {
    pub auction_id: u32,
    pub amount: Money,
    pub total_bids: u32,
    pub time_left: u64,
}

/// Validates and applies one bid.
///
/// Acceptance requires: active auction within its window, bidder in the
/// auction's room, not the seller, amount at or above
/// `current_price + min_bid_increment`, affordable under escrow accounting,
/// and bid storage not full. On acceptance the price/winner advance, the
/// previous leader is refunded, and the room (minus the bidder) hears
/// `NEW_BID` or, when at most the anti-snipe window remains, `NEW_BID_WARNING`.
pub fn place_bid(
    data: &mut DomainStore,
    sessions: &SessionRegistry,
    sess: &Session,
    auction_id: u32,
    amount: Money,
    now: i64,
    snipe_window_secs: i64,
) -> Result<AcceptedBid, CommandError> {
    let (room_id, seller_uid, floor, prev_leader) = {
        let a = data
            .find_auction(auction_id)
            .ok_or(CommandError::AuctionNotFound)?;
        if a.status != AuctionStatus::Active || now > a.end_time {
            return Err(CommandError::AuctionNotActive);
        }
        let floor = a
            .current_price
            .checked_add(a.min_bid_increment)
            .ok_or(CommandError::InvalidNumber)?;
        let prev = if a.total_bids > 0 {
            Some((a.winner_uid, a.current_price))
        } else {
            None
        };
        (a.room_id, a.seller_uid, floor, prev)
    };

    if sess.current_room_id != room_id {
        return Err(CommandError::NotInThisRoom);
    }
    if sess.uid == seller_uid {
        return Err(CommandError::SelfBid);
    }
    if amount < floor {
        return Err(CommandError::BidTooLow);
    }

    // Raising one's own leading bid releases the escrowed previous amount.
    let self_refund = match prev_leader {
        Some((leader, price)) if leader == sess.uid => price,
        _ => Money::ZERO,
    };
    let balance = data
        .find_user(sess.uid)
        .ok_or(CommandError::UserNotFound)?
        .balance;
    if balance.saturating_add(self_refund) < amount {
        return Err(CommandError::InsufficientBalance);
    }

    if !data.can_append_bid() {
        return Err(CommandError::DatabaseFull);
    }

    // All checks passed; apply. Refund the displaced leader, escrow the new.
    if let Some((leader, price)) = prev_leader {
        data.credit(leader, price);
    }
    data.debit(sess.uid, amount)?;

    data.append_bid(Bid {
        bid_id: 0,
        auction_id,
        bidder_uid: sess.uid,
        amount,
        timestamp: now,
    })?;

    let (total_bids, time_left) = {
        let a = data
            .find_auction_mut(auction_id)
            .ok_or(CommandError::Internal)?;
        a.current_price = amount;
        a.winner_uid = sess.uid;
        a.total_bids += 1;

        // Anti-snipe: a bid landing inside the window pushes the end out.
        let remaining = a.end_time - now;
        if remaining > 0 && remaining < snipe_window_secs {
            a.end_time = now + snipe_window_secs;
            // The warning below covers the room; the sweeper must not repeat it.
            a.warning_sent = true;
        }
        (a.total_bids, a.time_left(now))
    };

    let event = if time_left <= snipe_window_secs as u64 {
        Event::NewBidWarning {
            auction_id,
            bidder: sess.username.clone(),
            amount,
            total_bids,
            time_left,
        }
    } else {
        Event::NewBid {
            auction_id,
            bidder: sess.username.clone(),
            amount,
            total_bids,
        }
    };
    broadcaster::to_room(sessions, room_id, Some(sess.conn), &event);

    info!(auction_id, bidder = %sess.username, amount = %amount, "bid accepted");
    Ok(AcceptedBid {
        auction_id,
        amount,
        total_bids,
        time_left,
    })
}

/// Immediate purchase at the posted buy-now price. Refunds the displaced
/// leading bidder, debits the buyer, credits the seller, and ends the
/// auction. Pushes `AUCTION_ENDED` to the rest of the room.
pub fn buy_now(
    data: &mut DomainStore,
    sessions: &SessionRegistry,
    sess: &Session,
    auction_id: u32,
    now: i64,
) -> Result<u32, CommandError> {
    let (room_id, seller_uid, price, title, prev_leader, total_bids) = {
        let a = data
            .find_auction(auction_id)
            .ok_or(CommandError::AuctionNotFound)?;
        if a.status != AuctionStatus::Active || now > a.end_time {
            return Err(CommandError::AuctionNotActive);
        }
        if a.buy_now_price.is_zero() {
            return Err(CommandError::BuyNowUnavailable);
        }
        let prev = if a.total_bids > 0 {
            Some((a.winner_uid, a.current_price))
        } else {
            None
        };
        (
            a.room_id,
            a.seller_uid,
            a.buy_now_price,
            a.title.clone(),
            prev,
            a.total_bids,
        )
    };

    if sess.current_room_id != room_id {
        return Err(CommandError::NotInThisRoom);
    }
    if sess.uid == seller_uid {
        return Err(CommandError::SelfBid);
    }

    let self_refund = match prev_leader {
        Some((leader, escrowed)) if leader == sess.uid => escrowed,
        _ => Money::ZERO,
    };
    let balance = data
        .find_user(sess.uid)
        .ok_or(CommandError::UserNotFound)?
        .balance;
    if balance.saturating_add(self_refund) < price {
        return Err(CommandError::InsufficientBalance);
    }

    if let Some((leader, escrowed)) = prev_leader {
        data.credit(leader, escrowed);
    }
    data.debit(sess.uid, price)?;
    data.credit(seller_uid, price);

    {
        let a = data
            .find_auction_mut(auction_id)
            .ok_or(CommandError::Internal)?;
        a.current_price = price;
        a.winner_uid = sess.uid;
        a.status = AuctionStatus::Ended;
        a.sold_by_buy_now = true;
        a.end_time = now;
    }

    broadcaster::to_room(
        sessions,
        room_id,
        Some(sess.conn),
        &Event::AuctionEnded {
            id: auction_id,
            title,
            winner: sess.username.clone(),
            final_price: price,
            total_bids,
        },
    );

    info!(auction_id, buyer = %sess.username, price = %price, "buy-now settled");
    Ok(auction_id)
}

/// Terminal summary of a closed auction.
#[derive(Debug, Clone)]
pub struct ClosedAuction {
    pub auction_id: u32,
    pub room_id: u32,
    pub title: String,
    /// Winner username, or `No bids`.
    pub winner: String,
    pub final_price: Money,
    pub total_bids: u32,
}

/// Transitions an active auction to ended and settles it: the winner's money
/// is already escrowed, so closure credits the seller. Returns `None` for
/// auctions that are already terminal. The caller broadcasts the summary.
pub fn close_auction(data: &mut DomainStore, auction_id: u32) -> Option<ClosedAuction> {
    let (room_id, title, seller_uid, winner_uid, final_price, total_bids) = {
        let a = data.find_auction_mut(auction_id)?;
        if a.status != AuctionStatus::Active {
            return None;
        }
        a.status = AuctionStatus::Ended;
        (
            a.room_id,
            a.title.clone(),
            a.seller_uid,
            a.winner_uid,
            a.current_price,
            a.total_bids,
        )
    };

    let winner = if winner_uid == 0 {
        "No bids".to_string()
    } else {
        data.credit(seller_uid, final_price);
        data.username_of(winner_uid)
    };

    Some(ClosedAuction {
        auction_id,
        room_id,
        title,
        winner,
        final_price,
        total_bids,
    })
}

/// Active auctions in the session's current room.
pub fn list_auctions(data: &DomainStore, room_id: u32, now: i64) -> Reply {
    let records = data
        .auctions()
        .filter(|a| a.room_id == room_id && a.status == AuctionStatus::Active)
        .map(|a| AuctionRecord {
            id: a.auction_id,
            title: a.title.clone(),
            current_price: a.current_price,
            buy_now_price: a.buy_now_price,
            time_left: a.time_left(now),
            bids: a.total_bids,
        })
        .collect();
    Reply::AuctionList(records)
}

/// Every auction the user is selling, any status.
pub fn my_auctions(data: &DomainStore, uid: u32, now: i64) -> Reply {
    let records = data
        .auctions()
        .filter(|a| a.seller_uid == uid)
        .map(|a| MyAuctionRecord {
            id: a.auction_id,
            title: a.title.clone(),
            current_price: a.current_price,
            buy_now_price: a.buy_now_price,
            time_left: a.time_left(now),
            status: a.status,
            bids: a.total_bids,
        })
        .collect();
    Reply::MyAuctions(records)
}

pub fn auction_detail(
    data: &DomainStore,
    sess: &Session,
    auction_id: u32,
    now: i64,
) -> Result<Reply, CommandError> {
    let a = data
        .find_auction(auction_id)
        .ok_or(CommandError::AuctionNotFound)?;
    if sess.current_room_id != a.room_id {
        return Err(CommandError::NotInThisRoom);
    }
    Ok(Reply::AuctionDetail {
        id: a.auction_id,
        title: a.title.clone(),
        description: a.description.clone(),
        seller: data.username_of(a.seller_uid),
        start_price: a.start_price,
        current_price: a.current_price,
        buy_now_price: a.buy_now_price,
        min_increment: a.min_bid_increment,
        time_left: a.time_left(now),
        status: a.status,
        bids: a.total_bids,
    })
}

/// The last 20 bids on an auction, newest first.
pub fn bid_history(
    data: &DomainStore,
    sess: &Session,
    auction_id: u32,
) -> Result<Reply, CommandError> {
    let a = data
        .find_auction(auction_id)
        .ok_or(CommandError::AuctionNotFound)?;
    if sess.current_room_id != a.room_id {
        return Err(CommandError::NotInThisRoom);
    }

    let records = data
        .bids_for_auction(auction_id)
        .into_iter()
        .take(BID_HISTORY_LIMIT)
        .map(|b| BidRecord {
            bidder: data.username_of(b.bidder_uid),
            amount: b.amount,
            timestamp: format_ts(b.timestamp),
        })
        .collect();
    Ok(Reply::BidHistory(records))
}

/// Ended auctions the user took part in, as seller, winner, or bidder.
pub fn auction_history(data: &DomainStore, uid: u32) -> Reply {
    let records = data
        .auctions()
        .filter(|a| a.status == AuctionStatus::Ended)
        .filter(|a| {
            a.seller_uid == uid || a.winner_uid == uid || data.user_has_bid_on(uid, a.auction_id)
        })
        .map(|a| HistoryRecord {
            id: a.auction_id,
            title: a.title.clone(),
            final_price: a.current_price,
            winner: if a.has_winner() {
                data.username_of(a.winner_uid)
            } else {
                "No bids".to_string()
            },
            method: a.sale_method(),
        })
        .collect();
    Reply::AuctionHistory(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Room, User, UserStatus};
    use crate::domain::store::Limits;
    use crate::session::model::{ConnId, Outbound};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    const SNIPE: i64 = 30;

    fn add_user(data: &mut DomainStore, name: &str, cents: u64) -> u32 {
        data.append_user(User {
            uid: 0,
            username: name.into(),
            email: format!("{name}@x"),
            credential: "pw".into(),
            balance: Money::from_cents(cents),
            status: UserStatus::Active,
            created_at: 0,
        })
        .unwrap()
    }

    fn add_room(data: &mut DomainStore, creator: u32) -> u32 {
        data.append_room(Room {
            room_id: 0,
            name: "Vintage".into(),
            description: "d".into(),
            max_participants: 10,
            current_participants: 0,
            status: RoomStatus::Active,
            start_time: 0,
            end_time: 100_000,
            creator_uid: creator,
            total_auctions: 0,
        })
        .unwrap()
    }

    fn attach(
        reg: &mut SessionRegistry,
        uid: u32,
        name: &str,
        room: u32,
    ) -> (Session, mpsc::UnboundedReceiver<Outbound>) {
        let conn: ConnId = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        reg.register_sender(conn, tx);
        let sess = Session {
            conn,
            uid,
            username: name.into(),
            login_time: 0,
            current_room_id: room,
        };
        reg.attach(sess.clone());
        (sess, rx)
    }

    fn frames(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(Outbound::Frame(f)) = rx.try_recv() {
            out.push(f);
        }
        out
    }

    struct Fixture {
        data: DomainStore,
        reg: SessionRegistry,
        alice: Session,
        alice_rx: mpsc::UnboundedReceiver<Outbound>,
        bob: Session,
        auction_id: u32,
    }

    /// Alice sells in room 1 (start 100.00, incr 10.00, ends at t=60);
    /// bob is a member with a configurable balance.
    fn fixture(buy_now_cents: u64, bob_cents: u64) -> Fixture {
        let mut data = DomainStore::new(Limits::default());
        let mut reg = SessionRegistry::new();
        let alice_uid = add_user(&mut data, "alice", 100_000_000);
        let bob_uid = add_user(&mut data, "bob", bob_cents);
        let room_id = add_room(&mut data, alice_uid);

        let (alice, mut alice_rx) = attach(&mut reg, alice_uid, "alice", room_id);
        let (bob, _bob_rx) = attach(&mut reg, bob_uid, "bob", room_id);

        let (auction_id, _) = create_auction(
            &mut data,
            &reg,
            &alice,
            room_id,
            "Lamp",
            "Brass lamp",
            Money::from_cents(10_000),
            Money::from_cents(buy_now_cents),
            Money::from_cents(1_000),
            1,
            0,
        )
        .unwrap();
        let _ = frames(&mut alice_rx);

        Fixture {
            data,
            reg,
            alice,
            alice_rx,
            bob,
            auction_id,
        }
    }

    #[test]
    fn create_auction_requires_room_creator() {
        let mut f = fixture(0, 100_000_000);
        let err = create_auction(
            &mut f.data,
            &f.reg,
            &f.bob,
            1,
            "Chair",
            "d",
            Money::from_cents(100),
            Money::ZERO,
            Money::from_cents(10),
            1,
            0,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::NotRoomCreator);
    }

    #[test]
    fn bid_below_floor_is_rejected() {
        let mut f = fixture(0, 100_000_000);
        // Floor is 100 + 10 = 110; 105 is short of it.
        let err = place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(10_500),
            10,
            SNIPE,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::BidTooLow);

        // Exactly the floor is acceptable.
        let accepted = place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(11_000),
            10,
            SNIPE,
        )
        .unwrap();
        assert_eq!(accepted.amount, Money::from_cents(11_000));
        assert_eq!(accepted.total_bids, 1);
        assert_eq!(accepted.time_left, 50);
    }

    #[test]
    fn seller_cannot_bid_on_own_auction() {
        let mut f = fixture(0, 100_000_000);
        let err = place_bid(
            &mut f.data,
            &f.reg,
            &f.alice,
            f.auction_id,
            Money::from_cents(11_000),
            10,
            SNIPE,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::SelfBid);
    }

    #[test]
    fn bid_escrows_and_refunds_the_displaced_leader() {
        let mut f = fixture(0, 100_000_000);
        let carol_uid = add_user(&mut f.data, "carol", 100_000_000);
        let (carol, _crx) = attach(&mut f.reg, carol_uid, "carol", 1);

        place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(11_000),
            10,
            SNIPE,
        )
        .unwrap();
        assert_eq!(
            f.data.find_user(f.bob.uid).unwrap().balance,
            Money::from_cents(100_000_000 - 11_000)
        );

        place_bid(
            &mut f.data,
            &f.reg,
            &carol,
            f.auction_id,
            Money::from_cents(12_000),
            11,
            SNIPE,
        )
        .unwrap();

        // Bob is made whole; carol's money is held.
        assert_eq!(
            f.data.find_user(f.bob.uid).unwrap().balance,
            Money::from_cents(100_000_000)
        );
        assert_eq!(
            f.data.find_user(carol_uid).unwrap().balance,
            Money::from_cents(100_000_000 - 12_000)
        );

        let a = f.data.find_auction(f.auction_id).unwrap();
        assert_eq!(a.current_price, Money::from_cents(12_000));
        assert_eq!(a.winner_uid, carol_uid);
        assert_eq!(a.total_bids, 2);
    }

    #[test]
    fn raising_own_bid_charges_only_the_difference() {
        let mut f = fixture(0, 11_500);

        place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(11_000),
            10,
            SNIPE,
        )
        .unwrap();

        // 500 left in the clear, but the escrowed 11_000 comes back first.
        place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(12_000),
            11,
            SNIPE,
        )
        .unwrap();

        // 11_500 - 12_000 + 11_000 escrow release
        assert_eq!(
            f.data.find_user(f.bob.uid).unwrap().balance,
            Money::from_cents(10_500)
        );
    }

    #[test]
    fn insufficient_balance_is_rejected_before_any_transfer() {
        let mut f = fixture(0, 10_000);
        let err = place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(11_000),
            10,
            SNIPE,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::InsufficientBalance);
        assert_eq!(
            f.data.find_user(f.bob.uid).unwrap().balance,
            Money::from_cents(10_000)
        );
    }

    #[test]
    fn bid_outside_the_room_is_rejected() {
        let mut f = fixture(0, 100_000_000);
        let outsider_uid = add_user(&mut f.data, "eve", 100_000_000);
        let (eve, _erx) = attach(&mut f.reg, outsider_uid, "eve", 0);

        let err = place_bid(
            &mut f.data,
            &f.reg,
            &eve,
            f.auction_id,
            Money::from_cents(11_000),
            10,
            SNIPE,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::NotInThisRoom);
    }

    #[test]
    fn late_bid_extends_the_auction_and_warns_the_room() {
        let mut f = fixture(0, 100_000_000);

        // t=55 of a 60-second auction: inside the snipe window.
        let accepted = place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(12_000),
            55,
            SNIPE,
        )
        .unwrap();

        assert_eq!(accepted.time_left, 30);
        let a = f.data.find_auction(f.auction_id).unwrap();
        assert_eq!(a.end_time, 55 + 30);
        assert!(a.warning_sent);

        assert_eq!(
            frames(&mut f.alice_rx),
            vec!["NEW_BID_WARNING|1|bob|120.00|1|30".to_string()]
        );
    }

    #[test]
    fn early_bid_emits_plain_new_bid() {
        let mut f = fixture(0, 100_000_000);

        place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(11_000),
            5,
            SNIPE,
        )
        .unwrap();

        assert_eq!(
            frames(&mut f.alice_rx),
            vec!["NEW_BID|1|bob|110.00|1".to_string()]
        );
        // No extension outside the window.
        assert_eq!(f.data.find_auction(f.auction_id).unwrap().end_time, 60);
    }

    #[test]
    fn bid_after_end_time_is_not_active() {
        let mut f = fixture(0, 100_000_000);
        let err = place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(11_000),
            61,
            SNIPE,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::AuctionNotActive);
    }

    #[test]
    fn buy_now_settles_and_ends_the_auction() {
        let mut f = fixture(50_000, 100_000_000);

        buy_now(&mut f.data, &f.reg, &f.bob, f.auction_id, 10).unwrap();

        let a = f.data.find_auction(f.auction_id).unwrap();
        assert_eq!(a.status, AuctionStatus::Ended);
        assert_eq!(a.winner_uid, f.bob.uid);
        assert_eq!(a.current_price, Money::from_cents(50_000));
        assert!(a.sold_by_buy_now);

        // Buyer debited, seller credited.
        assert_eq!(
            f.data.find_user(f.bob.uid).unwrap().balance,
            Money::from_cents(100_000_000 - 50_000)
        );
        assert_eq!(
            f.data.find_user(f.alice.uid).unwrap().balance,
            Money::from_cents(100_000_000 + 50_000)
        );

        assert_eq!(
            frames(&mut f.alice_rx),
            vec!["AUCTION_ENDED|1|Lamp|bob|500.00|0".to_string()]
        );

        // The terminal state refuses further bids.
        let err = place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(60_000),
            11,
            SNIPE,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::AuctionNotActive);
    }

    #[test]
    fn buy_now_refunds_the_displaced_leader() {
        let mut f = fixture(50_000, 100_000_000);
        let carol_uid = add_user(&mut f.data, "carol", 100_000_000);
        let (carol, _crx) = attach(&mut f.reg, carol_uid, "carol", 1);

        place_bid(
            &mut f.data,
            &f.reg,
            &carol,
            f.auction_id,
            Money::from_cents(11_000),
            5,
            SNIPE,
        )
        .unwrap();

        buy_now(&mut f.data, &f.reg, &f.bob, f.auction_id, 10).unwrap();

        assert_eq!(
            f.data.find_user(carol_uid).unwrap().balance,
            Money::from_cents(100_000_000)
        );
    }

    #[test]
    fn buy_now_requires_a_posted_price() {
        let mut f = fixture(0, 100_000_000);
        let err = buy_now(&mut f.data, &f.reg, &f.bob, f.auction_id, 10).unwrap_err();
        assert_eq!(err, CommandError::BuyNowUnavailable);
    }

    #[test]
    fn close_credits_seller_once_and_is_terminal() {
        let mut f = fixture(0, 100_000_000);
        place_bid(
            &mut f.data,
            &f.reg,
            &f.bob,
            f.auction_id,
            Money::from_cents(11_000),
            5,
            SNIPE,
        )
        .unwrap();

        let closed = close_auction(&mut f.data, f.auction_id).unwrap();
        assert_eq!(closed.winner, "bob");
        assert_eq!(closed.final_price, Money::from_cents(11_000));
        assert_eq!(closed.total_bids, 1);

        assert_eq!(
            f.data.find_user(f.alice.uid).unwrap().balance,
            Money::from_cents(100_000_000 + 11_000)
        );

        // Already terminal: no double settlement.
        assert!(close_auction(&mut f.data, f.auction_id).is_none());
        assert_eq!(
            f.data.find_user(f.alice.uid).unwrap().balance,
            Money::from_cents(100_000_000 + 11_000)
        );
    }

    #[test]
    fn close_without_bids_reports_no_winner_and_moves_no_money() {
        let mut f = fixture(0, 100_000_000);
        let closed = close_auction(&mut f.data, f.auction_id).unwrap();
        assert_eq!(closed.winner, "No bids");
        assert_eq!(closed.total_bids, 0);
        assert_eq!(
            f.data.find_user(f.alice.uid).unwrap().balance,
            Money::from_cents(100_000_000)
        );
    }

    #[test]
    fn bid_history_caps_at_twenty_newest_first() {
        let mut f = fixture(0, 100_000_000);
        for i in 0..25u64 {
            place_bid(
                &mut f.data,
                &f.reg,
                &f.bob,
                f.auction_id,
                Money::from_cents(11_000 + i * 1_000),
                i as i64 % 50,
                SNIPE,
            )
            .unwrap();
        }

        let reply = bid_history(&f.data, &f.bob, f.auction_id).unwrap();
        match reply {
            Reply::BidHistory(records) => {
                assert_eq!(records.len(), 20);
                assert_eq!(records[0].amount, Money::from_cents(11_000 + 24 * 1_000));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn auction_history_reports_method_and_participants() {
        let mut f = fixture(50_000, 100_000_000);
        buy_now(&mut f.data, &f.reg, &f.bob, f.auction_id, 10).unwrap();

        for uid in [f.alice.uid, f.bob.uid] {
            match auction_history(&f.data, uid) {
                Reply::AuctionHistory(records) => {
                    assert_eq!(records.len(), 1);
                    assert_eq!(records[0].winner, "bob");
                    assert_eq!(records[0].method.to_string(), "buy_now");
                }
                other => panic!("unexpected reply: {other:?}"),
            }
        }

        // A stranger has no history entry for it.
        let eve = add_user(&mut f.data, "eve", 0);
        match auction_history(&f.data, eve) {
            Reply::AuctionHistory(records) => assert!(records.is_empty()),
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}
