use serde::{Deserialize, Serialize};

use crate::domain::model::{Auction, Bid, Room, User};
use crate::domain::money::Money;
use crate::error::CommandError;

/// Capacity limits for the domain collections. Appends beyond a limit are
/// rejected at the same boundary the original enforced (`Database full`).
#[derive(Clone, Debug)]
pub struct Limits {
    pub max_users: usize,
    pub max_rooms: usize,
    pub max_auctions: usize,
    pub max_bids: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_users: 1_000,
            max_rooms: 100,
            max_auctions: 1_000,
            max_bids: 5_000,
        }
    }
}

/// Point-in-time copy of every collection; the unit of snapshot persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainState {
    pub users: Vec<User>,
    pub rooms: Vec<Room>,
    pub auctions: Vec<Auction>,
    pub bids: Vec<Bid>,
}

/// Owner of the four domain collections.
///
/// Ids are dense and monotonic starting at 1; `id == index + 1` because
/// entities are never deleted. All access is serialized by the `data` lock
/// in [`crate::app::App`]; this type itself is single-threaded.
pub struct DomainStore {
    state: DomainState,
    limits: Limits,
}

impl DomainStore {
    pub fn new(limits: Limits) -> Self {
        Self {
            state: DomainState::default(),
            limits,
        }
    }

    /// Rebuild the store from a previously persisted snapshot.
    pub fn restore(state: DomainState, limits: Limits) -> Self {
        Self { state, limits }
    }

    pub fn clone_state(&self) -> DomainState {
        self.state.clone()
    }

    // ---- users ----

    pub fn find_user(&self, uid: u32) -> Option<&User> {
        uid.checked_sub(1)
            .and_then(|i| self.state.users.get(i as usize))
    }

    pub fn find_user_mut(&mut self, uid: u32) -> Option<&mut User> {
        uid.checked_sub(1)
            .and_then(|i| self.state.users.get_mut(i as usize))
    }

    pub fn find_user_by_name(&self, username: &str) -> Option<&User> {
        self.state.users.iter().find(|u| u.username == username)
    }

    pub fn username_of(&self, uid: u32) -> String {
        self.find_user(uid)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| format!("user#{uid}"))
    }

    pub fn append_user(&mut self, mut user: User) -> Result<u32, CommandError> {
        if self.state.users.len() >= self.limits.max_users {
            return Err(CommandError::DatabaseFull);
        }
        let uid = self.state.users.len() as u32 + 1;
        user.uid = uid;
        self.state.users.push(user);
        Ok(uid)
    }

    /// Adds to a user's balance, saturating at the top of the range.
    pub fn credit(&mut self, uid: u32, amount: Money) {
        if let Some(u) = self.find_user_mut(uid) {
            u.balance = u.balance.saturating_add(amount);
        }
    }

    /// Removes from a user's balance. Callers validate affordability first;
    /// an underflow here is a bookkeeping bug surfaced as `Internal`.
    pub fn debit(&mut self, uid: u32, amount: Money) -> Result<(), CommandError> {
        let u = self.find_user_mut(uid).ok_or(CommandError::UserNotFound)?;
        u.balance = u.balance.checked_sub(amount).ok_or(CommandError::Internal)?;
        Ok(())
    }

    // ---- rooms ----

    pub fn find_room(&self, room_id: u32) -> Option<&Room> {
        room_id
            .checked_sub(1)
            .and_then(|i| self.state.rooms.get(i as usize))
    }

    pub fn find_room_mut(&mut self, room_id: u32) -> Option<&mut Room> {
        room_id
            .checked_sub(1)
            .and_then(|i| self.state.rooms.get_mut(i as usize))
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.state.rooms.iter()
    }

    pub fn room_ids(&self) -> Vec<u32> {
        self.state.rooms.iter().map(|r| r.room_id).collect()
    }

    pub fn append_room(&mut self, mut room: Room) -> Result<u32, CommandError> {
        if self.state.rooms.len() >= self.limits.max_rooms {
            return Err(CommandError::DatabaseFull);
        }
        let room_id = self.state.rooms.len() as u32 + 1;
        room.room_id = room_id;
        self.state.rooms.push(room);
        Ok(room_id)
    }

    // ---- auctions ----

    pub fn find_auction(&self, auction_id: u32) -> Option<&Auction> {
        auction_id
            .checked_sub(1)
            .and_then(|i| self.state.auctions.get(i as usize))
    }

    pub fn find_auction_mut(&mut self, auction_id: u32) -> Option<&mut Auction> {
        auction_id
            .checked_sub(1)
            .and_then(|i| self.state.auctions.get_mut(i as usize))
    }

    pub fn auctions(&self) -> impl Iterator<Item = &Auction> {
        self.state.auctions.iter()
    }

    pub fn auction_ids(&self) -> Vec<u32> {
        self.state.auctions.iter().map(|a| a.auction_id).collect()
    }

    pub fn append_auction(&mut self, mut auction: Auction) -> Result<u32, CommandError> {
        if self.state.auctions.len() >= self.limits.max_auctions {
            return Err(CommandError::DatabaseFull);
        }
        let auction_id = self.state.auctions.len() as u32 + 1;
        auction.auction_id = auction_id;
        self.state.auctions.push(auction);
        Ok(auction_id)
    }

    // ---- bids ----

    pub fn can_append_bid(&self) -> bool {
        self.state.bids.len() < self.limits.max_bids
    }

    pub fn append_bid(&mut self, mut bid: Bid) -> Result<u32, CommandError> {
        if !self.can_append_bid() {
            return Err(CommandError::DatabaseFull);
        }
        let bid_id = self.state.bids.len() as u32 + 1;
        bid.bid_id = bid_id;
        self.state.bids.push(bid);
        Ok(bid_id)
    }

    /// Bids for one auction, newest first.
    pub fn bids_for_auction(&self, auction_id: u32) -> Vec<&Bid> {
        self.state
            .bids
            .iter()
            .rev()
            .filter(|b| b.auction_id == auction_id)
            .collect()
    }

    pub fn user_has_bid_on(&self, uid: u32, auction_id: u32) -> bool {
        self.state
            .bids
            .iter()
            .any(|b| b.bidder_uid == uid && b.auction_id == auction_id)
    }
}
