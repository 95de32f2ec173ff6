pub mod auctions;
pub mod rooms;
