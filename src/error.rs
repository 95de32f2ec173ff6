use thiserror::Error;

/// Closed taxonomy of command failures. The `Display` string of each variant
/// is exactly the human reason carried in a `<CMD>_FAIL|<reason>` frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    // Preconditions
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Not in any room")]
    NotInRoom,
    #[error("Not room creator")]
    NotRoomCreator,
    #[error("Not in this room")]
    NotInThisRoom,
    #[error("Session mismatch")]
    SessionMismatch,
    #[error("Already logged in")]
    AlreadyLoggedIn,
    #[error("Already in a room")]
    AlreadyInRoom,

    // Validation
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Username too long")]
    UsernameTooLong,
    #[error("Room name already exists")]
    RoomNameTaken,
    #[error("Bid too low")]
    BidTooLow,
    #[error("Cannot bid on own auction")]
    SelfBid,
    #[error("Invalid number")]
    InvalidNumber,

    // Resource
    #[error("Database full")]
    DatabaseFull,
    #[error("Room full")]
    RoomFull,
    #[error("Insufficient balance")]
    InsufficientBalance,

    // Lifecycle
    #[error("Auction not active")]
    AuctionNotActive,
    #[error("Auction not found")]
    AuctionNotFound,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room ended")]
    RoomEnded,
    #[error("User not found")]
    UserNotFound,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Account disabled")]
    AccountDisabled,
    #[error("Buy now not available")]
    BuyNowUnavailable,

    // Fatal server-side failures surfaced to the caller; the server stays up.
    #[error("Internal")]
    Internal,
}
