use std::time::Duration;

use thiserror::Error;

/// Errors raised by the document store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around IO errors (directory creation, file writes, locking).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON serialization and deserialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another process holds the exclusive lock on the game document.
    #[error("document locked by another process: {0}")]
    Locked(String),
}

/// Errors that can arise from progression engine operations.
///
/// Every engine operation surfaces failures synchronously through this type;
/// callers (the command router) turn them into player-facing replies. Nothing
/// here is retried internally except persistence, which gets a bounded number
/// of attempts before `Persistence` is returned.
#[derive(Debug, Error)]
pub enum RpgError {
    /// Operation referenced a player that has never registered.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Registration attempted for an id that already has a record.
    #[error("user already exists: {0}")]
    UserExists(String),

    /// Item or category absent from the catalog or the player's inventory.
    #[error("item not found: {category}/{item}")]
    ItemNotFound { category: String, item: String },

    /// Market listing id did not match any active listing.
    #[error("listing not found: {0}")]
    ListingNotFound(uuid::Uuid),

    /// Guild name did not match any guild.
    #[error("guild not found: {0}")]
    GuildNotFound(String),

    /// Balance too low for the requested spend.
    #[error("insufficient money: need {needed}, have {held}")]
    InsufficientMoney { needed: i64, held: i64 },

    /// Stamina pool too low for the requested action.
    #[error("insufficient stamina: need {needed}, have {held}")]
    InsufficientStamina { needed: u32, held: u32 },

    /// Inventory quantity too low for the requested removal.
    #[error("insufficient items: need {needed} {item}, have {held}")]
    InsufficientItems {
        item: String,
        needed: u32,
        held: u32,
    },

    /// Player level below a gate (travel, race version, recipe).
    #[error("level {required} required")]
    LevelRequired { required: u32 },

    /// Unknown category, recipe, location, race version or malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Timed action attempted before its cooldown elapsed. This is a
    /// structured "not yet" result rather than a hard failure; `remaining`
    /// tells the player how long to wait.
    #[error("{action} on cooldown for {}s", remaining.as_secs())]
    CooldownActive { action: String, remaining: Duration },

    /// Write to the backing store failed after the configured retries.
    #[error("persistence failure: {0}")]
    Persistence(#[source] StoreError),

    /// Catalog seed files missing or malformed at startup.
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl RpgError {
    /// True for the soft "come back later" result, which callers usually
    /// render differently from real errors.
    pub fn is_cooldown(&self) -> bool {
        matches!(self, RpgError::CooldownActive { .. })
    }
}
