//! RPG progression engine: player records, the static catalog, a JSON
//! document store and the operations the chat command layer drives.
//! Formula-level logic lives in free functions over records; [`RpgEngine`]
//! wraps them in a lock-mutate-persist cycle so concurrent chat traffic
//! never interleaves mid-operation.

pub mod actions;
pub mod battle;
pub mod catalog;
pub mod economy;
pub mod engine;
pub mod errors;
pub mod inventory;
pub mod store;
pub mod types;

pub use actions::{ActionOutcome, BoxOutcome, DailyOutcome, DropReward};
pub use battle::{power, win_probability, BattleOutcome, DuelOutcome};
pub use catalog::{Catalog, GameSettings};
pub use economy::{CraftOutcome, GambleOutcome, TradeOutcome};
pub use engine::{
    required_exp, LeaderboardEntry, LeaderboardKind, RaceInfo, RetryPolicy, RpgEngine,
};
pub use errors::{RpgError, StoreError};
pub use inventory::ItemEffects;
pub use store::{DocumentStore, JsonFileStore, JsonFileStoreBuilder, MemoryStore};
pub use types::{
    CooldownStatus, EquipSlot, Equipment, ExpGain, GuildRecord, Inventory, MarketListing,
    RpgDocument, StatBlock, UserRecord,
};
