use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const USER_SCHEMA_VERSION: u8 = 1;
pub const DOCUMENT_SCHEMA_VERSION: u8 = 1;

/// Equipment slots a player can fill. These double as the only item
/// categories accepted by the equip operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Armor,
    Accessory,
}

impl EquipSlot {
    pub fn from_category(category: &str) -> Option<Self> {
        match category {
            "weapon" => Some(Self::Weapon),
            "armor" => Some(Self::Armor),
            "accessory" => Some(Self::Accessory),
            _ => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::Accessory => "accessory",
        }
    }
}

/// Currently equipped item ids, one per slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Equipment {
    pub weapon: Option<String>,
    pub armor: Option<String>,
    pub accessory: Option<String>,
}

impl Equipment {
    pub fn slot(&self, slot: EquipSlot) -> &Option<String> {
        match slot {
            EquipSlot::Weapon => &self.weapon,
            EquipSlot::Armor => &self.armor,
            EquipSlot::Accessory => &self.accessory,
        }
    }

    pub fn slot_mut(&mut self, slot: EquipSlot) -> &mut Option<String> {
        match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
            EquipSlot::Accessory => &mut self.accessory,
        }
    }
}

/// Current and maximum resource pools plus derived combat stats.
/// Attack/defense/speed are recomputed from race bonuses and equipment
/// whenever either changes; the pools are clamped to their maxima.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatBlock {
    pub health: u32,
    pub max_health: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
    pub stamina: u32,
    pub max_stamina: u32,
    pub hunger: u32,
    pub max_hunger: u32,
    pub energy: u32,
    pub max_energy: u32,
}

impl StatBlock {
    /// Fully restore every pool to its maximum.
    pub fn refill(&mut self) {
        self.health = self.max_health;
        self.stamina = self.max_stamina;
        self.hunger = self.max_hunger;
        self.energy = self.max_energy;
    }
}

/// Inventory: category name -> item id -> quantity. Entries are sparse;
/// an item appears only after it is first gained and is pruned at zero.
pub type Inventory = HashMap<String, HashMap<String, u32>>;

/// One player record. All engine operations read and mutate these inside
/// the shared [`RpgDocument`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every interaction; drives passive regen/decay.
    pub last_action: DateTime<Utc>,
    pub level: u32,
    pub exp: u64,
    pub money: i64,
    pub race: String,
    /// Index into the race's ordered version tiers (0 = v1).
    pub race_version: usize,
    pub stats: StatBlock,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub skills: HashMap<String, u32>,
    /// Last-use timestamp per timed action. Persisted with the record so
    /// cooldowns survive process restarts.
    #[serde(default)]
    pub cooldowns: HashMap<String, DateTime<Utc>>,
    pub location: String,
    #[serde(default)]
    pub guild: Option<String>,
    pub schema_version: u8,
}

impl UserRecord {
    pub fn touch(&mut self) {
        self.last_action = Utc::now();
    }

    /// Quantity of an item currently held (0 when absent).
    pub fn item_quantity(&self, category: &str, item: &str) -> u32 {
        self.inventory
            .get(category)
            .and_then(|items| items.get(item))
            .copied()
            .unwrap_or(0)
    }

    /// Version label in the `v1`, `v2`, ... form used by catalogs and replies.
    pub fn version_label(&self) -> String {
        format!("v{}", self.race_version + 1)
    }
}

/// A player-founded guild. Membership is also mirrored on each member's
/// `guild` field for cheap lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuildRecord {
    pub name: String,
    pub leader: String,
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl GuildRecord {
    pub fn new(name: &str, leader: &str) -> Self {
        Self {
            name: name.to_string(),
            leader: leader.to_string(),
            members: vec![leader.to_string()],
            created_at: Utc::now(),
        }
    }
}

/// An item put up for sale on the player market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketListing {
    pub id: Uuid,
    pub seller: String,
    pub category: String,
    pub item: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub listed_at: DateTime<Utc>,
}

/// The entire persisted game state: one JSON document, overwritten whole on
/// every save. The engine serializes all mutations through one in-memory
/// copy of this structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpgDocument {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub guilds: Vec<GuildRecord>,
    #[serde(default)]
    pub listings: Vec<MarketListing>,
    pub schema_version: u8,
}

impl Default for RpgDocument {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            guilds: Vec::new(),
            listings: Vec::new(),
            schema_version: DOCUMENT_SCHEMA_VERSION,
        }
    }
}

impl RpgDocument {
    pub fn find_user(&self, id: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_user_mut(&mut self, id: &str) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| u.id == id)
    }
}

/// Result of an experience grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpGain {
    pub gained: u64,
    pub exp: u64,
    pub level: u32,
    pub leveled_up: bool,
    /// Set when a level-up also unlocked a new race version tier.
    pub version_upgraded: bool,
}

/// Result of a cooldown query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownStatus {
    pub ready: bool,
    pub remaining: std::time::Duration,
    pub total: std::time::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equip_slot_round_trips_categories() {
        for cat in ["weapon", "armor", "accessory"] {
            let slot = EquipSlot::from_category(cat).expect("known category");
            assert_eq!(slot.category(), cat);
        }
        assert!(EquipSlot::from_category("potion").is_none());
    }

    #[test]
    fn document_default_is_empty_with_current_schema() {
        let doc = RpgDocument::default();
        assert!(doc.users.is_empty());
        assert!(doc.guilds.is_empty());
        assert!(doc.listings.is_empty());
        assert_eq!(doc.schema_version, DOCUMENT_SCHEMA_VERSION);
    }

    #[test]
    fn version_label_is_one_based() {
        let mut doc = RpgDocument::default();
        doc.users.push(UserRecord {
            id: "u1".into(),
            display_name: "U1".into(),
            created_at: Utc::now(),
            last_action: Utc::now(),
            level: 1,
            exp: 0,
            money: 0,
            race: "human".into(),
            race_version: 2,
            stats: StatBlock {
                health: 100,
                max_health: 100,
                attack: 10,
                defense: 5,
                speed: 0,
                stamina: 100,
                max_stamina: 100,
                hunger: 100,
                max_hunger: 100,
                energy: 100,
                max_energy: 100,
            },
            inventory: HashMap::new(),
            equipment: Equipment::default(),
            skills: HashMap::new(),
            cooldowns: HashMap::new(),
            location: "village".into(),
            guild: None,
            schema_version: USER_SCHEMA_VERSION,
        });
        assert_eq!(doc.users[0].version_label(), "v3");
    }
}
