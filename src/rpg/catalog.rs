//! Static game catalogs: races, items, drop tables, recipes, monsters and
//! tunable settings. Loaded once at startup from JSON seed files under
//! `data/seeds/` so operators can rebalance the game without recompiling,
//! with a built-in fallback catalog used by `init` and the test suite.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::rpg::errors::RpgError;

/// One version tier of a race. Tiers are ordered; a player advances to the
/// next tier automatically once their level meets `level_required`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaceVersion {
    pub id: String,
    pub level_required: u32,
    #[serde(default)]
    pub health_bonus: u32,
    #[serde(default)]
    pub attack_bonus: u32,
    #[serde(default)]
    pub defense_bonus: u32,
    #[serde(default)]
    pub speed_bonus: u32,
}

/// Which end of the health bar a guard rule watches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Low,
    High,
}

/// Conditional damage reduction: when the player's health fraction is in the
/// configured band, incoming foe power is reduced by `reduction_pct`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuardRule {
    pub band: HealthBand,
    /// Health percentage threshold (0-100).
    pub threshold_pct: u32,
    /// Foe power reduction percentage (0-100).
    pub reduction_pct: u32,
}

/// Race-specific defeat escape: when a lost battle began with the player's
/// health at or above `health_above_pct`, the usual money penalty is waived
/// and the player survives at one health.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevivalRule {
    pub health_above_pct: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaceDef {
    pub name: String,
    pub description: String,
    pub passive: String,
    pub special: String,
    #[serde(default = "default_multiplier")]
    pub exp_multiplier: f64,
    #[serde(default = "default_multiplier")]
    pub power_multiplier: f64,
    #[serde(default)]
    pub guard: Option<GuardRule>,
    #[serde(default)]
    pub revival: Option<RevivalRule>,
    pub versions: Vec<RaceVersion>,
}

fn default_multiplier() -> f64 {
    1.0
}

impl RaceDef {
    pub fn version(&self, index: usize) -> Option<&RaceVersion> {
        self.versions.get(index)
    }
}

/// One catalog item. Category-specific attributes are optional and default
/// to zero; `damage` only means something on weapons, `restore` on potions,
/// and so on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDef {
    pub name: String,
    #[serde(default)]
    pub buy_price: i64,
    #[serde(default)]
    pub sell_price: i64,
    #[serde(default)]
    pub tier: u8,
    #[serde(default)]
    pub damage: u32,
    #[serde(default)]
    pub defense: u32,
    #[serde(default)]
    pub attack: u32,
    #[serde(default)]
    pub restore: u32,
    #[serde(default)]
    pub hunger: u32,
    #[serde(default)]
    pub energy: u32,
    #[serde(default)]
    pub stamina: u32,
}

/// Item granted by a drop-table roll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropEntry {
    pub category: String,
    pub item: String,
    #[serde(default = "default_qty")]
    pub max_qty: u32,
}

fn default_qty() -> u32 {
    1
}

/// One tier of a drop table. Selection is cumulative over tier weights in
/// declaration order; `level_weight` adds to the base weight per player
/// level so higher tiers open up as players grow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropTier {
    pub weight: f64,
    #[serde(default)]
    pub level_weight: f64,
    #[serde(default)]
    pub money_min: i64,
    #[serde(default)]
    pub money_max: i64,
    #[serde(default)]
    pub drops: Vec<DropEntry>,
}

/// A timed gathering action: cooldown gate, resource costs, a drop table
/// and an experience range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionTable {
    #[serde(default)]
    pub stamina_cost: u32,
    #[serde(default)]
    pub hunger_cost: u32,
    #[serde(default)]
    pub skill: Option<String>,
    pub exp_min: u64,
    pub exp_max: u64,
    pub tiers: Vec<DropTier>,
}

/// A purchasable loot box. Money rewards vary ±20% around `money_base`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoxDef {
    pub tier: u8,
    pub money_base: i64,
    /// Chance in [0,1] that the box also yields an item drop.
    #[serde(default)]
    pub drop_chance: f64,
    #[serde(default)]
    pub drops: Vec<DropEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeMaterial {
    pub category: String,
    pub item: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    /// Category the crafted item lands in.
    pub category: String,
    pub output: String,
    #[serde(default = "default_qty")]
    pub output_qty: u32,
    pub materials: Vec<RecipeMaterial>,
    pub skill: String,
    pub skill_level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonsterDef {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub power: f64,
    pub exp_min: u64,
    pub exp_max: u64,
    pub money_min: i64,
    pub money_max: i64,
    /// Money lost on defeat (unless a race revival rule fires).
    #[serde(default)]
    pub defeat_penalty: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaceChance {
    pub race: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationDef {
    pub level: u32,
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyReward {
    pub money: i64,
    pub exp: u64,
}

/// Tunable game settings. Everything the progression formulas reference
/// lives here rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSettings {
    pub exp_base: u64,
    pub exp_multiplier: f64,
    pub max_level: u32,
    pub base_health: u32,
    pub base_attack: u32,
    pub base_defense: u32,
    pub base_stamina: u32,
    pub base_hunger: u32,
    pub base_energy: u32,
    pub starting_money: i64,
    /// Max-pool increases applied on every level-up.
    pub levelup_health: u32,
    pub levelup_stamina: u32,
    pub levelup_energy: u32,
    /// Per-action cooldown durations in seconds.
    #[serde(default)]
    pub cooldowns: HashMap<String, u64>,
    /// Used for any action without an explicit cooldown entry.
    #[serde(default = "default_cooldown_fallback")]
    pub cooldown_fallback_secs: u64,
    pub race_chances: Vec<RaceChance>,
    #[serde(default)]
    pub locations: HashMap<String, LocationDef>,
    pub starting_location: String,
    pub daily_reward: DailyReward,
    pub guild_cost: i64,
}

fn default_cooldown_fallback() -> u64 {
    60
}

impl GameSettings {
    pub fn cooldown_secs(&self, action: &str) -> u64 {
        self.cooldowns
            .get(action)
            .copied()
            .unwrap_or(self.cooldown_fallback_secs)
    }
}

/// Wrapper matching the layout of `game.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct GameSeed {
    settings: GameSettings,
    actions: HashMap<String, ActionTable>,
    boxes: HashMap<String, BoxDef>,
}

/// The full static catalog. Immutable after load; shared by reference
/// across the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub settings: GameSettings,
    pub races: HashMap<String, RaceDef>,
    pub items: HashMap<String, HashMap<String, ItemDef>>,
    pub actions: HashMap<String, ActionTable>,
    pub boxes: HashMap<String, BoxDef>,
    pub recipes: Vec<Recipe>,
    pub monsters: Vec<MonsterDef>,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RpgError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| RpgError::Catalog(format!("read {}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| RpgError::Catalog(format!("parse {}: {}", path.display(), e)))
}

impl Catalog {
    /// Load all seed files from a directory (races.json, items.json,
    /// game.json, recipes.json, monsters.json).
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, RpgError> {
        let dir = dir.as_ref();
        let races: HashMap<String, RaceDef> = load_json(&dir.join("races.json"))?;
        let items: HashMap<String, HashMap<String, ItemDef>> =
            load_json(&dir.join("items.json"))?;
        let game: GameSeed = load_json(&dir.join("game.json"))?;
        let recipes: Vec<Recipe> = load_json(&dir.join("recipes.json"))?;
        let monsters: Vec<MonsterDef> = load_json(&dir.join("monsters.json"))?;

        let catalog = Self {
            settings: game.settings,
            races,
            items,
            actions: game.actions,
            boxes: game.boxes,
            recipes,
            monsters,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Write the catalog back out as seed files (used by `init`).
    pub fn write_dir<P: AsRef<Path>>(&self, dir: P) -> Result<(), RpgError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| RpgError::Catalog(format!("create {}: {}", dir.display(), e)))?;
        let game = GameSeed {
            settings: self.settings.clone(),
            actions: self.actions.clone(),
            boxes: self.boxes.clone(),
        };
        write_json(&dir.join("races.json"), &self.races)?;
        write_json(&dir.join("items.json"), &self.items)?;
        write_json(&dir.join("game.json"), &game)?;
        write_json(&dir.join("recipes.json"), &self.recipes)?;
        write_json(&dir.join("monsters.json"), &self.monsters)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), RpgError> {
        if self.settings.race_chances.is_empty() {
            return Err(RpgError::Catalog("race_chances is empty".into()));
        }
        for chance in &self.settings.race_chances {
            let race = self
                .races
                .get(&chance.race)
                .ok_or_else(|| RpgError::Catalog(format!("unknown race: {}", chance.race)))?;
            if race.versions.is_empty() {
                return Err(RpgError::Catalog(format!(
                    "race {} has no version tiers",
                    chance.race
                )));
            }
        }
        for recipe in &self.recipes {
            if self.item(&recipe.category, &recipe.output).is_none() {
                return Err(RpgError::Catalog(format!(
                    "recipe {} outputs unknown item {}/{}",
                    recipe.id, recipe.category, recipe.output
                )));
            }
        }
        for (name, table) in &self.actions {
            if table.tiers.is_empty() {
                return Err(RpgError::Catalog(format!("action {} has no tiers", name)));
            }
            if table.exp_min > table.exp_max {
                return Err(RpgError::Catalog(format!(
                    "action {} has exp_min > exp_max",
                    name
                )));
            }
            for tier in &table.tiers {
                self.validate_drops(&tier.drops, &format!("action {}", name))?;
            }
        }
        for (name, def) in &self.boxes {
            self.validate_drops(&def.drops, &format!("box {}", name))?;
        }
        for monster in &self.monsters {
            if monster.exp_min > monster.exp_max || monster.money_min > monster.money_max {
                return Err(RpgError::Catalog(format!(
                    "monster {} has an inverted reward range",
                    monster.id
                )));
            }
        }
        Ok(())
    }

    fn validate_drops(&self, drops: &[DropEntry], owner: &str) -> Result<(), RpgError> {
        for drop in drops {
            if self.item(&drop.category, &drop.item).is_none() {
                return Err(RpgError::Catalog(format!(
                    "{} drops unknown item {}/{}",
                    owner, drop.category, drop.item
                )));
            }
        }
        Ok(())
    }

    pub fn item(&self, category: &str, item: &str) -> Option<&ItemDef> {
        self.items.get(category).and_then(|c| c.get(item))
    }

    pub fn race(&self, name: &str) -> Option<&RaceDef> {
        self.races.get(name)
    }

    pub fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    pub fn monster(&self, id: &str) -> Option<&MonsterDef> {
        self.monsters.iter().find(|m| m.id == id)
    }

    /// Built-in catalog used by `init` to write the first seed files and by
    /// tests that don't want filesystem fixtures.
    pub fn builtin() -> Self {
        builtin::catalog()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RpgError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| RpgError::Catalog(format!("serialize {}: {}", path.display(), e)))?;
    std::fs::write(path, text)
        .map_err(|e| RpgError::Catalog(format!("write {}: {}", path.display(), e)))
}

/// Cumulative-threshold weighted pick: walk the weights in order subtracting
/// each from `roll` until it drops to zero or below. `roll` must be drawn
/// uniformly from `[0, total_weight)`; the final index is returned as a
/// fallback against floating point drift.
pub fn cumulative_pick(weights: &[f64], mut roll: f64) -> usize {
    for (i, w) in weights.iter().enumerate() {
        roll -= w;
        if roll <= 0.0 {
            return i;
        }
    }
    weights.len().saturating_sub(1)
}

mod builtin {
    use super::*;

    fn race_version(id: &str, level: u32, hp: u32, atk: u32, def: u32, spd: u32) -> RaceVersion {
        RaceVersion {
            id: id.to_string(),
            level_required: level,
            health_bonus: hp,
            attack_bonus: atk,
            defense_bonus: def,
            speed_bonus: spd,
        }
    }

    fn item(name: &str, buy: i64, sell: i64, tier: u8) -> ItemDef {
        ItemDef {
            name: name.to_string(),
            buy_price: buy,
            sell_price: sell,
            tier,
            damage: 0,
            defense: 0,
            attack: 0,
            restore: 0,
            hunger: 0,
            energy: 0,
            stamina: 0,
        }
    }

    fn races() -> HashMap<String, RaceDef> {
        let mut races = HashMap::new();
        races.insert(
            "human".to_string(),
            RaceDef {
                name: "Human".to_string(),
                description: "Adaptable and quick to learn.".to_string(),
                passive: "Gains 10% bonus experience from every source.".to_string(),
                special: "Second Wind: shrugs off defeat when entering battle at full strength."
                    .to_string(),
                exp_multiplier: 1.1,
                power_multiplier: 1.0,
                guard: None,
                revival: Some(RevivalRule {
                    health_above_pct: 95,
                }),
                versions: vec![
                    race_version("v1", 1, 0, 5, 0, 5),
                    race_version("v2", 15, 20, 12, 5, 8),
                    race_version("v3", 40, 50, 25, 12, 12),
                ],
            },
        );
        races.insert(
            "elf".to_string(),
            RaceDef {
                name: "Elf".to_string(),
                description: "Graceful forest dwellers with uncanny reflexes.".to_string(),
                passive: "Evades harder when healthy.".to_string(),
                special: "High Guard: reduces enemy power by 25% above 70% health.".to_string(),
                exp_multiplier: 1.0,
                power_multiplier: 1.05,
                guard: Some(GuardRule {
                    band: HealthBand::High,
                    threshold_pct: 70,
                    reduction_pct: 25,
                }),
                revival: None,
                versions: vec![
                    race_version("v1", 1, 0, 3, 2, 10),
                    race_version("v2", 18, 15, 8, 8, 16),
                    race_version("v3", 45, 40, 18, 18, 24),
                ],
            },
        );
        races.insert(
            "orc".to_string(),
            RaceDef {
                name: "Orc".to_string(),
                description: "Brutal warriors that fight hardest when wounded.".to_string(),
                passive: "Rage: reduces enemy power by 30% below 30% health.".to_string(),
                special: "Bloodied Fury.".to_string(),
                exp_multiplier: 0.95,
                power_multiplier: 1.15,
                guard: Some(GuardRule {
                    band: HealthBand::Low,
                    threshold_pct: 30,
                    reduction_pct: 30,
                }),
                revival: None,
                versions: vec![
                    race_version("v1", 1, 20, 8, 3, 0),
                    race_version("v2", 20, 45, 18, 8, 2),
                    race_version("v3", 50, 90, 35, 16, 4),
                ],
            },
        );
        races.insert(
            "dragonkin".to_string(),
            RaceDef {
                name: "Dragonkin".to_string(),
                description: "Rare scaled folk carrying a spark of dragonfire.".to_string(),
                passive: "Scales: flat power bonus.".to_string(),
                special: "Dragonheart: survives defeat when entering battle near full health."
                    .to_string(),
                exp_multiplier: 0.9,
                power_multiplier: 1.25,
                guard: None,
                revival: Some(RevivalRule {
                    health_above_pct: 90,
                }),
                versions: vec![
                    race_version("v1", 1, 10, 10, 5, 3),
                    race_version("v2", 25, 40, 22, 12, 6),
                    race_version("v3", 60, 100, 45, 25, 10),
                ],
            },
        );
        races
    }

    fn items() -> HashMap<String, HashMap<String, ItemDef>> {
        let mut items: HashMap<String, HashMap<String, ItemDef>> = HashMap::new();

        let mut weapons = HashMap::new();
        weapons.insert("wooden_sword".to_string(), {
            let mut i = item("Wooden Sword", 150, 40, 1);
            i.damage = 5;
            i
        });
        weapons.insert("iron_sword".to_string(), {
            let mut i = item("Iron Sword", 1200, 400, 2);
            i.damage = 15;
            i
        });
        weapons.insert("steel_sword".to_string(), {
            let mut i = item("Steel Sword", 5000, 1800, 3);
            i.damage = 30;
            i
        });
        weapons.insert("dragon_blade".to_string(), {
            let mut i = item("Dragon Blade", 50000, 20000, 5);
            i.damage = 80;
            i
        });
        items.insert("weapon".to_string(), weapons);

        let mut armor = HashMap::new();
        armor.insert("leather_armor".to_string(), {
            let mut i = item("Leather Armor", 300, 90, 1);
            i.defense = 5;
            i
        });
        armor.insert("iron_armor".to_string(), {
            let mut i = item("Iron Armor", 2000, 700, 2);
            i.defense = 15;
            i
        });
        armor.insert("steel_armor".to_string(), {
            let mut i = item("Steel Armor", 8000, 3000, 3);
            i.defense = 30;
            i
        });
        items.insert("armor".to_string(), armor);

        let mut accessories = HashMap::new();
        accessories.insert("lucky_charm".to_string(), {
            let mut i = item("Lucky Charm", 800, 250, 1);
            i.attack = 3;
            i.defense = 3;
            i
        });
        accessories.insert("power_ring".to_string(), {
            let mut i = item("Power Ring", 6000, 2200, 3);
            i.attack = 12;
            i.defense = 8;
            i
        });
        items.insert("accessory".to_string(), accessories);

        let mut potions = HashMap::new();
        potions.insert("health_potion".to_string(), {
            let mut i = item("Health Potion", 200, 60, 1);
            i.restore = 40;
            i
        });
        potions.insert("greater_potion".to_string(), {
            let mut i = item("Greater Potion", 900, 300, 2);
            i.restore = 120;
            i
        });
        items.insert("potion".to_string(), potions);

        let mut food = HashMap::new();
        food.insert("bread".to_string(), {
            let mut i = item("Bread", 50, 10, 1);
            i.hunger = 20;
            i.energy = 5;
            i
        });
        food.insert("grilled_fish".to_string(), {
            let mut i = item("Grilled Fish", 150, 45, 1);
            i.hunger = 35;
            i.energy = 15;
            i
        });
        food.insert("steak".to_string(), {
            let mut i = item("Steak", 400, 120, 2);
            i.hunger = 60;
            i.energy = 25;
            i
        });
        items.insert("food".to_string(), food);

        let mut drinks = HashMap::new();
        drinks.insert("water".to_string(), {
            let mut i = item("Water", 20, 4, 1);
            i.energy = 10;
            i.stamina = 5;
            i
        });
        drinks.insert("energy_tonic".to_string(), {
            let mut i = item("Energy Tonic", 350, 100, 2);
            i.energy = 40;
            i.stamina = 25;
            i
        });
        items.insert("drink".to_string(), drinks);

        let mut materials = HashMap::new();
        for (id, name, sell, tier) in [
            ("wood", "Wood", 15, 1),
            ("iron_ore", "Iron Ore", 40, 1),
            ("iron_bar", "Iron Bar", 120, 2),
            ("steel_bar", "Steel Bar", 450, 3),
            ("gold_ore", "Gold Ore", 300, 3),
            ("magic_dust", "Magic Dust", 200, 2),
            ("raw_fish", "Raw Fish", 25, 1),
            ("pelt", "Pelt", 35, 1),
        ] {
            materials.insert(id.to_string(), item(name, 0, sell, tier));
        }
        items.insert("material".to_string(), materials);

        let mut boxes = HashMap::new();
        for (id, name, buy, tier) in [
            ("wooden_box", "Wooden Box", 500, 1),
            ("silver_box", "Silver Box", 2500, 2),
            ("golden_box", "Golden Box", 10000, 3),
        ] {
            boxes.insert(id.to_string(), item(name, buy, buy / 4, tier));
        }
        items.insert("box".to_string(), boxes);

        items
    }

    fn drop_entry(category: &str, item: &str, max_qty: u32) -> DropEntry {
        DropEntry {
            category: category.to_string(),
            item: item.to_string(),
            max_qty,
        }
    }

    fn actions() -> HashMap<String, ActionTable> {
        let mut actions = HashMap::new();
        actions.insert(
            "hunt".to_string(),
            ActionTable {
                stamina_cost: 15,
                hunger_cost: 10,
                skill: Some("combat".to_string()),
                exp_min: 20,
                exp_max: 60,
                tiers: vec![
                    DropTier {
                        weight: 60.0,
                        level_weight: 0.0,
                        money_min: 50,
                        money_max: 150,
                        drops: vec![drop_entry("material", "pelt", 2)],
                    },
                    DropTier {
                        weight: 30.0,
                        level_weight: 0.2,
                        money_min: 150,
                        money_max: 400,
                        drops: vec![drop_entry("material", "pelt", 4), drop_entry("food", "steak", 1)],
                    },
                    DropTier {
                        weight: 10.0,
                        level_weight: 0.5,
                        money_min: 400,
                        money_max: 1000,
                        drops: vec![drop_entry("box", "wooden_box", 1)],
                    },
                ],
            },
        );
        actions.insert(
            "mine".to_string(),
            ActionTable {
                stamina_cost: 20,
                hunger_cost: 12,
                skill: Some("mining".to_string()),
                exp_min: 25,
                exp_max: 70,
                tiers: vec![
                    DropTier {
                        weight: 65.0,
                        level_weight: 0.0,
                        money_min: 30,
                        money_max: 100,
                        drops: vec![drop_entry("material", "iron_ore", 3)],
                    },
                    DropTier {
                        weight: 25.0,
                        level_weight: 0.3,
                        money_min: 100,
                        money_max: 250,
                        drops: vec![drop_entry("material", "iron_ore", 5), drop_entry("material", "magic_dust", 1)],
                    },
                    DropTier {
                        weight: 10.0,
                        level_weight: 0.6,
                        money_min: 250,
                        money_max: 600,
                        drops: vec![drop_entry("material", "gold_ore", 2)],
                    },
                ],
            },
        );
        actions.insert(
            "fish".to_string(),
            ActionTable {
                stamina_cost: 10,
                hunger_cost: 8,
                skill: Some("fishing".to_string()),
                exp_min: 15,
                exp_max: 45,
                tiers: vec![
                    DropTier {
                        weight: 70.0,
                        level_weight: 0.0,
                        money_min: 20,
                        money_max: 80,
                        drops: vec![drop_entry("material", "raw_fish", 3)],
                    },
                    DropTier {
                        weight: 30.0,
                        level_weight: 0.4,
                        money_min: 80,
                        money_max: 220,
                        drops: vec![drop_entry("material", "raw_fish", 6)],
                    },
                ],
            },
        );
        actions.insert(
            "chop".to_string(),
            ActionTable {
                stamina_cost: 15,
                hunger_cost: 10,
                skill: Some("woodcutting".to_string()),
                exp_min: 20,
                exp_max: 55,
                tiers: vec![
                    DropTier {
                        weight: 75.0,
                        level_weight: 0.0,
                        money_min: 25,
                        money_max: 90,
                        drops: vec![drop_entry("material", "wood", 4)],
                    },
                    DropTier {
                        weight: 25.0,
                        level_weight: 0.3,
                        money_min: 90,
                        money_max: 240,
                        drops: vec![drop_entry("material", "wood", 8)],
                    },
                ],
            },
        );
        actions.insert(
            "explore".to_string(),
            ActionTable {
                stamina_cost: 25,
                hunger_cost: 15,
                skill: None,
                exp_min: 40,
                exp_max: 120,
                tiers: vec![
                    DropTier {
                        weight: 50.0,
                        level_weight: 0.0,
                        money_min: 100,
                        money_max: 300,
                        drops: vec![],
                    },
                    DropTier {
                        weight: 35.0,
                        level_weight: 0.3,
                        money_min: 300,
                        money_max: 800,
                        drops: vec![drop_entry("material", "magic_dust", 2)],
                    },
                    DropTier {
                        weight: 15.0,
                        level_weight: 0.5,
                        money_min: 800,
                        money_max: 2000,
                        drops: vec![drop_entry("box", "silver_box", 1)],
                    },
                ],
            },
        );
        actions.insert(
            "train".to_string(),
            ActionTable {
                stamina_cost: 30,
                hunger_cost: 20,
                skill: Some("combat".to_string()),
                exp_min: 80,
                exp_max: 200,
                tiers: vec![DropTier {
                    weight: 100.0,
                    level_weight: 0.0,
                    money_min: 0,
                    money_max: 0,
                    drops: vec![],
                }],
            },
        );
        actions
    }

    fn boxes() -> HashMap<String, BoxDef> {
        let mut boxes = HashMap::new();
        boxes.insert(
            "wooden_box".to_string(),
            BoxDef {
                tier: 1,
                money_base: 400,
                drop_chance: 0.3,
                drops: vec![
                    drop_entry("potion", "health_potion", 2),
                    drop_entry("material", "iron_bar", 2),
                ],
            },
        );
        boxes.insert(
            "silver_box".to_string(),
            BoxDef {
                tier: 2,
                money_base: 2200,
                drop_chance: 0.5,
                drops: vec![
                    drop_entry("potion", "greater_potion", 1),
                    drop_entry("material", "steel_bar", 2),
                    drop_entry("accessory", "lucky_charm", 1),
                ],
            },
        );
        boxes.insert(
            "golden_box".to_string(),
            BoxDef {
                tier: 3,
                money_base: 9000,
                drop_chance: 0.7,
                drops: vec![
                    drop_entry("weapon", "steel_sword", 1),
                    drop_entry("accessory", "power_ring", 1),
                    drop_entry("material", "gold_ore", 3),
                ],
            },
        );
        boxes
    }

    fn recipes() -> Vec<Recipe> {
        vec![
            Recipe {
                id: "iron_bar".to_string(),
                name: "Iron Bar".to_string(),
                category: "material".to_string(),
                output: "iron_bar".to_string(),
                output_qty: 1,
                materials: vec![RecipeMaterial {
                    category: "material".to_string(),
                    item: "iron_ore".to_string(),
                    quantity: 2,
                }],
                skill: "crafting".to_string(),
                skill_level: 1,
            },
            Recipe {
                id: "iron_sword".to_string(),
                name: "Iron Sword".to_string(),
                category: "weapon".to_string(),
                output: "iron_sword".to_string(),
                output_qty: 1,
                materials: vec![RecipeMaterial {
                    category: "material".to_string(),
                    item: "iron_bar".to_string(),
                    quantity: 3,
                }],
                skill: "crafting".to_string(),
                skill_level: 2,
            },
            Recipe {
                id: "steel_sword".to_string(),
                name: "Steel Sword".to_string(),
                category: "weapon".to_string(),
                output: "steel_sword".to_string(),
                output_qty: 1,
                materials: vec![RecipeMaterial {
                    category: "material".to_string(),
                    item: "steel_bar".to_string(),
                    quantity: 5,
                }],
                skill: "crafting".to_string(),
                skill_level: 3,
            },
            Recipe {
                id: "health_potion".to_string(),
                name: "Health Potion".to_string(),
                category: "potion".to_string(),
                output: "health_potion".to_string(),
                output_qty: 1,
                materials: vec![RecipeMaterial {
                    category: "material".to_string(),
                    item: "magic_dust".to_string(),
                    quantity: 2,
                }],
                skill: "crafting".to_string(),
                skill_level: 1,
            },
            Recipe {
                id: "grilled_fish".to_string(),
                name: "Grilled Fish".to_string(),
                category: "food".to_string(),
                output: "grilled_fish".to_string(),
                output_qty: 1,
                materials: vec![RecipeMaterial {
                    category: "material".to_string(),
                    item: "raw_fish".to_string(),
                    quantity: 1,
                }],
                skill: "cooking".to_string(),
                skill_level: 1,
            },
        ]
    }

    fn monsters() -> Vec<MonsterDef> {
        vec![
            MonsterDef {
                id: "slime".to_string(),
                name: "Slime".to_string(),
                level: 1,
                power: 20.0,
                exp_min: 15,
                exp_max: 40,
                money_min: 30,
                money_max: 100,
                defeat_penalty: 50,
            },
            MonsterDef {
                id: "wolf".to_string(),
                name: "Dire Wolf".to_string(),
                level: 5,
                power: 60.0,
                exp_min: 50,
                exp_max: 120,
                money_min: 100,
                money_max: 300,
                defeat_penalty: 200,
            },
            MonsterDef {
                id: "goblin".to_string(),
                name: "Goblin Raider".to_string(),
                level: 10,
                power: 120.0,
                exp_min: 120,
                exp_max: 280,
                money_min: 250,
                money_max: 700,
                defeat_penalty: 500,
            },
            MonsterDef {
                id: "troll".to_string(),
                name: "Cave Troll".to_string(),
                level: 20,
                power: 300.0,
                exp_min: 350,
                exp_max: 800,
                money_min: 800,
                money_max: 2000,
                defeat_penalty: 1500,
            },
            MonsterDef {
                id: "dragon".to_string(),
                name: "Elder Dragon".to_string(),
                level: 45,
                power: 1200.0,
                exp_min: 2000,
                exp_max: 5000,
                money_min: 5000,
                money_max: 15000,
                defeat_penalty: 8000,
            },
        ]
    }

    pub fn catalog() -> Catalog {
        let mut cooldowns = HashMap::new();
        for (action, secs) in [
            ("hunt", 30u64),
            ("mine", 60),
            ("fish", 40),
            ("chop", 50),
            ("explore", 80),
            ("train", 70),
            ("duel", 60),
            ("gamble", 30),
            ("craft", 30),
            ("daily", 86_400),
            ("battle", 45),
        ] {
            cooldowns.insert(action.to_string(), secs);
        }

        let mut locations = HashMap::new();
        for (id, level, cost) in [
            ("village", 1u32, 0i64),
            ("forest", 5, 100),
            ("mine", 10, 500),
            ("mountain", 15, 1000),
            ("dungeon", 20, 2000),
            ("city", 25, 5000),
        ] {
            locations.insert(id.to_string(), LocationDef { level, cost });
        }

        Catalog {
            settings: GameSettings {
                exp_base: 100,
                exp_multiplier: 1.5,
                max_level: 100,
                base_health: 100,
                base_attack: 10,
                base_defense: 5,
                base_stamina: 100,
                base_hunger: 100,
                base_energy: 100,
                starting_money: 100_000,
                levelup_health: 10,
                levelup_stamina: 5,
                levelup_energy: 8,
                cooldowns,
                cooldown_fallback_secs: 60,
                race_chances: vec![
                    RaceChance {
                        race: "human".to_string(),
                        weight: 55.0,
                    },
                    RaceChance {
                        race: "elf".to_string(),
                        weight: 25.0,
                    },
                    RaceChance {
                        race: "orc".to_string(),
                        weight: 15.0,
                    },
                    RaceChance {
                        race: "dragonkin".to_string(),
                        weight: 5.0,
                    },
                ],
                locations,
                starting_location: "village".to_string(),
                daily_reward: DailyReward {
                    money: 1000,
                    exp: 100,
                },
                guild_cost: 10_000,
            },
            races: races(),
            items: items(),
            actions: actions(),
            boxes: boxes(),
            recipes: recipes(),
            monsters: monsters(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_validates() {
        let catalog = Catalog::builtin();
        assert!(catalog.validate().is_ok());
        assert!(catalog.race("human").is_some());
        assert!(catalog.item("weapon", "iron_sword").is_some());
        assert!(catalog.recipe("iron_sword").is_some());
        assert!(catalog.monster("slime").is_some());
    }

    #[test]
    fn cumulative_pick_walks_in_order() {
        let weights = [50.0, 30.0, 20.0];
        assert_eq!(cumulative_pick(&weights, 0.0), 0);
        assert_eq!(cumulative_pick(&weights, 49.9), 0);
        assert_eq!(cumulative_pick(&weights, 50.1), 1);
        assert_eq!(cumulative_pick(&weights, 79.9), 1);
        assert_eq!(cumulative_pick(&weights, 80.1), 2);
        // Out-of-range rolls clamp to the last tier.
        assert_eq!(cumulative_pick(&weights, 150.0), 2);
    }

    #[test]
    fn validate_rejects_an_action_without_tiers() {
        let mut catalog = Catalog::builtin();
        catalog
            .actions
            .get_mut("hunt")
            .expect("hunt table")
            .tiers
            .clear();
        assert!(matches!(catalog.validate(), Err(RpgError::Catalog(_))));

        // The rejection also holds when the broken table arrives via seed
        // files instead of code.
        let dir = tempfile::tempdir().expect("tempdir");
        catalog.write_dir(dir.path()).expect("write seeds");
        assert!(matches!(
            Catalog::load_dir(dir.path()),
            Err(RpgError::Catalog(_))
        ));
    }

    #[test]
    fn validate_rejects_inverted_reward_ranges() {
        let mut catalog = Catalog::builtin();
        let table = catalog.actions.get_mut("fish").expect("fish table");
        table.exp_min = table.exp_max + 1;
        assert!(matches!(catalog.validate(), Err(RpgError::Catalog(_))));

        let mut catalog = Catalog::builtin();
        let monster = &mut catalog.monsters[0];
        monster.money_min = monster.money_max + 1;
        assert!(matches!(catalog.validate(), Err(RpgError::Catalog(_))));
    }

    #[test]
    fn validate_rejects_drops_of_unknown_items() {
        let mut catalog = Catalog::builtin();
        catalog.actions.get_mut("mine").expect("mine table").tiers[0]
            .drops
            .push(DropEntry {
                category: "material".to_string(),
                item: "unobtainium".to_string(),
                max_qty: 1,
            });
        assert!(matches!(catalog.validate(), Err(RpgError::Catalog(_))));

        let mut catalog = Catalog::builtin();
        catalog
            .boxes
            .get_mut("wooden_box")
            .expect("box")
            .drops
            .push(DropEntry {
                category: "relic".to_string(),
                item: "grail".to_string(),
                max_qty: 1,
            });
        assert!(matches!(catalog.validate(), Err(RpgError::Catalog(_))));
    }

    #[test]
    fn cooldown_lookup_falls_back() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.settings.cooldown_secs("hunt"), 30);
        assert_eq!(
            catalog.settings.cooldown_secs("unknown_action"),
            catalog.settings.cooldown_fallback_secs
        );
    }

    #[test]
    fn seed_round_trip_via_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = Catalog::builtin();
        catalog.write_dir(dir.path()).expect("write seeds");
        let loaded = Catalog::load_dir(dir.path()).expect("load seeds");
        assert_eq!(loaded.settings, catalog.settings);
        assert_eq!(loaded.recipes, catalog.recipes);
        assert_eq!(loaded.races.len(), catalog.races.len());
    }
}
