//! The progression engine: owns the in-memory game document, serializes
//! every mutation through one async lock, and persists after each logical
//! operation with bounded retry.
//!
//! Formula-level helpers are free functions so they can be unit tested with
//! a pinned clock or rng; the [`RpgEngine`] methods wrap them in the
//! lock-mutate-persist cycle.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::metrics;
use crate::rpg::catalog::{cumulative_pick, Catalog, GameSettings, RaceVersion};
use crate::rpg::errors::RpgError;
use crate::rpg::inventory;
use crate::rpg::store::DocumentStore;
use crate::rpg::types::{
    CooldownStatus, Equipment, ExpGain, RpgDocument, StatBlock, UserRecord, USER_SCHEMA_VERSION,
};

/// Default starting levels for the fixed skill set.
pub const STARTING_SKILLS: [&str; 6] = [
    "mining",
    "fishing",
    "woodcutting",
    "crafting",
    "cooking",
    "combat",
];

/// How persistence failures are retried before surfacing
/// [`RpgError::Persistence`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

pub(crate) struct EngineInner<S> {
    pub(crate) store: S,
    pub(crate) doc: RpgDocument,
    pub(crate) rng: StdRng,
}

/// Progression engine over a pluggable document store.
pub struct RpgEngine<S: DocumentStore> {
    catalog: Catalog,
    retry: RetryPolicy,
    pub(crate) inner: Mutex<EngineInner<S>>,
}

/// Leaderboard orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardKind {
    Level,
    Money,
    Combat,
}

impl std::str::FromStr for LeaderboardKind {
    type Err = RpgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level" => Ok(Self::Level),
            "money" => Ok(Self::Money),
            "combat" => Ok(Self::Combat),
            other => Err(RpgError::InvalidArgument(format!(
                "unknown leaderboard: {} (level, money, combat)",
                other
            ))),
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub name: String,
    pub level: u32,
    pub money: i64,
    pub combat: u32,
    pub race: String,
}

/// Player race summary for replies.
#[derive(Debug, Clone)]
pub struct RaceInfo {
    pub race: String,
    pub name: String,
    pub description: String,
    pub passive: String,
    pub special: String,
    pub version: String,
    pub bonuses: RaceVersion,
    /// Next tier label and its level requirement, when one exists.
    pub next_version: Option<(String, u32)>,
}

// ---------------------------------------------------------------------------
// Pure formula helpers
// ---------------------------------------------------------------------------

/// Experience required to reach `level`: `floor(base * multiplier^(level-1))`.
/// Monotone non-decreasing for multiplier >= 1. Thresholds past `u64::MAX`
/// saturate; since a player's exp is itself a `u64`, levels above that point
/// are unreachable rather than wrapped.
pub fn required_exp(settings: &GameSettings, level: u32) -> u64 {
    let exponent = level.saturating_sub(1) as i32;
    let raw = settings.exp_base as f64 * settings.exp_multiplier.powi(exponent);
    if raw >= u64::MAX as f64 {
        u64::MAX
    } else {
        raw.floor() as u64
    }
}

/// Build a fresh record for `race` from base settings plus the race's v1
/// bonuses. Inventory starts sparse (empty) and cooldowns clear.
pub fn new_user(catalog: &Catalog, id: &str, name: &str, race: &str) -> UserRecord {
    let settings = &catalog.settings;
    let v1 = catalog.race(race).and_then(|r| r.version(0));
    let max_health = settings.base_health + v1.map_or(0, |v| v.health_bonus);
    let now = Utc::now();
    let mut user = UserRecord {
        id: id.to_string(),
        display_name: name.to_string(),
        created_at: now,
        last_action: now,
        level: 1,
        exp: 0,
        money: settings.starting_money,
        race: race.to_string(),
        race_version: 0,
        stats: StatBlock {
            health: max_health,
            max_health,
            attack: 0,
            defense: 0,
            speed: 0,
            stamina: settings.base_stamina,
            max_stamina: settings.base_stamina,
            hunger: settings.base_hunger,
            max_hunger: settings.base_hunger,
            energy: settings.base_energy,
            max_energy: settings.base_energy,
        },
        inventory: Default::default(),
        equipment: Equipment::default(),
        skills: STARTING_SKILLS
            .iter()
            .map(|s| (s.to_string(), 1))
            .collect(),
        cooldowns: Default::default(),
        location: settings.starting_location.clone(),
        guild: None,
        schema_version: USER_SCHEMA_VERSION,
    };
    inventory::recompute_combat_stats(&mut user, catalog);
    user
}

/// Apply an experience grant: race multiplier, accumulation, then repeated
/// level-ups while the next threshold is met and the cap allows. Each
/// level-up raises the max pools by the configured deltas, fully restores
/// them, and checks race-version eligibility.
pub fn grant_exp(user: &mut UserRecord, catalog: &Catalog, amount: u64) -> ExpGain {
    let settings = &catalog.settings;
    let multiplier = catalog.race(&user.race).map_or(1.0, |r| r.exp_multiplier);
    let gained = (amount as f64 * multiplier).round() as u64;
    user.exp = user.exp.saturating_add(gained);

    let mut leveled_up = false;
    let mut version_upgraded = false;
    while user.level < settings.max_level && user.exp >= required_exp(settings, user.level + 1) {
        user.level += 1;
        leveled_up = true;
        user.stats.max_health += settings.levelup_health;
        user.stats.max_stamina += settings.levelup_stamina;
        user.stats.max_energy += settings.levelup_energy;
        user.stats.health = user.stats.max_health;
        user.stats.stamina = user.stats.max_stamina;
        user.stats.energy = user.stats.max_energy;
        if maybe_upgrade_version(user, catalog) {
            version_upgraded = true;
        }
    }

    ExpGain {
        gained,
        exp: user.exp,
        level: user.level,
        leveled_up,
        version_upgraded,
    }
}

/// Advance to the next race version tier when the level requirement is met.
/// Max health is rebuilt from base + per-level increments + the new tier's
/// bonus, health is refilled, and derived combat stats are recomputed with
/// equipment still applied.
pub fn maybe_upgrade_version(user: &mut UserRecord, catalog: &Catalog) -> bool {
    let settings = &catalog.settings;
    let Some(race) = catalog.race(&user.race) else {
        return false;
    };
    let Some(next) = race.version(user.race_version + 1) else {
        return false;
    };
    if user.level < next.level_required {
        return false;
    }
    user.race_version += 1;
    user.stats.max_health = settings.base_health
        + settings.levelup_health * (user.level - 1)
        + next.health_bonus;
    user.stats.health = user.stats.max_health;
    inventory::recompute_combat_stats(user, catalog);
    true
}

/// Cooldown state for an action at `now`. Duration comes from settings with
/// the configured fallback; an action never performed is always ready.
pub fn cooldown_status(
    user: &UserRecord,
    action: &str,
    settings: &GameSettings,
    now: DateTime<Utc>,
) -> CooldownStatus {
    let total = Duration::from_secs(settings.cooldown_secs(action));
    let remaining = match user.cooldowns.get(action) {
        None => Duration::ZERO,
        Some(last) => {
            let elapsed = now.signed_duration_since(*last).num_seconds().max(0) as u64;
            Duration::from_secs(total.as_secs().saturating_sub(elapsed))
        }
    };
    CooldownStatus {
        ready: remaining.is_zero(),
        remaining,
        total,
    }
}

/// Cooldown gate used by timed actions: `Ok` when ready, structured
/// `CooldownActive` otherwise.
pub fn ensure_ready(
    user: &UserRecord,
    action: &str,
    settings: &GameSettings,
    now: DateTime<Utc>,
) -> Result<(), RpgError> {
    let status = cooldown_status(user, action, settings, now);
    if status.ready {
        Ok(())
    } else {
        Err(RpgError::CooldownActive {
            action: action.to_string(),
            remaining: status.remaining,
        })
    }
}

/// Passive regeneration/decay applied lazily on the next interaction:
/// hunger -10 after 30 minutes idle, stamina +5 after 15, energy +10 after
/// 10, each clamped to its range. Refreshes `last_action`.
pub fn apply_time_decay(user: &mut UserRecord, now: DateTime<Utc>) {
    let idle_minutes = now.signed_duration_since(user.last_action).num_minutes();
    let stats = &mut user.stats;
    if idle_minutes >= 30 {
        stats.hunger = stats.hunger.saturating_sub(10);
    }
    if idle_minutes >= 15 {
        stats.stamina = (stats.stamina + 5).min(stats.max_stamina);
    }
    if idle_minutes >= 10 {
        stats.energy = (stats.energy + 10).min(stats.max_energy);
    }
    user.last_action = now;
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

impl<S: DocumentStore> RpgEngine<S> {
    /// Open the engine: read the full document into memory once. All later
    /// reads are served from the in-memory copy.
    pub fn open(catalog: Catalog, mut store: S) -> Result<Self, RpgError> {
        let doc = store.read().map_err(RpgError::Persistence)?;
        info!(
            "game document loaded: {} users, {} guilds, {} listings",
            doc.users.len(),
            doc.guilds.len(),
            doc.listings.len()
        );
        Ok(Self {
            catalog,
            retry: RetryPolicy::default(),
            inner: Mutex::new(EngineInner {
                store,
                doc,
                rng: StdRng::from_entropy(),
            }),
        })
    }

    /// Open with an explicit retry policy and rng seed (tests).
    pub fn open_seeded(
        catalog: Catalog,
        mut store: S,
        retry: RetryPolicy,
        seed: u64,
    ) -> Result<Self, RpgError> {
        let doc = store.read().map_err(RpgError::Persistence)?;
        Ok(Self {
            catalog,
            retry,
            inner: Mutex::new(EngineInner {
                store,
                doc,
                rng: StdRng::seed_from_u64(seed),
            }),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn set_retry(&mut self, retry: RetryPolicy) {
        self.retry = retry;
    }

    /// Write the document back to the store, retrying with linear backoff
    /// before giving up with a typed error.
    async fn persist(&self, inner: &mut EngineInner<S>) -> Result<(), RpgError> {
        let mut attempt = 0u32;
        loop {
            match inner.store.write(&inner.doc) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.retry.attempts {
                        metrics::inc_persist_failed();
                        return Err(RpgError::Persistence(e));
                    }
                    metrics::inc_persist_retry();
                    debug!("persist attempt {} failed: {}; retrying", attempt, e);
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                }
            }
        }
    }

    /// Run a mutation against the whole document and persist the result.
    /// The lock is held across the write, so operations never interleave.
    pub(crate) async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RpgDocument, &Catalog, &mut StdRng) -> Result<T, RpgError>,
    ) -> Result<T, RpgError> {
        let mut inner = self.inner.lock().await;
        let out = {
            let EngineInner { doc, rng, .. } = &mut *inner;
            f(doc, &self.catalog, rng)?
        };
        self.persist(&mut inner).await?;
        Ok(out)
    }

    /// Like [`Self::mutate`] but scoped to a single user record. The closure
    /// runs against a copy that only replaces the stored record on success,
    /// so a failed operation leaves the document untouched.
    pub(crate) async fn mutate_user<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut UserRecord, &Catalog, &mut StdRng) -> Result<T, RpgError>,
    ) -> Result<T, RpgError> {
        self.mutate(|doc, catalog, rng| {
            let user = doc
                .find_user_mut(id)
                .ok_or_else(|| RpgError::UserNotFound(id.to_string()))?;
            let mut scratch = user.clone();
            let out = f(&mut scratch, catalog, rng)?;
            *user = scratch;
            Ok(out)
        })
        .await
    }

    /// Read-only access to a user record.
    pub(crate) async fn read_user<T>(
        &self,
        id: &str,
        f: impl FnOnce(&UserRecord, &Catalog) -> T,
    ) -> Result<T, RpgError> {
        let inner = self.inner.lock().await;
        let user = inner
            .doc
            .find_user(id)
            .ok_or_else(|| RpgError::UserNotFound(id.to_string()))?;
        Ok(f(user, &self.catalog))
    }

    // -- user lifecycle ----------------------------------------------------

    /// Register a new player. Fails when the id already has a record; the
    /// race is drawn from the configured weighted chances.
    pub async fn create_user(&self, id: &str, name: &str) -> Result<UserRecord, RpgError> {
        self.mutate(|doc, catalog, rng| {
            if doc.find_user(id).is_some() {
                return Err(RpgError::UserExists(id.to_string()));
            }
            let chances = &catalog.settings.race_chances;
            let weights: Vec<f64> = chances.iter().map(|c| c.weight).collect();
            let total: f64 = weights.iter().sum();
            let roll = rng.gen::<f64>() * total;
            let race = &chances[cumulative_pick(&weights, roll)].race;

            let user = new_user(catalog, id, name, race);
            info!("registered {} as {} ({})", id, name, race);
            doc.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    /// Fetch a copy of a user record.
    pub async fn user(&self, id: &str) -> Result<UserRecord, RpgError> {
        self.read_user(id, |u, _| u.clone()).await
    }

    pub async fn user_exists(&self, id: &str) -> bool {
        let inner = self.inner.lock().await;
        inner.doc.find_user(id).is_some()
    }

    pub async fn user_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.doc.users.len()
    }

    /// Race summary with current bonuses and the next tier, if any.
    pub async fn race_info(&self, id: &str) -> Result<RaceInfo, RpgError> {
        self.read_user(id, |user, catalog| {
            let race = catalog.race(&user.race);
            let bonuses = race
                .and_then(|r| r.version(user.race_version))
                .cloned()
                .unwrap_or(RaceVersion {
                    id: user.version_label(),
                    level_required: 1,
                    health_bonus: 0,
                    attack_bonus: 0,
                    defense_bonus: 0,
                    speed_bonus: 0,
                });
            let next_version = race
                .and_then(|r| r.version(user.race_version + 1))
                .map(|v| (v.id.clone(), v.level_required));
            RaceInfo {
                race: user.race.clone(),
                name: race.map_or(user.race.clone(), |r| r.name.clone()),
                description: race.map_or_else(String::new, |r| r.description.clone()),
                passive: race.map_or_else(String::new, |r| r.passive.clone()),
                special: race.map_or_else(String::new, |r| r.special.clone()),
                version: user.version_label(),
                bonuses,
                next_version,
            }
        })
        .await
    }

    // -- experience and money ----------------------------------------------

    pub fn required_exp(&self, level: u32) -> u64 {
        required_exp(&self.catalog.settings, level)
    }

    pub async fn add_exp(&self, id: &str, amount: u64) -> Result<ExpGain, RpgError> {
        self.mutate_user(id, |user, catalog, _| Ok(grant_exp(user, catalog, amount)))
            .await
    }

    pub async fn take_exp(&self, id: &str, amount: u64) -> Result<u64, RpgError> {
        self.mutate_user(id, |user, _, _| {
            user.exp = user.exp.saturating_sub(amount);
            Ok(user.exp)
        })
        .await
    }

    pub async fn add_money(&self, id: &str, amount: i64) -> Result<i64, RpgError> {
        self.mutate_user(id, |user, _, _| {
            user.money = user.money.saturating_add(amount);
            Ok(user.money)
        })
        .await
    }

    /// Deduct money, failing (without mutation) when the balance is short.
    pub async fn take_money(&self, id: &str, amount: i64) -> Result<i64, RpgError> {
        self.mutate_user(id, |user, _, _| {
            take_money(user, amount)?;
            Ok(user.money)
        })
        .await
    }

    // -- cooldowns and pools -----------------------------------------------

    pub async fn check_cooldown(&self, id: &str, action: &str) -> Result<CooldownStatus, RpgError> {
        self.read_user(id, |user, catalog| {
            cooldown_status(user, action, &catalog.settings, Utc::now())
        })
        .await
    }

    pub async fn set_cooldown(&self, id: &str, action: &str) -> Result<(), RpgError> {
        self.mutate_user(id, |user, _, _| {
            user.cooldowns.insert(action.to_string(), Utc::now());
            Ok(())
        })
        .await
    }

    /// Apply lazy passive regen/decay and return the updated stats.
    pub async fn update_stats_over_time(&self, id: &str) -> Result<StatBlock, RpgError> {
        self.mutate_user(id, |user, _, _| {
            apply_time_decay(user, Utc::now());
            Ok(user.stats.clone())
        })
        .await
    }

    pub async fn consume_stamina(&self, id: &str, amount: u32) -> Result<u32, RpgError> {
        self.mutate_user(id, |user, _, _| {
            consume_stamina(user, amount)?;
            Ok(user.stats.stamina)
        })
        .await
    }

    /// Hunger clamps at zero instead of failing.
    pub async fn consume_hunger(&self, id: &str, amount: u32) -> Result<u32, RpgError> {
        self.mutate_user(id, |user, _, _| {
            user.stats.hunger = user.stats.hunger.saturating_sub(amount);
            Ok(user.stats.hunger)
        })
        .await
    }

    /// Apply direct restoration effects, clamped to each pool's maximum.
    pub async fn restore_stats(
        &self,
        id: &str,
        effects: inventory::ItemEffects,
    ) -> Result<StatBlock, RpgError> {
        self.mutate_user(id, |user, _, _| {
            inventory::apply_effects(user, effects);
            Ok(user.stats.clone())
        })
        .await
    }

    // -- inventory and equipment -------------------------------------------

    pub async fn add_item(
        &self,
        id: &str,
        category: &str,
        item: &str,
        quantity: u32,
    ) -> Result<u32, RpgError> {
        self.mutate_user(id, |user, catalog, _| {
            if catalog.item(category, item).is_none() {
                return Err(RpgError::ItemNotFound {
                    category: category.to_string(),
                    item: item.to_string(),
                });
            }
            Ok(inventory::add_item(user, category, item, quantity))
        })
        .await
    }

    pub async fn remove_item(
        &self,
        id: &str,
        category: &str,
        item: &str,
        quantity: u32,
    ) -> Result<u32, RpgError> {
        self.mutate_user(id, |user, _, _| {
            inventory::remove_item(user, category, item, quantity)
        })
        .await
    }

    pub async fn equip_item(
        &self,
        id: &str,
        category: &str,
        item: &str,
    ) -> Result<Option<String>, RpgError> {
        self.mutate_user(id, |user, catalog, _| {
            inventory::equip_item(user, catalog, category, item)
        })
        .await
    }

    pub async fn unequip_item(&self, id: &str, category: &str) -> Result<String, RpgError> {
        self.mutate_user(id, |user, catalog, _| {
            inventory::unequip_item(user, catalog, category)
        })
        .await
    }

    pub async fn use_item(
        &self,
        id: &str,
        category: &str,
        item: &str,
        quantity: u32,
    ) -> Result<inventory::ItemEffects, RpgError> {
        self.mutate_user(id, |user, catalog, _| {
            inventory::use_item(user, catalog, category, item, quantity)
        })
        .await
    }

    // -- skills and leaderboard --------------------------------------------

    /// Practice a skill: 30% chance to gain a level. Returns the skill level
    /// and whether it increased.
    pub async fn add_skill_exp(&self, id: &str, skill: &str) -> Result<(u32, bool), RpgError> {
        self.mutate_user(id, |user, _, rng| {
            let level = user.skills.entry(skill.to_string()).or_insert(1);
            let increased = rng.gen_bool(0.3);
            if increased {
                *level += 1;
            }
            Ok((*level, increased))
        })
        .await
    }

    pub async fn leaderboard(
        &self,
        kind: LeaderboardKind,
        limit: usize,
    ) -> Vec<LeaderboardEntry> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<LeaderboardEntry> = inner
            .doc
            .users
            .iter()
            .map(|u| LeaderboardEntry {
                name: u.display_name.clone(),
                level: u.level,
                money: u.money,
                combat: u.stats.attack + u.stats.defense,
                race: u.race.clone(),
            })
            .collect();
        match kind {
            LeaderboardKind::Level => {
                entries.sort_by(|a, b| b.level.cmp(&a.level));
            }
            LeaderboardKind::Money => entries.sort_by(|a, b| b.money.cmp(&a.money)),
            LeaderboardKind::Combat => entries.sort_by(|a, b| b.combat.cmp(&a.combat)),
        }
        entries.truncate(limit);
        entries
    }
}

// Shared record-level helpers used by the action/economy modules.

pub(crate) fn take_money(user: &mut UserRecord, amount: i64) -> Result<(), RpgError> {
    if user.money < amount {
        return Err(RpgError::InsufficientMoney {
            needed: amount,
            held: user.money,
        });
    }
    user.money -= amount;
    Ok(())
}

pub(crate) fn consume_stamina(user: &mut UserRecord, amount: u32) -> Result<(), RpgError> {
    if user.stats.stamina < amount {
        return Err(RpgError::InsufficientStamina {
            needed: amount,
            held: user.stats.stamina,
        });
    }
    user.stats.stamina -= amount;
    Ok(())
}
