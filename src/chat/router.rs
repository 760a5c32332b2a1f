//! Command dispatch: routes a parsed [`Command`] to the engine and renders
//! the reply. All player-facing text lives here so the engine stays free of
//! formatting concerns.

use std::sync::Arc;

use log::{debug, warn};

use crate::chat::commands::{self, Command};
use crate::logutil::escape_log;
use crate::metrics;
use crate::rpg::engine::{LeaderboardKind, RpgEngine};
use crate::rpg::errors::RpgError;
use crate::rpg::store::DocumentStore;
use crate::rpg::types::{CooldownStatus, UserRecord};
use crate::transport::InboundMessage;
use crate::validation::validate_display_name;

pub struct CommandRouter<S: DocumentStore> {
    engine: Arc<RpgEngine<S>>,
    prefix: String,
    welcome_message: String,
    leaderboard_size: usize,
}

fn fmt_secs(secs: u64) -> String {
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

impl<S: DocumentStore> CommandRouter<S> {
    pub fn new(
        engine: Arc<RpgEngine<S>>,
        prefix: String,
        welcome_message: String,
        leaderboard_size: usize,
    ) -> Self {
        Self {
            engine,
            prefix,
            welcome_message,
            leaderboard_size,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Handle one inbound message. `None` when it is not addressed to the
    /// bot; otherwise the reply text.
    pub async fn handle(&self, msg: &InboundMessage) -> Option<String> {
        let parsed = commands::parse(&self.prefix, &msg.body)?;
        metrics::inc_commands_dispatched();
        debug!(
            "dispatch from {}: {}",
            msg.sender_id,
            escape_log(&msg.body)
        );
        let command = match parsed {
            Ok(command) => command,
            Err(usage) => return Some(usage),
        };
        let reply = match self.dispatch(msg, command).await {
            Ok(reply) => reply,
            Err(e) => self.render_error(e),
        };
        Some(reply)
    }

    fn render_error(&self, e: RpgError) -> String {
        match e {
            RpgError::CooldownActive { action, remaining } => {
                metrics::inc_cooldown_rejections();
                format!("{} is ready in {}", action, fmt_secs(remaining.as_secs()))
            }
            RpgError::UserNotFound(_) => format!(
                "You are not registered yet. Send {}register <name> to begin.",
                self.prefix
            ),
            RpgError::Persistence(inner) => {
                metrics::inc_command_errors();
                warn!("persistence failure: {}", inner);
                "Something went wrong saving your progress; try again shortly.".to_string()
            }
            other => {
                metrics::inc_command_errors();
                other.to_string()
            }
        }
    }

    async fn dispatch(&self, msg: &InboundMessage, command: Command) -> Result<String, RpgError> {
        let id = msg.sender_id.as_str();
        match command {
            Command::Register { name } => {
                let raw = name.unwrap_or_else(|| msg.sender_name.clone());
                let display = validate_display_name(&raw)
                    .map_err(|e| RpgError::InvalidArgument(e.to_string()))?;
                let user = self.engine.create_user(id, &display).await?;
                let race = self
                    .engine
                    .catalog()
                    .race(&user.race)
                    .map_or(user.race.clone(), |r| r.name.clone());
                Ok(format!(
                    "{}\n{} the {} enters the world with {} coins.",
                    self.welcome_message, user.display_name, race, user.money
                ))
            }
            Command::Profile => {
                self.engine.update_stats_over_time(id).await?;
                let user = self.engine.user(id).await?;
                let next = self.engine.required_exp(user.level + 1);
                Ok(render_profile(&user, next))
            }
            Command::Race => {
                let info = self.engine.race_info(id).await?;
                let mut out = format!(
                    "{} ({}) - {}\nPassive: {}\nSpecial: {}\nBonuses: +{} hp, +{} atk, +{} def, +{} spd",
                    info.name,
                    info.version,
                    info.description,
                    info.passive,
                    info.special,
                    info.bonuses.health_bonus,
                    info.bonuses.attack_bonus,
                    info.bonuses.defense_bonus,
                    info.bonuses.speed_bonus,
                );
                if let Some((label, level)) = info.next_version {
                    out.push_str(&format!("\nNext tier {} at level {}", label, level));
                }
                Ok(out)
            }
            Command::Inventory => {
                let user = self.engine.user(id).await?;
                Ok(render_inventory(&user))
            }
            Command::Equip { category, item } => {
                let previous = self.engine.equip_item(id, &category, &item).await?;
                Ok(match previous {
                    Some(prev) => format!("Equipped {} (stowed {}).", item, prev),
                    None => format!("Equipped {}.", item),
                })
            }
            Command::Unequip { category } => {
                let item = self.engine.unequip_item(id, &category).await?;
                Ok(format!("Unequipped {}.", item))
            }
            Command::Use {
                category,
                item,
                quantity,
            } => {
                let effects = self.engine.use_item(id, &category, &item, quantity).await?;
                let mut parts = Vec::new();
                if effects.health > 0 {
                    parts.push(format!("+{} health", effects.health));
                }
                if effects.hunger > 0 {
                    parts.push(format!("+{} hunger", effects.hunger));
                }
                if effects.energy > 0 {
                    parts.push(format!("+{} energy", effects.energy));
                }
                if effects.stamina > 0 {
                    parts.push(format!("+{} stamina", effects.stamina));
                }
                Ok(format!("Used {}x {}: {}", quantity, item, parts.join(", ")))
            }
            Command::Action { name } => {
                let outcome = self.engine.perform_action(id, &name).await?;
                let mut out = format!("You {} and earn {} coins", name, outcome.money);
                out.push_str(&format!(" and {} exp", outcome.exp.gained));
                for drop in &outcome.drops {
                    out.push_str(&format!("\nFound {}x {}", drop.quantity, drop.item));
                }
                if let Some((skill, level, increased)) = &outcome.skill {
                    if *increased {
                        out.push_str(&format!("\n{} skill is now level {}", skill, level));
                    }
                }
                if outcome.exp.leveled_up {
                    out.push_str(&format!("\nLevel up! You are now level {}", outcome.exp.level));
                }
                if outcome.exp.version_upgraded {
                    out.push_str("\nYour race has ascended to a new tier!");
                }
                Ok(out)
            }
            Command::Daily => {
                let outcome = self.engine.claim_daily(id).await?;
                Ok(format!(
                    "Daily reward claimed: +{} coins, +{} exp.",
                    outcome.money, outcome.exp.gained
                ))
            }
            Command::OpenBox { box_id } => {
                let outcome = self.engine.open_box(id, &box_id).await?;
                let mut out = format!("The {} held {} coins", outcome.box_id, outcome.money);
                if let Some(drop) = outcome.drop {
                    out.push_str(&format!(" and {}x {}", drop.quantity, drop.item));
                }
                out.push('.');
                Ok(out)
            }
            Command::Battle { monster } => {
                let outcome = self.engine.fight_monster(id, &monster).await?;
                Ok(if outcome.won {
                    let exp = outcome.exp.map_or(0, |e| e.gained);
                    format!(
                        "You defeated the {}! +{} coins, +{} exp.",
                        outcome.foe, outcome.money_delta, exp
                    )
                } else if outcome.revived {
                    format!(
                        "The {} bested you, but you limp away with your purse intact.",
                        outcome.foe
                    )
                } else {
                    format!(
                        "The {} defeated you. You lost {} coins.",
                        outcome.foe,
                        -outcome.money_delta
                    )
                })
            }
            Command::Duel { opponent, bet } => {
                let outcome = self.engine.duel(id, &opponent, bet).await?;
                Ok(if outcome.winner == id {
                    format!("You won the duel and {} coins!", outcome.bet)
                } else {
                    format!("You lost the duel and {} coins.", outcome.bet)
                })
            }
            Command::Gamble { bet } => {
                let outcome = self.engine.gamble(id, bet).await?;
                Ok(if outcome.won {
                    format!(
                        "You won {} coins! Balance: {}.",
                        outcome.bet, outcome.balance
                    )
                } else {
                    format!(
                        "You lost {} coins. Balance: {}.",
                        outcome.bet, outcome.balance
                    )
                })
            }
            Command::Buy {
                category,
                item,
                quantity,
            } => {
                let outcome = self.engine.buy_item(id, &category, &item, quantity).await?;
                Ok(format!(
                    "Bought {}x {} for {} coins. Balance: {}.",
                    outcome.quantity, outcome.item, -outcome.money_delta, outcome.balance
                ))
            }
            Command::Sell {
                category,
                item,
                quantity,
            } => {
                let outcome = self.engine.sell_item(id, &category, &item, quantity).await?;
                Ok(format!(
                    "Sold {}x {} for {} coins. Balance: {}.",
                    outcome.quantity, outcome.item, outcome.money_delta, outcome.balance
                ))
            }
            Command::Craft { recipe } => {
                let outcome = self.engine.craft(id, &recipe).await?;
                let mut out = format!("Crafted {}x {}.", outcome.quantity, outcome.output);
                if let Some(level) = outcome.skill_up {
                    out.push_str(&format!(" Your skill improved to level {}.", level));
                }
                Ok(out)
            }
            Command::Recipes => {
                let mut out = String::from("Recipes:\n");
                for recipe in &self.engine.catalog().recipes {
                    let materials: Vec<String> = recipe
                        .materials
                        .iter()
                        .map(|m| format!("{}x {}", m.quantity, m.item))
                        .collect();
                    out.push_str(&format!(
                        "{} ({} lv{}): {}\n",
                        recipe.id,
                        recipe.skill,
                        recipe.skill_level,
                        materials.join(", ")
                    ));
                }
                Ok(out.trim_end().to_string())
            }
            Command::Travel { destination } => {
                self.engine.travel(id, &destination).await?;
                Ok(format!("You travel to {}.", destination))
            }
            Command::Market => {
                let listings = self.engine.listings().await;
                if listings.is_empty() {
                    return Ok("The market is empty.".to_string());
                }
                let mut out = String::from("Market listings:\n");
                for listing in listings {
                    out.push_str(&format!(
                        "{} - {}x {} @ {} each (seller {})\n",
                        listing.id, listing.quantity, listing.item, listing.unit_price, listing.seller
                    ));
                }
                Ok(out.trim_end().to_string())
            }
            Command::MarketSell {
                category,
                item,
                quantity,
                unit_price,
            } => {
                let listing = self
                    .engine
                    .list_item(id, &category, &item, quantity, unit_price)
                    .await?;
                Ok(format!(
                    "Listed {}x {} at {} each. Listing id: {}",
                    listing.quantity, listing.item, listing.unit_price, listing.id
                ))
            }
            Command::MarketBuy { listing } => {
                let bought = self.engine.buy_listing(id, listing).await?;
                Ok(format!(
                    "Bought {}x {} for {} coins.",
                    bought.quantity,
                    bought.item,
                    bought.unit_price * bought.quantity as i64
                ))
            }
            Command::GuildInfo => {
                let guild = self.engine.guild_of(id).await?;
                Ok(match guild {
                    Some(guild) => format!(
                        "{} - led by {}, {} members.",
                        guild.name,
                        guild.leader,
                        guild.members.len()
                    ),
                    None => format!(
                        "You have no guild. {}guild create <name> to found one.",
                        self.prefix
                    ),
                })
            }
            Command::GuildCreate { name } => {
                let guild = self.engine.create_guild(id, &name).await?;
                Ok(format!("Guild {} founded!", guild.name))
            }
            Command::GuildJoin { name } => {
                let guild = self.engine.join_guild(id, &name).await?;
                Ok(format!("You joined {}.", guild.name))
            }
            Command::Top { kind } => {
                let entries = self.engine.leaderboard(kind, self.leaderboard_size).await;
                if entries.is_empty() {
                    return Ok("No adventurers yet.".to_string());
                }
                let label = match kind {
                    LeaderboardKind::Level => "level",
                    LeaderboardKind::Money => "money",
                    LeaderboardKind::Combat => "combat",
                };
                let mut out = format!("Top by {}:\n", label);
                for (rank, entry) in entries.iter().enumerate() {
                    let value = match kind {
                        LeaderboardKind::Level => entry.level as i64,
                        LeaderboardKind::Money => entry.money,
                        LeaderboardKind::Combat => entry.combat as i64,
                    };
                    out.push_str(&format!(
                        "{}. {} ({}) - {}\n",
                        rank + 1,
                        entry.name,
                        entry.race,
                        value
                    ));
                }
                Ok(out.trim_end().to_string())
            }
            Command::Cooldowns => {
                let user = self.engine.user(id).await?;
                let settings = &self.engine.catalog().settings;
                let now = chrono::Utc::now();
                let mut pending: Vec<(String, CooldownStatus)> = user
                    .cooldowns
                    .keys()
                    .map(|action| {
                        (
                            action.clone(),
                            crate::rpg::engine::cooldown_status(&user, action, settings, now),
                        )
                    })
                    .filter(|(_, status)| !status.ready)
                    .collect();
                if pending.is_empty() {
                    return Ok("Everything is ready.".to_string());
                }
                pending.sort_by_key(|(_, status)| status.remaining);
                let mut out = String::from("Cooldowns:\n");
                for (action, status) in pending {
                    out.push_str(&format!(
                        "{} - ready in {}\n",
                        action,
                        fmt_secs(status.remaining.as_secs())
                    ));
                }
                Ok(out.trim_end().to_string())
            }
            Command::Help => Ok(commands::help_text(&self.prefix)),
        }
    }
}

fn render_profile(user: &UserRecord, next_level_exp: u64) -> String {
    let stats = &user.stats;
    format!(
        "{} - level {} {} ({})\nExp: {}/{} | Money: {}\nHP {}/{} | Stamina {}/{} | Hunger {}/{} | Energy {}/{}\nAtk {} | Def {} | Spd {} | Location: {}",
        user.display_name,
        user.level,
        user.race,
        user.version_label(),
        user.exp,
        next_level_exp,
        user.money,
        stats.health,
        stats.max_health,
        stats.stamina,
        stats.max_stamina,
        stats.hunger,
        stats.max_hunger,
        stats.energy,
        stats.max_energy,
        stats.attack,
        stats.defense,
        stats.speed,
        user.location,
    )
}

fn render_inventory(user: &UserRecord) -> String {
    if user.inventory.is_empty() {
        return "Your inventory is empty.".to_string();
    }
    let mut categories: Vec<&String> = user.inventory.keys().collect();
    categories.sort();
    let mut out = String::from("Inventory:\n");
    for category in categories {
        let items = &user.inventory[category];
        let mut names: Vec<&String> = items.keys().collect();
        names.sort();
        let line: Vec<String> = names
            .iter()
            .map(|name| format!("{} x{}", name, items[*name]))
            .collect();
        out.push_str(&format!("{}: {}\n", category, line.join(", ")));
    }
    if let Some(weapon) = &user.equipment.weapon {
        out.push_str(&format!("Equipped weapon: {}\n", weapon));
    }
    if let Some(armor) = &user.equipment.armor {
        out.push_str(&format!("Equipped armor: {}\n", armor));
    }
    if let Some(accessory) = &user.equipment.accessory {
        out.push_str(&format!("Equipped accessory: {}\n", accessory));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpg::catalog::Catalog;
    use crate::rpg::engine::RetryPolicy;
    use crate::rpg::store::MemoryStore;
    use chrono::Utc;

    fn router() -> CommandRouter<MemoryStore> {
        let engine = RpgEngine::open_seeded(
            Catalog::builtin(),
            MemoryStore::new(),
            RetryPolicy::default(),
            11,
        )
        .expect("engine");
        CommandRouter::new(
            Arc::new(engine),
            "!".to_string(),
            "Welcome!".to_string(),
            10,
        )
    }

    fn msg(body: &str) -> InboundMessage {
        InboundMessage {
            sender_id: "u1".to_string(),
            sender_name: "Tester".to_string(),
            chat_id: "room".to_string(),
            body: body.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ignores_unprefixed_chatter() {
        let router = router();
        assert!(router.handle(&msg("good morning all")).await.is_none());
    }

    #[tokio::test]
    async fn register_then_profile() {
        let router = router();
        let reply = router.handle(&msg("!register Alice")).await.expect("reply");
        assert!(reply.contains("Alice"));
        assert!(reply.contains("100000"));

        let reply = router.handle(&msg("!profile")).await.expect("reply");
        assert!(reply.contains("level 1"));
        assert!(reply.contains("Alice"));
    }

    #[tokio::test]
    async fn unregistered_users_get_a_hint() {
        let router = router();
        let reply = router.handle(&msg("!profile")).await.expect("reply");
        assert!(reply.contains("!register"));
    }

    #[tokio::test]
    async fn duplicate_registration_is_reported() {
        let router = router();
        router.handle(&msg("!register Alice")).await.expect("first");
        let reply = router.handle(&msg("!register Alice")).await.expect("second");
        assert!(reply.contains("already exists"));
    }

    #[tokio::test]
    async fn cooldown_rejections_render_the_wait() {
        let router = router();
        router.handle(&msg("!register Alice")).await.expect("register");
        router.handle(&msg("!hunt")).await.expect("first hunt");
        let reply = router.handle(&msg("!hunt")).await.expect("second hunt");
        assert!(reply.contains("ready in"), "got: {}", reply);
    }

    #[tokio::test]
    async fn usage_errors_come_back_verbatim() {
        let router = router();
        let reply = router.handle(&msg("!duel bob")).await.expect("reply");
        assert!(reply.contains("usage"));
    }

    #[tokio::test]
    async fn help_is_always_available() {
        let router = router();
        let reply = router.handle(&msg("!help")).await.expect("reply");
        assert!(reply.contains("!register"));
        assert!(reply.contains("!hunt"));
    }

    #[tokio::test]
    async fn inventory_renders_equipment_and_stacks() {
        let router = router();
        router.handle(&msg("!register Alice")).await.expect("register");
        router.handle(&msg("!buy weapon wooden_sword")).await.expect("buy");
        router.handle(&msg("!equip weapon wooden_sword")).await.expect("equip");
        router.handle(&msg("!buy food bread 2")).await.expect("buy food");
        let reply = router.handle(&msg("!inv")).await.expect("inv");
        assert!(reply.contains("bread x2"));
        assert!(reply.contains("Equipped weapon: wooden_sword"));
    }
}
