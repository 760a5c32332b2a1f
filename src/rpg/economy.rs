//! Economy operations: shop trades, gambling, crafting, travel, the player
//! market and guilds. Everything here is all-or-nothing; a failed check
//! leaves money and inventories exactly as they were.

use chrono::Utc;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use uuid::Uuid;

use crate::rpg::catalog::Catalog;
use crate::rpg::engine::{apply_time_decay, ensure_ready, take_money, RpgEngine};
use crate::rpg::errors::RpgError;
use crate::rpg::inventory;
use crate::rpg::store::DocumentStore;
use crate::rpg::types::{GuildRecord, MarketListing, UserRecord};

/// Result of a shop trade.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub item: String,
    pub quantity: u32,
    /// Total money moved; positive for sales, negative for purchases.
    pub money_delta: i64,
    pub balance: i64,
}

/// Result of a gamble.
#[derive(Debug, Clone)]
pub struct GambleOutcome {
    pub won: bool,
    pub bet: i64,
    pub balance: i64,
}

/// Result of a successful craft.
#[derive(Debug, Clone)]
pub struct CraftOutcome {
    pub recipe: String,
    pub output: String,
    pub quantity: u32,
    /// New level of the recipe's skill when practice paid off.
    pub skill_up: Option<u32>,
}

/// Buy from the shop at catalog prices. Items without a buy price are not
/// for sale.
pub fn buy_item(
    user: &mut UserRecord,
    catalog: &Catalog,
    category: &str,
    item: &str,
    quantity: u32,
) -> Result<TradeOutcome, RpgError> {
    if quantity == 0 {
        return Err(RpgError::InvalidArgument("quantity must be at least 1".into()));
    }
    let def = catalog.item(category, item).ok_or_else(|| RpgError::ItemNotFound {
        category: category.to_string(),
        item: item.to_string(),
    })?;
    if def.buy_price <= 0 {
        return Err(RpgError::InvalidArgument(format!(
            "{} is not for sale",
            def.name
        )));
    }
    let cost = def.buy_price * quantity as i64;
    take_money(user, cost)?;
    inventory::add_item(user, category, item, quantity);
    Ok(TradeOutcome {
        item: item.to_string(),
        quantity,
        money_delta: -cost,
        balance: user.money,
    })
}

/// Sell held items back to the shop at catalog sell prices.
pub fn sell_item(
    user: &mut UserRecord,
    catalog: &Catalog,
    category: &str,
    item: &str,
    quantity: u32,
) -> Result<TradeOutcome, RpgError> {
    if quantity == 0 {
        return Err(RpgError::InvalidArgument("quantity must be at least 1".into()));
    }
    let def = catalog.item(category, item).ok_or_else(|| RpgError::ItemNotFound {
        category: category.to_string(),
        item: item.to_string(),
    })?;
    inventory::remove_item(user, category, item, quantity)?;
    let earnings = def.sell_price * quantity as i64;
    user.money = user.money.saturating_add(earnings);
    Ok(TradeOutcome {
        item: item.to_string(),
        quantity,
        money_delta: earnings,
        balance: user.money,
    })
}

/// Apply a decided gamble: winners double the bet, losers forfeit it. Split
/// from the roll so both branches can be tested deterministically.
pub fn apply_gamble_outcome(
    user: &mut UserRecord,
    bet: i64,
    won: bool,
) -> Result<GambleOutcome, RpgError> {
    if bet <= 0 {
        return Err(RpgError::InvalidArgument("bet must be positive".into()));
    }
    if user.money < bet {
        return Err(RpgError::InsufficientMoney {
            needed: bet,
            held: user.money,
        });
    }
    if won {
        user.money += bet;
    } else {
        user.money -= bet;
    }
    Ok(GambleOutcome {
        won,
        bet,
        balance: user.money,
    })
}

/// Craft a recipe: requires the skill level and all materials, consumed
/// atomically. A missing material fails before anything is removed. Each
/// craft is also skill practice with the usual 30% level-up chance.
pub fn craft(
    user: &mut UserRecord,
    catalog: &Catalog,
    rng: &mut StdRng,
    recipe_id: &str,
) -> Result<CraftOutcome, RpgError> {
    let recipe = catalog
        .recipe(recipe_id)
        .ok_or_else(|| RpgError::InvalidArgument(format!("unknown recipe: {}", recipe_id)))?;

    let skill_level = user.skills.get(&recipe.skill).copied().unwrap_or(1);
    if skill_level < recipe.skill_level {
        return Err(RpgError::InvalidArgument(format!(
            "{} requires {} level {} (you have {})",
            recipe.name, recipe.skill, recipe.skill_level, skill_level
        )));
    }
    for material in &recipe.materials {
        let held = user.item_quantity(&material.category, &material.item);
        if held < material.quantity {
            return Err(RpgError::InsufficientItems {
                item: material.item.clone(),
                needed: material.quantity,
                held,
            });
        }
    }
    for material in &recipe.materials {
        inventory::remove_item(user, &material.category, &material.item, material.quantity)?;
    }
    inventory::add_item(user, &recipe.category, &recipe.output, recipe.output_qty);

    let skill_up = if rng.gen_bool(0.3) {
        let level = user.skills.entry(recipe.skill.clone()).or_insert(1);
        *level += 1;
        Some(*level)
    } else {
        None
    };
    debug!("{} crafted {}", user.id, recipe.id);
    Ok(CraftOutcome {
        recipe: recipe.id.clone(),
        output: recipe.output.clone(),
        quantity: recipe.output_qty,
        skill_up,
    })
}

/// Move to another location: gated by its level requirement and travel cost.
pub fn travel(
    user: &mut UserRecord,
    catalog: &Catalog,
    destination: &str,
) -> Result<(), RpgError> {
    let location = catalog
        .settings
        .locations
        .get(destination)
        .ok_or_else(|| RpgError::InvalidArgument(format!("unknown location: {}", destination)))?;
    if user.location == destination {
        return Err(RpgError::InvalidArgument(format!(
            "you are already in {}",
            destination
        )));
    }
    if user.level < location.level {
        return Err(RpgError::LevelRequired {
            required: location.level,
        });
    }
    take_money(user, location.cost)?;
    user.location = destination.to_string();
    Ok(())
}

impl<S: DocumentStore> RpgEngine<S> {
    pub async fn buy_item(
        &self,
        id: &str,
        category: &str,
        item: &str,
        quantity: u32,
    ) -> Result<TradeOutcome, RpgError> {
        self.mutate_user(id, |user, catalog, _| {
            buy_item(user, catalog, category, item, quantity)
        })
        .await
    }

    pub async fn sell_item(
        &self,
        id: &str,
        category: &str,
        item: &str,
        quantity: u32,
    ) -> Result<TradeOutcome, RpgError> {
        self.mutate_user(id, |user, catalog, _| {
            sell_item(user, catalog, category, item, quantity)
        })
        .await
    }

    /// Even-odds coin-flip gamble, gated by the `gamble` cooldown.
    pub async fn gamble(&self, id: &str, bet: i64) -> Result<GambleOutcome, RpgError> {
        self.mutate_user(id, |user, catalog, rng| {
            let now = Utc::now();
            apply_time_decay(user, now);
            ensure_ready(user, "gamble", &catalog.settings, now)?;
            let won = rng.gen_bool(0.5);
            let outcome = apply_gamble_outcome(user, bet, won)?;
            user.cooldowns.insert("gamble".to_string(), now);
            Ok(outcome)
        })
        .await
    }

    pub async fn craft(&self, id: &str, recipe_id: &str) -> Result<CraftOutcome, RpgError> {
        self.mutate_user(id, |user, catalog, rng| craft(user, catalog, rng, recipe_id))
            .await
    }

    pub async fn travel(&self, id: &str, destination: &str) -> Result<(), RpgError> {
        self.mutate_user(id, |user, catalog, _| travel(user, catalog, destination))
            .await
    }

    // -- player market -----------------------------------------------------

    /// Put held items up for sale. The stock moves out of the seller's
    /// inventory into the listing immediately.
    pub async fn list_item(
        &self,
        seller: &str,
        category: &str,
        item: &str,
        quantity: u32,
        unit_price: i64,
    ) -> Result<MarketListing, RpgError> {
        if unit_price <= 0 {
            return Err(RpgError::InvalidArgument("price must be positive".into()));
        }
        self.mutate(|doc, catalog, _| {
            if catalog.item(category, item).is_none() {
                return Err(RpgError::ItemNotFound {
                    category: category.to_string(),
                    item: item.to_string(),
                });
            }
            let user = doc
                .find_user_mut(seller)
                .ok_or_else(|| RpgError::UserNotFound(seller.to_string()))?;
            inventory::remove_item(user, category, item, quantity)?;
            let listing = MarketListing {
                id: Uuid::new_v4(),
                seller: seller.to_string(),
                category: category.to_string(),
                item: item.to_string(),
                quantity,
                unit_price,
                listed_at: Utc::now(),
            };
            doc.listings.push(listing.clone());
            Ok(listing)
        })
        .await
    }

    /// Buy out a listing: buyer pays, seller is credited, stock transfers.
    /// Sellers can buy back their own listings at no net cost.
    pub async fn buy_listing(&self, buyer: &str, listing_id: Uuid) -> Result<MarketListing, RpgError> {
        self.mutate(|doc, _, _| {
            let position = doc
                .listings
                .iter()
                .position(|l| l.id == listing_id)
                .ok_or(RpgError::ListingNotFound(listing_id))?;
            let listing = doc.listings[position].clone();
            let total = listing.unit_price * listing.quantity as i64;

            {
                let buyer_record = doc
                    .find_user_mut(buyer)
                    .ok_or_else(|| RpgError::UserNotFound(buyer.to_string()))?;
                take_money(buyer_record, total)?;
                inventory::add_item(
                    buyer_record,
                    &listing.category,
                    &listing.item,
                    listing.quantity,
                );
            }
            if let Some(seller) = doc.find_user_mut(&listing.seller) {
                seller.money = seller.money.saturating_add(total);
            }
            doc.listings.remove(position);
            info!(
                "market: {} bought {}x {} from {} for {}",
                buyer, listing.quantity, listing.item, listing.seller, total
            );
            Ok(listing)
        })
        .await
    }

    pub async fn listings(&self) -> Vec<MarketListing> {
        let inner = self.inner.lock().await;
        inner.doc.listings.clone()
    }

    // -- guilds ------------------------------------------------------------

    /// Found a guild: costs the configured fee, and the founder must not
    /// already belong to one.
    pub async fn create_guild(&self, founder: &str, name: &str) -> Result<GuildRecord, RpgError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RpgError::InvalidArgument("guild name is empty".into()));
        }
        self.mutate(|doc, catalog, _| {
            if doc.guilds.iter().any(|g| g.name.eq_ignore_ascii_case(name)) {
                return Err(RpgError::InvalidArgument(format!(
                    "a guild named {} already exists",
                    name
                )));
            }
            let user = doc
                .find_user_mut(founder)
                .ok_or_else(|| RpgError::UserNotFound(founder.to_string()))?;
            if user.guild.is_some() {
                return Err(RpgError::InvalidArgument(
                    "you already belong to a guild".into(),
                ));
            }
            take_money(user, catalog.settings.guild_cost)?;
            user.guild = Some(name.to_string());
            let guild = GuildRecord::new(name, founder);
            doc.guilds.push(guild.clone());
            info!("guild {} founded by {}", name, founder);
            Ok(guild)
        })
        .await
    }

    pub async fn join_guild(&self, id: &str, name: &str) -> Result<GuildRecord, RpgError> {
        self.mutate(|doc, _, _| {
            let position = doc
                .guilds
                .iter()
                .position(|g| g.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| RpgError::GuildNotFound(name.to_string()))?;
            let guild_name = doc.guilds[position].name.clone();
            let user = doc
                .find_user_mut(id)
                .ok_or_else(|| RpgError::UserNotFound(id.to_string()))?;
            if user.guild.is_some() {
                return Err(RpgError::InvalidArgument(
                    "you already belong to a guild".into(),
                ));
            }
            user.guild = Some(guild_name);
            let guild = &mut doc.guilds[position];
            guild.members.push(id.to_string());
            Ok(guild.clone())
        })
        .await
    }

    pub async fn guild_of(&self, id: &str) -> Result<Option<GuildRecord>, RpgError> {
        let inner = self.inner.lock().await;
        let user = inner
            .doc
            .find_user(id)
            .ok_or_else(|| RpgError::UserNotFound(id.to_string()))?;
        Ok(user
            .guild
            .as_ref()
            .and_then(|name| inner.doc.guilds.iter().find(|g| &g.name == name))
            .cloned())
    }
}
