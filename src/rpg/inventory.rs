//! Inventory and equipment mutation. Pure functions over a [`UserRecord`];
//! the engine wraps each in a lock-mutate-persist cycle.

use crate::rpg::catalog::Catalog;
use crate::rpg::errors::RpgError;
use crate::rpg::types::{EquipSlot, UserRecord};

/// Effects produced by consuming an item, already scaled by quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemEffects {
    pub health: u32,
    pub hunger: u32,
    pub energy: u32,
    pub stamina: u32,
}

/// Add `quantity` of an item, creating the category/item entries on first
/// gain. Returns the new held quantity.
pub fn add_item(user: &mut UserRecord, category: &str, item: &str, quantity: u32) -> u32 {
    let entry = user
        .inventory
        .entry(category.to_string())
        .or_default()
        .entry(item.to_string())
        .or_insert(0);
    *entry = entry.saturating_add(quantity);
    *entry
}

/// Remove `quantity` of an item. Fails without touching the inventory when
/// the item is unknown or the held quantity is short; quantities can never
/// go negative. Zeroed entries are pruned so the inventory stays sparse.
pub fn remove_item(
    user: &mut UserRecord,
    category: &str,
    item: &str,
    quantity: u32,
) -> Result<u32, RpgError> {
    let held = user.item_quantity(category, item);
    if held == 0 {
        return Err(RpgError::ItemNotFound {
            category: category.to_string(),
            item: item.to_string(),
        });
    }
    if held < quantity {
        return Err(RpgError::InsufficientItems {
            item: item.to_string(),
            needed: quantity,
            held,
        });
    }
    let remaining = held - quantity;
    if let Some(items) = user.inventory.get_mut(category) {
        if remaining == 0 {
            items.remove(item);
            if items.is_empty() {
                user.inventory.remove(category);
            }
        } else {
            items.insert(item.to_string(), remaining);
        }
    }
    Ok(remaining)
}

/// Equip an item from inventory into its slot. The item must be held at
/// least once and the category must be an equipment slot. Any previously
/// equipped item goes back to inventory before the swap, so the operation
/// never loses items. Derived stats are recomputed afterwards.
pub fn equip_item(
    user: &mut UserRecord,
    catalog: &Catalog,
    category: &str,
    item: &str,
) -> Result<Option<String>, RpgError> {
    let slot = EquipSlot::from_category(category).ok_or_else(|| {
        RpgError::InvalidArgument(format!("{} items cannot be equipped", category))
    })?;
    if catalog.item(category, item).is_none() {
        return Err(RpgError::ItemNotFound {
            category: category.to_string(),
            item: item.to_string(),
        });
    }
    if user.item_quantity(category, item) < 1 {
        return Err(RpgError::InsufficientItems {
            item: item.to_string(),
            needed: 1,
            held: 0,
        });
    }

    let previous = user.equipment.slot_mut(slot).take();
    if let Some(ref prev) = previous {
        add_item(user, category, prev, 1);
    }
    remove_item(user, category, item, 1)?;
    *user.equipment.slot_mut(slot) = Some(item.to_string());

    recompute_combat_stats(user, catalog);
    Ok(previous)
}

/// Remove whatever occupies a slot, returning it to inventory.
pub fn unequip_item(
    user: &mut UserRecord,
    catalog: &Catalog,
    category: &str,
) -> Result<String, RpgError> {
    let slot = EquipSlot::from_category(category).ok_or_else(|| {
        RpgError::InvalidArgument(format!("{} is not an equipment slot", category))
    })?;
    let item = user.equipment.slot_mut(slot).take().ok_or_else(|| {
        RpgError::InvalidArgument(format!("nothing equipped in {}", category))
    })?;
    add_item(user, category, &item, 1);
    recompute_combat_stats(user, catalog);
    Ok(item)
}

/// Recompute attack/defense/speed from base settings, the current race
/// version bonuses and equipped item attributes.
pub fn recompute_combat_stats(user: &mut UserRecord, catalog: &Catalog) {
    let settings = &catalog.settings;
    let version = catalog
        .race(&user.race)
        .and_then(|r| r.version(user.race_version));

    let mut attack = settings.base_attack + version.map_or(0, |v| v.attack_bonus);
    let mut defense = settings.base_defense + version.map_or(0, |v| v.defense_bonus);
    let speed = version.map_or(0, |v| v.speed_bonus);

    if let Some(weapon) = &user.equipment.weapon {
        if let Some(def) = catalog.item("weapon", weapon) {
            attack += def.damage;
        }
    }
    if let Some(armor) = &user.equipment.armor {
        if let Some(def) = catalog.item("armor", armor) {
            defense += def.defense;
        }
    }
    if let Some(accessory) = &user.equipment.accessory {
        if let Some(def) = catalog.item("accessory", accessory) {
            attack += def.attack;
            defense += def.defense;
        }
    }

    user.stats.attack = attack;
    user.stats.defense = defense;
    user.stats.speed = speed;
}

/// Resolve and apply the effects of consuming `quantity` of an item.
/// Supported categories: potion (health), food (hunger + energy), drink
/// (energy + stamina). Consumes the items; fails for anything else.
pub fn use_item(
    user: &mut UserRecord,
    catalog: &Catalog,
    category: &str,
    item: &str,
    quantity: u32,
) -> Result<ItemEffects, RpgError> {
    if quantity == 0 {
        return Err(RpgError::InvalidArgument("quantity must be at least 1".into()));
    }
    let def = catalog.item(category, item).ok_or_else(|| RpgError::ItemNotFound {
        category: category.to_string(),
        item: item.to_string(),
    })?;
    let held = user.item_quantity(category, item);
    if held < quantity {
        return Err(RpgError::InsufficientItems {
            item: item.to_string(),
            needed: quantity,
            held,
        });
    }

    let effects = match category {
        "potion" => ItemEffects {
            health: def.restore * quantity,
            ..Default::default()
        },
        "food" => ItemEffects {
            hunger: def.hunger * quantity,
            energy: def.energy * quantity,
            ..Default::default()
        },
        "drink" => ItemEffects {
            energy: def.energy * quantity,
            stamina: def.stamina * quantity,
            ..Default::default()
        },
        _ => {
            return Err(RpgError::InvalidArgument(format!(
                "{} items cannot be used directly",
                category
            )))
        }
    };

    apply_effects(user, effects);
    remove_item(user, category, item, quantity)?;
    Ok(effects)
}

/// Apply restoration effects, clamping every pool to its maximum.
pub fn apply_effects(user: &mut UserRecord, effects: ItemEffects) {
    let stats = &mut user.stats;
    stats.health = (stats.health + effects.health).min(stats.max_health);
    stats.hunger = (stats.hunger + effects.hunger).min(stats.max_hunger);
    stats.energy = (stats.energy + effects.energy).min(stats.max_energy);
    stats.stamina = (stats.stamina + effects.stamina).min(stats.max_stamina);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpg::engine::tests::sample_user;

    fn catalog() -> Catalog {
        Catalog::builtin()
    }

    #[test]
    fn add_item_creates_sparse_entries() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        assert!(user.inventory.is_empty());
        assert_eq!(add_item(&mut user, "material", "wood", 3), 3);
        assert_eq!(add_item(&mut user, "material", "wood", 2), 5);
        assert_eq!(user.item_quantity("material", "wood"), 5);
    }

    #[test]
    fn remove_more_than_held_fails_and_leaves_inventory_unchanged() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        add_item(&mut user, "material", "iron_bar", 2);
        let err = remove_item(&mut user, "material", "iron_bar", 3).unwrap_err();
        assert!(matches!(err, RpgError::InsufficientItems { needed: 3, held: 2, .. }));
        assert_eq!(user.item_quantity("material", "iron_bar"), 2);
    }

    #[test]
    fn remove_unknown_item_is_not_found() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        let err = remove_item(&mut user, "material", "unobtainium", 1).unwrap_err();
        assert!(matches!(err, RpgError::ItemNotFound { .. }));
    }

    #[test]
    fn removing_to_zero_prunes_the_entry() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        add_item(&mut user, "material", "wood", 2);
        remove_item(&mut user, "material", "wood", 2).expect("remove");
        assert!(user.inventory.get("material").is_none());
    }

    #[test]
    fn equip_swaps_previous_item_back_to_inventory() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        add_item(&mut user, "weapon", "wooden_sword", 1);
        add_item(&mut user, "weapon", "iron_sword", 1);

        let prev = equip_item(&mut user, &catalog, "weapon", "wooden_sword").expect("equip");
        assert_eq!(prev, None);
        assert_eq!(user.item_quantity("weapon", "wooden_sword"), 0);

        let prev = equip_item(&mut user, &catalog, "weapon", "iron_sword").expect("swap");
        assert_eq!(prev.as_deref(), Some("wooden_sword"));
        assert_eq!(user.item_quantity("weapon", "wooden_sword"), 1);
        assert_eq!(user.equipment.weapon.as_deref(), Some("iron_sword"));
    }

    #[test]
    fn equip_then_unequip_restores_quantity() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        add_item(&mut user, "armor", "leather_armor", 2);
        equip_item(&mut user, &catalog, "armor", "leather_armor").expect("equip");
        assert_eq!(user.item_quantity("armor", "leather_armor"), 1);
        let back = unequip_item(&mut user, &catalog, "armor").expect("unequip");
        assert_eq!(back, "leather_armor");
        assert_eq!(user.item_quantity("armor", "leather_armor"), 2);
        assert_eq!(user.equipment.armor, None);
    }

    #[test]
    fn equip_rejects_non_equipment_categories() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        add_item(&mut user, "potion", "health_potion", 1);
        let err = equip_item(&mut user, &catalog, "potion", "health_potion").unwrap_err();
        assert!(matches!(err, RpgError::InvalidArgument(_)));
    }

    #[test]
    fn equipment_recompute_includes_weapon_and_accessory() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        let base_attack = user.stats.attack;
        add_item(&mut user, "weapon", "iron_sword", 1);
        add_item(&mut user, "accessory", "power_ring", 1);
        equip_item(&mut user, &catalog, "weapon", "iron_sword").expect("equip weapon");
        equip_item(&mut user, &catalog, "accessory", "power_ring").expect("equip ring");
        let sword = catalog.item("weapon", "iron_sword").unwrap();
        let ring = catalog.item("accessory", "power_ring").unwrap();
        assert_eq!(user.stats.attack, base_attack + sword.damage + ring.attack);
    }

    #[test]
    fn use_potion_restores_health_clamped() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        user.stats.health = user.stats.max_health - 10;
        add_item(&mut user, "potion", "health_potion", 2);
        let effects = use_item(&mut user, &catalog, "potion", "health_potion", 1).expect("use");
        assert!(effects.health > 0);
        assert_eq!(user.stats.health, user.stats.max_health);
        assert_eq!(user.item_quantity("potion", "health_potion"), 1);
    }

    #[test]
    fn use_material_is_rejected() {
        let catalog = catalog();
        let mut user = sample_user(&catalog);
        add_item(&mut user, "material", "wood", 1);
        let err = use_item(&mut user, &catalog, "material", "wood", 1).unwrap_err();
        assert!(matches!(err, RpgError::InvalidArgument(_)));
        // Failed use consumes nothing.
        assert_eq!(user.item_quantity("material", "wood"), 1);
    }
}
