//! Economy round trips through the public engine API: shop, crafting,
//! market and guilds acting together on one document.

use chatforge::rpg::{Catalog, MemoryStore, RetryPolicy, RpgEngine};

fn engine(seed: u64) -> RpgEngine<MemoryStore> {
    RpgEngine::open_seeded(
        Catalog::builtin(),
        MemoryStore::new(),
        RetryPolicy::default(),
        seed,
    )
    .expect("engine")
}

#[tokio::test]
async fn gather_craft_equip_sell_cycle() {
    let engine = engine(1);
    engine.create_user("u1", "Alice").await.expect("create");

    // Raise crafting and stock materials directly; gathering randomness is
    // covered elsewhere.
    engine.add_item("u1", "material", "iron_ore", 8).await.expect("ore");
    for _ in 0..4 {
        engine.craft("u1", "iron_bar").await.expect("smelt");
    }
    let mut user = engine.user("u1").await.expect("user");
    assert_eq!(user.item_quantity("material", "iron_bar"), 4);

    // iron_sword needs crafting level 2.
    while engine.user("u1").await.unwrap().skills["crafting"] < 2 {
        engine.add_skill_exp("u1", "crafting").await.expect("practice");
    }
    engine.craft("u1", "iron_sword").await.expect("forge");

    let attack_before = engine.user("u1").await.unwrap().stats.attack;
    engine.equip_item("u1", "weapon", "iron_sword").await.expect("equip");
    user = engine.user("u1").await.expect("user");
    let sword_damage = engine
        .catalog()
        .item("weapon", "iron_sword")
        .unwrap()
        .damage;
    assert_eq!(user.stats.attack, attack_before + sword_damage);

    // Leftover bar sells at the catalog price.
    let bar_price = engine.catalog().item("material", "iron_bar").unwrap().sell_price;
    let money_before = user.money;
    let trade = engine.sell_item("u1", "material", "iron_bar", 1).await.expect("sell");
    assert_eq!(trade.money_delta, bar_price);
    assert_eq!(engine.user("u1").await.unwrap().money, money_before + bar_price);
}

#[tokio::test]
async fn market_transfers_between_players() {
    let engine = engine(2);
    engine.create_user("seller", "S").await.expect("seller");
    engine.create_user("buyer", "B").await.expect("buyer");
    engine.add_item("seller", "potion", "health_potion", 3).await.expect("stock");

    let listing = engine
        .list_item("seller", "potion", "health_potion", 3, 150)
        .await
        .expect("list");
    assert_eq!(engine.listings().await.len(), 1);

    engine.buy_listing("buyer", listing.id).await.expect("buy");
    let buyer = engine.user("buyer").await.expect("buyer");
    assert_eq!(buyer.item_quantity("potion", "health_potion"), 3);
    assert!(engine.listings().await.is_empty());

    // The listing is gone; a second purchase fails cleanly.
    assert!(engine.buy_listing("buyer", listing.id).await.is_err());
}

#[tokio::test]
async fn guild_membership_is_mirrored() {
    let engine = engine(3);
    engine.create_user("a", "A").await.expect("a");
    engine.create_user("b", "B").await.expect("b");

    engine.create_guild("a", "Ironclad").await.expect("found");
    engine.join_guild("b", "Ironclad").await.expect("join");

    let guild = engine.guild_of("b").await.expect("lookup").expect("guild");
    assert_eq!(guild.name, "Ironclad");
    assert_eq!(guild.members, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        engine.user("b").await.unwrap().guild.as_deref(),
        Some("Ironclad")
    );
}

#[tokio::test]
async fn travel_gates_compound_with_economy() {
    let engine = engine(4);
    engine.create_user("u1", "Alice").await.expect("create");

    // dungeon needs level 20.
    assert!(engine.travel("u1", "dungeon").await.is_err());

    engine.add_exp("u1", 1_000_000).await.expect("exp");
    let cost = engine.catalog().settings.locations["dungeon"].cost;
    let before = engine.user("u1").await.unwrap().money;
    engine.travel("u1", "dungeon").await.expect("travel");
    let user = engine.user("u1").await.expect("user");
    assert_eq!(user.location, "dungeon");
    assert_eq!(user.money, before - cost);
}
