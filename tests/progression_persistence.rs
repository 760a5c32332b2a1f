//! End-to-end progression over the JSON file store: state written by one
//! engine instance is picked up by the next, including cooldowns.

use chatforge::rpg::{Catalog, JsonFileStore, RetryPolicy, RpgEngine};
use tempfile::TempDir;

fn open_engine(path: &std::path::Path, seed: u64) -> RpgEngine<JsonFileStore> {
    let store = JsonFileStore::open(path).expect("store");
    RpgEngine::open_seeded(Catalog::builtin(), store, RetryPolicy::default(), seed)
        .expect("engine")
}

#[tokio::test]
async fn progress_survives_a_restart() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("game.json");

    {
        let engine = open_engine(&path, 1);
        engine.create_user("u1", "Alice").await.expect("create");
        engine.add_exp("u1", 500).await.expect("exp");
        engine.add_item("u1", "material", "wood", 7).await.expect("item");
        engine.perform_action("u1", "hunt").await.expect("hunt");
    }

    let engine = open_engine(&path, 2);
    let user = engine.user("u1").await.expect("user");
    assert_eq!(user.display_name, "Alice");
    assert!(user.level >= 2, "500 raw exp crosses the level-2 threshold");
    assert!(user.item_quantity("material", "wood") >= 7);
    assert!(user.cooldowns.contains_key("hunt"));

    // The restored cooldown still gates the action.
    let err = engine.perform_action("u1", "hunt").await.unwrap_err();
    assert!(err.is_cooldown());
}

#[tokio::test]
async fn leveling_grows_pools_and_restores_them() {
    let dir = TempDir::new().expect("tempdir");
    let engine = open_engine(&dir.path().join("game.json"), 3);
    let user = engine.create_user("u1", "Alice").await.expect("create");
    let base_max = user.stats.max_health;

    let gain = engine.add_exp("u1", 10_000).await.expect("exp");
    assert!(gain.leveled_up);
    assert!(gain.level > 2);

    let user = engine.user("u1").await.expect("user");
    assert!(user.stats.max_health > base_max);
    assert_eq!(user.stats.health, user.stats.max_health);
    assert_eq!(user.stats.stamina, user.stats.max_stamina);
}

#[tokio::test]
async fn second_process_cannot_share_the_document() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("game.json");
    let _first = JsonFileStore::open(&path).expect("first");
    assert!(JsonFileStore::open(&path).is_err());
}

#[tokio::test]
async fn corrupt_document_starts_fresh() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("game.json");
    std::fs::write(&path, "not json at all {{{").expect("garbage");
    let engine = open_engine(&path, 4);
    assert_eq!(engine.user_count().await, 0);
    engine.create_user("u1", "Alice").await.expect("create");
    assert_eq!(engine.user_count().await, 1);
}
