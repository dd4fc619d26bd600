use wayfarer_core::commands::Action;
use wayfarer_core::content::ParsedIntent;
use wayfarer_core::store::WorldStore;
use wayfarer_core::testing::{assert_logged, TestHarness};
use wayfarer_core::world::{default_limbs, Character, Direction, Item, LocationData, LogKind, Npc, Rarity};
use wayfarer_core::GameConfig;

/// A defeated Wren at a searched crossroads with a lamp and Old Tam.
fn defeated_harness() -> TestHarness {
    let limbs = default_limbs()
        .into_iter()
        .map(|l| l.with_health(0))
        .collect();
    let character = Character::new("Wren", "wandering cartographer").with_limbs(limbs);
    let start = LocationData::new("Crossroads").with_exits([Direction::North]);
    let mut store = WorldStore::new(character, start);
    let key = store.current_key();
    store
        .reveal_location_items(&key, vec![Item::new("lamp", Rarity::Common)])
        .unwrap();
    store
        .reveal_location_npcs(&key, vec![Npc::new("Old Tam", Rarity::Common)])
        .unwrap();
    TestHarness::with_store(store, GameConfig::default())
}

#[tokio::test]
async fn test_defeated_character_cannot_act() {
    let harness = defeated_harness();

    harness.expect_intent(ParsedIntent::new(Action::Pickup).with_target("lamp"));
    let response = harness.input("take lamp").await;
    assert_logged(&response, LogKind::System);

    harness.expect_intent(ParsedIntent::new(Action::Talk).with_target("Old Tam"));
    harness.input("talk to tam").await;

    harness.expect_intent(ParsedIntent::new(Action::DiscoverItems));
    harness.input("search").await;

    let world = harness.world().await;
    assert!(world.character().is_defeated());
    assert!(world.inventory().is_empty());
    assert_eq!(world.location_items().unwrap().len(), 1);
    assert!(world.conversation().is_none());
    assert_eq!(world.character().energy(), 100);
    assert!(harness.content.narrative_requests().is_empty());
    assert_eq!(harness.content.entity_calls(), 0);
}

#[tokio::test]
async fn test_defeated_character_can_check_status() {
    let harness = defeated_harness();
    harness.expect_intent(ParsedIntent::new(Action::Status));

    let response = harness.input("status").await;
    assert!(response.text().contains("defeated"));
    assert!(!response.entries.iter().any(|e| e.kind == LogKind::Error));
}
