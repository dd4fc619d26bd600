use wayfarer_core::commands::Action;
use wayfarer_core::content::{ContentError, ParsedIntent};
use wayfarer_core::testing::{assert_logged, sample_store, TestHarness};
use wayfarer_core::world::{LogKind, Npc, Rarity};
use wayfarer_core::GameConfig;

fn harness_with_tam() -> TestHarness {
    let mut store = sample_store();
    let key = store.current_key();
    store
        .reveal_location_npcs(&key, vec![Npc::new("Old Tam", Rarity::Common)])
        .unwrap();
    TestHarness::with_store(store, GameConfig::default())
}

#[tokio::test]
async fn test_talk_starts_conversation() {
    let harness = harness_with_tam();
    harness.expect_intent(ParsedIntent::new(Action::Talk).with_target("Old Tam"));
    harness.expect_narrative("Tam squints at you. \"Road's long today.\"");
    harness.input("talk to tam").await;

    let world = harness.world().await;
    assert_eq!(world.conversation().unwrap().npc_name, "Old Tam");
    assert_eq!(world.character().energy(), 99);
}

#[tokio::test]
async fn test_failed_dialogue_starts_no_conversation() {
    let harness = harness_with_tam();
    harness.expect_intent(ParsedIntent::new(Action::Talk).with_target("Old Tam"));
    harness
        .content
        .fail_narrative(ContentError::Unavailable("offline".to_string()));

    let response = harness.input("talk to tam").await;
    assert_logged(&response, LogKind::Error);

    let world = harness.world().await;
    assert!(world.conversation().is_none());
    assert_eq!(world.character().energy(), 99);
}
