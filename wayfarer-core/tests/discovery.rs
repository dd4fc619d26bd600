use wayfarer_core::commands::Action;
use wayfarer_core::content::{GeneratedEntity, NarrativeOutcome, ParsedIntent};
use wayfarer_core::discovery::{LeadHint, LeadTarget};
use wayfarer_core::testing::{sample_store, Call, TestHarness};
use wayfarer_core::world::{EntityRef, Item, LocationData, Npc, Rarity};
use wayfarer_core::GameConfig;

fn harness_with_tam() -> TestHarness {
    let mut store = sample_store();
    let key = store.current_key();
    store
        .reveal_location_npcs(&key, vec![Npc::new("Old Tam", Rarity::Common)])
        .unwrap();
    TestHarness::with_store(store, GameConfig::default().with_discovery_batch(1..=1))
}

#[tokio::test]
async fn test_dialogue_lead_is_fulfilled_by_discovered_item() {
    let harness = harness_with_tam();
    harness.expect_intent(ParsedIntent::new(Action::Talk).with_target("Old Tam"));
    harness.content.push_narrative(
        NarrativeOutcome::narration("Tam mutters about a silver key lost in the ditch.")
            .with_lead(LeadHint::new(LeadTarget::Item, "silver key")),
    );
    harness.input("ask Tam about the road").await;

    let lead = {
        let world = harness.world().await;
        let open = world.ledger().unresolved(Some(LeadTarget::Item));
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].origin, "Old Tam");
        open[0].id
    };

    let key = Item::new("silver key", Rarity::Uncommon);
    let key_id = key.id;
    harness.expect_intent(ParsedIntent::new(Action::DiscoverItems));
    harness.expect_entity(GeneratedEntity::Item(key));
    harness.content.push_link(Some(lead));
    let response = harness.input("search the ditch").await;
    assert!(response.text().contains("silver key"));

    let world = harness.world().await;
    let lead = world.ledger().get(lead).unwrap();
    assert!(lead.is_discovered());
    assert_eq!(lead.fulfilled_by(), Some(&EntityRef::Item(key_id)));
    assert!(world.ledger().unresolved(None).is_empty());
    assert_eq!(world.location_items().unwrap().len(), 1);
}

#[tokio::test]
async fn test_repeated_lead_is_not_duplicated() {
    let harness = harness_with_tam();
    for _ in 0..2 {
        harness.expect_intent(ParsedIntent::new(Action::Talk).with_target("Old Tam"));
        harness.content.push_narrative(
            NarrativeOutcome::narration("Tam speaks of the drowned chapel again.")
                .with_lead(LeadHint::new(LeadTarget::Location, "drowned chapel")),
        );
        harness.input("tell me more").await;
    }

    let world = harness.world().await;
    assert_eq!(world.ledger().len(), 1);
}

#[tokio::test]
async fn test_new_location_can_fulfil_a_lead() {
    let harness = harness_with_tam();
    harness.expect_intent(ParsedIntent::new(Action::Talk).with_target("Old Tam"));
    harness.content.push_narrative(
        NarrativeOutcome::narration("North of here stands a drowned chapel.")
            .with_lead(LeadHint::new(LeadTarget::Location, "drowned chapel")),
    );
    harness.input("what lies north?").await;
    let lead = harness.world().await.ledger().leads()[0].id;

    harness.expect_intent(ParsedIntent::new(Action::Move).with_target("north"));
    harness.expect_entity(GeneratedEntity::Location(LocationData::new(
        "Drowned Chapel",
    )));
    harness.content.push_link(Some(lead));
    harness.input("go north").await;

    let world = harness.world().await;
    let lead = world.ledger().get(lead).unwrap();
    assert_eq!(
        lead.fulfilled_by(),
        Some(&EntityRef::Location(world.current_key()))
    );
}

#[tokio::test]
async fn test_no_link_call_without_open_leads() {
    let harness = harness_with_tam();
    harness.expect_intent(ParsedIntent::new(Action::DiscoverItems));
    harness.input("search").await;

    assert_eq!(harness.content.call_count(&Call::Link), 0);
    assert_eq!(harness.world().await.location_items().unwrap().len(), 1);
}
