use wayfarer_core::commands::Action;
use wayfarer_core::content::{GeneratedEntity, NarrativeOutcome, ParsedIntent};
use wayfarer_core::store::ItemHolder;
use wayfarer_core::testing::{
    assert_has_item, assert_logged, assert_no_item, assert_single_holders, sample_store,
    TestHarness,
};
use wayfarer_core::world::{Item, LogKind, Npc, Rarity};
use wayfarer_core::GameConfig;

fn intent(action: Action, target: &str) -> ParsedIntent {
    ParsedIntent::new(action).with_target(target)
}

/// Harness with the crossroads searched and holding a lantern and a rope,
/// plus Old Tam carrying a flask.
fn stocked_harness() -> TestHarness {
    let mut store = sample_store();
    let key = store.current_key();
    store
        .reveal_location_items(
            &key,
            vec![
                Item::new("brass lantern", Rarity::Common),
                Item::new("coil of rope", Rarity::Common),
            ],
        )
        .unwrap();
    store
        .reveal_location_npcs(
            &key,
            vec![Npc::new("Old Tam", Rarity::Common).with_item(Item::new("tin flask", Rarity::Common))],
        )
        .unwrap();
    TestHarness::with_store(store, GameConfig::default())
}

#[tokio::test]
async fn test_pickup_moves_item_into_inventory() {
    let harness = stocked_harness();
    harness.expect_intent(intent(Action::Pickup, "brass lantern"));
    harness.input("take the lantern").await;

    let world = harness.world().await;
    assert_has_item(&world, "brass lantern");
    assert_eq!(world.location_items().unwrap().len(), 1);
    assert_eq!(world.character().energy(), 98);
    let id = world.inventory_item("brass lantern").unwrap().id;
    assert_eq!(world.holders_of(id), vec![ItemHolder::Inventory]);
    assert_single_holders(&world);
}

#[tokio::test]
async fn test_pickup_of_missing_item_is_refused() {
    let harness = stocked_harness();
    harness.expect_intent(intent(Action::Pickup, "golden crown"));
    let response = harness.input("take the crown").await;

    assert_logged(&response, LogKind::System);
    let world = harness.world().await;
    assert!(world.inventory().is_empty());
    assert_eq!(world.character().energy(), 100);
}

#[tokio::test]
async fn test_pickup_before_search_is_refused() {
    let harness = TestHarness::new();
    harness.expect_intent(intent(Action::Pickup, "stick"));
    let response = harness.input("take a stick").await;

    assert!(response.text().contains("haven't searched"));
    assert!(harness.world().await.location_items().is_none());
}

#[tokio::test]
async fn test_equip_and_unequip() {
    let harness = stocked_harness();
    harness.expect_intent(intent(Action::Pickup, "brass lantern"));
    harness.input("take the lantern").await;

    harness.expect_intent(intent(Action::Equip, "brass lantern").with_parameter("limb", "left arm"));
    harness.input("hold the lantern in my left hand").await;
    {
        let world = harness.world().await;
        assert_no_item(&world, "brass lantern");
        let limb = world.character().limb("left arm").unwrap();
        assert_eq!(limb.equipped.len(), 1);
        assert_single_holders(&world);
    }

    harness.expect_intent(intent(Action::Unequip, "brass lantern"));
    harness.input("put the lantern away").await;
    let world = harness.world().await;
    assert_has_item(&world, "brass lantern");
    assert!(world.character().limb("left arm").unwrap().equipped.is_empty());
}

#[tokio::test]
async fn test_give_transfers_only_on_success() {
    let harness = stocked_harness();
    harness.expect_intent(intent(Action::Pickup, "coil of rope"));
    harness.input("take the rope").await;

    harness.expect_intent(intent(Action::GiveItem, "coil of rope").with_target("Old Tam"));
    harness
        .content
        .push_narrative(NarrativeOutcome::narration("Tam waves the rope away.").failed());
    harness.input("offer Tam the rope").await;
    assert_has_item(&harness.world().await, "coil of rope");

    harness.expect_intent(intent(Action::GiveItem, "coil of rope").with_target("Old Tam"));
    harness.expect_narrative("Tam takes the rope with a grunt.");
    harness.input("insist Tam takes the rope").await;

    let world = harness.world().await;
    assert_no_item(&world, "coil of rope");
    let tam = world.find_visible_npc("Old Tam").unwrap();
    assert!(tam.inventory.iter().any(|i| i.name == "coil of rope"));
    assert_single_holders(&world);
}

#[tokio::test]
async fn test_request_item_from_npc() {
    let harness = stocked_harness();
    harness.expect_intent(intent(Action::RequestItem, "tin flask").with_target("Old Tam"));
    harness.expect_narrative("Tam hands over the flask.");
    harness.input("ask Tam for the flask").await;

    let world = harness.world().await;
    assert_has_item(&world, "tin flask");
    assert!(world.find_visible_npc("Old Tam").unwrap().inventory.is_empty());
    assert_single_holders(&world);
}

#[tokio::test]
async fn test_crafting_consumes_staged_items() {
    let harness = stocked_harness();
    for name in ["brass lantern", "coil of rope"] {
        harness.expect_intent(intent(Action::Pickup, name));
        harness.input("take it").await;
        harness.expect_intent(intent(Action::StageCrafting, name));
        harness.input("set it aside").await;
    }
    assert_eq!(harness.world().await.crafting().len(), 2);

    harness.expect_intent(ParsedIntent::new(Action::Craft).with_parameter("goal", "signal lamp"));
    harness.expect_narrative("You lash the lantern to a pole.");
    harness.expect_entity(GeneratedEntity::Item(Item::new("signal pole", Rarity::Uncommon)));
    harness.input("make a signal lamp").await;

    let world = harness.world().await;
    assert!(world.crafting().is_empty());
    assert_has_item(&world, "signal pole");
    assert_eq!(world.inventory().len(), 1);
    assert_eq!(world.character().skills["crafting"].experience, 50);
    assert_single_holders(&world);
}

#[tokio::test]
async fn test_unstage_returns_item() {
    let harness = stocked_harness();
    harness.expect_intent(intent(Action::Pickup, "coil of rope"));
    harness.input("take the rope").await;
    harness.expect_intent(intent(Action::StageCrafting, "coil of rope"));
    harness.input("set the rope aside").await;
    harness.expect_intent(intent(Action::UnstageCrafting, "coil of rope"));
    harness.input("take the rope back").await;

    let world = harness.world().await;
    assert!(world.crafting().is_empty());
    assert_has_item(&world, "coil of rope");
}
