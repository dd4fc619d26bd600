use std::sync::Arc;
use wayfarer_core::commands::Action;
use wayfarer_core::content::{ContentError, EntityKind, GeneratedEntity, ParsedIntent};
use wayfarer_core::testing::{assert_at, Call, MockContent, TestHarness};
use wayfarer_core::world::{Character, LocationData, LogKind};
use wayfarer_core::{GameConfig, GameSession, SessionError};

#[tokio::test]
async fn test_start_generates_character_and_origin() {
    let mock = Arc::new(MockContent::new());
    mock.push_entity(GeneratedEntity::Character(Character::new(
        "Ilse",
        "disgraced lighthouse keeper",
    )));
    mock.push_entity(GeneratedEntity::Location(
        LocationData::new("Salt Flats").with_description("White crust to the horizon."),
    ));

    let session = GameSession::start(mock.clone(), GameConfig::new("The Salt Roads"))
        .await
        .unwrap();

    let world = session.view().await;
    assert_eq!(world.character().name, "Ilse");
    assert_eq!(world.current_location_name(), "Salt Flats");
    assert_at(&world, 0, 0);
    assert_eq!(world.log()[0].kind, LogKind::System);
    assert!(world.log()[0].text.contains("The Salt Roads"));
    assert!(world.director_checkpoint().is_some());

    let calls = mock.calls();
    assert_eq!(calls[0], Call::Entity(EntityKind::Character));
    assert_eq!(calls[1], Call::Entity(EntityKind::Location));
    assert_eq!(mock.call_count(&Call::DecideTrigger), 1);
    assert_eq!(mock.directive_calls(), 1);
}

#[tokio::test]
async fn test_start_fails_when_generation_fails() {
    let mock = Arc::new(MockContent::new());
    mock.fail_entity(ContentError::Unavailable("offline".to_string()));

    let result = GameSession::start(mock, GameConfig::default()).await;
    assert!(matches!(result, Err(SessionError::Content(_))));
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("save.json");

    let harness = TestHarness::new();
    harness.expect_intent(ParsedIntent::new(Action::Move).with_target("north"));
    harness.input("go north").await;
    harness.session.save(&path).await.unwrap();

    let loaded = GameSession::load(&path, Arc::new(MockContent::new()), GameConfig::default())
        .await
        .unwrap();
    let before = harness.world().await;
    let after = loaded.view().await;

    assert_at(&after, 0, 1);
    assert_eq!(after.character(), before.character());
    assert_eq!(after.visited_locations().len(), 2);
    assert_eq!(after.log().len(), before.log().len());
    assert_eq!(after.command_count(), 1);
}

#[tokio::test]
async fn test_load_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = GameSession::load(
        dir.path().join("nope.json"),
        Arc::new(MockContent::new()),
        GameConfig::default(),
    )
    .await;
    assert!(matches!(missing, Err(SessionError::Io(_))));

    let garbage = dir.path().join("garbage.json");
    tokio::fs::write(&garbage, "{ not json").await.unwrap();
    let result = GameSession::load(&garbage, Arc::new(MockContent::new()), GameConfig::default()).await;
    assert!(matches!(result, Err(SessionError::Serialization(_))));
}

#[tokio::test]
async fn test_failed_intent_parse_is_an_error_entry() {
    let harness = TestHarness::new();
    harness
        .content
        .fail_intent(ContentError::Malformed("no json".to_string()));

    let response = harness.input("go north").await;
    assert!(response.entries.iter().any(|e| e.kind == LogKind::Error));
    assert_at(&harness.world().await, 0, 0);
    assert_eq!(response.command_count, 1);
}

#[tokio::test]
async fn test_implausible_intent_is_refused() {
    let harness = TestHarness::new();
    harness.expect_intent(ParsedIntent::implausible("You cannot fly."));

    let response = harness.input("fly to the moon").await;
    assert!(response.text().contains("You cannot fly."));
    assert_eq!(harness.content.entity_calls(), 0);
    assert_eq!(harness.world().await.character().energy(), 100);
}
