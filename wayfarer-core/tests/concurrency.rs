use wayfarer_core::commands::Action;
use wayfarer_core::content::ParsedIntent;
use wayfarer_core::testing::TestHarness;
use wayfarer_core::world::LogKind;
use wayfarer_core::SessionError;

#[tokio::test]
async fn test_second_command_is_rejected_while_busy() {
    let harness = TestHarness::new();
    harness.expect_intent(ParsedIntent::new(Action::Status));
    harness.expect_intent(ParsedIntent::new(Action::Status));

    let (first, second) = tokio::join!(harness.try_input("status"), harness.try_input("status"));

    let results = [first, second];
    let busy = results
        .iter()
        .filter(|r| matches!(r, Err(SessionError::Busy)))
        .count();
    assert_eq!(busy, 1);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let world = harness.world().await;
    assert_eq!(world.command_count(), 1);
    let commands = world
        .log()
        .iter()
        .filter(|e| e.kind == LogKind::Command)
        .count();
    assert_eq!(commands, 1);
}

#[tokio::test]
async fn test_gate_reopens_after_a_turn() {
    let harness = TestHarness::new();
    assert!(!harness.session.is_busy());

    harness.input("hum a tune").await;
    assert!(!harness.session.is_busy());

    harness.input("hum another").await;
    assert_eq!(harness.world().await.command_count(), 2);
}

#[tokio::test]
async fn test_busy_rejection_leaves_state_untouched() {
    let harness = TestHarness::new();
    let _permit = harness.session.context().scheduler().try_console().unwrap();

    let result = harness.try_input("go north").await;
    assert!(matches!(result, Err(SessionError::Busy)));

    let world = harness.world().await;
    assert!(world.log().is_empty());
    assert_eq!(world.command_count(), 0);
    assert!(harness.content.calls().is_empty());
}
