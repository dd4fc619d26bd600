use std::time::Duration;
use wayfarer_core::commands::Action;
use wayfarer_core::content::ParsedIntent;
use wayfarer_core::testing::TestHarness;
use wayfarer_core::{DirectorDirective, GameConfig, Subsystem};

fn every_two_commands() -> GameConfig {
    GameConfig::default().with_director_cadence(Duration::ZERO, 2)
}

#[tokio::test]
async fn test_director_runs_on_command_cadence() {
    let harness = TestHarness::with_config(every_two_commands());
    harness.content.push_directive(Some(DirectorDirective::new("the road grows lonely")));

    harness.input("wait").await;
    assert_eq!(harness.content.directive_calls(), 0);

    harness.input("wait").await;
    assert_eq!(harness.content.directive_calls(), 1);
    assert_eq!(
        harness.session.focus().await.as_deref(),
        Some("the road grows lonely")
    );

    harness.input("wait").await;
    assert_eq!(harness.content.directive_calls(), 1);

    harness.input("wait").await;
    assert_eq!(harness.content.directive_calls(), 2);
    // The second analysis returned nothing, so the first directive stands.
    assert_eq!(
        harness.world().await.directive().unwrap().focus,
        "the road grows lonely"
    );
}

#[tokio::test]
async fn test_default_cadence_waits_for_time() {
    let harness = TestHarness::new();
    for _ in 0..5 {
        harness.input("wait").await;
    }
    // The first run only needs the command count.
    assert_eq!(harness.content.directive_calls(), 1);

    for _ in 0..5 {
        harness.input("wait").await;
    }
    // The interval since that run has not elapsed.
    assert_eq!(harness.content.directive_calls(), 1);
}

#[tokio::test]
async fn test_directive_biases_generation() {
    let harness = TestHarness::with_config(every_two_commands());
    harness.content.push_directive(Some(
        DirectorDirective::new("ruins").with_enhancement(Subsystem::Entities, "favor ruins"),
    ));
    harness.input("wait").await;
    harness.input("wait").await;

    harness.expect_intent(ParsedIntent::new(Action::Move).with_target("north"));
    harness.input("go north").await;

    let requests = harness.content.entity_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].bias.as_deref(), Some("favor ruins"));
}
