//! Testing utilities for the engine.
//!
//! This module provides tools for integration testing:
//! - `MockContent` for deterministic testing without a generative backend
//! - `TestHarness` for scripted game scenarios
//! - Assertion helpers for verifying world state

use crate::config::GameConfig;
use crate::content::{
    ContentError, ContentService, ContextSnapshot, DirectorRequest, EntityKind, EntityRequest,
    EventRequest, GeneratedEntity, ImageHandle, NarrativeKind, NarrativeOutcome, NarrativeRequest,
    ParsedIntent, ResolutionCheck, TriggerDecision,
};
use crate::director::DirectorDirective;
use crate::discovery::{LeadSummary, LinkCandidate};
use crate::effects::EventEffects;
use crate::session::{GameSession, Response, SessionError};
use crate::store::WorldStore;
use crate::world::{
    ActiveEvent, Character, Coordinates, Direction, Item, LeadId, LocationData, LogKind, Npc,
    Rarity,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

type Reply<T> = Result<T, ContentError>;

/// A recorded call to the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ParseIntent,
    Narrative(NarrativeKind),
    Entity(EntityKind),
    DecideTrigger,
    EventEffects,
    Resolution,
    Link,
    Directive,
    Image,
}

#[derive(Default)]
struct Script {
    intents: VecDeque<Reply<ParsedIntent>>,
    narratives: VecDeque<Reply<NarrativeOutcome>>,
    entities: VecDeque<Reply<GeneratedEntity>>,
    triggers: VecDeque<Reply<TriggerDecision>>,
    effects: VecDeque<Reply<EventEffects>>,
    resolutions: VecDeque<Reply<ResolutionCheck>>,
    links: VecDeque<Reply<Option<LeadId>>>,
    directives: VecDeque<Reply<Option<DirectorDirective>>>,
    images: VecDeque<Reply<Option<ImageHandle>>>,
    calls: Vec<Call>,
    entity_requests: Vec<EntityRequest>,
    narrative_requests: Vec<NarrativeRequest>,
}

/// A content service that returns scripted replies.
///
/// Each method pops from its own queue. When a queue runs dry the mock
/// falls back to a bland default so tests only script what they care
/// about. Every reply is preceded by a yield so concurrent callers
/// interleave the way they would against a real backend.
#[derive(Default)]
pub struct MockContent {
    script: Mutex<Script>,
}

impl MockContent {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_intent(&self, intent: ParsedIntent) {
        self.script().intents.push_back(Ok(intent));
    }

    pub fn fail_intent(&self, error: ContentError) {
        self.script().intents.push_back(Err(error));
    }

    pub fn push_narrative(&self, outcome: NarrativeOutcome) {
        self.script().narratives.push_back(Ok(outcome));
    }

    pub fn fail_narrative(&self, error: ContentError) {
        self.script().narratives.push_back(Err(error));
    }

    pub fn push_entity(&self, entity: GeneratedEntity) {
        self.script().entities.push_back(Ok(entity));
    }

    pub fn fail_entity(&self, error: ContentError) {
        self.script().entities.push_back(Err(error));
    }

    pub fn push_trigger(&self, decision: TriggerDecision) {
        self.script().triggers.push_back(Ok(decision));
    }

    pub fn push_effects(&self, effects: EventEffects) {
        self.script().effects.push_back(Ok(effects));
    }

    pub fn fail_effects(&self, error: ContentError) {
        self.script().effects.push_back(Err(error));
    }

    pub fn push_resolution(&self, check: ResolutionCheck) {
        self.script().resolutions.push_back(Ok(check));
    }

    pub fn fail_resolution(&self, error: ContentError) {
        self.script().resolutions.push_back(Err(error));
    }

    pub fn push_link(&self, lead: Option<LeadId>) {
        self.script().links.push_back(Ok(lead));
    }

    pub fn push_directive(&self, directive: Option<DirectorDirective>) {
        self.script().directives.push_back(Ok(directive));
    }

    pub fn fail_directive(&self, error: ContentError) {
        self.script().directives.push_back(Err(error));
    }

    pub fn push_image(&self, image: Option<ImageHandle>) {
        self.script().images.push_back(Ok(image));
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    pub fn call_count(&self, call: &Call) -> usize {
        self.script().calls.iter().filter(|c| *c == call).count()
    }

    pub fn directive_calls(&self) -> usize {
        self.call_count(&Call::Directive)
    }

    /// Number of entity generations of any kind.
    pub fn entity_calls(&self) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Entity(_)))
            .count()
    }

    pub fn entity_requests(&self) -> Vec<EntityRequest> {
        self.script().entity_requests.clone()
    }

    pub fn narrative_requests(&self) -> Vec<NarrativeRequest> {
        self.script().narrative_requests.clone()
    }

    /// Forget recorded calls, keeping any queued replies.
    pub fn clear_calls(&self) {
        let mut script = self.script();
        script.calls.clear();
        script.entity_requests.clear();
        script.narrative_requests.clear();
    }

    fn record(&self, call: Call) {
        self.script().calls.push(call);
    }
}

/// The entity the mock produces for `kind` when nothing is queued.
pub fn default_entity(kind: EntityKind) -> GeneratedEntity {
    match kind {
        EntityKind::Character => {
            GeneratedEntity::Character(Character::new("Wren", "wandering cartographer"))
        }
        EntityKind::Location => GeneratedEntity::Location(
            LocationData::new("Open Road")
                .with_description("The road runs on between low hills.")
                .with_exits(Direction::all()),
        ),
        EntityKind::Item => GeneratedEntity::Item(Item::new("smooth pebble", Rarity::Common)),
        EntityKind::Npc => GeneratedEntity::Npc(Npc::new("Stranger", Rarity::Common)),
    }
}

#[async_trait]
impl ContentService for MockContent {
    async fn parse_intent(
        &self,
        _raw: &str,
        _snapshot: &ContextSnapshot,
    ) -> Result<ParsedIntent, ContentError> {
        tokio::task::yield_now().await;
        let mut script = self.script();
        script.calls.push(Call::ParseIntent);
        script
            .intents
            .pop_front()
            .unwrap_or_else(|| Ok(ParsedIntent::new(crate::commands::Action::Unrecognized)))
    }

    async fn generate_narrative(
        &self,
        request: NarrativeRequest,
    ) -> Result<NarrativeOutcome, ContentError> {
        tokio::task::yield_now().await;
        let mut script = self.script();
        script.calls.push(Call::Narrative(request.kind));
        script.narrative_requests.push(request);
        script
            .narratives
            .pop_front()
            .unwrap_or_else(|| Ok(NarrativeOutcome::narration("Nothing remarkable happens.")))
    }

    async fn generate_entity(
        &self,
        request: EntityRequest,
    ) -> Result<GeneratedEntity, ContentError> {
        tokio::task::yield_now().await;
        let mut script = self.script();
        let kind = request.kind;
        script.calls.push(Call::Entity(kind));
        script.entity_requests.push(request);
        script
            .entities
            .pop_front()
            .unwrap_or_else(|| Ok(default_entity(kind)))
    }

    async fn decide_event_trigger(
        &self,
        _trigger: &str,
        _snapshot: &ContextSnapshot,
    ) -> Result<TriggerDecision, ContentError> {
        tokio::task::yield_now().await;
        let mut script = self.script();
        script.calls.push(Call::DecideTrigger);
        script
            .triggers
            .pop_front()
            .unwrap_or_else(|| Ok(TriggerDecision::decline()))
    }

    async fn generate_event_effects(
        &self,
        _request: EventRequest,
    ) -> Result<EventEffects, ContentError> {
        tokio::task::yield_now().await;
        let mut script = self.script();
        script.calls.push(Call::EventEffects);
        script.effects.pop_front().unwrap_or_else(|| Ok(EventEffects::default()))
    }

    async fn check_event_resolution(
        &self,
        _event: &ActiveEvent,
        _input: &str,
        _snapshot: &ContextSnapshot,
    ) -> Result<ResolutionCheck, ContentError> {
        tokio::task::yield_now().await;
        let mut script = self.script();
        script.calls.push(Call::Resolution);
        script
            .resolutions
            .pop_front()
            .unwrap_or_else(|| Ok(ResolutionCheck::unresolved("The moment hangs unresolved.")))
    }

    async fn link_entity_to_lead(
        &self,
        _candidate: &LinkCandidate,
        _leads: &[LeadSummary],
    ) -> Result<Option<LeadId>, ContentError> {
        tokio::task::yield_now().await;
        let mut script = self.script();
        script.calls.push(Call::Link);
        script.links.pop_front().unwrap_or(Ok(None))
    }

    async fn analyze_for_directive(
        &self,
        _request: DirectorRequest,
    ) -> Result<Option<DirectorDirective>, ContentError> {
        tokio::task::yield_now().await;
        self.record(Call::Directive);
        self.script().directives.pop_front().unwrap_or(Ok(None))
    }

    async fn generate_image(
        &self,
        _visual_hint: &str,
        _style: &str,
    ) -> Result<Option<ImageHandle>, ContentError> {
        tokio::task::yield_now().await;
        self.record(Call::Image);
        self.script().images.pop_front().unwrap_or(Ok(None))
    }
}

/// A store with "Wren" standing at an unsearched crossroads with exits
/// north and south.
pub fn sample_store() -> WorldStore {
    let character = Character::new("Wren", "wandering cartographer");
    let start = LocationData::new("Crossroads")
        .with_description("Two dusty roads meet beneath a leaning signpost.")
        .with_exits([Direction::North, Direction::South]);
    WorldStore::new(character, start)
}

// ============================================================================
// Harness
// ============================================================================

/// Test harness for running game scenarios.
pub struct TestHarness {
    /// The mock content service.
    pub content: Arc<MockContent>,
    /// The session under test.
    pub session: GameSession,
}

impl TestHarness {
    /// A session over [`sample_store`] with default configuration.
    pub fn new() -> Self {
        Self::with_config(GameConfig::new("Test Campaign"))
    }

    pub fn with_config(config: GameConfig) -> Self {
        Self::with_store(sample_store(), config)
    }

    pub fn with_store(store: WorldStore, config: GameConfig) -> Self {
        let content = Arc::new(MockContent::new());
        let session = GameSession::with_store(store, content.clone(), config);
        Self { content, session }
    }

    /// Queue an intent for the next input.
    pub fn expect_intent(&self, intent: ParsedIntent) -> &Self {
        self.content.push_intent(intent);
        self
    }

    /// Queue a narrative outcome.
    pub fn expect_narrative(&self, text: impl Into<String>) -> &Self {
        self.content.push_narrative(NarrativeOutcome::narration(text));
        self
    }

    pub fn expect_entity(&self, entity: GeneratedEntity) -> &Self {
        self.content.push_entity(entity);
        self
    }

    /// Submit input. Panics if the session reports busy.
    pub async fn input(&self, text: &str) -> Response {
        match self.session.submit(text).await {
            Ok(response) => response,
            Err(e) => panic!("input {text:?} failed: {e}"),
        }
    }

    /// Submit input and return the raw result.
    pub async fn try_input(&self, text: &str) -> Result<Response, SessionError> {
        self.session.submit(text).await
    }

    pub async fn world(&self) -> WorldStore {
        self.session.view().await
    }

    pub async fn coordinates(&self) -> Coordinates {
        self.session.context().store().lock().await.coordinates()
    }

    pub async fn energy(&self) -> i32 {
        self.session.context().store().lock().await.character().energy()
    }

    pub async fn inventory_names(&self) -> Vec<String> {
        self.session
            .context()
            .store()
            .lock()
            .await
            .inventory()
            .iter()
            .map(|i| i.name.clone())
            .collect()
    }

    pub async fn in_event(&self) -> bool {
        self.session.context().store().lock().await.has_active_event()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the character stands at `(x, y)`.
#[track_caller]
pub fn assert_at(world: &WorldStore, x: i32, y: i32) {
    let actual = world.coordinates();
    assert_eq!(
        actual,
        Coordinates::new(x, y),
        "Expected to be at {x},{y}, got {actual}"
    );
}

/// Assert the inventory holds an item with the given name.
#[track_caller]
pub fn assert_has_item(world: &WorldStore, name: &str) {
    assert!(
        world.inventory_item(name).is_some(),
        "Expected '{name}' in inventory"
    );
}

/// Assert the inventory does NOT hold an item with the given name.
#[track_caller]
pub fn assert_no_item(world: &WorldStore, name: &str) {
    assert!(
        world.inventory_item(name).is_none(),
        "Expected '{name}' to NOT be in inventory"
    );
}

/// Assert an event is active.
#[track_caller]
pub fn assert_event_active(world: &WorldStore) {
    assert!(world.has_active_event(), "Expected an active event");
}

#[track_caller]
pub fn assert_no_event(world: &WorldStore) {
    assert!(!world.has_active_event(), "Expected no active event");
}

/// Assert the response contains an entry of `kind`.
#[track_caller]
pub fn assert_logged(response: &Response, kind: LogKind) {
    assert!(
        response.entries.iter().any(|e| e.kind == kind),
        "Expected a {kind:?} entry, got {:?}",
        response.entries
    );
}

/// Assert every item is held in exactly one place.
#[track_caller]
pub fn assert_single_holders(world: &WorldStore) {
    let mut ids = Vec::new();
    ids.extend(world.inventory().iter().map(|i| i.id));
    ids.extend(world.crafting().iter().map(|i| i.id));
    for visited in world.visited_locations().values() {
        if let Some(items) = &visited.items {
            ids.extend(items.iter().map(|i| i.id));
        }
        if let Some(npcs) = &visited.npcs {
            ids.extend(npcs.iter().flat_map(|n| n.inventory.iter().map(|i| i.id)));
        }
    }
    for limb in world.character().limbs() {
        ids.extend(limb.equipped.iter().map(|i| i.id));
    }
    for id in ids {
        let holders = world.holders_of(id);
        assert_eq!(holders.len(), 1, "Item {id:?} has holders {holders:?}");
    }
}
