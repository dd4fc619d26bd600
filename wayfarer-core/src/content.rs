//! The seam to the generative content service.
//!
//! [`ContentService`] is implemented by whatever produces prose, entities,
//! events and images. The engine only ever talks to it through the request
//! and response shapes below; no game rules live on this side of the seam.

use crate::commands::Action;
use crate::director::DirectorDirective;
use crate::discovery::{LeadHint, LeadSummary, LinkCandidate};
use crate::effects::EventEffects;
use crate::world::{
    ActiveEvent, Character, Conversation, Coordinates, Item, LeadId, LocationData, LogEntry,
    MajorPlotPoint, Npc,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors reported by the content service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContentError {
    #[error("content service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed content: {0}")]
    Malformed(String),

    #[error("content request refused: {0}")]
    Refused(String),
}

/// Opaque handle to a generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle(pub String);

impl ImageHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything the service needs to know about the current situation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub character: Character,
    pub coordinates: Coordinates,
    pub location: Option<LocationData>,
    /// `None` while the location has not been searched.
    pub visible_items: Option<Vec<Item>>,
    pub visible_npcs: Vec<Npc>,
    pub inventory: Vec<Item>,
    pub conversation: Option<Conversation>,
    pub active_event: Option<ActiveEvent>,
    pub recent_log: Vec<LogEntry>,
    pub unresolved_leads: Vec<LeadSummary>,
    /// Current director focus, if any.
    pub focus: Option<String>,
    /// Director guidance for intent parsing.
    pub bias: Option<String>,
}

// ============================================================================
// Intent parsing
// ============================================================================

/// Structured reading of one line of player input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub is_plausible: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub action: Action,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    /// Narration for a plausible nuance the engine has no handler for.
    #[serde(default)]
    pub narration: Option<String>,
}

impl ParsedIntent {
    pub fn new(action: Action) -> Self {
        Self {
            is_plausible: true,
            reason: None,
            action,
            targets: Vec::new(),
            parameters: HashMap::new(),
            narration: None,
        }
    }

    pub fn implausible(reason: impl Into<String>) -> Self {
        Self {
            is_plausible: false,
            reason: Some(reason.into()),
            ..Self::new(Action::Unrecognized)
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_narration(mut self, narration: impl Into<String>) -> Self {
        self.narration = Some(narration.into());
        self
    }

    pub fn target(&self) -> Option<&str> {
        self.targets.first().map(String::as_str)
    }
}

// ============================================================================
// Narrative outcomes
// ============================================================================

/// What a narrative request is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeKind {
    Dialogue,
    Pickup,
    ItemUse,
    Crafting,
    Examination,
    MovementNarration,
    Gift,
    Request,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeRequest {
    pub kind: NarrativeKind,
    /// Structured description of the subject (NPC, item, location...).
    pub subject: serde_json::Value,
    pub player_input: Option<String>,
    /// Recent conversation lines and open leads.
    pub memory: Vec<String>,
    pub bias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeOutcome {
    pub narration: String,
    #[serde(default)]
    pub raw_text: String,
    /// The narration with lore tags.
    #[serde(default)]
    pub lore_text: Option<String>,
    #[serde(default)]
    pub new_leads: Vec<LeadHint>,
    /// Whether the attempt worked (an NPC agreed, a craft held together).
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

impl NarrativeOutcome {
    pub fn narration(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            raw_text: text.clone(),
            narration: text,
            lore_text: None,
            new_leads: Vec::new(),
            success: true,
        }
    }

    pub fn with_lead(mut self, lead: LeadHint) -> Self {
        self.new_leads.push(lead);
        self
    }

    pub fn with_lore(mut self, lore_text: impl Into<String>) -> Self {
        self.lore_text = Some(lore_text.into());
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}

// ============================================================================
// Entity generation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    Location,
    Item,
    Npc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRequest {
    pub kind: EntityKind,
    pub context: serde_json::Value,
    pub bias: Option<String>,
}

/// A generated entity of the requested kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum GeneratedEntity {
    Character(Character),
    Location(LocationData),
    Item(Item),
    Npc(Npc),
}

impl GeneratedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            GeneratedEntity::Character(_) => EntityKind::Character,
            GeneratedEntity::Location(_) => EntityKind::Location,
            GeneratedEntity::Item(_) => EntityKind::Item,
            GeneratedEntity::Npc(_) => EntityKind::Npc,
        }
    }

    fn mismatch(&self, wanted: EntityKind) -> ContentError {
        ContentError::Malformed(format!(
            "expected {wanted:?}, service produced {:?}",
            self.kind()
        ))
    }

    pub fn into_character(self) -> Result<Character, ContentError> {
        match self {
            GeneratedEntity::Character(c) => Ok(c),
            other => Err(other.mismatch(EntityKind::Character)),
        }
    }

    pub fn into_location(self) -> Result<LocationData, ContentError> {
        match self {
            GeneratedEntity::Location(l) => Ok(l),
            other => Err(other.mismatch(EntityKind::Location)),
        }
    }

    pub fn into_item(self) -> Result<Item, ContentError> {
        match self {
            GeneratedEntity::Item(i) => Ok(i),
            other => Err(other.mismatch(EntityKind::Item)),
        }
    }

    pub fn into_npc(self) -> Result<Npc, ContentError> {
        match self {
            GeneratedEntity::Npc(n) => Ok(n),
            other => Err(other.mismatch(EntityKind::Npc)),
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// How hard an event should hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    #[default]
    Medium,
    High,
    Extreme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDecision {
    pub should_trigger: bool,
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub intensity: Option<Intensity>,
}

impl TriggerDecision {
    pub fn decline() -> Self {
        Self {
            should_trigger: false,
            concept: None,
            intensity: None,
        }
    }

    pub fn trigger(concept: impl Into<String>, intensity: Intensity) -> Self {
        Self {
            should_trigger: true,
            concept: Some(concept.into()),
            intensity: Some(intensity),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRequest {
    pub concept: String,
    pub intensity: Intensity,
    pub snapshot: ContextSnapshot,
    pub bias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispositionUpdate {
    pub npc: String,
    pub disposition: String,
}

/// The service's verdict on the player's latest move inside an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCheck {
    pub resolved: bool,
    #[serde(default)]
    pub progressed: bool,
    pub resolution_narration: String,
    #[serde(default)]
    pub next_stage_narration: Option<String>,
    #[serde(default)]
    pub next_visual_hint: Option<String>,
    #[serde(default)]
    pub items_awarded: Vec<Item>,
    #[serde(default)]
    pub disposition_update: Option<DispositionUpdate>,
}

impl ResolutionCheck {
    pub fn unresolved(narration: impl Into<String>) -> Self {
        Self {
            resolved: false,
            progressed: false,
            resolution_narration: narration.into(),
            next_stage_narration: None,
            next_visual_hint: None,
            items_awarded: Vec::new(),
            disposition_update: None,
        }
    }

    pub fn resolved(narration: impl Into<String>) -> Self {
        Self {
            resolved: true,
            ..Self::unresolved(narration)
        }
    }

    pub fn progressed(narration: impl Into<String>, next_stage: impl Into<String>) -> Self {
        Self {
            progressed: true,
            next_stage_narration: Some(next_stage.into()),
            ..Self::unresolved(narration)
        }
    }

    pub fn with_award(mut self, item: Item) -> Self {
        self.items_awarded.push(item);
        self
    }
}

// ============================================================================
// Director
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorRequest {
    pub history: Vec<LogEntry>,
    pub chronicle: Vec<MajorPlotPoint>,
    pub snapshot: ContextSnapshot,
    pub previous: Option<DirectorDirective>,
    pub command_count: u64,
}

// ============================================================================
// The service
// ============================================================================

/// The generative collaborator.
///
/// Every method is a suspension point of the engine. None of them may
/// mutate game state; they only describe what should happen.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Turn raw player text into a structured intent.
    async fn parse_intent(
        &self,
        raw: &str,
        snapshot: &ContextSnapshot,
    ) -> Result<ParsedIntent, ContentError>;

    /// Narrate the outcome of an ordinary action.
    async fn generate_narrative(
        &self,
        request: NarrativeRequest,
    ) -> Result<NarrativeOutcome, ContentError>;

    /// Produce a character, location, item or NPC.
    async fn generate_entity(&self, request: EntityRequest)
        -> Result<GeneratedEntity, ContentError>;

    /// Decide whether a trigger escalates into an event.
    async fn decide_event_trigger(
        &self,
        trigger: &str,
        snapshot: &ContextSnapshot,
    ) -> Result<TriggerDecision, ContentError>;

    /// Produce the effects bundle of an event.
    async fn generate_event_effects(
        &self,
        request: EventRequest,
    ) -> Result<EventEffects, ContentError>;

    /// Judge the player's latest input against the active event.
    async fn check_event_resolution(
        &self,
        event: &ActiveEvent,
        input: &str,
        snapshot: &ContextSnapshot,
    ) -> Result<ResolutionCheck, ContentError>;

    /// Pick at most one of `leads` that `candidate` fulfils.
    async fn link_entity_to_lead(
        &self,
        candidate: &LinkCandidate,
        leads: &[LeadSummary],
    ) -> Result<Option<LeadId>, ContentError>;

    /// Review the story so far and suggest a new directive.
    async fn analyze_for_directive(
        &self,
        request: DirectorRequest,
    ) -> Result<Option<DirectorDirective>, ContentError>;

    /// Illustrate a scene. Returning `None` is always acceptable.
    async fn generate_image(
        &self,
        visual_hint: &str,
        style: &str,
    ) -> Result<Option<ImageHandle>, ContentError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Rarity;

    #[test]
    fn test_parsed_intent_from_json() {
        let json = r#"{
            "is_plausible": true,
            "action": "move",
            "targets": ["north"]
        }"#;
        let intent: ParsedIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.action, Action::Move);
        assert_eq!(intent.target(), Some("north"));
        assert!(intent.parameters.is_empty());
    }

    #[test]
    fn test_unknown_action_is_unrecognized() {
        let json = r#"{"is_plausible": true, "action": "juggle"}"#;
        let intent: ParsedIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.action, Action::Unrecognized);
    }

    #[test]
    fn test_generated_entity_kind_mismatch() {
        let entity = GeneratedEntity::Item(Item::new("lamp", Rarity::Common));
        assert!(entity.clone().into_item().is_ok());
        assert!(matches!(
            entity.into_npc(),
            Err(ContentError::Malformed(_))
        ));
    }

    #[test]
    fn test_narrative_outcome_defaults_to_success() {
        let json = r#"{"narration": "You take it."}"#;
        let outcome: NarrativeOutcome = serde_json::from_str(json).unwrap();
        assert!(outcome.success);
        assert!(outcome.new_leads.is_empty());
    }
}
