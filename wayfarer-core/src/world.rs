//! Core data types for the generated world.
//!
//! Everything in here is plain data. The invariants that tie fields
//! together (overall health, the defeated flag, item ownership) are kept by
//! [`WorldStore`](crate::store::WorldStore), which is the only place these
//! values are mutated once a game is running.

use crate::content::ImageHandle;
use crate::effects::EventEffects;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for the player character.
    CharacterId
);
entity_id!(
    /// Unique identifier for items.
    ItemId
);
entity_id!(
    /// Unique identifier for NPCs.
    NpcId
);
entity_id!(
    /// Unique identifier for events.
    EventId
);
entity_id!(
    /// Unique identifier for plot points.
    PlotPointId
);
entity_id!(
    /// Unique identifier for discovery leads.
    LeadId
);

/// A reference to any concrete entity the world can hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Character(CharacterId),
    Item(ItemId),
    Npc(NpcId),
    Location(LocationKey),
}

// ============================================================================
// Coordinates and directions
// ============================================================================

/// A cell on the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

impl Coordinates {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    /// Canonical map key for these coordinates.
    pub fn key(&self) -> LocationKey {
        LocationKey(format!("{},{}", self.x, self.y))
    }

    /// The neighbouring cell in `direction`.
    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// The direction leading to `other`, if it is an orthogonal neighbour.
    pub fn direction_to(&self, other: Coordinates) -> Option<Direction> {
        Direction::all()
            .into_iter()
            .find(|d| self.step(*d) == other)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl FromStr for Coordinates {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (x, y) = trimmed
            .split_once(',')
            .ok_or_else(|| format!("not a coordinate pair: {s}"))?;
        let x = x.trim().parse().map_err(|_| format!("bad x in {s}"))?;
        let y = y.trim().parse().map_err(|_| format!("bad y in {s}"))?;
        Ok(Self::new(x, y))
    }
}

/// Key of the visited-location table, always `"x,y"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.0.parse().ok()
    }
}

impl From<Coordinates> for LocationKey {
    fn from(coords: Coordinates) -> Self {
        coords.key()
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compass directions on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
        ]
    }

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    /// Parse a direction word or its single-letter alias.
    pub fn parse(token: &str) -> Option<Direction> {
        match token.trim().to_lowercase().as_str() {
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Rarity
// ============================================================================

/// Rarity tier shared by characters, items, NPCs and locations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    /// Epic and Legendary subjects are the only ordinary interactions that
    /// may escalate into an event.
    pub fn is_high(&self) -> bool {
        *self >= Rarity::Epic
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Items
// ============================================================================

/// A generated item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub description: String,
    /// The description annotated with lore tags, when the generator
    /// produced one.
    #[serde(default)]
    pub lore_description: Option<String>,
    #[serde(default)]
    pub visual_hint: Option<String>,
    #[serde(default)]
    pub type_guess: Option<String>,
}

impl Item {
    pub fn new(name: impl Into<String>, rarity: Rarity) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            rarity,
            description: String::new(),
            lore_description: None,
            visual_hint: None,
            type_guess: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_type_guess(mut self, type_guess: impl Into<String>) -> Self {
        self.type_guess = Some(type_guess.into());
        self
    }

    /// Case-insensitive name match.
    pub fn matches_name(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query.trim())
    }
}

/// Find an item by name in a list.
pub(crate) fn position_by_name(items: &[Item], name: &str) -> Option<usize> {
    items.iter().position(|i| i.matches_name(name))
}

// ============================================================================
// Character
// ============================================================================

/// A trained skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub level: u32,
    pub experience: u32,
    pub experience_to_next: u32,
}

impl Skill {
    pub fn new(level: u32) -> Self {
        let level = level.max(1);
        Self {
            level,
            experience: 0,
            experience_to_next: Self::threshold(level),
        }
    }

    fn threshold(level: u32) -> u32 {
        100 * level
    }

    /// Add experience, levelling up as often as the total allows.
    /// Returns the number of levels gained.
    pub fn add_experience(&mut self, amount: u32) -> u32 {
        self.experience += amount;
        let mut gained = 0;
        while self.experience >= self.experience_to_next {
            self.experience -= self.experience_to_next;
            self.level += 1;
            self.experience_to_next = Self::threshold(self.level);
            gained += 1;
        }
        gained
    }
}

impl Default for Skill {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Maximum health of a single limb.
pub const LIMB_MAX_HEALTH: i32 = 100;

/// A body part with its own health and equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limb {
    pub name: String,
    pub health: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub equipped: Vec<Item>,
}

impl Limb {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            health: LIMB_MAX_HEALTH,
            status: "healthy".to_string(),
            equipped: Vec::new(),
        }
    }

    pub fn with_health(mut self, health: i32) -> Self {
        self.health = health.clamp(0, LIMB_MAX_HEALTH);
        self
    }
}

/// The standard humanoid limb set.
pub fn default_limbs() -> Vec<Limb> {
    ["head", "torso", "left arm", "right arm", "left leg", "right leg"]
        .into_iter()
        .map(Limb::new)
        .collect()
}

/// The player character.
///
/// Overall health, energy and the defeated flag are private: they only
/// change through the store, which recomputes them together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default)]
    pub id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub concept: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub skills: BTreeMap<String, Skill>,
    #[serde(default)]
    limbs: Vec<Limb>,
    #[serde(default)]
    overall_health: i32,
    #[serde(default)]
    energy: i32,
    #[serde(default)]
    max_energy: i32,
    #[serde(default)]
    defeated: bool,
}

impl Character {
    pub fn new(name: impl Into<String>, concept: impl Into<String>) -> Self {
        let mut character = Self {
            id: CharacterId::new(),
            name: name.into(),
            concept: concept.into(),
            rarity: Rarity::Common,
            skills: BTreeMap::new(),
            limbs: default_limbs(),
            overall_health: LIMB_MAX_HEALTH,
            energy: 100,
            max_energy: 100,
            defeated: false,
        };
        character.recompute_health();
        character
    }

    pub fn with_limbs(mut self, limbs: Vec<Limb>) -> Self {
        self.limbs = limbs;
        self.normalize();
        self
    }

    pub fn with_energy(mut self, energy: i32, max_energy: i32) -> Self {
        self.max_energy = max_energy.max(0);
        self.energy = energy.clamp(0, self.max_energy);
        self
    }

    pub fn with_skill(mut self, name: impl Into<String>, skill: Skill) -> Self {
        self.skills.insert(name.into(), skill);
        self
    }

    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    pub fn limb(&self, name: &str) -> Option<&Limb> {
        self.limbs.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// Rounded mean of limb healths.
    pub fn overall_health(&self) -> i32 {
        self.overall_health
    }

    pub fn energy(&self) -> i32 {
        self.energy
    }

    pub fn max_energy(&self) -> i32 {
        self.max_energy
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Repair a freshly generated or deserialized character so that its
    /// derived fields agree with its limbs.
    pub(crate) fn normalize(&mut self) {
        if self.limbs.is_empty() {
            self.limbs = default_limbs();
        }
        for limb in &mut self.limbs {
            limb.health = limb.health.clamp(0, LIMB_MAX_HEALTH);
        }
        if self.max_energy <= 0 {
            self.max_energy = 100;
            self.energy = 100;
        }
        self.energy = self.energy.clamp(0, self.max_energy);
        self.recompute_health();
    }

    pub(crate) fn limbs_mut(&mut self) -> &mut Vec<Limb> {
        &mut self.limbs
    }

    pub(crate) fn limb_mut(&mut self, name: &str) -> Option<&mut Limb> {
        self.limbs
            .iter_mut()
            .find(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn set_energy(&mut self, energy: i32) {
        self.energy = energy.clamp(0, self.max_energy);
    }

    /// Recompute overall health and the defeated flag from the limbs.
    pub(crate) fn recompute_health(&mut self) {
        self.overall_health = if self.limbs.is_empty() {
            0
        } else {
            let total: i32 = self.limbs.iter().map(|l| l.health).sum();
            (total as f64 / self.limbs.len() as f64).round() as i32
        };
        self.defeated = self.overall_health <= 0;
    }
}

// ============================================================================
// NPCs
// ============================================================================

/// A generated non-player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    #[serde(default)]
    pub id: NpcId,
    pub name: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default = "default_disposition")]
    pub disposition: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_npc_health")]
    pub health: i32,
    #[serde(default = "default_npc_health")]
    pub max_health: i32,
    #[serde(default)]
    pub defeated: bool,
    #[serde(default)]
    pub inventory: Vec<Item>,
    /// Spawned by an event; removed when the event ends.
    #[serde(default)]
    pub event_spawned: bool,
    /// Explicit visibility for the current event. `None` means no effect
    /// has addressed this NPC, which hides it while an event is active.
    #[serde(default)]
    pub hidden_during_event: Option<bool>,
}

fn default_disposition() -> String {
    "neutral".to_string()
}

fn default_npc_health() -> i32 {
    100
}

impl Npc {
    pub fn new(name: impl Into<String>, rarity: Rarity) -> Self {
        Self {
            id: NpcId::new(),
            name: name.into(),
            rarity,
            disposition: default_disposition(),
            description: String::new(),
            health: default_npc_health(),
            max_health: default_npc_health(),
            defeated: false,
            inventory: Vec::new(),
            event_spawned: false,
            hidden_during_event: None,
        }
    }

    pub fn with_health(mut self, health: i32, max_health: i32) -> Self {
        self.max_health = max_health.max(1);
        self.health = health.clamp(0, self.max_health);
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.inventory.push(item);
        self
    }

    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = disposition.into();
        self
    }

    pub fn matches_name(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query.trim())
    }

    /// Visibility while `event_active`; see the store for how this is used.
    pub fn is_visible(&self, event_active: bool) -> bool {
        !event_active || self.event_spawned || self.hidden_during_event == Some(false)
    }
}

// ============================================================================
// Locations
// ============================================================================

/// A generated location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lore_description: Option<String>,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub exits: BTreeSet<Direction>,
    #[serde(default)]
    pub environment_tags: BTreeSet<String>,
    #[serde(default)]
    pub visual_hint: Option<String>,
}

impl LocationData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            lore_description: None,
            rarity: Rarity::Common,
            exits: BTreeSet::new(),
            environment_tags: BTreeSet::new(),
            visual_hint: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_exits(mut self, exits: impl IntoIterator<Item = Direction>) -> Self {
        self.exits.extend(exits);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.environment_tags.insert(tag.into());
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn has_exit(&self, direction: Direction) -> bool {
        self.exits.contains(&direction)
    }
}

/// A cached location. `None` item or NPC lists mean "not yet searched",
/// which is different from searched and empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitedLocation {
    pub location: LocationData,
    pub items: Option<Vec<Item>>,
    pub npcs: Option<Vec<Npc>>,
    pub first_visited: DateTime<Utc>,
}

impl VisitedLocation {
    pub fn new(location: LocationData) -> Self {
        Self {
            location,
            items: None,
            npcs: None,
            first_visited: Utc::now(),
        }
    }

    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_npcs(mut self, npcs: Vec<Npc>) -> Self {
        self.npcs = Some(npcs);
        self
    }

    pub fn npc(&self, id: NpcId) -> Option<&Npc> {
        self.npcs.as_ref()?.iter().find(|n| n.id == id)
    }

    pub(crate) fn npc_mut(&mut self, id: NpcId) -> Option<&mut Npc> {
        self.npcs.as_mut()?.iter_mut().find(|n| n.id == id)
    }
}

// ============================================================================
// Conversation, events and chronicle
// ============================================================================

/// Who said a line in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Player,
    Npc,
}

/// The conversation in progress, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub npc_id: NpcId,
    pub npc_name: String,
    pub lines: Vec<(Speaker, String)>,
}

/// What started the active event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventOrigin {
    /// Escalated from an ordinary trigger.
    Unexpected { trigger: String },
    /// The player deliberately escalated, e.g. by attacking.
    PlayerInitiated { target: Option<NpcId> },
}

/// The event currently disturbing the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEvent {
    pub id: EventId,
    pub origin: EventOrigin,
    pub title: String,
    pub narration: String,
    pub visual_hint: Option<String>,
    pub image: Option<ImageHandle>,
    pub effects: EventEffects,
    pub requires_resolution: bool,
    pub started_at: DateTime<Utc>,
}

impl ActiveEvent {
    pub fn new(origin: EventOrigin, effects: EventEffects) -> Self {
        Self {
            id: EventId::new(),
            origin,
            title: effects.title.clone(),
            narration: effects.narration.clone(),
            visual_hint: effects.visual_hint.clone(),
            image: None,
            requires_resolution: effects.requires_player_action_to_resolve,
            effects,
            started_at: Utc::now(),
        }
    }
}

/// An append-only chronicle entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MajorPlotPoint {
    pub id: PlotPointId,
    pub summary: String,
    pub involved: Vec<EntityRef>,
    pub location_name: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Game log
// ============================================================================

/// Class of a game log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Command,
    Narration,
    Error,
    System,
    GameEvent,
    Combat,
}

/// A player-visible log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub text: String,
    /// The same text annotated with lore tags.
    pub lore_text: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            lore_text: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_lore(mut self, lore_text: Option<String>) -> Self {
        self.lore_text = lore_text;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_key_round_trip() {
        let coords = Coordinates::new(-3, 7);
        let key = coords.key();
        assert_eq!(key.as_str(), "-3,7");
        assert_eq!(key.coordinates(), Some(coords));
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(Direction::parse("North"), Some(Direction::North));
        assert_eq!(Direction::parse(" w "), Some(Direction::West));
        assert_eq!(Direction::parse("up"), None);
    }

    #[test]
    fn test_step_and_direction_to() {
        let origin = Coordinates::origin();
        assert_eq!(origin.step(Direction::North), Coordinates::new(0, 1));
        assert_eq!(
            origin.direction_to(Coordinates::new(-1, 0)),
            Some(Direction::West)
        );
        assert_eq!(origin.direction_to(Coordinates::new(2, 0)), None);
    }

    #[test]
    fn test_rarity_ordering() {
        assert!(Rarity::Common < Rarity::Uncommon);
        assert!(Rarity::Rare < Rarity::Epic);
        assert!(Rarity::Epic.is_high());
        assert!(Rarity::Legendary.is_high());
        assert!(!Rarity::Rare.is_high());
    }

    #[test]
    fn test_overall_health_is_rounded_mean() {
        let character = Character::new("Wren", "cartographer").with_limbs(vec![
            Limb::new("head").with_health(100),
            Limb::new("torso").with_health(50),
            Limb::new("arm").with_health(25),
        ]);
        // 175 / 3 = 58.33
        assert_eq!(character.overall_health(), 58);
        assert!(!character.is_defeated());
    }

    #[test]
    fn test_zero_health_limbs_mean_defeated() {
        let character = Character::new("Wren", "cartographer").with_limbs(vec![
            Limb::new("head").with_health(0),
            Limb::new("torso").with_health(0),
        ]);
        assert_eq!(character.overall_health(), 0);
        assert!(character.is_defeated());
    }

    #[test]
    fn test_skill_levels_up() {
        let mut skill = Skill::new(1);
        assert_eq!(skill.add_experience(250), 1);
        assert_eq!(skill.level, 2);
        assert_eq!(skill.experience, 150);
        assert_eq!(skill.experience_to_next, 200);
    }

    #[test]
    fn test_generated_character_is_normalized() {
        let json = r#"{"name": "Ash", "concept": "wanderer"}"#;
        let mut character: Character = serde_json::from_str(json).unwrap();
        character.normalize();
        assert_eq!(character.limbs().len(), 6);
        assert_eq!(character.overall_health(), 100);
        assert_eq!(character.energy(), 100);
        assert!(!character.is_defeated());
    }

    #[test]
    fn test_npc_visibility_during_event() {
        let mut npc = Npc::new("Old Tam", Rarity::Common);
        assert!(npc.is_visible(false));
        assert!(!npc.is_visible(true));
        npc.hidden_during_event = Some(false);
        assert!(npc.is_visible(true));
        npc.hidden_during_event = Some(true);
        assert!(!npc.is_visible(true));
        let mut spawned = Npc::new("Shade", Rarity::Epic);
        spawned.event_spawned = true;
        assert!(spawned.is_visible(true));
    }
}
