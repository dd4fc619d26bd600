//! The authoritative world state.
//!
//! [`WorldStore`] owns every entity. Other components read from it, do
//! their async work elsewhere, and then write back through the mutation
//! primitives here. Every primitive validates before it mutates, so a
//! failing call leaves the store exactly as it was.

use crate::content::{ContextSnapshot, ImageHandle};
use crate::director::{DirectorDirective, Subsystem};
use crate::discovery::{DiscoveryLedger, PotentialDiscovery};
use crate::world::{
    position_by_name, ActiveEvent, Character, Conversation, Coordinates, EntityRef,
    EventId, Item, ItemId, LocationData, LocationKey, LogEntry, LogKind, MajorPlotPoint, Npc,
    NpcId, PlotPointId, Speaker, VisitedLocation, LIMB_MAX_HEALTH,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from store primitives.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not enough energy (need {needed}, have {available})")]
    InsufficientEnergy { needed: i32, available: i32 },

    #[error("unknown location {0}")]
    UnknownLocation(LocationKey),

    #[error("an event is already active")]
    EventAlreadyActive,

    #[error("no event is active")]
    NoActiveEvent,

    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

/// Somewhere an item can be held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemHolder {
    Inventory,
    Crafting,
    Location(LocationKey),
    Npc(NpcId),
    Limb(String),
}

/// When the director last ran.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectorCheckpoint {
    pub at: DateTime<Utc>,
    pub command_count: u64,
}

/// All mutable game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldStore {
    character: Character,
    coordinates: Coordinates,
    visited: BTreeMap<LocationKey, VisitedLocation>,
    inventory: Vec<Item>,
    crafting: Vec<Item>,
    /// NPCs brought in by the active event. They stand at the current
    /// location and leave when the event is cleared.
    event_npcs: Vec<Npc>,
    conversation: Option<Conversation>,
    active_event: Option<ActiveEvent>,
    last_event_at: Option<DateTime<Utc>>,
    ledger: DiscoveryLedger,
    chronicle: Vec<MajorPlotPoint>,
    directive: Option<DirectorDirective>,
    director_checkpoint: Option<DirectorCheckpoint>,
    log: Vec<LogEntry>,
    command_count: u64,
}

impl WorldStore {
    /// A fresh world with the character standing at the origin.
    pub fn new(mut character: Character, start: LocationData) -> Self {
        character.normalize();
        let coordinates = Coordinates::origin();
        let mut visited = BTreeMap::new();
        visited.insert(coordinates.key(), VisitedLocation::new(start));
        Self {
            character,
            coordinates,
            visited,
            inventory: Vec::new(),
            crafting: Vec::new(),
            event_npcs: Vec::new(),
            conversation: None,
            active_event: None,
            last_event_at: None,
            ledger: DiscoveryLedger::new(),
            chronicle: Vec::new(),
            directive: None,
            director_checkpoint: None,
            log: Vec::new(),
            command_count: 0,
        }
    }

    /// Restore derived fields after deserialization.
    pub(crate) fn normalize(&mut self) {
        self.character.normalize();
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn current_key(&self) -> LocationKey {
        self.coordinates.key()
    }

    pub fn visited(&self, key: &LocationKey) -> Option<&VisitedLocation> {
        self.visited.get(key)
    }

    pub fn visited_locations(&self) -> &BTreeMap<LocationKey, VisitedLocation> {
        &self.visited
    }

    pub fn current(&self) -> Option<&VisitedLocation> {
        self.visited.get(&self.current_key())
    }

    pub fn current_location(&self) -> Option<&LocationData> {
        self.current().map(|v| &v.location)
    }

    pub fn current_location_name(&self) -> String {
        self.current_location()
            .map(|l| l.name.clone())
            .unwrap_or_else(|| self.current_key().to_string())
    }

    pub fn current_has_tag(&self, tag: &str) -> bool {
        self.current_location()
            .is_some_and(|l| l.environment_tags.contains(tag))
    }

    /// Items lying at the current location, `None` if it was never searched.
    pub fn location_items(&self) -> Option<&[Item]> {
        self.current()?.items.as_deref()
    }

    pub fn inventory(&self) -> &[Item] {
        &self.inventory
    }

    pub fn crafting(&self) -> &[Item] {
        &self.crafting
    }

    pub fn event_npcs(&self) -> &[Npc] {
        &self.event_npcs
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn active_event(&self) -> Option<&ActiveEvent> {
        self.active_event.as_ref()
    }

    pub fn has_active_event(&self) -> bool {
        self.active_event.is_some()
    }

    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.last_event_at
    }

    pub fn ledger(&self) -> &DiscoveryLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DiscoveryLedger {
        &mut self.ledger
    }

    pub fn chronicle(&self) -> &[MajorPlotPoint] {
        &self.chronicle
    }

    pub fn directive(&self) -> Option<&DirectorDirective> {
        self.directive.as_ref()
    }

    /// The directive's guidance for one subsystem.
    pub fn bias(&self, subsystem: Subsystem) -> Option<String> {
        self.directive
            .as_ref()
            .and_then(|d| d.enhancement(subsystem))
            .map(str::to_string)
    }

    pub fn director_checkpoint(&self) -> Option<DirectorCheckpoint> {
        self.director_checkpoint
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// The last `n` log entries, oldest first.
    pub fn recent_log(&self, n: usize) -> &[LogEntry] {
        let start = self.log.len().saturating_sub(n);
        &self.log[start..]
    }

    pub fn command_count(&self) -> u64 {
        self.command_count
    }

    /// NPCs the player can currently see and address.
    ///
    /// While an event is active only event-spawned NPCs and NPCs an effect
    /// has explicitly un-hidden are visible.
    pub fn visible_npcs(&self) -> Vec<&Npc> {
        let event_active = self.has_active_event();
        self.current()
            .and_then(|v| v.npcs.as_ref())
            .into_iter()
            .flatten()
            .chain(self.event_npcs.iter())
            .filter(|n| n.is_visible(event_active))
            .collect()
    }

    pub fn find_visible_npc(&self, name: &str) -> Option<&Npc> {
        self.visible_npcs().into_iter().find(|n| n.matches_name(name))
    }

    /// Any NPC at the current location, visible or not.
    pub fn npc(&self, id: NpcId) -> Option<&Npc> {
        self.event_npcs
            .iter()
            .find(|n| n.id == id)
            .or_else(|| self.current()?.npc(id))
    }

    pub fn find_npc_by_name(&self, name: &str) -> Option<&Npc> {
        self.event_npcs
            .iter()
            .chain(self.current().and_then(|v| v.npcs.as_ref()).into_iter().flatten())
            .find(|n| n.matches_name(name))
    }

    /// The inventory item with this name.
    pub fn inventory_item(&self, name: &str) -> Option<&Item> {
        self.inventory.iter().find(|i| i.matches_name(name))
    }

    /// Every place currently holding `item`. A consistent store returns at
    /// most one holder.
    pub fn holders_of(&self, item: ItemId) -> Vec<ItemHolder> {
        let mut holders = Vec::new();
        if self.inventory.iter().any(|i| i.id == item) {
            holders.push(ItemHolder::Inventory);
        }
        if self.crafting.iter().any(|i| i.id == item) {
            holders.push(ItemHolder::Crafting);
        }
        for limb in self.character.limbs() {
            if limb.equipped.iter().any(|i| i.id == item) {
                holders.push(ItemHolder::Limb(limb.name.clone()));
            }
        }
        for (key, visited) in &self.visited {
            if visited.items.iter().flatten().any(|i| i.id == item) {
                holders.push(ItemHolder::Location(key.clone()));
            }
            for npc in visited.npcs.iter().flatten() {
                if npc.inventory.iter().any(|i| i.id == item) {
                    holders.push(ItemHolder::Npc(npc.id));
                }
            }
        }
        for npc in &self.event_npcs {
            if npc.inventory.iter().any(|i| i.id == item) {
                holders.push(ItemHolder::Npc(npc.id));
            }
        }
        holders
    }

    /// Snapshot handed to the content service.
    pub fn context_snapshot(&self, recent: usize) -> ContextSnapshot {
        ContextSnapshot {
            character: self.character.clone(),
            coordinates: self.coordinates,
            location: self.current_location().cloned(),
            visible_items: self.location_items().map(<[Item]>::to_vec),
            visible_npcs: self.visible_npcs().into_iter().cloned().collect(),
            inventory: self.inventory.clone(),
            conversation: self.conversation.clone(),
            active_event: self.active_event.clone(),
            recent_log: self.recent_log(recent).to_vec(),
            unresolved_leads: self
                .ledger
                .unresolved(None)
                .into_iter()
                .map(PotentialDiscovery::summary)
                .collect(),
            focus: self.directive.as_ref().map(|d| d.focus.clone()),
            bias: self.bias(Subsystem::IntentParsing),
        }
    }

    // ========================================================================
    // Character
    // ========================================================================

    /// Spend energy. Fails without change when the character has too little.
    pub fn spend_energy(&mut self, amount: i32) -> Result<(), StoreError> {
        let amount = amount.max(0);
        let available = self.character.energy();
        if available < amount {
            return Err(StoreError::InsufficientEnergy {
                needed: amount,
                available,
            });
        }
        self.character.set_energy(available - amount);
        Ok(())
    }

    /// Add or remove energy, clamped to `0..=max`.
    pub fn adjust_energy(&mut self, delta: i32) {
        let energy = self.character.energy().saturating_add(delta);
        self.character.set_energy(energy);
    }

    /// Apply `delta` to every limb.
    pub fn adjust_health(&mut self, delta: i32) {
        for limb in self.character.limbs_mut() {
            limb.health = limb.health.saturating_add(delta).clamp(0, LIMB_MAX_HEALTH);
        }
        self.character.recompute_health();
    }

    pub fn set_limb_health(&mut self, limb: &str, health: i32) -> Result<(), StoreError> {
        let limb = self
            .character
            .limb_mut(limb)
            .ok_or_else(|| StoreError::NotFound(format!("limb {limb}")))?;
        limb.health = health.clamp(0, LIMB_MAX_HEALTH);
        self.character.recompute_health();
        Ok(())
    }

    pub fn adjust_limb_health(&mut self, limb: &str, delta: i32) -> Result<(), StoreError> {
        let current = self
            .character
            .limb(limb)
            .map(|l| l.health)
            .ok_or_else(|| StoreError::NotFound(format!("limb {limb}")))?;
        self.set_limb_health(limb, current.saturating_add(delta))
    }

    pub fn set_limb_status(&mut self, limb: &str, status: &str) -> Result<(), StoreError> {
        let limb = self
            .character
            .limb_mut(limb)
            .ok_or_else(|| StoreError::NotFound(format!("limb {limb}")))?;
        limb.status = status.to_string();
        Ok(())
    }

    /// Add experience to a skill, creating it at level 1 if needed.
    /// Returns the number of levels gained.
    pub fn add_skill_experience(&mut self, skill: &str, amount: u32) -> u32 {
        self.character
            .skills
            .entry(skill.to_lowercase())
            .or_default()
            .add_experience(amount)
    }

    // ========================================================================
    // Locations and movement
    // ========================================================================

    /// Cache a generated location. An already cached location is kept.
    pub fn record_location(&mut self, coordinates: Coordinates, location: LocationData) -> bool {
        let key = coordinates.key();
        if self.visited.contains_key(&key) {
            return false;
        }
        self.visited.insert(key, VisitedLocation::new(location));
        true
    }

    /// Move to a cached location.
    pub fn move_to(&mut self, coordinates: Coordinates) -> Result<(), StoreError> {
        let key = coordinates.key();
        if !self.visited.contains_key(&key) {
            return Err(StoreError::UnknownLocation(key));
        }
        self.coordinates = coordinates;
        Ok(())
    }

    /// Reveal items at a location. An unsearched location becomes searched
    /// with exactly `items`; a searched one gains them.
    pub fn reveal_location_items(
        &mut self,
        key: &LocationKey,
        items: Vec<Item>,
    ) -> Result<(), StoreError> {
        let visited = self.visited_mut(key)?;
        visited.items.get_or_insert_with(Vec::new).extend(items);
        Ok(())
    }

    /// Same as [`reveal_location_items`](Self::reveal_location_items) for NPCs.
    pub fn reveal_location_npcs(
        &mut self,
        key: &LocationKey,
        npcs: Vec<Npc>,
    ) -> Result<(), StoreError> {
        let visited = self.visited_mut(key)?;
        visited.npcs.get_or_insert_with(Vec::new).extend(npcs);
        Ok(())
    }

    pub fn append_location_description(&mut self, text: &str) -> Result<(), StoreError> {
        let key = self.current_key();
        let location = &mut self.visited_mut(&key)?.location;
        if location.description.is_empty() {
            location.description = text.to_string();
        } else {
            location.description.push(' ');
            location.description.push_str(text);
        }
        if let Some(lore) = location.lore_description.as_mut() {
            lore.push(' ');
            lore.push_str(text);
        }
        Ok(())
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<bool, StoreError> {
        let key = self.current_key();
        Ok(self
            .visited_mut(&key)?
            .location
            .environment_tags
            .insert(tag.to_string()))
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<bool, StoreError> {
        let key = self.current_key();
        Ok(self.visited_mut(&key)?.location.environment_tags.remove(tag))
    }

    fn visited_mut(&mut self, key: &LocationKey) -> Result<&mut VisitedLocation, StoreError> {
        self.visited
            .get_mut(key)
            .ok_or_else(|| StoreError::UnknownLocation(key.clone()))
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Move an item from the current location into the inventory.
    pub fn pick_up(&mut self, name: &str) -> Result<Item, StoreError> {
        let key = self.current_key();
        let items = self
            .visited_mut(&key)?
            .items
            .as_mut()
            .ok_or_else(|| StoreError::NotFound(format!("item {name}")))?;
        let idx = position_by_name(items, name)
            .ok_or_else(|| StoreError::NotFound(format!("item {name}")))?;
        let item = items.remove(idx);
        self.inventory.push(item.clone());
        Ok(item)
    }

    /// Move an inventory item to the current location.
    pub fn drop_item(&mut self, name: &str) -> Result<Item, StoreError> {
        let key = self.current_key();
        if !self.visited.contains_key(&key) {
            return Err(StoreError::UnknownLocation(key));
        }
        let item = self.take_inventory(name)?;
        self.reveal_location_items(&key, vec![item.clone()])?;
        Ok(item)
    }

    pub fn give_to_npc(&mut self, name: &str, npc: NpcId) -> Result<Item, StoreError> {
        if self.npc(npc).is_none() {
            return Err(StoreError::NotFound(format!("npc {npc}")));
        }
        let item = self.take_inventory(name)?;
        if let Some(target) = self.npc_mut(npc) {
            target.inventory.push(item.clone());
        }
        Ok(item)
    }

    pub fn take_from_npc(&mut self, npc: NpcId, name: &str) -> Result<Item, StoreError> {
        let holder = self
            .npc_mut(npc)
            .ok_or_else(|| StoreError::NotFound(format!("npc {npc}")))?;
        let idx = position_by_name(&holder.inventory, name)
            .ok_or_else(|| StoreError::NotFound(format!("item {name}")))?;
        let item = holder.inventory.remove(idx);
        self.inventory.push(item.clone());
        Ok(item)
    }

    pub fn equip(&mut self, name: &str, limb: &str) -> Result<Item, StoreError> {
        if self.character.limb(limb).is_none() {
            return Err(StoreError::NotFound(format!("limb {limb}")));
        }
        let item = self.take_inventory(name)?;
        if let Some(limb) = self.character.limb_mut(limb) {
            limb.equipped.push(item.clone());
        }
        Ok(item)
    }

    /// Move an equipped item back into the inventory, from whichever limb
    /// holds it.
    pub fn unequip(&mut self, name: &str) -> Result<Item, StoreError> {
        let item = self
            .character
            .limbs_mut()
            .iter_mut()
            .find_map(|limb| {
                let idx = position_by_name(&limb.equipped, name)?;
                Some(limb.equipped.remove(idx))
            })
            .ok_or_else(|| StoreError::NotFound(format!("equipped item {name}")))?;
        self.inventory.push(item.clone());
        Ok(item)
    }

    pub fn stage_crafting(&mut self, name: &str) -> Result<Item, StoreError> {
        let item = self.take_inventory(name)?;
        self.crafting.push(item.clone());
        Ok(item)
    }

    pub fn unstage_crafting(&mut self, name: &str) -> Result<Item, StoreError> {
        let idx = position_by_name(&self.crafting, name)
            .ok_or_else(|| StoreError::NotFound(format!("staged item {name}")))?;
        let item = self.crafting.remove(idx);
        self.inventory.push(item.clone());
        Ok(item)
    }

    /// Remove and return every staged item.
    pub fn consume_crafting(&mut self) -> Vec<Item> {
        std::mem::take(&mut self.crafting)
    }

    pub fn add_to_inventory(&mut self, item: Item) {
        self.inventory.push(item);
    }

    pub fn remove_from_inventory(&mut self, name: &str) -> Option<Item> {
        self.take_inventory(name).ok()
    }

    pub fn remove_from_location(&mut self, name: &str) -> Option<Item> {
        let key = self.current_key();
        let items = self.visited.get_mut(&key)?.items.as_mut()?;
        let idx = position_by_name(items, name)?;
        Some(items.remove(idx))
    }

    fn take_inventory(&mut self, name: &str) -> Result<Item, StoreError> {
        let idx = position_by_name(&self.inventory, name)
            .ok_or_else(|| StoreError::NotFound(format!("inventory item {name}")))?;
        Ok(self.inventory.remove(idx))
    }

    // ========================================================================
    // NPCs
    // ========================================================================

    fn npc_mut(&mut self, id: NpcId) -> Option<&mut Npc> {
        if let Some(idx) = self.event_npcs.iter().position(|n| n.id == id) {
            return self.event_npcs.get_mut(idx);
        }
        let key = self.current_key();
        self.visited.get_mut(&key)?.npc_mut(id)
    }

    fn require_npc(&mut self, id: NpcId) -> Result<&mut Npc, StoreError> {
        self.npc_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("npc {id}")))
    }

    /// Returns whether the NPC is defeated afterwards.
    pub fn adjust_npc_health(&mut self, id: NpcId, delta: i32) -> Result<bool, StoreError> {
        let npc = self.require_npc(id)?;
        npc.health = npc.health.saturating_add(delta).clamp(0, npc.max_health);
        if npc.health == 0 {
            npc.defeated = true;
        }
        let defeated = npc.defeated;
        self.end_conversation_if_absent();
        Ok(defeated)
    }

    pub fn set_npc_defeated(&mut self, id: NpcId, defeated: bool) -> Result<(), StoreError> {
        self.require_npc(id)?.defeated = defeated;
        self.end_conversation_if_absent();
        Ok(())
    }

    pub fn set_npc_disposition(&mut self, id: NpcId, disposition: &str) -> Result<(), StoreError> {
        self.require_npc(id)?.disposition = disposition.to_string();
        Ok(())
    }

    pub fn set_npc_hidden(&mut self, id: NpcId, hidden: bool) -> Result<(), StoreError> {
        self.require_npc(id)?.hidden_during_event = Some(hidden);
        self.end_conversation_if_absent();
        Ok(())
    }

    pub fn spawn_event_npc(&mut self, mut npc: Npc) -> NpcId {
        npc.event_spawned = true;
        let id = npc.id;
        self.event_npcs.push(npc);
        id
    }

    // ========================================================================
    // Conversation
    // ========================================================================

    pub fn start_conversation(&mut self, npc: NpcId) -> Result<(), StoreError> {
        let (npc_id, npc_name, defeated) = self
            .visible_npcs()
            .into_iter()
            .find(|n| n.id == npc)
            .map(|n| (n.id, n.name.clone(), n.defeated))
            .ok_or_else(|| StoreError::InvalidTarget(format!("npc {npc} is not here")))?;
        if defeated {
            return Err(StoreError::InvalidTarget(format!("{npc_name} is defeated")));
        }
        if self.conversation.as_ref().is_some_and(|c| c.npc_id == npc_id) {
            return Ok(());
        }
        self.conversation = Some(Conversation {
            npc_id,
            npc_name,
            lines: Vec::new(),
        });
        Ok(())
    }

    pub fn end_conversation(&mut self) -> Option<Conversation> {
        self.conversation.take()
    }

    pub fn add_conversation_line(
        &mut self,
        speaker: Speaker,
        text: impl Into<String>,
    ) -> Result<(), StoreError> {
        let conversation = self
            .conversation
            .as_mut()
            .ok_or_else(|| StoreError::InvalidTarget("no conversation".to_string()))?;
        conversation.lines.push((speaker, text.into()));
        Ok(())
    }

    /// End the conversation if its NPC is gone, defeated or hidden.
    pub fn end_conversation_if_absent(&mut self) -> Option<Conversation> {
        let npc_id = self.conversation.as_ref()?.npc_id;
        let present = self
            .visible_npcs()
            .into_iter()
            .any(|n| n.id == npc_id && !n.defeated);
        if present {
            None
        } else {
            self.conversation.take()
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn begin_event(&mut self, event: ActiveEvent) -> Result<EventId, StoreError> {
        if self.active_event.is_some() {
            return Err(StoreError::EventAlreadyActive);
        }
        let id = event.id;
        self.active_event = Some(event);
        self.end_conversation_if_absent();
        Ok(id)
    }

    /// Replace the active event's narration and visual hint.
    pub fn progress_event(
        &mut self,
        narration: &str,
        visual_hint: Option<String>,
    ) -> Result<(), StoreError> {
        let event = self.active_event.as_mut().ok_or(StoreError::NoActiveEvent)?;
        event.narration = narration.to_string();
        if visual_hint.is_some() {
            event.visual_hint = visual_hint;
        }
        Ok(())
    }

    /// Attach an image to the event it was generated for. An image that
    /// arrives after its event ended is dropped.
    pub fn set_event_image(&mut self, id: EventId, image: ImageHandle) -> Result<(), StoreError> {
        match self.active_event.as_mut() {
            Some(event) if event.id == id => {
                event.image = Some(image);
                Ok(())
            }
            _ => Err(StoreError::NoActiveEvent),
        }
    }

    /// End the active event: its NPCs leave, hidden flags reset and a
    /// conversation with an NPC no longer present ends.
    pub fn clear_event(&mut self) -> Result<ActiveEvent, StoreError> {
        let event = self.active_event.take().ok_or(StoreError::NoActiveEvent)?;
        self.event_npcs.clear();
        for visited in self.visited.values_mut() {
            for npc in visited.npcs.iter_mut().flatten() {
                npc.hidden_during_event = None;
            }
        }
        self.end_conversation_if_absent();
        Ok(event)
    }

    pub fn mark_event_time(&mut self) {
        self.last_event_at = Some(Utc::now());
    }

    // ========================================================================
    // Chronicle, director, log
    // ========================================================================

    pub fn append_plot_point(
        &mut self,
        summary: impl Into<String>,
        involved: Vec<EntityRef>,
    ) -> PlotPointId {
        let point = MajorPlotPoint {
            id: PlotPointId::new(),
            summary: summary.into(),
            involved,
            location_name: self.current_location_name(),
            timestamp: Utc::now(),
        };
        let id = point.id;
        self.chronicle.push(point);
        id
    }

    pub fn set_directive(&mut self, directive: DirectorDirective) {
        self.directive = Some(directive);
    }

    pub fn set_director_checkpoint(&mut self, at: DateTime<Utc>, command_count: u64) {
        self.director_checkpoint = Some(DirectorCheckpoint { at, command_count });
    }

    pub fn increment_command_count(&mut self) -> u64 {
        self.command_count += 1;
        self.command_count
    }

    pub fn push_log(&mut self, kind: LogKind, text: impl Into<String>) {
        self.log.push(LogEntry::new(kind, text));
    }

    pub fn push_log_entry(&mut self, entry: LogEntry) {
        self.log.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Direction, Limb, Rarity};

    fn store() -> WorldStore {
        let start = LocationData::new("Crossroads")
            .with_exits([Direction::North, Direction::South]);
        WorldStore::new(Character::new("Wren", "cartographer"), start)
    }

    fn store_with_npc() -> (WorldStore, NpcId) {
        let mut store = store();
        let npc = Npc::new("Old Tam", Rarity::Common);
        let id = npc.id;
        let key = store.current_key();
        store.reveal_location_npcs(&key, vec![npc]).unwrap();
        (store, id)
    }

    #[test]
    fn test_new_store_starts_at_origin() {
        let store = store();
        assert_eq!(store.coordinates(), Coordinates::origin());
        assert_eq!(store.current_location_name(), "Crossroads");
        assert!(store.location_items().is_none());
        assert_eq!(store.command_count(), 0);
    }

    #[test]
    fn test_spend_energy_fails_without_change() {
        let mut store = store();
        store.spend_energy(30).unwrap();
        assert_eq!(store.character().energy(), 70);
        let err = store.spend_energy(80).unwrap_err();
        assert_eq!(
            err,
            StoreError::InsufficientEnergy {
                needed: 80,
                available: 70
            }
        );
        assert_eq!(store.character().energy(), 70);
    }

    #[test]
    fn test_adjust_energy_clamps() {
        let mut store = store();
        store.adjust_energy(50);
        assert_eq!(store.character().energy(), 100);
        store.adjust_energy(-500);
        assert_eq!(store.character().energy(), 0);
    }

    #[test]
    fn test_limb_health_recomputes_overall() {
        let mut store = store();
        store.set_limb_health("head", 40).unwrap();
        // (40 + 5 * 100) / 6 = 90
        assert_eq!(store.character().overall_health(), 90);
        store.adjust_limb_health("torso", -250).unwrap();
        assert_eq!(store.character().limb("torso").unwrap().health, 0);
        assert_eq!(store.character().overall_health(), 73);
        assert!(store.set_limb_health("tail", 10).is_err());
    }

    #[test]
    fn test_uniform_damage_defeats() {
        let mut store = store();
        store.adjust_health(-100);
        assert_eq!(store.character().overall_health(), 0);
        assert!(store.character().is_defeated());
        store.adjust_health(10);
        assert!(!store.character().is_defeated());
    }

    #[test]
    fn test_extreme_health_deltas_saturate() {
        let mut store = store();
        store.adjust_health(i32::MAX);
        assert_eq!(store.character().overall_health(), 100);
        assert!(!store.character().is_defeated());
        store.adjust_health(i32::MIN);
        assert!(store.character().is_defeated());

        store.adjust_limb_health("head", i32::MAX).unwrap();
        assert_eq!(store.character().limb("head").unwrap().health, LIMB_MAX_HEALTH);
        store.adjust_limb_health("head", i32::MIN).unwrap();
        assert_eq!(store.character().limb("head").unwrap().health, 0);

        let (mut store, npc) = store_with_npc();
        assert!(!store.adjust_npc_health(npc, i32::MAX).unwrap());
        let tam = store.npc(npc).unwrap();
        assert_eq!(tam.health, tam.max_health);
        assert!(store.adjust_npc_health(npc, i32::MIN).unwrap());
        assert_eq!(store.npc(npc).unwrap().health, 0);
    }

    #[test]
    fn test_move_requires_cached_location() {
        let mut store = store();
        let north = Coordinates::new(0, 1);
        assert!(matches!(
            store.move_to(north),
            Err(StoreError::UnknownLocation(_))
        ));
        assert!(store.record_location(north, LocationData::new("Ridge")));
        assert!(!store.record_location(north, LocationData::new("Other")));
        store.move_to(north).unwrap();
        assert_eq!(store.current_location_name(), "Ridge");
    }

    #[test]
    fn test_reveal_resolves_unsearched_list() {
        let mut store = store();
        let key = store.current_key();
        store.reveal_location_items(&key, Vec::new()).unwrap();
        assert_eq!(store.location_items(), Some(&[][..]));
        store
            .reveal_location_items(&key, vec![Item::new("lamp", Rarity::Common)])
            .unwrap();
        assert_eq!(store.location_items().unwrap().len(), 1);
    }

    #[test]
    fn test_item_moves_keep_single_owner() {
        let (mut store, npc) = store_with_npc();
        let lamp = Item::new("lamp", Rarity::Common);
        let id = lamp.id;
        let key = store.current_key();
        store.reveal_location_items(&key, vec![lamp]).unwrap();
        assert_eq!(store.holders_of(id), vec![ItemHolder::Location(key.clone())]);

        store.pick_up("Lamp").unwrap();
        assert_eq!(store.holders_of(id), vec![ItemHolder::Inventory]);

        store.equip("lamp", "left arm").unwrap();
        assert_eq!(
            store.holders_of(id),
            vec![ItemHolder::Limb("left arm".to_string())]
        );

        store.unequip("lamp").unwrap();
        store.stage_crafting("lamp").unwrap();
        assert_eq!(store.holders_of(id), vec![ItemHolder::Crafting]);

        store.unstage_crafting("lamp").unwrap();
        store.give_to_npc("lamp", npc).unwrap();
        assert_eq!(store.holders_of(id), vec![ItemHolder::Npc(npc)]);

        store.take_from_npc(npc, "lamp").unwrap();
        store.drop_item("lamp").unwrap();
        assert_eq!(store.holders_of(id), vec![ItemHolder::Location(key)]);
    }

    #[test]
    fn test_failed_give_leaves_inventory() {
        let mut store = store();
        store.add_to_inventory(Item::new("lamp", Rarity::Common));
        assert!(store.give_to_npc("lamp", NpcId::new()).is_err());
        assert_eq!(store.inventory().len(), 1);
    }

    #[test]
    fn test_pick_up_from_unsearched_location_fails() {
        let mut store = store();
        assert!(matches!(store.pick_up("lamp"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_consume_crafting_empties_slots() {
        let mut store = store();
        store.add_to_inventory(Item::new("twine", Rarity::Common));
        store.add_to_inventory(Item::new("stick", Rarity::Common));
        store.stage_crafting("twine").unwrap();
        store.stage_crafting("stick").unwrap();
        let consumed = store.consume_crafting();
        assert_eq!(consumed.len(), 2);
        assert!(store.crafting().is_empty());
        assert!(store.inventory().is_empty());
    }

    #[test]
    fn test_event_visibility_and_clear() {
        let (mut store, resident) = store_with_npc();
        store.start_conversation(resident).unwrap();

        let effects = crate::effects::EventEffects::titled("Ambush", "Figures close in.");
        store
            .begin_event(ActiveEvent::new(
                crate::world::EventOrigin::Unexpected {
                    trigger: "pickup".to_string(),
                },
                effects,
            ))
            .unwrap();
        // The resident is hidden, so the conversation ended.
        assert!(store.conversation().is_none());
        assert!(store.visible_npcs().is_empty());

        let bandit = store.spawn_event_npc(Npc::new("Bandit", Rarity::Rare));
        store.set_npc_hidden(resident, false).unwrap();
        let names: Vec<_> = store.visible_npcs().iter().map(|n| n.name.clone()).collect();
        assert_eq!(names, vec!["Old Tam", "Bandit"]);

        store.start_conversation(bandit).unwrap();
        store.clear_event().unwrap();
        assert!(store.conversation().is_none());
        assert!(store.event_npcs().is_empty());
        assert_eq!(store.npc(resident).unwrap().hidden_during_event, None);
        assert_eq!(store.visible_npcs().len(), 1);
        assert_eq!(store.clear_event().unwrap_err(), StoreError::NoActiveEvent);
    }

    #[test]
    fn test_npc_defeat_ends_conversation() {
        let (mut store, npc) = store_with_npc();
        store.start_conversation(npc).unwrap();
        store.add_conversation_line(Speaker::Player, "hello").unwrap();
        assert!(store.adjust_npc_health(npc, -500).unwrap());
        assert!(store.conversation().is_none());
        assert!(store.start_conversation(npc).is_err());
    }

    #[test]
    fn test_stale_event_image_is_rejected() {
        let mut store = store();
        let effects = crate::effects::EventEffects::titled("Storm", "Rain.");
        store
            .begin_event(ActiveEvent::new(
                crate::world::EventOrigin::Unexpected {
                    trigger: "move".to_string(),
                },
                effects,
            ))
            .unwrap();
        assert!(store
            .set_event_image(EventId::new(), ImageHandle::new("img"))
            .is_err());
        let id = store.active_event().unwrap().id;
        store.set_event_image(id, ImageHandle::new("img")).unwrap();
        assert!(store.active_event().unwrap().image.is_some());
    }

    #[test]
    fn test_tags_have_set_semantics() {
        let mut store = store();
        assert!(store.add_tag("flooded").unwrap());
        assert!(!store.add_tag("flooded").unwrap());
        assert!(store.current_has_tag("flooded"));
        assert!(store.remove_tag("flooded").unwrap());
        assert!(!store.remove_tag("flooded").unwrap());
    }

    #[test]
    fn test_recent_log_window() {
        let mut store = store();
        for i in 0..5 {
            store.push_log(LogKind::System, format!("entry {i}"));
        }
        let recent = store.recent_log(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "entry 3");
        assert_eq!(store.recent_log(50).len(), 5);
    }

    #[test]
    fn test_skill_experience_creates_skill() {
        let mut store = store();
        assert_eq!(store.add_skill_experience("Crafting", 120), 1);
        assert_eq!(store.character().skills["crafting"].level, 2);
    }

    #[test]
    fn test_store_serializes() {
        let mut store = store();
        store.character = store
            .character
            .clone()
            .with_limbs(vec![Limb::new("head").with_health(30)]);
        let json = serde_json::to_string(&store).unwrap();
        let restored: WorldStore = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.character().overall_health(), 30);
        assert_eq!(restored.current_location_name(), "Crossroads");
    }
}
