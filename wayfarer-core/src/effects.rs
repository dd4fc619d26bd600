//! Structured event effects and their application to the store.

use crate::content::ContentService;
use crate::discovery::{link_entity_to_lead, LeadHint, LinkCandidate};
use crate::store::WorldStore;
use crate::world::{Item, LogKind, Npc, NpcId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The full effects bundle of one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventEffects {
    pub title: String,
    pub narration: String,
    pub combat_narration: Option<String>,
    pub visual_hint: Option<String>,
    pub character: CharacterEffects,
    pub items: ItemEffects,
    pub location: LocationEffects,
    pub npcs: Vec<NpcEffect>,
    pub world: WorldEffects,
    pub new_leads: Vec<LeadHint>,
    /// Chronicle summary to use when the event is folded.
    pub plot_point: Option<String>,
    pub requires_player_action_to_resolve: bool,
}

impl EventEffects {
    pub fn titled(title: impl Into<String>, narration: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            narration: narration.into(),
            ..Self::default()
        }
    }

    pub fn requiring_resolution(mut self) -> Self {
        self.requires_player_action_to_resolve = true;
        self
    }

    /// True when applying this bundle would change nothing.
    pub fn is_empty(&self) -> bool {
        self.character.is_empty()
            && self.items.is_empty()
            && self.location.is_empty()
            && self.npcs.is_empty()
            && self.world.is_empty()
            && self.new_leads.is_empty()
            && self.plot_point.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterEffects {
    /// Applied to every limb.
    pub health_delta: i32,
    pub energy_delta: i32,
    pub limbs: Vec<LimbEffect>,
}

impl CharacterEffects {
    pub fn is_empty(&self) -> bool {
        self.health_delta == 0 && self.energy_delta == 0 && self.limbs.is_empty()
    }
}

/// How a limb's health changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum HealthChange {
    Absolute(i32),
    Relative(i32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimbEffect {
    pub limb: String,
    #[serde(default)]
    pub health: Option<HealthChange>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemEffects {
    pub add_to_inventory: Vec<Item>,
    pub add_to_location: Vec<Item>,
    /// Item names.
    pub remove_from_inventory: Vec<String>,
    pub remove_from_location: Vec<String>,
}

impl ItemEffects {
    pub fn is_empty(&self) -> bool {
        self.add_to_inventory.is_empty()
            && self.add_to_location.is_empty()
            && self.remove_from_inventory.is_empty()
            && self.remove_from_location.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationEffects {
    pub append_description: Option<String>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub spawn_npc: Option<Npc>,
}

impl LocationEffects {
    pub fn is_empty(&self) -> bool {
        self.append_description.is_none()
            && self.add_tags.is_empty()
            && self.remove_tags.is_empty()
            && self.spawn_npc.is_none()
    }
}

/// Changes to one NPC, addressed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcEffect {
    pub npc: String,
    #[serde(default)]
    pub health_delta: Option<i32>,
    #[serde(default)]
    pub defeated: Option<bool>,
    #[serde(default)]
    pub disposition: Option<String>,
    /// A line the NPC says as part of the event.
    #[serde(default)]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub hidden: Option<bool>,
}

impl NpcEffect {
    pub fn new(npc: impl Into<String>) -> Self {
        Self {
            npc: npc.into(),
            health_delta: None,
            defeated: None,
            disposition: None,
            dialogue: None,
            hidden: None,
        }
    }
}

/// Flavor only; nothing in the store tracks time or weather.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldEffects {
    pub time_of_day: Option<String>,
    pub weather: Option<String>,
}

impl WorldEffects {
    pub fn is_empty(&self) -> bool {
        self.time_of_day.is_none() && self.weather.is_none()
    }
}

/// What applying a bundle actually changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedEffects {
    pub items_gained: Vec<String>,
    pub items_revealed: Vec<String>,
    pub items_lost: Vec<String>,
    pub spawned_npc: Option<NpcId>,
    pub npcs_defeated: Vec<NpcId>,
    pub leads_added: usize,
    pub player_defeated: bool,
}

/// Apply `effects` to the store.
///
/// New items and a spawned NPC are offered for lead linking first. All
/// store writes then happen under a single lock acquisition, so the bundle
/// lands as a unit.
pub async fn apply_event_effects(
    content: &dyn ContentService,
    store: &Mutex<WorldStore>,
    effects: &EventEffects,
) -> AppliedEffects {
    for item in effects
        .items
        .add_to_inventory
        .iter()
        .chain(effects.items.add_to_location.iter())
    {
        link_entity_to_lead(content, store, &LinkCandidate::item(item)).await;
    }
    if let Some(npc) = &effects.location.spawn_npc {
        link_entity_to_lead(content, store, &LinkCandidate::npc(npc)).await;
    }

    let mut store = store.lock().await;
    let mut applied = AppliedEffects::default();

    apply_character(&mut store, &effects.character);
    apply_items(&mut store, &effects.items, &mut applied);
    apply_location(&mut store, &effects.location, &mut applied);
    for npc in &effects.npcs {
        apply_npc(&mut store, npc, &mut applied);
    }

    if let Some(time) = &effects.world.time_of_day {
        store.push_log(LogKind::System, format!("Time shifts: {time}."));
    }
    if let Some(weather) = &effects.world.weather {
        store.push_log(LogKind::System, format!("The weather turns: {weather}."));
    }

    let key = store.current_key();
    for hint in &effects.new_leads {
        store
            .ledger_mut()
            .add_lead(hint.clone(), &effects.title, key.clone());
        applied.leads_added += 1;
    }

    applied.player_defeated = store.character().is_defeated();
    debug!(?applied, title = %effects.title, "event effects applied");
    applied
}

fn apply_character(store: &mut WorldStore, effects: &CharacterEffects) {
    if effects.health_delta != 0 {
        store.adjust_health(effects.health_delta);
    }
    if effects.energy_delta != 0 {
        store.adjust_energy(effects.energy_delta);
    }
    for limb in &effects.limbs {
        let result = match limb.health {
            Some(HealthChange::Absolute(value)) => store.set_limb_health(&limb.limb, value),
            Some(HealthChange::Relative(delta)) => store.adjust_limb_health(&limb.limb, delta),
            None => Ok(()),
        }
        .and_then(|()| match &limb.status {
            Some(status) => store.set_limb_status(&limb.limb, status),
            None => Ok(()),
        });
        if let Err(e) = result {
            warn!(limb = %limb.limb, error = %e, "skipping limb effect");
        }
    }
}

fn apply_items(store: &mut WorldStore, effects: &ItemEffects, applied: &mut AppliedEffects) {
    for item in &effects.add_to_inventory {
        applied.items_gained.push(item.name.clone());
        store.add_to_inventory(item.clone());
    }
    if !effects.add_to_location.is_empty() {
        let key = store.current_key();
        match store.reveal_location_items(&key, effects.add_to_location.clone()) {
            Ok(()) => applied
                .items_revealed
                .extend(effects.add_to_location.iter().map(|i| i.name.clone())),
            Err(e) => warn!(error = %e, "could not place event items"),
        }
    }
    for name in &effects.remove_from_inventory {
        match store.remove_from_inventory(name) {
            Some(item) => applied.items_lost.push(item.name),
            None => debug!(item = %name, "event removed an item the player lacks"),
        }
    }
    for name in &effects.remove_from_location {
        if store.remove_from_location(name).is_none() {
            debug!(item = %name, "event removed an item that is not here");
        }
    }
}

fn apply_location(store: &mut WorldStore, effects: &LocationEffects, applied: &mut AppliedEffects) {
    if let Some(text) = &effects.append_description {
        if let Err(e) = store.append_location_description(text) {
            warn!(error = %e, "could not extend location description");
        }
    }
    for tag in &effects.add_tags {
        if let Err(e) = store.add_tag(tag) {
            warn!(error = %e, tag = %tag, "could not add location tag");
        }
    }
    for tag in &effects.remove_tags {
        if let Err(e) = store.remove_tag(tag) {
            warn!(error = %e, tag = %tag, "could not remove location tag");
        }
    }
    if let Some(npc) = &effects.spawn_npc {
        applied.spawned_npc = Some(store.spawn_event_npc(npc.clone()));
    }
}

fn apply_npc(store: &mut WorldStore, effect: &NpcEffect, applied: &mut AppliedEffects) {
    let Some(npc) = store.find_npc_by_name(&effect.npc) else {
        warn!(npc = %effect.npc, "event addressed an NPC that is not here");
        return;
    };
    let (id, name) = (npc.id, npc.name.clone());

    if let Some(hidden) = effect.hidden {
        if let Err(e) = store.set_npc_hidden(id, hidden) {
            warn!(error = %e, npc = %name, "could not change NPC visibility");
        }
    }
    if let Some(disposition) = &effect.disposition {
        if let Err(e) = store.set_npc_disposition(id, disposition) {
            warn!(error = %e, npc = %name, "could not change NPC disposition");
        }
    }
    if let Some(line) = &effect.dialogue {
        store.push_log(LogKind::Narration, format!("{name}: \"{line}\""));
    }
    let mut defeated = false;
    if let Some(delta) = effect.health_delta {
        match store.adjust_npc_health(id, delta) {
            Ok(flag) => defeated = flag,
            Err(e) => warn!(error = %e, npc = %name, "could not adjust NPC health"),
        }
    }
    if let Some(flag) = effect.defeated {
        match store.set_npc_defeated(id, flag) {
            Ok(()) => defeated = flag,
            Err(e) => warn!(error = %e, npc = %name, "could not mark NPC defeated"),
        }
    }
    if defeated {
        applied.npcs_defeated.push(id);
    }
}
