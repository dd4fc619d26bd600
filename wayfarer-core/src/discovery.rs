//! Discovery ledger: narrative leads and their resolution.
//!
//! Generated prose mentions things that do not exist yet ("a key to the old
//! door", "the hermit on the ridge"). Each such hint becomes a lead. When the
//! generator later produces a concrete item, NPC or location, the content
//! service is asked whether it fulfils one of the open leads.

use crate::content::ContentService;
use crate::store::WorldStore;
use crate::world::{EntityRef, Item, LeadId, LocationData, LocationKey, LogKind, Npc, Rarity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// What kind of entity a lead points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadTarget {
    Item,
    Npc,
    Location,
    LoreHint,
}

/// A lead as extracted from generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadHint {
    pub target: LeadTarget,
    pub name: String,
    #[serde(default)]
    pub description_hint: String,
    #[serde(default)]
    pub rarity_hint: Option<Rarity>,
    #[serde(default)]
    pub source_snippet: String,
}

impl LeadHint {
    pub fn new(target: LeadTarget, name: impl Into<String>) -> Self {
        Self {
            target,
            name: name.into(),
            description_hint: String::new(),
            rarity_hint: None,
            source_snippet: String::new(),
        }
    }

    pub fn with_description(mut self, hint: impl Into<String>) -> Self {
        self.description_hint = hint.into();
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity_hint = Some(rarity);
        self
    }
}

/// Lead status. The fulfilling entity only exists on the discovered side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LeadStatus {
    Mentioned,
    Discovered {
        fulfilled_by: EntityRef,
        discovered_at: DateTime<Utc>,
    },
}

/// A tracked lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialDiscovery {
    pub id: LeadId,
    pub target: LeadTarget,
    pub name: String,
    pub description_hint: String,
    pub rarity_hint: Option<Rarity>,
    pub status: LeadStatus,
    pub source_snippet: String,
    /// Name of whatever first mentioned this lead (an NPC, an event title).
    pub origin: String,
    pub first_mentioned_at: DateTime<Utc>,
    pub first_mentioned_location: LocationKey,
}

impl PotentialDiscovery {
    pub fn is_discovered(&self) -> bool {
        matches!(self.status, LeadStatus::Discovered { .. })
    }

    pub fn fulfilled_by(&self) -> Option<&EntityRef> {
        match &self.status {
            LeadStatus::Mentioned => None,
            LeadStatus::Discovered { fulfilled_by, .. } => Some(fulfilled_by),
        }
    }

    pub fn summary(&self) -> LeadSummary {
        LeadSummary {
            id: self.id,
            target: self.target,
            name: self.name.clone(),
            description_hint: self.description_hint.clone(),
            rarity_hint: self.rarity_hint,
        }
    }
}

/// The part of a lead the content service sees when matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSummary {
    pub id: LeadId,
    pub target: LeadTarget,
    pub name: String,
    pub description_hint: String,
    pub rarity_hint: Option<Rarity>,
}

/// Result of [`DiscoveryLedger::mark_found`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Discovered,
    AlreadyDiscovered,
    UnknownLead,
}

/// All leads, in first-mention order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryLedger {
    leads: Vec<PotentialDiscovery>,
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| !matches!(w.as_str(), "a" | "an" | "the"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl DiscoveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mentioned lead.
    ///
    /// A hint that names the same thing (case, spacing and leading
    /// articles ignored) and target type as an open lead returns that
    /// lead's id instead of creating a duplicate.
    pub fn add_lead(&mut self, hint: LeadHint, origin: &str, location: LocationKey) -> LeadId {
        let key = normalize(&hint.name);
        if let Some(existing) = self
            .leads
            .iter()
            .find(|l| !l.is_discovered() && l.target == hint.target && normalize(&l.name) == key)
        {
            debug!(lead = %existing.id, name = %hint.name, "lead already mentioned");
            return existing.id;
        }

        let lead = PotentialDiscovery {
            id: LeadId::new(),
            target: hint.target,
            name: hint.name,
            description_hint: hint.description_hint,
            rarity_hint: hint.rarity_hint,
            status: LeadStatus::Mentioned,
            source_snippet: hint.source_snippet,
            origin: origin.to_string(),
            first_mentioned_at: Utc::now(),
            first_mentioned_location: location,
        };
        let id = lead.id;
        self.leads.push(lead);
        id
    }

    /// Mark a lead as fulfilled by `entity`. Discovered leads never change
    /// again.
    pub fn mark_found(&mut self, id: LeadId, entity: EntityRef) -> MarkOutcome {
        let Some(lead) = self.leads.iter_mut().find(|l| l.id == id) else {
            return MarkOutcome::UnknownLead;
        };
        if lead.is_discovered() {
            return MarkOutcome::AlreadyDiscovered;
        }
        lead.status = LeadStatus::Discovered {
            fulfilled_by: entity,
            discovered_at: Utc::now(),
        };
        MarkOutcome::Discovered
    }

    pub fn get(&self, id: LeadId) -> Option<&PotentialDiscovery> {
        self.leads.iter().find(|l| l.id == id)
    }

    pub fn leads(&self) -> &[PotentialDiscovery] {
        &self.leads
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// Open leads, optionally restricted to one target type.
    pub fn unresolved(&self, target: Option<LeadTarget>) -> Vec<&PotentialDiscovery> {
        self.leads
            .iter()
            .filter(|l| !l.is_discovered())
            .filter(|l| target.map_or(true, |t| l.target == t))
            .collect()
    }

    /// The lead a given entity fulfilled, if any.
    pub fn fulfilled_by_entity(&self, entity: &EntityRef) -> Option<&PotentialDiscovery> {
        self.leads
            .iter()
            .find(|l| l.fulfilled_by() == Some(entity))
    }
}

// ============================================================================
// Linking generated entities to leads
// ============================================================================

/// A freshly generated entity offered for lead matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub entity: EntityRef,
    pub target: LeadTarget,
    pub name: String,
    pub description: String,
}

impl LinkCandidate {
    pub fn item(item: &Item) -> Self {
        Self {
            entity: EntityRef::Item(item.id),
            target: LeadTarget::Item,
            name: item.name.clone(),
            description: item.description.clone(),
        }
    }

    pub fn npc(npc: &Npc) -> Self {
        Self {
            entity: EntityRef::Npc(npc.id),
            target: LeadTarget::Npc,
            name: npc.name.clone(),
            description: npc.description.clone(),
        }
    }

    pub fn location(key: LocationKey, location: &LocationData) -> Self {
        Self {
            entity: EntityRef::Location(key),
            target: LeadTarget::Location,
            name: location.name.clone(),
            description: location.description.clone(),
        }
    }
}

/// Ask the content service whether `candidate` fulfils an open lead of its
/// type and, if so, mark that lead discovered.
///
/// Linking never fails the caller: a service error is logged and treated
/// as "no match". An id that was not among the offered leads is ignored.
pub async fn link_entity_to_lead(
    content: &dyn ContentService,
    store: &Mutex<WorldStore>,
    candidate: &LinkCandidate,
) -> Option<LeadId> {
    let offered: Vec<LeadSummary> = {
        let store = store.lock().await;
        if store.ledger().fulfilled_by_entity(&candidate.entity).is_some() {
            return None;
        }
        store
            .ledger()
            .unresolved(Some(candidate.target))
            .into_iter()
            .map(PotentialDiscovery::summary)
            .collect()
    };
    if offered.is_empty() {
        return None;
    }

    let matched = match content.link_entity_to_lead(candidate, &offered).await {
        Ok(matched) => matched?,
        Err(e) => {
            warn!(error = %e, name = %candidate.name, "lead linking failed");
            return None;
        }
    };
    if !offered.iter().any(|l| l.id == matched) {
        warn!(lead = %matched, "content service matched a lead that was not offered");
        return None;
    }

    let mut store = store.lock().await;
    match store.ledger_mut().mark_found(matched, candidate.entity.clone()) {
        MarkOutcome::Discovered => {
            let lead_name = store
                .ledger()
                .get(matched)
                .map(|l| l.name.clone())
                .unwrap_or_default();
            store.push_log(
                LogKind::System,
                format!("Discovery: {} turns out to be {}.", lead_name, candidate.name),
            );
            Some(matched)
        }
        MarkOutcome::AlreadyDiscovered | MarkOutcome::UnknownLead => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Coordinates, ItemId};

    fn key() -> LocationKey {
        Coordinates::origin().key()
    }

    #[test]
    fn test_add_lead_is_idempotent_for_open_leads() {
        let mut ledger = DiscoveryLedger::new();
        let a = ledger.add_lead(LeadHint::new(LeadTarget::Item, "The Rusted Key"), "Old Tam", key());
        let b = ledger.add_lead(LeadHint::new(LeadTarget::Item, "rusted  key"), "a rumour", key());
        assert_eq!(a, b);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(a).unwrap().origin, "Old Tam");
    }

    #[test]
    fn test_same_name_different_target_is_distinct() {
        let mut ledger = DiscoveryLedger::new();
        let a = ledger.add_lead(LeadHint::new(LeadTarget::Item, "Hollow"), "x", key());
        let b = ledger.add_lead(LeadHint::new(LeadTarget::Location, "Hollow"), "x", key());
        assert_ne!(a, b);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_mark_found_is_monotonic() {
        let mut ledger = DiscoveryLedger::new();
        let id = ledger.add_lead(LeadHint::new(LeadTarget::Item, "key"), "x", key());
        let lead = ledger.get(id).unwrap();
        assert!(!lead.is_discovered());
        assert!(lead.fulfilled_by().is_none());

        let first = EntityRef::Item(ItemId::new());
        assert_eq!(ledger.mark_found(id, first.clone()), MarkOutcome::Discovered);
        let second = EntityRef::Item(ItemId::new());
        assert_eq!(
            ledger.mark_found(id, second),
            MarkOutcome::AlreadyDiscovered
        );

        let lead = ledger.get(id).unwrap();
        assert!(lead.is_discovered());
        assert_eq!(lead.fulfilled_by(), Some(&first));
    }

    #[test]
    fn test_rediscovered_name_opens_new_lead() {
        let mut ledger = DiscoveryLedger::new();
        let id = ledger.add_lead(LeadHint::new(LeadTarget::Npc, "hermit"), "x", key());
        ledger.mark_found(id, EntityRef::Npc(crate::world::NpcId::new()));
        let again = ledger.add_lead(LeadHint::new(LeadTarget::Npc, "Hermit"), "y", key());
        assert_ne!(id, again);
        assert_eq!(ledger.unresolved(None).len(), 1);
    }

    #[test]
    fn test_unknown_lead() {
        let mut ledger = DiscoveryLedger::new();
        assert_eq!(
            ledger.mark_found(LeadId::new(), EntityRef::Item(ItemId::new())),
            MarkOutcome::UnknownLead
        );
    }

    #[test]
    fn test_unresolved_filters_by_target() {
        let mut ledger = DiscoveryLedger::new();
        ledger.add_lead(LeadHint::new(LeadTarget::Item, "lamp"), "x", key());
        ledger.add_lead(LeadHint::new(LeadTarget::Npc, "ferryman"), "x", key());
        assert_eq!(ledger.unresolved(Some(LeadTarget::Item)).len(), 1);
        assert_eq!(ledger.unresolved(Some(LeadTarget::Npc)).len(), 1);
        assert_eq!(ledger.unresolved(None).len(), 2);
    }
}
