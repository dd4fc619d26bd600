use super::{target, Action, CommandProcessor, Handled, HandlerError};
use crate::content::{EntityKind, EntityRequest, NarrativeKind, NarrativeRequest, ParsedIntent};
use crate::director::Subsystem;
use crate::discovery::{link_entity_to_lead, LinkCandidate};
use crate::events::TriggerContext;
use crate::world::{LogKind, Rarity};
use futures::future::try_join_all;
use rand::Rng;
use serde_json::{json, Value};

impl CommandProcessor<'_> {
    /// Look closely at an item, an NPC, or the surroundings.
    pub(super) async fn examine(
        &self,
        intent: &ParsedIntent,
        raw: &str,
    ) -> Result<Handled, HandlerError> {
        let name = target(intent, 0, "target");
        let (subject, origin, rarity, bias) = {
            let store = self.ctx.store.lock().await;
            let location = store
                .current_location()
                .cloned()
                .ok_or_else(|| HandlerError::precondition("There is nothing here to examine."))?;
            let item = name.as_deref().and_then(|n| {
                store
                    .inventory_item(n)
                    .or_else(|| store.location_items()?.iter().find(|i| i.matches_name(n)))
                    .cloned()
            });
            let npc = name
                .as_deref()
                .and_then(|n| store.find_visible_npc(n))
                .cloned();
            let (subject, origin, rarity) = match (item, npc) {
                (Some(item), _) => (json!({ "item": item }), item.name.clone(), item.rarity),
                (None, Some(npc)) => (json!({ "npc": npc }), npc.name.clone(), npc.rarity),
                (None, None) => (
                    json!({ "location": location, "focus": name }),
                    location.name.clone(),
                    location.rarity,
                ),
            };
            (subject, origin, rarity, store.bias(Subsystem::Narrative))
        };
        self.spend(Action::Examine).await?;

        let outcome = self
            .ctx
            .content
            .generate_narrative(NarrativeRequest {
                kind: NarrativeKind::Examination,
                subject,
                player_input: Some(raw.to_string()),
                memory: Vec::new(),
                bias,
            })
            .await?;
        self.record_narrative(&outcome, &origin).await;

        let key = self.ctx.store.lock().await.current_key();
        Ok(Handled::trigger(TriggerContext::action(
            Action::Examine,
            Some(rarity),
            key,
        )))
    }

    /// Context shared by every entity in one discovery batch.
    async fn discovery_request(&self, kind: EntityKind) -> (usize, Value, Option<String>) {
        let count = {
            let range = self.ctx.config.discovery_batch.clone();
            if range.is_empty() {
                0
            } else {
                rand::thread_rng().gen_range(range)
            }
        };
        let store = self.ctx.store.lock().await;
        let already_here: Vec<String> = match kind {
            EntityKind::Npc => store.visible_npcs().iter().map(|n| n.name.clone()).collect(),
            _ => store
                .location_items()
                .unwrap_or_default()
                .iter()
                .map(|i| i.name.clone())
                .collect(),
        };
        let open_leads: Vec<String> = store
            .ledger()
            .unresolved(None)
            .iter()
            .map(|l| l.name.clone())
            .collect();
        let context = json!({
            "location": store.current_location(),
            "already_here": already_here,
            "open_leads": open_leads,
        });
        (count, context, store.bias(Subsystem::Entities))
    }

    async fn generate_batch(
        &self,
        kind: EntityKind,
    ) -> Result<Vec<crate::content::GeneratedEntity>, HandlerError> {
        let (count, context, bias) = self.discovery_request(kind).await;
        let requests = (0..count).map(|index| {
            let mut context = context.clone();
            context["index"] = json!(index);
            self.ctx.content.generate_entity(EntityRequest {
                kind,
                context,
                bias: bias.clone(),
            })
        });
        Ok(try_join_all(requests).await?)
    }

    /// Search the current location for items.
    pub(super) async fn discover_items(&self) -> Result<Handled, HandlerError> {
        self.spend(Action::DiscoverItems).await?;
        let items = self
            .generate_batch(EntityKind::Item)
            .await?
            .into_iter()
            .map(|e| e.into_item())
            .collect::<Result<Vec<_>, _>>()?;

        for item in &items {
            link_entity_to_lead(self.ctx.content(), &self.ctx.store, &LinkCandidate::item(item))
                .await;
        }

        let rarity = items.iter().map(|i| i.rarity).max().unwrap_or(Rarity::Common);
        let names: Vec<_> = items.iter().map(|i| i.name.clone()).collect();
        let mut store = self.ctx.store.lock().await;
        let key = store.current_key();
        store.reveal_location_items(&key, items)?;
        if names.is_empty() {
            store.push_log(LogKind::Narration, "You search, but find nothing.");
        } else {
            store.push_log(
                LogKind::Narration,
                format!("You find: {}.", names.join(", ")),
            );
        }
        Ok(Handled::trigger(TriggerContext::action(
            Action::DiscoverItems,
            Some(rarity),
            key,
        )))
    }

    /// Look around the current location for people.
    pub(super) async fn discover_npcs(&self) -> Result<Handled, HandlerError> {
        self.spend(Action::DiscoverNpcs).await?;
        let npcs = self
            .generate_batch(EntityKind::Npc)
            .await?
            .into_iter()
            .map(|e| e.into_npc())
            .collect::<Result<Vec<_>, _>>()?;

        for npc in &npcs {
            link_entity_to_lead(self.ctx.content(), &self.ctx.store, &LinkCandidate::npc(npc))
                .await;
        }

        let rarity = npcs.iter().map(|n| n.rarity).max().unwrap_or(Rarity::Common);
        let names: Vec<_> = npcs.iter().map(|n| n.name.clone()).collect();
        let mut store = self.ctx.store.lock().await;
        let key = store.current_key();
        store.reveal_location_npcs(&key, npcs)?;
        if names.is_empty() {
            store.push_log(LogKind::Narration, "No one else is here.");
        } else {
            store.push_log(
                LogKind::Narration,
                format!("You notice: {}.", names.join(", ")),
            );
        }
        Ok(Handled::trigger(TriggerContext::action(
            Action::DiscoverNpcs,
            Some(rarity),
            key,
        )))
    }
}
