use super::{target, Action, CommandProcessor, Handled, HandlerError};
use crate::content::{EntityKind, EntityRequest, NarrativeKind, NarrativeRequest, ParsedIntent};
use crate::director::Subsystem;
use crate::discovery::{link_entity_to_lead, LinkCandidate};
use crate::events::TriggerContext;
use crate::world::LogKind;
use serde_json::json;

/// Experience granted per ingredient of a successful craft.
const CRAFTING_XP_PER_INGREDIENT: u32 = 25;

/// Limb used when an equip intent names none.
const DEFAULT_LIMB: &str = "right arm";

impl CommandProcessor<'_> {
    pub(super) async fn pickup(&self, intent: &ParsedIntent) -> Result<Handled, HandlerError> {
        let name = target(intent, 0, "item")
            .ok_or_else(|| HandlerError::precondition("Pick up what?"))?;
        let (item, bias) = {
            let store = self.ctx.store.lock().await;
            let items = store.location_items().ok_or_else(|| {
                HandlerError::precondition("You haven't searched this place yet.")
            })?;
            let item = items
                .iter()
                .find(|i| i.matches_name(&name))
                .cloned()
                .ok_or_else(|| HandlerError::precondition(format!("There is no {name} here.")))?;
            (item, store.bias(Subsystem::Narrative))
        };
        self.spend(Action::Pickup).await?;

        let outcome = self
            .ctx
            .content
            .generate_narrative(NarrativeRequest {
                kind: NarrativeKind::Pickup,
                subject: json!(item),
                player_input: None,
                memory: Vec::new(),
                bias,
            })
            .await?;

        self.ctx.store.lock().await.pick_up(&item.name)?;
        self.record_narrative(&outcome, &item.name).await;

        let key = self.ctx.store.lock().await.current_key();
        Ok(Handled::trigger(TriggerContext::action(
            Action::Pickup,
            Some(item.rarity),
            key,
        )))
    }

    pub(super) async fn use_item(
        &self,
        intent: &ParsedIntent,
        raw: &str,
    ) -> Result<Handled, HandlerError> {
        let name = target(intent, 0, "item")
            .ok_or_else(|| HandlerError::precondition("Use what?"))?;
        let on = target(intent, 1, "target");
        let (item, bias) = {
            let store = self.ctx.store.lock().await;
            let item = store
                .inventory_item(&name)
                .cloned()
                .ok_or_else(|| HandlerError::precondition(format!("You don't have {name}.")))?;
            (item, store.bias(Subsystem::Narrative))
        };
        self.spend(Action::UseItem).await?;

        let outcome = self
            .ctx
            .content
            .generate_narrative(NarrativeRequest {
                kind: NarrativeKind::ItemUse,
                subject: json!({ "item": item, "target": on }),
                player_input: Some(raw.to_string()),
                memory: Vec::new(),
                bias,
            })
            .await?;
        self.record_narrative(&outcome, &item.name).await;

        let key = self.ctx.store.lock().await.current_key();
        Ok(Handled::trigger(TriggerContext::action(
            Action::UseItem,
            Some(item.rarity),
            key,
        )))
    }

    pub(super) async fn equip(&self, intent: &ParsedIntent) -> Result<Handled, HandlerError> {
        let name = target(intent, 0, "item")
            .ok_or_else(|| HandlerError::precondition("Equip what?"))?;
        let limb = target(intent, 1, "limb").unwrap_or_else(|| DEFAULT_LIMB.to_string());
        let mut store = self.ctx.store.lock().await;
        let item = store.equip(&name, &limb)?;
        store.push_log(
            LogKind::System,
            format!("You equip {} on your {limb}.", item.name),
        );
        Ok(Handled::done())
    }

    pub(super) async fn unequip(&self, intent: &ParsedIntent) -> Result<Handled, HandlerError> {
        let name = target(intent, 0, "item")
            .ok_or_else(|| HandlerError::precondition("Unequip what?"))?;
        let mut store = self.ctx.store.lock().await;
        let item = store.unequip(&name)?;
        store.push_log(LogKind::System, format!("You stow {}.", item.name));
        Ok(Handled::done())
    }

    pub(super) async fn stage_crafting(
        &self,
        intent: &ParsedIntent,
    ) -> Result<Handled, HandlerError> {
        let name = target(intent, 0, "item")
            .ok_or_else(|| HandlerError::precondition("Set aside what?"))?;
        let mut store = self.ctx.store.lock().await;
        let item = store.stage_crafting(&name)?;
        store.push_log(
            LogKind::System,
            format!("You set {} aside for crafting.", item.name),
        );
        Ok(Handled::done())
    }

    pub(super) async fn unstage_crafting(
        &self,
        intent: &ParsedIntent,
    ) -> Result<Handled, HandlerError> {
        let name = target(intent, 0, "item")
            .ok_or_else(|| HandlerError::precondition("Take back what?"))?;
        let mut store = self.ctx.store.lock().await;
        let item = store.unstage_crafting(&name)?;
        store.push_log(LogKind::System, format!("You take back {}.", item.name));
        Ok(Handled::done())
    }

    /// Combine every staged item into something new.
    pub(super) async fn craft(&self, intent: &ParsedIntent, raw: &str) -> Result<Handled, HandlerError> {
        let goal = target(intent, 0, "goal");
        let (ingredients, narrative_bias, entity_bias) = {
            let store = self.ctx.store.lock().await;
            if store.crafting().is_empty() {
                return Err(HandlerError::precondition("Nothing is staged for crafting."));
            }
            (
                store.crafting().to_vec(),
                store.bias(Subsystem::Narrative),
                store.bias(Subsystem::Entities),
            )
        };
        self.spend(Action::Craft).await?;

        let outcome = self
            .ctx
            .content
            .generate_narrative(NarrativeRequest {
                kind: NarrativeKind::Crafting,
                subject: json!({ "ingredients": ingredients, "goal": goal }),
                player_input: Some(raw.to_string()),
                memory: Vec::new(),
                bias: narrative_bias,
            })
            .await?;
        if !outcome.success {
            self.record_narrative(&outcome, "crafting").await;
            return Ok(Handled::done());
        }

        let crafted = self
            .ctx
            .content
            .generate_entity(EntityRequest {
                kind: EntityKind::Item,
                context: json!({
                    "ingredients": ingredients,
                    "goal": goal,
                    "narration": outcome.narration,
                }),
                bias: entity_bias,
            })
            .await?
            .into_item()?;

        link_entity_to_lead(
            self.ctx.content(),
            &self.ctx.store,
            &LinkCandidate::item(&crafted),
        )
        .await;

        let rarity = crafted.rarity;
        {
            let mut store = self.ctx.store.lock().await;
            let consumed = store.consume_crafting();
            store.push_log(LogKind::System, format!("You crafted {}.", crafted.name));
            store.add_to_inventory(crafted);
            let xp = CRAFTING_XP_PER_INGREDIENT * consumed.len() as u32;
            if store.add_skill_experience("crafting", xp) > 0 {
                let level = store
                    .character()
                    .skills
                    .get("crafting")
                    .map_or(1, |s| s.level);
                store.push_log(
                    LogKind::System,
                    format!("Your crafting improves to level {level}."),
                );
            }
        }
        self.record_narrative(&outcome, "crafting").await;

        let key = self.ctx.store.lock().await.current_key();
        Ok(Handled::trigger(TriggerContext::action(
            Action::Craft,
            Some(rarity),
            key,
        )))
    }
}
