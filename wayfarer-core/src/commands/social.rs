use super::{target, Action, CommandProcessor, Handled, HandlerError};
use crate::content::{NarrativeKind, NarrativeRequest, ParsedIntent};
use crate::director::Subsystem;
use crate::events::TriggerContext;
use crate::store::WorldStore;
use crate::world::{LogKind, Npc, Speaker};
use serde_json::json;

/// Conversation lines and open lead names, for dialogue memory.
fn dialogue_memory(store: &WorldStore, npc: &Npc) -> Vec<String> {
    let mut memory: Vec<String> = store
        .conversation()
        .filter(|c| c.npc_id == npc.id)
        .map(|c| {
            c.lines
                .iter()
                .map(|(speaker, line)| match speaker {
                    Speaker::Player => format!("Player: {line}"),
                    Speaker::Npc => format!("{}: {line}", npc.name),
                })
                .collect()
        })
        .unwrap_or_default();
    memory.extend(
        store
            .ledger()
            .unresolved(None)
            .into_iter()
            .map(|l| format!("Open lead: {}", l.name)),
    );
    memory
}

impl CommandProcessor<'_> {
    /// The named visible NPC, or the one already being talked to.
    fn addressed_npc(
        &self,
        store: &WorldStore,
        name: Option<&str>,
    ) -> Result<Npc, HandlerError> {
        let npc = match name {
            Some(name) => store.find_visible_npc(name),
            None => store
                .conversation()
                .and_then(|c| store.visible_npcs().into_iter().find(|n| n.id == c.npc_id)),
        };
        let npc = npc.ok_or_else(|| match name {
            Some(name) => HandlerError::precondition(format!("There is no one called {name} here.")),
            None => HandlerError::precondition("Who do you mean?"),
        })?;
        if npc.defeated {
            return Err(HandlerError::precondition(format!(
                "{} is in no state to respond.",
                npc.name
            )));
        }
        Ok(npc.clone())
    }

    pub(super) async fn talk(&self, intent: &ParsedIntent, raw: &str) -> Result<Handled, HandlerError> {
        let name = target(intent, 0, "npc");
        let (npc, memory, bias) = {
            let store = self.ctx.store.lock().await;
            let npc = self.addressed_npc(&store, name.as_deref())?;
            let memory = dialogue_memory(&store, &npc);
            (npc, memory, store.bias(Subsystem::Narrative))
        };
        self.spend(Action::Talk).await?;

        let outcome = self
            .ctx
            .content
            .generate_narrative(NarrativeRequest {
                kind: NarrativeKind::Dialogue,
                subject: json!(npc),
                player_input: Some(raw.to_string()),
                memory,
                bias,
            })
            .await?;

        {
            let mut store = self.ctx.store.lock().await;
            store.start_conversation(npc.id)?;
            store.add_conversation_line(Speaker::Player, raw)?;
            store.add_conversation_line(Speaker::Npc, outcome.raw_text.clone())?;
        }
        self.record_narrative(&outcome, &npc.name).await;

        let key = self.ctx.store.lock().await.current_key();
        Ok(Handled::trigger(TriggerContext::action(
            Action::Talk,
            Some(npc.rarity),
            key,
        )))
    }

    pub(super) async fn end_conversation(&self) -> Result<Handled, HandlerError> {
        let mut store = self.ctx.store.lock().await;
        let conversation = store
            .end_conversation()
            .ok_or_else(|| HandlerError::precondition("You aren't talking to anyone."))?;
        store.push_log(
            LogKind::System,
            format!("You end your conversation with {}.", conversation.npc_name),
        );
        Ok(Handled::done())
    }

    pub(super) async fn give_item(
        &self,
        intent: &ParsedIntent,
        raw: &str,
    ) -> Result<Handled, HandlerError> {
        let item_name = target(intent, 0, "item")
            .ok_or_else(|| HandlerError::precondition("Give what?"))?;
        let npc_name = target(intent, 1, "npc");

        let (item, npc, memory, bias) = {
            let store = self.ctx.store.lock().await;
            let item = store
                .inventory_item(&item_name)
                .cloned()
                .ok_or_else(|| HandlerError::precondition(format!("You don't have {item_name}.")))?;
            let npc = self.addressed_npc(&store, npc_name.as_deref())?;
            let memory = dialogue_memory(&store, &npc);
            (item, npc, memory, store.bias(Subsystem::Narrative))
        };
        self.spend(Action::GiveItem).await?;

        let outcome = self
            .ctx
            .content
            .generate_narrative(NarrativeRequest {
                kind: NarrativeKind::Gift,
                subject: json!({ "item": item, "npc": npc }),
                player_input: Some(raw.to_string()),
                memory,
                bias,
            })
            .await?;

        if outcome.success {
            let mut store = self.ctx.store.lock().await;
            store.give_to_npc(&item.name, npc.id)?;
            store.push_log(
                LogKind::System,
                format!("{} accepts {}.", npc.name, item.name),
            );
        }
        self.record_narrative(&outcome, &npc.name).await;

        let key = self.ctx.store.lock().await.current_key();
        Ok(Handled::trigger(TriggerContext::action(
            Action::GiveItem,
            Some(item.rarity.max(npc.rarity)),
            key,
        )))
    }

    pub(super) async fn request_item(
        &self,
        intent: &ParsedIntent,
        raw: &str,
    ) -> Result<Handled, HandlerError> {
        let item_name = target(intent, 0, "item")
            .ok_or_else(|| HandlerError::precondition("Ask for what?"))?;
        let npc_name = target(intent, 1, "npc");

        let (item, npc, memory, bias) = {
            let store = self.ctx.store.lock().await;
            let npc = self.addressed_npc(&store, npc_name.as_deref())?;
            let item = npc
                .inventory
                .iter()
                .find(|i| i.matches_name(&item_name))
                .cloned()
                .ok_or_else(|| {
                    HandlerError::precondition(format!("{} doesn't have {item_name}.", npc.name))
                })?;
            let memory = dialogue_memory(&store, &npc);
            (item, npc, memory, store.bias(Subsystem::Narrative))
        };
        self.spend(Action::RequestItem).await?;

        let outcome = self
            .ctx
            .content
            .generate_narrative(NarrativeRequest {
                kind: NarrativeKind::Request,
                subject: json!({ "item": item, "npc": npc }),
                player_input: Some(raw.to_string()),
                memory,
                bias,
            })
            .await?;

        if outcome.success {
            let mut store = self.ctx.store.lock().await;
            store.take_from_npc(npc.id, &item.name)?;
            store.push_log(
                LogKind::System,
                format!("{} hands you {}.", npc.name, item.name),
            );
        }
        self.record_narrative(&outcome, &npc.name).await;

        let key = self.ctx.store.lock().await.current_key();
        Ok(Handled::trigger(TriggerContext::action(
            Action::RequestItem,
            Some(item.rarity.max(npc.rarity)),
            key,
        )))
    }
}
