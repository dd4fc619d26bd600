use super::{target, Action, CommandProcessor, Handled, HandlerError};
use crate::content::{Intensity, ParsedIntent};
use crate::events::{EventEngine, TriggerOutcome};
use crate::world::LogKind;

impl CommandProcessor<'_> {
    /// Attack a visible NPC. The consequences are generated as a
    /// player-initiated event.
    pub(super) async fn attack(&self, intent: &ParsedIntent) -> Result<Handled, HandlerError> {
        let name = target(intent, 0, "npc")
            .ok_or_else(|| HandlerError::precondition("Attack whom?"))?;
        let (npc, attacker, weapon) = {
            let store = self.ctx.store.lock().await;
            let npc = store
                .find_visible_npc(&name)
                .cloned()
                .ok_or_else(|| HandlerError::precondition(format!("There is no {name} here.")))?;
            if npc.defeated {
                return Err(HandlerError::precondition(format!(
                    "{} is already down.",
                    npc.name
                )));
            }
            let weapon = target(intent, 1, "weapon").or_else(|| {
                store
                    .character()
                    .limbs()
                    .iter()
                    .flat_map(|l| l.equipped.iter())
                    .next()
                    .map(|i| i.name.clone())
            });
            (npc, store.character().name.clone(), weapon)
        };
        self.spend(Action::Attack).await?;

        let concept = match weapon {
            Some(weapon) => format!("{attacker} attacks {} with {weapon}", npc.name),
            None => format!("{attacker} attacks {}", npc.name),
        };
        let intensity = if npc.rarity.is_high() {
            Intensity::Extreme
        } else {
            Intensity::High
        };

        let outcome = EventEngine::new(self.ctx)
            .handle_player_initiated_significant_action(npc.id, &concept, intensity)
            .await;
        match outcome {
            TriggerOutcome::Concluded(_) => Ok(Handled::concluded(true)),
            TriggerOutcome::Busy | TriggerOutcome::EventActive => {
                self.ctx
                    .log(LogKind::System, "Something else is already unfolding.")
                    .await;
                Ok(Handled::done())
            }
            TriggerOutcome::Started(_)
            | TriggerOutcome::Failed
            | TriggerOutcome::Ineligible
            | TriggerOutcome::Declined
            | TriggerOutcome::NothingHappened => Ok(Handled::done()),
        }
    }
}
