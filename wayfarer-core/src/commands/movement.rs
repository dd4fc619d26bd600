use super::{target, Action, CommandProcessor, Handled, HandlerError};
use crate::content::{EntityKind, EntityRequest, NarrativeKind, NarrativeRequest, ParsedIntent};
use crate::director::Subsystem;
use crate::discovery::{link_entity_to_lead, LinkCandidate};
use crate::events::TriggerContext;
use crate::world::{Coordinates, Direction, LogEntry, LogKind};
use serde_json::json;
use tracing::{debug, warn};

/// Resolve a direction token relative to `from`: a compass word, an alias,
/// or the literal coordinates of a neighbouring cell.
pub(crate) fn resolve_direction(token: &str, from: Coordinates) -> Option<Direction> {
    Direction::parse(token).or_else(|| {
        let coords: Coordinates = token.parse().ok()?;
        from.direction_to(coords)
    })
}

impl CommandProcessor<'_> {
    pub(super) async fn move_player(&self, intent: &ParsedIntent) -> Result<Handled, HandlerError> {
        let token = target(intent, 0, "direction").unwrap_or_default();

        let (from, direction, destination, cached) = {
            let mut store = self.ctx.store.lock().await;
            if let Some(event) = store.active_event() {
                return Err(HandlerError::precondition(format!(
                    "You can't leave while {} is unfolding.",
                    event.title
                )));
            }
            let exempt = self
                .ctx
                .config
                .defeat_exempt_tags
                .iter()
                .any(|tag| store.current_has_tag(tag));
            if store.character().is_defeated() && !exempt {
                return Err(HandlerError::precondition(
                    "You are too badly hurt to travel.",
                ));
            }

            let from = store.coordinates();
            let Some(direction) = resolve_direction(&token, from) else {
                store.push_log(
                    LogKind::Error,
                    format!("There is no way to go \"{token}\"."),
                );
                return Ok(Handled::done());
            };

            store.spend_energy(self.ctx.config.energy.cost(Action::Move))?;

            let has_exit = store
                .current_location()
                .is_some_and(|l| l.has_exit(direction));
            if !has_exit {
                store.push_log(
                    LogKind::Error,
                    format!("You can't go {direction} from here."),
                );
                return Ok(Handled::done());
            }

            let destination = from.step(direction);
            let cached = store.visited(&destination.key()).is_some();
            (from, direction, destination, cached)
        };
        let key = destination.key();

        if cached {
            let mut store = self.ctx.store.lock().await;
            store.move_to(destination)?;
            let location = store
                .current_location()
                .cloned()
                .ok_or_else(|| HandlerError::precondition("That place has vanished."))?;
            store.push_log_entry(
                LogEntry::new(
                    LogKind::Narration,
                    format!("You return to {}. {}", location.name, location.description),
                )
                .with_lore(location.lore_description.clone()),
            );
            debug!(%key, "revisited cached location");
            return Ok(Handled::trigger(TriggerContext::action(
                Action::Move,
                Some(location.rarity),
                key,
            )));
        }

        let (context, bias) = {
            let store = self.ctx.store.lock().await;
            let context = json!({
                "from": store.current_location_name(),
                "direction": direction.name(),
                "coordinates": key.as_str(),
                "environment_tags": store
                    .current_location()
                    .map(|l| l.environment_tags.iter().cloned().collect::<Vec<_>>())
                    .unwrap_or_default(),
            });
            (context, store.bias(Subsystem::Entities))
        };
        let mut location = self
            .ctx
            .content
            .generate_entity(EntityRequest {
                kind: EntityKind::Location,
                context: context.clone(),
                bias,
            })
            .await?
            .into_location()?;
        location.exits.insert(direction.opposite());

        let narration = {
            let bias = self.ctx.store.lock().await.bias(Subsystem::Narrative);
            let request = NarrativeRequest {
                kind: NarrativeKind::MovementNarration,
                subject: json!({ "location": &location, "arrival": context }),
                player_input: None,
                memory: Vec::new(),
                bias,
            };
            match self.ctx.content.generate_narrative(request).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!(error = %e, "arrival narration failed, using description");
                    None
                }
            }
        };

        link_entity_to_lead(
            self.ctx.content(),
            &self.ctx.store,
            &LinkCandidate::location(key.clone(), &location),
        )
        .await;

        let rarity = location.rarity;
        let name = location.name.clone();
        {
            let mut store = self.ctx.store.lock().await;
            let description = location.description.clone();
            let lore = location.lore_description.clone();
            store.record_location(destination, location);
            store.move_to(destination)?;
            store.push_log_entry(
                LogEntry::new(LogKind::Narration, format!("You arrive at {name}. {description}"))
                    .with_lore(lore),
            );
        }
        if let Some(outcome) = narration {
            self.record_narrative(&outcome, &name).await;
        }
        debug!(from = %from.key(), to = %key, "moved to a new location");

        Ok(Handled::trigger(TriggerContext::action(
            Action::Move,
            Some(rarity),
            key,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_direction() {
        let here = Coordinates::new(2, 2);
        assert_eq!(resolve_direction("north", here), Some(Direction::North));
        assert_eq!(resolve_direction("E", here), Some(Direction::East));
        assert_eq!(resolve_direction("2,1", here), Some(Direction::South));
        assert_eq!(resolve_direction("4,2", here), None);
        assert_eq!(resolve_direction("up", here), None);
        assert_eq!(resolve_direction("", here), None);
    }
}
