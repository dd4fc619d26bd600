use super::{CommandProcessor, Handled, HandlerError};
use crate::world::LogKind;

impl CommandProcessor<'_> {
    pub(super) async fn inventory(&self) -> Result<Handled, HandlerError> {
        let mut store = self.ctx.store.lock().await;
        let mut lines = Vec::new();

        if store.inventory().is_empty() {
            lines.push("You carry nothing.".to_string());
        } else {
            let items: Vec<_> = store
                .inventory()
                .iter()
                .map(|i| format!("{} ({})", i.name, i.rarity))
                .collect();
            lines.push(format!("You carry: {}.", items.join(", ")));
        }
        for limb in store.character().limbs() {
            if !limb.equipped.is_empty() {
                let names: Vec<_> = limb.equipped.iter().map(|i| i.name.as_str()).collect();
                lines.push(format!("On your {}: {}.", limb.name, names.join(", ")));
            }
        }
        if !store.crafting().is_empty() {
            let names: Vec<_> = store.crafting().iter().map(|i| i.name.as_str()).collect();
            lines.push(format!("Set aside for crafting: {}.", names.join(", ")));
        }

        store.push_log(LogKind::System, lines.join("\n"));
        Ok(Handled::done())
    }

    pub(super) async fn status(&self) -> Result<Handled, HandlerError> {
        let mut store = self.ctx.store.lock().await;
        let character = store.character();
        let mut lines = vec![
            format!("{}, {}", character.name, character.concept),
            format!(
                "Health {} | Energy {}/{}{}",
                character.overall_health(),
                character.energy(),
                character.max_energy(),
                if character.is_defeated() { " | defeated" } else { "" }
            ),
        ];
        for limb in character.limbs() {
            lines.push(format!("  {}: {} ({})", limb.name, limb.health, limb.status));
        }
        for (name, skill) in &character.skills {
            lines.push(format!(
                "  {name}: level {} ({}/{})",
                skill.level, skill.experience, skill.experience_to_next
            ));
        }
        lines.push(format!(
            "At {} {}",
            store.current_location_name(),
            store.coordinates()
        ));
        if let Some(event) = store.active_event() {
            lines.push(format!("Ongoing: {}", event.title));
        }
        let open = store.ledger().unresolved(None).len();
        if open > 0 {
            lines.push(format!("Open leads: {open}"));
        }

        store.push_log(LogKind::System, lines.join("\n"));
        Ok(Handled::done())
    }
}
