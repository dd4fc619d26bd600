use serde::{Deserialize, Serialize};

/// Every action a parsed intent can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Move,
    Talk,
    EndConversation,
    Pickup,
    UseItem,
    Examine,
    DiscoverItems,
    DiscoverNpcs,
    GiveItem,
    RequestItem,
    Attack,
    Inventory,
    Status,
    EventInput,
    Equip,
    Unequip,
    StageCrafting,
    UnstageCrafting,
    Craft,
    #[serde(other)]
    Unrecognized,
}

impl Action {
    pub fn slug(&self) -> &'static str {
        match self {
            Action::Move => "move",
            Action::Talk => "talk",
            Action::EndConversation => "end_conversation",
            Action::Pickup => "pickup",
            Action::UseItem => "use_item",
            Action::Examine => "examine",
            Action::DiscoverItems => "discover_items",
            Action::DiscoverNpcs => "discover_npcs",
            Action::GiveItem => "give_item",
            Action::RequestItem => "request_item",
            Action::Attack => "attack",
            Action::Inventory => "inventory",
            Action::Status => "status",
            Action::EventInput => "event_input",
            Action::Equip => "equip",
            Action::Unequip => "unequip",
            Action::StageCrafting => "stage_crafting",
            Action::UnstageCrafting => "unstage_crafting",
            Action::Craft => "craft",
            Action::Unrecognized => "unrecognized",
        }
    }

    /// Read-only queries that stay available while an event is active.
    pub fn is_query(&self) -> bool {
        matches!(self, Action::Inventory | Action::Status)
    }

    /// Actions a defeated character may still attempt. Movement keeps its
    /// own check against the defeat-exempt location tags.
    pub fn allowed_while_defeated(&self) -> bool {
        self.is_query()
            || matches!(
                self,
                Action::EndConversation | Action::EventInput | Action::Move | Action::Unrecognized
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_matches_serde_name() {
        for action in [Action::DiscoverNpcs, Action::UnstageCrafting, Action::Move] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.slug()));
        }
    }

    #[test]
    fn test_queries() {
        assert!(Action::Status.is_query());
        assert!(Action::Inventory.is_query());
        assert!(!Action::Move.is_query());
    }

    #[test]
    fn test_defeated_action_set() {
        for action in [Action::Status, Action::Inventory, Action::EndConversation, Action::Move] {
            assert!(action.allowed_while_defeated(), "{}", action.slug());
        }
        for action in [Action::Pickup, Action::Talk, Action::DiscoverItems, Action::Attack, Action::Craft] {
            assert!(!action.allowed_while_defeated(), "{}", action.slug());
        }
    }
}
