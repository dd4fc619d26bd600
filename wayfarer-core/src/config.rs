//! Game configuration.

use crate::commands::Action;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "WAYFARER_";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("discovery batch range {min}..={max} is empty")]
    EmptyBatchRange { min: usize, max: usize },
}

/// Energy cost of each action that has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyCosts {
    pub movement: i32,
    pub talk: i32,
    pub pickup: i32,
    pub use_item: i32,
    pub examine: i32,
    pub discover: i32,
    pub give: i32,
    pub request: i32,
    pub attack: i32,
    pub craft: i32,
}

impl Default for EnergyCosts {
    fn default() -> Self {
        Self {
            movement: 5,
            talk: 1,
            pickup: 2,
            use_item: 2,
            examine: 1,
            discover: 3,
            give: 1,
            request: 1,
            attack: 10,
            craft: 5,
        }
    }
}

impl EnergyCosts {
    /// Cost of `action`; free actions cost zero.
    pub fn cost(&self, action: Action) -> i32 {
        match action {
            Action::Move => self.movement,
            Action::Talk => self.talk,
            Action::Pickup => self.pickup,
            Action::UseItem => self.use_item,
            Action::Examine => self.examine,
            Action::DiscoverItems | Action::DiscoverNpcs => self.discover,
            Action::GiveItem => self.give,
            Action::RequestItem => self.request,
            Action::Attack => self.attack,
            Action::Craft => self.craft,
            Action::EndConversation
            | Action::Inventory
            | Action::Status
            | Action::EventInput
            | Action::Equip
            | Action::Unequip
            | Action::StageCrafting
            | Action::UnstageCrafting
            | Action::Unrecognized => 0,
        }
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut i32> {
        Some(match name {
            "MOVE" => &mut self.movement,
            "TALK" => &mut self.talk,
            "PICKUP" => &mut self.pickup,
            "USE" => &mut self.use_item,
            "EXAMINE" => &mut self.examine,
            "DISCOVER" => &mut self.discover,
            "GIVE" => &mut self.give,
            "REQUEST" => &mut self.request,
            "ATTACK" => &mut self.attack,
            "CRAFT" => &mut self.craft,
            _ => return None,
        })
    }
}

/// Configuration for a game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub campaign_name: String,

    /// Concept handed to character generation.
    pub character_concept: String,

    /// Style string passed with every image request.
    pub image_style: String,

    pub energy: EnergyCosts,

    /// Minimum wall-clock time between unforced director runs.
    pub director_min_interval: Duration,

    /// Minimum commands between unforced director runs.
    pub director_min_commands: u64,

    /// Log entries handed to the director.
    pub director_history: usize,

    /// Log entries included in the context snapshot.
    pub recent_log: usize,

    /// How many items or NPCs one discovery turns up.
    pub discovery_batch: RangeInclusive<usize>,

    /// Tags of locations where a defeated character may still move.
    pub defeat_exempt_tags: BTreeSet<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new("The Wayfarer's Road")
    }
}

impl GameConfig {
    pub fn new(campaign_name: impl Into<String>) -> Self {
        Self {
            campaign_name: campaign_name.into(),
            character_concept: "a curious wanderer".to_string(),
            image_style: "painterly, muted colors".to_string(),
            energy: EnergyCosts::default(),
            director_min_interval: Duration::from_secs(120),
            director_min_commands: 5,
            director_history: 40,
            recent_log: 12,
            discovery_batch: 1..=3,
            defeat_exempt_tags: BTreeSet::from(["afterlife".to_string()]),
        }
    }

    pub fn with_character_concept(mut self, concept: impl Into<String>) -> Self {
        self.character_concept = concept.into();
        self
    }

    pub fn with_image_style(mut self, style: impl Into<String>) -> Self {
        self.image_style = style.into();
        self
    }

    pub fn with_energy_costs(mut self, costs: EnergyCosts) -> Self {
        self.energy = costs;
        self
    }

    pub fn with_director_cadence(mut self, interval: Duration, commands: u64) -> Self {
        self.director_min_interval = interval;
        self.director_min_commands = commands;
        self
    }

    pub fn with_discovery_batch(mut self, batch: RangeInclusive<usize>) -> Self {
        self.discovery_batch = batch;
        self
    }

    pub fn with_defeat_exempt_tag(mut self, tag: impl Into<String>) -> Self {
        self.defeat_exempt_tags.insert(tag.into());
        self
    }

    /// Defaults overridden by `WAYFARER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `WAYFARER_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        if let Some(name) = get("CAMPAIGN") {
            config.campaign_name = name;
        }
        if let Some(concept) = get("CHARACTER_CONCEPT") {
            config.character_concept = concept;
        }
        if let Some(style) = get("IMAGE_STYLE") {
            config.image_style = style;
        }
        if let Some(secs) = parse(&get, "DIRECTOR_INTERVAL_SECS")? {
            config.director_min_interval = Duration::from_secs(secs);
        }
        if let Some(commands) = parse(&get, "DIRECTOR_MIN_COMMANDS")? {
            config.director_min_commands = commands;
        }
        if let Some(history) = parse(&get, "DIRECTOR_HISTORY")? {
            config.director_history = history;
        }
        if let Some(recent) = parse(&get, "RECENT_LOG")? {
            config.recent_log = recent;
        }
        let min = parse(&get, "DISCOVERY_MIN")?.unwrap_or(*config.discovery_batch.start());
        let max = parse(&get, "DISCOVERY_MAX")?.unwrap_or(*config.discovery_batch.end());
        if min > max {
            return Err(ConfigError::EmptyBatchRange { min, max });
        }
        config.discovery_batch = min..=max;
        if let Some(tags) = get("DEFEAT_EXEMPT_TAGS") {
            config.defeat_exempt_tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        for action in [
            "MOVE", "TALK", "PICKUP", "USE", "EXAMINE", "DISCOVER", "GIVE", "REQUEST", "ATTACK",
            "CRAFT",
        ] {
            if let Some(cost) = parse(&get, &format!("COST_{action}"))? {
                if let Some(field) = config.energy.field_mut(action) {
                    *field = cost;
                }
            }
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    match get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key: format!("{ENV_PREFIX}{name}"),
                value: raw,
            }),
    }
}
