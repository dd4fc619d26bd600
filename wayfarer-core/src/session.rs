//! GameSession - the primary public API.
//!
//! A session owns the world store, the content service handle, the
//! scheduler and the configuration, and exposes turn submission, state
//! views and save/load on top of them.

use crate::commands::CommandProcessor;
use crate::config::{ConfigError, GameConfig};
use crate::content::{ContentError, ContentService, EntityKind, EntityRequest};
use crate::context::GameContext;
use crate::director::{Director, Subsystem};
use crate::events::{EventEngine, TriggerContext};
use crate::store::WorldStore;
use crate::world::{LogEntry, LogKind};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument};

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("another command is still being processed")]
    Busy,

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result of one submitted command.
#[derive(Debug, Clone)]
pub struct Response {
    /// Log entries the command produced, starting with the command itself.
    pub entries: Vec<LogEntry>,

    /// Whether an event is active after the command.
    pub event_active: bool,

    /// Whether the character is defeated after the command.
    pub defeated: bool,

    pub command_count: u64,
}

impl Response {
    /// Entry texts joined by newlines, omitting the echoed command.
    pub fn text(&self) -> String {
        self.entries
            .iter()
            .filter(|e| e.kind != LogKind::Command)
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A running game.
pub struct GameSession {
    ctx: GameContext,
}

impl GameSession {
    /// Generate a character and a starting location, then open the game
    /// with a possible opening event and a first director analysis.
    #[instrument(skip(content, config), fields(campaign = %config.campaign_name))]
    pub async fn start(
        content: Arc<dyn ContentService>,
        config: GameConfig,
    ) -> Result<Self, SessionError> {
        let character = content
            .generate_entity(EntityRequest {
                kind: EntityKind::Character,
                context: json!({
                    "campaign": config.campaign_name,
                    "concept": config.character_concept,
                }),
                bias: None,
            })
            .await?
            .into_character()?;
        let location = content
            .generate_entity(EntityRequest {
                kind: EntityKind::Location,
                context: json!({
                    "campaign": config.campaign_name,
                    "coordinates": "0,0",
                    "starting": true,
                }),
                bias: None,
            })
            .await?
            .into_location()?;

        let mut store = WorldStore::new(character, location);
        store.push_log(LogKind::System, format!("Welcome to {}.", config.campaign_name));
        if let Some(start) = store.current_location().cloned() {
            store.push_log_entry(
                LogEntry::new(
                    LogKind::Narration,
                    format!("{}. {}", start.name, start.description),
                )
                .with_lore(start.lore_description),
            );
        }
        let key = store.current_key();
        info!(character = %store.character().name, "game started");

        let session = Self::with_store(store, content, config);
        EventEngine::new(&session.ctx)
            .attempt_to_trigger_unexpected_event(&TriggerContext::game_start(key))
            .await;
        Director::new(&session.ctx).maybe_analyze(true).await;
        Ok(session)
    }

    /// Wrap an existing store.
    pub fn with_store(
        mut store: WorldStore,
        content: Arc<dyn ContentService>,
        config: GameConfig,
    ) -> Self {
        store.normalize();
        Self {
            ctx: GameContext::new(store, content, config),
        }
    }

    /// Process one line of player input.
    ///
    /// Returns [`SessionError::Busy`] without touching any state while
    /// another command is in flight.
    pub async fn submit(&self, input: &str) -> Result<Response, SessionError> {
        let report = CommandProcessor::new(&self.ctx).process(input).await?;
        let store = self.ctx.store.lock().await;
        Ok(Response {
            entries: report.entries,
            event_active: store.has_active_event(),
            defeated: store.character().is_defeated(),
            command_count: store.command_count(),
        })
    }

    /// A serialisable copy of the whole world.
    pub async fn view(&self) -> WorldStore {
        self.ctx.store.lock().await.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.ctx.scheduler.console_busy()
    }

    pub fn config(&self) -> &GameConfig {
        &self.ctx.config
    }

    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    /// Current director focus, if any.
    pub async fn focus(&self) -> Option<String> {
        let store = self.ctx.store.lock().await;
        store.directive().map(|d| {
            match d.enhancement(Subsystem::Narrative) {
                Some(hint) => format!("{} ({hint})", d.focus),
                None => d.focus.clone(),
            }
        })
    }

    /// Save the world to a JSON file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let json = {
            let store = self.ctx.store.lock().await;
            serde_json::to_string_pretty(&*store)?
        };
        fs::write(path.as_ref(), json).await?;
        info!(path = %path.as_ref().display(), "game saved");
        Ok(())
    }

    /// Load a world saved with [`save`](Self::save).
    pub async fn load(
        path: impl AsRef<Path>,
        content: Arc<dyn ContentService>,
        config: GameConfig,
    ) -> Result<Self, SessionError> {
        let json = fs::read_to_string(path.as_ref()).await?;
        let store: WorldStore = serde_json::from_str(&json)?;
        info!(path = %path.as_ref().display(), "game loaded");
        Ok(Self::with_store(store, content, config))
    }
}
