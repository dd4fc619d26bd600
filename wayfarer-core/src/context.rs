//! Shared state lent to every component for the life of a game.

use crate::config::GameConfig;
use crate::content::{ContentService, ContextSnapshot};
use crate::scheduler::Scheduler;
use crate::store::WorldStore;
use crate::world::{LogEntry, LogKind};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct GameContext {
    pub(crate) store: Mutex<WorldStore>,
    pub(crate) content: Arc<dyn ContentService>,
    pub(crate) scheduler: Scheduler,
    pub(crate) config: GameConfig,
}

impl GameContext {
    pub fn new(store: WorldStore, content: Arc<dyn ContentService>, config: GameConfig) -> Self {
        Self {
            store: Mutex::new(store),
            content,
            scheduler: Scheduler::new(),
            config,
        }
    }

    pub fn store(&self) -> &Mutex<WorldStore> {
        &self.store
    }

    pub fn content(&self) -> &dyn ContentService {
        self.content.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub(crate) async fn log(&self, kind: LogKind, text: impl Into<String>) {
        self.store.lock().await.push_log(kind, text);
    }

    pub(crate) async fn log_entry(&self, entry: LogEntry) {
        self.store.lock().await.push_log_entry(entry);
    }

    pub(crate) async fn snapshot(&self) -> ContextSnapshot {
        self.store.lock().await.context_snapshot(self.config.recent_log)
    }
}
