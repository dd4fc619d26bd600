//! The director: periodic story analysis that steers future generation.

use crate::content::{ContentError, DirectorRequest};
use crate::context::GameContext;
use crate::store::WorldStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Generation subsystems a directive can bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    IntentParsing,
    Narrative,
    Entities,
    Events,
}

/// A directive produced by story analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorDirective {
    /// Short label for what the story should lean into next.
    pub focus: String,
    #[serde(default)]
    pub parameter_suggestions: BTreeMap<String, String>,
    #[serde(default)]
    pub enhancements: BTreeMap<Subsystem, String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub command_count: u64,
}

impl DirectorDirective {
    pub fn new(focus: impl Into<String>) -> Self {
        Self {
            focus: focus.into(),
            parameter_suggestions: BTreeMap::new(),
            enhancements: BTreeMap::new(),
            reasoning: String::new(),
            timestamp: Utc::now(),
            command_count: 0,
        }
    }

    pub fn with_enhancement(mut self, subsystem: Subsystem, text: impl Into<String>) -> Self {
        self.enhancements.insert(subsystem, text.into());
        self
    }

    pub fn enhancement(&self, subsystem: Subsystem) -> Option<&str> {
        self.enhancements.get(&subsystem).map(String::as_str)
    }
}

/// What a call to [`Director::maybe_analyze`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectorOutcome {
    NotDue,
    Busy,
    Updated(DirectorDirective),
    Unchanged,
    Failed(ContentError),
}

pub struct Director<'a> {
    ctx: &'a GameContext,
}

impl<'a> Director<'a> {
    pub fn new(ctx: &'a GameContext) -> Self {
        Self { ctx }
    }

    /// Whether the cadence allows an unforced run at `now`.
    pub fn is_due(&self, store: &WorldStore, now: DateTime<Utc>) -> bool {
        let config = &self.ctx.config;
        match store.director_checkpoint() {
            None => store.command_count() >= config.director_min_commands,
            Some(last) => {
                let elapsed = (now - last.at).to_std().unwrap_or_default();
                let commands = store.command_count().saturating_sub(last.command_count);
                elapsed >= config.director_min_interval && commands >= config.director_min_commands
            }
        }
    }

    /// Run an analysis if forced or due, keeping the previous directive on
    /// `None` or failure.
    #[instrument(skip(self))]
    pub async fn maybe_analyze(&self, force: bool) -> DirectorOutcome {
        let Some(_permit) = self.ctx.scheduler.try_director() else {
            debug!("director analysis already running");
            return DirectorOutcome::Busy;
        };

        let request = {
            let store = self.ctx.store.lock().await;
            if !force && !self.is_due(&store, Utc::now()) {
                return DirectorOutcome::NotDue;
            }
            DirectorRequest {
                history: store.recent_log(self.ctx.config.director_history).to_vec(),
                chronicle: store.chronicle().to_vec(),
                snapshot: store.context_snapshot(self.ctx.config.recent_log),
                previous: store.directive().cloned(),
                command_count: store.command_count(),
            }
        };
        let command_count = request.command_count;

        let result = self.ctx.content.analyze_for_directive(request).await;

        let mut store = self.ctx.store.lock().await;
        let now = Utc::now();
        store.set_director_checkpoint(now, command_count);
        match result {
            Ok(Some(mut directive)) => {
                directive.timestamp = now;
                directive.command_count = command_count;
                info!(focus = %directive.focus, "director issued a new directive");
                store.set_directive(directive.clone());
                DirectorOutcome::Updated(directive)
            }
            Ok(None) => {
                info!("director kept the current directive");
                DirectorOutcome::Unchanged
            }
            Err(e) => {
                warn!(error = %e, "director analysis failed");
                DirectorOutcome::Failed(e)
            }
        }
    }
}
