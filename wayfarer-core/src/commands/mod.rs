//! The command processor: one line of player input per turn.
//!
//! A turn runs under the console gate. The raw input is logged, parsed by
//! the content service into a [`ParsedIntent`], and dispatched to exactly
//! one handler. Handlers validate first, commit their energy cost, call the
//! service, and only then write their results to the store. Whatever
//! happens, the turn ends by counting the command, releasing the gate and
//! giving the director a chance to run.

mod action;
mod combat;
mod explore;
mod items;
mod movement;
mod social;
mod status;

pub use action::Action;

use crate::content::{ContentError, NarrativeOutcome, ParsedIntent};
use crate::context::GameContext;
use crate::director::{Director, DirectorOutcome};
use crate::events::{EventEngine, ResolutionOutcome, TriggerContext, TriggerOutcome};
use crate::session::SessionError;
use crate::store::StoreError;
use crate::world::{LogEntry, LogKind};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Why a handler stopped early.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Content(#[from] ContentError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Precondition(String),
}

impl HandlerError {
    fn precondition(message: impl Into<String>) -> Self {
        HandlerError::Precondition(message.into())
    }

    /// Service failures are errors; everything else is the game saying no.
    fn log_entry(&self) -> LogEntry {
        match self {
            HandlerError::Content(e) => {
                LogEntry::new(LogKind::Error, format!("Something went wrong: {e}"))
            }
            HandlerError::Store(StoreError::InsufficientEnergy { needed, available }) => {
                LogEntry::new(
                    LogKind::System,
                    format!("You are too tired for that (needs {needed} energy, you have {available})."),
                )
            }
            HandlerError::Store(e) => LogEntry::new(LogKind::System, e.to_string()),
            HandlerError::Precondition(message) => LogEntry::new(LogKind::System, message.clone()),
        }
    }
}

/// What a handler asks the processor to do after it returns.
#[derive(Debug, Default)]
pub(crate) struct Handled {
    trigger: Option<TriggerContext>,
    event_concluded: bool,
}

impl Handled {
    fn done() -> Self {
        Self::default()
    }

    fn trigger(trigger: TriggerContext) -> Self {
        Self {
            trigger: Some(trigger),
            event_concluded: false,
        }
    }

    fn concluded(event_concluded: bool) -> Self {
        Self {
            trigger: None,
            event_concluded,
        }
    }
}

/// Everything one turn produced.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// Log entries appended during the turn, starting with the command.
    pub entries: Vec<LogEntry>,
    pub event_concluded: bool,
    pub director: DirectorOutcome,
}

pub struct CommandProcessor<'a> {
    ctx: &'a GameContext,
}

impl<'a> CommandProcessor<'a> {
    pub fn new(ctx: &'a GameContext) -> Self {
        Self { ctx }
    }

    /// Process one line of input. Fails only when another turn is running.
    #[instrument(skip(self))]
    pub async fn process(&self, raw: &str) -> Result<TurnReport, SessionError> {
        let permit = self.ctx.scheduler.try_console().ok_or(SessionError::Busy)?;

        let first_entry = {
            let mut store = self.ctx.store.lock().await;
            store.push_log(LogKind::Command, raw);
            store.log().len() - 1
        };

        let event_concluded = self.run_turn(raw).await;

        let command_count = self.ctx.store.lock().await.increment_command_count();
        drop(permit);
        debug!(command_count, event_concluded, "turn finished");

        let director = Director::new(self.ctx).maybe_analyze(event_concluded).await;

        let entries = self.ctx.store.lock().await.log()[first_entry..].to_vec();
        Ok(TurnReport {
            entries,
            event_concluded,
            director,
        })
    }

    /// Parse and dispatch. Returns whether an event concluded.
    async fn run_turn(&self, raw: &str) -> bool {
        let snapshot = self.ctx.snapshot().await;
        let intent = match self.ctx.content.parse_intent(raw, &snapshot).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "intent parsing failed");
                self.ctx
                    .log(LogKind::Error, format!("Could not make sense of that: {e}"))
                    .await;
                return false;
            }
        };

        if !intent.is_plausible {
            let reason = intent
                .reason
                .clone()
                .unwrap_or_else(|| "That isn't possible here.".to_string());
            self.ctx.log(LogKind::System, reason).await;
            return false;
        }
        if let Some(narration) = &intent.narration {
            self.ctx.log(LogKind::Narration, narration.clone()).await;
        }

        let funneled = snapshot
            .active_event
            .as_ref()
            .is_some_and(|e| e.requires_resolution);
        let action = if funneled && !intent.action.is_query() {
            Action::EventInput
        } else {
            intent.action
        };
        if snapshot.character.is_defeated() && !action.allowed_while_defeated() {
            debug!(action = action.slug(), "refused while defeated");
            self.ctx
                .log(LogKind::System, "You are too badly hurt to do that.")
                .await;
            return false;
        }
        debug!(action = action.slug(), funneled, "dispatching");

        let handled = match self.dispatch(action, &intent, raw).await {
            Ok(handled) => handled,
            Err(e) => {
                debug!(error = %e, action = action.slug(), "handler stopped");
                self.ctx.log_entry(e.log_entry()).await;
                return false;
            }
        };

        let mut concluded = handled.event_concluded;
        if let Some(trigger) = handled.trigger {
            let outcome = EventEngine::new(self.ctx)
                .attempt_to_trigger_unexpected_event(&trigger)
                .await;
            concluded |= matches!(outcome, TriggerOutcome::Concluded(_));
        }
        concluded
    }

    async fn dispatch(
        &self,
        action: Action,
        intent: &ParsedIntent,
        raw: &str,
    ) -> Result<Handled, HandlerError> {
        match action {
            Action::Move => self.move_player(intent).await,
            Action::Talk => self.talk(intent, raw).await,
            Action::EndConversation => self.end_conversation().await,
            Action::Pickup => self.pickup(intent).await,
            Action::UseItem => self.use_item(intent, raw).await,
            Action::Examine => self.examine(intent, raw).await,
            Action::DiscoverItems => self.discover_items().await,
            Action::DiscoverNpcs => self.discover_npcs().await,
            Action::GiveItem => self.give_item(intent, raw).await,
            Action::RequestItem => self.request_item(intent, raw).await,
            Action::Attack => self.attack(intent).await,
            Action::Inventory => self.inventory().await,
            Action::Status => self.status().await,
            Action::EventInput => self.event_input(raw).await,
            Action::Equip => self.equip(intent).await,
            Action::Unequip => self.unequip(intent).await,
            Action::StageCrafting => self.stage_crafting(intent).await,
            Action::UnstageCrafting => self.unstage_crafting(intent).await,
            Action::Craft => self.craft(intent, raw).await,
            Action::Unrecognized => {
                self.ctx
                    .log(LogKind::System, "You're not sure how to do that.")
                    .await;
                Ok(Handled::done())
            }
        }
    }

    async fn event_input(&self, raw: &str) -> Result<Handled, HandlerError> {
        match EventEngine::new(self.ctx).handle_event_input(raw).await {
            ResolutionOutcome::Resolved(_) => Ok(Handled::concluded(true)),
            ResolutionOutcome::NoActiveEvent => Err(HandlerError::precondition(
                "Nothing is happening that calls for a response.",
            )),
            ResolutionOutcome::Busy
            | ResolutionOutcome::Continuing
            | ResolutionOutcome::Progressed
            | ResolutionOutcome::Failed => Ok(Handled::done()),
        }
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// Commit the energy cost of `action`.
    async fn spend(&self, action: Action) -> Result<(), HandlerError> {
        let cost = self.ctx.config.energy.cost(action);
        self.ctx.store.lock().await.spend_energy(cost)?;
        Ok(())
    }

    /// Log a narrative outcome and register the leads it mentions.
    async fn record_narrative(&self, outcome: &NarrativeOutcome, origin: &str) {
        let mut store = self.ctx.store.lock().await;
        store.push_log_entry(
            LogEntry::new(LogKind::Narration, outcome.narration.clone())
                .with_lore(outcome.lore_text.clone()),
        );
        let key = store.current_key();
        for hint in &outcome.new_leads {
            store.ledger_mut().add_lead(hint.clone(), origin, key.clone());
        }
    }
}

/// The `index`th target, or the named parameter.
fn target(intent: &ParsedIntent, index: usize, parameter: &str) -> Option<String> {
    intent
        .targets
        .get(index)
        .or_else(|| intent.parameters.get(parameter))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
