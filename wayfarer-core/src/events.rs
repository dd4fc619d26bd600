//! The event engine.
//!
//! An event is either idle or active. Escalation from an ordinary action
//! is decided by the content service, then the generated effects are
//! applied and the event either folds straight into the chronicle or stays
//! active until the player's input resolves it:
//!
//! ```text
//! idle -> active -> (progressed)* -> resolved -> idle
//! ```
//!
//! All generation for events runs under the scheduler's event gate, so at
//! most one event, consequence or resolution is in flight.

use crate::commands::Action;
use crate::content::{EventRequest, Intensity};
use crate::context::GameContext;
use crate::director::Subsystem;
use crate::discovery::{link_entity_to_lead, LinkCandidate};
use crate::effects::{apply_event_effects, EventEffects};
use crate::world::{
    ActiveEvent, EntityRef, EventId, EventOrigin, LocationKey, LogEntry, LogKind, NpcId, Rarity,
};
use lazy_static::lazy_static;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

lazy_static! {
    /// Concepts the service uses to say that nothing should happen.
    static ref NOTHING_HAPPENS: HashSet<&'static str> = [
        "nothing",
        "nothing happens",
        "none",
        "no event",
        "quiet",
        "calm",
    ]
    .into_iter()
    .collect();
}

fn is_nothing(concept: &str, effects: &EventEffects) -> bool {
    let concept = concept.trim().trim_end_matches('.').to_lowercase();
    (NOTHING_HAPPENS.contains(concept.as_str()) || concept.is_empty()) && effects.is_empty()
}

/// What produced a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Action(Action),
    GameStart,
    EventContinuation,
}

/// The context in which an event may be triggered.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerContext {
    pub source: TriggerSource,
    pub subject_rarity: Option<Rarity>,
    pub location: LocationKey,
}

impl TriggerContext {
    pub fn action(action: Action, rarity: Option<Rarity>, location: LocationKey) -> Self {
        Self {
            source: TriggerSource::Action(action),
            subject_rarity: rarity,
            location,
        }
    }

    pub fn game_start(location: LocationKey) -> Self {
        Self {
            source: TriggerSource::GameStart,
            subject_rarity: None,
            location,
        }
    }

    pub fn continuation(location: LocationKey) -> Self {
        Self {
            source: TriggerSource::EventContinuation,
            subject_rarity: None,
            location,
        }
    }

    /// Short label handed to the content service.
    pub fn slug(&self) -> String {
        let source = match self.source {
            TriggerSource::Action(action) => action.slug(),
            TriggerSource::GameStart => "game_start",
            TriggerSource::EventContinuation => "event_continuation",
        };
        match self.subject_rarity {
            Some(rarity) => format!("{source}:{rarity}@{}", self.location),
            None => format!("{source}@{}", self.location),
        }
    }

    pub fn is_system(&self) -> bool {
        !matches!(self.source, TriggerSource::Action(_))
    }

    /// Only high-rarity subjects and system triggers may escalate.
    pub fn is_eligible(&self) -> bool {
        self.is_system() || self.subject_rarity.is_some_and(|r| r.is_high())
    }
}

/// Result of an escalation attempt or a player-initiated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Ineligible,
    EventActive,
    Busy,
    Declined,
    NothingHappened,
    /// The event started and awaits resolution.
    Started(EventId),
    /// The event ran its course and was folded into the chronicle.
    Concluded(EventId),
    Failed,
}

/// Result of feeding player input to the active event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    NoActiveEvent,
    Busy,
    Continuing,
    Progressed,
    Resolved(EventId),
    Failed,
}

pub struct EventEngine<'a> {
    ctx: &'a GameContext,
}

impl<'a> EventEngine<'a> {
    pub fn new(ctx: &'a GameContext) -> Self {
        Self { ctx }
    }

    /// Maybe escalate an ordinary trigger into an event.
    #[instrument(skip(self, trigger), fields(trigger = %trigger.slug()))]
    pub async fn attempt_to_trigger_unexpected_event(
        &self,
        trigger: &TriggerContext,
    ) -> TriggerOutcome {
        if !trigger.is_eligible() {
            return TriggerOutcome::Ineligible;
        }
        if self.ctx.store.lock().await.has_active_event() {
            return TriggerOutcome::EventActive;
        }
        let Some(_permit) = self.ctx.scheduler.try_events() else {
            debug!("event generation already in flight");
            return TriggerOutcome::Busy;
        };

        let snapshot = self.ctx.snapshot().await;
        let decision = match self
            .ctx
            .content
            .decide_event_trigger(&trigger.slug(), &snapshot)
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "event trigger decision failed");
                self.ctx
                    .log(LogKind::Error, format!("The world falters: {e}"))
                    .await;
                return TriggerOutcome::Failed;
            }
        };
        if !decision.should_trigger {
            self.ctx
                .log(LogKind::System, "For a moment the air stills, then the moment passes.")
                .await;
            return TriggerOutcome::Declined;
        }

        let concept = decision.concept.unwrap_or_default();
        let bias = self.ctx.store.lock().await.bias(Subsystem::Events);
        let request = EventRequest {
            concept: concept.clone(),
            intensity: decision.intensity.unwrap_or_default(),
            snapshot,
            bias,
        };
        let effects = match self.ctx.content.generate_event_effects(request).await {
            Ok(effects) => effects,
            Err(e) => {
                warn!(error = %e, concept = %concept, "event generation failed");
                self.ctx
                    .log(LogKind::Error, format!("Something stirs, but fades: {e}"))
                    .await;
                return TriggerOutcome::Failed;
            }
        };
        if is_nothing(&concept, &effects) {
            self.ctx
                .log(LogKind::System, "You sense something, but nothing happens.")
                .await;
            return TriggerOutcome::NothingHappened;
        }

        let origin = EventOrigin::Unexpected {
            trigger: trigger.slug(),
        };
        match self.start(origin, effects).await {
            Some((id, true)) => TriggerOutcome::Started(id),
            Some((id, false)) => {
                self.conclude(None).await;
                TriggerOutcome::Concluded(id)
            }
            None => TriggerOutcome::EventActive,
        }
    }

    /// Generate the consequences of a deliberate escalation, such as an
    /// attack on `target`.
    #[instrument(skip(self))]
    pub async fn handle_player_initiated_significant_action(
        &self,
        target: NpcId,
        concept: &str,
        intensity: Intensity,
    ) -> TriggerOutcome {
        if self.ctx.store.lock().await.has_active_event() {
            return TriggerOutcome::EventActive;
        }
        let Some(_permit) = self.ctx.scheduler.try_events() else {
            return TriggerOutcome::Busy;
        };

        let (snapshot, bias) = {
            let store = self.ctx.store.lock().await;
            (
                store.context_snapshot(self.ctx.config.recent_log),
                store.bias(Subsystem::Events),
            )
        };
        let request = EventRequest {
            concept: concept.to_string(),
            intensity,
            snapshot,
            bias,
        };
        let effects = match self.ctx.content.generate_event_effects(request).await {
            Ok(effects) => effects,
            Err(e) => {
                warn!(error = %e, "consequence generation failed");
                self.ctx
                    .log(LogKind::Error, format!("The moment slips away: {e}"))
                    .await;
                return TriggerOutcome::Failed;
            }
        };

        let origin = EventOrigin::PlayerInitiated {
            target: Some(target),
        };
        let Some((id, requires_resolution)) = self.start(origin, effects).await else {
            return TriggerOutcome::EventActive;
        };

        let finished = {
            let store = self.ctx.store.lock().await;
            let target_down = store.npc(target).map_or(true, |n| n.defeated);
            target_down || store.character().is_defeated() || !requires_resolution
        };
        if finished {
            self.conclude(None).await;
            TriggerOutcome::Concluded(id)
        } else {
            TriggerOutcome::Started(id)
        }
    }

    /// Judge player input against the active event.
    #[instrument(skip(self))]
    pub async fn handle_event_input(&self, input: &str) -> ResolutionOutcome {
        let Some(_permit) = self.ctx.scheduler.try_events() else {
            self.ctx
                .log(LogKind::System, "The situation is still unfolding. Wait a moment.")
                .await;
            return ResolutionOutcome::Busy;
        };

        let (event, snapshot) = {
            let store = self.ctx.store.lock().await;
            let Some(event) = store.active_event().cloned() else {
                return ResolutionOutcome::NoActiveEvent;
            };
            (event, store.context_snapshot(self.ctx.config.recent_log))
        };

        let check = match self
            .ctx
            .content
            .check_event_resolution(&event, input, &snapshot)
            .await
        {
            Ok(check) => check,
            Err(e) => {
                warn!(error = %e, event = %event.title, "resolution check failed");
                self.ctx
                    .log(LogKind::Error, format!("The outcome is unclear: {e}"))
                    .await;
                return ResolutionOutcome::Failed;
            }
        };

        if check.resolved {
            self.ctx
                .log(LogKind::Narration, check.resolution_narration.clone())
                .await;
            for item in &check.items_awarded {
                link_entity_to_lead(self.ctx.content(), &self.ctx.store, &LinkCandidate::item(item))
                    .await;
            }
            {
                let mut store = self.ctx.store.lock().await;
                for item in check.items_awarded {
                    store.push_log(LogKind::System, format!("You receive {}.", item.name));
                    store.add_to_inventory(item);
                }
                if let Some(update) = &check.disposition_update {
                    match store.find_npc_by_name(&update.npc).map(|n| n.id) {
                        Some(id) => {
                            if let Err(e) = store.set_npc_disposition(id, &update.disposition) {
                                warn!(error = %e, npc = %update.npc, "could not apply disposition update");
                            }
                        }
                        None => debug!(npc = %update.npc, "disposition update for absent NPC"),
                    }
                }
            }
            self.conclude(Some(&check.resolution_narration)).await;
            info!(event = %event.title, "event resolved");
            return ResolutionOutcome::Resolved(event.id);
        }

        if check.progressed {
            let narration = check
                .next_stage_narration
                .clone()
                .unwrap_or_else(|| check.resolution_narration.clone());
            {
                let mut store = self.ctx.store.lock().await;
                store.push_log(LogKind::Narration, check.resolution_narration.clone());
                if let Err(e) = store.progress_event(&narration, check.next_visual_hint.clone()) {
                    warn!(error = %e, "event vanished while progressing");
                    return ResolutionOutcome::Failed;
                }
                if check.next_stage_narration.is_some() {
                    store.push_log(LogKind::GameEvent, narration);
                }
            }
            if let Some(hint) = &check.next_visual_hint {
                self.refresh_image(event.id, hint).await;
            }
            return ResolutionOutcome::Progressed;
        }

        self.ctx
            .log(LogKind::Narration, check.resolution_narration)
            .await;
        ResolutionOutcome::Continuing
    }

    /// Activate an event, log it, illustrate it and apply its effects.
    /// Returns the event id and whether it awaits resolution, or `None` if
    /// another event is already active.
    async fn start(&self, origin: EventOrigin, effects: EventEffects) -> Option<(EventId, bool)> {
        let event = ActiveEvent::new(origin, effects.clone());
        let id = event.id;
        let requires_resolution = event.requires_resolution;
        {
            let mut store = self.ctx.store.lock().await;
            if store.begin_event(event).is_err() {
                return None;
            }
            store.push_log(LogKind::GameEvent, effects.title.clone());
            if !effects.narration.is_empty() {
                store.push_log(LogKind::Narration, effects.narration.clone());
            }
            if let Some(combat) = &effects.combat_narration {
                store.push_log(LogKind::Combat, combat.clone());
            }
        }
        info!(event = %effects.title, requires_resolution, "event started");

        if let Some(hint) = &effects.visual_hint {
            self.refresh_image(id, hint).await;
        }
        let applied = apply_event_effects(self.ctx.content(), &self.ctx.store, &effects).await;
        for name in &applied.items_lost {
            self.ctx
                .log(LogKind::System, format!("You lose {name}."))
                .await;
        }
        for name in &applied.items_gained {
            self.ctx
                .log(LogKind::System, format!("You gain {name}."))
                .await;
        }
        if applied.player_defeated {
            self.ctx
                .log_entry(LogEntry::new(LogKind::Combat, "You collapse, defeated."))
                .await;
        }
        self.ctx.store.lock().await.mark_event_time();
        Some((id, requires_resolution))
    }

    /// Fold the active event into the chronicle and clear it.
    async fn conclude(&self, resolution: Option<&str>) {
        let mut store = self.ctx.store.lock().await;
        let Some(event) = store.active_event().cloned() else {
            return;
        };
        let summary = event.effects.plot_point.clone().unwrap_or_else(|| {
            let ending = resolution.unwrap_or(&event.narration);
            if ending.is_empty() {
                event.title.clone()
            } else {
                format!("{}: {}", event.title, ending)
            }
        });
        let mut involved = vec![EntityRef::Location(store.current_key())];
        if let EventOrigin::PlayerInitiated { target: Some(npc) } = &event.origin {
            involved.push(EntityRef::Npc(*npc));
        }
        involved.extend(store.event_npcs().iter().map(|n| EntityRef::Npc(n.id)));
        store.append_plot_point(summary, involved);
        if store.clear_event().is_ok() {
            store.push_log(LogKind::System, format!("{} has ended.", event.title));
        }
    }

    /// Request an illustration for `event`, best-effort.
    async fn refresh_image(&self, event: EventId, hint: &str) {
        match self
            .ctx
            .content
            .generate_image(hint, &self.ctx.config.image_style)
            .await
        {
            Ok(Some(image)) => {
                let mut store = self.ctx.store.lock().await;
                if store.set_event_image(event, image).is_err() {
                    debug!("image arrived after its event ended");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "image generation failed"),
        }
    }
}
