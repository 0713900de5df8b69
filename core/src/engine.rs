//! Encounter engine
//!
//! Binds the scheduler, the contribution trackers and the reward pipeline to
//! one world host. Everything runs on the caller's thread: the engine is
//! driven by [`tick`](EncounterEngine::tick) and
//! [`handle_event`](EncounterEngine::handle_event), and hands persistence off
//! to non-blocking sinks.

use bossfall_types::{MobId, ParticipantId};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::encounter::{
    EncounterDefinition, EncounterScheduler, EncounterStatus, EngineError, ExpireAction, InstanceCtx, RestoreReport,
    SpawnFailure,
};
use crate::reward::{
    PayoutReport, PendingRewardQueue, PendingSnapshot, PickupDecision, PickupGuard, RewardCtx, deliver_pending,
    distribute_rewards,
};
use crate::storage::{LiveStateSink, PendingRewardSink, PersistedEncounterState};
use crate::tracker::Trackers;
use crate::world::{Announcement, Channels, DroppedItemId, WorldEvent, WorldHost};

/// Runtime knobs resolved from the app config
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub default_zone: Tz,
    pub tick_interval: TimeDelta,
    /// Delay between a participant joining and their pending rewards arriving
    pub delivery_delay: TimeDelta,
    /// Pending-reward writes are coalesced over this window
    pub flush_debounce: TimeDelta,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_zone: Tz::UTC,
            tick_interval: TimeDelta::seconds(1),
            delivery_delay: TimeDelta::seconds(2),
            flush_debounce: TimeDelta::milliseconds(50),
        }
    }
}

/// Sinks the engine writes through
pub struct EngineSinks {
    pub live: Box<dyn LiveStateSink + Send>,
    pub pending: Box<dyn PendingRewardSink + Send>,
}

pub struct EncounterEngine<H> {
    host: H,
    scheduler: EncounterScheduler,
    trackers: Trackers,
    pending: PendingRewardQueue,
    guard: PickupGuard,
    sinks: EngineSinks,
    /// Participants due a pending-reward delivery, in join order
    deliveries: Vec<(DateTime<Utc>, ParticipantId)>,
    settings: EngineSettings,
}

impl<H: WorldHost> EncounterEngine<H> {
    pub fn new(
        host: H,
        definitions: Vec<EncounterDefinition>,
        pending: PendingSnapshot,
        sinks: EngineSinks,
        settings: EngineSettings,
    ) -> Self {
        Self {
            host,
            scheduler: EncounterScheduler::new(definitions),
            trackers: Trackers::new(),
            pending: PendingRewardQueue::from_snapshot(pending, settings.flush_debounce),
            guard: PickupGuard::new(),
            sinks,
            deliveries: Vec::new(),
            settings,
        }
    }

    /// Split borrow: the scheduler plus a context over everything else
    fn parts(&mut self, now: DateTime<Utc>) -> (&mut EncounterScheduler, InstanceCtx<'_, H>) {
        (
            &mut self.scheduler,
            InstanceCtx {
                world: &mut self.host,
                trackers: &mut self.trackers,
                sink: self.sinks.live.as_ref(),
                now,
            },
        )
    }

    /// Re-adopt saved bosses and start the scheduler.
    pub fn start(&mut self, saved: &[PersistedEncounterState], now: DateTime<Utc>) -> RestoreReport {
        let (scheduler, mut ctx) = self.parts(now);
        let report = scheduler.restore_all(saved, &mut ctx);
        scheduler.start(&mut ctx);
        info!(
            encounters = self.scheduler.len(),
            restored = report.restored,
            pending_participants = self.pending.participant_count(),
            "Encounter engine started"
        );
        report
    }

    pub fn tick(&mut self, now: DateTime<Utc>) {
        let (scheduler, mut ctx) = self.parts(now);
        scheduler.tick(&mut ctx);

        self.run_deliveries(now);

        for (item, action) in self.guard.take_expired(now) {
            match action {
                ExpireAction::Public => debug!(?item, "Drop protection ended"),
                ExpireAction::Despawn => {
                    debug!(?item, "Drop protection ended, removing item");
                    self.host.remove_dropped_item(item);
                }
            }
        }

        self.flush_if_due(now);
    }

    /// Hand the pending queue to its sink once the debounce window closed
    pub fn flush_if_due(&mut self, now: DateTime<Utc>) -> bool {
        self.pending.flush_if_due(now, self.sinks.pending.as_ref())
    }

    // ─── Events ─────────────────────────────────────────────────────────────

    /// Feed one world event. Returns the payout report when a boss died.
    pub fn handle_event(&mut self, event: &WorldEvent, now: DateTime<Utc>) -> Option<PayoutReport> {
        match event {
            WorldEvent::MobDied { mob, killer } => {
                self.on_mob_death(*mob, killer.as_ref().map(|k| k.name.clone()), now)
            }
            WorldEvent::ParticipantJoined { participant } => {
                if self.pending.has_pending(participant.id) {
                    self.deliveries
                        .push((now + self.settings.delivery_delay, participant.id));
                }
                None
            }
            other => {
                self.trackers.handle_event(other);
                None
            }
        }
    }

    fn on_mob_death(&mut self, mob: MobId, killer: Option<String>, now: DateTime<Utc>) -> Option<PayoutReport> {
        let id = self.scheduler.find_by_mob(mob)?.to_string();
        let (scheduler, mut ctx) = self.parts(now);
        let instance = scheduler.instance_mut(&id)?;
        let snapshots = instance.on_death(&mut ctx)?;
        let definition = instance.definition().clone();

        let broadcast = &definition.broadcast;
        let channels = Channels {
            chat: broadcast.death_chat,
            title: broadcast.death_title,
        };
        if channels.any() {
            self.host.announce(Announcement::Died {
                encounter: definition.id.clone(),
                mob: definition.mob.clone(),
                killer,
                channels,
            });
        }

        let mut reward_ctx = RewardCtx {
            host: &mut self.host,
            pending: &mut self.pending,
            guard: &mut self.guard,
            now,
        };
        Some(distribute_rewards(&definition, &snapshots, &mut reward_ctx))
    }

    fn run_deliveries(&mut self, now: DateTime<Utc>) {
        if self.deliveries.is_empty() {
            return;
        }
        let (due, waiting): (Vec<_>, Vec<_>) = self.deliveries.drain(..).partition(|(at, _)| *at <= now);
        self.deliveries = waiting;

        for (_, participant) in due {
            // Left again before the delay elapsed; try on the next join
            if !self.host.is_online(participant) {
                continue;
            }
            let rewards = self.pending.claim(participant, now);
            if rewards.is_empty() {
                continue;
            }
            let delivered = deliver_pending(participant, rewards, &mut self.host);
            info!(%participant, delivered, "Pending rewards delivered");
        }
    }

    // ─── Operator Commands ──────────────────────────────────────────────────

    pub fn force_spawn(&mut self, id: &str, now: DateTime<Utc>) -> Result<MobId, EngineError> {
        let (scheduler, mut ctx) = self.parts(now);
        scheduler.force_spawn(id, &mut ctx)
    }

    pub fn force_spawn_all(&mut self, now: DateTime<Utc>) -> Vec<(String, Result<MobId, SpawnFailure>)> {
        let (scheduler, mut ctx) = self.parts(now);
        scheduler.force_spawn_all(&mut ctx)
    }

    pub fn despawn(&mut self, id: &str, now: DateTime<Utc>) -> Result<bool, EngineError> {
        let (scheduler, mut ctx) = self.parts(now);
        scheduler.despawn(id, &mut ctx)
    }

    pub fn despawn_all(&mut self, now: DateTime<Utc>) -> usize {
        let (scheduler, mut ctx) = self.parts(now);
        scheduler.despawn_all(&mut ctx)
    }

    /// Swap in new definitions. Live bosses of encounters that still exist
    /// are re-adopted; bosses of removed encounters are cleared.
    pub fn reload(&mut self, definitions: Vec<EncounterDefinition>, now: DateTime<Utc>) -> RestoreReport {
        let (scheduler, mut ctx) = self.parts(now);
        let released = scheduler.release_all(&mut ctx);
        self.trackers.clear_all();

        for state in &released {
            if definitions.iter().any(|d| d.id == state.encounter) {
                continue;
            }
            if let Some(handle) = self.host.find_mob(state.mob) {
                info!(encounter = %state.encounter, "Encounter removed from definitions, clearing its boss");
                self.host.remove_entity(&handle);
            }
        }

        self.scheduler = EncounterScheduler::new(definitions);
        let (scheduler, mut ctx) = self.parts(now);
        let report = scheduler.restore_all(&released, &mut ctx);
        scheduler.start(&mut ctx);
        info!(
            encounters = self.scheduler.len(),
            restored = report.restored,
            "Encounter definitions reloaded"
        );
        report
    }

    /// Detach every boss, then push the final live and pending snapshots to
    /// the sinks. Returns the released live state.
    pub fn shutdown(&mut self, now: DateTime<Utc>) -> Vec<PersistedEncounterState> {
        let (scheduler, mut ctx) = self.parts(now);
        let released = scheduler.release_all(&mut ctx);
        self.sinks.live.persist_all(released.clone());
        self.trackers.clear_all();
        self.guard.clear();
        self.deliveries.clear();
        self.flush_pending();
        info!(released = released.len(), "Encounter engine shut down");
        released
    }

    /// Write the pending queue now, ignoring the debounce window
    pub fn flush_pending(&mut self) {
        self.pending.flush_now(self.sinks.pending.as_ref());
    }

    pub fn can_pickup(&mut self, item: DroppedItemId, picker: ParticipantId, now: DateTime<Utc>) -> PickupDecision {
        self.guard.can_pickup(item, picker, now)
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn statuses(&self, now: DateTime<Utc>) -> Vec<EncounterStatus> {
        self.scheduler.statuses(now)
    }

    pub fn status(&self, id: &str, now: DateTime<Utc>) -> Option<EncounterStatus> {
        self.scheduler.status(id, now)
    }

    pub fn live_states(&self) -> Vec<PersistedEncounterState> {
        self.scheduler.live_states()
    }

    pub fn pending_snapshot(&self) -> PendingSnapshot {
        self.pending.snapshot()
    }

    pub fn pending_count(&self, participant: ParticipantId) -> usize {
        self.pending.pending_count(participant)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> &EncounterScheduler {
        &self.scheduler
    }

    pub fn trackers(&self) -> &Trackers {
        &self.trackers
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

#[cfg(test)]
mod tests;
