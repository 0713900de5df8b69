//! One configured encounter and its live boss
//!
//! An instance is either idle or alive. While alive it owns the boss handle,
//! the spawn origin and its expire/leash timers, and its mob is tracked by
//! all three contribution trackers. Every path out of alive (despawn, death,
//! expiry, entity loss, release) goes through the same teardown so a timer
//! can never outlive its boss.

use std::sync::Arc;

use bossfall_types::{Location, MobId};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, info, warn};

use super::definition::EncounterDefinition;
use super::error::SpawnFailure;
use super::status::EncounterStatus;
use super::timer::{TimerHandle, after_secs};
use crate::storage::{LiveStateSink, PersistedEncounterState};
use crate::tracker::{CategorySnapshots, Trackers};
use crate::world::{Announcement, Broadcaster, MobEngine, MobHandle};

/// Seconds between leash checks
pub const LEASH_CHECK_INTERVAL_SECS: i64 = 1;

/// Everything an instance touches outside itself during one operation
pub struct InstanceCtx<'a, W: ?Sized> {
    pub world: &'a mut W,
    pub trackers: &'a mut Trackers,
    pub sink: &'a dyn LiveStateSink,
    pub now: DateTime<Utc>,
}

/// Live fields, present exactly while the boss is alive
#[derive(Debug, Clone, PartialEq)]
pub struct AliveState {
    pub mob: MobHandle,
    pub origin: Location,
    pub spawned_at: DateTime<Utc>,
    /// `None` when the encounter never expires
    pub expires_at: Option<DateTime<Utc>>,
    expire_timer: TimerHandle,
    leash_timer: TimerHandle,
}

impl AliveState {
    fn new(
        mob: MobHandle,
        origin: Location,
        spawned_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        leash_radius: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut state = Self {
            mob,
            origin,
            spawned_at,
            expires_at,
            expire_timer: TimerHandle::NotStarted,
            leash_timer: TimerHandle::NotStarted,
        };
        state.arm_timers(now, leash_radius);
        state
    }

    fn arm_timers(&mut self, now: DateTime<Utc>, leash_radius: f64) {
        self.expire_timer = self.expires_at.map_or(TimerHandle::NotStarted, TimerHandle::once);
        self.leash_timer = if leash_radius > 0.0 {
            let period = TimeDelta::seconds(LEASH_CHECK_INTERVAL_SECS);
            TimerHandle::repeating(now + period, period)
        } else {
            TimerHandle::NotStarted
        };
    }

    fn cancel_timers(&mut self) {
        self.expire_timer.cancel();
        self.leash_timer.cancel();
    }

    pub fn timers_running(&self) -> bool {
        self.expire_timer.is_running() || self.leash_timer.is_running()
    }

    pub fn persisted(&self, encounter: &str) -> PersistedEncounterState {
        PersistedEncounterState {
            encounter: encounter.to_string(),
            mob: self.mob.identity,
            spawn_epoch: self.spawned_at.timestamp(),
            expire_epoch: self.expires_at.map(|t| t.timestamp()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Liveness {
    #[default]
    Idle,
    Alive(Box<AliveState>),
}

/// Something a timer poll changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceEvent {
    /// Lifetime ended; `removed` when the boss was cleared
    Expired { removed: bool },
    /// The boss vanished without dying through the engine
    EntityLost,
    /// The boss strayed past its leash and was returned to origin
    Leashed,
}

#[derive(Debug)]
pub struct EncounterInstance {
    definition: Arc<EncounterDefinition>,
    liveness: Liveness,
    next_spawn: Option<DateTime<Utc>>,
}

impl EncounterInstance {
    pub fn new(definition: Arc<EncounterDefinition>) -> Self {
        Self {
            definition,
            liveness: Liveness::Idle,
            next_spawn: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn definition(&self) -> &EncounterDefinition {
        &self.definition
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    pub fn alive(&self) -> Option<&AliveState> {
        match &self.liveness {
            Liveness::Alive(state) => Some(state),
            Liveness::Idle => None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive().is_some()
    }

    pub fn mob_identity(&self) -> Option<MobId> {
        self.alive().map(|a| a.mob.identity)
    }

    pub fn next_spawn(&self) -> Option<DateTime<Utc>> {
        self.next_spawn
    }

    pub fn calculate_next_spawn(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_spawn = self.definition.compiled_schedule().next_after(now);
        self.next_spawn
    }

    pub fn seconds_until_spawn(&self, now: DateTime<Utc>) -> Option<i64> {
        self.next_spawn.map(|next| (next - now).num_seconds())
    }

    pub fn should_spawn(&self, now: DateTime<Utc>) -> bool {
        !self.is_alive() && self.next_spawn.is_some_and(|next| now >= next)
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Spawn the boss, despawning any current one first.
    pub fn spawn<W>(&mut self, ctx: &mut InstanceCtx<'_, W>) -> Result<MobId, SpawnFailure>
    where
        W: MobEngine + Broadcaster + ?Sized,
    {
        if self.is_alive() {
            self.despawn(ctx);
        }

        let def = Arc::clone(&self.definition);
        let Some(location) = def.spawn_location() else {
            error!(encounter = %def.id, "Cannot spawn: no location configured");
            return Err(SpawnFailure::MissingLocation {
                encounter: def.id.clone(),
            });
        };
        if !ctx.world.is_world_loaded(&location.world) {
            error!(encounter = %def.id, world = %location.world, "Cannot spawn: world not loaded");
            return Err(SpawnFailure::WorldNotLoaded {
                encounter: def.id.clone(),
                world: location.world,
            });
        }
        if def.load_chunks {
            ctx.world.load_chunk(&location);
        }

        let handle = ctx.world.spawn_mob(&def.mob, &location).map_err(|source| {
            error!(encounter = %def.id, mob = %def.mob, error = %source, "Mob engine failed to spawn boss");
            SpawnFailure::Engine {
                encounter: def.id.clone(),
                source,
            }
        })?;

        let identity = handle.identity;
        let expires_at = (def.expire_secs > 0).then(|| after_secs(ctx.now, def.expire_secs));
        let alive = AliveState::new(handle, location, ctx.now, expires_at, def.leash_radius(), ctx.now);

        ctx.sink.persist_one(alive.persisted(&def.id));
        ctx.trackers.start_all(identity);
        self.liveness = Liveness::Alive(Box::new(alive));

        ctx.world.announce(Announcement::Spawned {
            encounter: def.id.clone(),
            mob: def.mob.clone(),
        });
        info!(encounter = %def.id, mob = %def.mob, %identity, "Boss spawned");
        Ok(identity)
    }

    /// Re-adopt a boss that survived a restart. Returns false (leaving the
    /// instance idle) when the state has expired or the mob is gone.
    pub fn restore<W>(&mut self, saved: &PersistedEncounterState, ctx: &mut InstanceCtx<'_, W>) -> bool
    where
        W: MobEngine + ?Sized,
    {
        let id = &self.definition.id;
        if self.is_alive() {
            warn!(encounter = %id, "Ignoring saved state for an instance that is already alive");
            return false;
        }
        if saved.is_expired_at(ctx.now.timestamp()) {
            info!(encounter = %id, "Saved boss expired while offline");
            return false;
        }
        let Some(handle) = ctx.world.find_mob(saved.mob) else {
            info!(encounter = %id, mob = %saved.mob, "Saved boss no longer exists");
            return false;
        };
        let Some(entity) = ctx.world.resolve_entity(&handle) else {
            info!(encounter = %id, mob = %saved.mob, "Saved boss is not resolvable");
            return false;
        };

        let spawned_at = DateTime::from_timestamp(saved.spawn_epoch, 0).unwrap_or(ctx.now);
        let expires_at = saved.expire_epoch.and_then(|epoch| DateTime::from_timestamp(epoch, 0));
        // Origin is wherever the boss stands now; the configured spot may have moved
        let alive = AliveState::new(
            handle,
            entity.location,
            spawned_at,
            expires_at,
            self.definition.leash_radius(),
            ctx.now,
        );

        ctx.trackers.start_all(saved.mob);
        self.liveness = Liveness::Alive(Box::new(alive));
        info!(encounter = %id, mob = %saved.mob, "Boss restored");
        true
    }

    /// Remove the boss from the world and tear down. Returns false if idle.
    pub fn despawn<W>(&mut self, ctx: &mut InstanceCtx<'_, W>) -> bool
    where
        W: MobEngine + ?Sized,
    {
        let Liveness::Alive(alive) = std::mem::take(&mut self.liveness) else {
            return false;
        };
        ctx.world.remove_entity(&alive.mob);
        info!(encounter = %self.definition.id, mob = %alive.mob.identity, "Boss despawned");
        self.teardown(*alive, ctx);
        true
    }

    /// Snapshot all three categories, then tear down. `None` if idle.
    pub fn on_death<W>(&mut self, ctx: &mut InstanceCtx<'_, W>) -> Option<CategorySnapshots>
    where
        W: ?Sized,
    {
        let Liveness::Alive(alive) = std::mem::take(&mut self.liveness) else {
            return None;
        };
        let snapshots = ctx.trackers.snapshots(alive.mob.identity);
        info!(encounter = %self.definition.id, mob = %alive.mob.identity, "Boss died");
        self.teardown(*alive, ctx);
        Some(snapshots)
    }

    /// Detach from the boss without removing it or its persisted row, so a
    /// later restore can re-adopt it.
    pub fn release<W>(&mut self, ctx: &mut InstanceCtx<'_, W>) -> Option<PersistedEncounterState>
    where
        W: ?Sized,
    {
        let Liveness::Alive(mut alive) = std::mem::take(&mut self.liveness) else {
            return None;
        };
        alive.cancel_timers();
        ctx.trackers.stop_all(alive.mob.identity);
        debug!(encounter = %self.definition.id, "Boss released");
        Some(alive.persisted(&self.definition.id))
    }

    fn teardown<W>(&mut self, mut alive: AliveState, ctx: &mut InstanceCtx<'_, W>)
    where
        W: ?Sized,
    {
        alive.cancel_timers();
        ctx.trackers.stop_all(alive.mob.identity);
        ctx.sink.remove(&self.definition.id);
    }

    /// Cancel timers but stay alive (scheduler stopped).
    pub fn suspend(&mut self) {
        if let Liveness::Alive(alive) = &mut self.liveness {
            alive.cancel_timers();
        }
    }

    /// Re-arm timers cancelled by [`suspend`](Self::suspend).
    pub fn resume(&mut self, now: DateTime<Utc>) {
        let radius = self.definition.leash_radius();
        if let Liveness::Alive(alive) = &mut self.liveness
            && !alive.timers_running()
        {
            alive.arm_timers(now, radius);
        }
    }

    // ─── Timers ─────────────────────────────────────────────────────────────

    /// Drive expire and leash timers, and notice a vanished boss.
    pub fn poll_timers<W>(&mut self, ctx: &mut InstanceCtx<'_, W>) -> Option<InstanceEvent>
    where
        W: MobEngine + ?Sized,
    {
        let (expired, leash_due, handle, origin) = {
            let Liveness::Alive(alive) = &mut self.liveness else {
                return None;
            };
            (
                alive.expire_timer.poll(ctx.now),
                alive.leash_timer.poll(ctx.now),
                alive.mob.clone(),
                alive.origin.clone(),
            )
        };

        let Some(entity) = ctx.world.resolve_entity(&handle) else {
            warn!(encounter = %self.definition.id, mob = %handle.identity, "Boss entity lost, cleaning up");
            if let Liveness::Alive(alive) = std::mem::take(&mut self.liveness) {
                self.teardown(*alive, ctx);
            }
            return Some(InstanceEvent::EntityLost);
        };

        if expired {
            if self.definition.clear_on_expire {
                info!(encounter = %self.definition.id, "Boss lifetime ended, clearing");
                self.despawn(ctx);
                return Some(InstanceEvent::Expired { removed: true });
            }
            info!(encounter = %self.definition.id, "Boss lifetime ended, leaving it in the world");
            if let Liveness::Alive(alive) = &mut self.liveness {
                alive.expires_at = None;
                alive.expire_timer = TimerHandle::NotStarted;
                ctx.sink.persist_one(alive.persisted(&self.definition.id));
            }
            return Some(InstanceEvent::Expired { removed: false });
        }

        if leash_due && self.pull_back(&handle, &origin, &entity.location, ctx) {
            return Some(InstanceEvent::Leashed);
        }
        None
    }

    fn pull_back<W>(&self, handle: &MobHandle, origin: &Location, current: &Location, ctx: &mut InstanceCtx<'_, W>) -> bool
    where
        W: MobEngine + ?Sized,
    {
        let radius = self.definition.leash_radius();
        if radius <= 0.0 || !ctx.world.is_world_loaded(&origin.world) {
            return false;
        }
        match current.distance_to(origin) {
            Some(distance) if distance <= radius => false,
            distance => {
                debug!(
                    encounter = %self.definition.id,
                    distance = ?distance,
                    radius,
                    "Boss left its leash, teleporting to origin"
                );
                ctx.world.teleport(handle, origin);
                true
            }
        }
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn persisted_state(&self) -> Option<PersistedEncounterState> {
        self.alive().map(|a| a.persisted(&self.definition.id))
    }

    pub fn status(&self, now: DateTime<Utc>) -> EncounterStatus {
        let alive = self.alive();
        let expires_at = alive.and_then(|a| a.expires_at);
        EncounterStatus {
            id: self.definition.id.clone(),
            mob: self.definition.mob.clone(),
            zone: self.definition.compiled_schedule().zone,
            alive: alive.is_some(),
            mob_identity: alive.map(|a| a.mob.identity),
            origin: alive.map(|a| a.origin.clone()),
            next_spawn: self.next_spawn,
            seconds_until_spawn: self.seconds_until_spawn(now),
            expires_at,
            seconds_until_expiry: expires_at.map(|t| (t - now).num_seconds()),
        }
    }
}
