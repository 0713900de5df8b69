//! Encounter scheduler
//!
//! Owns every configured instance and drives them from a single tick:
//! instance timers, pre-spawn countdowns and scheduled spawns. Ticks are
//! ignored while the scheduler is stopped.

use std::collections::BTreeMap;
use std::sync::Arc;

use bossfall_types::MobId;
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use tracing::{info, warn};

use super::definition::EncounterDefinition;
use super::error::{EngineError, SpawnFailure};
use super::instance::{EncounterInstance, InstanceCtx};
use super::status::EncounterStatus;
use super::warning::SpawnWarning;
use crate::storage::PersistedEncounterState;
use crate::world::{Broadcaster, MobEngine};

/// Outcome of re-adopting saved live state
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub discarded: usize,
}

#[derive(Debug, Default)]
pub struct EncounterScheduler {
    instances: BTreeMap<String, EncounterInstance>,
    warnings: HashMap<String, SpawnWarning>,
    running: bool,
}

impl EncounterScheduler {
    pub fn new(definitions: Vec<EncounterDefinition>) -> Self {
        let mut instances = BTreeMap::new();
        for definition in definitions {
            if instances.contains_key(&definition.id) {
                warn!(encounter = %definition.id, "Duplicate encounter id, keeping the first");
                continue;
            }
            instances.insert(definition.id.clone(), EncounterInstance::new(Arc::new(definition)));
        }
        Self {
            instances,
            warnings: HashMap::new(),
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    pub fn instance(&self, id: &str) -> Option<&EncounterInstance> {
        self.instances.get(id)
    }

    pub fn instance_mut(&mut self, id: &str) -> Option<&mut EncounterInstance> {
        self.instances.get_mut(id)
    }

    /// Encounter whose live boss has this identity
    pub fn find_by_mob(&self, mob: MobId) -> Option<&str> {
        self.instances
            .values()
            .find(|i| i.mob_identity() == Some(mob))
            .map(EncounterInstance::id)
    }

    // ─── Start / Stop ───────────────────────────────────────────────────────

    /// (Re)start: compute next spawns and re-arm timers of live bosses.
    pub fn start<W>(&mut self, ctx: &mut InstanceCtx<'_, W>)
    where
        W: Broadcaster + ?Sized,
    {
        self.stop(ctx);
        for instance in self.instances.values_mut() {
            instance.calculate_next_spawn(ctx.now);
            instance.resume(ctx.now);
        }
        self.running = true;
        info!(encounters = self.instances.len(), "Encounter scheduler started");
    }

    /// Stop countdowns and instance timers. Live bosses stay alive.
    pub fn stop<W>(&mut self, ctx: &mut InstanceCtx<'_, W>)
    where
        W: Broadcaster + ?Sized,
    {
        for (_, mut warning) in self.warnings.drain() {
            warning.stop(ctx.world);
        }
        for instance in self.instances.values_mut() {
            instance.suspend();
        }
        if self.running {
            info!("Encounter scheduler stopped");
        }
        self.running = false;
    }

    // ─── Tick ───────────────────────────────────────────────────────────────

    pub fn tick<W>(&mut self, ctx: &mut InstanceCtx<'_, W>)
    where
        W: MobEngine + Broadcaster + ?Sized,
    {
        if !self.running {
            return;
        }
        let now = ctx.now;

        for (id, instance) in self.instances.iter_mut() {
            instance.poll_timers(ctx);

            if instance.is_alive() {
                if let Some(mut warning) = self.warnings.remove(id) {
                    warning.stop(ctx.world);
                }
                // A scheduled time that passes while the boss lives is skipped
                if instance.next_spawn().is_some_and(|next| now >= next) {
                    instance.calculate_next_spawn(now);
                }
                continue;
            }

            let Some(next) = instance.next_spawn() else {
                continue;
            };

            let until = (next - now).num_seconds();
            let window = instance.definition().broadcast.warning_window_secs();
            if until > 0 && until <= window && !self.warnings.contains_key(id) {
                let def = instance.definition();
                self.warnings
                    .insert(id.clone(), SpawnWarning::start(&def.id, &def.mob, next, now));
            }
            if let Some(warning) = self.warnings.get_mut(id) {
                warning.tick(&instance.definition().broadcast, now, ctx.world);
                if warning.is_finished() {
                    self.warnings.remove(id);
                }
            }

            if instance.should_spawn(now) {
                if let Some(mut warning) = self.warnings.remove(id) {
                    warning.stop(ctx.world);
                }
                // Failures are logged by the instance; the next slot still applies
                let _ = instance.spawn(ctx);
                instance.calculate_next_spawn(now);
            }
        }
    }

    // ─── Operator Commands ──────────────────────────────────────────────────

    pub fn force_spawn<W>(&mut self, id: &str, ctx: &mut InstanceCtx<'_, W>) -> Result<MobId, EngineError>
    where
        W: MobEngine + Broadcaster + ?Sized,
    {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownEncounter(id.to_string()))?;
        if let Some(mut warning) = self.warnings.remove(id) {
            warning.stop(ctx.world);
        }
        Ok(instance.spawn(ctx)?)
    }

    /// Spawn every encounter, returning each outcome by id
    pub fn force_spawn_all<W>(&mut self, ctx: &mut InstanceCtx<'_, W>) -> Vec<(String, Result<MobId, SpawnFailure>)>
    where
        W: MobEngine + Broadcaster + ?Sized,
    {
        for (_, mut warning) in self.warnings.drain() {
            warning.stop(ctx.world);
        }
        self.instances
            .iter_mut()
            .map(|(id, instance)| (id.clone(), instance.spawn(ctx)))
            .collect()
    }

    /// Returns whether a live boss was removed
    pub fn despawn<W>(&mut self, id: &str, ctx: &mut InstanceCtx<'_, W>) -> Result<bool, EngineError>
    where
        W: MobEngine + ?Sized,
    {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownEncounter(id.to_string()))?;
        Ok(instance.despawn(ctx))
    }

    pub fn despawn_all<W>(&mut self, ctx: &mut InstanceCtx<'_, W>) -> usize
    where
        W: MobEngine + ?Sized,
    {
        let mut removed = 0;
        for instance in self.instances.values_mut() {
            if instance.despawn(ctx) {
                removed += 1;
            }
        }
        removed
    }

    /// Detach every live boss, returning what a restore needs to re-adopt them
    pub fn release_all<W>(&mut self, ctx: &mut InstanceCtx<'_, W>) -> Vec<PersistedEncounterState>
    where
        W: Broadcaster + ?Sized,
    {
        self.stop(ctx);
        self.instances
            .values_mut()
            .filter_map(|instance| instance.release(ctx))
            .collect()
    }

    /// Re-adopt saved bosses, then rewrite the live store with the survivors.
    pub fn restore_all<W>(&mut self, saved: &[PersistedEncounterState], ctx: &mut InstanceCtx<'_, W>) -> RestoreReport
    where
        W: MobEngine + ?Sized,
    {
        let mut report = RestoreReport::default();
        for state in saved {
            let restored = match self.instances.get_mut(&state.encounter) {
                Some(instance) => instance.restore(state, ctx),
                None => {
                    warn!(encounter = %state.encounter, "Saved state for an unknown encounter, discarding");
                    false
                }
            };
            if restored {
                report.restored += 1;
            } else {
                report.discarded += 1;
            }
        }
        ctx.sink.persist_all(self.live_states());
        if !saved.is_empty() {
            info!(restored = report.restored, discarded = report.discarded, "Restored saved encounters");
        }
        report
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn live_states(&self) -> Vec<PersistedEncounterState> {
        self.instances
            .values()
            .filter_map(EncounterInstance::persisted_state)
            .collect()
    }

    pub fn statuses(&self, now: DateTime<Utc>) -> Vec<EncounterStatus> {
        self.instances.values().map(|i| i.status(now)).collect()
    }

    pub fn status(&self, id: &str, now: DateTime<Utc>) -> Option<EncounterStatus> {
        self.instances.get(id).map(|i| i.status(now))
    }

    pub fn has_active_warning(&self, id: &str) -> bool {
        self.warnings.contains_key(id)
    }
}
