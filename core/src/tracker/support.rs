use super::{ContributionLedger, ContributionTracker, RankingSnapshot};
use crate::status_effect::{StatusEffect, TICKS_PER_SECOND};
use crate::world::{Actor, EffectAction, Participant, WorldEvent};
use bossfall_types::{ContributionCategory, MobId};
use hashbrown::HashMap;
use tracing::debug;

/// Oldest splash/cloud attribution (in game ticks) an effect event may use
pub const ATTRIBUTION_WINDOW_TICKS: u64 = 5;

/// Potency-weighted score of one harmful effect application
pub fn support_score(effect: StatusEffect, amplifier: u32, duration_ticks: u32) -> f64 {
    let potency = f64::from(amplifier) + 1.0;
    if effect.is_instant() {
        potency * 10.0
    } else {
        potency * (f64::from(duration_ticks) / TICKS_PER_SECOND)
    }
}

/// Who last threw something at a mob, and when
#[derive(Debug, Clone)]
struct Attribution {
    participant: Participant,
    tick: u64,
}

/// Harmful effects landed on tracked bosses.
///
/// Effect events do not say who caused them, so splash and cloud events
/// first record the thrower against every tracked mob they touch. An effect
/// event is credited to that thrower only if the record is at most
/// [`ATTRIBUTION_WINDOW_TICKS`] old; stale records are evicted on lookup.
#[derive(Debug, Default)]
pub struct SupportTracker {
    ledger: ContributionLedger,
    attribution: HashMap<MobId, Attribution>,
}

impl SupportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_area_effect(&mut self, source: &Actor, affected: &[Actor], tick: u64) {
        let Some(thrower) = source.as_player() else {
            return;
        };
        for mob in affected.iter().filter_map(Actor::as_mob) {
            if self.ledger.is_tracking(mob) {
                self.attribution.insert(
                    mob,
                    Attribution {
                        participant: thrower.clone(),
                        tick,
                    },
                );
            }
        }
    }

    /// Score an effect applied to a tracked mob. Returns the credited score.
    pub fn record_effect(
        &mut self,
        target: MobId,
        effect: StatusEffect,
        amplifier: u32,
        duration_ticks: u32,
        action: EffectAction,
        tick: u64,
    ) -> Option<f64> {
        if !self.ledger.is_tracking(target) {
            return None;
        }
        if !matches!(action, EffectAction::Added | EffectAction::Changed) || !effect.is_harmful() {
            return None;
        }

        let entry = self.attribution.get(&target)?;
        if tick.saturating_sub(entry.tick) > ATTRIBUTION_WINDOW_TICKS {
            self.attribution.remove(&target);
            return None;
        }
        let participant = entry.participant.clone();

        let score = support_score(effect, amplifier, duration_ticks);
        self.ledger.add(target, &participant, score);
        debug!(
            mob = %target,
            player = %participant.name,
            effect = effect.name(),
            score,
            "Support recorded"
        );
        Some(score)
    }
}

impl ContributionTracker for SupportTracker {
    fn category(&self) -> ContributionCategory {
        ContributionCategory::Support
    }

    fn start_tracking(&mut self, mob: MobId) {
        self.ledger.start(mob);
        self.attribution.remove(&mob);
    }

    fn stop_tracking(&mut self, mob: MobId) {
        self.ledger.stop(mob);
        self.attribution.remove(&mob);
    }

    fn is_tracking(&self, mob: MobId) -> bool {
        self.ledger.is_tracking(mob)
    }

    fn handle_event(&mut self, event: &WorldEvent) {
        match event {
            WorldEvent::AreaEffectApplied {
                source,
                affected,
                tick,
                ..
            } => self.record_area_effect(source, affected, *tick),
            WorldEvent::EffectApplied {
                target: Actor::Mob(mob),
                effect,
                amplifier,
                duration_ticks,
                action,
                tick,
            } => {
                self.record_effect(*mob, *effect, *amplifier, *duration_ticks, *action, *tick);
            }
            _ => {}
        }
    }

    fn build_snapshot(&self, mob: MobId) -> RankingSnapshot {
        self.ledger.snapshot(ContributionCategory::Support, mob)
    }

    fn clear_all(&mut self) {
        self.ledger.clear();
        self.attribution.clear();
    }
}
