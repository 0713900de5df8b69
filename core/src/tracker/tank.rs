use super::{ContributionLedger, ContributionTracker, RankingSnapshot};
use crate::world::{Actor, Damager, Participant, WorldEvent};
use bossfall_types::{ContributionCategory, MobId};
use tracing::debug;

/// Damage tracked bosses dealt to participants
#[derive(Debug, Default)]
pub struct TankTracker {
    ledger: ContributionLedger,
}

impl TankTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit the victim when the damage came from a tracked boss, directly
    /// or through its projectile, pet, explosive or cloud.
    pub fn record_hit(&mut self, source: &Damager, victim: &Participant, amount: f64) {
        let Some(mob) = source.responsible_mob() else {
            return;
        };
        if self.ledger.add(mob, victim, amount) {
            debug!(mob = %mob, player = %victim.name, amount, "Tank damage recorded");
        }
    }
}

impl ContributionTracker for TankTracker {
    fn category(&self) -> ContributionCategory {
        ContributionCategory::Tank
    }

    fn start_tracking(&mut self, mob: MobId) {
        self.ledger.start(mob);
    }

    fn stop_tracking(&mut self, mob: MobId) {
        self.ledger.stop(mob);
    }

    fn is_tracking(&self, mob: MobId) -> bool {
        self.ledger.is_tracking(mob)
    }

    fn handle_event(&mut self, event: &WorldEvent) {
        if let WorldEvent::DamageDealt {
            attacker,
            victim: Actor::Player(victim),
            amount,
        } = event
        {
            self.record_hit(attacker, victim, *amount);
        }
    }

    fn build_snapshot(&self, mob: MobId) -> RankingSnapshot {
        self.ledger.snapshot(ContributionCategory::Tank, mob)
    }

    fn clear_all(&mut self) {
        self.ledger.clear();
    }
}
