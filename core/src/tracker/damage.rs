use super::{ContributionLedger, ContributionTracker, RankingSnapshot};
use crate::world::{Actor, Damager, WorldEvent};
use bossfall_types::{ContributionCategory, MobId, ParticipantId};
use hashbrown::HashMap;
use tracing::debug;

/// Damage dealt to tracked bosses, plus the participant who hit last
#[derive(Debug, Default)]
pub struct DamageTracker {
    ledger: ContributionLedger,
    last_hit: HashMap<MobId, ParticipantId>,
}

impl DamageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit damage to the participant behind `attacker`, unwrapping one
    /// level of projectile, tamed creature, explosive or cloud.
    pub fn record_damage(&mut self, victim: MobId, attacker: &Damager, amount: f64) {
        if !self.ledger.is_tracking(victim) {
            return;
        }
        let Some(player) = attacker.responsible_player() else {
            return;
        };
        self.last_hit.insert(victim, player.id);
        if self.ledger.add(victim, player, amount) {
            debug!(mob = %victim, player = %player.name, amount, "Damage recorded");
        }
    }

    pub fn last_hit(&self, mob: MobId) -> Option<ParticipantId> {
        self.last_hit.get(&mob).copied()
    }
}

impl ContributionTracker for DamageTracker {
    fn category(&self) -> ContributionCategory {
        ContributionCategory::Damage
    }

    fn start_tracking(&mut self, mob: MobId) {
        self.ledger.start(mob);
        self.last_hit.remove(&mob);
    }

    fn stop_tracking(&mut self, mob: MobId) {
        self.ledger.stop(mob);
        self.last_hit.remove(&mob);
    }

    fn is_tracking(&self, mob: MobId) -> bool {
        self.ledger.is_tracking(mob)
    }

    fn handle_event(&mut self, event: &WorldEvent) {
        if let WorldEvent::DamageDealt {
            attacker,
            victim: Actor::Mob(mob),
            amount,
        } = event
        {
            self.record_damage(*mob, attacker, *amount);
        }
    }

    fn build_snapshot(&self, mob: MobId) -> RankingSnapshot {
        let mut snapshot = self.ledger.snapshot(ContributionCategory::Damage, mob);
        snapshot.last_hit = self.last_hit(mob);
        snapshot
    }

    fn clear_all(&mut self) {
        self.ledger.clear();
        self.last_hit.clear();
    }
}
