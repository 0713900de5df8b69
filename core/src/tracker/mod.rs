//! Contribution tracking
//!
//! Three independent trackers score participants against tracked bosses:
//!
//! - **Damage**: final damage dealt to the boss, plus who landed the last hit
//! - **Tank**: final damage the boss dealt to each participant
//! - **Support**: harmful effects landed on the boss, attributed through a
//!   short-lived splash cache
//!
//! Every tracker keeps one record per mob identity. A record only exists
//! between `start_tracking` and `stop_tracking`, and events for untracked
//! mobs are ignored.

mod damage;
mod ledger;
mod support;
mod tank;

#[cfg(test)]
mod tracker_tests;

pub use damage::DamageTracker;
pub use ledger::{ContributionLedger, RankedContribution, RankingSnapshot};
pub use support::{ATTRIBUTION_WINDOW_TICKS, SupportTracker, support_score};
pub use tank::TankTracker;

use crate::world::WorldEvent;
use bossfall_types::{ContributionCategory, MobId};

/// Common surface of the three trackers
pub trait ContributionTracker {
    fn category(&self) -> ContributionCategory;

    /// Begin (or restart) tracking a mob with an empty record.
    fn start_tracking(&mut self, mob: MobId);

    fn stop_tracking(&mut self, mob: MobId);

    fn is_tracking(&self, mob: MobId) -> bool;

    fn handle_event(&mut self, event: &WorldEvent);

    /// Ranked copy of a mob's record. Empty for untracked mobs.
    fn build_snapshot(&self, mob: MobId) -> RankingSnapshot;

    fn clear_all(&mut self);
}

/// Snapshots of all three categories for one mob
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySnapshots {
    pub damage: RankingSnapshot,
    pub tank: RankingSnapshot,
    pub support: RankingSnapshot,
}

impl CategorySnapshots {
    pub fn get(&self, category: ContributionCategory) -> &RankingSnapshot {
        match category {
            ContributionCategory::Damage => &self.damage,
            ContributionCategory::Tank => &self.tank,
            ContributionCategory::Support => &self.support,
        }
    }
}

/// The three trackers, driven together
#[derive(Debug, Default)]
pub struct Trackers {
    pub damage: DamageTracker,
    pub tank: TankTracker,
    pub support: SupportTracker,
}

impl Trackers {
    pub fn new() -> Self {
        Self::default()
    }

    fn all_mut(&mut self) -> [&mut dyn ContributionTracker; 3] {
        [&mut self.damage, &mut self.tank, &mut self.support]
    }

    pub fn start_all(&mut self, mob: MobId) {
        for tracker in self.all_mut() {
            tracker.start_tracking(mob);
        }
    }

    pub fn stop_all(&mut self, mob: MobId) {
        for tracker in self.all_mut() {
            tracker.stop_tracking(mob);
        }
    }

    pub fn is_tracking(&self, mob: MobId) -> bool {
        self.damage.is_tracking(mob) || self.tank.is_tracking(mob) || self.support.is_tracking(mob)
    }

    pub fn handle_event(&mut self, event: &WorldEvent) {
        for tracker in self.all_mut() {
            tracker.handle_event(event);
        }
    }

    pub fn snapshots(&self, mob: MobId) -> CategorySnapshots {
        CategorySnapshots {
            damage: self.damage.build_snapshot(mob),
            tank: self.tank.build_snapshot(mob),
            support: self.support.build_snapshot(mob),
        }
    }

    pub fn clear_all(&mut self) {
        for tracker in self.all_mut() {
            tracker.clear_all();
        }
    }
}
