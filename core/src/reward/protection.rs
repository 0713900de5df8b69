use bossfall_types::ParticipantId;
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use tracing::debug;

use crate::encounter::{ExpireAction, ProtectionSettings, after_secs};
use crate::world::DroppedItemId;

#[derive(Debug, Clone)]
struct Protection {
    owner: ParticipantId,
    expires_at: DateTime<Utc>,
    action: ExpireAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupDecision {
    Allowed,
    Denied { owner: ParticipantId },
}

/// Owner-only pickup for dropped reward items
#[derive(Debug, Default)]
pub struct PickupGuard {
    protected: HashMap<DroppedItemId, Protection>,
}

impl PickupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protect(
        &mut self,
        item: DroppedItemId,
        owner: ParticipantId,
        settings: &ProtectionSettings,
        now: DateTime<Utc>,
    ) {
        self.protected.insert(
            item,
            Protection {
                owner,
                expires_at: after_secs(now, settings.duration_secs),
                action: settings.expire_action,
            },
        );
        debug!(item = item.0, %owner, "Dropped reward protected");
    }

    pub fn is_protected(&self, item: DroppedItemId) -> bool {
        self.protected.contains_key(&item)
    }

    /// Decide a pickup attempt. An allowed pickup of a protected item clears
    /// its protection since the item leaves the world.
    pub fn can_pickup(&mut self, item: DroppedItemId, picker: ParticipantId, now: DateTime<Utc>) -> PickupDecision {
        let Some(protection) = self.protected.get(&item) else {
            return PickupDecision::Allowed;
        };
        if protection.owner != picker && now < protection.expires_at {
            return PickupDecision::Denied {
                owner: protection.owner,
            };
        }
        self.protected.remove(&item);
        PickupDecision::Allowed
    }

    /// Remove protections whose window has closed, returning what to do
    /// with each item.
    pub fn take_expired(&mut self, now: DateTime<Utc>) -> Vec<(DroppedItemId, ExpireAction)> {
        let mut expired: Vec<(DroppedItemId, ExpireAction)> = self
            .protected
            .iter()
            .filter(|(_, p)| now >= p.expires_at)
            .map(|(id, p)| (*id, p.action))
            .collect();
        for (id, _) in &expired {
            self.protected.remove(id);
        }
        expired.sort_by_key(|(id, _)| *id);
        expired
    }

    pub fn clear(&mut self) {
        self.protected.clear();
    }

    pub fn len(&self) -> usize {
        self.protected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protected.is_empty()
    }
}
