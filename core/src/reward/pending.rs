use std::collections::BTreeMap;

use bossfall_types::ParticipantId;
use chrono::{DateTime, TimeDelta, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ItemCatalog, is_unsafe_command, resolve_item};
use crate::encounter::{ItemKind, ItemSpec};
use crate::serde_defaults::default_amount;
use crate::storage::PendingRewardSink;
use crate::world::{Announcement, Broadcaster, RewardHost};

/// Rewards owed per participant, as persisted
pub type PendingSnapshot = BTreeMap<ParticipantId, Vec<PendingReward>>;

/// A reward that could not be handed out because the participant was offline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingReward {
    Command { command: String },
    Item(PendingItem),
}

/// Enough to re-resolve an item through the same provider later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingItem {
    #[serde(default)]
    pub kind: ItemKind,
    pub material: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default = "default_amount")]
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl PendingItem {
    pub fn from_spec(spec: &ItemSpec, amount: u32) -> Self {
        Self {
            kind: spec.kind,
            material: spec.material.clone(),
            external_id: spec.id.clone(),
            amount,
            display_name: spec.display_name.clone(),
        }
    }
}

/// In-memory pending queue with debounced persistence.
///
/// Every mutation opens a flush window (if one is not already open); all
/// changes inside the window are written together when it closes.
#[derive(Debug)]
pub struct PendingRewardQueue {
    rewards: HashMap<ParticipantId, Vec<PendingReward>>,
    debounce: TimeDelta,
    flush_at: Option<DateTime<Utc>>,
}

impl PendingRewardQueue {
    pub fn new(debounce: TimeDelta) -> Self {
        Self {
            rewards: HashMap::new(),
            debounce,
            flush_at: None,
        }
    }

    pub fn from_snapshot(snapshot: PendingSnapshot, debounce: TimeDelta) -> Self {
        let mut queue = Self::new(debounce);
        queue.rewards.extend(snapshot.into_iter().filter(|(_, r)| !r.is_empty()));
        queue
    }

    pub fn queue_command(&mut self, participant: ParticipantId, command: String, now: DateTime<Utc>) {
        debug!(%participant, %command, "Queued command for offline participant");
        self.push(participant, PendingReward::Command { command }, now);
    }

    pub fn queue_item(&mut self, participant: ParticipantId, item: PendingItem, now: DateTime<Utc>) {
        debug!(%participant, material = %item.material, amount = item.amount, "Queued item for offline participant");
        self.push(participant, PendingReward::Item(item), now);
    }

    fn push(&mut self, participant: ParticipantId, reward: PendingReward, now: DateTime<Utc>) {
        self.rewards.entry(participant).or_default().push(reward);
        self.mark_dirty(now);
    }

    fn mark_dirty(&mut self, now: DateTime<Utc>) {
        if self.flush_at.is_none() {
            self.flush_at = Some(now + self.debounce);
        }
    }

    pub fn has_pending(&self, participant: ParticipantId) -> bool {
        self.rewards.contains_key(&participant)
    }

    pub fn pending_count(&self, participant: ParticipantId) -> usize {
        self.rewards.get(&participant).map_or(0, Vec::len)
    }

    pub fn participant_count(&self) -> usize {
        self.rewards.len()
    }

    /// Remove and return everything owed to a participant.
    pub fn claim(&mut self, participant: ParticipantId, now: DateTime<Utc>) -> Vec<PendingReward> {
        let claimed = self.rewards.remove(&participant).unwrap_or_default();
        if !claimed.is_empty() {
            self.mark_dirty(now);
        }
        claimed
    }

    pub fn snapshot(&self) -> PendingSnapshot {
        self.rewards
            .iter()
            .map(|(participant, rewards)| (*participant, rewards.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.flush_at.is_some()
    }

    pub fn flush_due_at(&self) -> Option<DateTime<Utc>> {
        self.flush_at
    }

    /// Hand a snapshot to the sink once the window has closed. A failure the
    /// sink reported since the last call reopens the window.
    pub fn flush_if_due(&mut self, now: DateTime<Utc>, sink: &dyn PendingRewardSink) -> bool {
        if sink.take_failure() {
            warn!("Previous pending reward write failed, retrying");
            self.mark_dirty(now);
        }
        match self.flush_at {
            Some(at) if now >= at => {
                self.flush_at = None;
                sink.save_pending(self.snapshot());
                true
            }
            _ => false,
        }
    }

    /// Write regardless of the debounce window
    pub fn flush_now(&mut self, sink: &dyn PendingRewardSink) {
        self.flush_at = None;
        sink.save_pending(self.snapshot());
    }
}

/// Deliver claimed rewards to a participant who is back online. Unsafe
/// commands and unresolvable items are skipped with a warning. Returns the
/// number of rewards delivered.
pub fn deliver_pending<H>(participant: ParticipantId, rewards: Vec<PendingReward>, host: &mut H) -> usize
where
    H: RewardHost + ItemCatalog + Broadcaster + ?Sized,
{
    let mut delivered = 0;

    for reward in rewards {
        match reward {
            PendingReward::Command { command } => {
                if is_unsafe_command(&command) {
                    warn!(%participant, %command, "Blocked suspicious pending command");
                    continue;
                }
                match host.dispatch_command(&command) {
                    Ok(()) => delivered += 1,
                    Err(e) => warn!(%participant, %command, error = %e, "Pending command failed"),
                }
            }
            PendingReward::Item(item) => {
                let stack = resolve_item(
                    &*host,
                    item.kind,
                    &item.material,
                    item.external_id.as_deref(),
                    item.display_name.as_deref(),
                    item.amount,
                );
                match stack {
                    Ok(stack) => {
                        if let Some(leftover) = host.give_item(participant, stack) {
                            host.drop_item(participant, leftover);
                        }
                        delivered += 1;
                    }
                    Err(e) => warn!(%participant, material = %item.material, error = %e, "Pending item unavailable"),
                }
            }
        }
    }

    if delivered > 0 {
        host.announce(Announcement::PendingDelivered {
            participant,
            count: delivered,
        });
    }
    info!(%participant, delivered, "Delivered pending rewards");
    delivered
}
