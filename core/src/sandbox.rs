//! In-memory world host and sinks
//!
//! Implements every collaborator the engine needs over plain maps and keeps
//! a log of what it was asked to do. The CLI drives encounters through it,
//! and tests assert against its logs.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bossfall_types::{Location, MobId, ParticipantId};
use hashbrown::{HashMap, HashSet};

use crate::encounter::ItemKind;
use crate::reward::{ItemCatalog, ItemStack, PendingSnapshot, RewardError};
use crate::storage::{LiveStateSink, PendingRewardSink, PersistedEncounterState};
use crate::world::{
    Announcement, Broadcaster, DroppedItemId, EntityRef, HostError, MobEngine, MobHandle, RewardHost,
    SpawnError,
};

const DEFAULT_MATERIALS: &[&str] = &[
    "DIAMOND",
    "EMERALD",
    "GOLD_INGOT",
    "IRON_INGOT",
    "NETHERITE_INGOT",
    "ENCHANTED_GOLDEN_APPLE",
    "EXPERIENCE_BOTTLE",
];

#[derive(Debug, Clone)]
struct SandboxMob {
    handle: MobHandle,
    location: Location,
}

#[derive(Debug, Default)]
pub struct SandboxWorld {
    worlds: HashSet<String>,
    /// `None` accepts any template
    templates: Option<HashSet<String>>,
    mobs: HashMap<MobId, SandboxMob>,
    online: HashSet<ParticipantId>,
    /// Remaining inventory room per participant; absent means unlimited
    capacity: HashMap<ParticipantId, u32>,
    materials: HashSet<String>,
    external_items: HashSet<(String, String)>,
    named_items: HashSet<String>,
    spawn_failure: Option<String>,
    next_drop: u64,

    // ─── Call log ───────────────────────────────────────────────────────────
    pub chunk_loads: Vec<Location>,
    pub dispatched: Vec<String>,
    pub loot_rolls: Vec<(String, String)>,
    pub given: Vec<(ParticipantId, ItemStack)>,
    pub dropped: Vec<(DroppedItemId, ParticipantId, ItemStack)>,
    pub removed_drops: Vec<DroppedItemId>,
    pub teleports: Vec<(MobId, Location)>,
    pub removed_mobs: Vec<MobId>,
    pub announcements: Vec<Announcement>,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self {
            materials: DEFAULT_MATERIALS.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_world(mut self, world: &str) -> Self {
        self.worlds.insert(world.to_string());
        self
    }

    pub fn with_templates(mut self, templates: &[&str]) -> Self {
        self.templates = Some(templates.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_external_item(mut self, item_type: &str, id: &str) -> Self {
        self.external_items
            .insert((item_type.to_ascii_uppercase(), id.to_ascii_uppercase()));
        self
    }

    pub fn with_named_item(mut self, name: &str) -> Self {
        self.named_items.insert(name.to_string());
        self
    }

    pub fn load_world(&mut self, world: &str) {
        self.worlds.insert(world.to_string());
    }

    pub fn unload_world(&mut self, world: &str) {
        self.worlds.remove(world);
    }

    pub fn set_online(&mut self, participant: ParticipantId, online: bool) {
        if online {
            self.online.insert(participant);
        } else {
            self.online.remove(&participant);
        }
    }

    pub fn set_capacity(&mut self, participant: ParticipantId, items: u32) {
        self.capacity.insert(participant, items);
    }

    pub fn fail_next_spawn(&mut self, reason: &str) {
        self.spawn_failure = Some(reason.to_string());
    }

    /// Put a mob into the world without going through a spawn, as if it
    /// survived a restart.
    pub fn insert_mob(&mut self, template: &str, location: Location) -> MobId {
        let identity = MobId::random();
        self.mobs.insert(
            identity,
            SandboxMob {
                handle: MobHandle {
                    identity,
                    template: template.to_string(),
                },
                location,
            },
        );
        identity
    }

    pub fn move_mob(&mut self, mob: MobId, location: Location) -> bool {
        match self.mobs.get_mut(&mob) {
            Some(entry) => {
                entry.location = location;
                true
            }
            None => false,
        }
    }

    /// The entity disappears without the engine asking (death, unload).
    pub fn vanish_mob(&mut self, mob: MobId) -> bool {
        self.mobs.remove(&mob).is_some()
    }

    pub fn mob_location(&self, mob: MobId) -> Option<&Location> {
        self.mobs.get(&mob).map(|m| &m.location)
    }

    pub fn mob_count(&self) -> usize {
        self.mobs.len()
    }

    pub fn take_announcements(&mut self) -> Vec<Announcement> {
        std::mem::take(&mut self.announcements)
    }

    fn next_drop_id(&mut self) -> DroppedItemId {
        self.next_drop += 1;
        DroppedItemId(self.next_drop)
    }
}

impl MobEngine for SandboxWorld {
    fn is_world_loaded(&self, world: &str) -> bool {
        self.worlds.contains(world)
    }

    fn load_chunk(&mut self, location: &Location) {
        self.chunk_loads.push(location.clone());
    }

    fn spawn_mob(&mut self, template: &str, location: &Location) -> Result<MobHandle, SpawnError> {
        if let Some(reason) = self.spawn_failure.take() {
            return Err(SpawnError::Rejected {
                template: template.to_string(),
                reason,
            });
        }
        if let Some(known) = &self.templates
            && !known.contains(template)
        {
            return Err(SpawnError::UnknownTemplate {
                template: template.to_string(),
            });
        }
        let identity = self.insert_mob(template, location.clone());
        Ok(MobHandle {
            identity,
            template: template.to_string(),
        })
    }

    fn find_mob(&self, identity: MobId) -> Option<MobHandle> {
        self.mobs.get(&identity).map(|m| m.handle.clone())
    }

    fn resolve_entity(&self, handle: &MobHandle) -> Option<EntityRef> {
        self.mobs.get(&handle.identity).map(|m| EntityRef {
            identity: handle.identity,
            location: m.location.clone(),
        })
    }

    fn teleport(&mut self, handle: &MobHandle, location: &Location) {
        if self.move_mob(handle.identity, location.clone()) {
            self.teleports.push((handle.identity, location.clone()));
        }
    }

    fn remove_entity(&mut self, handle: &MobHandle) {
        if self.mobs.remove(&handle.identity).is_some() {
            self.removed_mobs.push(handle.identity);
        }
    }
}

impl RewardHost for SandboxWorld {
    fn is_online(&self, participant: ParticipantId) -> bool {
        self.online.contains(&participant)
    }

    fn dispatch_command(&mut self, command: &str) -> Result<(), HostError> {
        if command.trim().is_empty() {
            return Err(HostError("empty command".to_string()));
        }
        self.dispatched.push(command.to_string());
        Ok(())
    }

    fn run_loot_table(&mut self, table: &str, participant_name: &str) -> Result<(), HostError> {
        self.loot_rolls
            .push((table.to_string(), participant_name.to_string()));
        Ok(())
    }

    fn give_item(&mut self, participant: ParticipantId, item: ItemStack) -> Option<ItemStack> {
        let room = self.capacity.get(&participant).copied().unwrap_or(u32::MAX);
        let fits = item.amount.min(room);
        if let Some(remaining) = self.capacity.get_mut(&participant) {
            *remaining -= fits;
        }
        if fits > 0 {
            self.given.push((
                participant,
                ItemStack {
                    amount: fits,
                    ..item.clone()
                },
            ));
        }
        (fits < item.amount).then(|| ItemStack {
            amount: item.amount - fits,
            ..item
        })
    }

    fn drop_item(&mut self, participant: ParticipantId, item: ItemStack) -> Option<DroppedItemId> {
        let id = self.next_drop_id();
        self.dropped.push((id, participant, item));
        Some(id)
    }

    fn remove_dropped_item(&mut self, item: DroppedItemId) {
        self.removed_drops.push(item);
    }
}

impl ItemCatalog for SandboxWorld {
    fn inventory_item(
        &self,
        material: &str,
        display_name: Option<&str>,
        amount: u32,
    ) -> Result<ItemStack, RewardError> {
        let key = material.to_ascii_uppercase();
        if !self.materials.contains(&key) {
            return Err(RewardError::UnknownMaterial(material.to_string()));
        }
        Ok(ItemStack {
            kind: ItemKind::Inventory,
            key,
            amount,
            display_name: display_name.map(str::to_string),
        })
    }

    fn external_item_by_id(&self, item_type: &str, id: &str, amount: u32) -> Result<ItemStack, RewardError> {
        let entry = (item_type.to_ascii_uppercase(), id.to_ascii_uppercase());
        if !self.external_items.contains(&entry) {
            return Err(RewardError::UnknownExternalItem {
                item_type: item_type.to_string(),
                id: id.to_string(),
            });
        }
        Ok(ItemStack {
            kind: ItemKind::ExternalId,
            key: format!("{}:{}", entry.0, entry.1),
            amount,
            display_name: None,
        })
    }

    fn external_item_by_name(&self, name: &str, amount: u32) -> Result<ItemStack, RewardError> {
        if !self.named_items.contains(name) {
            return Err(RewardError::UnknownNamedItem(name.to_string()));
        }
        Ok(ItemStack {
            kind: ItemKind::ExternalName,
            key: name.to_string(),
            amount,
            display_name: None,
        })
    }
}

impl Broadcaster for SandboxWorld {
    fn announce(&mut self, announcement: Announcement) {
        self.announcements.push(announcement);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory Sinks
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemorySinkState {
    live: BTreeMap<String, PersistedEncounterState>,
    removed: Vec<String>,
    pending_saves: Vec<PendingSnapshot>,
    fail_next_pending: bool,
    pending_failed: bool,
}

/// Live-state and pending-reward sink kept in memory. Clones share state, so
/// a test can hand one to the engine and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemorySinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn live_rows(&self) -> Vec<PersistedEncounterState> {
        self.lock().live.values().cloned().collect()
    }

    pub fn live_row(&self, encounter: &str) -> Option<PersistedEncounterState> {
        self.lock().live.get(encounter).cloned()
    }

    pub fn removed(&self) -> Vec<String> {
        self.lock().removed.clone()
    }

    pub fn pending_saves(&self) -> usize {
        self.lock().pending_saves.len()
    }

    pub fn last_pending(&self) -> Option<PendingSnapshot> {
        self.lock().pending_saves.last().cloned()
    }

    /// Make the next pending save report a failure
    pub fn fail_next_pending(&self) {
        self.lock().fail_next_pending = true;
    }
}

impl LiveStateSink for MemorySink {
    fn persist_all(&self, states: Vec<PersistedEncounterState>) {
        self.lock().live = states.into_iter().map(|s| (s.encounter.clone(), s)).collect();
    }

    fn persist_one(&self, state: PersistedEncounterState) {
        self.lock().live.insert(state.encounter.clone(), state);
    }

    fn remove(&self, encounter: &str) {
        let mut state = self.lock();
        state.live.remove(encounter);
        state.removed.push(encounter.to_string());
    }
}

impl PendingRewardSink for MemorySink {
    fn save_pending(&self, snapshot: PendingSnapshot) {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_pending) {
            state.pending_failed = true;
            return;
        }
        state.pending_saves.push(snapshot);
    }

    fn take_failure(&self) -> bool {
        std::mem::take(&mut self.lock().pending_failed)
    }
}
