//! External collaborators
//!
//! The engine never simulates the game world. It consumes four capabilities
//! from whatever hosts it:
//!
//! - [`MobEngine`]: spawn, locate, move and remove boss entities
//! - [`RewardHost`]: connected participants, privileged commands, inventories
//! - [`ItemCatalog`](crate::reward::ItemCatalog): turns configured items into stacks
//! - [`Broadcaster`]: receives structured [`Announcement`]s
//!
//! and a stream of [`WorldEvent`]s describing combat.

mod announcement;
mod events;

pub use announcement::{Announcement, Channels, RankingLine};
pub use events::{Actor, AreaEffectKind, Damager, EffectAction, Participant, WorldEvent};

use crate::reward::{ItemCatalog, ItemStack};
use bossfall_types::{Location, MobId, ParticipantId};
use thiserror::Error;

/// Opaque handle to a mob the engine spawned or adopted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobHandle {
    pub identity: MobId,
    pub template: String,
}

/// Live view of a resolvable mob entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
    pub identity: MobId,
    pub location: Location,
}

/// Identifier of an item entity lying in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DroppedItemId(pub u64);

/// Failures reported by the mob engine
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("unknown mob template '{template}'")]
    UnknownTemplate { template: String },

    #[error("mob engine rejected '{template}': {reason}")]
    Rejected { template: String, reason: String },
}

/// Failure reported by the reward host for a single operation
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HostError(pub String);

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities
// ─────────────────────────────────────────────────────────────────────────────

pub trait MobEngine {
    fn is_world_loaded(&self, world: &str) -> bool;

    /// Make sure the area around `location` is loaded before spawning into it.
    fn load_chunk(&mut self, location: &Location);

    fn spawn_mob(&mut self, template: &str, location: &Location) -> Result<MobHandle, SpawnError>;

    /// Look a mob up among the engine's active mobs by its identity.
    fn find_mob(&self, identity: MobId) -> Option<MobHandle>;

    /// `None` once the entity is despawned, dead or otherwise invalid.
    fn resolve_entity(&self, handle: &MobHandle) -> Option<EntityRef>;

    fn teleport(&mut self, handle: &MobHandle, location: &Location);

    fn remove_entity(&mut self, handle: &MobHandle);
}

pub trait RewardHost {
    fn is_online(&self, participant: ParticipantId) -> bool;

    fn dispatch_command(&mut self, command: &str) -> Result<(), HostError>;

    /// Roll a named loot table once for a participant.
    fn run_loot_table(&mut self, table: &str, participant_name: &str) -> Result<(), HostError>;

    /// Put a stack into the participant's inventory, returning what did not fit.
    fn give_item(&mut self, participant: ParticipantId, item: ItemStack) -> Option<ItemStack>;

    /// Drop a stack at the participant's feet.
    fn drop_item(&mut self, participant: ParticipantId, item: ItemStack) -> Option<DroppedItemId>;

    fn remove_dropped_item(&mut self, item: DroppedItemId);
}

pub trait Broadcaster {
    fn announce(&mut self, announcement: Announcement);
}

/// Everything the engine needs from its host, in one bound.
pub trait WorldHost: MobEngine + RewardHost + ItemCatalog + Broadcaster {}

impl<T> WorldHost for T where T: MobEngine + RewardHost + ItemCatalog + Broadcaster {}
