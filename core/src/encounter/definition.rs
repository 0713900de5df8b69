//! Encounter definition types
//!
//! Definitions are loaded from a TOML file with one `[[encounter]]` table per
//! boss and describe when, where and what to spawn, how to announce it, and
//! what the top contributors receive.

use bossfall_types::{ContributionCategory, Location};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::schedule::Schedule;
use crate::serde_defaults::{default_amount, default_multiplier, default_true};

// ═══════════════════════════════════════════════════════════════════════════
// Root Config Structure
// ═══════════════════════════════════════════════════════════════════════════

/// Root structure of an encounter definitions file
///
/// ```toml
/// [[encounter]]
/// id = "skeleton_king"
/// mob = "SkeletonKing"
///
/// [encounter.schedule]
/// times = ["09:00", "21:00"]
/// zone = "Europe/Berlin"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncounterConfig {
    #[serde(default, rename = "encounter")]
    pub encounters: Vec<EncounterDefinition>,
}

fn default_expire_secs() -> u64 {
    3600
}

/// One configured boss encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterDefinition {
    /// Unique identifier, also the key of its persisted live state
    pub id: String,

    /// Mob engine template to spawn
    pub mob: String,

    /// Lifetime after spawn; 0 disables expiry
    #[serde(default = "default_expire_secs")]
    pub expire_secs: u64,

    /// Remove the boss when its lifetime ends
    #[serde(default = "default_true")]
    pub clear_on_expire: bool,

    #[serde(default = "default_true")]
    pub load_chunks: bool,

    #[serde(default)]
    pub schedule: ScheduleSettings,

    #[serde(default)]
    pub location: Option<SpawnLocation>,

    #[serde(default)]
    pub broadcast: BroadcastSettings,

    #[serde(default)]
    pub rewards: RewardSettings,

    /// Parsed schedule, built by the loader
    #[serde(skip)]
    compiled_schedule: Schedule,
}

impl EncounterDefinition {
    pub fn new(id: impl Into<String>, mob: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mob: mob.into(),
            expire_secs: default_expire_secs(),
            clear_on_expire: true,
            load_chunks: true,
            schedule: ScheduleSettings::default(),
            location: None,
            broadcast: BroadcastSettings::default(),
            rewards: RewardSettings::default(),
            compiled_schedule: Schedule::default(),
        }
    }

    /// Parse the raw schedule settings. Must run after deserialization.
    pub fn resolve_schedule(&mut self, default_zone: Tz) {
        self.compiled_schedule = Schedule::parse(
            &self.id,
            &self.schedule.times,
            self.schedule.zone.as_deref(),
            default_zone,
        );
    }

    pub fn compiled_schedule(&self) -> &Schedule {
        &self.compiled_schedule
    }

    pub fn spawn_location(&self) -> Option<Location> {
        self.location.as_ref().map(SpawnLocation::to_location)
    }

    pub fn leash_radius(&self) -> f64 {
        self.location.as_ref().map_or(0.0, |l| l.leash_radius)
    }

    // ─── Builders (tests and front ends) ────────────────────────────────────

    pub fn with_schedule(mut self, times: &[&str], zone: Tz) -> Self {
        self.schedule = ScheduleSettings {
            times: times.iter().map(|t| t.to_string()).collect(),
            zone: Some(zone.name().to_string()),
        };
        self.resolve_schedule(zone);
        self
    }

    pub fn with_location(mut self, location: Location, leash_radius: f64) -> Self {
        self.location = Some(SpawnLocation {
            world: location.world,
            x: location.x,
            y: location.y,
            z: location.z,
            leash_radius,
        });
        self
    }

    pub fn with_expire_secs(mut self, expire_secs: u64) -> Self {
        self.expire_secs = expire_secs;
        self
    }

    pub fn with_rewards(mut self, rewards: RewardSettings) -> Self {
        self.rewards = rewards;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Schedule & Location
// ═══════════════════════════════════════════════════════════════════════════

/// Raw schedule settings as written in the file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Local times of day, `HH:MM` or `HH:MM:SS`
    #[serde(default)]
    pub times: Vec<String>,

    /// IANA zone; the app default is used when missing or invalid
    #[serde(default)]
    pub zone: Option<String>,
}

fn default_leash_radius() -> f64 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnLocation {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// 0 disables leashing
    #[serde(default = "default_leash_radius")]
    pub leash_radius: f64,
}

impl SpawnLocation {
    pub fn to_location(&self) -> Location {
        Location::new(self.world.clone(), self.x, self.y, self.z)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Broadcasts
// ═══════════════════════════════════════════════════════════════════════════

fn default_warning_minutes() -> Vec<u32> {
    vec![30, 15, 5, 1]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastSettings {
    #[serde(default = "default_true")]
    pub death_chat: bool,
    #[serde(default = "default_true")]
    pub death_title: bool,
    #[serde(default = "default_true")]
    pub warning_chat: bool,
    #[serde(default = "default_true")]
    pub warning_title: bool,
    #[serde(default = "default_true")]
    pub warning_progress_bar: bool,
    /// Minute marks announced before a spawn
    #[serde(default = "default_warning_minutes")]
    pub warning_minutes: Vec<u32>,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            death_chat: true,
            death_title: true,
            warning_chat: true,
            warning_title: true,
            warning_progress_bar: true,
            warning_minutes: default_warning_minutes(),
        }
    }
}

impl BroadcastSettings {
    /// How far ahead of a spawn the countdown starts, in seconds
    pub fn warning_window_secs(&self) -> i64 {
        i64::from(self.warning_minutes.iter().copied().max().unwrap_or(30)) * 60
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Rewards
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_multiplier")]
    pub global_multiplier: f64,

    /// Extra multiplier for the participant who landed the killing blow
    /// (damage category only)
    #[serde(default = "default_multiplier")]
    pub last_hit_multiplier: f64,

    /// Roll loot tables `round(multiplier)` times instead of once
    #[serde(default)]
    pub multiply_loot_tables: bool,

    #[serde(default)]
    pub protection: ProtectionSettings,

    #[serde(default)]
    pub damage: Option<CategoryRewards>,

    #[serde(default)]
    pub tank: Option<CategoryRewards>,

    #[serde(default)]
    pub support: Option<CategoryRewards>,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            global_multiplier: 1.0,
            last_hit_multiplier: 1.0,
            multiply_loot_tables: false,
            protection: ProtectionSettings::default(),
            damage: None,
            tank: None,
            support: None,
        }
    }
}

impl RewardSettings {
    /// Tiers of a category, if that category is configured and enabled
    pub fn category(&self, category: ContributionCategory) -> Option<&CategoryRewards> {
        let section = match category {
            ContributionCategory::Damage => self.damage.as_ref(),
            ContributionCategory::Tank => self.tank.as_ref(),
            ContributionCategory::Support => self.support.as_ref(),
        };
        section.filter(|s| s.enabled)
    }

    pub fn category_mut(&mut self, category: ContributionCategory) -> &mut Option<CategoryRewards> {
        match category {
            ContributionCategory::Damage => &mut self.damage,
            ContributionCategory::Tank => &mut self.tank,
            ContributionCategory::Support => &mut self.support,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRewards {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub tiers: Vec<RewardTier>,
}

/// Rewards for the participant at one rank
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardTier {
    /// 1-based rank
    pub rank: usize,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Privileged commands; `{player}` is replaced by the participant's name
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub loot_tables: Vec<String>,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
}

/// Item provider kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Plain inventory material
    #[default]
    #[serde(alias = "vanilla")]
    Inventory,
    /// External catalog item addressed by type + id
    #[serde(alias = "mmoitems")]
    ExternalId,
    /// External catalog item addressed by name
    #[serde(alias = "mythicmobs")]
    ExternalName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    #[serde(default)]
    pub kind: ItemKind,
    /// Material, external type, or external name depending on `kind`
    pub material: String,
    /// External id (`external_id` only)
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_amount")]
    pub amount: u32,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpireAction {
    /// Anyone may pick the item up
    #[default]
    Public,
    /// The item is removed from the world
    Despawn,
}

fn default_protection_secs() -> u64 {
    60
}

/// Owner-only pickup window for reward items that did not fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_protection_secs")]
    pub duration_secs: u64,
    #[serde(default)]
    pub expire_action: ExpireAction,
}

impl Default for ProtectionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_secs: default_protection_secs(),
            expire_action: ExpireAction::Public,
        }
    }
}
