//! Shared types for bossfall
//!
//! This crate contains the identity, location and configuration types shared
//! between the encounter engine (bossfall-core) and its front ends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Identities
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identity of a participant (player), independent of display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ParticipantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identity the mob engine assigns to a spawned boss entity.
///
/// Survives process restarts, which is what lets a persisted encounter be
/// re-adopted after a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MobId(pub Uuid);

impl MobId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// World Coordinates
// ─────────────────────────────────────────────────────────────────────────────

/// A point in a named world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Euclidean distance, or `None` when the points are in different worlds.
    pub fn distance_to(&self, other: &Location) -> Option<f64> {
        if self.world != other.world {
            return None;
        }
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        Some((dx * dx + dy * dy + dz * dz).sqrt())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}, {:.1}, {:.1})", self.world, self.x, self.y, self.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Contribution Categories
// ─────────────────────────────────────────────────────────────────────────────

/// The three independent ways a participant contributes to a kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionCategory {
    /// Damage dealt to the boss
    Damage,
    /// Damage the boss dealt to the participant
    Tank,
    /// Harmful effects landed on the boss
    Support,
}

impl ContributionCategory {
    pub const ALL: [ContributionCategory; 3] = [Self::Damage, Self::Tank, Self::Support];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Damage => "damage",
            Self::Tank => "tank",
            Self::Support => "support",
        }
    }
}

impl fmt::Display for ContributionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Config
// ─────────────────────────────────────────────────────────────────────────────

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_pending_delivery_delay_secs() -> u64 {
    2
}

fn default_pending_flush_debounce_ms() -> u64 {
    50
}

/// Application settings persisted by the host front end.
///
/// Empty path fields mean "use the platform default"; bossfall-core resolves
/// them (see `AppConfigExt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data_directory: String,
    #[serde(default)]
    pub definitions_file: String,
    /// IANA zone used when an encounter's own zone is missing or invalid.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Delay between a participant joining and their pending rewards arriving.
    #[serde(default = "default_pending_delivery_delay_secs")]
    pub pending_delivery_delay_secs: u64,
    #[serde(default = "default_pending_flush_debounce_ms")]
    pub pending_flush_debounce_ms: u64,
    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: String::new(),
            definitions_file: String::new(),
            default_timezone: default_timezone(),
            tick_interval_ms: default_tick_interval_ms(),
            pending_delivery_delay_secs: default_pending_delivery_delay_secs(),
            pending_flush_debounce_ms: default_pending_flush_debounce_ms(),
            debug_logging: false,
        }
    }
}

impl AppConfig {
    /// Create a config rooted at a data directory. Other fields use defaults.
    pub fn with_data_directory(data_directory: String) -> Self {
        Self {
            data_directory,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_same_world() {
        let a = Location::new("world", 0.0, 64.0, 0.0);
        let b = Location::new("world", 3.0, 64.0, 4.0);
        assert_eq!(a.distance_to(&b), Some(5.0));
    }

    #[test]
    fn test_distance_other_world_is_none() {
        let a = Location::new("world", 0.0, 64.0, 0.0);
        let b = Location::new("world_nether", 0.0, 64.0, 0.0);
        assert_eq!(a.distance_to(&b), None);
    }

    #[test]
    fn test_with_data_directory_keeps_defaults() {
        let config = AppConfig::with_data_directory("/srv/bossfall".to_string());
        assert_eq!(config.data_directory, "/srv/bossfall");
        assert_eq!(config.default_timezone, "UTC");
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.pending_delivery_delay_secs, 2);
    }

    #[test]
    fn test_ids_parse_and_display() {
        let id = ParticipantId::random();
        let parsed: ParticipantId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<MobId>().is_err());
    }
}
