//! Boss encounters
//!
//! Definitions are loaded once from TOML; each becomes an
//! [`EncounterInstance`] owned by the [`EncounterScheduler`], which spawns,
//! announces, expires and leashes bosses from a single cooperative tick.

mod definition;
mod error;
mod instance;
mod loader;
mod schedule;
mod scheduler;
mod status;
mod timer;
mod warning;


pub use definition::{
    BroadcastSettings, CategoryRewards, EncounterConfig, EncounterDefinition, ExpireAction, ItemKind, ItemSpec,
    ProtectionSettings, RewardSettings, RewardTier, ScheduleSettings, SpawnLocation,
};
pub use error::{DefinitionError, EngineError, SpawnFailure};
pub use instance::{AliveState, EncounterInstance, InstanceCtx, InstanceEvent, LEASH_CHECK_INTERVAL_SECS, Liveness};
pub use loader::{load_definitions, parse_definitions};
pub use schedule::{Schedule, parse_time_of_day};
pub use scheduler::{EncounterScheduler, RestoreReport};
pub use status::{EncounterStatus, format_clock, format_duration};
pub use timer::{TimerHandle, after_secs};
pub use warning::{PROGRESS_BAR_SECS, SpawnWarning};
