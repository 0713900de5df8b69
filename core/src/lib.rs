pub mod context;
pub mod encounter;
pub mod engine;
pub mod reward;
pub mod sandbox;
pub mod serde_defaults;
pub mod service;
pub mod status_effect;
pub mod storage;
pub mod tracker;
pub mod world;

// Re-exports for convenience
pub use context::{AppConfig, AppConfigExt, BackgroundTasks, ConfigError};
pub use encounter::{
    EncounterDefinition, EncounterScheduler, EncounterStatus, EngineError, RestoreReport, SpawnFailure,
    format_clock, format_duration, load_definitions,
};
pub use engine::{EncounterEngine, EngineSettings, EngineSinks};
pub use reward::{PayoutReport, PickupDecision};
pub use sandbox::{MemorySink, SandboxWorld};
pub use service::{EncounterService, ServiceCommand, ServiceHandle};
pub use status_effect::StatusEffect;
pub use storage::{LiveStateStore, PendingRewardStore, PersistedEncounterState, StateWriter, StorageError};
pub use tracker::{CategorySnapshots, RankingSnapshot, Trackers};
pub use world::{Actor, Announcement, Damager, Participant, WorldEvent, WorldHost};
