//! Error types for encounter definitions and operator commands

use std::path::PathBuf;
use thiserror::Error;

use crate::world::SpawnError;

/// Errors while loading encounter definitions
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML in {path}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Why a spawn attempt was aborted
#[derive(Debug, Error)]
pub enum SpawnFailure {
    #[error("encounter '{encounter}' has no spawn location configured")]
    MissingLocation { encounter: String },

    #[error("world '{world}' for encounter '{encounter}' is not loaded")]
    WorldNotLoaded { encounter: String, world: String },

    #[error("mob engine failed to spawn encounter '{encounter}'")]
    Engine {
        encounter: String,
        #[source]
        source: SpawnError,
    },
}

/// Errors surfaced to operators
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown encounter '{0}'")]
    UnknownEncounter(String),

    #[error(transparent)]
    Spawn(#[from] SpawnFailure),

    #[error("encounter service is not running")]
    ServiceStopped,
}
