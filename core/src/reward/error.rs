//! Error types for reward resolution

use thiserror::Error;

/// Why a configured reward item could not be produced
#[derive(Debug, Error)]
pub enum RewardError {
    #[error("unknown material '{0}'")]
    UnknownMaterial(String),

    #[error("external item '{item_type}' has no id")]
    MissingExternalId { item_type: String },

    #[error("unknown external item {item_type}:{id}")]
    UnknownExternalItem { item_type: String, id: String },

    #[error("unknown named item '{0}'")]
    UnknownNamedItem(String),
}
