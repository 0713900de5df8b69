//! Durable encounter state
//!
//! Two small TOML files live in the data directory:
//! - `live_state.toml`: one table per alive encounter, enough to re-adopt
//!   the boss after a restart
//! - `pending_rewards.toml`: rewards owed to participants who were offline
//!
//! Gameplay code writes through [`LiveStateSink`] / [`PendingRewardSink`] so
//! the tick never waits on disk. [`StateWriter`] applies those writes in
//! order on a background task; the stores themselves are synchronous.

mod error;
mod live;
mod pending;
mod writer;

pub use error::StorageError;
pub use live::{LiveStateStore, PersistedEncounterState};
pub use pending::PendingRewardStore;
pub use writer::StateWriter;

use crate::reward::PendingSnapshot;
use std::fs;
use std::path::{Path, PathBuf};

pub const LIVE_STATE_FILE: &str = "live_state.toml";
pub const PENDING_REWARDS_FILE: &str = "pending_rewards.toml";

/// Platform data directory, `~/.local/share/bossfall` on Linux.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bossfall")
}

/// Destination for live encounter state. Implementations must not block.
pub trait LiveStateSink {
    /// Replace the whole store with exactly these rows.
    fn persist_all(&self, states: Vec<PersistedEncounterState>);

    /// Insert or replace one row, leaving the others untouched.
    fn persist_one(&self, state: PersistedEncounterState);

    fn remove(&self, encounter: &str);
}

/// Destination for the pending-reward queue. Implementations must not block.
pub trait PendingRewardSink {
    fn save_pending(&self, snapshot: PendingSnapshot);

    /// True once per failed write since the last call, so the queue can
    /// schedule a retry.
    fn take_failure(&self) -> bool {
        false
    }
}

/// Write via a sibling temp file and rename, so readers never see a torn file.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, contents).map_err(|source| StorageError::WriteFile {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StorageError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a TOML table, treating a missing file as empty.
pub(crate) fn read_table(path: &Path) -> Result<toml::Table, StorageError> {
    if !path.exists() {
        return Ok(toml::Table::new());
    }
    let content = fs::read_to_string(path).map_err(|source| StorageError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| StorageError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
