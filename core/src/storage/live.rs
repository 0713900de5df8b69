use std::path::{Path, PathBuf};

use bossfall_types::MobId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{LIVE_STATE_FILE, StorageError, read_table, write_atomic};

/// What survives a restart for one alive encounter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedEncounterState {
    pub encounter: String,
    pub mob: MobId,
    /// Unix seconds
    pub spawn_epoch: i64,
    /// Unix seconds; `None` when the encounter never expires
    pub expire_epoch: Option<i64>,
}

impl PersistedEncounterState {
    pub fn is_expired_at(&self, now_epoch: i64) -> bool {
        self.expire_epoch.is_some_and(|expire| now_epoch >= expire)
    }
}

/// On-disk row, keyed by encounter id in the file
#[derive(Debug, Serialize, Deserialize)]
struct LiveRecord {
    mob: MobId,
    spawn_epoch: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expire_epoch: Option<i64>,
}

impl From<&PersistedEncounterState> for LiveRecord {
    fn from(state: &PersistedEncounterState) -> Self {
        Self {
            mob: state.mob,
            spawn_epoch: state.spawn_epoch,
            expire_epoch: state.expire_epoch,
        }
    }
}

/// Synchronous live-state file
#[derive(Debug, Clone)]
pub struct LiveStateStore {
    path: PathBuf,
}

impl LiveStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(LIVE_STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every well-formed row. Malformed rows are skipped with a warning; an
    /// unparsable file is an error.
    pub fn load(&self) -> Result<Vec<PersistedEncounterState>, StorageError> {
        let table = read_table(&self.path)?;
        let mut states = Vec::with_capacity(table.len());

        for (encounter, value) in table {
            match value.try_into::<LiveRecord>() {
                Ok(record) => states.push(PersistedEncounterState {
                    encounter,
                    mob: record.mob,
                    spawn_epoch: record.spawn_epoch,
                    expire_epoch: record.expire_epoch,
                }),
                Err(e) => warn!(%encounter, error = %e, "Skipping malformed live state row"),
            }
        }

        Ok(states)
    }

    pub fn write_all(&self, states: &[PersistedEncounterState]) -> Result<(), StorageError> {
        let mut table = toml::Table::new();
        for state in states {
            table.insert(state.encounter.clone(), toml::Value::try_from(LiveRecord::from(state))?);
        }
        self.write_table(&table)
    }

    /// Insert or replace one row, keeping every other row as it is on disk.
    pub fn upsert(&self, state: &PersistedEncounterState) -> Result<(), StorageError> {
        let mut table = self.read_table_or_empty();
        table.insert(state.encounter.clone(), toml::Value::try_from(LiveRecord::from(state))?);
        self.write_table(&table)
    }

    pub fn remove(&self, encounter: &str) -> Result<(), StorageError> {
        let mut table = self.read_table_or_empty();
        if table.remove(encounter).is_none() {
            return Ok(());
        }
        self.write_table(&table)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.write_table(&toml::Table::new())
    }

    fn read_table_or_empty(&self) -> toml::Table {
        read_table(&self.path).unwrap_or_else(|e| {
            warn!(error = %e, "Live state file unreadable, rewriting from scratch");
            toml::Table::new()
        })
    }

    fn write_table(&self, table: &toml::Table) -> Result<(), StorageError> {
        let content = toml::to_string(table)?;
        write_atomic(&self.path, &content)?;
        debug!(path = %self.path.display(), rows = table.len(), "Live state written");
        Ok(())
    }
}
