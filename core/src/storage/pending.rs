use std::path::{Path, PathBuf};

use bossfall_types::ParticipantId;
use tracing::{debug, warn};

use super::{PENDING_REWARDS_FILE, StorageError, read_table, write_atomic};
use crate::reward::{PendingReward, PendingSnapshot};

/// Synchronous pending-reward file, one array of rewards per participant
#[derive(Debug, Clone)]
pub struct PendingRewardStore {
    path: PathBuf,
}

impl PendingRewardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(PENDING_REWARDS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every well-formed entry. Bad participant ids and malformed
    /// rewards are skipped with a warning.
    pub fn load(&self) -> Result<PendingSnapshot, StorageError> {
        let table = read_table(&self.path)?;
        let mut snapshot = PendingSnapshot::new();

        for (key, value) in table {
            let Ok(participant) = key.parse::<ParticipantId>() else {
                warn!(key = %key, "Skipping pending rewards for invalid participant id");
                continue;
            };
            let toml::Value::Array(entries) = value else {
                warn!(%participant, "Skipping pending rewards that are not a list");
                continue;
            };

            let rewards: Vec<PendingReward> = entries
                .into_iter()
                .filter_map(|entry| match entry.try_into::<PendingReward>() {
                    Ok(reward) => Some(reward),
                    Err(e) => {
                        warn!(%participant, error = %e, "Skipping malformed pending reward");
                        None
                    }
                })
                .collect();

            if !rewards.is_empty() {
                snapshot.insert(participant, rewards);
            }
        }

        Ok(snapshot)
    }

    pub fn save(&self, snapshot: &PendingSnapshot) -> Result<(), StorageError> {
        let mut table = toml::Table::new();
        for (participant, rewards) in snapshot {
            if rewards.is_empty() {
                continue;
            }
            let entries = rewards
                .iter()
                .map(toml::Value::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            table.insert(participant.to_string(), toml::Value::Array(entries));
        }

        let content = toml::to_string(&table)?;
        write_atomic(&self.path, &content)?;
        debug!(participants = table.len(), "Pending rewards written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::ItemKind;
    use crate::reward::PendingItem;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingRewardStore::in_dir(dir.path());
        let player = ParticipantId::random();

        let mut snapshot = PendingSnapshot::new();
        snapshot.insert(
            player,
            vec![
                PendingReward::Command {
                    command: "give Steve diamond 1".to_string(),
                },
                PendingReward::Item(PendingItem {
                    kind: ItemKind::ExternalId,
                    material: "SWORD".to_string(),
                    external_id: Some("KING_BLADE".to_string()),
                    amount: 2,
                    display_name: None,
                }),
            ],
        );
        store.save(&snapshot).unwrap();

        assert_eq!(store.load().unwrap(), snapshot);
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingRewardStore::in_dir(dir.path());
        let player = ParticipantId::random();
        let content = format!(
            "\"not-a-uuid\" = [{{ type = \"command\", command = \"x\" }}]\n\
             \"{player}\" = [{{ type = \"command\", command = \"ok\" }}, {{ type = \"teleport\" }}]\n"
        );
        std::fs::write(store.path(), content).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded[&player],
            vec![PendingReward::Command {
                command: "ok".to_string()
            }]
        );
    }
}
