//! Encounter definition loading
//!
//! Reads the definitions file, parses schedules, and drops entries that can
//! never work (duplicate ids, rank-0 tiers). Recoverable problems are logged
//! and skipped rather than failing the whole file.

use std::fs;
use std::path::Path;

use bossfall_types::ContributionCategory;
use chrono_tz::Tz;
use hashbrown::HashSet;
use tracing::{info, warn};

use super::definition::{EncounterConfig, EncounterDefinition};
use super::error::DefinitionError;

/// Load and validate definitions from a TOML file.
///
/// A missing file yields no encounters.
pub fn load_definitions(path: &Path, default_zone: Tz) -> Result<Vec<EncounterDefinition>, DefinitionError> {
    if !path.exists() {
        warn!(path = %path.display(), "Encounter definitions file not found");
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path).map_err(|source| DefinitionError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let config: EncounterConfig = toml::from_str(&content).map_err(|source| DefinitionError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;

    let definitions = validate(config.encounters, default_zone);
    info!(path = %path.display(), count = definitions.len(), "Loaded encounter definitions");
    Ok(definitions)
}

/// Parse definitions from an in-memory TOML string
pub fn parse_definitions(content: &str, default_zone: Tz) -> Result<Vec<EncounterDefinition>, toml::de::Error> {
    let config: EncounterConfig = toml::from_str(content)?;
    Ok(validate(config.encounters, default_zone))
}

fn validate(encounters: Vec<EncounterDefinition>, default_zone: Tz) -> Vec<EncounterDefinition> {
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(encounters.len());

    for mut def in encounters {
        if def.id.trim().is_empty() {
            warn!(mob = %def.mob, "Skipping encounter with empty id");
            continue;
        }
        if !seen.insert(def.id.clone()) {
            warn!(encounter = %def.id, "Duplicate encounter id, keeping the first definition");
            continue;
        }

        def.resolve_schedule(default_zone);
        if def.compiled_schedule().is_empty() {
            warn!(encounter = %def.id, "Encounter has no valid schedule times, it will only spawn on demand");
        }
        if def.location.is_none() {
            warn!(encounter = %def.id, "Encounter has no spawn location, spawns will be aborted");
        }

        for category in ContributionCategory::ALL {
            if let Some(section) = def.rewards.category_mut(category) {
                section.tiers.retain(|tier| {
                    if tier.rank == 0 {
                        warn!(encounter = %def.id, %category, "Skipping reward tier with rank 0");
                    }
                    tier.rank > 0
                });
            }
        }

        valid.push(def);
    }

    valid
}
