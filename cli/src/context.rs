use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bossfall_core::{AppConfig, BackgroundTasks, Participant, SandboxWorld, ServiceHandle};
use bossfall_types::{MobId, ParticipantId};
use tokio::sync::{Mutex, RwLock};

/// Ticks per second of the simulated game clock
const GAME_TICKS_PER_SECOND: u128 = 20;

/// Holds all shared state for the CLI application.
/// This is a lightweight container - logic lives in the service.
#[derive(Clone)]
pub struct CliContext {
    pub config: Arc<RwLock<AppConfig>>,
    pub service: ServiceHandle<SandboxWorld>,
    pub tasks: Arc<Mutex<BackgroundTasks>>,
    /// Participants by lowercase name, so a name maps to one identity
    participants: Arc<RwLock<HashMap<String, Participant>>>,
    started: Instant,
}

impl CliContext {
    pub fn new(config: AppConfig, service: ServiceHandle<SandboxWorld>, tasks: BackgroundTasks) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            service,
            tasks: Arc::new(Mutex::new(tasks)),
            participants: Arc::new(RwLock::new(HashMap::new())),
            started: Instant::now(),
        }
    }

    /// The participant with this name, created on first use
    pub async fn participant(&self, name: &str) -> Participant {
        let mut participants = self.participants.write().await;
        participants
            .entry(name.to_lowercase())
            .or_insert_with(|| Participant::new(ParticipantId::random(), name))
            .clone()
    }

    pub async fn participants(&self) -> Vec<Participant> {
        let mut all: Vec<_> = self.participants.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub async fn participant_name(&self, id: ParticipantId) -> Option<String> {
        self.participants
            .read()
            .await
            .values()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
    }

    /// Game tick counter derived from wall time since start
    pub fn game_tick(&self) -> u64 {
        let ticks = self.started.elapsed().as_millis() * GAME_TICKS_PER_SECOND / 1000;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    /// Identity of the live boss of an encounter
    pub async fn live_mob(&self, encounter: &str) -> Result<MobId, String> {
        let statuses = self.service.statuses().await.map_err(|e| e.to_string())?;
        let status = statuses
            .into_iter()
            .find(|s| s.id == encounter)
            .ok_or_else(|| format!("unknown encounter '{encounter}'"))?;
        status
            .mob_identity
            .ok_or_else(|| format!("encounter '{encounter}' has no live boss"))
    }
}
