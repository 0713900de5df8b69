//! Encounter service - runs the engine on a background task
//!
//! Architecture:
//! - EncounterService: owns the engine, ticks it and applies commands in order
//! - ServiceHandle: cloneable sender used by front ends
//!
//! The engine is only ever touched from the service task, so commands and
//! ticks never interleave.

use std::time::Duration;

use bossfall_types::{MobId, ParticipantId};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::encounter::{EncounterDefinition, EncounterStatus, EngineError, RestoreReport, SpawnFailure};
use crate::engine::EncounterEngine;
use crate::reward::{PayoutReport, PickupDecision};
use crate::storage::PersistedEncounterState;
use crate::world::{DroppedItemId, WorldEvent, WorldHost};

const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<T>;

/// A closure run against the host on the service task
pub type HostFn<H> = Box<dyn FnOnce(&mut H) + Send>;

// ─────────────────────────────────────────────────────────────────────────────
// Service Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Messages sent to the service by a [`ServiceHandle`]
pub enum ServiceCommand<H> {
    Event {
        event: WorldEvent,
        reply: Reply<Option<PayoutReport>>,
    },
    ForceSpawn {
        id: String,
        reply: Reply<Result<MobId, EngineError>>,
    },
    ForceSpawnAll {
        reply: Reply<Vec<(String, Result<MobId, SpawnFailure>)>>,
    },
    Despawn {
        id: String,
        reply: Reply<Result<bool, EngineError>>,
    },
    DespawnAll {
        reply: Reply<usize>,
    },
    Status {
        reply: Reply<Vec<EncounterStatus>>,
    },
    Reload {
        definitions: Vec<EncounterDefinition>,
        reply: Reply<RestoreReport>,
    },
    CanPickup {
        item: DroppedItemId,
        picker: ParticipantId,
        reply: Reply<PickupDecision>,
    },
    WithHost(HostFn<H>),
    Shutdown {
        reply: Reply<Vec<PersistedEncounterState>>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Encounter Service
// ─────────────────────────────────────────────────────────────────────────────

pub struct EncounterService<H> {
    engine: EncounterEngine<H>,
    cmd_rx: mpsc::Receiver<ServiceCommand<H>>,
    tick_interval: Duration,
    flush_interval: Duration,
}

impl<H> EncounterService<H>
where
    H: WorldHost + Send + 'static,
{
    /// Wrap a started engine and return a handle to talk to it
    pub fn new(engine: EncounterEngine<H>) -> (Self, ServiceHandle<H>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let settings = engine.settings();
        // A zero period would make tokio's interval panic
        let tick_interval = settings.tick_interval.to_std().unwrap_or_default().max(Duration::from_millis(1));
        let flush_interval = settings
            .flush_debounce
            .to_std()
            .unwrap_or_default()
            .max(Duration::from_millis(1));

        let service = Self {
            engine,
            cmd_rx,
            tick_interval,
            flush_interval,
        };
        (service, ServiceHandle { cmd_tx })
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until a shutdown command arrives or every handle is dropped
    pub async fn run(mut self) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut flusher = interval(self.flush_interval);
        flusher.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(tick_ms = self.tick_interval.as_millis() as u64, "Encounter service running");
        loop {
            tokio::select! {
                _ = ticker.tick() => self.engine.tick(Utc::now()),
                _ = flusher.tick() => {
                    self.engine.flush_if_due(Utc::now());
                }
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => {
                        if !self.handle_command(cmd) {
                            break;
                        }
                    }
                    None => {
                        debug!("All service handles dropped");
                        self.engine.shutdown(Utc::now());
                        break;
                    }
                },
            }
        }
        info!("Encounter service stopped");
    }

    /// Apply one command. Returns false once the service should stop.
    fn handle_command(&mut self, cmd: ServiceCommand<H>) -> bool {
        let now = Utc::now();
        // A dropped reply receiver means the caller gave up; nothing to do
        match cmd {
            ServiceCommand::Event { event, reply } => {
                let _ = reply.send(self.engine.handle_event(&event, now));
            }
            ServiceCommand::ForceSpawn { id, reply } => {
                let _ = reply.send(self.engine.force_spawn(&id, now));
            }
            ServiceCommand::ForceSpawnAll { reply } => {
                let _ = reply.send(self.engine.force_spawn_all(now));
            }
            ServiceCommand::Despawn { id, reply } => {
                let _ = reply.send(self.engine.despawn(&id, now));
            }
            ServiceCommand::DespawnAll { reply } => {
                let _ = reply.send(self.engine.despawn_all(now));
            }
            ServiceCommand::Status { reply } => {
                let _ = reply.send(self.engine.statuses(now));
            }
            ServiceCommand::Reload { definitions, reply } => {
                let _ = reply.send(self.engine.reload(definitions, now));
            }
            ServiceCommand::CanPickup { item, picker, reply } => {
                let _ = reply.send(self.engine.can_pickup(item, picker, now));
            }
            ServiceCommand::WithHost(f) => f(self.engine.host_mut()),
            ServiceCommand::Shutdown { reply } => {
                let _ = reply.send(self.engine.shutdown(now));
                return false;
            }
        }
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to send commands to the encounter service
pub struct ServiceHandle<H> {
    cmd_tx: mpsc::Sender<ServiceCommand<H>>,
}

impl<H> Clone for ServiceHandle<H> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
        }
    }
}

impl<H: Send + 'static> ServiceHandle<H> {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> ServiceCommand<H>) -> Result<T, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply))
            .await
            .map_err(|_| EngineError::ServiceStopped)?;
        rx.await.map_err(|_| EngineError::ServiceStopped)
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    /// Feed a world event. Returns the payout report when a boss died.
    pub async fn handle_event(&self, event: WorldEvent) -> Result<Option<PayoutReport>, EngineError> {
        self.request(|reply| ServiceCommand::Event { event, reply }).await
    }

    pub async fn force_spawn(&self, id: &str) -> Result<MobId, EngineError> {
        let id = id.to_string();
        self.request(|reply| ServiceCommand::ForceSpawn { id, reply }).await?
    }

    pub async fn force_spawn_all(&self) -> Result<Vec<(String, Result<MobId, SpawnFailure>)>, EngineError> {
        self.request(|reply| ServiceCommand::ForceSpawnAll { reply }).await
    }

    pub async fn despawn(&self, id: &str) -> Result<bool, EngineError> {
        let id = id.to_string();
        self.request(|reply| ServiceCommand::Despawn { id, reply }).await?
    }

    pub async fn despawn_all(&self) -> Result<usize, EngineError> {
        self.request(|reply| ServiceCommand::DespawnAll { reply }).await
    }

    pub async fn statuses(&self) -> Result<Vec<EncounterStatus>, EngineError> {
        self.request(|reply| ServiceCommand::Status { reply }).await
    }

    pub async fn reload(&self, definitions: Vec<EncounterDefinition>) -> Result<RestoreReport, EngineError> {
        self.request(|reply| ServiceCommand::Reload { definitions, reply }).await
    }

    pub async fn can_pickup(&self, item: DroppedItemId, picker: ParticipantId) -> Result<PickupDecision, EngineError> {
        self.request(|reply| ServiceCommand::CanPickup { item, picker, reply })
            .await
    }

    /// Run a closure against the host on the service task and return its result
    pub async fn with_host<R, F>(&self, f: F) -> Result<R, EngineError>
    where
        R: Send + 'static,
        F: FnOnce(&mut H) -> R + Send + 'static,
    {
        self.request(|reply| {
            ServiceCommand::WithHost(Box::new(move |host: &mut H| {
                let _ = reply.send(f(host));
            }))
        })
        .await
    }

    /// Stop the service, releasing live bosses. Returns what was released.
    pub async fn shutdown(&self) -> Result<Vec<PersistedEncounterState>, EngineError> {
        self.request(|reply| ServiceCommand::Shutdown { reply }).await
    }
}
