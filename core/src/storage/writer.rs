//! Background writer for state files
//!
//! Writes are queued on an unbounded channel and applied in order on a tokio
//! task, each inside `spawn_blocking`. Enqueueing never blocks the tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{LiveStateSink, LiveStateStore, PendingRewardSink, PendingRewardStore, PersistedEncounterState, StorageError};
use crate::reward::PendingSnapshot;

enum WriteRequest {
    ReplaceLive(Vec<PersistedEncounterState>),
    UpsertLive(PersistedEncounterState),
    RemoveLive(String),
    Pending(PendingSnapshot),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to the writer task
#[derive(Debug, Clone)]
pub struct StateWriter {
    tx: mpsc::UnboundedSender<WriteRequest>,
    pending_failed: Arc<AtomicBool>,
}

impl std::fmt::Debug for WriteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WriteRequest::ReplaceLive(_) => "ReplaceLive",
            WriteRequest::UpsertLive(_) => "UpsertLive",
            WriteRequest::RemoveLive(_) => "RemoveLive",
            WriteRequest::Pending(_) => "Pending",
            WriteRequest::Flush(_) => "Flush",
        };
        f.write_str(name)
    }
}

impl StateWriter {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn(live: LiveStateStore, pending: PendingRewardStore) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending_failed = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_writer(rx, live, pending, pending_failed.clone()));
        (Self { tx, pending_failed }, handle)
    }

    /// Wait until every write queued before this call has been applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteRequest::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Drain outstanding writes and wait for the task to exit. The task only
    /// exits once every other clone of this handle has been dropped.
    pub async fn shutdown(self, task: JoinHandle<()>) {
        self.flush().await;
        drop(self);
        if let Err(e) = task.await {
            error!(error = %e, "State writer task failed");
        }
    }

    fn send(&self, request: WriteRequest) {
        if self.tx.send(request).is_err() {
            warn!("State writer stopped, dropping write");
        }
    }
}

impl LiveStateSink for StateWriter {
    fn persist_all(&self, states: Vec<PersistedEncounterState>) {
        self.send(WriteRequest::ReplaceLive(states));
    }

    fn persist_one(&self, state: PersistedEncounterState) {
        self.send(WriteRequest::UpsertLive(state));
    }

    fn remove(&self, encounter: &str) {
        self.send(WriteRequest::RemoveLive(encounter.to_string()));
    }
}

impl PendingRewardSink for StateWriter {
    fn save_pending(&self, snapshot: PendingSnapshot) {
        self.send(WriteRequest::Pending(snapshot));
    }

    fn take_failure(&self) -> bool {
        self.pending_failed.swap(false, Ordering::SeqCst)
    }
}

async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<WriteRequest>,
    live: LiveStateStore,
    pending: PendingRewardStore,
    pending_failed: Arc<AtomicBool>,
) {
    while let Some(request) = rx.recv().await {
        if let WriteRequest::Flush(done) = request {
            let _ = done.send(());
            continue;
        }

        let is_pending = matches!(request, WriteRequest::Pending(_));
        let (live, pending) = (live.clone(), pending.clone());
        let outcome = tokio::task::spawn_blocking(move || apply(&live, &pending, request)).await;

        let failed = match outcome {
            Ok(Ok(())) => false,
            Ok(Err(e)) => {
                error!(error = %e, "State write failed");
                true
            }
            Err(e) => {
                error!(error = %e, "State write task panicked");
                true
            }
        };
        if failed && is_pending {
            pending_failed.store(true, Ordering::SeqCst);
        }
    }
    debug!("State writer stopped");
}

fn apply(live: &LiveStateStore, pending: &PendingRewardStore, request: WriteRequest) -> Result<(), StorageError> {
    match request {
        WriteRequest::ReplaceLive(states) => live.write_all(&states),
        WriteRequest::UpsertLive(state) => live.upsert(&state),
        WriteRequest::RemoveLive(encounter) => live.remove(&encounter),
        WriteRequest::Pending(snapshot) => pending.save(&snapshot),
        WriteRequest::Flush(done) => {
            let _ = done.send(());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::PendingReward;
    use bossfall_types::{MobId, ParticipantId};

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let live = LiveStateStore::in_dir(dir.path());
        let pending = PendingRewardStore::in_dir(dir.path());
        let (writer, task) = StateWriter::spawn(live.clone(), pending.clone());

        let state = PersistedEncounterState {
            encounter: "king".to_string(),
            mob: MobId::random(),
            spawn_epoch: 10,
            expire_epoch: Some(20),
        };
        writer.persist_one(state.clone());
        writer.persist_one(PersistedEncounterState {
            encounter: "wraith".to_string(),
            ..state.clone()
        });
        LiveStateSink::remove(&writer, "wraith");

        let mut snapshot = PendingSnapshot::new();
        snapshot.insert(
            ParticipantId::random(),
            vec![PendingReward::Command {
                command: "say hi".to_string(),
            }],
        );
        writer.save_pending(snapshot.clone());

        writer.flush().await;

        assert_eq!(live.load().unwrap(), vec![state]);
        assert_eq!(pending.load().unwrap(), snapshot);
        assert!(!writer.take_failure());

        writer.shutdown(task).await;
    }

    #[tokio::test]
    async fn test_failed_pending_write_raises_flag() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let blocked = dir.path().join("pending_rewards.toml");
        std::fs::create_dir_all(blocked.join("occupied")).unwrap();

        let (writer, _task) = StateWriter::spawn(
            LiveStateStore::in_dir(dir.path()),
            PendingRewardStore::new(blocked),
        );
        writer.save_pending(PendingSnapshot::new());
        writer.flush().await;

        assert!(writer.take_failure());
        assert!(!writer.take_failure(), "flag is consumed");
    }
}
