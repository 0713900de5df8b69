use tokio::task::JoinHandle;

/// Long-running tasks owned by a front end
#[derive(Default)]
pub struct BackgroundTasks {
    pub service: Option<JoinHandle<()>>,
    pub writer: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn is_running(&self) -> bool {
        self.service.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Abort both tasks and wait for them to unwind
    pub async fn abort_all(&mut self) {
        for handle in [self.service.take(), self.writer.take()].into_iter().flatten() {
            handle.abort();
            let _ = handle.await;
        }
    }
}
