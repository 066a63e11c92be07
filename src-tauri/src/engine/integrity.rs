use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::backend::Backend;
use super::types::IntegrityLevel;
use crate::error::AppError;

/// Cadence of the background integrity poll.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Cache-free pass-through to the backend's risk oracle.
#[derive(Clone)]
pub struct IntegrityMonitor {
    backend: Arc<dyn Backend>,
    interval: Duration,
}

impl IntegrityMonitor {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_interval(backend, POLL_INTERVAL)
    }

    pub fn with_interval(backend: Arc<dyn Backend>, interval: Duration) -> Self {
        Self { backend, interval }
    }

    pub async fn read(&self) -> Result<IntegrityLevel, AppError> {
        Ok(self.backend.get_integrity().await?)
    }

    /// Poll on a fixed interval, first read immediately. Must be called from
    /// within a tokio runtime. Failed reads are logged and skipped.
    pub fn spawn_polling<F>(&self, on_read: F) -> PollHandle
    where
        F: Fn(IntegrityLevel) + Send + Sync + 'static,
    {
        let monitor = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match monitor.read().await {
                    Ok(level) => {
                        debug!("Integrity poll: {}%", level.value());
                        on_read(level);
                    }
                    Err(e) => warn!("Integrity poll failed: {}", e),
                }
            }
        });
        PollHandle { task: Some(task) }
    }
}

/// Owns the polling task. Stopping (or dropping) aborts it.
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
