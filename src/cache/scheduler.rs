use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type EvictionTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Delayed-task capability used by stores for proactive TTL eviction.
///
/// Scheduling a key that already has a pending task replaces that task.
pub trait EvictionScheduler: Send + Sync {
    fn schedule(&self, key: &str, delay: Duration, task: EvictionTask);
    fn cancel(&self, key: &str);
}

/// Runs each task on the tokio runtime after `delay`.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks still waiting for their delay.
    pub fn pending(&self) -> usize {
        match self.pending.lock() {
            Ok(pending) => pending.values().filter(|handle| !handle.is_finished()).count(),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
impl TokioScheduler {
    pub(crate) fn tracked(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or_default()
    }
}

impl EvictionScheduler for TokioScheduler {
    fn schedule(&self, key: &str, delay: Duration, task: EvictionTask) {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        match self.pending.lock() {
            Ok(mut pending) => {
                // drop handles of evictions that already ran
                pending.retain(|_, handle| !handle.is_finished());
                if let Some(previous) = pending.insert(key.to_owned(), handle) {
                    previous.abort();
                }
            }
            Err(err) => {
                // the task still runs, it just can't be cancelled by key anymore
                warn!("eviction scheduler lock poisoned, key '{}': {}", key, err);
            }
        }
        debug!("eviction of '{}' scheduled in {:?}", key, delay);
    }

    fn cancel(&self, key: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.remove(key) {
                handle.abort();
                debug!("eviction of '{}' cancelled", key);
            }
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        if let Ok(pending) = self.pending.get_mut() {
            for (_, handle) in pending.drain() {
                handle.abort();
            }
        }
    }
}

/// Disables proactive eviction; stores fall back to expiry checks on read.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScheduler;

impl EvictionScheduler for NoopScheduler {
    fn schedule(&self, _key: &str, _delay: Duration, _task: EvictionTask) {}

    fn cancel(&self, _key: &str) {}
}
