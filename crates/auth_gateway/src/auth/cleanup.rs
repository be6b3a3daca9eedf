//! Background session eviction.
//!
//! Only spawned when a session TTL is configured.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

use super::session::SessionStore;

/// Default cleanup interval in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Spawn a task that periodically evicts expired sessions.
///
/// Returns a `JoinHandle` that can be used to abort the task.
pub fn spawn_cleanup_task(
    session_store: Arc<dyn SessionStore>,
    cleanup_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(cleanup_interval);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_cleanup_pass(session_store.as_ref()).await;
        }
    })
}

async fn run_cleanup_pass(session_store: &dyn SessionStore) -> usize {
    let evicted = match session_store.evict_expired().await {
        Ok(count) => {
            if count > 0 {
                info!(evicted = count, "Session cleanup completed");
            } else {
                debug!("Session cleanup: no expired sessions");
            }
            count
        }
        Err(e) => {
            warn!(error = %e, "Session cleanup failed");
            0
        }
    };

    if let Ok(count) = session_store.len().await {
        debug!(active_sessions = count, "Session store status");
    }

    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::InMemorySessionStore;

    #[tokio::test]
    async fn test_cleanup_pass_without_ttl_is_noop() {
        let store = InMemorySessionStore::new();
        store.put("S1", "", "http://app/tasks").await.unwrap();

        assert_eq!(run_cleanup_pass(&store).await, 0);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_task_evicts_expired_sessions() {
        let store = Arc::new(InMemorySessionStore::with_ttl(chrono::Duration::milliseconds(10)));
        store.put("S1", "T1", "").await.unwrap();

        let handle = spawn_cleanup_task(store.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert_eq!(store.len().await.unwrap(), 0);
    }
}
