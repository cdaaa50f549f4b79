//! Keeps a storage backend connected, flipping the shared degraded flag
//! whenever health checks fail and reconnection does not help.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{match_store::MatchStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Doubling retry delay capped at a configured ceiling.
struct Backoff {
    delay: Duration,
    max: Duration,
}

impl Backoff {
    fn new(max: Duration) -> Self {
        Self {
            delay: INITIAL_RETRY_DELAY,
            max,
        }
    }

    fn reset(&mut self) {
        self.delay = INITIAL_RETRY_DELAY;
    }

    /// Sleep for the current delay, then double it up to the ceiling.
    async fn wait(&mut self) {
        sleep(self.delay).await;
        self.delay = (self.delay * 2).min(self.max);
    }
}

/// Supervise the storage backend: connect with backoff, install the store,
/// then watch its health until the connection is beyond repair and a fresh
/// backend has to be built.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MatchStore>, StorageError>> + Send,
{
    let mut backoff = Backoff::new(state.config().storage_retry_max);

    loop {
        match connect().await {
            Ok(store) => {
                let backend = store.backend_name();
                state.install_match_store(store.clone()).await;
                info!(backend, "storage backend installed; leaving degraded mode");
                backoff.reset();

                watch_health(&state, store).await;
                warn!(backend, "storage backend lost; rebuilding the connection");
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
            }
        }
        backoff.wait().await;
    }
}

/// Poll the installed store until reconnection attempts are exhausted.
async fn watch_health(state: &SharedState, store: Arc<dyn MatchStore>) {
    let poll_interval = state.config().storage_poll_interval;

    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                if !try_reconnect(state, &store).await {
                    return;
                }
            }
        }
        sleep(poll_interval).await;
    }
}

/// Run the configured number of in-place reconnect attempts. The first
/// failure flips the degraded flag; success clears it again.
async fn try_reconnect(state: &SharedState, store: &Arc<dyn MatchStore>) -> bool {
    let max_attempts = state.config().storage_reconnect_attempts;
    let mut backoff = Backoff::new(state.config().storage_retry_max);

    for attempt in 0..max_attempts {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnect succeeded");
                state.update_degraded(false).await;
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(error = %err, "storage reconnect failed; entering degraded mode");
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                backoff.wait().await;
            }
        }
    }

    warn!(max_attempts, "exhausted storage reconnect attempts");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_up_to_the_ceiling() {
        let mut backoff = Backoff::new(Duration::from_secs(4));

        let start = Instant::now();
        backoff.wait().await;
        backoff.wait().await;
        backoff.wait().await;
        backoff.wait().await;
        // 1 + 2 + 4 + 4 seconds once the ceiling is hit.
        assert_eq!(start.elapsed(), Duration::from_secs(11));

        backoff.reset();
        let start = Instant::now();
        backoff.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
