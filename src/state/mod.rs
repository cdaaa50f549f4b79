//! Shared application state and the match-domain state modules.

pub mod fanout;
pub mod match_machine;
pub mod match_record;
pub mod scoring;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{config::AppConfig, dao::match_store::MatchStore, error::ServiceError};

pub use self::fanout::{FanOutRegistry, MatchChannel};

/// Cheaply clonable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Broadcast capacity of each per-match fan-out channel.
const FANOUT_CHANNEL_CAPACITY: usize = 32;

/// Central application state storing the store handle and fan-out channels.
pub struct AppState {
    config: AppConfig,
    match_store: RwLock<Option<Arc<dyn MatchStore>>>,
    fanout: FanOutRegistry,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            match_store: RwLock::new(None),
            fanout: FanOutRegistry::new(FANOUT_CHANNEL_CAPACITY),
            degraded: degraded_tx,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn match_store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.match_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the match store or fail with the degraded-mode error.
    pub async fn require_match_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        self.match_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn install_match_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.match_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_match_store(&self) {
        {
            let mut guard = self.match_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag. A store handle may still be installed while
    /// degraded; the flag follows health checks, not handle presence.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        let _ = self.degraded.send_replace(value);
    }

    /// Registry of per-match fan-out channels.
    pub fn fanout(&self) -> &FanOutRegistry {
        &self.fanout
    }
}
