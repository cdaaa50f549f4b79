//! In-memory match store used for tests and storage-less deployments.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    match_store::{MatchStore, UpdateOutcome},
    models::MatchEntity,
    storage::StorageResult,
};

/// Process-local store backed by a [`DashMap`].
///
/// The versioned update runs under the map's per-key shard lock, so the
/// version check and the replacement are a single indivisible step.
#[derive(Clone, Default)]
pub struct InMemoryMatchStore {
    matches: Arc<DashMap<String, MatchEntity>>,
}

impl InMemoryMatchStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for InMemoryMatchStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.matches.insert(entity.code.clone(), entity);
            Ok(())
        })
    }

    fn find_match(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        let code = code.to_owned();
        Box::pin(async move { Ok(store.matches.get(&code).map(|entry| entry.clone())) })
    }

    fn list_open_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .matches
                .iter()
                .filter(|entry| !entry.status.is_terminal())
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn update_match(
        &self,
        code: &str,
        expected_version: u64,
        entity: MatchEntity,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>> {
        let store = self.clone();
        let code = code.to_owned();
        Box::pin(async move {
            // get_mut holds the shard write lock for the whole check-and-swap.
            match store.matches.get_mut(&code) {
                Some(mut stored) if stored.version == expected_version => {
                    *stored = entity;
                    Ok(UpdateOutcome::Applied)
                }
                _ => Ok(UpdateOutcome::PredicateFailed),
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
