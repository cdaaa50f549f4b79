pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::{models::MatchEntity, storage::StorageResult};

/// Result of a versioned conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The stored version matched and the replacement was written.
    Applied,
    /// The record changed (or disappeared) since it was read; nothing was
    /// written. The caller re-reads and retries.
    PredicateFailed,
}

/// Abstraction over the persistence layer for match records.
///
/// `update_match` is the concurrency-critical operation: the version check
/// and the write must be one indivisible step so that two near-simultaneous
/// mutations (two participants racing to buzz, or a timeout timer racing an
/// answer) can never both observe the same starting state and both win.
pub trait MatchStore: Send + Sync {
    /// Short name of the backing technology, surfaced by the health report.
    fn backend_name(&self) -> &'static str;
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_match(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Every match still in a non-terminal status; feeds the stall sweep
    /// that recovers timers lost to a restart.
    fn list_open_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    /// Replace the stored entity only if its version still equals
    /// `expected_version`. The replacement carries `expected_version + 1`.
    fn update_match(
        &self,
        code: &str,
        expected_version: u64,
        entity: MatchEntity,
    ) -> BoxFuture<'static, StorageResult<UpdateOutcome>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
