use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    match_store::{MatchStore, UpdateOutcome},
    models::MatchEntity,
    storage::StorageResult,
};

const MATCH_COLLECTION_NAME: &str = "matches";

/// MongoDB-backed match store.
///
/// The conditional update is a single `replace_one` filtered on
/// `{code, version}`, so the precondition check and the write happen
/// atomically inside the database.
#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

// The database handle keeps its client's topology alive internally.
struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.database = database;
        Ok(())
    }
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"code": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("match_code_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "code",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MatchEntity> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MatchEntity>(MATCH_COLLECTION_NAME)
    }

    async fn insert_match(&self, entity: MatchEntity) -> MongoResult<()> {
        let code = entity.code.clone();
        let collection = self.collection().await;
        collection
            .insert_one(&entity)
            .await
            .map_err(|source| MongoDaoError::InsertMatch { code, source })?;
        Ok(())
    }

    async fn find_match(&self, code: String) -> MongoResult<Option<MatchEntity>> {
        let collection = self.collection().await;
        collection
            .find_one(doc! { "code": &code })
            .await
            .map_err(|source| MongoDaoError::LoadMatch { code, source })
    }

    async fn list_open_matches(&self) -> MongoResult<Vec<MatchEntity>> {
        let collection = self.collection().await;
        let cursor = collection
            .find(doc! { "status": { "$in": ["pending", "active"] } })
            .await
            .map_err(|source| MongoDaoError::ListMatches { source })?;
        cursor
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListMatches { source })
    }

    async fn update_match(
        &self,
        code: String,
        expected_version: u64,
        entity: MatchEntity,
    ) -> MongoResult<UpdateOutcome> {
        let collection = self.collection().await;
        let result = collection
            .replace_one(
                doc! { "code": &code, "version": expected_version as i64 },
                &entity,
            )
            .await
            .map_err(|source| MongoDaoError::UpdateMatch { code, source })?;

        if result.matched_count > 0 {
            Ok(UpdateOutcome::Applied)
        } else {
            Ok(UpdateOutcome::PredicateFailed)
        }
    }
}

impl MatchStore for MongoMatchStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_match(entity).await.map_err(Into::into) })
    }

    fn list_open_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_open_matches().await.map_err(Into::into) })
    }

    fn find_match(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        let code = code.to_owned();
        Box::pin(async move { store.find_match(code).await.map_err(Into::into) })
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
            store
                .update_match(code, expected_version, entity)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
