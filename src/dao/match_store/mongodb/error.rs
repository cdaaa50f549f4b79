use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Errors raised by the MongoDB match store backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert match `{code}`")]
    InsertMatch {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load match `{code}`")]
    LoadMatch {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to update match `{code}`")]
    UpdateMatch {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list open matches")]
    ListMatches {
        #[source]
        source: MongoError,
    },
}
