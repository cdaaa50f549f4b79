mod connection;
mod error;
pub mod config;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoMatchStore;

use crate::dao::storage::{MatchOp, StorageError};

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::InsertMatch { code, source } => {
                StorageError::match_op(MatchOp::Insert, code, source)
            }
            MongoDaoError::LoadMatch { code, source } => {
                StorageError::match_op(MatchOp::Load, code, source)
            }
            MongoDaoError::UpdateMatch { code, source } => {
                StorageError::match_op(MatchOp::Update, code, source)
            }
            MongoDaoError::ListMatches { source } => StorageError::scan(source),
            other => {
                let message = other.to_string();
                StorageError::unreachable(message, other)
            }
        }
    }
}
