use async_trait::async_trait;

use crate::core::entity::Entity;
use crate::core::query::Query;

pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;

/// Errors raised by persistence backends.
///
/// Only the repository turns these into [`crate::core::AppError`].
#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    /// No row of `kind` with this id; raised by validating lookups
    #[error("{kind} with id {id} not found")]
    ObjectNotFound { kind: &'static str, id: i64 },

    /// A unique lookup matched more than one row
    #[error("unique query for {kind} matched {count} rows")]
    NonUnique { kind: &'static str, count: u64 },

    /// Query references something the backend cannot resolve
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("session is closed")]
    SessionClosed,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}

/// Opens session handles into a persistence backend
pub trait SessionFactory: Clone + Send + Sync + 'static {
    type Session: SessionHandle;

    /// Create a new, unused session. Backends defer any connection work
    /// until the session's first operation.
    fn open_session(&self) -> Self::Session;
}

/// Lifecycle of a session, independent of the entity types it serves
#[async_trait]
pub trait SessionHandle: Send {
    fn is_closed(&self) -> bool;

    /// Push pending writes to the backend
    async fn flush(&mut self) -> PersistenceResult<()>;

    /// Flush, then release the session. Closing twice is a no-op.
    async fn close(&mut self) -> PersistenceResult<()>;
}

/// Entity-level operations a session supports for `K`
#[async_trait]
pub trait Session<K: Entity>: SessionHandle {
    /// Store a new entity and return its generated id
    async fn persist(&mut self, entity: &K) -> PersistenceResult<i64>;

    /// Load by id. With `validate`, a missing row is
    /// [`PersistenceError::ObjectNotFound`]; without it, `Ok(None)`.
    async fn find(&mut self, id: i64, validate: bool) -> PersistenceResult<Option<K>>;

    /// Write an already-identified entity back
    async fn merge(&mut self, entity: &K) -> PersistenceResult<()>;

    /// Remove by id; a missing row is [`PersistenceError::ObjectNotFound`]
    async fn delete(&mut self, id: i64) -> PersistenceResult<()>;

    async fn fetch_all(&mut self, query: &Query) -> PersistenceResult<Vec<K>>;

    /// At most one match; more is [`PersistenceError::NonUnique`]
    async fn fetch_unique(&mut self, query: &Query) -> PersistenceResult<Option<K>>;

    /// Remove every match, ignoring any range. Returns the number removed.
    async fn delete_all(&mut self, query: &Query) -> PersistenceResult<u64>;

    /// Number of matches, ignoring any range
    async fn count(&mut self, query: &Query) -> PersistenceResult<u64>;

    fn detach(&self, entity: &K) -> K {
        entity.clone()
    }

    fn detach_all(&self, entities: &[K]) -> Vec<K> {
        entities.iter().map(|entity| self.detach(entity)).collect()
    }
}
