//! Generic CRUD, query and paging gateway over a persistence session.
//!
//! A [`GenericRepository`] owns at most one session handle. The handle is
//! opened on first use, reused until closed, and replaced after a backend
//! failure. Every operation takes `&mut self`: a repository serves one
//! logical request and is never shared between concurrent callers.

use crate::core::query::{Query, Range, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::core::traits::{PersistenceError, Session, SessionFactory, SessionHandle};
use crate::core::{AppError, Entity, Result};
use crate::logging::{LoggerAware, LoggerSlot};
use crate::persistence::page::Page;

/// Convert an optional identifier into a usable one.
///
/// A missing id is malformed caller input.
pub fn require_id(id: Option<i64>) -> Result<i64> {
    id.ok_or_else(|| AppError::bad_request("id == null"))
}

pub struct GenericRepository<F: SessionFactory> {
    factory: F,
    session: Option<F::Session>,
    logger: LoggerSlot,
}

impl<F: SessionFactory> LoggerAware for GenericRepository<F> {
    fn logger_slot(&self) -> &LoggerSlot {
        &self.logger
    }
}

impl<F: SessionFactory> GenericRepository<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            session: None,
            logger: LoggerSlot::new(),
        }
    }

    pub fn has_open_session(&self) -> bool {
        self.active_session().is_some()
    }

    fn session(&mut self) -> &mut F::Session {
        if matches!(&self.session, Some(session) if session.is_closed()) {
            self.session = None;
        }

        let factory = &self.factory;
        self.session.get_or_insert_with(|| {
            tracing::debug!("Opening persistence session");
            factory.open_session()
        })
    }

    /// Push pending writes without closing the session
    pub async fn flush(&mut self) -> Result<()> {
        let result = self.session().flush().await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail("flush", e).await),
        }
    }

    /// Flush and close the session. Call once no session-attached entity is
    /// needed any more; detached copies stay usable.
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        if session.is_closed() {
            return Ok(());
        }

        session.close().await.map_err(|e| {
            self.log_failure("close", &e.to_string());
            AppError::internal(e.to_string())
        })
    }

    /// Close the session after a backend failure. Errors while closing are
    /// logged and dropped; the next call opens a fresh session either way.
    async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            if !session.is_closed() {
                if let Err(e) = session.close().await {
                    tracing::warn!(error = %e, "Failed to close session after backend failure");
                }
            }
        }
    }

    fn log_failure(&self, operation: &str, message: &str) {
        match self.logger.get() {
            Some(logger) => logger.error(format_args!("{} failed: {}", operation, message)),
            None => tracing::error!(operation, "Repository operation failed: {}", message),
        }
    }

    /// Map a backend error onto the public error kinds.
    ///
    /// Expected conditions keep the session open. Anything else closes it
    /// and becomes `Internal` carrying the backend message.
    async fn fail(&mut self, operation: &str, err: PersistenceError) -> AppError {
        match err {
            PersistenceError::ObjectNotFound { id, .. } => {
                AppError::not_found(format!("No entity found with id: {}", id))
            }
            PersistenceError::InvalidQuery(message) => AppError::bad_request(message),
            other => {
                let message = other.to_string();
                self.release().await;
                self.log_failure(operation, &message);
                AppError::internal(message)
            }
        }
    }

    /// Persist a new entity and assign its generated id.
    ///
    /// An entity that already carries an id is a conflict and is not written.
    pub async fn add<K>(&mut self, entity: &mut K) -> Result<i64>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        if entity.is_identified() {
            return Err(AppError::conflict("object contains id already!"));
        }

        let result = <F::Session as Session<K>>::persist(self.session(), &*entity).await;
        match result {
            Ok(id) => {
                entity.assign_id(id);
                tracing::debug!(kind = K::KIND, id, "Entity persisted");
                Ok(id)
            }
            Err(e) => Err(self.fail("add", e).await),
        }
    }

    async fn lookup<K>(&mut self, id: i64, validate: bool) -> Result<Option<K>>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let result = <F::Session as Session<K>>::find(self.session(), id, validate).await;
        match result {
            Ok(found) => Ok(found),
            Err(e) => Err(self.fail("get_by_id", e).await),
        }
    }

    /// Load an entity by id; a missing row is `NotFound`, a missing id
    /// `BadRequest`
    pub async fn get_by_id<K>(&mut self, id: impl Into<Option<i64>>) -> Result<K>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let id = require_id(id.into())?;
        self.lookup::<K>(id, true)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No entity found with id: {}", id)))
    }

    /// Non-validating lookup: a missing row is `Ok(None)`
    pub async fn find_by_id<K>(&mut self, id: impl Into<Option<i64>>) -> Result<Option<K>>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let id = require_id(id.into())?;
        self.lookup::<K>(id, false).await
    }

    /// Whether a row with this id exists; no id never does
    pub async fn exists<K>(&mut self, id: impl Into<Option<i64>>) -> Result<bool>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let Some(id) = id.into() else {
            return Ok(false);
        };

        Ok(self.lookup::<K>(id, false).await?.is_some())
    }

    /// Apply `entity` onto the persisted instance with the same id.
    ///
    /// The persisted instance absorbs the incoming fields through
    /// [`Entity::update`] and keeps its own id. Returns the merged instance.
    pub async fn update<K>(&mut self, entity: &K) -> Result<K>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let id = require_id(entity.id())?;
        let mut current = self.get_by_id::<K>(id).await?;
        current.update(entity);
        current.assign_id(id);

        let result = <F::Session as Session<K>>::merge(self.session(), &current).await;
        match result {
            Ok(()) => Ok(current),
            Err(e) => Err(self.fail("update", e).await),
        }
    }

    pub async fn delete<K>(&mut self, id: impl Into<Option<i64>>) -> Result<()>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let id = require_id(id.into())?;
        let result = <F::Session as Session<K>>::delete(self.session(), id).await;
        match result {
            Ok(()) => {
                tracing::debug!(kind = K::KIND, id, "Entity deleted");
                Ok(())
            }
            Err(e) => Err(self.fail("delete", e).await),
        }
    }

    /// Run a query expected to match at most one row.
    ///
    /// A missing query is `NotFound`. With `validate`, so is an empty result.
    pub async fn query_one<K>(&mut self, query: Option<&Query>, validate: bool) -> Result<Option<K>>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let query = query.ok_or_else(|| AppError::not_found("no query provided"))?;

        let result = <F::Session as Session<K>>::fetch_unique(self.session(), query).await;
        let found = match result {
            Ok(found) => found,
            Err(e) => return Err(self.fail("query_one", e).await),
        };

        if validate && found.is_none() {
            return Err(AppError::not_found("No entity found for this query"));
        }

        Ok(found)
    }

    /// Validating single-row query
    pub async fn query_entity<K>(&mut self, query: Option<&Query>) -> Result<K>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        self.query_one::<K>(query, true)
            .await?
            .ok_or_else(|| AppError::not_found("No entity found for this query"))
    }

    /// All matches in query order. `None` means [`Query::all`].
    pub async fn query_many<K>(&mut self, query: Option<&Query>) -> Result<Vec<K>>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let default_query = Query::all();
        let query = query.unwrap_or(&default_query);

        let result = <F::Session as Session<K>>::fetch_all(self.session(), query).await;
        match result {
            Ok(rows) => Ok(rows),
            Err(e) => Err(self.fail("query_many", e).await),
        }
    }

    /// Remove every row matched by the query's filters; its range is ignored
    pub async fn query_delete<K>(&mut self, query: Option<&Query>) -> Result<u64>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let query = query
            .ok_or_else(|| AppError::not_found("no query provided"))?
            .without_range();

        let result = <F::Session as Session<K>>::delete_all(self.session(), &query).await;
        match result {
            Ok(removed) => {
                tracing::debug!(kind = K::KIND, removed, "Query delete completed");
                Ok(removed)
            }
            Err(e) => Err(self.fail("query_delete", e).await),
        }
    }

    /// Total matches for the query's filters; `None` counts every row
    pub async fn count<K>(&mut self, query: Option<&Query>) -> Result<u64>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let query = query.map(Query::without_range).unwrap_or_default();

        let result = <F::Session as Session<K>>::count(self.session(), &query).await;
        match result {
            Ok(total) => Ok(total),
            Err(e) => Err(self.fail("count", e).await),
        }
    }

    /// One page of matches plus the total count.
    ///
    /// Uses the query's range, or the first [`DEFAULT_PAGE_SIZE`] rows when
    /// it has none. The page size is capped at [`MAX_PAGE_SIZE`].
    pub async fn query_page<K>(&mut self, query: Option<&Query>) -> Result<Page<K>>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        let base = query.cloned().unwrap_or_default();
        let requested = base.get_range().unwrap_or(Range::new(0, DEFAULT_PAGE_SIZE));
        let limit = requested.limit.clamp(1, MAX_PAGE_SIZE);

        let windowed = base.clone().range(requested.offset, limit);
        let items = self.query_many::<K>(Some(&windowed)).await?;
        let total = self.count::<K>(Some(&base)).await?;

        Ok(Page {
            items,
            total,
            offset: requested.offset,
            limit,
        })
    }

    /// The current session, if one is open. Never opens one.
    fn active_session(&self) -> Option<&F::Session> {
        self.session.as_ref().filter(|session| !session.is_closed())
    }

    /// Copy of `entity` that is independent of the session.
    ///
    /// Without an open session there is nothing to detach from, so this is
    /// a plain clone.
    pub fn detach<K>(&self, entity: &K) -> K
    where
        K: Entity,
        F::Session: Session<K>,
    {
        match self.active_session() {
            Some(session) => <F::Session as Session<K>>::detach(session, entity),
            None => entity.clone(),
        }
    }

    pub fn detach_all<K>(&self, entities: &[K]) -> Vec<K>
    where
        K: Entity,
        F::Session: Session<K>,
    {
        match self.active_session() {
            Some(session) => <F::Session as Session<K>>::detach_all(session, entities),
            None => entities.to_vec(),
        }
    }
}

impl<F: SessionFactory> Drop for GenericRepository<F> {
    fn drop(&mut self) {
        if self.has_open_session() {
            tracing::warn!("Repository dropped with an open session; unflushed writes may be lost");
        }
    }
}
