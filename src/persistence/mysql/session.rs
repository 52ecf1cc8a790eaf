use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, Transaction};

use super::{sql, SqlEntity};
use crate::core::query::Query;
use crate::core::traits::{
    PersistenceError, PersistenceResult, Session, SessionFactory, SessionHandle,
};

/// Opens [`MySqlSession`]s on a shared connection pool
#[derive(Debug, Clone)]
pub struct MySqlSessionFactory {
    pool: MySqlPool,
}

impl MySqlSessionFactory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

impl SessionFactory for MySqlSessionFactory {
    type Session = MySqlSession;

    fn open_session(&self) -> MySqlSession {
        MySqlSession {
            pool: self.pool.clone(),
            tx: None,
            closed: false,
        }
    }
}

/// Session backed by one lazily started transaction.
///
/// Dropping the session without closing it rolls the open transaction back.
pub struct MySqlSession {
    pool: MySqlPool,
    tx: Option<Transaction<'static, MySql>>,
    closed: bool,
}

impl MySqlSession {
    async fn transaction(&mut self) -> PersistenceResult<&mut Transaction<'static, MySql>> {
        if self.closed {
            return Err(PersistenceError::SessionClosed);
        }

        if self.tx.is_none() {
            let tx = self.pool.begin().await?;
            tracing::debug!("Began MySQL transaction");
            self.tx = Some(tx);
        }

        self.tx.as_mut().ok_or(PersistenceError::SessionClosed)
    }

    async fn commit(&mut self) -> PersistenceResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            tracing::debug!("Committed MySQL transaction");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionHandle for MySqlSession {
    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn flush(&mut self) -> PersistenceResult<()> {
        if self.closed {
            return Err(PersistenceError::SessionClosed);
        }
        self.commit().await
    }

    async fn close(&mut self) -> PersistenceResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.commit().await;
        self.closed = true;
        result
    }
}

#[async_trait]
impl<K: SqlEntity> Session<K> for MySqlSession {
    async fn persist(&mut self, entity: &K) -> PersistenceResult<i64> {
        let mut builder = sql::insert::<K>(entity)?;
        let tx = self.transaction().await?;
        let result = builder.build().execute(&mut **tx).await?;

        i64::try_from(result.last_insert_id()).map_err(|_| {
            PersistenceError::Backend(format!("generated id for {} is out of range", K::KIND))
        })
    }

    async fn find(&mut self, id: i64, validate: bool) -> PersistenceResult<Option<K>> {
        let mut builder = sql::select_by_id::<K>(id);
        let tx = self.transaction().await?;
        let row = builder
            .build_query_as::<K>()
            .fetch_optional(&mut **tx)
            .await?;

        match row {
            None if validate => Err(PersistenceError::ObjectNotFound { kind: K::KIND, id }),
            row => Ok(row),
        }
    }

    async fn merge(&mut self, entity: &K) -> PersistenceResult<()> {
        let id = entity.id().ok_or_else(|| {
            PersistenceError::Backend(format!("cannot merge unidentified {}", K::KIND))
        })?;
        let mut builder = sql::update::<K>(entity, id)?;
        let tx = self.transaction().await?;
        builder.build().execute(&mut **tx).await?;
        Ok(())
    }

    async fn delete(&mut self, id: i64) -> PersistenceResult<()> {
        let mut builder = sql::delete_by_id::<K>(id);
        let tx = self.transaction().await?;
        let result = builder.build().execute(&mut **tx).await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::ObjectNotFound { kind: K::KIND, id });
        }
        Ok(())
    }

    async fn fetch_all(&mut self, query: &Query) -> PersistenceResult<Vec<K>> {
        let mut builder = sql::select::<K>(query)?;
        let tx = self.transaction().await?;
        let rows = builder.build_query_as::<K>().fetch_all(&mut **tx).await?;
        Ok(rows)
    }

    async fn fetch_unique(&mut self, query: &Query) -> PersistenceResult<Option<K>> {
        let mut rows = <Self as Session<K>>::fetch_all(self, query).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => Err(PersistenceError::NonUnique {
                kind: K::KIND,
                count: count as u64,
            }),
        }
    }

    async fn delete_all(&mut self, query: &Query) -> PersistenceResult<u64> {
        let mut builder = sql::delete_matching::<K>(query)?;
        let tx = self.transaction().await?;
        let result = builder.build().execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    async fn count(&mut self, query: &Query) -> PersistenceResult<u64> {
        let mut builder = sql::count::<K>(query)?;
        let tx = self.transaction().await?;
        let total: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&mut **tx)
            .await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }
}
