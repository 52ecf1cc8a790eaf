//! In-process backend keeping entities as JSON documents.
//!
//! Filters and ordering resolve against the serialized field names of the
//! entity, so the id must serialize as `id` and every name in
//! [`Entity::FIELDS`] must match its serialized key. Names outside that list
//! are rejected as invalid queries. Sessions write through to the shared
//! store; `flush` only records that it happened.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::query::{Direction, Ordering, Query, QueryValue};
use crate::core::traits::{
    PersistenceError, PersistenceResult, Session, SessionFactory, SessionHandle,
};
use crate::core::Entity;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Value>,
}

#[derive(Debug, Default)]
struct Store {
    tables: HashMap<&'static str, Table>,
    pending_failure: Option<String>,
}

impl Store {
    /// Consume an armed failure, if any
    fn check(&mut self) -> PersistenceResult<()> {
        match self.pending_failure.take() {
            Some(message) => Err(PersistenceError::Backend(message)),
            None => Ok(()),
        }
    }

    fn table(&mut self, kind: &'static str) -> &mut Table {
        self.tables.entry(kind).or_default()
    }
}

#[derive(Debug, Default)]
struct Stats {
    sessions_opened: AtomicU64,
    flushes: AtomicU64,
}

/// Shared in-memory store; every clone sees the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    store: Arc<Mutex<Store>>,
    stats: Arc<Stats>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next session operation fail with `message`
    pub async fn fail_next(&self, message: impl Into<String>) {
        self.store.lock().await.pending_failure = Some(message.into());
    }

    /// Number of stored rows for an entity kind
    pub async fn row_count(&self, kind: &str) -> usize {
        self.store
            .lock()
            .await
            .tables
            .get(kind)
            .map_or(0, |table| table.rows.len())
    }

    pub fn sessions_opened(&self) -> u64 {
        self.stats.sessions_opened.load(AtomicOrdering::SeqCst)
    }

    pub fn flushes(&self) -> u64 {
        self.stats.flushes.load(AtomicOrdering::SeqCst)
    }
}

impl SessionFactory for MemoryBackend {
    type Session = MemorySession;

    fn open_session(&self) -> MemorySession {
        self.stats.sessions_opened.fetch_add(1, AtomicOrdering::SeqCst);
        MemorySession {
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
            closed: false,
        }
    }
}

pub struct MemorySession {
    store: Arc<Mutex<Store>>,
    stats: Arc<Stats>,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> PersistenceResult<()> {
        if self.closed {
            return Err(PersistenceError::SessionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionHandle for MemorySession {
    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn flush(&mut self) -> PersistenceResult<()> {
        self.ensure_open()?;
        self.store.lock().await.check()?;
        self.stats.flushes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> PersistenceResult<()> {
        if self.closed {
            return Ok(());
        }
        self.stats.flushes.fetch_add(1, AtomicOrdering::SeqCst);
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl<K> Session<K> for MemorySession
where
    K: Entity + Serialize + DeserializeOwned,
{
    async fn persist(&mut self, entity: &K) -> PersistenceResult<i64> {
        self.ensure_open()?;
        let mut store = self.store.lock().await;
        store.check()?;

        let table = store.table(K::KIND);
        let id = table.next_id + 1;
        let mut stored = entity.clone();
        stored.assign_id(id);
        let document = serde_json::to_value(&stored)?;

        table.next_id = id;
        table.rows.insert(id, document);
        Ok(id)
    }

    async fn find(&mut self, id: i64, validate: bool) -> PersistenceResult<Option<K>> {
        self.ensure_open()?;
        let mut store = self.store.lock().await;
        store.check()?;

        match store.table(K::KIND).rows.get(&id) {
            Some(document) => Ok(Some(serde_json::from_value(document.clone())?)),
            None if validate => Err(PersistenceError::ObjectNotFound { kind: K::KIND, id }),
            None => Ok(None),
        }
    }

    async fn merge(&mut self, entity: &K) -> PersistenceResult<()> {
        self.ensure_open()?;
        let id = entity.id().ok_or_else(|| {
            PersistenceError::Backend(format!("cannot merge unidentified {}", K::KIND))
        })?;

        let mut store = self.store.lock().await;
        store.check()?;

        let document = serde_json::to_value(entity)?;
        match store.table(K::KIND).rows.get_mut(&id) {
            Some(row) => {
                *row = document;
                Ok(())
            }
            None => Err(PersistenceError::ObjectNotFound { kind: K::KIND, id }),
        }
    }

    async fn delete(&mut self, id: i64) -> PersistenceResult<()> {
        self.ensure_open()?;
        let mut store = self.store.lock().await;
        store.check()?;

        match store.table(K::KIND).rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(PersistenceError::ObjectNotFound { kind: K::KIND, id }),
        }
    }

    async fn fetch_all(&mut self, query: &Query) -> PersistenceResult<Vec<K>> {
        self.ensure_open()?;
        check_fields::<K>(query)?;
        let mut store = self.store.lock().await;
        store.check()?;

        let mut matches = matching_ids(store.table(K::KIND), query);
        sort_ids(store.table(K::KIND), &mut matches, query.ordering());

        let table = store.table(K::KIND);
        let window = match query.get_range() {
            Some(range) => matches
                .into_iter()
                .skip(to_usize(range.offset))
                .take(to_usize(range.limit))
                .collect(),
            None => matches,
        };

        window
            .into_iter()
            .filter_map(|id| table.rows.get(&id))
            .map(|document| serde_json::from_value(document.clone()).map_err(Into::into))
            .collect()
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
        self.ensure_open()?;
        check_fields::<K>(query)?;
        let mut store = self.store.lock().await;
        store.check()?;

        let table = store.table(K::KIND);
        let ids = matching_ids(table, query);
        for id in &ids {
            table.rows.remove(id);
        }
        Ok(ids.len() as u64)
    }

    async fn count(&mut self, query: &Query) -> PersistenceResult<u64> {
        self.ensure_open()?;
        check_fields::<K>(query)?;
        let mut store = self.store.lock().await;
        store.check()?;

        Ok(matching_ids(store.table(K::KIND), query).len() as u64)
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn check_fields<K: Entity>(query: &Query) -> PersistenceResult<()> {
    let unknown = query
        .params()
        .keys()
        .map(String::as_str)
        .chain(query.ordering().iter().map(|order| order.field.as_str()))
        .find(|field| !K::has_field(field));

    match unknown {
        Some(field) => Err(PersistenceError::InvalidQuery(format!(
            "unknown field '{}' for {}",
            field,
            K::KIND
        ))),
        None => Ok(()),
    }
}

/// Ids of rows whose fields equal every query parameter, in id order
fn matching_ids(table: &Table, query: &Query) -> Vec<i64> {
    table
        .rows
        .iter()
        .filter(|(_, document)| {
            query
                .params()
                .iter()
                .all(|(field, expected)| field_matches(document.get(field), expected))
        })
        .map(|(id, _)| *id)
        .collect()
}

fn field_matches(actual: Option<&Value>, expected: &QueryValue) -> bool {
    match (actual, expected) {
        (None | Some(Value::Null), QueryValue::Null) => true,
        (Some(Value::Bool(a)), QueryValue::Bool(b)) => a == b,
        (Some(Value::String(a)), QueryValue::Text(b)) => a == b,
        (Some(Value::Number(n)), QueryValue::Int(i)) => {
            n.as_i64() == Some(*i) || n.as_f64() == Some(*i as f64)
        }
        (Some(Value::Number(n)), QueryValue::Float(f)) => n.as_f64() == Some(*f),
        _ => false,
    }
}

/// Stable sort by each ordering in turn; ties keep id order
fn sort_ids(table: &Table, ids: &mut [i64], ordering: &[Ordering]) {
    if ordering.is_empty() {
        return;
    }

    ids.sort_by(|a, b| {
        let left = table.rows.get(a);
        let right = table.rows.get(b);
        ordering
            .iter()
            .map(|order| {
                let cmp = compare_fields(
                    left.and_then(|doc| doc.get(&order.field)),
                    right.and_then(|doc| doc.get(&order.field)),
                );
                match order.direction {
                    Direction::Asc => cmp,
                    Direction::Desc => cmp.reverse(),
                }
            })
            .find(|cmp| *cmp != CmpOrdering::Equal)
            .unwrap_or(CmpOrdering::Equal)
    });
}

/// Missing and null sort first, then booleans, numbers, strings
fn compare_fields(left: Option<&Value>, right: Option<&Value>) -> CmpOrdering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (left, right) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(CmpOrdering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}
