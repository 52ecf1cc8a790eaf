//! MySQL backend built on sqlx transactions.
//!
//! Each session lazily begins one transaction; `flush` commits it and the
//! next operation begins another.

pub mod session;
pub mod sql;

pub use session::{MySqlSession, MySqlSessionFactory};

use sqlx::mysql::MySqlRow;
use sqlx::FromRow;

use crate::core::{Entity, QueryValue};

/// Table mapping for an entity stored in MySQL.
///
/// The primary key column is always `id` (auto-increment BIGINT).
pub trait SqlEntity: Entity + for<'r> FromRow<'r, MySqlRow> + Unpin {
    const TABLE: &'static str;

    /// Non-id columns, in the order [`SqlEntity::column_values`] yields them.
    /// Defaults to the entity's queryable fields.
    const COLUMNS: &'static [&'static str] = <Self as Entity>::FIELDS;

    fn column_values(&self) -> Vec<QueryValue>;
}
