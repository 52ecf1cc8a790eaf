use sqlx::{MySql, QueryBuilder};

use super::SqlEntity;
use crate::core::query::{Query, QueryValue};
use crate::core::traits::{PersistenceError, PersistenceResult};

pub const ID_COLUMN: &str = "id";

pub type SqlBuilder = QueryBuilder<'static, MySql>;

fn check_column<K: SqlEntity>(column: &str) -> PersistenceResult<()> {
    if column == ID_COLUMN || K::COLUMNS.contains(&column) {
        Ok(())
    } else {
        Err(PersistenceError::InvalidQuery(format!(
            "unknown field '{}' for {}",
            column,
            K::KIND
        )))
    }
}

fn select_list<K: SqlEntity>() -> String {
    std::iter::once(ID_COLUMN)
        .chain(K::COLUMNS.iter().copied())
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_value(builder: &mut SqlBuilder, value: &QueryValue) {
    match value {
        QueryValue::Null => builder.push_bind(Option::<String>::None),
        QueryValue::Bool(v) => builder.push_bind(*v),
        QueryValue::Int(v) => builder.push_bind(*v),
        QueryValue::Float(v) => builder.push_bind(*v),
        QueryValue::Text(v) => builder.push_bind(v.clone()),
    };
}

fn entity_values<K: SqlEntity>(entity: &K) -> PersistenceResult<Vec<QueryValue>> {
    let values = entity.column_values();
    if values.len() != K::COLUMNS.len() {
        return Err(PersistenceError::Backend(format!(
            "{} produced {} values for {} columns",
            K::KIND,
            values.len(),
            K::COLUMNS.len()
        )));
    }
    Ok(values)
}

fn push_where<K: SqlEntity>(builder: &mut SqlBuilder, query: &Query) -> PersistenceResult<()> {
    for (index, (field, value)) in query.params().iter().enumerate() {
        check_column::<K>(field)?;
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        builder.push(field);
        if let QueryValue::Null = value {
            builder.push(" IS NULL");
        } else {
            builder.push(" = ");
            push_value(builder, value);
        }
    }
    Ok(())
}

fn push_ordering<K: SqlEntity>(builder: &mut SqlBuilder, query: &Query) -> PersistenceResult<()> {
    if query.ordering().is_empty() {
        // deterministic paging without an explicit order
        builder.push(" ORDER BY ");
        builder.push(ID_COLUMN);
        return Ok(());
    }

    for (index, order) in query.ordering().iter().enumerate() {
        check_column::<K>(&order.field)?;
        builder.push(if index == 0 { " ORDER BY " } else { ", " });
        builder.push(&order.field);
        builder.push(" ");
        builder.push(order.direction.as_sql());
    }
    Ok(())
}

pub fn insert<K: SqlEntity>(entity: &K) -> PersistenceResult<SqlBuilder> {
    let values = entity_values(entity)?;
    let mut builder = SqlBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES (",
        K::TABLE,
        K::COLUMNS.join(", ")
    ));
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        push_value(&mut builder, value);
    }
    builder.push(")");
    Ok(builder)
}

pub fn select_by_id<K: SqlEntity>(id: i64) -> SqlBuilder {
    let mut builder = SqlBuilder::new(format!(
        "SELECT {} FROM {} WHERE {} = ",
        select_list::<K>(),
        K::TABLE,
        ID_COLUMN
    ));
    builder.push_bind(id);
    builder
}

pub fn update<K: SqlEntity>(entity: &K, id: i64) -> PersistenceResult<SqlBuilder> {
    let values = entity_values(entity)?;
    let mut builder = SqlBuilder::new(format!("UPDATE {} SET ", K::TABLE));
    for (index, (column, value)) in K::COLUMNS.iter().zip(values.iter()).enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        builder.push(*column);
        builder.push(" = ");
        push_value(&mut builder, value);
    }
    builder.push(format!(" WHERE {} = ", ID_COLUMN));
    builder.push_bind(id);
    Ok(builder)
}

pub fn delete_by_id<K: SqlEntity>(id: i64) -> SqlBuilder {
    let mut builder = SqlBuilder::new(format!("DELETE FROM {} WHERE {} = ", K::TABLE, ID_COLUMN));
    builder.push_bind(id);
    builder
}

/// SELECT honouring filters, ordering and range
pub fn select<K: SqlEntity>(query: &Query) -> PersistenceResult<SqlBuilder> {
    let mut builder = SqlBuilder::new(format!("SELECT {} FROM {}", select_list::<K>(), K::TABLE));
    push_where::<K>(&mut builder, query)?;
    push_ordering::<K>(&mut builder, query)?;
    if let Some(range) = query.get_range() {
        builder.push(" LIMIT ");
        builder.push_bind(range.limit);
        builder.push(" OFFSET ");
        builder.push_bind(range.offset);
    }
    Ok(builder)
}

/// DELETE over the filters only; range and ordering are not emitted
pub fn delete_matching<K: SqlEntity>(query: &Query) -> PersistenceResult<SqlBuilder> {
    let mut builder = SqlBuilder::new(format!("DELETE FROM {}", K::TABLE));
    push_where::<K>(&mut builder, query)?;
    Ok(builder)
}

/// COUNT over the filters only; range and ordering are not emitted
pub fn count<K: SqlEntity>(query: &Query) -> PersistenceResult<SqlBuilder> {
    let mut builder = SqlBuilder::new(format!("SELECT COUNT(*) FROM {}", K::TABLE));
    push_where::<K>(&mut builder, query)?;
    Ok(builder)
}
