use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default page size used when a paged query carries no range
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Upper bound on the page size accepted by paged queries
pub const MAX_PAGE_SIZE: u64 = 100;

/// A filter value bound to a query parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Null => write!(f, "NULL"),
            QueryValue::Bool(v) => write!(f, "{}", v),
            QueryValue::Int(v) => write!(f, "{}", v),
            QueryValue::Float(v) => write!(f, "{}", v),
            QueryValue::Text(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Int(value.into())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(QueryValue::Null)
    }
}

/// Result window: skip `offset` rows, return at most `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub offset: u64,
    pub limit: u64,
}

impl Range {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    pub direction: Direction,
}

/// Query descriptor scoped to one entity type at execution time.
///
/// Parameters are equality filters keyed by field name. A query without
/// parameters matches every row of the entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    params: BTreeMap<String, QueryValue>,
    range: Option<Range>,
    ordering: Vec<Ordering>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match-all query with no range or ordering
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.params.insert(field.into(), value.into());
        self
    }

    pub fn range(mut self, offset: u64, limit: u64) -> Self {
        self.range = Some(Range::new(offset, limit));
        self
    }

    /// Zero-based page window of `size` rows
    pub fn page(self, index: u64, size: u64) -> Self {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        self.range(index.saturating_mul(size), size)
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.ordering.push(Ordering {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn params(&self) -> &BTreeMap<String, QueryValue> {
        &self.params
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn get_range(&self) -> Option<Range> {
        self.range
    }

    pub fn ordering(&self) -> &[Ordering] {
        &self.ordering
    }

    /// Copy of this query with the range removed, used for counting and bulk deletes
    pub fn without_range(&self) -> Self {
        Self {
            range: None,
            ..self.clone()
        }
    }
}
