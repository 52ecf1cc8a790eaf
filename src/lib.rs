//! RestNucleus data-access library
//!
//! Generic CRUD, query and paging over a pluggable persistence session, with
//! error kinds that render as HTTP responses and logger injection for
//! managed objects.

pub mod config;
pub mod core;
pub mod logging;
pub mod persistence;

// Re-export commonly used types
pub use crate::core::{AppError, Direction, Entity, Query, QueryValue, Range, Result};
pub use crate::persistence::{
    GenericRepository, MemoryBackend, MySqlSessionFactory, Page, RepositoryFactory, SqlEntity,
};
