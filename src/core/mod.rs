pub mod entity;
pub mod error;
pub mod query;
pub mod traits;

pub use entity::{Entity, ID_FIELD};
pub use error::{AppError, Result};
pub use query::{Direction, Ordering, Query, QueryValue, Range};
