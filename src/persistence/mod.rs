pub mod factory;
pub mod generic_repository;
pub mod memory;
pub mod mysql;
pub mod page;

pub use factory::RepositoryFactory;
pub use generic_repository::{require_id, GenericRepository};
pub use memory::{MemoryBackend, MemorySession};
pub use mysql::{MySqlSession, MySqlSessionFactory, SqlEntity};
pub use page::Page;
