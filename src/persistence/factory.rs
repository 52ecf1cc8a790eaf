use crate::config::DatabaseConfig;
use crate::core::traits::SessionFactory;
use crate::core::Result;
use crate::logging::LoggerInjector;
use crate::persistence::generic_repository::GenericRepository;
use crate::persistence::mysql::MySqlSessionFactory;

/// Builds request-scoped repositories over one session factory.
///
/// Every repository handed out gets a logger scoped to
/// [`GenericRepository`] installed exactly once.
#[derive(Clone)]
pub struct RepositoryFactory<F: SessionFactory> {
    sessions: F,
    injector: LoggerInjector<GenericRepository<F>>,
}

impl<F: SessionFactory> RepositoryFactory<F> {
    pub fn new(sessions: F) -> Self {
        Self {
            sessions,
            injector: LoggerInjector::new(),
        }
    }

    pub fn session_factory(&self) -> &F {
        &self.sessions
    }

    pub fn repository(&self) -> Result<GenericRepository<F>> {
        self.injector
            .construct(GenericRepository::new(self.sessions.clone()))
    }
}

impl RepositoryFactory<MySqlSessionFactory> {
    /// Connect to MySQL using the given configuration
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        let pool = config.create_pool().await?;
        Ok(Self::new(MySqlSessionFactory::new(pool)))
    }
}
