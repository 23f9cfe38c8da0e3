use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{GatorError, Result};
use crate::config::Config;
use crate::domain::User;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match config.database_path.clone() {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.fetch)?);

        Ok(Self {
            config,
            store,
            fetcher,
        })
    }

    /// Resolve the user named in the config against the store.
    pub fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user
            .as_deref()
            .ok_or(GatorError::NotLoggedIn)?;

        self.store
            .get_user_by_name(name)?
            .ok_or_else(|| GatorError::UserNotFound(name.to_string()))
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| GatorError::Other("Could not find data directory".into()))?;
        let gator_dir = data_dir.join("gator");
        std::fs::create_dir_all(&gator_dir)?;
        Ok(gator_dir.join("gator.db"))
    }
}
