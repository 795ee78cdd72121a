use std::sync::Arc;

use crate::config::{AppConfig, AuthConfig};
use crate::store::{MemStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(PgStore::connect(&config.database_url).await?) as Arc<dyn Store>;
        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// State over the in-memory store, for tests.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: "mem".into(),
            auth: AuthConfig {
                password_salt: "test-salt".into(),
                token_ttl_minutes: 10,
            },
        });
        let store = Arc::new(MemStore::new()) as Arc<dyn Store>;
        Self { store, config }
    }
}
