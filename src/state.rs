use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::metadata::MetadataRegistry;
use crate::services::{AuthService, GeodataService, SeaOrmAuthService, SeaOrmGeodataService};

/// Services shared by the HTTP server and the CLI commands.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub registry: MetadataRegistry,

    pub geodata_service: Arc<dyn GeodataService>,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    /// Connects the store and registers the OGC metadata parsers.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let registry = MetadataRegistry::with_ogc_services(&config.metadata)?;
        Self::with_registry(config, registry).await
    }

    /// Like [`SharedState::new`] with a caller-provided set of parsers.
    pub async fn with_registry(
        config: Config,
        registry: MetadataRegistry,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let geodata_service = Arc::new(SeaOrmGeodataService::new(
            store.clone(),
            registry.clone(),
        )) as Arc<dyn GeodataService>;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            registry,
            geodata_service,
            auth_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
