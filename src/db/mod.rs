use crate::config::SecurityConfig;
use crate::domain::{Envelope, GeodataId, UserId};
use crate::models::{Comment, Geodata, Layer, NewComment, ParsedMetadata, SavedSearch};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to an in-memory database would see its own schema.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);
        // Recycling the only in-memory connection would drop the database.
        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn geodata_repo(&self) -> repositories::geodata::GeodataRepository {
        repositories::geodata::GeodataRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    fn saved_search_repo(&self) -> repositories::saved_search::SavedSearchRepository {
        repositories::saved_search::SavedSearchRepository::new(self.conn.clone())
    }

    // ========== Geodata Repository Methods ==========

    pub async fn get_geodata(&self, id: GeodataId) -> Result<Option<Geodata>> {
        self.geodata_repo().get(id).await
    }

    pub async fn find_geodata_by_url(&self, url: &str) -> Result<Option<Geodata>> {
        self.geodata_repo().find_by_url(url).await
    }

    pub async fn list_geodata(&self) -> Result<Vec<Geodata>> {
        self.geodata_repo().list_all().await
    }

    pub async fn list_geodata_intersecting(&self, window: &Envelope) -> Result<Vec<Geodata>> {
        self.geodata_repo().list_intersecting(window).await
    }

    pub async fn get_layers(&self, id: GeodataId) -> Result<Vec<Layer>> {
        self.geodata_repo().layers(id).await
    }

    pub async fn insert_geodata(&self, parsed: &ParsedMetadata) -> Result<(Geodata, Vec<Layer>)> {
        self.geodata_repo().insert(parsed).await
    }

    pub async fn count_geodata(&self) -> Result<u64> {
        self.geodata_repo().count().await
    }

    // ========== Comment Repository Methods ==========

    pub async fn add_comment(&self, comment: &NewComment) -> Result<Comment> {
        self.comment_repo().insert(comment).await
    }

    pub async fn get_comments(&self, geodata_id: GeodataId) -> Result<Vec<Comment>> {
        self.comment_repo().list_for_geodata(geodata_id).await
    }

    pub async fn get_comments_for_geodata_ids(&self, ids: &[GeodataId]) -> Result<Vec<Comment>> {
        self.comment_repo().list_for_geodata_ids(ids).await
    }

    pub async fn count_comments(&self) -> Result<u64> {
        self.comment_repo().count().await
    }

    // ========== Saved Search Repository Methods ==========

    pub async fn saved_search_exists(&self, id: &str) -> Result<bool> {
        self.saved_search_repo().exists(id).await
    }

    pub async fn get_saved_search(&self, id: &str) -> Result<Option<SavedSearch>> {
        self.saved_search_repo().get(id).await
    }

    pub async fn insert_saved_search(&self, search: &SavedSearch) -> Result<()> {
        self.saved_search_repo().insert(search).await
    }

    // ========== User Repository Methods ==========

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.user_repo().get_by_name(name).await
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: Option<&str>,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .create(name, email, password, config)
            .await
    }

    pub async fn verify_user_password(&self, name: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(name, password).await
    }
}
