//! Application state containing the services and shared resources

use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Arc;

use crate::import::ImportService;
use crate::infrastructure::config::Config;
use crate::infrastructure::{
    SeaOrmAuthorRepository, SeaOrmBookRepository, SeaOrmEditionRepository, SeaOrmTagRepository,
    SeaOrmUserRepository,
};
use crate::services::{CatalogService, UserService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub config: Arc<Config>,
    pub catalog: CatalogService,
    pub users: UserService,
    pub importer: ImportService,
}

impl AppState {
    /// Wire every service onto the one connection pool
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let catalog = CatalogService::new(
            Arc::new(SeaOrmBookRepository::new(db.clone())),
            Arc::new(SeaOrmAuthorRepository::new(db.clone())),
            Arc::new(SeaOrmEditionRepository::new(db.clone())),
            Arc::new(SeaOrmTagRepository::new(db.clone())),
        );
        let users = UserService::new(
            Arc::new(SeaOrmUserRepository::new(db.clone())),
            config.owner_open_id.clone(),
        );
        let importer = ImportService::new(db.clone());

        Self {
            db,
            config: Arc::new(config),
            catalog,
            users,
            importer,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Release the connection pool. Called once the server has drained.
    pub async fn shutdown(self) -> Result<(), DbErr> {
        tracing::info!("Closing database connections");
        self.db.close().await
    }
}

impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
