use crate::usecases::u501_import_equipment::{CatalogService, ImportExecutor};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared services handed to every handler through axum `State`
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub executor: Arc<ImportExecutor>,
    pub catalog: Arc<CatalogService>,
}
