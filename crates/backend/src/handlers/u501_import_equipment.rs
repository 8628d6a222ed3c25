use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use contracts::usecases::u501_import_equipment::{
    CatalogQuery, ImportProgress, ImportResponse, SelectionRequest,
};

use crate::shared::app_state::AppState;
use crate::usecases::u501_import_equipment::selection::{self, CatalogListing};

/// POST /api/u501/import
///
/// Прогон выполняется до конца в рамках запроса; прогресс виден через /progress.
pub async fn run_import(State(state): State<AppState>) -> Result<Json<ImportResponse>, StatusCode> {
    match state.executor.run().await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!("Failed to run equipment import: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET|POST /api/u501/progress
pub async fn get_progress(State(state): State<AppState>) -> Result<Json<ImportProgress>, StatusCode> {
    match state.executor.progress_tracker.read().await {
        Ok(progress) => Ok(Json(progress)),
        Err(e) => {
            tracing::error!("Failed to read import progress: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/u501/selection
pub async fn get_selection(State(state): State<AppState>) -> Result<Json<SelectionRequest>, StatusCode> {
    match selection::selected_ids(&state.db).await {
        Ok(product_ids) => Ok(Json(SelectionRequest { product_ids })),
        Err(e) => {
            tracing::error!("Failed to read selection: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// PUT /api/u501/selection
pub async fn save_selection(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SelectionRequest>, StatusCode> {
    match selection::save_selection(&state.db, &request.product_ids).await {
        Ok(product_ids) => Ok(Json(SelectionRequest { product_ids })),
        Err(e) => {
            tracing::error!("Failed to save selection: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/u501/catalog?refresh=bool
pub async fn get_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogListing>, StatusCode> {
    match state.catalog.catalog(query.refresh).await {
        Ok(listing) => Ok(Json(listing)),
        Err(e) => {
            tracing::error!("Failed to load catalog: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
