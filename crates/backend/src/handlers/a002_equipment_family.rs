use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use contracts::domain::a002_equipment_family::aggregate::EquipmentFamily;
use serde::Deserialize;

use crate::domain::a002_equipment_family;
use crate::shared::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct FamilyQuery {
    pub taxonomy: Option<String>,
}

/// GET /api/a002/equipment-family
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<FamilyQuery>,
) -> Result<Json<Vec<EquipmentFamily>>, StatusCode> {
    match a002_equipment_family::service::list_all(&state.db, query.taxonomy.as_deref()).await {
        Ok(v) => Ok(Json(v)),
        Err(e) => {
            tracing::error!("Failed to list equipment families: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
