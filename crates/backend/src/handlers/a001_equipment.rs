use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use contracts::domain::a001_equipment::aggregate::{Equipment, EquipmentId};
use contracts::domain::common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::domain::a001_equipment;
use crate::shared::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    100
}

#[derive(Debug, Serialize)]
pub struct EquipmentPage {
    pub items: Vec<Equipment>,
    pub total: u64,
}

/// GET /api/a001/equipment
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<EquipmentPage>, StatusCode> {
    let limit = query.limit.clamp(1, 1000);
    match a001_equipment::service::list_paginated(&state.db, limit, query.offset).await {
        Ok((items, total)) => Ok(Json(EquipmentPage { items, total })),
        Err(e) => {
            tracing::error!("Failed to list equipment: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/a001/equipment/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Equipment>, StatusCode> {
    let equipment_id = EquipmentId::from_string(&id).map_err(|_| StatusCode::BAD_REQUEST)?;
    match a001_equipment::service::get_by_id(&state.db, equipment_id).await {
        Ok(Some(v)) => Ok(Json(v)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to load equipment {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
