use axum::http::{header, Method};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::shared::app_state::AppState;
use crate::{handlers, system};

/// Конфигурация всех роутов приложения
pub fn configure_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // USECASES
        // ========================================
        // U501 Import equipment from Bandit
        .route(
            "/api/u501/import",
            post(handlers::u501_import_equipment::run_import),
        )
        .route(
            "/api/u501/progress",
            get(handlers::u501_import_equipment::get_progress)
                .post(handlers::u501_import_equipment::get_progress),
        )
        .route(
            "/api/u501/selection",
            get(handlers::u501_import_equipment::get_selection)
                .put(handlers::u501_import_equipment::save_selection),
        )
        .route(
            "/api/u501/catalog",
            get(handlers::u501_import_equipment::get_catalog),
        )
        // ========================================
        // AGGREGATES
        // ========================================
        // A001 Equipment
        .route(
            "/api/a001/equipment",
            get(handlers::a001_equipment::list),
        )
        .route(
            "/api/a001/equipment/:id",
            get(handlers::a001_equipment::get_by_id),
        )
        // A002 Equipment family
        .route(
            "/api/a002/equipment-family",
            get(handlers::a002_equipment_family::list_all),
        )
        .layer(middleware::from_fn(system::middleware::request_logger))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::Config;
    use crate::shared::data::db::test_connection;
    use crate::usecases::u501_import_equipment::test_support::StubSource;
    use crate::usecases::u501_import_equipment::{CatalogService, ImportExecutor, ProgressTracker};
    use contracts::usecases::u501_import_equipment::{ImportProgress, ImportResponse, SelectionRequest};
    use serde_json::json;
    use std::sync::Arc;

    async fn serve() -> String {
        let db = test_connection().await;
        let source = Arc::new(
            StubSource::default()
                .with_category(9, "Hand-Fed Chippers")
                .with_product(json!({ "id": 101, "project_category": [9],
                                      "acf": { "product_main_title": "Model 90XP" } })),
        );
        let tracker = Arc::new(ProgressTracker::new(db.clone(), 30));
        let state = AppState {
            executor: Arc::new(ImportExecutor::new(
                db.clone(),
                source.clone(),
                tracker,
                &Config::default(),
            )),
            catalog: Arc::new(CatalogService::new(db.clone(), source)),
            db,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, configure_routes(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn import_flow_over_http() {
        let base = serve().await;
        let client = reqwest::Client::new();

        let progress: ImportProgress = client
            .post(format!("{}/api/u501/progress", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(progress, ImportProgress::default());

        let saved: SelectionRequest = client
            .put(format!("{}/api/u501/selection", base))
            .json(&json!({ "product_ids": [101, 101] }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(saved.product_ids, vec![101]);

        let response: ImportResponse = client
            .post(format!("{}/api/u501/import", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(response.created, 1);

        let progress: ImportProgress = client
            .get(format!("{}/api/u501/progress", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(progress.is_finished());
        assert_eq!(progress.display_line().as_deref(), Some("Importing Equipment - 100%"));

        let page: serde_json::Value = client
            .get(format!("{}/api/a001/equipment", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["external_id"], 101);

        let missing = client
            .get(format!("{}/api/a001/equipment/999", base))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let malformed = client
            .get(format!("{}/api/a001/equipment/abc", base))
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status(), reqwest::StatusCode::BAD_REQUEST);

        let families: serde_json::Value = client
            .get(format!("{}/api/a002/equipment-family", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(families[0]["name"], "Hand-Fed Chippers");
    }
}
