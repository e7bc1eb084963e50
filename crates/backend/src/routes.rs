use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers;

/// Конфигурация всех роутов приложения
pub fn configure_routes() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // BULK CSV IMPORT (u101)
        // ========================================
        // :entity — один из product|category|brand|supplier|customer
        .route(
            "/api/:entity/import/validate",
            post(handlers::u101_csv_import::validate),
        )
        .route(
            "/api/:entity/import/commit",
            post(handlers::u101_csv_import::commit),
        )
        .route(
            "/api/:entity/import/template",
            get(handlers::u101_csv_import::template),
        )
}
