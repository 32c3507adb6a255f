// routes.rs
use std::sync::Arc;

use axum::{routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        claims::claims_handler, referrals::referrals_handler, settings::settings_handler,
        webhook::webhook_handler,
    },
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/referrals", referrals_handler())
        .nest("/settings", settings_handler())
        .nest("/claims", claims_handler());

    Router::new()
        .route("/health", get(health_check))
        .nest("/webhooks", webhook_handler())
        .nest("/api", api_route)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}
