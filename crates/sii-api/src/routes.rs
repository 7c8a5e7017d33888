use axum::{Json, Router, routing::get};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{help, helpers, locations};

pub const WELCOME: &str = "Welcome to API endpoint of Safe India Initiative";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { WELCOME }))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/api/help", get(help::list_help).post(help::submit_help))
        .route(
            "/api/user-location",
            get(locations::get_location).post(locations::update_location),
        )
        .route("/api/helpers", get(helpers::list_helpers).post(helpers::register_helper))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
