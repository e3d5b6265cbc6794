use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use clinic_cell::router::clinic_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/clinics", clinic_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
