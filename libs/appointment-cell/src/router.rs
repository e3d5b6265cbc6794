use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/", get(handlers::list_appointments))
        .route("/doctor/me", get(handlers::my_doctor_appointments))
        .route("/patient/me", get(handlers::my_patient_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", patch(handlers::update_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
