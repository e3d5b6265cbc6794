use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_doctor))
        .route("/", get(handlers::list_doctors))
        .route("/me", get(handlers::get_my_doctor))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}", patch(handlers::update_doctor))
        .route("/{doctor_id}", delete(handlers::delete_doctor))
        .route("/{doctor_id}/clinics/{clinic_id}", post(handlers::assign_clinic))
        .route("/{doctor_id}/clinics/{clinic_id}", delete(handlers::unassign_clinic))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
