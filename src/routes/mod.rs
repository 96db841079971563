use crate::models::AppState;
use axum::Router;

pub mod appointment_routes;
pub mod auth_routes;
pub mod availability_routes;
pub mod block_routes;
pub mod client_routes;
pub mod home_routes;
pub mod service_routes;
pub mod slot_routes;
pub mod webhook_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth_routes::router())
        .nest("/api/services", service_routes::router())
        .nest("/api/availability", availability_routes::router())
        .nest("/api/blocks", block_routes::router())
        .nest("/api/slots", slot_routes::router())
        .nest("/api/appointments", appointment_routes::router())
        .nest("/api/clients", client_routes::router())
        .nest("/api/webhooks", webhook_routes::router())
        .merge(home_routes::router())
        .with_state(state)
}
