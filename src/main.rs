mod auth;
mod config;
mod middleware;

mod db;
mod error;
mod models;
mod notify;
mod phone;
mod reminders;
mod routes;
mod scheduling;

use std::sync::Arc;

use crate::{
    config::Config,
    models::AppState,
    notify::{HttpGateway, MessageGateway, Notifier},
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg.database_url).await?;

    let gateway: Arc<dyn MessageGateway> = Arc::new(HttpGateway::from_config(&cfg));
    let notifier = Notifier::spawn(gateway.clone());
    reminders::spawn_reminder_loop(pool.clone(), gateway, cfg.shop_tz, cfg.shop_name.clone());

    let state = AppState {
        db: pool,
        session_ttl_hours: cfg.session_ttl_hours,
        shop_name: cfg.shop_name,
        shop_tz: cfg.shop_tz,
        booking_auto_confirm: cfg.booking_auto_confirm,
        admin_phone: cfg.admin_phone,
        notifier,
    };

    // The booking SPA and the admin dashboard are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
