use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::Utc;
use tower_http::cors::CorsLayer;

use campus_notify::{
    handlers::trigger_handler,
    state::{AppConfig, AppState},
};

/// Reminder sweep cadence: once per day.
const SCAN_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_notify=info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    let app_state = Arc::new(AppState::new(config));

    // Scheduled trigger: first sweep at startup, then every 24 hours.
    let scanner = app_state.scanner.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SCAN_INTERVAL);
        loop {
            interval.tick().await;
            scanner.run(Utc::now()).await;
        }
    });

    let app = Router::new()
        .route("/events/notifications", post(trigger_handler::notification_created))
        .route("/health", get(trigger_handler::health))
        .layer(CorsLayer::permissive())
        .with_state(app_state.clone());

    let bind_addr = app_state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!("campus-notify listening on {}", bind_addr);
    axum::serve(listener, app).await.unwrap();
}
