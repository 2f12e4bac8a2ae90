pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(services: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(services, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        // API routes
        .nest("/api", api_routes())
        // Add state to the router
        .with_state(app_state)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Public catalog reads
        .route("/programs", get(handlers::programs::list))
        .route("/programs/:id", get(handlers::programs::get))
        .route("/membership-packages", get(handlers::packages::list))
        .route("/membership-packages/:id", get(handlers::packages::get))
        // Checkout
        .route("/checkout/program", post(handlers::checkout::program))
        .route("/checkout/membership", post(handlers::checkout::membership))
        // Gateway webhooks (no auth: authenticity comes from signatures)
        .route(
            "/payments/webhook/midtrans",
            post(handlers::webhooks::midtrans),
        )
        .route("/payments/webhook/ipaymu", post(handlers::webhooks::ipaymu))
        // Reconciliation visibility
        .route("/payments/:order_id", get(handlers::payments::get))
        .route(
            "/payments/:order_id/gateway-status",
            get(handlers::payments::gateway_status),
        )
}
