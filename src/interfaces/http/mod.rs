//! REST surface of the purchase workflow.

pub mod auth;
pub mod error;
pub mod routes;

use crate::application::checkout::OrderInitiation;
use crate::application::verification::PaymentVerification;
use crate::config::ServerSettings;
use crate::error::Result;
use auth::TokenAuthenticator;
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use routes::{
    health_handler, initiate_order_handler, order_status_handler, verify_payment_handler,
    webhook_handler,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<OrderInitiation>,
    pub verification: Arc<PaymentVerification>,
    pub auth: Arc<TokenAuthenticator>,
}

pub fn router(state: AppState, server: &ServerSettings) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));
    match HeaderValue::from_str(server.frontend_url.trim_end_matches('/')) {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => warn!(frontend_url = %server.frontend_url, "Frontend URL is not a valid origin, CORS disabled"),
    }

    Router::new()
        .route("/", get(health_handler))
        .route("/api/v1/payments/orders", post(initiate_order_handler))
        .route("/api/v1/payments/verify", post(verify_payment_handler))
        .route(
            "/api/v1/payments/orders/{order_ref}/status",
            get(order_status_handler),
        )
        .route("/api/v1/payments/webhook", post(webhook_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    if let Ok(address) = listener.local_addr() {
        info!("Server running on {address}");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
