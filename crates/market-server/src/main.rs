//! market-rs HTTP Server
//!
//! Axum-based API layer for the marketplace tools product: sign-in
//! callback, Stripe payment-intent creation, and the payment webhook.

mod extract;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_identity::{MemoryUserStore, UserStore};
use market_payments::{MemoryPaymentStore, PaymentGateway, StripeClient};

use crate::handlers::{create_payment_intent, health_check, signin_callback, stripe_webhook};
use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/payments/intent", post(create_payment_intent))
        .route("/api/auth/callback", post(signin_callback))
        .route("/webhook/stripe", post(stripe_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Initialize collaborators
    let user_store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let payment_store = Arc::new(MemoryPaymentStore::new());

    let (gateway, webhook_secret): (Option<Arc<dyn PaymentGateway>>, Option<String>) =
        match StripeClient::from_env() {
            Ok(client) => {
                tracing::info!("✓ Stripe configured");
                let secret = client.webhook_secret().to_string();
                (Some(Arc::new(client)), Some(secret))
            }
            Err(e) => {
                tracing::warn!("⚠ Stripe not configured - payments disabled ({})", e);
                tracing::warn!("  Set STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET in .env");
                (None, None)
            }
        };

    let state = AppState {
        gateway,
        webhook_secret,
        payment_store,
        user_store,
    };

    let app = router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 market-server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health              - Health check");
    tracing::info!("  POST /api/payments/intent - Create payment intent");
    tracing::info!("  POST /api/auth/callback   - Sign-in callback");
    tracing::info!("  POST /webhook/stripe      - Stripe webhook");

    axum::serve(listener, app).await?;

    Ok(())
}
