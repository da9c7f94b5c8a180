//! Application State

use std::sync::Arc;

use market_identity::UserStore;
use market_payments::{MemoryPaymentStore, PaymentGateway};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment gateway (None if Stripe is not configured)
    pub gateway: Option<Arc<dyn PaymentGateway>>,

    /// Webhook signing secret (None if Stripe is not configured)
    pub webhook_secret: Option<String>,

    /// Payment records, updated from webhook events
    pub payment_store: Arc<MemoryPaymentStore>,

    /// User records for sign-in upserts
    pub user_store: Arc<dyn UserStore>,
}
