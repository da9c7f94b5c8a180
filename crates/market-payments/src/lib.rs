//! # market-payments
//!
//! Stripe payment-intent processing and payment records for market-rs.
//!
//! ## Payment flow
//!
//! ```text
//! ┌────────────┐  create intent  ┌────────┐  webhook events   ┌──────────────┐
//! │ API server │────────────────▶│ Stripe │──────────────────▶│ PaymentStore │
//! └────────────┘  client secret  └────────┘  succeeded/failed └──────────────┘
//! ```
//!
//! The server calls [`PaymentGateway::create_payment_intent`] exactly once per
//! request and returns the client secret to the browser; settlement state
//! arrives later through the webhook and is recorded in a [`PaymentStore`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use market_payments::{IntentRequest, PaymentGateway, StripeClient};
//!
//! let client = StripeClient::new("sk_test_xxx", "whsec_xxx");
//!
//! let handle = client.create_payment_intent(IntentRequest {
//!     order_id: "123e4567-e89b-12d3-a456-426614174000".into(),
//!     amount_cents: 2500,
//! }).await?;
//!
//! // Hand handle.client_secret to the frontend for confirmation.
//! ```

mod error;
mod gateway;
mod intent;
mod record;
mod webhook;

pub use error::{PaymentError, Result};
pub use gateway::{IntentHandle, IntentRequest, MockGateway, PaymentGateway};
pub use intent::{amount_from_dollars, StripeClient};
pub use record::{MemoryPaymentStore, PaymentRecord, PaymentStatus, PaymentStore};
pub use webhook::{classify, verify_event, WebhookEvent, WebhookHandler};
