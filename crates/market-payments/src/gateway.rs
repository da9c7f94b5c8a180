//! Payment Gateway Seam
//!
//! The server talks to the payment collaborator through [`PaymentGateway`]
//! so handlers can be exercised against [`MockGateway`] without network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{PaymentError, Result};

/// Validated fields handed to the gateway. Amounts are in minor units.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntentRequest {
    /// Marketplace order this intent pays for
    pub order_id: String,

    /// Amount in cents
    pub amount_cents: i64,
}

/// Handle returned for a created payment intent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntentHandle {
    /// Payment intent ID
    pub id: String,

    /// Client secret for the browser-side confirmation step
    pub client_secret: String,
}

/// Payment collaborator interface
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for the given order and amount
    async fn create_payment_intent(&self, request: IntentRequest) -> Result<IntentHandle>;
}

/// Deterministic in-process gateway (for development and tests)
///
/// Issues sequential `pi_N` / `secret_N` handles, or fails every call when
/// constructed with [`MockGateway::failing`].
pub struct MockGateway {
    counter: AtomicU64,
    fail: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            fail: false,
        }
    }

    /// Gateway whose every call fails with a Stripe error
    pub fn failing() -> Self {
        Self {
            counter: AtomicU64::new(0),
            fail: true,
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment_intent(&self, _request: IntentRequest) -> Result<IntentHandle> {
        if self.fail {
            return Err(PaymentError::Stripe("mock gateway refused the intent".into()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IntentHandle {
            id: format!("pi_{n}"),
            client_secret: format!("secret_{n}"),
        })
    }
}
