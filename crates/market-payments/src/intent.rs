//! Stripe Payment Intents
//!
//! Implements the Payment Intents approach: the server creates the intent
//! and hands the client secret to the browser for confirmation.

use async_trait::async_trait;
use std::collections::HashMap;
use stripe::{
    Client, CreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods, Currency,
    PaymentIntent,
};

use crate::error::{PaymentError, Result};
use crate::gateway::{IntentHandle, IntentRequest, PaymentGateway};

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    webhook_secret: String,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            client: Client::new(secret_key),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| PaymentError::Config("STRIPE_WEBHOOK_SECRET not set".into()))?;

        Ok(Self::new(&secret_key, &webhook_secret))
    }

    /// Get the webhook secret
    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    /// Get the underlying Stripe client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    /// Create a payment intent with the order ID attached as metadata
    async fn create_payment_intent(&self, request: IntentRequest) -> Result<IntentHandle> {
        let mut params = CreatePaymentIntent::new(request.amount_cents, Currency::USD);
        params.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
            enabled: true,
            ..Default::default()
        });

        // Metadata for reconciling intents against orders in the dashboard
        let mut metadata = HashMap::new();
        metadata.insert("order_id".to_string(), request.order_id.clone());
        params.metadata = Some(metadata);

        let intent = PaymentIntent::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::Stripe("No client secret returned".into()))?;

        Ok(IntentHandle {
            id: intent.id.to_string(),
            client_secret,
        })
    }
}

/// Convert a dollar amount to Stripe minor units
pub fn amount_from_dollars(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_from_dollars() {
        assert_eq!(amount_from_dollars(25.0), 2500);
        assert_eq!(amount_from_dollars(0.01), 1);
        assert_eq!(amount_from_dollars(10.555), 1056);
    }
}
