//! Stripe Webhook Handling
//!
//! Processes payment-intent webhook events and records settlement state.

use std::sync::Arc;
use stripe::{Event, EventObject, EventType, Webhook};

use crate::error::{PaymentError, Result};
use crate::record::{PaymentRecord, PaymentStatus, PaymentStore};

/// Parsed webhook event
#[derive(Clone, Debug)]
pub enum WebhookEvent {
    /// Payment settled
    IntentSucceeded {
        intent_id: String,
        amount_cents: i64,
    },

    /// Payment attempt failed
    IntentFailed {
        intent_id: String,
        amount_cents: i64,
        message: Option<String>,
    },

    /// Intent was canceled before settling
    IntentCanceled {
        intent_id: String,
        amount_cents: i64,
    },

    /// Unhandled event type
    Other { event_type: String },
}

/// Verify the webhook signature and deserialize the event
pub fn verify_event(payload: &str, signature: &str, secret: &str) -> Result<Event> {
    Webhook::construct_event(payload, signature, secret)
        .map_err(|e| PaymentError::WebhookSignature(e.to_string()))
}

/// Classify a Stripe event into our event type
pub fn classify(event: &Event) -> Result<WebhookEvent> {
    match event.type_ {
        EventType::PaymentIntentSucceeded => {
            let intent = intent_object(event)?;
            Ok(WebhookEvent::IntentSucceeded {
                intent_id: intent.id.to_string(),
                amount_cents: intent.amount,
            })
        }

        EventType::PaymentIntentPaymentFailed => {
            let intent = intent_object(event)?;
            Ok(WebhookEvent::IntentFailed {
                intent_id: intent.id.to_string(),
                amount_cents: intent.amount,
                message: intent
                    .last_payment_error
                    .as_ref()
                    .and_then(|e| e.message.clone()),
            })
        }

        EventType::PaymentIntentCanceled => {
            let intent = intent_object(event)?;
            Ok(WebhookEvent::IntentCanceled {
                intent_id: intent.id.to_string(),
                amount_cents: intent.amount,
            })
        }

        _ => Ok(WebhookEvent::Other {
            event_type: format!("{:?}", event.type_),
        }),
    }
}

fn intent_object(event: &Event) -> Result<&stripe::PaymentIntent> {
    if let EventObject::PaymentIntent(intent) = &event.data.object {
        Ok(intent)
    } else {
        Err(PaymentError::WebhookParse(
            "Invalid payment intent data".into(),
        ))
    }
}

/// Webhook handler
pub struct WebhookHandler<S: PaymentStore> {
    store: Arc<S>,
}

impl<S: PaymentStore> WebhookHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Classify a verified event and apply it to the store
    pub fn handle(&self, event: &Event) -> Result<WebhookEvent> {
        tracing::info!(event_type = ?event.type_, "Processing Stripe webhook");

        let parsed = classify(event)?;
        self.apply(&parsed)?;
        Ok(parsed)
    }

    /// Apply a classified event to the payment store
    pub fn apply(&self, event: &WebhookEvent) -> Result<()> {
        match event {
            WebhookEvent::IntentSucceeded {
                intent_id,
                amount_cents,
            } => self.transition(intent_id, *amount_cents, PaymentStatus::Succeeded, None),

            WebhookEvent::IntentFailed {
                intent_id,
                amount_cents,
                message,
            } => self.transition(
                intent_id,
                *amount_cents,
                PaymentStatus::Failed,
                message.clone(),
            ),

            WebhookEvent::IntentCanceled {
                intent_id,
                amount_cents,
            } => self.transition(intent_id, *amount_cents, PaymentStatus::Canceled, None),

            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(())
            }
        }
    }

    /// Upsert the record for an intent and move it to the given status
    fn transition(
        &self,
        intent_id: &str,
        amount_cents: i64,
        status: PaymentStatus,
        message: Option<String>,
    ) -> Result<()> {
        let mut record = self
            .store
            .get(intent_id)?
            .unwrap_or_else(|| PaymentRecord::new(intent_id, amount_cents));

        record.mark(status);
        record.last_error = message;
        self.store.save(&record)?;

        tracing::info!(
            intent_id = %intent_id,
            status = %record.status.as_str(),
            "Updated payment record"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemoryPaymentStore;

    fn handler() -> (WebhookHandler<MemoryPaymentStore>, Arc<MemoryPaymentStore>) {
        let store = Arc::new(MemoryPaymentStore::new());
        (WebhookHandler::new(store.clone()), store)
    }

    #[test]
    fn test_succeeded_event_creates_settled_record() {
        let (handler, store) = handler();

        handler
            .apply(&WebhookEvent::IntentSucceeded {
                intent_id: "pi_1".into(),
                amount_cents: 2500,
            })
            .unwrap();

        let record = store.get("pi_1").unwrap().unwrap();
        assert!(record.is_settled());
        assert_eq!(record.amount_cents, 2500);
    }

    #[test]
    fn test_failed_event_records_message() {
        let (handler, store) = handler();

        handler
            .apply(&WebhookEvent::IntentFailed {
                intent_id: "pi_2".into(),
                amount_cents: 1000,
                message: Some("card_declined".into()),
            })
            .unwrap();

        let record = store.get("pi_2").unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some("card_declined"));
    }

    #[test]
    fn test_canceled_event_overrides_earlier_status() {
        let (handler, store) = handler();

        handler
            .apply(&WebhookEvent::IntentSucceeded {
                intent_id: "pi_3".into(),
                amount_cents: 500,
            })
            .unwrap();
        handler
            .apply(&WebhookEvent::IntentCanceled {
                intent_id: "pi_3".into(),
                amount_cents: 500,
            })
            .unwrap();

        let record = store.get("pi_3").unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Canceled);
    }

    #[test]
    fn test_other_event_is_ignored() {
        let (handler, store) = handler();

        handler
            .apply(&WebhookEvent::Other {
                event_type: "invoice.created".into(),
            })
            .unwrap();

        assert!(store.is_empty());
    }
}
