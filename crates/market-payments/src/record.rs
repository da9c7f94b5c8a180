//! Payment Records
//!
//! Settlement state for payment intents, driven by webhook events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;

/// Settlement status of a payment intent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
        }
    }
}

/// A payment record, keyed by intent ID
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Stripe payment intent ID
    pub intent_id: String,

    /// Amount in cents
    pub amount_cents: i64,

    /// Current settlement status
    pub status: PaymentStatus,

    /// Last failure message reported by Stripe, if any
    pub last_error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Create a new pending record
    pub fn new(intent_id: impl Into<String>, amount_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            intent_id: intent_id.into(),
            amount_cents,
            status: PaymentStatus::Pending,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new status
    pub fn mark(&mut self, status: PaymentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Check whether the payment has settled successfully
    pub fn is_settled(&self) -> bool {
        self.status == PaymentStatus::Succeeded
    }
}

/// Payment record storage trait
pub trait PaymentStore: Send + Sync {
    /// Save or update a record
    fn save(&self, record: &PaymentRecord) -> Result<()>;

    /// Get record by intent ID
    fn get(&self, intent_id: &str) -> Result<Option<PaymentRecord>>;

    /// Delete a record
    fn delete(&self, intent_id: &str) -> Result<()>;
}

/// In-memory payment store (for development)
pub struct MemoryPaymentStore {
    records: RwLock<HashMap<String, PaymentRecord>>,
}

impl Default for MemoryPaymentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PaymentStore for MemoryPaymentStore {
    fn save(&self, record: &PaymentRecord) -> Result<()> {
        let mut records = self.records.write().unwrap();
        records.insert(record.intent_id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, intent_id: &str) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().unwrap();
        Ok(records.get(intent_id).cloned())
    }

    fn delete(&self, intent_id: &str) -> Result<()> {
        let mut records = self.records.write().unwrap();
        records.remove(intent_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_pending() {
        let record = PaymentRecord::new("pi_1", 2500);
        assert_eq!(record.status, PaymentStatus::Pending);
        assert!(!record.is_settled());
    }

    #[test]
    fn test_mark_updates_status_and_timestamp() {
        let mut record = PaymentRecord::new("pi_1", 2500);
        let before = record.updated_at;
        record.mark(PaymentStatus::Succeeded);
        assert!(record.is_settled());
        assert!(record.updated_at >= before);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryPaymentStore::new();
        let record = PaymentRecord::new("pi_1", 2500);

        store.save(&record).unwrap();
        assert_eq!(store.len(), 1);

        let loaded = store.get("pi_1").unwrap().unwrap();
        assert_eq!(loaded.amount_cents, 2500);

        store.delete("pi_1").unwrap();
        assert!(store.get("pi_1").unwrap().is_none());
    }
}
