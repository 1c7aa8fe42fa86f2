use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::PaymentStatus;
use uuid::Uuid;

/// Domain model for a simulated payment. No gateway is integrated; status
/// moves are plain field writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub booking_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Generate a unique payment ID
    pub fn generate_id() -> String {
        format!("payment::{}", Uuid::new_v4().simple())
    }
}
